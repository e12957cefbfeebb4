use chrono::{DateTime, Local};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{error, info};

use crate::pipeline::{BatchSummary, Stage};

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

impl StatusLevel {
    pub fn tag(&self) -> &'static str {
        match self {
            StatusLevel::Info => "[INFO]",
            StatusLevel::Error => "[ERROR]",
        }
    }
}

/// One line of the append-only status stream.
#[derive(Debug, Clone)]
pub struct StatusLine {
    pub level: StatusLevel,
    pub stage: Option<Stage>,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

impl StatusLine {
    pub fn render(&self) -> String {
        match self.stage {
            Some(stage) => format!("{} [{}] {}", self.level.tag(), stage, self.message),
            None => format!("{} {}", self.level.tag(), self.message),
        }
    }
}

/// Events observed by the presentation layer: status lines in execution
/// order, then exactly one `Finished` per batch.
#[derive(Debug, Clone)]
pub enum StatusEvent {
    Line(StatusLine),
    Finished(BatchSummary),
}

/// Producer half of the status stream. Cloned freely across the pipeline
/// and the supervisor; every line is also emitted through `tracing` so it
/// reaches the rolling log file.
#[derive(Clone)]
pub struct StatusSink {
    tx: UnboundedSender<StatusEvent>,
}

impl StatusSink {
    pub fn channel() -> (Self, UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn info<S: Into<String>>(&self, message: S) {
        self.push(StatusLevel::Info, None, message.into());
    }

    pub fn error<S: Into<String>>(&self, message: S) {
        self.push(StatusLevel::Error, None, message.into());
    }

    pub fn stage_info<S: Into<String>>(&self, stage: Stage, message: S) {
        self.push(StatusLevel::Info, Some(stage), message.into());
    }

    pub fn finished(&self, summary: BatchSummary) {
        info!(
            "Batch finished: {} succeeded, {} skipped, {} failed (cancelled: {})",
            summary.succeeded, summary.skipped, summary.failed, summary.cancelled
        );
        let _ = self.tx.send(StatusEvent::Finished(summary));
    }

    fn push(&self, level: StatusLevel, stage: Option<Stage>, message: String) {
        let line = StatusLine {
            level,
            stage,
            message,
            timestamp: Local::now(),
        };
        match level {
            StatusLevel::Info => info!("{}", line.render()),
            StatusLevel::Error => error!("{}", line.render()),
        }
        // A dropped receiver only means nobody is watching; the run goes on.
        let _ = self.tx.send(StatusEvent::Line(line));
    }
}
