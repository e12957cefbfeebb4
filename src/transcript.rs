use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::error::{PipelineError, Result};

/// One timestamped segment of the intermediate transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Engine-independent transcript representation handed between the
/// transcription, translation and synthesis stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn new<S: Into<String>>(language: S) -> Self {
        Self {
            language: language.into(),
            segments: Vec::new(),
        }
    }

    /// Import an SRT subtitle file as an intermediate transcript.
    pub async fn from_srt_file<P: AsRef<Path>>(path: P, language: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            PipelineError::Transcription(format!(
                "Failed to read subtitle file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_srt_str(&content, language)
    }

    pub fn from_srt_str(content: &str, language: &str) -> Result<Self> {
        let mut transcript = Transcript::new(language);
        let mut id = 0u32;

        for block in content.replace("\r\n", "\n").split("\n\n") {
            let mut lines = block.lines().filter(|l| !l.trim().is_empty()).peekable();

            // Leading cue index is optional; skip it when present.
            if let Some(first) = lines.peek() {
                if first.trim().chars().all(|c| c.is_ascii_digit()) {
                    lines.next();
                }
            }

            let Some(timing) = lines.next() else { continue };
            let Some((start_text, end_text)) = timing.split_once("-->") else {
                return Err(PipelineError::Transcription(format!(
                    "Malformed subtitle timing line: '{}'",
                    timing.trim()
                )));
            };

            let start = parse_srt_time(start_text.trim())?;
            let end = parse_srt_time(end_text.trim())?;
            let text = lines.collect::<Vec<_>>().join("\n").trim().to_string();
            if text.is_empty() {
                continue;
            }

            transcript.segments.push(TranscriptSegment {
                id,
                start,
                end,
                text,
            });
            id += 1;
        }

        Ok(transcript)
    }

    /// Persist as JSON for the translation engine hand-off.
    pub async fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    pub async fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            PipelineError::Translation(format!(
                "Failed to read transcript {}: {}",
                path.display(),
                e
            ))
        })?;
        let transcript = serde_json::from_str(&content)?;
        Ok(transcript)
    }
}

/// Parse an SRT timestamp (`HH:MM:SS,mmm`) into seconds.
fn parse_srt_time(text: &str) -> Result<f64> {
    let bad = || PipelineError::Transcription(format!("Malformed subtitle timestamp: '{}'", text));

    let (clock, millis_text) = text.split_once(',').ok_or_else(bad)?;
    let mut clock_parts = clock.split(':');
    let hours: u64 = clock_parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(bad)?;
    let minutes: u64 = clock_parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(bad)?;
    let seconds: u64 = clock_parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(bad)?;
    if clock_parts.next().is_some() {
        return Err(bad());
    }
    let millis: u64 = millis_text.trim().parse().map_err(|_| bad())?;

    Ok((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}
