use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::Result;
use crate::status::StatusSink;
use crate::template::CommandLine;

/// How often a waiting stage re-checks a child for exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long `terminate` waits for a killed child to be reaped.
const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Opaque identifier for a supervised process. Stages hold these instead of
/// raw child handles; the supervisor keeps sole ownership of the children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle(u64);

/// How a supervised wait ended.
#[derive(Debug)]
pub enum ExitOutcome {
    /// The process exited on its own; the stage decides what the status means.
    Exited(ExitStatus),
    /// The handle left the registry mid-wait: the process was torn down
    /// externally (stop request or run teardown).
    Terminated,
}

struct ManagedProcess {
    child: Child,
    command_line: String,
    started_at: Instant,
}

/// Registry of every external process the pipeline has spawned. All spawns
/// go through here so a stop request or run teardown can guarantee nothing
/// is left running.
#[derive(Clone)]
pub struct Supervisor {
    registry: Arc<Mutex<HashMap<u64, ManagedProcess>>>,
    next_id: Arc<AtomicU64>,
    status: StatusSink,
    grace: Duration,
}

impl Supervisor {
    pub fn new(status: StatusSink) -> Self {
        Self::with_grace(status, DEFAULT_GRACE)
    }

    pub fn with_grace(status: StatusSink, grace: Duration) -> Self {
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            status,
            grace,
        }
    }

    /// Spawn a process with stdout/stderr forwarded line-by-line to the
    /// status sink, register it, and return immediately.
    pub async fn start(&self, command: &CommandLine) -> Result<ProcessHandle> {
        debug!("Starting external process: {}", command.display());

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let name = std::path::Path::new(&command.program)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| command.program.clone());

        if let Some(stdout) = child.stdout.take() {
            pump_output(self.status.clone(), name.clone(), stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            pump_output(self.status.clone(), name.clone(), stderr);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let managed = ManagedProcess {
            child,
            command_line: command.display(),
            started_at: Instant::now(),
        };
        self.registry.lock().await.insert(id, managed);

        Ok(ProcessHandle(id))
    }

    /// Block until the process exits or is torn down externally. The
    /// registry lock is never held across a suspension, so `terminate_all`
    /// can run concurrently with a wait.
    pub async fn wait(&self, handle: ProcessHandle) -> Result<ExitOutcome> {
        loop {
            {
                let mut registry = self.registry.lock().await;
                match registry.get_mut(&handle.0) {
                    None => return Ok(ExitOutcome::Terminated),
                    Some(managed) => {
                        if let Some(status) = managed.child.try_wait()? {
                            debug!(
                                "Process exited with {} after {:?}: {}",
                                status,
                                managed.started_at.elapsed(),
                                managed.command_line
                            );
                            registry.remove(&handle.0);
                            return Ok(ExitOutcome::Exited(status));
                        }
                    }
                }
            }
            sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    /// Remove the handle from the registry and shut the process down.
    /// Idempotent: unknown or already-reaped handles are a no-op.
    pub async fn terminate(&self, handle: ProcessHandle) {
        let managed = { self.registry.lock().await.remove(&handle.0) };
        if let Some(mut managed) = managed {
            self.shutdown(&mut managed).await;
        }
    }

    /// Terminate every registered process. The registry is drained first so
    /// the call is safe concurrently with stage execution: a stage waiting
    /// on a drained handle observes `Terminated`.
    pub async fn terminate_all(&self) {
        let drained: Vec<ManagedProcess> = {
            let mut registry = self.registry.lock().await;
            registry.drain().map(|(_, managed)| managed).collect()
        };
        for mut managed in drained {
            self.shutdown(&mut managed).await;
        }
    }

    pub async fn running_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    async fn shutdown(&self, managed: &mut ManagedProcess) {
        match managed.child.try_wait() {
            Ok(Some(status)) => {
                debug!(
                    "Process already exited with {}: {}",
                    status, managed.command_line
                );
                return;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to poll {}: {}", managed.command_line, e);
                return;
            }
        }

        debug!(
            "Terminating process after {:?}: {}",
            managed.started_at.elapsed(),
            managed.command_line
        );
        if let Err(e) = managed.child.start_kill() {
            warn!("Failed to kill {}: {}", managed.command_line, e);
            return;
        }

        let deadline = Instant::now() + self.grace;
        loop {
            match managed.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!(
                            "Process did not exit within the grace period: {}",
                            managed.command_line
                        );
                        let _ = managed.child.kill().await;
                        return;
                    }
                    sleep(EXIT_POLL_INTERVAL).await;
                }
                Err(e) => {
                    warn!("Failed to reap {}: {}", managed.command_line, e);
                    return;
                }
            }
        }
    }
}

/// Forward each output line of a child to the status sink.
fn pump_output<R>(status: StatusSink, name: String, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !line.trim().is_empty() {
                status.info(format!("{}: {}", name, line));
            }
        }
    });
}
