use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::supervisor::Supervisor;

/// Shared stop flag. Set once by an explicit stop request; never reset
/// within a run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Stage-boundary check: errors with `Cancelled` once the flag is set.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Binds the stop flag to the supervisor's teardown cascade. A stop request
/// sets the flag and terminates every registered process, so an in-flight
/// wait returns promptly and the next stage boundary observes the flag.
#[derive(Clone)]
pub struct CancelCoordinator {
    token: CancelToken,
    supervisor: Supervisor,
}

impl CancelCoordinator {
    pub fn new(token: CancelToken, supervisor: Supervisor) -> Self {
        Self { token, supervisor }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub async fn request_stop(&self) {
        info!("Stop requested; terminating external processes");
        self.token.request();
        self.supervisor.terminate_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_set_only() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.checkpoint().is_ok());

        token.request();
        assert!(token.is_cancelled());
        assert!(matches!(
            token.checkpoint(),
            Err(PipelineError::Cancelled)
        ));

        // A second request changes nothing.
        token.request();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let token = CancelToken::new();
        let observer = token.clone();
        token.request();
        assert!(observer.is_cancelled());
    }
}
