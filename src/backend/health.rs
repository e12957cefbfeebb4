// Readiness polling for locally hosted backend servers.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{PipelineError, Result};

/// Interval between readiness probes.
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll the server's health endpoint until it answers, the stop flag is
/// set, or the timeout elapses. The timeout is a hard bound: a server that
/// never becomes healthy surfaces as `BackendUnavailable` instead of
/// blocking the batch forever.
pub async fn wait_until_healthy(
    endpoint: &str,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<()> {
    let url = format!("{}/health", endpoint.trim_end_matches('/'));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;
    let deadline = Instant::now() + timeout;

    loop {
        cancel.checkpoint()?;

        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Backend healthy at {}", url);
                return Ok(());
            }
            Ok(response) => {
                debug!("Backend not ready yet at {}: {}", url, response.status());
            }
            Err(e) => {
                debug!("Backend not reachable yet at {}: {}", url, e);
            }
        }

        if Instant::now() >= deadline {
            return Err(PipelineError::BackendUnavailable(format!(
                "No healthy response from {} within {}s",
                url,
                timeout.as_secs()
            )));
        }
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_server_times_out() {
        let cancel = CancelToken::new();
        // Nothing listens on this port; the first probe fails and the
        // zero timeout trips immediately after it.
        let result =
            wait_until_healthy("http://127.0.0.1:1", Duration::from_secs(0), &cancel).await;
        assert!(matches!(result, Err(PipelineError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn test_cancellation_wins_over_polling() {
        let cancel = CancelToken::new();
        cancel.request();
        let result =
            wait_until_healthy("http://127.0.0.1:1", Duration::from_secs(60), &cancel).await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }
}
