//! Resource monitor polling.

use crate::api::ApiClient;
use crate::error::GatewayError;
use botdeck_core::{DashboardEngine, DurationExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const LOG_TARGET: &str = "botdeck::gateway::monitor";

/// Periodic poller for the `/api/monitor` endpoint.
///
/// A failed poll leaves the previous reading in place and retries on the
/// next scheduled tick; repeated failures back off up to a cap.
pub struct MonitorPoller {
    api: Arc<ApiClient>,
    engine: Arc<DashboardEngine>,
    poll_interval: Duration,
    cancel_token: CancellationToken,
}

impl MonitorPoller {
    /// Create a new poller
    ///
    /// # Arguments
    /// * `api` - Dashboard API client
    /// * `engine` - Engine to update with usage readings
    /// * `poll_interval_secs` - Polling interval in seconds
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    pub fn new(
        api: Arc<ApiClient>,
        engine: Arc<DashboardEngine>,
        poll_interval_secs: u64,
        cancel_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            api,
            engine,
            poll_interval: Duration::from_secs(poll_interval_secs),
            cancel_token: cancel_token.unwrap_or_default(),
        }
    }

    /// Start polling in a background task
    #[must_use]
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn poll_once(&self) -> Result<(), GatewayError> {
        let usage = self.api.monitor().await?;
        debug!(
            target: LOG_TARGET,
            "polled monitor: tokens_used={}, memory={:?}",
            usage.tokens_used,
            usage.memory
        );
        self.engine.set_usage(usage).await;
        Ok(())
    }

    async fn run(&self) {
        info!(target: LOG_TARGET, "starting resource monitor poller");

        let mut consecutive_errors: u32 = 0;
        let max_backoff = Duration::from_secs(30);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(target: LOG_TARGET, "monitor poller shutting down");
                    break;
                }
                () = tokio::time::sleep(self.poll_interval) => {
                    match self.poll_once().await {
                        Ok(()) => {
                            consecutive_errors = 0;
                        }
                        Err(e) => {
                            consecutive_errors += 1;
                            warn!(target: LOG_TARGET, "poll error (attempt {consecutive_errors}): {e}");

                            // Exponential backoff: 100ms * 2^errors, capped at max_backoff
                            let backoff_ms = 100_u64
                                .saturating_mul(2_u64.saturating_pow(consecutive_errors.min(10)));
                            let backoff =
                                Duration::from_millis(backoff_ms.min(max_backoff.as_millis_u64()));

                            if consecutive_errors >= 5 {
                                error!(
                                    target: LOG_TARGET,
                                    "too many consecutive errors, waiting {} seconds",
                                    backoff.as_secs()
                                );
                            }

                            tokio::time::sleep(backoff).await;
                        }
                    }
                }
            }
        }
    }
}
