//! Settlement polling: one status read per interval until the bridge reports
//! the destination leg as settled, the bounds run out, or the user cancels.

use parking_lot::Mutex;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::state::{StateMachine, SubmissionState};
use crate::api::BridgeApi;
use crate::audit::OperationLog;
use crate::core::config::PollingConfig;
use crate::core::domain::{Network, TransactionId};
use crate::core::errors::{BridgeError, BridgeResult};
use crate::tools::async_support::{cancellable, sleep_or_cancel};

pub(crate) struct StatusPoller<'a> {
    pub api: &'a dyn BridgeApi,
    pub config: &'a PollingConfig,
    pub log: &'a OperationLog,
    pub machine: &'a Mutex<StateMachine>,
    pub cancel: &'a CancellationToken,
}

fn interval_text(interval: Duration) -> String {
    format!("{}", interval.as_secs_f64())
}

impl StatusPoller<'_> {
    /// Returns the number of status reads it took to see the transfer settle.
    ///
    /// Exactly one log entry is written per read.
    pub async fn poll_until_settled(&self, tx: &TransactionId, network: Network) -> BridgeResult<u32> {
        let interval = self.config.interval();
        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut consecutive_errors: u32 = 0;

        loop {
            attempts += 1;
            self.machine
                .lock()
                .advance(SubmissionState::Polling { tx_hash: tx.clone(), attempts })?;

            match cancellable(self.cancel, self.api.transaction_status(tx, network)).await {
                Ok(status) if status.is_settled() => {
                    self.log.success_with("Cross-chain transaction completed successfully!", status.raw);
                    return Ok(attempts);
                }
                Ok(status) => {
                    consecutive_errors = 0;
                    debug!(attempt = attempts, status = ?status.status(), "Transfer not settled yet");
                    self.log.pending_with(
                        format!("Transaction pending, checking again in {} seconds...", interval_text(interval)),
                        status.raw,
                    );
                }
                Err(err) if err.is_retryable_read() => {
                    consecutive_errors += 1;
                    warn!(attempt = attempts, consecutive_errors, error = %err, "Status check failed");
                    self.log.error_with(
                        "Status check failed:",
                        json!({
                            "error": err.to_string(),
                            "attempt": attempts,
                            "consecutiveErrors": consecutive_errors,
                        }),
                    );
                    if consecutive_errors >= self.config.max_consecutive_errors {
                        return Err(BridgeError::TransactionError(format!(
                            "status check failed {} times in a row: {}",
                            consecutive_errors, err
                        )));
                    }
                }
                Err(err) => return Err(err),
            }

            if self.config.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(BridgeError::PollingExhausted { attempts });
            }
            if let Some(limit) = self.config.max_duration() {
                if started.elapsed() + interval > limit {
                    return Err(BridgeError::PollingExhausted { attempts });
                }
            }

            sleep_or_cancel(self.cancel, interval).await?;
        }
    }
}
