// src/tools/async_support.rs
//! Cancellation helpers shared by the orchestrator and the allowance negotiator.

use crate::core::errors::{BridgeError, BridgeResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Races `future` against the cancellation token.
///
/// The token is checked first, so an already-cancelled submission never
/// starts another wallet or API call.
pub async fn cancellable<F, T>(cancel: &CancellationToken, future: F) -> BridgeResult<T>
where
    F: Future<Output = BridgeResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(BridgeError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BridgeError::Cancelled),
        result = future => result,
    }
}

/// Cooperative sleep that wakes early with `Cancelled`.
pub async fn sleep_or_cancel(cancel: &CancellationToken, delay: Duration) -> BridgeResult<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BridgeError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
