//! Blocking user notifications (the `alert()` of a browser front end).

use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Something the user must fix before retrying, e.g. installing a wallet.
    Prompt(String),
    Error(String),
    Success(String),
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Routes notices to `tracing`; used when no front end is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::Prompt(msg) => warn!(notice = "prompt", "{}", msg),
            Notice::Error(msg) => error!(notice = "error", "{}", msg),
            Notice::Success(msg) => info!(notice = "success", "{}", msg),
        }
    }
}
