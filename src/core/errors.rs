use thiserror::Error;

/// Closed error taxonomy for a bridge submission.
///
/// Every variant terminates the submission it occurs in. Only the status
/// polling loop retries, and it retries the *read* of the status, never the
/// transfer itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// No wallet provider detected for the source chain's family.
    #[error("{wallet} wallet not found. Please install {wallet} first.")]
    WalletNotFound { wallet: String },

    /// The wallet is present but the user declined the request.
    #[error("User rejected the request: {0}")]
    UserRejected(String),

    /// The wallet is present but the sign/send call failed.
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Non-2xx reply from the bridge API; the server message is kept verbatim.
    #[error("{0}")]
    ApiError(String),

    /// The allowance could not be read or raised.
    #[error("Approve failed: {0}")]
    ApprovalFailed(String),

    /// The EVM wallet refused to switch to the requested chain.
    #[error("Network switch failed: {0}")]
    NetworkSwitchFailed(String),

    /// Catch-all for unexpected failures in the submit/poll pipeline.
    #[error("Tx Error: {0}")]
    TransactionError(String),

    /// Unknown chain identifier or unusable configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The prepared transaction does not decode for the source chain family.
    #[error("Invalid transaction payload: {0}")]
    InvalidPayload(String),

    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("Submission cancelled")]
    Cancelled,

    #[error("Settlement not confirmed after {attempts} status checks")]
    PollingExhausted { attempts: u32 },
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// Stable machine-readable name, used as the `kind` field of log payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::WalletNotFound { .. } => "wallet_not_found",
            BridgeError::UserRejected(_) => "user_rejected",
            BridgeError::SigningFailed(_) => "signing_failed",
            BridgeError::ApiError(_) => "api_error",
            BridgeError::ApprovalFailed(_) => "approval_failed",
            BridgeError::NetworkSwitchFailed(_) => "network_switch_failed",
            BridgeError::TransactionError(_) => "transaction_error",
            BridgeError::ConfigError(_) => "config_error",
            BridgeError::InvalidPayload(_) => "invalid_payload",
            BridgeError::SubmissionInProgress => "submission_in_progress",
            BridgeError::Cancelled => "cancelled",
            BridgeError::PollingExhausted { .. } => "polling_exhausted",
        }
    }

    /// Errors a status read may recover from on the next poll.
    pub fn is_retryable_read(&self) -> bool {
        matches!(self, BridgeError::ApiError(_) | BridgeError::TransactionError(_))
    }

    pub fn wallet_not_found(wallet: impl Into<String>) -> Self {
        BridgeError::WalletNotFound { wallet: wallet.into() }
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        BridgeError::InvalidPayload(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_wallet_not_found() {
        let err = BridgeError::wallet_not_found("Phantom");
        assert_eq!(format!("{}", err), "Phantom wallet not found. Please install Phantom first.");
    }

    #[test]
    fn test_api_error_is_verbatim() {
        let err = BridgeError::ApiError("fromToken not supported".to_string());
        assert_eq!(err.to_string(), "fromToken not supported");
    }

    #[test]
    fn test_kind_and_classification() {
        assert_eq!(BridgeError::Cancelled.kind(), "cancelled");
        assert_eq!(BridgeError::PollingExhausted { attempts: 3 }.kind(), "polling_exhausted");
        assert!(BridgeError::ApiError("502".into()).is_retryable_read());
        assert!(!BridgeError::Cancelled.is_retryable_read());
    }
}
