use async_trait::async_trait;
use ethers::types::U256;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::domain::{
    AccountHandle, BridgeRequest, ChainFamily, Network, PreparedTransaction, TransactionId,
};
use crate::core::errors::{BridgeError, BridgeResult};

/// Failure reported by a wallet provider capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The human declined the request in the wallet UI.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The wallet accepted the call but it errored.
    #[error("{0}")]
    Failed(String),
    /// The wallet went away between detection and use.
    #[error("wallet unavailable")]
    Unavailable,
}

impl ProviderError {
    /// Maps a provider failure during connect/sign/send into the taxonomy.
    pub fn into_signing_error(self, family: ChainFamily) -> BridgeError {
        match self {
            ProviderError::Rejected(msg) => BridgeError::UserRejected(msg),
            ProviderError::Failed(msg) => BridgeError::SigningFailed(msg),
            ProviderError::Unavailable => BridgeError::wallet_not_found(family.wallet_name()),
        }
    }
}

/// Per-submission inputs every adapter call can see.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionContext<'a> {
    pub request: &'a BridgeRequest,
    pub cancel: &'a CancellationToken,
}

impl<'a> SubmissionContext<'a> {
    pub fn new(request: &'a BridgeRequest, cancel: &'a CancellationToken) -> Self {
        Self { request, cancel }
    }

    pub fn network(&self) -> Network {
        self.request.network()
    }
}

/// Uniform wallet capability for one chain family.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    fn family(&self) -> ChainFamily;

    /// Detects the provider and connects; `WalletNotFound` when absent.
    async fn connect(&self, ctx: &SubmissionContext<'_>) -> BridgeResult<AccountHandle>;

    /// Moves the wallet onto the network the prepared transaction targets.
    /// Returns the chain switched to, if any.
    async fn prepare_network(
        &self,
        _prepared: &PreparedTransaction,
        _ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<Option<String>> {
        Ok(None)
    }

    /// Token allowance capability, for families that have one.
    fn token_allowance(&self) -> Option<&dyn TokenAllowance> {
        None
    }

    /// Signs and submits the prepared transaction.
    async fn sign_and_submit(
        &self,
        prepared: &PreparedTransaction,
        ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<TransactionId>;

    /// Whether `await_inclusion` actually waits for the source chain.
    fn confirms_inclusion(&self) -> bool {
        false
    }

    async fn await_inclusion(
        &self,
        _tx: &TransactionId,
        _ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<()> {
        Ok(())
    }
}

/// ERC-20 style spending allowance.
#[async_trait]
pub trait TokenAllowance: Send + Sync {
    async fn allowance(&self, token: &str, owner: &str, spender: &str) -> BridgeResult<U256>;

    async fn approve(
        &self,
        token: &str,
        owner: &str,
        spender: &str,
        amount: U256,
    ) -> BridgeResult<TransactionId>;

    async fn wait_for_inclusion(&self, tx: &TransactionId) -> BridgeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_into_taxonomy() {
        assert_eq!(
            ProviderError::Rejected("denied".into()).into_signing_error(ChainFamily::Evm),
            BridgeError::UserRejected("denied".into())
        );
        assert_eq!(
            ProviderError::Failed("rpc".into()).into_signing_error(ChainFamily::Solana),
            BridgeError::SigningFailed("rpc".into())
        );
        assert_eq!(
            ProviderError::Unavailable.into_signing_error(ChainFamily::Cardano),
            BridgeError::wallet_not_found("Lace")
        );
    }
}
