use async_trait::async_trait;
use ethers::types::U256;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

use super::evm::ContractCallPayload;
use super::require;
use crate::blockchain::providers::{InclusionStatus, VeChainClause, VeChainProvider, VeChainSession};
use crate::blockchain::traits::{SubmissionContext, TokenAllowance, WalletAdapter};
use crate::core::abi;
use crate::core::domain::{AccountHandle, ChainFamily, PreparedTransaction, TransactionId};
use crate::core::errors::{BridgeError, BridgeResult};

const FAMILY: ChainFamily = ChainFamily::VeChain;

/// VeChain adapter. The session opened by `connect` is reused by the
/// allowance calls and the transfer of the same submission; each `connect`
/// drops the previous one first.
pub struct VeChainWallet {
    provider: Option<Arc<dyn VeChainProvider>>,
    session: Mutex<Option<Arc<dyn VeChainSession>>>,
}

impl VeChainWallet {
    pub fn new(provider: Option<Arc<dyn VeChainProvider>>) -> Self {
        Self { provider, session: Mutex::new(None) }
    }

    fn session(&self) -> BridgeResult<Arc<dyn VeChainSession>> {
        self.session
            .lock()
            .clone()
            .ok_or_else(|| BridgeError::SigningFailed("VeChain wallet is not connected".to_string()))
    }

    async fn send_clauses(&self, clauses: &[VeChainClause], signer: &str) -> BridgeResult<String> {
        let session = self.session()?;
        let pending = session.sign(clauses, signer).await.map_err(|e| e.into_signing_error(FAMILY))?;
        session.request(pending).await.map_err(|e| e.into_signing_error(FAMILY))
    }
}

#[async_trait]
impl WalletAdapter for VeChainWallet {
    fn family(&self) -> ChainFamily {
        FAMILY
    }

    async fn connect(&self, ctx: &SubmissionContext<'_>) -> BridgeResult<AccountHandle> {
        self.session.lock().take();
        let session = require(&self.provider, FAMILY)?
            .connect(ctx.network())
            .await
            .map_err(|e| e.into_signing_error(FAMILY))?;
        let from = ctx.request.from_account.trim();
        let address = if from.is_empty() { session.account().to_string() } else { from.to_string() };
        *self.session.lock() = Some(session);
        Ok(AccountHandle { family: FAMILY, address })
    }

    fn token_allowance(&self) -> Option<&dyn TokenAllowance> {
        Some(self)
    }

    async fn sign_and_submit(
        &self,
        prepared: &PreparedTransaction,
        ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<TransactionId> {
        let payload: ContractCallPayload = prepared.payload()?;
        let clause = VeChainClause { to: payload.to.clone(), value: payload.value_hex()?, data: payload.data() };
        let signer = match ctx.request.from_account.trim() {
            "" => self.session()?.account().to_string(),
            from => from.to_string(),
        };
        let txid = self.send_clauses(&[clause], &signer).await?;
        Ok(TransactionId(txid))
    }
}

#[async_trait]
impl TokenAllowance for VeChainWallet {
    async fn allowance(&self, token: &str, owner: &str, spender: &str) -> BridgeResult<U256> {
        let clause = VeChainClause {
            to: token.to_string(),
            value: "0x0".to_string(),
            data: abi::to_hex_data(&abi::encode_allowance(owner, spender)?),
        };
        let raw = self
            .session()?
            .call(&clause)
            .await
            .map_err(|e| BridgeError::ApprovalFailed(e.to_string()))?;
        abi::decode_uint256(&raw)
    }

    async fn approve(&self, token: &str, owner: &str, spender: &str, amount: U256) -> BridgeResult<TransactionId> {
        let clause = VeChainClause {
            to: token.to_string(),
            value: "0x0".to_string(),
            data: abi::to_hex_data(&abi::encode_approve(spender, amount)?),
        };
        let txid = self.send_clauses(&[clause], owner).await?;
        info!(txid = %txid, token = %token, "VeChain approve sent");
        Ok(TransactionId(txid))
    }

    async fn wait_for_inclusion(&self, tx: &TransactionId) -> BridgeResult<()> {
        match self.session()?.wait_for_transaction(tx.as_str()).await {
            Ok(InclusionStatus::Included) => Ok(()),
            Ok(InclusionStatus::Reverted) => {
                Err(BridgeError::ApprovalFailed(format!("approve transaction {} reverted", tx)))
            }
            Err(e) => Err(BridgeError::ApprovalFailed(e.to_string())),
        }
    }
}
