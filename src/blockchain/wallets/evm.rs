use async_trait::async_trait;
use ethers::types::U256;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::require;
use crate::blockchain::providers::{EvmCall, EvmProvider, EvmTransactionRequest, InclusionStatus};
use crate::blockchain::traits::{SubmissionContext, TokenAllowance, WalletAdapter};
use crate::core::abi;
use crate::core::domain::{AccountHandle, ChainFamily, PreparedTransaction, TransactionId};
use crate::core::errors::{BridgeError, BridgeResult};

/// `{to, data, value?}` call shared by EVM and VeChain payloads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContractCallPayload {
    pub to: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl ContractCallPayload {
    pub fn data(&self) -> String {
        match self.data.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => "0x".to_string(),
        }
    }

    /// Value as a `0x` hex quantity; absent means `0x0`.
    pub fn value_hex(&self) -> BridgeResult<String> {
        let amount = match &self.value {
            None | Some(Value::Null) => U256::zero(),
            Some(Value::String(s)) if s.trim().is_empty() => U256::zero(),
            Some(Value::String(s)) => abi::parse_uint256(s)?,
            Some(Value::Number(n)) => abi::parse_uint256(&n.to_string())?,
            Some(other) => {
                return Err(BridgeError::invalid_payload(format!("invalid tx value {}", other)))
            }
        };
        Ok(format!("0x{:x}", amount))
    }
}

pub struct EvmWallet {
    provider: Option<Arc<dyn EvmProvider>>,
}

impl EvmWallet {
    pub fn new(provider: Option<Arc<dyn EvmProvider>>) -> Self {
        Self { provider }
    }

    fn provider(&self) -> BridgeResult<&Arc<dyn EvmProvider>> {
        require(&self.provider, ChainFamily::Evm)
    }
}

#[async_trait]
impl WalletAdapter for EvmWallet {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    async fn connect(&self, _ctx: &SubmissionContext<'_>) -> BridgeResult<AccountHandle> {
        let accounts = self
            .provider()?
            .request_accounts()
            .await
            .map_err(|e| e.into_signing_error(ChainFamily::Evm))?;
        let address = accounts
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::SigningFailed("wallet exposed no accounts".to_string()))?;
        Ok(AccountHandle { family: ChainFamily::Evm, address })
    }

    async fn prepare_network(
        &self,
        prepared: &PreparedTransaction,
        _ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<Option<String>> {
        let Some(chain_id) = prepared.chain_id.as_deref() else {
            debug!("Prepared EVM transaction carries no chainId; staying on the current network");
            return Ok(None);
        };
        self.provider()?
            .switch_chain(chain_id)
            .await
            .map_err(|e| BridgeError::NetworkSwitchFailed(e.to_string()))?;
        Ok(Some(chain_id.to_string()))
    }

    fn token_allowance(&self) -> Option<&dyn TokenAllowance> {
        Some(self)
    }

    async fn sign_and_submit(
        &self,
        prepared: &PreparedTransaction,
        _ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<TransactionId> {
        let payload: ContractCallPayload = prepared.payload()?;
        let request = EvmTransactionRequest {
            from: None,
            to: payload.to.clone(),
            data: payload.data(),
            value: payload.value_hex()?,
        };
        let hash = self
            .provider()?
            .send_transaction(&request)
            .await
            .map_err(|e| e.into_signing_error(ChainFamily::Evm))?;
        Ok(TransactionId(hash))
    }

    fn confirms_inclusion(&self) -> bool {
        true
    }

    async fn await_inclusion(&self, tx: &TransactionId, _ctx: &SubmissionContext<'_>) -> BridgeResult<()> {
        let status = self
            .provider()?
            .wait_for_transaction(tx.as_str())
            .await
            .map_err(|e| BridgeError::TransactionError(e.to_string()))?;
        match status {
            InclusionStatus::Included => Ok(()),
            InclusionStatus::Reverted => {
                Err(BridgeError::TransactionError(format!("transaction {} reverted", tx)))
            }
        }
    }
}

#[async_trait]
impl TokenAllowance for EvmWallet {
    async fn allowance(&self, token: &str, owner: &str, spender: &str) -> BridgeResult<U256> {
        let call = EvmCall {
            to: token.to_string(),
            data: abi::to_hex_data(&abi::encode_allowance(owner, spender)?),
        };
        let raw = self
            .provider()?
            .call(&call)
            .await
            .map_err(|e| BridgeError::ApprovalFailed(e.to_string()))?;
        abi::decode_uint256(&raw)
    }

    async fn approve(&self, token: &str, _owner: &str, spender: &str, amount: U256) -> BridgeResult<TransactionId> {
        let request = EvmTransactionRequest {
            from: None,
            to: token.to_string(),
            data: abi::to_hex_data(&abi::encode_approve(spender, amount)?),
            value: "0x0".to_string(),
        };
        let hash = self
            .provider()?
            .send_transaction(&request)
            .await
            .map_err(|e| e.into_signing_error(ChainFamily::Evm))?;
        info!(tx_hash = %hash, token = %token, "Approve transaction sent");
        Ok(TransactionId(hash))
    }

    async fn wait_for_inclusion(&self, tx: &TransactionId) -> BridgeResult<()> {
        match self.provider()?.wait_for_transaction(tx.as_str()).await {
            Ok(InclusionStatus::Included) => Ok(()),
            Ok(InclusionStatus::Reverted) => {
                Err(BridgeError::ApprovalFailed(format!("approve transaction {} reverted", tx)))
            }
            Err(e) => Err(BridgeError::ApprovalFailed(e.to_string())),
        }
    }
}
