use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::require;
use crate::blockchain::codec::tron::TronTxPayload;
use crate::blockchain::providers::{TronContractCall, TronProvider, TronSendParams};
use crate::blockchain::traits::{SubmissionContext, WalletAdapter};
use crate::core::config::TronConfig;
use crate::core::domain::{AccountHandle, ChainFamily, PreparedTransaction, TransactionId};
use crate::core::errors::{BridgeError, BridgeResult};

const AUTHORIZED: u32 = 200;

pub struct TronWallet {
    provider: Option<Arc<dyn TronProvider>>,
    config: TronConfig,
}

impl TronWallet {
    pub fn new(provider: Option<Arc<dyn TronProvider>>, config: TronConfig) -> Self {
        Self { provider, config }
    }
}

#[async_trait]
impl WalletAdapter for TronWallet {
    fn family(&self) -> ChainFamily {
        ChainFamily::Tron
    }

    async fn connect(&self, ctx: &SubmissionContext<'_>) -> BridgeResult<AccountHandle> {
        let provider = require(&self.provider, ChainFamily::Tron)?;
        if !provider.is_ready().await {
            debug!("Requesting TronLink authorization");
            let auth = provider
                .request_accounts()
                .await
                .map_err(|e| e.into_signing_error(ChainFamily::Tron))?;
            if auth.code != AUTHORIZED {
                return Err(BridgeError::UserRejected(format!(
                    "TronLink authorization failed: {}",
                    auth.message
                )));
            }
        }
        Ok(AccountHandle { family: ChainFamily::Tron, address: ctx.request.from_account.clone() })
    }

    async fn sign_and_submit(
        &self,
        prepared: &PreparedTransaction,
        _ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<TransactionId> {
        let payload: TronTxPayload = prepared.payload()?;
        let (function, args) = payload.prepare()?;
        let call = TronContractCall {
            contract: payload.to.clone(),
            function,
            args,
            params: TronSendParams {
                fee_limit: self.config.fee_limit_sun,
                call_value: payload.call_value()?,
                should_poll_response: self.config.poll_response,
                keep_tx_id: true,
            },
        };
        debug!(contract = %call.contract, function = %call.function.name, "Invoking Tron contract");

        let txid = require(&self.provider, ChainFamily::Tron)?
            .trigger_contract(&call)
            .await
            .map_err(|e| e.into_signing_error(ChainFamily::Tron))?;
        Ok(TransactionId(txid))
    }
}
