use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::require;
use crate::blockchain::codec::cosmos::{adjusted_gas, calculate_fee, CosmosTxPayload, GasPrice};
use crate::blockchain::providers::CosmosProvider;
use crate::blockchain::traits::{SubmissionContext, WalletAdapter};
use crate::core::config::{CosmosChainEndpoint, CosmosConfig};
use crate::core::domain::{AccountHandle, ChainFamily, PreparedTransaction, TransactionId};
use crate::core::errors::{BridgeError, BridgeResult};

const FAMILY: ChainFamily = ChainFamily::Cosmos;

pub struct CosmosWallet {
    provider: Option<Arc<dyn CosmosProvider>>,
    config: CosmosConfig,
}

impl CosmosWallet {
    pub fn new(provider: Option<Arc<dyn CosmosProvider>>, config: CosmosConfig) -> Self {
        Self { provider, config }
    }

    fn endpoint(&self, ctx: &SubmissionContext<'_>) -> BridgeResult<&CosmosChainEndpoint> {
        self.config.endpoint(ctx.request.from_chain, ctx.network())
    }

    /// Configured gas price, else the wallet's average step in its first fee currency.
    async fn gas_price(&self, provider: &dyn CosmosProvider, chain_name: &str) -> BridgeResult<GasPrice> {
        if let Some(price) = self.config.gas_price.as_deref() {
            return price.parse();
        }
        let chains = provider.chain_infos().await.map_err(|e| e.into_signing_error(FAMILY))?;
        let info = chains.iter().find(|c| c.chain_id == chain_name).ok_or_else(|| {
            BridgeError::ConfigError(format!("Keplr wallet: no support for chain: {}", chain_name))
        })?;
        let currency = info.fee_currencies.first().ok_or_else(|| {
            BridgeError::ConfigError(format!("{} reports no fee currency", chain_name))
        })?;
        let step = currency.gas_price_step.as_ref().ok_or_else(|| {
            BridgeError::ConfigError(format!("{} reports no gas price step", chain_name))
        })?;
        format!("{}{}", step.average, currency.coin_minimal_denom).parse()
    }
}

#[async_trait]
impl WalletAdapter for CosmosWallet {
    fn family(&self) -> ChainFamily {
        FAMILY
    }

    async fn connect(&self, ctx: &SubmissionContext<'_>) -> BridgeResult<AccountHandle> {
        let provider = require(&self.provider, FAMILY)?;
        let endpoint = self.endpoint(ctx)?;
        let address =
            provider.get_key(&endpoint.chain_name).await.map_err(|e| e.into_signing_error(FAMILY))?;
        Ok(AccountHandle { family: FAMILY, address })
    }

    async fn sign_and_submit(
        &self,
        prepared: &PreparedTransaction,
        ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<TransactionId> {
        let provider = require(&self.provider, FAMILY)?;
        let endpoint = self.endpoint(ctx)?;
        let tx = CosmosTxPayload::from_base64(prepared.payload_str()?)?;

        let gas_price = self.gas_price(provider.as_ref(), &endpoint.chain_name).await?;
        let signer = provider.get_key(&endpoint.chain_name).await.map_err(|e| e.into_signing_error(FAMILY))?;

        let simulated = provider
            .simulate(endpoint, &signer, &tx.messages, tx.memo())
            .await
            .map_err(|e| e.into_signing_error(FAMILY))?;
        let gas_limit = adjusted_gas(simulated, self.config.gas_multiplier)?;
        let fee = calculate_fee(gas_limit, &gas_price)?;
        debug!(simulated, gas_limit, gas_price = %gas_price, "Cosmos fee computed");

        let timeout_height = match self.config.timeout_height_offset {
            Some(offset) if offset > 0 => {
                let height = provider.get_height(endpoint).await.map_err(|e| e.into_signing_error(FAMILY))?;
                height.saturating_add(offset)
            }
            _ => 0,
        };

        let hash = provider
            .sign_and_broadcast_sync(endpoint, &signer, &tx.messages, &fee, tx.memo(), timeout_height)
            .await
            .map_err(|e| e.into_signing_error(FAMILY))?;
        info!(tx_hash = %hash, chain = %endpoint.chain_name, timeout_height, "Cosmos transaction broadcast");
        Ok(TransactionId(hash))
    }
}
