use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::require;
use crate::blockchain::codec::cardano::{assemble_signed_transaction, decode_hex};
use crate::blockchain::providers::CardanoProvider;
use crate::blockchain::traits::{SubmissionContext, WalletAdapter};
use crate::core::domain::{AccountHandle, ChainFamily, PreparedTransaction, TransactionId};
use crate::core::errors::{BridgeError, BridgeResult};

pub struct CardanoWallet {
    provider: Option<Arc<dyn CardanoProvider>>,
}

impl CardanoWallet {
    pub fn new(provider: Option<Arc<dyn CardanoProvider>>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl WalletAdapter for CardanoWallet {
    fn family(&self) -> ChainFamily {
        ChainFamily::Cardano
    }

    async fn connect(&self, ctx: &SubmissionContext<'_>) -> BridgeResult<AccountHandle> {
        require(&self.provider, ChainFamily::Cardano)?
            .enable()
            .await
            .map_err(|e| e.into_signing_error(ChainFamily::Cardano))?;
        Ok(AccountHandle { family: ChainFamily::Cardano, address: ctx.request.from_account.clone() })
    }

    async fn sign_and_submit(
        &self,
        prepared: &PreparedTransaction,
        _ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<TransactionId> {
        let provider = require(&self.provider, ChainFamily::Cardano)?;
        let tx_hex = prepared.payload_str()?;
        let original = decode_hex("Cardano tx", tx_hex)?;

        let witness_hex = provider
            .sign_tx(tx_hex.trim(), true)
            .await
            .map_err(|e| e.into_signing_error(ChainFamily::Cardano))?;
        let witness_set = decode_hex("witness set", &witness_hex)
            .map_err(|e| BridgeError::SigningFailed(e.to_string()))?;

        let signed = assemble_signed_transaction(&original, &witness_set)?;
        debug!(len = signed.len() * 2, "Reassembled signed Cardano transaction");

        let hash = provider
            .submit_tx(&hex::encode(&signed))
            .await
            .map_err(|e| e.into_signing_error(ChainFamily::Cardano))?;
        info!(tx_hash = %hash, "Cardano transaction submitted");
        Ok(TransactionId(hash))
    }
}
