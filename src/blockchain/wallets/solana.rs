use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::require;
use crate::blockchain::codec::solana::{normalize_base58_signature, signature_to_base58, VersionedTransaction};
use crate::blockchain::providers::{SignatureValue, SolanaProvider, SolanaSignatureResponse};
use crate::blockchain::traits::{SubmissionContext, WalletAdapter};
use crate::core::domain::{AccountHandle, ChainFamily, PreparedTransaction, TransactionId};
use crate::core::errors::BridgeResult;

pub struct SolanaWallet {
    provider: Option<Arc<dyn SolanaProvider>>,
}

impl SolanaWallet {
    pub fn new(provider: Option<Arc<dyn SolanaProvider>>) -> Self {
        Self { provider }
    }
}

/// Canonical base58 form of whatever shape the wallet returned.
pub fn normalize_signature(response: &SolanaSignatureResponse) -> BridgeResult<String> {
    match response {
        SolanaSignatureResponse::Structured { signature: SignatureValue::Text(text) } => {
            normalize_base58_signature(text)
        }
        SolanaSignatureResponse::Structured { signature: SignatureValue::Bytes(bytes) } => {
            signature_to_base58(bytes)
        }
        SolanaSignatureResponse::Raw(text) => normalize_base58_signature(text),
    }
}

#[async_trait]
impl WalletAdapter for SolanaWallet {
    fn family(&self) -> ChainFamily {
        ChainFamily::Solana
    }

    async fn connect(&self, _ctx: &SubmissionContext<'_>) -> BridgeResult<AccountHandle> {
        let address = require(&self.provider, ChainFamily::Solana)?
            .connect()
            .await
            .map_err(|e| e.into_signing_error(ChainFamily::Solana))?;
        Ok(AccountHandle { family: ChainFamily::Solana, address })
    }

    async fn sign_and_submit(
        &self,
        prepared: &PreparedTransaction,
        _ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<TransactionId> {
        let tx = VersionedTransaction::from_base64(prepared.payload_str()?)?;
        debug!(
            versioned = tx.is_versioned(),
            signatures = tx.signatures.len(),
            "Decoded Solana transaction"
        );

        let response = require(&self.provider, ChainFamily::Solana)?
            .sign_and_send_transaction(&tx)
            .await
            .map_err(|e| e.into_signing_error(ChainFamily::Solana))?;
        Ok(TransactionId(normalize_signature(&response)?))
    }
}
