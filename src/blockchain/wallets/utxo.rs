use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::require;
use crate::blockchain::providers::{UtxoNetworkMode, UtxoProvider};
use crate::blockchain::traits::{SubmissionContext, WalletAdapter};
use crate::core::domain::{AccountHandle, ChainFamily, PreparedTransaction, TransactionId};
use crate::core::errors::{BridgeError, BridgeResult};

/// `{toAccount, value, memo?}`; value in satoshis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoTxPayload {
    pub to_account: String,
    pub value: Value,
    #[serde(default)]
    pub memo: Option<String>,
}

impl UtxoTxPayload {
    pub fn satoshis(&self) -> BridgeResult<u64> {
        let parsed = match &self.value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| BridgeError::invalid_payload(format!("invalid BTC value {}", self.value)))
    }
}

pub struct UtxoWallet {
    provider: Option<Arc<dyn UtxoProvider>>,
}

impl UtxoWallet {
    pub fn new(provider: Option<Arc<dyn UtxoProvider>>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl WalletAdapter for UtxoWallet {
    fn family(&self) -> ChainFamily {
        ChainFamily::Utxo
    }

    async fn connect(&self, ctx: &SubmissionContext<'_>) -> BridgeResult<AccountHandle> {
        let provider = require(&self.provider, ChainFamily::Utxo)?;
        let accounts =
            provider.request_accounts().await.map_err(|e| e.into_signing_error(ChainFamily::Utxo))?;

        let mode = UtxoNetworkMode::for_network(ctx.network());
        debug!(mode = mode.as_str(), "Setting BTC wallet network");
        provider.switch_network(mode).await.map_err(|e| e.into_signing_error(ChainFamily::Utxo))?;

        let address = accounts
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::SigningFailed("wallet exposed no accounts".to_string()))?;
        Ok(AccountHandle { family: ChainFamily::Utxo, address })
    }

    async fn sign_and_submit(
        &self,
        prepared: &PreparedTransaction,
        _ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<TransactionId> {
        let payload: UtxoTxPayload = prepared.payload()?;
        let satoshis = payload.satoshis()?;
        let txid = require(&self.provider, ChainFamily::Utxo)?
            .send_bitcoin(&payload.to_account, satoshis, payload.memo.as_deref())
            .await
            .map_err(|e| e.into_signing_error(ChainFamily::Utxo))?;
        Ok(TransactionId(txid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::providers::ProviderResult;
    use crate::blockchain::wallets::tests::{prepared, request};
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct FakeUniSat {
        accounts: Vec<String>,
        modes: Mutex<Vec<UtxoNetworkMode>>,
        sent: Mutex<Vec<(String, u64, Option<String>)>>,
    }

    #[async_trait]
    impl UtxoProvider for FakeUniSat {
        async fn request_accounts(&self) -> ProviderResult<Vec<String>> {
            Ok(self.accounts.clone())
        }

        async fn switch_network(&self, mode: UtxoNetworkMode) -> ProviderResult<()> {
            self.modes.lock().push(mode);
            Ok(())
        }

        async fn send_bitcoin(&self, to: &str, satoshis: u64, memo: Option<&str>) -> ProviderResult<String> {
            self.sent.lock().push((to.to_string(), satoshis, memo.map(str::to_string)));
            Ok("btctxid".to_string())
        }
    }

    fn unisat() -> Arc<FakeUniSat> {
        Arc::new(FakeUniSat { accounts: vec!["tb1qsender".to_string()], ..Default::default() })
    }

    #[tokio::test]
    async fn connect_matches_wallet_network_to_request() {
        let cancel = CancellationToken::new();
        for (testnet, mode) in [(true, UtxoNetworkMode::Testnet), (false, UtxoNetworkMode::Livenet)] {
            let provider = unisat();
            let wallet = UtxoWallet::new(Some(provider.clone()));
            let mut req = request("BTC");
            req.is_testnet = testnet;

            let account = wallet.connect(&SubmissionContext::new(&req, &cancel)).await.unwrap();

            assert_eq!(account.address, "tb1qsender");
            assert_eq!(*provider.modes.lock(), vec![mode]);
        }
    }

    #[tokio::test]
    async fn wallet_without_accounts_cannot_connect() {
        let wallet = UtxoWallet::new(Some(Arc::new(FakeUniSat::default())));
        let req = request("BTC");
        let cancel = CancellationToken::new();
        let err = wallet.connect(&SubmissionContext::new(&req, &cancel)).await.unwrap_err();
        assert!(matches!(err, BridgeError::SigningFailed(_)));
    }

    #[tokio::test]
    async fn sends_satoshis_with_memo() {
        let provider = unisat();
        let wallet = UtxoWallet::new(Some(provider.clone()));
        let req = request("BTC");
        let cancel = CancellationToken::new();
        let tx = prepared(json!({ "toAccount": "bc1qbridge", "value": "15000", "memo": "0xfeed" }));

        let txid = wallet.sign_and_submit(&tx, &SubmissionContext::new(&req, &cancel)).await.unwrap();

        assert_eq!(txid, TransactionId("btctxid".into()));
        assert_eq!(*provider.sent.lock(), vec![("bc1qbridge".to_string(), 15_000, Some("0xfeed".to_string()))]);
    }

    #[test]
    fn satoshis_from_number_or_string() {
        let p: UtxoTxPayload =
            serde_json::from_value(json!({ "toAccount": "bc1q", "value": 15000, "memo": "0x01" })).unwrap();
        assert_eq!(p.satoshis().unwrap(), 15_000);
        let p: UtxoTxPayload = serde_json::from_value(json!({ "toAccount": "bc1q", "value": "42" })).unwrap();
        assert_eq!(p.satoshis().unwrap(), 42);
        assert_eq!(p.memo, None);
        let p: UtxoTxPayload = serde_json::from_value(json!({ "toAccount": "bc1q", "value": "0.1" })).unwrap();
        assert!(matches!(p.satoshis(), Err(BridgeError::InvalidPayload(_))));
    }
}
