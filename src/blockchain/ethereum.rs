//! EVM wallet backed by a local private key and JSON-RPC endpoints.
//!
//! Stands in for an injected browser wallet when the client runs headless:
//! `switch_chain` selects the RPC endpoint configured for the chain id and
//! checks the node agrees about which chain it serves.

use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, H256, U256, U64},
};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use std::{collections::BTreeMap, str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use super::providers::{EvmCall, EvmProvider, EvmTransactionRequest, InclusionStatus, ProviderResult};
use super::traits::ProviderError;
use crate::core::config::EvmConfig;
use crate::core::domain::normalize_chain_id;

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

#[derive(Clone)]
struct ActiveChain {
    chain_id: u64,
    client: Arc<SignerClient>,
}

pub struct LocalKeyEvmProvider {
    wallet: LocalWallet,
    rpc_urls: BTreeMap<String, String>,
    confirmations: usize,
    receipt_timeout: Duration,
    active: RwLock<Option<ActiveChain>>,
}

impl std::fmt::Debug for LocalKeyEvmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyEvmProvider")
            .field("address", &self.wallet.address())
            .field("chains", &self.rpc_urls.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn failed(msg: impl std::fmt::Display) -> ProviderError {
    ProviderError::Failed(msg.to_string())
}

impl LocalKeyEvmProvider {
    /// Builds the provider from a hex private key. Key material is never logged.
    pub fn from_private_key(key: &SecretString, config: &EvmConfig) -> ProviderResult<Self> {
        let wallet = LocalWallet::from_str(key.expose_secret().trim())
            .map_err(|e| failed(format!("Invalid private key: {}", e)))?;

        let mut rpc_urls = BTreeMap::new();
        for (chain_id, url) in &config.rpc_urls {
            let normalized =
                normalize_chain_id(chain_id).map_err(|e| failed(format!("evm.rpc_urls: {}", e)))?;
            rpc_urls.insert(normalized, url.trim().to_string());
        }

        info!(address = ?wallet.address(), chains = rpc_urls.len(), "Local EVM signer ready");
        Ok(Self {
            wallet,
            rpc_urls,
            confirmations: config.confirmations.max(1),
            receipt_timeout: config.receipt_timeout(),
            active: RwLock::new(None),
        })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Chain id the signer is currently bound to.
    pub fn active_chain_id(&self) -> Option<u64> {
        self.active.read().as_ref().map(|a| a.chain_id)
    }

    fn http_provider(rpc_url: &str) -> ProviderResult<Provider<Http>> {
        let parsed_url = reqwest::Url::parse(rpc_url)
            .map_err(|e| failed(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;

        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(10));
        if let Ok(proxy) = std::env::var("HTTPS_PROXY").or_else(|_| std::env::var("HTTP_PROXY")) {
            if let Ok(p) = reqwest::Proxy::all(proxy) {
                builder = builder.proxy(p);
            }
        }
        let client = builder.build().map_err(|e| failed(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Provider::new(Http::new_with_client(parsed_url, client)))
    }

    fn active(&self) -> ProviderResult<ActiveChain> {
        self.active
            .read()
            .clone()
            .ok_or_else(|| failed("no chain selected; the prepared transaction carried no chainId"))
    }
}

fn parse_address(label: &str, value: &str) -> ProviderResult<Address> {
    Address::from_str(value.trim()).map_err(|e| failed(format!("Invalid {} address '{}': {}", label, value, e)))
}

fn parse_data(value: &str) -> ProviderResult<Bytes> {
    Bytes::from_str(value.trim()).map_err(|e| failed(format!("Invalid call data: {}", e)))
}

fn parse_quantity(value: &str) -> ProviderResult<U256> {
    let v = value.trim();
    let parsed = match v.strip_prefix("0x") {
        Some("") => Some(U256::zero()),
        Some(hex_part) => U256::from_str_radix(hex_part, 16).ok(),
        None if v.is_empty() => Some(U256::zero()),
        None => U256::from_dec_str(v).ok(),
    };
    parsed.ok_or_else(|| failed(format!("Invalid value '{}'", value)))
}

#[async_trait]
impl EvmProvider for LocalKeyEvmProvider {
    async fn request_accounts(&self) -> ProviderResult<Vec<String>> {
        Ok(vec![ethers::utils::to_checksum(&self.wallet.address(), None)])
    }

    async fn switch_chain(&self, chain_id: &str) -> ProviderResult<()> {
        let normalized = normalize_chain_id(chain_id).map_err(failed)?;
        let wanted = u64::from_str_radix(normalized.trim_start_matches("0x"), 16).map_err(failed)?;
        if self.active_chain_id() == Some(wanted) {
            debug!(chain_id = %normalized, "Already on requested chain");
            return Ok(());
        }

        let rpc_url = self
            .rpc_urls
            .get(&normalized)
            .ok_or_else(|| failed(format!("no RPC endpoint configured for chain {}", normalized)))?;
        let provider = Self::http_provider(rpc_url)?;

        let reported = provider
            .get_chainid()
            .await
            .map_err(|e| failed(format!("Failed to get chain ID from {}: {}", rpc_url, e)))?;
        if reported != U256::from(wanted) {
            return Err(failed(format!(
                "RPC {} serves chain {} but {} was requested",
                rpc_url, reported, normalized
            )));
        }

        let client = SignerMiddleware::new(provider, self.wallet.clone().with_chain_id(wanted));
        *self.active.write() = Some(ActiveChain { chain_id: wanted, client: Arc::new(client) });
        info!(chain_id = %normalized, "Switched signer chain");
        Ok(())
    }

    async fn call(&self, call: &EvmCall) -> ProviderResult<Vec<u8>> {
        let active = self.active()?;
        let tx: TypedTransaction = TransactionRequest::new()
            .from(self.wallet.address())
            .to(parse_address("contract", &call.to)?)
            .data(parse_data(&call.data)?)
            .into();
        let out = active.client.call(&tx, None).await.map_err(|e| failed(format!("eth_call failed: {}", e)))?;
        Ok(out.to_vec())
    }

    async fn send_transaction(&self, tx: &EvmTransactionRequest) -> ProviderResult<String> {
        let active = self.active()?;
        if let Some(from) = &tx.from {
            let from = parse_address("sender", from)?;
            if from != self.wallet.address() {
                return Err(ProviderError::Rejected(format!(
                    "sender {:?} is not the local signer {:?}",
                    from,
                    self.wallet.address()
                )));
            }
        }

        let request = TransactionRequest::new()
            .from(self.wallet.address())
            .to(parse_address("recipient", &tx.to)?)
            .data(parse_data(&tx.data)?)
            .value(parse_quantity(&tx.value)?);

        let pending = active
            .client
            .send_transaction(request, None)
            .await
            .map_err(|e| failed(format!("Failed to send transaction: {}", e)))?;
        let tx_hash = format!("{:#x}", pending.tx_hash());
        info!(tx_hash = %tx_hash, chain_id = active.chain_id, "Transaction sent");
        Ok(tx_hash)
    }

    async fn wait_for_transaction(&self, tx_hash: &str) -> ProviderResult<InclusionStatus> {
        let active = self.active()?;
        let hash = H256::from_str(tx_hash.trim())
            .map_err(|e| failed(format!("Invalid transaction hash: {}", e)))?;

        let pending = PendingTransaction::new(hash, active.client.provider()).confirmations(self.confirmations);
        let receipt = match tokio::time::timeout(self.receipt_timeout, pending).await {
            Ok(Ok(Some(receipt))) => receipt,
            Ok(Ok(None)) => return Err(failed(format!("transaction {} was dropped", tx_hash))),
            Ok(Err(e)) => return Err(failed(format!("Failed to get receipt for {}: {}", tx_hash, e))),
            Err(_) => {
                warn!(tx_hash = %tx_hash, "Receipt wait timed out");
                return Err(failed(format!(
                    "no receipt for {} after {:?}",
                    tx_hash, self.receipt_timeout
                )));
            }
        };

        if receipt.status == Some(U64::from(1)) {
            Ok(InclusionStatus::Included)
        } else {
            Ok(InclusionStatus::Reverted)
        }
    }
}
