//! Wallet provider capabilities, one trait per chain family.
//!
//! These stand in for the wallets a browser injects (MetaMask, UniSat,
//! Phantom, Lace, Keplr, TronLink, VeWorld). They are opaque: the adapters in
//! `blockchain::wallets` only ever call the methods below.

use async_trait::async_trait;
use ethers::abi::{Function, Token};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::codec::cosmos::CosmosFee;
use super::codec::solana::VersionedTransaction;
use super::traits::ProviderError;
use crate::core::config::CosmosChainEndpoint;
use crate::core::domain::Network;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Outcome of waiting for a transaction on its source chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InclusionStatus {
    Included,
    Reverted,
}

/// `eth_sendTransaction` parameters; hex-encoded quantities and data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvmTransactionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    pub data: String,
    pub value: String,
}

/// Read-only `eth_call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvmCall {
    pub to: String,
    pub data: String,
}

#[async_trait]
pub trait EvmProvider: Send + Sync {
    async fn request_accounts(&self) -> ProviderResult<Vec<String>>;
    /// `wallet_switchEthereumChain` with a `0x` hex chain id.
    async fn switch_chain(&self, chain_id: &str) -> ProviderResult<()>;
    async fn call(&self, call: &EvmCall) -> ProviderResult<Vec<u8>>;
    /// Returns the transaction hash without waiting for inclusion.
    async fn send_transaction(&self, tx: &EvmTransactionRequest) -> ProviderResult<String>;
    async fn wait_for_transaction(&self, tx_hash: &str) -> ProviderResult<InclusionStatus>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UtxoNetworkMode {
    Livenet,
    Testnet,
}

impl UtxoNetworkMode {
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => UtxoNetworkMode::Livenet,
            Network::Testnet => UtxoNetworkMode::Testnet,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UtxoNetworkMode::Livenet => "livenet",
            UtxoNetworkMode::Testnet => "testnet",
        }
    }
}

#[async_trait]
pub trait UtxoProvider: Send + Sync {
    async fn request_accounts(&self) -> ProviderResult<Vec<String>>;
    async fn switch_network(&self, mode: UtxoNetworkMode) -> ProviderResult<()>;
    /// Signs and broadcasts in one call; returns the txid.
    async fn send_bitcoin(
        &self,
        to: &str,
        satoshis: u64,
        memo: Option<&str>,
    ) -> ProviderResult<String>;
}

/// Signature as returned by a Solana wallet: either `{ signature }` or a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SolanaSignatureResponse {
    Structured { signature: SignatureValue },
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SignatureValue {
    Text(String),
    Bytes(Vec<u8>),
}

#[async_trait]
pub trait SolanaProvider: Send + Sync {
    /// Returns the connected public key (base58).
    async fn connect(&self) -> ProviderResult<String>;
    async fn sign_and_send_transaction(
        &self,
        tx: &VersionedTransaction,
    ) -> ProviderResult<SolanaSignatureResponse>;
}

#[async_trait]
pub trait CardanoProvider: Send + Sync {
    async fn enable(&self) -> ProviderResult<()>;
    /// Returns a CBOR hex witness set over the transaction body.
    async fn sign_tx(&self, tx_hex: &str, partial_sign: bool) -> ProviderResult<String>;
    /// Submits a fully signed CBOR hex transaction; returns the tx hash.
    async fn submit_tx(&self, signed_tx_hex: &str) -> ProviderResult<String>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPriceStep {
    pub low: f64,
    pub average: f64,
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeCurrency {
    pub coin_minimal_denom: String,
    pub gas_price_step: Option<GasPriceStep>,
}

/// Chain description as reported by the wallet (without endpoints).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmosChainInfo {
    pub chain_id: String,
    pub fee_currencies: Vec<FeeCurrency>,
}

#[async_trait]
pub trait CosmosProvider: Send + Sync {
    async fn chain_infos(&self) -> ProviderResult<Vec<CosmosChainInfo>>;
    /// Bech32 address of the wallet key for `chain_name`.
    async fn get_key(&self, chain_name: &str) -> ProviderResult<String>;
    async fn simulate(
        &self,
        endpoint: &CosmosChainEndpoint,
        signer: &str,
        messages: &[Value],
        memo: &str,
    ) -> ProviderResult<u64>;
    async fn get_height(&self, endpoint: &CosmosChainEndpoint) -> ProviderResult<u64>;
    /// Broadcasts with sync mode: acknowledged by the node, not yet included.
    #[allow(clippy::too_many_arguments)]
    async fn sign_and_broadcast_sync(
        &self,
        endpoint: &CosmosChainEndpoint,
        signer: &str,
        messages: &[Value],
        fee: &CosmosFee,
        memo: &str,
        timeout_height: u64,
    ) -> ProviderResult<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TronAuthorization {
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TronSendParams {
    pub fee_limit: u64,
    pub call_value: u64,
    pub should_poll_response: bool,
    #[serde(rename = "keepTxID")]
    pub keep_tx_id: bool,
}

/// A contract invocation with already-typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct TronContractCall {
    pub contract: String,
    pub function: Function,
    pub args: Vec<Token>,
    pub params: TronSendParams,
}

#[async_trait]
pub trait TronProvider: Send + Sync {
    /// True when the wallet already holds an authorization for this site.
    async fn is_ready(&self) -> bool;
    async fn request_accounts(&self) -> ProviderResult<TronAuthorization>;
    /// Returns the txid.
    async fn trigger_contract(&self, call: &TronContractCall) -> ProviderResult<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VeChainClause {
    pub to: String,
    pub value: String,
    pub data: String,
}

/// Handle to a signing request awaiting the wallet's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VeChainSigningRequest {
    pub id: String,
}

#[async_trait]
pub trait VeChainSession: Send + Sync {
    fn account(&self) -> &str;
    async fn sign(
        &self,
        clauses: &[VeChainClause],
        signer: &str,
    ) -> ProviderResult<VeChainSigningRequest>;
    /// Completes the handshake; returns the txid.
    async fn request(&self, pending: VeChainSigningRequest) -> ProviderResult<String>;
    async fn call(&self, clause: &VeChainClause) -> ProviderResult<Vec<u8>>;
    async fn wait_for_transaction(&self, txid: &str) -> ProviderResult<InclusionStatus>;
}

#[async_trait]
pub trait VeChainProvider: Send + Sync {
    async fn connect(&self, network: Network) -> ProviderResult<Arc<dyn VeChainSession>>;
}
