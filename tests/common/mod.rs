// tests/common/mod.rs
// Shared fakes for orchestrator integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::U256;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use xchain_bridge_client::api::{BridgeApi, CreateTxResponse, StatusResponse};
use xchain_bridge_client::blockchain::providers::{
    CardanoProvider, EvmCall, EvmProvider, EvmTransactionRequest, InclusionStatus, ProviderResult,
};
use xchain_bridge_client::blockchain::{ProviderError, ProviderRegistry, WalletAdapters};
use xchain_bridge_client::core::config::BridgeClientConfig;
use xchain_bridge_client::core::domain::{BridgeForm, BridgeRequest, Network, TransactionId};
use xchain_bridge_client::core::errors::{BridgeError, BridgeResult};
use xchain_bridge_client::core::notify::{Notice, Notifier};
use xchain_bridge_client::core::orchestrator::Orchestrator;

pub const TOKEN: &str = "0x1111111111111111111111111111111111111111";
pub const SPENDER: &str = "0x2222222222222222222222222222222222222222";
pub const ROUTER: &str = "0x3333333333333333333333333333333333333333";
pub const OWNER: &str = "0x4444444444444444444444444444444444444444";

pub fn request(from_chain: &str, to_chain: &str) -> BridgeRequest {
    BridgeRequest::from_form(BridgeForm {
        from_chain: from_chain.to_string(),
        to_chain: to_chain.to_string(),
        from_account: OWNER.to_string(),
        from_token: TOKEN.to_string(),
        to_token: "0x0000000000000000000000000000000000000000".to_string(),
        to_account: OWNER.to_string(),
        amount: "1.5".to_string(),
        partner: None,
        is_testnet: false,
    })
    .unwrap()
}

pub fn status(state: &str) -> Value {
    json!({ "success": true, "data": { "status": state } })
}

/// Bridge API replaying scripted replies and recording what it was asked.
pub struct ScriptedApi {
    create: Mutex<Option<BridgeResult<Value>>>,
    statuses: Mutex<VecDeque<BridgeResult<Value>>>,
    pub create_calls: Mutex<Vec<BridgeRequest>>,
    pub status_calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new(create: BridgeResult<Value>, statuses: Vec<BridgeResult<Value>>) -> Arc<Self> {
        Arc::new(Self {
            create: Mutex::new(Some(create)),
            statuses: Mutex::new(statuses.into()),
            create_calls: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
        })
    }

    /// Re-arms the `createTx2` reply for another submission.
    pub fn rearm(&self, create: BridgeResult<Value>, statuses: Vec<BridgeResult<Value>>) {
        *self.create.lock() = Some(create);
        *self.statuses.lock() = statuses.into();
    }
}

#[async_trait]
impl BridgeApi for ScriptedApi {
    fn create_tx_endpoint(&self, _request: &BridgeRequest) -> String {
        "mock://bridge/createTx2".to_string()
    }

    fn status_endpoint(&self, _network: Network) -> String {
        "mock://bridge/status".to_string()
    }

    async fn create_transaction(&self, request: &BridgeRequest) -> BridgeResult<CreateTxResponse> {
        self.create_calls.lock().push(request.clone());
        let reply = self
            .create
            .lock()
            .take()
            .unwrap_or_else(|| Err(BridgeError::TransactionError("createTx2 not scripted".into())));
        let raw = reply?;
        let prepared = serde_json::from_value(raw["data"].clone())
            .map_err(|e| BridgeError::invalid_payload(e.to_string()))?;
        Ok(CreateTxResponse { prepared, raw })
    }

    async fn transaction_status(&self, tx: &TransactionId, _network: Network) -> BridgeResult<StatusResponse> {
        self.status_calls.lock().push(tx.to_string());
        let next = self.statuses.lock().pop_front().unwrap_or_else(|| Ok(status("Pending")));
        StatusResponse::from_value(next?)
    }
}

/// EVM wallet with a fixed allowance that records every request.
pub struct FakeEvm {
    pub allowance: U256,
    pub reverts: bool,
    pub switched: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<EvmTransactionRequest>>,
    pub calls: Mutex<Vec<EvmCall>>,
}

impl FakeEvm {
    pub fn new(allowance: u64) -> Arc<Self> {
        Arc::new(Self {
            allowance: U256::from(allowance),
            reverts: false,
            switched: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn reverting() -> Arc<Self> {
        Arc::new(Self {
            allowance: U256::zero(),
            reverts: true,
            switched: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl EvmProvider for FakeEvm {
    async fn request_accounts(&self) -> ProviderResult<Vec<String>> {
        Ok(vec![OWNER.to_string()])
    }

    async fn switch_chain(&self, chain_id: &str) -> ProviderResult<()> {
        if chain_id == "0xdead" {
            return Err(ProviderError::Rejected("unrecognized chain".into()));
        }
        self.switched.lock().push(chain_id.to_string());
        Ok(())
    }

    async fn call(&self, call: &EvmCall) -> ProviderResult<Vec<u8>> {
        self.calls.lock().push(call.clone());
        let mut word = [0u8; 32];
        self.allowance.to_big_endian(&mut word);
        Ok(word.to_vec())
    }

    async fn send_transaction(&self, tx: &EvmTransactionRequest) -> ProviderResult<String> {
        let mut sent = self.sent.lock();
        sent.push(tx.clone());
        Ok(format!("0xhash{}", sent.len()))
    }

    async fn wait_for_transaction(&self, _tx_hash: &str) -> ProviderResult<InclusionStatus> {
        if self.reverts {
            Ok(InclusionStatus::Reverted)
        } else {
            Ok(InclusionStatus::Included)
        }
    }
}

/// Cardano wallet returning a fixed witness set.
pub struct FakeCardano {
    pub witness_hex: String,
    pub signed_inputs: Mutex<Vec<(String, bool)>>,
    pub submitted: Mutex<Vec<String>>,
}

impl FakeCardano {
    pub fn new(witness_hex: String) -> Arc<Self> {
        Arc::new(Self { witness_hex, signed_inputs: Mutex::new(Vec::new()), submitted: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl CardanoProvider for FakeCardano {
    async fn enable(&self) -> ProviderResult<()> {
        Ok(())
    }

    async fn sign_tx(&self, tx_hex: &str, partial_sign: bool) -> ProviderResult<String> {
        self.signed_inputs.lock().push((tx_hex.to_string(), partial_sign));
        Ok(self.witness_hex.clone())
    }

    async fn submit_tx(&self, signed_tx_hex: &str) -> ProviderResult<String> {
        self.submitted.lock().push(signed_tx_hex.to_string());
        Ok("ada-tx-hash".to_string())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().push(notice.clone());
    }
}

pub fn fast_config() -> BridgeClientConfig {
    let mut config = BridgeClientConfig::default();
    config.polling.interval_ms = 1;
    config
}

pub fn orchestrator(
    api: Arc<ScriptedApi>,
    registry: &ProviderRegistry,
    config: BridgeClientConfig,
) -> (Orchestrator, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let wallets = WalletAdapters::new(registry, &config);
    (Orchestrator::new(config, api, wallets, notifier.clone()), notifier)
}

pub fn messages(orchestrator: &Orchestrator) -> Vec<String> {
    orchestrator.log().entries().into_iter().map(|e| e.message).collect()
}
