//! Transaction orchestrator
//!
//! Drives one bridge submission end to end: connect the source wallet, ask
//! the bridge API for a prepared transaction, negotiate the allowance, sign
//! and submit, then poll until the destination leg settles.
//!
//! Steps are strictly sequential. Every transition is written to the
//! operation log before the next step starts, and observers can read the
//! state, log and status view while a submission is running.

mod polling;
pub mod state;
mod steps;

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::api::{BridgeApi, HttpBridgeApi};
use crate::audit::OperationLog;
use crate::blockchain::{AllowanceNegotiator, AllowanceOutcome, ProviderRegistry, WalletAdapters};
use crate::core::config::BridgeClientConfig;
use crate::core::domain::{BridgeRequest, TransactionId};
use crate::core::errors::{BridgeError, BridgeResult};
use crate::core::notify::{Notice, Notifier};

pub use state::{Stage, StatusView, SubmissionState};
use state::StateMachine;

/// Result of a settled submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub submission_id: Uuid,
    pub tx_hash: TransactionId,
    /// Status reads it took to see the transfer settle.
    pub polls: u32,
    pub allowance: Option<AllowanceOutcome>,
}

pub struct Orchestrator {
    config: BridgeClientConfig,
    api: Arc<dyn BridgeApi>,
    wallets: WalletAdapters,
    negotiator: AllowanceNegotiator,
    notifier: Arc<dyn Notifier>,
    log: OperationLog,
    machine: Arc<Mutex<StateMachine>>,
}

impl Orchestrator {
    pub fn new(
        config: BridgeClientConfig,
        api: Arc<dyn BridgeApi>,
        wallets: WalletAdapters,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let negotiator = AllowanceNegotiator::new(config.approval.policy);
        Self {
            config,
            api,
            wallets,
            negotiator,
            notifier,
            log: OperationLog::new(),
            machine: Arc::new(Mutex::new(StateMachine::new())),
        }
    }

    /// Builds the HTTP bridge client and the adapters over `registry`.
    pub fn from_registry(
        config: BridgeClientConfig,
        registry: &ProviderRegistry,
        notifier: Arc<dyn Notifier>,
    ) -> BridgeResult<Self> {
        let api = Arc::new(HttpBridgeApi::new(&config.api)?);
        let wallets = WalletAdapters::new(registry, &config);
        Ok(Self::new(config, api, wallets, notifier))
    }

    /// Shares a log owned by the caller, e.g. one a renderer already subscribed to.
    pub fn with_log(mut self, log: OperationLog) -> Self {
        self.log = log;
        self
    }

    pub fn config(&self) -> &BridgeClientConfig {
        &self.config
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub fn state(&self) -> SubmissionState {
        self.machine.lock().current().clone()
    }

    /// States visited by the current (or last) submission.
    pub fn history(&self) -> Vec<SubmissionState> {
        self.machine.lock().history().to_vec()
    }

    pub fn status_view(&self) -> StatusView {
        self.machine.lock().status_view()
    }

    /// Runs one submission to settlement.
    ///
    /// Rejected with `SubmissionInProgress` while another submission is
    /// active; the running submission and its log are left untouched.
    pub async fn submit(
        &self,
        request: BridgeRequest,
        cancel: CancellationToken,
    ) -> BridgeResult<SubmissionOutcome> {
        self.machine.lock().begin()?;
        self.log.clear();

        let submission_id = Uuid::new_v4();
        let span = info_span!(
            "submission",
            id = %submission_id,
            from = %request.from_chain,
            to = %request.to_chain,
            testnet = request.is_testnet,
        );

        match self.run(&request, &cancel).instrument(span).await {
            Ok(run) => {
                info!(%submission_id, tx = %run.tx_hash, polls = run.polls, "Submission settled");
                self.notifier.notify(&Notice::Success("Success".to_string()));
                Ok(SubmissionOutcome {
                    submission_id,
                    tx_hash: run.tx_hash,
                    polls: run.polls,
                    allowance: run.allowance,
                })
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn fail(&self, err: &BridgeError) {
        let (stage, tx_hash) = {
            let mut machine = self.machine.lock();
            let tx_hash = machine.current().tx_hash().cloned();
            (machine.fail(err.clone()), tx_hash)
        };
        warn!(stage = %stage, kind = err.kind(), error = %err, "Submission failed");

        let mut payload = json!({
            "kind": err.kind(),
            "stage": stage.as_str(),
            "error": err.to_string(),
        });
        if let (Some(tx), Value::Object(map)) = (tx_hash, &mut payload) {
            map.insert("txHash".to_string(), json!(tx.as_str()));
            map.insert(
                "note".to_string(),
                json!("The transaction was submitted on the source chain; only settlement is unconfirmed."),
            );
        }
        let message = match err {
            BridgeError::ApiError(_) => "API Error:".to_string(),
            BridgeError::WalletNotFound { .. } => err.to_string(),
            _ => "Transaction Error:".to_string(),
        };
        self.log.error_with(message, payload);

        let notice = match err {
            BridgeError::WalletNotFound { .. } => Notice::Prompt(err.to_string()),
            _ => Notice::Error(err.to_string()),
        };
        self.notifier.notify(&notice);
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state())
            .field("wallets", &self.wallets)
            .field("log", &self.log)
            .finish()
    }
}
