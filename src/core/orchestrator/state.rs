//! Submission lifecycle as an explicit state machine.

use serde::Serialize;
use std::fmt;

use crate::core::domain::TransactionId;
use crate::core::errors::{BridgeError, BridgeResult};

/// Step of the lifecycle a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Connecting,
    RequestingTx,
    Approving,
    Signing,
    Submitted,
    Polling,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Connecting => "connecting",
            Stage::RequestingTx => "requesting_tx",
            Stage::Approving => "approving",
            Stage::Signing => "signing",
            Stage::Submitted => "submitted",
            Stage::Polling => "polling",
        }
    }

    /// True once the transfer itself may be on chain.
    pub fn after_broadcast(&self) -> bool {
        matches!(self, Stage::Submitted | Stage::Polling)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only `Submitted`, `Polling` and `Settled` carry a transaction hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Connecting,
    RequestingTx,
    Approving,
    Signing,
    Submitted { tx_hash: TransactionId },
    Polling { tx_hash: TransactionId, attempts: u32 },
    Settled { tx_hash: TransactionId },
    Failed { stage: Stage, cause: BridgeError },
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "Idle",
            SubmissionState::Connecting => "Connecting",
            SubmissionState::RequestingTx => "RequestingTx",
            SubmissionState::Approving => "Approving",
            SubmissionState::Signing => "Signing",
            SubmissionState::Submitted { .. } => "Submitted",
            SubmissionState::Polling { .. } => "Polling",
            SubmissionState::Settled { .. } => "Settled",
            SubmissionState::Failed { .. } => "Failed",
        }
    }

    pub fn tx_hash(&self) -> Option<&TransactionId> {
        match self {
            SubmissionState::Submitted { tx_hash }
            | SubmissionState::Polling { tx_hash, .. }
            | SubmissionState::Settled { tx_hash } => Some(tx_hash),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Settled { .. } | SubmissionState::Failed { .. })
    }

    /// A submission is running: neither idle nor finished.
    pub fn is_active(&self) -> bool {
        !matches!(self, SubmissionState::Idle) && !self.is_terminal()
    }

    fn stage(&self) -> Stage {
        match self {
            SubmissionState::Idle => Stage::Idle,
            SubmissionState::Connecting => Stage::Connecting,
            SubmissionState::RequestingTx => Stage::RequestingTx,
            SubmissionState::Approving => Stage::Approving,
            SubmissionState::Signing => Stage::Signing,
            SubmissionState::Submitted { .. } => Stage::Submitted,
            SubmissionState::Polling { .. } | SubmissionState::Settled { .. } => Stage::Polling,
            SubmissionState::Failed { stage, .. } => *stage,
        }
    }

    fn can_advance_to(&self, next: &SubmissionState) -> bool {
        use SubmissionState as S;
        match (self, next) {
            (S::Connecting, S::RequestingTx)
            | (S::RequestingTx, S::Approving)
            | (S::RequestingTx, S::Signing)
            | (S::Approving, S::Signing)
            | (S::Signing, S::Submitted { .. }) => true,
            (S::Submitted { tx_hash: a }, S::Polling { tx_hash: b, attempts: 1 }) => a == b,
            (S::Polling { tx_hash: a, attempts: n }, S::Polling { tx_hash: b, attempts: m }) => {
                a == b && *m == n + 1
            }
            (S::Polling { tx_hash: a, .. }, S::Settled { tx_hash: b }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionState::Polling { attempts, .. } => write!(f, "Polling (attempt {})", attempts),
            SubmissionState::Failed { stage, .. } => write!(f, "Failed during {}", stage),
            other => f.write_str(other.name()),
        }
    }
}

/// Current state plus the states visited by the current submission.
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: SubmissionState,
    history: Vec<SubmissionState>,
    last_tx: Option<TransactionId>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self { current: SubmissionState::Idle, history: vec![SubmissionState::Idle], last_tx: None }
    }

    pub fn current(&self) -> &SubmissionState {
        &self.current
    }

    pub fn history(&self) -> &[SubmissionState] {
        &self.history
    }

    /// Starts a new submission from `Idle` or a terminal state.
    pub fn begin(&mut self) -> BridgeResult<()> {
        if self.current.is_active() {
            return Err(BridgeError::SubmissionInProgress);
        }
        self.current = SubmissionState::Connecting;
        self.history = vec![SubmissionState::Connecting];
        self.last_tx = None;
        Ok(())
    }

    /// Applies a legal transition. Repeated polls update the current state
    /// in place so the history keeps one `Polling` entry.
    pub fn advance(&mut self, next: SubmissionState) -> BridgeResult<()> {
        if !self.current.can_advance_to(&next) {
            return Err(BridgeError::TransactionError(format!(
                "illegal state transition {} -> {}",
                self.current.name(),
                next.name()
            )));
        }
        if let Some(tx) = next.tx_hash() {
            self.last_tx = Some(tx.clone());
        }
        let repeated_poll = matches!(
            (&self.current, &next),
            (SubmissionState::Polling { .. }, SubmissionState::Polling { .. })
        );
        if repeated_poll {
            if let Some(last) = self.history.last_mut() {
                *last = next.clone();
            }
        } else {
            self.history.push(next.clone());
        }
        self.current = next;
        Ok(())
    }

    /// Moves an active submission to `Failed`; returns the stage it failed in.
    pub fn fail(&mut self, cause: BridgeError) -> Stage {
        let stage = self.current.stage();
        if self.current.is_active() {
            let failed = SubmissionState::Failed { stage, cause };
            self.history.push(failed.clone());
            self.current = failed;
        }
        stage
    }

    pub fn status_view(&self) -> StatusView {
        StatusView {
            step: if self.last_tx.is_some() { 2 } else { 1 },
            total_steps: 2,
            tx_hash: self.last_tx.as_ref().map(|t| t.0.clone()),
            in_flight: self.current.is_active(),
            state: self.current.to_string(),
        }
    }
}

/// What the status region shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub step: u8,
    pub total_steps: u8,
    pub tx_hash: Option<String>,
    pub in_flight: bool,
    pub state: String,
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {}/{}: {}", self.step, self.total_steps, self.state)?;
        if let Some(tx) = &self.tx_hash {
            write!(f, " | tx {}", tx)?;
        }
        Ok(())
    }
}
