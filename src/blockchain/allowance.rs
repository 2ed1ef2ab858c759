//! Allowance negotiation: make sure the bridge may spend the user's tokens
//! before the transfer is signed.

use ethers::types::U256;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::traits::TokenAllowance;
use crate::audit::OperationLog;
use crate::core::abi::parse_uint256;
use crate::core::config::ApprovalPolicy;
use crate::core::domain::{ApproveCheck, TransactionId};
use crate::core::errors::{BridgeError, BridgeResult};
use crate::tools::async_support::cancellable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowanceOutcome {
    /// Existing allowance already covers the transfer; nothing was sent.
    AlreadySufficient { current: U256 },
    /// Exactly one approve transaction was sent and included.
    Approved { tx: TransactionId, amount: U256 },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowanceNegotiator {
    policy: ApprovalPolicy,
}

fn approval_failed(err: BridgeError) -> BridgeError {
    match err {
        BridgeError::Cancelled | BridgeError::ApprovalFailed(_) => err,
        other => BridgeError::ApprovalFailed(other.to_string()),
    }
}

impl AllowanceNegotiator {
    pub fn new(policy: ApprovalPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    fn approval_amount(&self, required: U256) -> U256 {
        match self.policy {
            ApprovalPolicy::Unbounded => U256::MAX,
            ApprovalPolicy::Exact => required,
        }
    }

    /// Reads `allowance(owner, spender)` and, when it is below the required
    /// amount, sends one `approve` and waits for it to be included.
    ///
    /// Any failure is `ApprovalFailed`; the caller must not go on to the transfer.
    pub async fn ensure_allowance(
        &self,
        allowance: &dyn TokenAllowance,
        check: &ApproveCheck,
        owner: &str,
        log: &OperationLog,
        cancel: &CancellationToken,
    ) -> BridgeResult<AllowanceOutcome> {
        let required = parse_uint256(&check.amount).map_err(approval_failed)?;

        log.pending("Checking allowance...");
        let current = cancellable(cancel, allowance.allowance(&check.token, owner, &check.to))
            .await
            .map_err(approval_failed)?;
        debug!(%current, %required, token = %check.token, spender = %check.to, "Allowance read");

        if current >= required {
            log.success_with(
                "Token already approved",
                json!({ "allowance": current.to_string(), "required": required.to_string() }),
            );
            return Ok(AllowanceOutcome::AlreadySufficient { current });
        }

        let amount = self.approval_amount(required);
        log.pending_with(
            "Approval required. Sending approve transaction...",
            json!({ "token": check.token, "spender": check.to, "amount": amount.to_string() }),
        );
        let tx = cancellable(cancel, allowance.approve(&check.token, owner, &check.to, amount))
            .await
            .map_err(approval_failed)?;
        cancellable(cancel, allowance.wait_for_inclusion(&tx)).await.map_err(approval_failed)?;

        log.success_with("Approve transaction successful", json!({ "hash": tx.as_str() }));
        Ok(AllowanceOutcome::Approved { tx, amount })
    }
}
