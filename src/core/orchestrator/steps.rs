//! Submission steps, in the order the orchestrator runs them.

use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::polling::StatusPoller;
use super::state::SubmissionState;
use super::Orchestrator;
use crate::blockchain::traits::{SubmissionContext, WalletAdapter};
use crate::blockchain::AllowanceOutcome;
use crate::core::domain::{AccountHandle, BridgeRequest, ChainFamily, PreparedTransaction, TransactionId};
use crate::core::errors::BridgeResult;
use crate::tools::async_support::cancellable;

pub(super) struct SettledRun {
    pub tx_hash: TransactionId,
    pub polls: u32,
    pub allowance: Option<AllowanceOutcome>,
}

fn sending_message(family: ChainFamily) -> &'static str {
    match family {
        ChainFamily::Utxo => "Sending BTC transaction...",
        ChainFamily::Solana => "Sending Solana transaction...",
        ChainFamily::Cardano => "Sending Cardano transaction...",
        ChainFamily::Cosmos => "Sending Cosmos transaction...",
        ChainFamily::Tron => "Sending Tron transaction...",
        ChainFamily::Evm | ChainFamily::VeChain => "Sending cross-chain transaction...",
    }
}

impl Orchestrator {
    pub(super) async fn run(&self, request: &BridgeRequest, cancel: &CancellationToken) -> BridgeResult<SettledRun> {
        let ctx = SubmissionContext::new(request, cancel);

        // 1. Connecting
        let adapter = self.wallets.for_chain(request.from_chain)?;
        let account = self.connect_wallet(&adapter, &ctx).await?;

        // 2. RequestingTx
        self.machine.lock().advance(SubmissionState::RequestingTx)?;
        let prepared = self.request_transaction(request, cancel).await?;
        self.switch_network(&adapter, &prepared, &ctx).await?;

        // 3. Approving, only when asked for and supported
        let allowance = self.negotiate_allowance(&adapter, &prepared, &account, cancel).await?;

        // 4. Signing
        let tx_hash = self.sign_and_submit(&adapter, &prepared, &ctx).await?;

        // 5. Polling
        let polls = self.await_settlement(&tx_hash, &ctx).await?;
        self.machine
            .lock()
            .advance(SubmissionState::Settled { tx_hash: tx_hash.clone() })?;

        Ok(SettledRun { tx_hash, polls, allowance })
    }

    async fn connect_wallet(
        &self,
        adapter: &Arc<dyn WalletAdapter>,
        ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<AccountHandle> {
        let family = adapter.family();
        self.log.pending(format!("Connecting {} wallet...", family.wallet_name()));
        let account = cancellable(ctx.cancel, adapter.connect(ctx)).await?;
        self.log.success_with(
            "Wallet connected",
            json!({ "wallet": family.wallet_name(), "address": account.address }),
        );
        Ok(account)
    }

    async fn request_transaction(
        &self,
        request: &BridgeRequest,
        cancel: &CancellationToken,
    ) -> BridgeResult<PreparedTransaction> {
        self.log.pending("Creating cross-chain transaction request...");
        self.log.info_with("API endpoint:", json!(self.api.create_tx_endpoint(request)));
        self.log.info_with("Request body:", serde_json::to_value(request).unwrap_or_default());

        let response = cancellable(cancel, self.api.create_transaction(request)).await?;
        self.log.success_with("Received API response:", response.raw);
        Ok(response.prepared)
    }

    async fn switch_network(
        &self,
        adapter: &Arc<dyn WalletAdapter>,
        prepared: &PreparedTransaction,
        ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<()> {
        if adapter.family() == ChainFamily::Evm && prepared.chain_id.is_some() {
            self.log.pending("Switching wallet network...");
        }
        if let Some(chain_id) = cancellable(ctx.cancel, adapter.prepare_network(prepared, ctx)).await? {
            self.log.success_with("Wallet network switched successfully", json!({ "chainId": chain_id }));
        }
        Ok(())
    }

    async fn negotiate_allowance(
        &self,
        adapter: &Arc<dyn WalletAdapter>,
        prepared: &PreparedTransaction,
        account: &AccountHandle,
        cancel: &CancellationToken,
    ) -> BridgeResult<Option<AllowanceOutcome>> {
        let Some(check) = prepared.approve_check.as_ref() else {
            return Ok(None);
        };
        let Some(allowance) = adapter.token_allowance() else {
            debug!(family = %adapter.family(), "Family has no allowance capability");
            self.log.info_with(
                format!("Approval check ignored for {} transfers", adapter.family()),
                serde_json::to_value(check).unwrap_or_default(),
            );
            return Ok(None);
        };

        self.machine.lock().advance(SubmissionState::Approving)?;
        let outcome = self
            .negotiator
            .ensure_allowance(allowance, check, &account.address, &self.log, cancel)
            .await?;
        Ok(Some(outcome))
    }

    async fn sign_and_submit(
        &self,
        adapter: &Arc<dyn WalletAdapter>,
        prepared: &PreparedTransaction,
        ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<TransactionId> {
        self.machine.lock().advance(SubmissionState::Signing)?;
        self.log.pending(sending_message(adapter.family()));

        let tx_hash = cancellable(ctx.cancel, adapter.sign_and_submit(prepared, ctx)).await?;
        self.machine
            .lock()
            .advance(SubmissionState::Submitted { tx_hash: tx_hash.clone() })?;
        self.log.success_with("Transaction sent:", json!({ "hash": tx_hash.as_str() }));

        if adapter.confirms_inclusion() {
            self.log.pending("Waiting for transaction confirmation...");
            cancellable(ctx.cancel, adapter.await_inclusion(&tx_hash, ctx)).await?;
            self.log.success("Transaction confirmed on source chain");
        }
        Ok(tx_hash)
    }

    async fn await_settlement(
        &self,
        tx_hash: &TransactionId,
        ctx: &SubmissionContext<'_>,
    ) -> BridgeResult<u32> {
        let network = ctx.network();
        self.log.pending("Checking cross-chain status...");
        self.log.info_with(
            "Api endpoint:",
            json!(format!("{}/{}", self.api.status_endpoint(network), tx_hash)),
        );

        let poller = StatusPoller {
            api: self.api.as_ref(),
            config: &self.config.polling,
            log: &self.log,
            machine: self.machine.as_ref(),
            cancel: ctx.cancel,
        };
        poller.poll_until_settled(tx_hash, network).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sending_message_per_family() {
        assert_eq!(sending_message(ChainFamily::Evm), "Sending cross-chain transaction...");
        assert_eq!(sending_message(ChainFamily::Utxo), "Sending BTC transaction...");
        assert_eq!(sending_message(ChainFamily::Solana), "Sending Solana transaction...");
    }
}
