// tests/orchestrator_tests.rs
// End-to-end submissions against a scripted bridge API and fake wallets

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use xchain_bridge_client::audit::Severity;
use xchain_bridge_client::blockchain::{AllowanceOutcome, ProviderRegistry};
use xchain_bridge_client::core::errors::BridgeError;
use xchain_bridge_client::core::notify::Notice;
use xchain_bridge_client::core::orchestrator::{Stage, SubmissionState};

fn evm_transfer(approve_amount: Option<&str>) -> serde_json::Value {
    let mut data = json!({
        "chainId": "0x38",
        "tx": { "to": ROUTER, "data": "0xdeadbeef", "value": "0x0" }
    });
    if let Some(amount) = approve_amount {
        data["approveCheck"] = json!({ "token": TOKEN, "to": SPENDER, "amount": amount });
    }
    json!({ "success": true, "data": data })
}

fn history(names: Vec<SubmissionState>) -> Vec<&'static str> {
    names.iter().map(|s| s.name()).collect()
}

#[tokio::test]
async fn eth_to_bnb_settles_after_three_polls() {
    let api = ScriptedApi::new(
        Ok(evm_transfer(None)),
        vec![Ok(status("Pending")), Ok(status("Pending")), Ok(status("Success"))],
    );
    let evm = FakeEvm::new(0);
    let registry = ProviderRegistry::new().with_evm(evm.clone());
    let (orchestrator, notifier) = orchestrator(api.clone(), &registry, fast_config());

    let outcome = orchestrator
        .submit(request("ETH", "BNB"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.tx_hash.as_str(), "0xhash1");
    assert_eq!(outcome.polls, 3);
    assert_eq!(outcome.allowance, None);
    assert_eq!(*evm.switched.lock(), vec!["0x38".to_string()]);
    assert_eq!(evm.sent.lock()[0].to, ROUTER);
    assert_eq!(evm.sent.lock()[0].data, "0xdeadbeef");
    assert_eq!(api.status_calls.lock().len(), 3);
    assert_eq!(
        history(orchestrator.history()),
        vec!["Connecting", "RequestingTx", "Signing", "Submitted", "Polling", "Settled"]
    );

    let entries = orchestrator.log().entries();
    let endpoint_at = entries.iter().position(|e| e.message == "Api endpoint:").unwrap();
    let polls: Vec<_> = entries[endpoint_at + 1..].iter().map(|e| e.severity).collect();
    assert_eq!(polls, vec![Severity::Pending, Severity::Pending, Severity::Success]);
    assert_eq!(entries.last().unwrap().message, "Cross-chain transaction completed successfully!");

    let messages = messages(&orchestrator);
    let switch = messages.iter().position(|m| m == "Wallet network switched successfully").unwrap();
    let sending = messages.iter().position(|m| m == "Sending cross-chain transaction...").unwrap();
    assert!(switch < sending);

    assert_eq!(*notifier.notices.lock(), vec![Notice::Success("Success".into())]);
    let view = orchestrator.status_view();
    assert_eq!((view.step, view.tx_hash.as_deref(), view.in_flight), (2, Some("0xhash1"), false));
}

#[tokio::test]
async fn request_body_omits_testnet_flag_and_empty_partner() {
    let api = ScriptedApi::new(Ok(evm_transfer(None)), vec![Ok(status("Success"))]);
    let registry = ProviderRegistry::new().with_evm(FakeEvm::new(0));
    let (orchestrator, _) = orchestrator(api, &registry, fast_config());
    orchestrator.submit(request("ETH", "BNB"), CancellationToken::new()).await.unwrap();

    let body = orchestrator
        .log()
        .entries()
        .into_iter()
        .find(|e| e.message == "Request body:")
        .and_then(|e| e.payload)
        .unwrap();
    assert_eq!(body["fromChain"], "ETH");
    assert_eq!(body["amount"], "1.5");
    assert!(body.get("isTestnet").is_none());
    assert!(body.get("partner").is_none());
}

#[tokio::test]
async fn insufficient_allowance_sends_one_approve_first() {
    let api = ScriptedApi::new(Ok(evm_transfer(Some("1000"))), vec![Ok(status("Success"))]);
    let evm = FakeEvm::new(999);
    let registry = ProviderRegistry::new().with_evm(evm.clone());
    let (orchestrator, _) = orchestrator(api, &registry, fast_config());

    let outcome = orchestrator.submit(request("ETH", "BNB"), CancellationToken::new()).await.unwrap();

    let sent = evm.sent.lock().clone();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, TOKEN);
    assert!(sent[0].data.starts_with("0x095ea7b3"));
    assert_eq!(sent[1].to, ROUTER);
    assert!(matches!(outcome.allowance, Some(AllowanceOutcome::Approved { .. })));
    assert_eq!(
        history(orchestrator.history()),
        vec!["Connecting", "RequestingTx", "Approving", "Signing", "Submitted", "Polling", "Settled"]
    );
    assert!(evm.calls.lock()[0].data.starts_with("0xdd62ed3e"));
}

#[tokio::test]
async fn sufficient_allowance_sends_only_the_transfer() {
    let api = ScriptedApi::new(Ok(evm_transfer(Some("1000"))), vec![Ok(status("Success"))]);
    let evm = FakeEvm::new(1000);
    let registry = ProviderRegistry::new().with_evm(evm.clone());
    let (orchestrator, _) = orchestrator(api, &registry, fast_config());

    let outcome = orchestrator.submit(request("ETH", "BNB"), CancellationToken::new()).await.unwrap();

    assert_eq!(evm.sent.lock().len(), 1);
    assert!(matches!(outcome.allowance, Some(AllowanceOutcome::AlreadySufficient { .. })));
    assert!(messages(&orchestrator).contains(&"Token already approved".to_string()));
}

#[tokio::test]
async fn missing_wallet_prompts_and_never_calls_the_api() {
    let api = ScriptedApi::new(Ok(evm_transfer(None)), vec![]);
    let (orchestrator, notifier) = orchestrator(api.clone(), &ProviderRegistry::new(), fast_config());

    let err = orchestrator.submit(request("ETH", "BNB"), CancellationToken::new()).await.unwrap_err();

    assert_eq!(err, BridgeError::wallet_not_found("MetaMask"));
    assert!(api.create_calls.lock().is_empty());
    assert_eq!(
        *notifier.notices.lock(),
        vec![Notice::Prompt("MetaMask wallet not found. Please install MetaMask first.".into())]
    );
    assert!(matches!(
        orchestrator.state(),
        SubmissionState::Failed { stage: Stage::Connecting, .. }
    ));
    let log = messages(&orchestrator);
    assert_eq!(
        log.last().map(String::as_str),
        Some("MetaMask wallet not found. Please install MetaMask first.")
    );
    assert!(!log.contains(&"Transaction Error:".to_string()));
}

#[tokio::test]
async fn api_error_is_logged_and_notified_verbatim() {
    let api = ScriptedApi::new(Err(BridgeError::ApiError("fromToken not supported".into())), vec![]);
    let evm = FakeEvm::new(0);
    let registry = ProviderRegistry::new().with_evm(evm.clone());
    let (orchestrator, notifier) = orchestrator(api, &registry, fast_config());

    let err = orchestrator.submit(request("ETH", "BNB"), CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.to_string(), "fromToken not supported");
    assert!(evm.sent.lock().is_empty());
    let last = orchestrator.log().entries().pop().unwrap();
    assert_eq!(last.message, "API Error:");
    assert_eq!(last.severity, Severity::Error);
    assert_eq!(last.payload.unwrap()["error"], "fromToken not supported");
    assert_eq!(*notifier.notices.lock(), vec![Notice::Error("fromToken not supported".into())]);
}

#[tokio::test]
async fn rejected_network_switch_stops_before_signing() {
    let mut body = evm_transfer(None);
    body["data"]["chainId"] = json!("0xdead");
    let api = ScriptedApi::new(Ok(body), vec![]);
    let evm = FakeEvm::new(0);
    let registry = ProviderRegistry::new().with_evm(evm.clone());
    let (orchestrator, _) = orchestrator(api, &registry, fast_config());

    let err = orchestrator.submit(request("ETH", "BNB"), CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, BridgeError::NetworkSwitchFailed(_)));
    assert!(evm.sent.lock().is_empty());
}

#[tokio::test]
async fn reverted_transfer_reports_submitted_hash() {
    let api = ScriptedApi::new(Ok(evm_transfer(None)), vec![]);
    let registry = ProviderRegistry::new().with_evm(FakeEvm::reverting());
    let (orchestrator, _) = orchestrator(api.clone(), &registry, fast_config());

    let err = orchestrator.submit(request("ETH", "BNB"), CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, BridgeError::TransactionError(_)));
    assert!(api.status_calls.lock().is_empty());
    let last = orchestrator.log().entries().pop().unwrap();
    assert_eq!(last.message, "Transaction Error:");
    let payload = last.payload.unwrap();
    assert_eq!(payload["stage"], "submitted");
    assert_eq!(payload["txHash"], "0xhash1");
    assert!(orchestrator.status_view().to_string().starts_with("Step 2/2"));
}

#[tokio::test]
async fn log_is_cleared_between_submissions() {
    let api = ScriptedApi::new(Ok(evm_transfer(None)), vec![Ok(status("Success"))]);
    let registry = ProviderRegistry::new().with_evm(FakeEvm::new(0));
    let (orchestrator, _) = orchestrator(api.clone(), &registry, fast_config());

    orchestrator.submit(request("ETH", "BNB"), CancellationToken::new()).await.unwrap();
    let first_len = orchestrator.log().len();

    api.rearm(Ok(evm_transfer(None)), vec![Ok(status("Success"))]);
    orchestrator.submit(request("ETH", "BNB"), CancellationToken::new()).await.unwrap();

    let messages = messages(&orchestrator);
    assert_eq!(messages.len(), first_len);
    assert_eq!(messages[0], "Connecting MetaMask wallet...");
    assert_eq!(messages.iter().filter(|m| *m == "Transaction sent:").count(), 1);
}

#[tokio::test]
async fn second_submit_is_rejected_while_polling_and_cancel_stops_it() {
    let api = ScriptedApi::new(Ok(evm_transfer(None)), vec![]);
    let registry = ProviderRegistry::new().with_evm(FakeEvm::new(0));
    let mut config = fast_config();
    config.polling.interval_ms = 60_000;
    let (orchestrator, _) = orchestrator(api.clone(), &registry, config);
    let orchestrator = Arc::new(orchestrator);

    let cancel = CancellationToken::new();
    let running = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.submit(request("ETH", "BNB"), cancel).await })
    };

    for _ in 0..200 {
        if matches!(orchestrator.state(), SubmissionState::Polling { .. }) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(orchestrator.status_view().in_flight);
    let len_before = orchestrator.log().len();

    let err = orchestrator
        .submit(request("ETH", "BNB"), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, BridgeError::SubmissionInProgress);
    assert_eq!(orchestrator.log().len(), len_before);

    cancel.cancel();
    let result = running.await.unwrap();
    assert_eq!(result.unwrap_err(), BridgeError::Cancelled);
    assert_eq!(api.status_calls.lock().len(), 1);
    assert!(matches!(orchestrator.state(), SubmissionState::Failed { stage: Stage::Polling, .. }));
}

#[tokio::test]
async fn cardano_witnesses_are_merged_before_submission() {
    use ciborium::value::Value as Cbor;

    fn encode(value: &Cbor) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(value, &mut out).unwrap();
        out
    }

    let redeemers = Cbor::Array(vec![Cbor::Array(vec![
        Cbor::Integer(0.into()),
        Cbor::Integer(0.into()),
        Cbor::Integer(42.into()),
        Cbor::Array(vec![Cbor::Integer(1000.into()), Cbor::Integer(2000.into())]),
    ])]);
    let original = Cbor::Array(vec![
        Cbor::Map(vec![(Cbor::Integer(2.into()), Cbor::Integer(170000.into()))]),
        Cbor::Map(vec![(Cbor::Integer(5.into()), redeemers.clone())]),
        Cbor::Bool(true),
        Cbor::Null,
    ]);
    let vkeys = Cbor::Array(vec![Cbor::Array(vec![
        Cbor::Bytes(vec![7u8; 32]),
        Cbor::Bytes(vec![9u8; 64]),
    ])]);
    let wallet_witness = Cbor::Map(vec![(Cbor::Integer(0.into()), vkeys.clone())]);

    let cardano = FakeCardano::new(hex::encode(encode(&wallet_witness)));
    let api = ScriptedApi::new(
        Ok(json!({ "success": true, "data": { "tx": hex::encode(encode(&original)) } })),
        vec![Ok(status("Success"))],
    );
    let registry = ProviderRegistry::new().with_cardano(cardano.clone());
    let (orchestrator, _) = orchestrator(api, &registry, fast_config());

    let outcome = orchestrator.submit(request("ADA", "ETH"), CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.tx_hash.as_str(), "ada-tx-hash");
    assert!(cardano.signed_inputs.lock()[0].1);
    assert!(messages(&orchestrator).contains(&"Sending Cardano transaction...".to_string()));

    let submitted = hex::decode(&cardano.submitted.lock()[0]).unwrap();
    let decoded: Cbor = ciborium::de::from_reader(submitted.as_slice()).unwrap();
    let Cbor::Array(items) = decoded else { panic!("signed tx must be an array") };
    assert_eq!(items.len(), 4);
    assert_eq!(items[0], original_body());
    assert_eq!(
        items[1],
        Cbor::Map(vec![(Cbor::Integer(0.into()), vkeys), (Cbor::Integer(5.into()), redeemers)])
    );
    assert_eq!(items[2], Cbor::Bool(true));

    fn original_body() -> Cbor {
        Cbor::Map(vec![(Cbor::Integer(2.into()), Cbor::Integer(170000.into()))])
    }
}

#[tokio::test]
async fn approve_check_is_ignored_for_families_without_allowances() {
    let witness = {
        let mut out = Vec::new();
        ciborium::ser::into_writer(&ciborium::value::Value::Map(vec![]), &mut out).unwrap();
        hex::encode(out)
    };
    let tx = {
        use ciborium::value::Value as Cbor;
        let mut out = Vec::new();
        let value = Cbor::Array(vec![Cbor::Map(vec![]), Cbor::Map(vec![]), Cbor::Bool(true), Cbor::Null]);
        ciborium::ser::into_writer(&value, &mut out).unwrap();
        hex::encode(out)
    };
    let api = ScriptedApi::new(
        Ok(json!({ "data": { "tx": tx, "approveCheck": { "token": TOKEN, "to": SPENDER, "amount": "1" } } })),
        vec![Ok(status("Success"))],
    );
    let registry = ProviderRegistry::new().with_cardano(FakeCardano::new(witness));
    let (orchestrator, _) = orchestrator(api, &registry, fast_config());

    let outcome = orchestrator.submit(request("ADA", "ETH"), CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.allowance, None);
    assert!(messages(&orchestrator).contains(&"Approval check ignored for Cardano transfers".to_string()));
    assert!(!history(orchestrator.history()).contains(&"Approving"));
}
