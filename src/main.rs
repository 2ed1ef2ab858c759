// src/main.rs
//! Cross-chain bridge client entry point
use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use xchain_bridge_client::audit::LogEvent;
use xchain_bridge_client::blockchain::{LocalKeyEvmProvider, ProviderRegistry};
use xchain_bridge_client::cli::{render_chains, render_entry, Cli, Commands, TransferArgs};
use xchain_bridge_client::core::config::BridgeClientConfig;
use xchain_bridge_client::core::notify::TracingNotifier;
use xchain_bridge_client::core::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging()?;

    match cli.command {
        Commands::Chains => {
            print!("{}", render_chains());
            Ok(())
        }
        Commands::Transfer(args) => run_transfer(args).await,
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=info,reqwest=info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Registers the providers available to a headless process.
fn build_registry(config: &BridgeClientConfig) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    if let Ok(raw) = std::env::var("BRIDGE_EVM_PRIVATE_KEY") {
        let key = SecretString::new(raw.trim().to_string());
        let provider = LocalKeyEvmProvider::from_private_key(&key, &config.evm)
            .context("BRIDGE_EVM_PRIVATE_KEY is not a usable private key")?;
        info!(address = ?provider.address(), "Registered local-key EVM provider");
        registry = registry.with_evm(Arc::new(provider));
    }
    if registry.detected().is_empty() {
        warn!("No wallet providers registered; set BRIDGE_EVM_PRIVATE_KEY for EVM transfers");
    }
    Ok(registry)
}

async fn run_transfer(args: TransferArgs) -> Result<()> {
    let config = BridgeClientConfig::load_from_env()?;
    let request = args.into_request()?;
    let registry = build_registry(&config)?;

    info!("Starting bridge client v{}", env!("CARGO_PKG_VERSION"));
    let orchestrator = Orchestrator::from_registry(config, &registry, Arc::new(TracingNotifier))?;

    let mut events = orchestrator.log().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(LogEvent::Appended(entry)) => println!("{}", render_entry(&entry)),
                Ok(LogEvent::Cleared) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Log renderer fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling submission");
            trigger.cancel();
        }
    });

    let result = orchestrator.submit(request, cancel).await;
    let status = orchestrator.status_view();
    drop(orchestrator);
    let _ = printer.await;
    println!("{}", status);

    let outcome = result?;
    info!(id = %outcome.submission_id, tx = %outcome.tx_hash, polls = outcome.polls, "Transfer settled");
    Ok(())
}
