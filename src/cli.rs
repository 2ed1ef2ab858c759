use clap::{Args, Parser, Subcommand};

use crate::audit::{LogEntry, Severity};
use crate::core::domain::{BridgeForm, BridgeRequest, Chain};
use crate::core::errors::BridgeResult;

/// Cross-chain bridge client (library-facing definitions)
#[derive(Debug, Parser)]
#[command(name = "bridge_client", about = "Cross-chain bridge transfer client", disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Submit one cross-chain transfer and follow it to settlement
    Transfer(TransferArgs),
    /// List supported chain identifiers and their wallet families
    Chains,
}

#[derive(Debug, Clone, Args)]
pub struct TransferArgs {
    #[arg(long = "from-chain")]
    pub from_chain: String,
    #[arg(long = "to-chain")]
    pub to_chain: String,
    #[arg(long = "from-account")]
    pub from_account: String,
    #[arg(long = "from-token")]
    pub from_token: String,
    #[arg(long = "to-token")]
    pub to_token: String,
    #[arg(long = "to-account")]
    pub to_account: String,
    /// Amount in display units, e.g. "1.5"
    #[arg(long)]
    pub amount: String,
    #[arg(long)]
    pub partner: Option<String>,
    /// Use the bridge's testnet endpoints
    #[arg(long)]
    pub testnet: bool,
}

impl TransferArgs {
    pub fn into_form(self) -> BridgeForm {
        BridgeForm {
            from_chain: self.from_chain,
            to_chain: self.to_chain,
            from_account: self.from_account,
            from_token: self.from_token,
            to_token: self.to_token,
            to_account: self.to_account,
            amount: self.amount,
            partner: self.partner,
            is_testnet: self.testnet,
        }
    }

    pub fn into_request(self) -> BridgeResult<BridgeRequest> {
        BridgeRequest::from_form(self.into_form())
    }
}

fn marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "[info]",
        Severity::Success => "[ ok ]",
        Severity::Error => "[fail]",
        Severity::Pending => "[ .. ]",
    }
}

/// One log line, with the payload pretty-printed underneath.
pub fn render_entry(entry: &LogEntry) -> String {
    let mut line = format!(
        "{} {} {}",
        entry.timestamp.format("%H:%M:%S%.3f"),
        marker(entry.severity),
        entry.message
    );
    if let Some(payload) = &entry.payload {
        let body = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        for row in body.lines() {
            line.push_str("\n    ");
            line.push_str(row);
        }
    }
    line
}

pub fn render_chains() -> String {
    let mut out = String::new();
    for chain in Chain::ALL {
        let family = chain.family();
        out.push_str(&format!("{:<10} {:<8} {}\n", chain.as_str(), family.label(), family.wallet_name()));
    }
    out
}
