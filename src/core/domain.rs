//! Core domain types: chains, chain families, the transfer request and the
//! prepared transaction returned by the bridge API.

use crate::core::errors::{BridgeError, BridgeResult};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chain identifiers accepted by the bridge API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
    Noble,
    Kava,
    Trx,
    Sol,
    Vet,
    Ada,
    Btc,
    Areth,
    Astr,
    Avax,
    BaseEth,
    Bnb,
    Brock,
    Eth,
    Ftm,
    Fx,
    Glmr,
    Gth,
    LineaEth,
    Matic,
    Metis,
    Movr,
    Nrg,
    Oeth,
    Okt,
    Sgb,
    Tlos,
    Vc,
    Wan,
    Xdc,
    Zen,
    ZkEth,
}

impl Chain {
    pub const ALL: [Chain; 32] = [
        Chain::Noble,
        Chain::Kava,
        Chain::Trx,
        Chain::Sol,
        Chain::Vet,
        Chain::Ada,
        Chain::Btc,
        Chain::Areth,
        Chain::Astr,
        Chain::Avax,
        Chain::BaseEth,
        Chain::Bnb,
        Chain::Brock,
        Chain::Eth,
        Chain::Ftm,
        Chain::Fx,
        Chain::Glmr,
        Chain::Gth,
        Chain::LineaEth,
        Chain::Matic,
        Chain::Metis,
        Chain::Movr,
        Chain::Nrg,
        Chain::Oeth,
        Chain::Okt,
        Chain::Sgb,
        Chain::Tlos,
        Chain::Vc,
        Chain::Wan,
        Chain::Xdc,
        Chain::Zen,
        Chain::ZkEth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Noble => "NOBLE",
            Chain::Kava => "KAVA",
            Chain::Trx => "TRX",
            Chain::Sol => "SOL",
            Chain::Vet => "VET",
            Chain::Ada => "ADA",
            Chain::Btc => "BTC",
            Chain::Areth => "ARETH",
            Chain::Astr => "ASTR",
            Chain::Avax => "AVAX",
            Chain::BaseEth => "BASEETH",
            Chain::Bnb => "BNB",
            Chain::Brock => "BROCK",
            Chain::Eth => "ETH",
            Chain::Ftm => "FTM",
            Chain::Fx => "FX",
            Chain::Glmr => "GLMR",
            Chain::Gth => "GTH",
            Chain::LineaEth => "LINEAETH",
            Chain::Matic => "MATIC",
            Chain::Metis => "METIS",
            Chain::Movr => "MOVR",
            Chain::Nrg => "NRG",
            Chain::Oeth => "OETH",
            Chain::Okt => "OKT",
            Chain::Sgb => "SGB",
            Chain::Tlos => "TLOS",
            Chain::Vc => "VC",
            Chain::Wan => "WAN",
            Chain::Xdc => "XDC",
            Chain::Zen => "ZEN",
            Chain::ZkEth => "ZKETH",
        }
    }

    /// Signing/submission protocol family of this chain.
    ///
    /// Adding a chain without assigning a family does not compile.
    pub fn family(&self) -> ChainFamily {
        match self {
            Chain::Btc => ChainFamily::Utxo,
            Chain::Sol => ChainFamily::Solana,
            Chain::Ada => ChainFamily::Cardano,
            Chain::Noble | Chain::Kava => ChainFamily::Cosmos,
            Chain::Trx => ChainFamily::Tron,
            Chain::Vet => ChainFamily::VeChain,
            Chain::Areth
            | Chain::Astr
            | Chain::Avax
            | Chain::BaseEth
            | Chain::Bnb
            | Chain::Brock
            | Chain::Eth
            | Chain::Ftm
            | Chain::Fx
            | Chain::Glmr
            | Chain::Gth
            | Chain::LineaEth
            | Chain::Matic
            | Chain::Metis
            | Chain::Movr
            | Chain::Nrg
            | Chain::Oeth
            | Chain::Okt
            | Chain::Sgb
            | Chain::Tlos
            | Chain::Vc
            | Chain::Wan
            | Chain::Xdc
            | Chain::Zen
            | Chain::ZkEth => ChainFamily::Evm,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Chain::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| BridgeError::ConfigError(format!("unsupported chain: '{}'", wanted)))
    }
}

/// A class of chains sharing one signing/submission protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    Evm,
    Utxo,
    Solana,
    Cardano,
    Cosmos,
    Tron,
    VeChain,
}

impl ChainFamily {
    pub const ALL: [ChainFamily; 7] = [
        ChainFamily::Evm,
        ChainFamily::Utxo,
        ChainFamily::Solana,
        ChainFamily::Cardano,
        ChainFamily::Cosmos,
        ChainFamily::Tron,
        ChainFamily::VeChain,
    ];

    /// Name of the wallet the user is prompted to install.
    pub fn wallet_name(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "MetaMask",
            ChainFamily::Utxo => "UniSat",
            ChainFamily::Solana => "Phantom",
            ChainFamily::Cardano => "Lace",
            ChainFamily::Cosmos => "Keplr",
            ChainFamily::Tron => "TronLink",
            ChainFamily::VeChain => "VeWorld",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "EVM",
            ChainFamily::Utxo => "BTC",
            ChainFamily::Solana => "Solana",
            ChainFamily::Cardano => "Cardano",
            ChainFamily::Cosmos => "Cosmos",
            ChainFamily::Tron => "Tron",
            ChainFamily::VeChain => "VeChain",
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn from_testnet_flag(is_testnet: bool) -> Self {
        if is_testnet {
            Network::Testnet
        } else {
            Network::Mainnet
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Network::Testnet)
    }
}

/// Raw form input, before chain identifiers are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeForm {
    pub from_chain: String,
    pub to_chain: String,
    pub from_account: String,
    pub from_token: String,
    pub to_token: String,
    pub to_account: String,
    pub amount: String,
    #[serde(default)]
    pub partner: Option<String>,
    #[serde(default)]
    pub is_testnet: bool,
}

/// User-supplied transfer intent. Immutable once submitted.
///
/// Serializes directly into the `createTx2` request body: the testnet toggle
/// selects the endpoint and is never sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    pub from_chain: Chain,
    pub to_chain: Chain,
    pub from_account: String,
    pub from_token: String,
    pub to_token: String,
    pub to_account: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<String>,
    #[serde(skip)]
    pub is_testnet: bool,
}

impl BridgeRequest {
    /// Resolves chain identifiers; an unknown identifier is a configuration
    /// error rather than a silent EVM default.
    pub fn from_form(form: BridgeForm) -> BridgeResult<Self> {
        let partner = form.partner.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        Ok(Self {
            from_chain: form.from_chain.parse()?,
            to_chain: form.to_chain.parse()?,
            from_account: form.from_account,
            from_token: form.from_token,
            to_token: form.to_token,
            to_account: form.to_account,
            amount: form.amount,
            partner,
            is_testnet: form.is_testnet,
        })
    }

    pub fn network(&self) -> Network {
        Network::from_testnet_flag(self.is_testnet)
    }

    pub fn family(&self) -> ChainFamily {
        self.from_chain.family()
    }
}

/// Pre-approval the bridge asks for before the transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveCheck {
    pub token: String,
    /// Spender.
    pub to: String,
    #[serde(deserialize_with = "string_or_number")]
    pub amount: String,
}

/// Transaction prepared by the bridge API, owned for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedTransaction {
    #[serde(default, deserialize_with = "optional_chain_id", skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approve_check: Option<ApproveCheck>,
    pub tx: serde_json::Value,
}

impl PreparedTransaction {
    /// Decodes `tx` as the structured payload of a chain family.
    pub fn payload<T: DeserializeOwned>(&self) -> BridgeResult<T> {
        serde_json::from_value(self.tx.clone())
            .map_err(|e| BridgeError::invalid_payload(format!("unexpected tx shape: {}", e)))
    }

    /// `tx` as an encoded blob (base64 or hex, depending on the family).
    pub fn payload_str(&self) -> BridgeResult<&str> {
        self.tx
            .as_str()
            .ok_or_else(|| BridgeError::invalid_payload("expected an encoded transaction string"))
    }
}

/// Identifier returned by a wallet after submission (hash, txid or signature).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        TransactionId(s)
    }
}

/// Account exposed by a connected wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountHandle {
    pub family: ChainFamily,
    pub address: String,
}

/// Normalizes a chain id to lowercase `0x` hex. Decimal input is converted.
pub fn normalize_chain_id(raw: &str) -> BridgeResult<String> {
    let trimmed = raw.trim();
    if let Some(hex_part) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        let value = u64::from_str_radix(hex_part, 16)
            .map_err(|_| BridgeError::invalid_payload(format!("invalid chainId '{}'", raw)))?;
        return Ok(format!("0x{:x}", value));
    }
    let value = trimmed
        .parse::<u64>()
        .map_err(|_| BridgeError::invalid_payload(format!("invalid chainId '{}'", raw)))?;
    Ok(format!("0x{:x}", value))
}

fn optional_chain_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let text = match raw {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(serde::de::Error::custom(format!("unsupported chainId value: {}", other)))
        }
    };
    normalize_chain_id(&text).map(Some).map_err(serde::de::Error::custom)
}

/// Accepts `"123"` or `123` and yields the textual form.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn form(from: &str) -> BridgeForm {
        BridgeForm {
            from_chain: from.to_string(),
            to_chain: "BNB".to_string(),
            from_account: "0xabc".to_string(),
            from_token: "0x0000000000000000000000000000000000000000".to_string(),
            to_token: "0x0000000000000000000000000000000000000001".to_string(),
            to_account: "0xdef".to_string(),
            amount: "0.5".to_string(),
            partner: Some("  ".to_string()),
            is_testnet: true,
        }
    }

    #[test]
    fn every_chain_round_trips_through_its_identifier() {
        for chain in Chain::ALL {
            assert_eq!(chain.as_str().parse::<Chain>().unwrap(), chain);
            let json = serde_json::to_string(&chain).unwrap();
            assert_eq!(json, format!("\"{}\"", chain.as_str()));
        }
    }

    #[test]
    fn every_family_has_at_least_one_chain() {
        for family in ChainFamily::ALL {
            assert!(Chain::ALL.iter().any(|c| c.family() == family), "{:?}", family);
        }
    }

    #[test]
    fn unknown_chain_fails_fast() {
        let err = BridgeRequest::from_form(form("DOGE")).unwrap_err();
        assert!(matches!(err, BridgeError::ConfigError(_)));
    }

    #[test]
    fn request_body_omits_ui_fields() {
        let req = BridgeRequest::from_form(form("eth")).unwrap();
        assert_eq!(req.from_chain, Chain::Eth);
        assert!(req.is_testnet);
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            json!({
                "fromChain": "ETH",
                "toChain": "BNB",
                "fromAccount": "0xabc",
                "fromToken": "0x0000000000000000000000000000000000000000",
                "toToken": "0x0000000000000000000000000000000000000001",
                "toAccount": "0xdef",
                "amount": "0.5"
            })
        );
    }

    #[test]
    fn prepared_transaction_normalizes_chain_id() {
        let prepared: PreparedTransaction = serde_json::from_value(json!({
            "chainId": 56,
            "approveCheck": { "token": "0xt", "to": "0xs", "amount": 1000 },
            "tx": { "to": "0x1", "data": "0x", "value": "0x0" }
        }))
        .unwrap();
        assert_eq!(prepared.chain_id.as_deref(), Some("0x38"));
        assert_eq!(prepared.approve_check.unwrap().amount, "1000");

        let hex: PreparedTransaction =
            serde_json::from_value(json!({ "chainId": "0X38", "tx": "AAAA" })).unwrap();
        assert_eq!(hex.chain_id.as_deref(), Some("0x38"));
        assert_eq!(hex.payload_str().unwrap(), "AAAA");
    }
}
