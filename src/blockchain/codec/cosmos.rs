//! Cosmos-SDK payload decoding and fee arithmetic.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::core::errors::{BridgeError, BridgeResult};

/// The bridge API's Cosmos payload: base64 of `{"messages": [...], "memo": "..."}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CosmosTxPayload {
    pub messages: Vec<Value>,
    #[serde(default)]
    pub memo: Option<String>,
}

impl CosmosTxPayload {
    pub fn from_base64(encoded: &str) -> BridgeResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| BridgeError::invalid_payload(format!("Cosmos tx is not base64: {}", e)))?;
        let payload: Self = serde_json::from_slice(&bytes)
            .map_err(|e| BridgeError::invalid_payload(format!("Cosmos tx is not valid JSON: {}", e)))?;
        if payload.messages.is_empty() {
            return Err(BridgeError::invalid_payload("Cosmos tx carries no messages"));
        }
        Ok(payload)
    }

    pub fn memo(&self) -> &str {
        self.memo.as_deref().unwrap_or("")
    }
}

/// Gas price such as `0.025uusdc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasPrice {
    pub amount: Decimal,
    pub denom: String,
}

impl FromStr for GasPrice {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| BridgeError::ConfigError(format!("gas price '{}' has no denom", s)))?;
        let (amount, denom) = s.split_at(split);
        let denom_ok = denom.starts_with(|c: char| c.is_ascii_alphabetic())
            && denom.chars().all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c));
        if amount.is_empty() || !denom_ok {
            return Err(BridgeError::ConfigError(format!("invalid gas price '{}'", s)));
        }
        let amount = Decimal::from_str(amount)
            .map_err(|e| BridgeError::ConfigError(format!("invalid gas price '{}': {}", s, e)))?;
        Ok(Self { amount, denom: denom.to_string() })
    }
}

impl fmt::Display for GasPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosFee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

/// Simulated gas scaled by `multiplier`, rounded half away from zero.
pub fn adjusted_gas(simulated: u64, multiplier: Decimal) -> BridgeResult<u64> {
    (Decimal::from(simulated) * multiplier)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or_else(|| BridgeError::TransactionError(format!("gas estimate {} out of range", simulated)))
}

/// `ceil(gas_price * gas_limit)` in the gas price's denom.
pub fn calculate_fee(gas_limit: u64, price: &GasPrice) -> BridgeResult<CosmosFee> {
    let amount = (price.amount * Decimal::from(gas_limit))
        .ceil()
        .to_u128()
        .ok_or_else(|| BridgeError::TransactionError(format!("fee for {} gas out of range", gas_limit)))?;
    Ok(CosmosFee {
        amount: vec![Coin { denom: price.denom.clone(), amount: amount.to_string() }],
        gas: gas_limit.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn decodes_base64_json_payload() {
        let raw = json!({
            "messages": [{ "typeUrl": "/circle.cctp.v1.MsgDepositForBurn", "value": { "amount": "1000" } }],
            "memo": "bridge"
        });
        let encoded = STANDARD.encode(raw.to_string());
        let payload = CosmosTxPayload::from_base64(&encoded).unwrap();
        assert_eq!(payload.messages.len(), 1);
        assert_eq!(payload.memo(), "bridge");

        let no_memo = STANDARD.encode(json!({ "messages": [{}] }).to_string());
        assert_eq!(CosmosTxPayload::from_base64(&no_memo).unwrap().memo(), "");
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(CosmosTxPayload::from_base64("%%%").is_err());
        assert!(CosmosTxPayload::from_base64(&STANDARD.encode("not json")).is_err());
        assert!(CosmosTxPayload::from_base64(&STANDARD.encode(r#"{"messages":[]}"#)).is_err());
    }

    #[test]
    fn parses_gas_prices() {
        let price: GasPrice = "0.025uusdc".parse().unwrap();
        assert_eq!(price.amount, Decimal::new(25, 3));
        assert_eq!(price.denom, "uusdc");
        assert_eq!(price.to_string(), "0.025uusdc");
        assert!("uusdc".parse::<GasPrice>().is_err());
        assert!("0.1".parse::<GasPrice>().is_err());
        let ibc: GasPrice = "0.1ibc/ABCDEF".parse().unwrap();
        assert_eq!(ibc.denom, "ibc/ABCDEF");
    }

    #[test_case(100_000, 150_000 ; "exact")]
    #[test_case(33_333, 50_000 ; "half rounds up")]
    #[test_case(1, 2 ; "small")]
    #[test_case(0, 0 ; "zero")]
    fn gas_is_scaled_by_one_and_a_half(simulated: u64, expected: u64) {
        assert_eq!(adjusted_gas(simulated, Decimal::new(15, 1)).unwrap(), expected);
    }

    #[test_case("0.1uusdc", 150_000, "15000" ; "whole")]
    #[test_case("0.025uusdc", 2, "1" ; "fraction rounds up")]
    #[test_case("0.025ukava", 50_000, "1250" ; "kava")]
    fn fee_is_ceiled(price: &str, gas: u64, expected: &str) {
        let fee = calculate_fee(gas, &price.parse().unwrap()).unwrap();
        assert_eq!(fee.gas, gas.to_string());
        assert_eq!(fee.amount[0].amount, expected);
        assert_eq!(fee.amount[0].denom, price.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.'));
    }
}
