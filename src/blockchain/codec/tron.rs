//! Tron contract call preparation: selector parsing and argument typing.

use ethers::abi::token::{LenientTokenizer, Tokenizer};
use ethers::abi::{Function, ParamType, StateMutability, Token};
use serde::Deserialize;
use serde_json::Value;

use crate::core::errors::{BridgeError, BridgeResult};

/// Tron payload as returned by the bridge API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TronTxPayload {
    /// Contract address.
    pub to: String,
    /// e.g. `userLock(bytes32,address,uint256,bytes)`
    pub function_selector: String,
    #[serde(default)]
    pub call_value: Option<Value>,
    /// Raw call data including the selector.
    #[serde(default)]
    pub data: Option<String>,
    /// Already-decoded arguments, used when `data` is absent.
    #[serde(default)]
    pub params: Option<Vec<Value>>,
}

impl TronTxPayload {
    /// Call value in sun; absent means zero.
    pub fn call_value(&self) -> BridgeResult<u64> {
        let parsed = match &self.call_value {
            None | Some(Value::Null) => return Ok(0),
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) if s.trim().is_empty() => Some(0),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        };
        parsed.ok_or_else(|| {
            BridgeError::invalid_payload(format!("invalid Tron callValue {:?}", self.call_value))
        })
    }

    /// Parses the selector and types the arguments from `data` or `params`.
    pub fn prepare(&self) -> BridgeResult<(Function, Vec<Token>)> {
        let function = make_payable(parse_function(&self.function_selector)?);
        let args = match (&self.data, &self.params) {
            (Some(data), _) if !data.trim().is_empty() => decode_call_data(&function, data)?,
            (_, Some(params)) => coerce_params(&function, params)?,
            _ if function.inputs.is_empty() => Vec::new(),
            _ => {
                return Err(BridgeError::invalid_payload(format!(
                    "Tron call to {} carries neither data nor params",
                    self.function_selector
                )))
            }
        };
        Ok((function, args))
    }
}

/// Parses `name(type,...)` into an ABI function.
pub fn parse_function(selector: &str) -> BridgeResult<Function> {
    let signature = format!("function {}", selector.trim());
    let abi = ethers::abi::parse_abi(&[signature.as_str()]).map_err(|e| {
        BridgeError::invalid_payload(format!("invalid function selector '{}': {}", selector, e))
    })?;
    abi.functions()
        .next()
        .cloned()
        .ok_or_else(|| BridgeError::invalid_payload(format!("no function in selector '{}'", selector)))
}

/// Tron contract calls are sent as payable regardless of the declared mutability.
#[allow(deprecated)]
pub fn make_payable(mut function: Function) -> Function {
    function.state_mutability = StateMutability::Payable;
    function.constant = None;
    function
}

/// Decodes raw call data, checking it targets `function`.
pub fn decode_call_data(function: &Function, data: &str) -> BridgeResult<Vec<Token>> {
    let trimmed = data.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(trimmed)
        .map_err(|e| BridgeError::invalid_payload(format!("Tron call data is not hex: {}", e)))?;
    if bytes.len() < 4 || bytes[..4] != function.short_signature() {
        return Err(BridgeError::invalid_payload(format!(
            "call data does not match selector {}",
            function.signature()
        )));
    }
    function
        .decode_input(&bytes[4..])
        .map_err(|e| BridgeError::invalid_payload(format!("cannot decode Tron call data: {}", e)))
}

/// Types JSON arguments by the function's parameter types.
pub fn coerce_params(function: &Function, params: &[Value]) -> BridgeResult<Vec<Token>> {
    if params.len() != function.inputs.len() {
        return Err(BridgeError::invalid_payload(format!(
            "{} expects {} params, got {}",
            function.name,
            function.inputs.len(),
            params.len()
        )));
    }
    function
        .inputs
        .iter()
        .zip(params)
        .map(|(param, value)| {
            let text = token_text(&param.kind, value)?;
            LenientTokenizer::tokenize(&param.kind, &text).map_err(|e| {
                BridgeError::invalid_payload(format!("param '{}' ({}): {}", param.name, param.kind, e))
            })
        })
        .collect()
}

fn token_text(kind: &ParamType, value: &Value) -> BridgeResult<String> {
    match (kind, value) {
        (ParamType::Address, Value::String(s)) => tron_address_to_hex(s),
        (ParamType::Array(inner) | ParamType::FixedArray(inner, _), Value::Array(items)) => {
            let parts = items.iter().map(|v| token_text(inner, v)).collect::<BridgeResult<Vec<_>>>()?;
            Ok(format!("[{}]", parts.join(",")))
        }
        (ParamType::Tuple(kinds), Value::Array(items)) if kinds.len() == items.len() => {
            let parts = kinds
                .iter()
                .zip(items)
                .map(|(k, v)| token_text(k, v))
                .collect::<BridgeResult<Vec<_>>>()?;
            Ok(format!("({})", parts.join(",")))
        }
        (ParamType::Bytes | ParamType::FixedBytes(_), Value::String(s)) => {
            Ok(s.trim().trim_start_matches("0x").to_string())
        }
        (_, Value::String(s)) => Ok(s.clone()),
        (_, Value::Number(n)) => Ok(n.to_string()),
        (_, Value::Bool(b)) => Ok(b.to_string()),
        (_, other) => Err(BridgeError::invalid_payload(format!(
            "cannot use {} as {}",
            other, kind
        ))),
    }
}

/// Accepts base58check (`T...`), `41`-prefixed hex, or plain 20-byte hex.
pub fn tron_address_to_hex(address: &str) -> BridgeResult<String> {
    let address = address.trim();
    let invalid = || BridgeError::invalid_payload(format!("invalid Tron address '{}'", address));

    if address.starts_with('T') {
        let bytes = bs58::decode(address).with_check(Some(0x41)).into_vec().map_err(|_| invalid())?;
        let body = match bytes.len() {
            21 => &bytes[1..],
            20 => &bytes[..],
            _ => return Err(invalid()),
        };
        return Ok(hex::encode(body));
    }

    let hex_part = address.strip_prefix("0x").unwrap_or(address);
    match hex_part.len() {
        _ if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) => Err(invalid()),
        42 if hex_part.starts_with("41") => Ok(hex_part[2..].to_lowercase()),
        40 => Ok(hex_part.to_lowercase()),
        _ => Err(invalid()),
    }
}
