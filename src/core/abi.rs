//! Minimal ERC-20 call data for the allowance negotiation.

use crate::core::errors::{BridgeError, BridgeResult};
use ethers::types::U256;
use sha3::{Digest, Keccak256};

pub const ALLOWANCE_SIGNATURE: &str = "allowance(address,address)";
pub const APPROVE_SIGNATURE: &str = "approve(address,uint256)";

/// Compute the first 4 bytes (function selector) from a signature string, e.g. "approve(address,uint256)".
pub fn selector_from_signature(signature: &str) -> [u8; 4] {
    let mut keccak = Keccak256::new();
    keccak.update(signature.as_bytes());
    let out = keccak.finalize();
    [out[0], out[1], out[2], out[3]]
}

/// Encode a 20-byte hex address (with or without 0x) into a left-padded 32-byte ABI word.
pub fn abi_word_address(addr_hex: &str) -> BridgeResult<[u8; 32]> {
    let addr = addr_hex.trim();
    let addr = addr.strip_prefix("0x").or_else(|| addr.strip_prefix("0X")).unwrap_or(addr);
    if addr.len() != 40 {
        return Err(BridgeError::invalid_payload(format!("invalid address '{}'", addr_hex)));
    }
    let bytes = hex::decode(addr)
        .map_err(|_| BridgeError::invalid_payload(format!("invalid hex in address '{}'", addr_hex)))?;
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(&bytes);
    Ok(out)
}

pub fn abi_word_uint256(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

/// Pack a selector and ABI words contiguously into calldata.
pub fn abi_pack(selector: [u8; 4], words: &[[u8; 32]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 32 * words.len());
    out.extend_from_slice(&selector);
    for w in words {
        out.extend_from_slice(w);
    }
    out
}

/// `allowance(owner, spender)` call data.
pub fn encode_allowance(owner: &str, spender: &str) -> BridgeResult<Vec<u8>> {
    Ok(abi_pack(
        selector_from_signature(ALLOWANCE_SIGNATURE),
        &[abi_word_address(owner)?, abi_word_address(spender)?],
    ))
}

/// `approve(spender, amount)` call data.
pub fn encode_approve(spender: &str, amount: U256) -> BridgeResult<Vec<u8>> {
    Ok(abi_pack(
        selector_from_signature(APPROVE_SIGNATURE),
        &[abi_word_address(spender)?, abi_word_uint256(amount)],
    ))
}

/// Decodes the first 32-byte word of a call result as `uint256`.
pub fn decode_uint256(ret: &[u8]) -> BridgeResult<U256> {
    if ret.len() < 32 {
        return Err(BridgeError::invalid_payload(format!(
            "uint256 return value needs 32 bytes, got {}",
            ret.len()
        )));
    }
    Ok(U256::from_big_endian(&ret[..32]))
}

/// Parses a decimal or `0x` hex integer string.
pub fn parse_uint256(value: &str) -> BridgeResult<U256> {
    let v = value.trim();
    let parsed = match v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
        Some(hex_part) if !hex_part.is_empty() => U256::from_str_radix(hex_part, 16).ok(),
        Some(_) => None,
        None if !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()) => U256::from_dec_str(v).ok(),
        None => None,
    };
    parsed.ok_or_else(|| BridgeError::invalid_payload(format!("invalid uint256 '{}'", value)))
}

pub fn to_hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors() {
        assert_eq!(selector_from_signature(APPROVE_SIGNATURE), [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(selector_from_signature(ALLOWANCE_SIGNATURE), [0xdd, 0x62, 0xed, 0x3e]);
    }

    #[test]
    fn test_encode_approve_max() {
        let data = encode_approve("0x1111111111111111111111111111111111111111", U256::MAX).unwrap();
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert!(data[4..16].iter().all(|b| *b == 0));
        assert!(data[16..36].iter().all(|b| *b == 0x11));
        assert!(data[36..].iter().all(|b| *b == 0xff));
    }

    #[test]
    fn test_address_validation() {
        assert!(abi_word_address("0x1234").is_err());
        assert!(abi_word_address("0xzz11111111111111111111111111111111111111").is_err());
    }

    #[test]
    fn test_parse_and_decode_uint256() {
        assert_eq!(parse_uint256("1000").unwrap(), U256::from(1000u64));
        assert_eq!(parse_uint256("0x3e8").unwrap(), U256::from(1000u64));
        assert!(parse_uint256("1e18").is_err());
        assert!(parse_uint256("0x").is_err());

        let word = abi_word_uint256(U256::from(42u64));
        assert_eq!(decode_uint256(&word).unwrap(), U256::from(42u64));
        assert!(decode_uint256(&word[..31]).is_err());
    }
}
