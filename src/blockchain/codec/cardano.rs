//! Cardano transaction reassembly at the CBOR byte level.
//!
//! A transaction is `[body, witness_set, is_valid, auxiliary_data]` (older
//! eras omit `is_valid`). The body hash is what every witness signs, so the
//! body and auxiliary data are copied through byte for byte; only the
//! witness set map is rebuilt.

use std::collections::BTreeMap;

use crate::core::errors::{BridgeError, BridgeResult};

const MAX_DEPTH: usize = 64;
const BREAK: u8 = 0xff;

/// `redeemers` key of the witness set map.
pub const WITNESS_REDEEMERS: u64 = 5;

/// Script-related witness keys carried over when the wallet omits them:
/// native scripts, Plutus v1 scripts, Plutus data, Plutus v2 and v3 scripts.
pub const CARRIED_SCRIPT_WITNESSES: [u64; 5] = [1, 3, 4, 6, 7];

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

fn malformed(msg: impl std::fmt::Display) -> BridgeError {
    BridgeError::invalid_payload(format!("malformed Cardano CBOR: {}", msg))
}

/// Forward-only reader over raw CBOR items.
struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> BridgeResult<u8> {
        self.bytes.get(self.pos).copied().ok_or_else(|| malformed("unexpected end of input"))
    }

    fn take(&mut self, n: usize) -> BridgeResult<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or_else(|| malformed("length overflow"))?;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| malformed("item truncated"))?;
        self.pos = end;
        Ok(slice)
    }

    /// Reads an item head. `None` as the argument means indefinite length.
    fn head(&mut self) -> BridgeResult<(u8, Option<u64>)> {
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        let info = initial & 0x1f;
        let arg = match info {
            0..=23 => Some(info as u64),
            24 => Some(self.take(1)?[0] as u64),
            25 => {
                let b = self.take(2)?;
                Some(u16::from_be_bytes([b[0], b[1]]) as u64)
            }
            26 => {
                let b = self.take(4)?;
                Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64)
            }
            27 => {
                let b = self.take(8)?;
                let mut word = [0u8; 8];
                word.copy_from_slice(b);
                Some(u64::from_be_bytes(word))
            }
            31 if matches!(major, MAJOR_BYTES | MAJOR_TEXT | MAJOR_ARRAY | MAJOR_MAP) => None,
            _ => return Err(malformed(format!("reserved additional info {} for major {}", info, major))),
        };
        Ok((major, arg))
    }

    fn at_break(&self) -> BridgeResult<bool> {
        Ok(self.peek()? == BREAK)
    }

    fn skip_break(&mut self) -> BridgeResult<()> {
        if self.take(1)?[0] != BREAK {
            return Err(malformed("expected break"));
        }
        Ok(())
    }

    fn length(arg: u64) -> BridgeResult<usize> {
        usize::try_from(arg).map_err(|_| malformed("length does not fit in memory"))
    }

    /// Skips one complete item and returns its raw bytes.
    fn item(&mut self, depth: usize) -> BridgeResult<&'a [u8]> {
        if depth > MAX_DEPTH {
            return Err(malformed("nesting too deep"));
        }
        let start = self.pos;
        let (major, arg) = self.head()?;
        match (major, arg) {
            (MAJOR_UNSIGNED | MAJOR_NEGATIVE, _) => {}
            (MAJOR_BYTES | MAJOR_TEXT, Some(len)) => {
                self.take(Self::length(len)?)?;
            }
            (MAJOR_BYTES | MAJOR_TEXT, None) => {
                while !self.at_break()? {
                    let (chunk_major, chunk_len) = self.head()?;
                    match chunk_len {
                        Some(len) if chunk_major == major => {
                            self.take(Self::length(len)?)?;
                        }
                        _ => return Err(malformed("invalid indefinite string chunk")),
                    }
                }
                self.skip_break()?;
            }
            (MAJOR_ARRAY, Some(n)) => {
                for _ in 0..n {
                    self.item(depth + 1)?;
                }
            }
            (MAJOR_MAP, Some(n)) => {
                for _ in 0..n {
                    self.item(depth + 1)?;
                    self.item(depth + 1)?;
                }
            }
            (MAJOR_ARRAY, None) => {
                while !self.at_break()? {
                    self.item(depth + 1)?;
                }
                self.skip_break()?;
            }
            (MAJOR_MAP, None) => {
                while !self.at_break()? {
                    self.item(depth + 1)?;
                    self.item(depth + 1)?;
                }
                self.skip_break()?;
            }
            (MAJOR_TAG, _) => {
                self.item(depth + 1)?;
            }
            (MAJOR_SIMPLE, _) => {}
            _ => return Err(malformed(format!("unexpected major type {}", major))),
        }
        Ok(&self.bytes[start..self.pos])
    }
}

/// Raw byte spans of the top-level transaction array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionParts<'a> {
    pub body: &'a [u8],
    pub witness_set: &'a [u8],
    pub is_valid: Option<&'a [u8]>,
    pub auxiliary_data: &'a [u8],
}

pub fn split_transaction(bytes: &[u8]) -> BridgeResult<TransactionParts<'_>> {
    let mut scanner = Scanner::new(bytes);
    let (major, arg) = scanner.head()?;
    if major != MAJOR_ARRAY {
        return Err(malformed("transaction is not an array"));
    }
    let parts = match arg {
        Some(4) => TransactionParts {
            body: scanner.item(1)?,
            witness_set: scanner.item(1)?,
            is_valid: Some(scanner.item(1)?),
            auxiliary_data: scanner.item(1)?,
        },
        Some(3) => TransactionParts {
            body: scanner.item(1)?,
            witness_set: scanner.item(1)?,
            is_valid: None,
            auxiliary_data: scanner.item(1)?,
        },
        other => {
            return Err(malformed(format!("transaction array has {:?} items, expected 3 or 4", other)))
        }
    };
    if !scanner.at_end() {
        return Err(malformed("trailing bytes after transaction"));
    }
    Ok(parts)
}

/// Entries of a map keyed by unsigned integers, as raw value spans.
pub fn map_entries(bytes: &[u8]) -> BridgeResult<Vec<(u64, &[u8])>> {
    let mut scanner = Scanner::new(bytes);
    let (major, arg) = scanner.head()?;
    if major != MAJOR_MAP {
        return Err(malformed("witness set is not a map"));
    }
    let mut entries = Vec::new();
    match arg {
        Some(n) => {
            for _ in 0..n {
                entries.push(witness_entry(&mut scanner)?);
            }
        }
        None => {
            while !scanner.at_break()? {
                entries.push(witness_entry(&mut scanner)?);
            }
            scanner.skip_break()?;
        }
    }
    if !scanner.at_end() {
        return Err(malformed("trailing bytes after witness set"));
    }
    Ok(entries)
}

fn witness_entry<'a>(scanner: &mut Scanner<'a>) -> BridgeResult<(u64, &'a [u8])> {
    match scanner.head()? {
        (MAJOR_UNSIGNED, Some(key)) => Ok((key, scanner.item(1)?)),
        _ => Err(malformed("witness set key is not an unsigned integer")),
    }
}

fn write_head(out: &mut Vec<u8>, major: u8, value: u64) {
    let major = major << 5;
    match value {
        0..=23 => out.push(major | value as u8),
        24..=0xff => out.extend_from_slice(&[major | 24, value as u8]),
        0x100..=0xffff => {
            out.push(major | 25);
            out.extend_from_slice(&(value as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(major | 26);
            out.extend_from_slice(&(value as u32).to_be_bytes());
        }
        _ => {
            out.push(major | 27);
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}

/// Merges the script witnesses of the original transaction into the witness
/// set the wallet returned.
///
/// Redeemers always come from the original transaction, replacing any the
/// wallet sent back. Other script witnesses are added only where the wallet
/// returned none. Keys come out in ascending order.
pub fn merge_witness_sets(original: &[u8], wallet: &[u8]) -> BridgeResult<Vec<u8>> {
    let mut merged: BTreeMap<u64, &[u8]> = BTreeMap::new();
    for (key, value) in map_entries(wallet)? {
        if merged.insert(key, value).is_some() {
            return Err(malformed(format!("duplicate witness key {}", key)));
        }
    }
    for (key, value) in map_entries(original)? {
        if key == WITNESS_REDEEMERS {
            merged.insert(key, value);
        } else if CARRIED_SCRIPT_WITNESSES.contains(&key) {
            merged.entry(key).or_insert(value);
        }
    }

    let mut out = Vec::with_capacity(original.len() + wallet.len());
    write_head(&mut out, MAJOR_MAP, merged.len() as u64);
    for (key, value) in merged {
        write_head(&mut out, MAJOR_UNSIGNED, key);
        out.extend_from_slice(value);
    }
    Ok(out)
}

/// Builds the signed transaction from the original and the wallet's witness set.
pub fn assemble_signed_transaction(original_tx: &[u8], wallet_witness_set: &[u8]) -> BridgeResult<Vec<u8>> {
    let parts = split_transaction(original_tx)?;
    let witness_set = merge_witness_sets(parts.witness_set, wallet_witness_set)?;

    let mut out = Vec::with_capacity(original_tx.len() + wallet_witness_set.len());
    write_head(&mut out, MAJOR_ARRAY, if parts.is_valid.is_some() { 4 } else { 3 });
    out.extend_from_slice(parts.body);
    out.extend_from_slice(&witness_set);
    if let Some(is_valid) = parts.is_valid {
        out.extend_from_slice(is_valid);
    }
    out.extend_from_slice(parts.auxiliary_data);

    ciborium::de::from_reader::<ciborium::value::Value, _>(out.as_slice())
        .map_err(|e| malformed(format!("reassembled transaction does not decode: {}", e)))?;
    Ok(out)
}

pub fn decode_hex(label: &str, text: &str) -> BridgeResult<Vec<u8>> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(trimmed).map_err(|e| BridgeError::invalid_payload(format!("{} is not hex: {}", label, e)))
}
