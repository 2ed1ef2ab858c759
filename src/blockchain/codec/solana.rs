//! Solana transaction envelope.
//!
//! Legacy transactions start their message directly with the header. Versioned
//! messages carry a prefix byte with the high bit set (`0x80` is version 0).
//! Only the envelope is decoded; the message stays as opaque bytes so that
//! what the wallet signs is exactly what the bridge built.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::core::errors::{BridgeError, BridgeResult};

pub const SIGNATURE_LEN: usize = 64;
const VERSION_PREFIX_MASK: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxVersion {
    Legacy,
    V0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedTransaction {
    pub signatures: Vec<[u8; SIGNATURE_LEN]>,
    pub version: TxVersion,
    pub header: MessageHeader,
    /// Serialized message, including the version prefix for v0.
    pub message: Vec<u8>,
}

impl VersionedTransaction {
    pub fn from_base64(encoded: &str) -> BridgeResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| BridgeError::invalid_payload(format!("Solana tx is not base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> BridgeResult<Self> {
        let (count, mut offset) = decode_compact_u16(bytes)?;
        let count = count as usize;

        let sig_end = offset + count * SIGNATURE_LEN;
        if bytes.len() < sig_end {
            return Err(BridgeError::invalid_payload(format!(
                "Solana tx truncated: {} signatures need {} bytes, got {}",
                count,
                sig_end,
                bytes.len()
            )));
        }
        let mut signatures = Vec::with_capacity(count);
        for _ in 0..count {
            let mut sig = [0u8; SIGNATURE_LEN];
            sig.copy_from_slice(&bytes[offset..offset + SIGNATURE_LEN]);
            signatures.push(sig);
            offset += SIGNATURE_LEN;
        }

        let message = bytes[offset..].to_vec();
        let (version, header) = parse_message_prefix(&message)?;

        if header.num_required_signatures as usize != signatures.len() {
            return Err(BridgeError::invalid_payload(format!(
                "Solana tx declares {} required signatures but carries {} slots",
                header.num_required_signatures,
                signatures.len()
            )));
        }

        Ok(Self { signatures, version, header, message })
    }

    #[cfg(test)]
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut out = encode_compact_u16(self.signatures.len() as u16);
        out.reserve(self.signatures.len() * SIGNATURE_LEN + self.message.len());
        for sig in &self.signatures {
            out.extend_from_slice(sig);
        }
        out.extend_from_slice(&self.message);
        out
    }

    pub fn is_versioned(&self) -> bool {
        self.version != TxVersion::Legacy
    }
}

fn parse_message_prefix(message: &[u8]) -> BridgeResult<(TxVersion, MessageHeader)> {
    let first = *message
        .first()
        .ok_or_else(|| BridgeError::invalid_payload("Solana tx has an empty message"))?;

    let (version, header_at) = if first & VERSION_PREFIX_MASK != 0 {
        match first & !VERSION_PREFIX_MASK {
            0 => (TxVersion::V0, 1),
            other => {
                return Err(BridgeError::invalid_payload(format!(
                    "unsupported Solana message version {}",
                    other
                )))
            }
        }
    } else {
        (TxVersion::Legacy, 0)
    };

    let header = message
        .get(header_at..header_at + 3)
        .ok_or_else(|| BridgeError::invalid_payload("Solana message header truncated"))?;
    Ok((
        version,
        MessageHeader {
            num_required_signatures: header[0],
            num_readonly_signed_accounts: header[1],
            num_readonly_unsigned_accounts: header[2],
        },
    ))
}

/// Solana's "shortvec" length: 7 bits per byte, little endian, at most 3 bytes.
pub fn decode_compact_u16(bytes: &[u8]) -> BridgeResult<(u16, usize)> {
    let mut value: u32 = 0;
    for i in 0..3 {
        let byte = *bytes
            .get(i)
            .ok_or_else(|| BridgeError::invalid_payload("compact-u16 truncated"))?;
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            if i > 0 && byte == 0 {
                return Err(BridgeError::invalid_payload("compact-u16 not minimally encoded"));
            }
            return u16::try_from(value)
                .map(|v| (v, i + 1))
                .map_err(|_| BridgeError::invalid_payload("compact-u16 overflow"));
        }
    }
    Err(BridgeError::invalid_payload("compact-u16 longer than 3 bytes"))
}

#[cfg(test)]
pub(crate) fn encode_compact_u16(mut value: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(3);
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Canonical base58 form of a signature.
pub fn signature_to_base58(bytes: &[u8]) -> BridgeResult<String> {
    if bytes.len() != SIGNATURE_LEN {
        return Err(BridgeError::SigningFailed(format!(
            "wallet returned a {}-byte signature",
            bytes.len()
        )));
    }
    Ok(bs58::encode(bytes).into_string())
}

/// Re-encodes a base58 signature, rejecting anything that is not 64 bytes.
pub fn normalize_base58_signature(text: &str) -> BridgeResult<String> {
    let bytes = bs58::decode(text.trim())
        .into_vec()
        .map_err(|e| BridgeError::SigningFailed(format!("signature is not base58: {}", e)))?;
    signature_to_base58(&bytes)
}
