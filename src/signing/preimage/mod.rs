//! Pre-Image Generation
//!
//! Each ledger module turns an unsigned transaction into the exact bytes
//! an external signer must sign.

pub mod bitcoin;
pub mod cardano;
pub mod ethereum;
pub mod ripple;
pub mod stellar;

use crate::error::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};

/// Signing algorithm type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningAlgorithm {
    /// secp256k1 ECDSA (Bitcoin family, Ethereum family, XRP secp256k1 accounts)
    Secp256k1Ecdsa,
    /// Ed25519 (Stellar, Cardano, XRP ed25519 accounts)
    Ed25519,
}

/// What the external signer must sign, together with the bytes it commits to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPreimage {
    /// Exact serialized byte sequence the payload is derived from
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub preimage: Vec<u8>,

    /// Bytes handed to the signer: a 32-byte digest, Byron signing data,
    /// or the raw serialization for ed25519 XRP accounts
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub payload: Vec<u8>,

    /// For UTXO chains: which input index this is for
    pub input_index: Option<usize>,

    pub algorithm: SigningAlgorithm,

    /// Human-readable description
    pub description: String,
}

impl SigningPreimage {
    pub fn new(preimage: Vec<u8>, payload: Vec<u8>, algorithm: SigningAlgorithm) -> Self {
        Self {
            preimage,
            payload,
            input_index: None,
            algorithm,
            description: String::new(),
        }
    }

    pub fn with_input_index(mut self, index: usize) -> Self {
        self.input_index = Some(index);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn payload_hex(&self) -> String {
        hex::encode(&self.payload)
    }

    /// Payload as a 32-byte digest, for ECDSA verification
    pub fn digest(&self) -> LedgerResult<[u8; 32]> {
        self.payload.as_slice().try_into().map_err(|_| {
            LedgerError::invalid_state(format!(
                "payload is {} bytes, not a 32-byte digest",
                self.payload.len()
            ))
        })
    }
}

/// 64 bytes as returned by the signing device: r ‖ s for ECDSA (S not
/// necessarily low) or R ‖ S for Ed25519
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignature {
    #[serde(with = "crate::serde_bytes::hex64")]
    pub bytes: [u8; 64],
}

impl RawSignature {
    pub fn new(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(bytes: &[u8]) -> LedgerResult<Self> {
        let bytes: [u8; 64] = bytes.try_into().map_err(|_| {
            LedgerError::verification_failed(format!(
                "signature must be 64 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    pub fn from_hex(s: &str) -> LedgerResult<Self> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        Self::from_slice(&hex::decode(trimmed)?)
    }

    pub fn r(&self) -> &[u8] {
        &self.bytes[..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.bytes[32..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_signature_parsing() {
        let hex_sig = format!("0x{}{}", "11".repeat(32), "22".repeat(32));
        let sig = RawSignature::from_hex(&hex_sig).unwrap();
        assert_eq!(sig.r(), &[0x11; 32]);
        assert_eq!(sig.s(), &[0x22; 32]);
        assert!(RawSignature::from_slice(&[0u8; 65]).is_err());
    }

    #[test]
    fn test_digest_requires_32_bytes() {
        let p = SigningPreimage::new(vec![1, 2], vec![0u8; 40], SigningAlgorithm::Ed25519);
        assert!(p.digest().is_err());
        let p = SigningPreimage::new(vec![1, 2], vec![7u8; 32], SigningAlgorithm::Secp256k1Ecdsa)
            .with_input_index(3)
            .with_description("input 3");
        assert_eq!(p.digest().unwrap(), [7u8; 32]);
        assert_eq!(p.input_index, Some(3));
    }

    #[test]
    fn test_preimage_json_is_hex() {
        let p = SigningPreimage::new(vec![0xab], vec![0xcd], SigningAlgorithm::Ed25519);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["preimage"], "ab");
        assert_eq!(json["payload"], "cd");
        assert_eq!(json["algorithm"], "ed25519");
    }
}
