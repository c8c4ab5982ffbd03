// XRP Ledger addresses
// Classic r-addresses (secp256k1 and ed25519 keys) and X-addresses,
// which fold a destination tag into the address itself.

use crate::encoding::base58::{self, Base58Alphabet};
use crate::error::{LedgerError, LedgerResult};
use crate::utils::crypto::hash160;
use serde::{Deserialize, Serialize};

const ACCOUNT_ID_VERSION: u8 = 0x00;
const X_ADDRESS_MAINNET: [u8; 2] = [0x05, 0x44];
const X_ADDRESS_TESTNET: [u8; 2] = [0x04, 0x93];
/// Ripple marks 33-byte ed25519 public keys with this leading byte
pub const ED25519_KEY_PREFIX: u8 = 0xED;

/// Curve of an XRP account key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RippleKeyType {
    Secp256k1,
    Ed25519,
}

/// Canonical 33-byte signing key plus its curve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RipplePublicKey {
    pub key_type: RippleKeyType,
    pub bytes: Vec<u8>,
}

impl RipplePublicKey {
    /// Accept a compressed secp256k1 key, a bare 32-byte ed25519 key, or
    /// an ed25519 key already carrying the 0xED marker
    pub fn parse(bytes: &[u8]) -> LedgerResult<Self> {
        match bytes.len() {
            32 => {
                let mut prefixed = vec![ED25519_KEY_PREFIX];
                prefixed.extend_from_slice(bytes);
                Ok(Self {
                    key_type: RippleKeyType::Ed25519,
                    bytes: prefixed,
                })
            }
            33 if bytes[0] == ED25519_KEY_PREFIX => Ok(Self {
                key_type: RippleKeyType::Ed25519,
                bytes: bytes.to_vec(),
            }),
            33 if bytes[0] == 0x02 || bytes[0] == 0x03 => Ok(Self {
                key_type: RippleKeyType::Secp256k1,
                bytes: bytes.to_vec(),
            }),
            n => Err(LedgerError::invalid_input(format!(
                "unrecognised XRP public key of {} bytes",
                n
            ))),
        }
    }

    /// Raw key without the ed25519 marker, as the signature verifier wants it
    pub fn verifying_bytes(&self) -> &[u8] {
        match self.key_type {
            RippleKeyType::Ed25519 => &self.bytes[1..],
            RippleKeyType::Secp256k1 => &self.bytes,
        }
    }

    pub fn account_id(&self) -> [u8; 20] {
        hash160(&self.bytes)
    }

    pub fn classic_address(&self) -> String {
        encode_classic_address(&self.account_id())
    }
}

/// A payment destination with its optional tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RippleDestination {
    pub account_id: [u8; 20],
    pub tag: Option<u32>,
}

pub fn encode_classic_address(account_id: &[u8; 20]) -> String {
    let mut payload = vec![ACCOUNT_ID_VERSION];
    payload.extend_from_slice(account_id);
    base58::encode_check(&payload, Base58Alphabet::Ripple)
}

pub fn decode_classic_address(address: &str) -> LedgerResult<[u8; 20]> {
    if !address.starts_with('r') {
        return Err(LedgerError::invalid_address("classic XRP address must start with 'r'"));
    }
    let payload = base58::decode_check(address, Base58Alphabet::Ripple)?;
    if payload.len() != 21 || payload[0] != ACCOUNT_ID_VERSION {
        return Err(LedgerError::invalid_address("not an XRP account id"));
    }
    let mut account = [0u8; 20];
    account.copy_from_slice(&payload[1..]);
    Ok(account)
}

pub fn encode_x_address(account_id: &[u8; 20], tag: Option<u32>, testnet: bool) -> String {
    let mut payload = Vec::with_capacity(31);
    payload.extend_from_slice(if testnet { &X_ADDRESS_TESTNET } else { &X_ADDRESS_MAINNET });
    payload.extend_from_slice(account_id);
    payload.push(tag.is_some() as u8);
    payload.extend_from_slice(&(tag.unwrap_or(0) as u64).to_le_bytes());
    base58::encode_check(&payload, Base58Alphabet::Ripple)
}

/// Decode an X-address into its account, tag and test-network flag
pub fn decode_x_address(address: &str) -> LedgerResult<(RippleDestination, bool)> {
    let payload = base58::decode_check(address, Base58Alphabet::Ripple)?;
    if payload.len() != 31 {
        return Err(LedgerError::invalid_address(format!(
            "X-address payload is {} bytes, expected 31",
            payload.len()
        )));
    }

    let testnet = match [payload[0], payload[1]] {
        X_ADDRESS_MAINNET => false,
        X_ADDRESS_TESTNET => true,
        _ => return Err(LedgerError::invalid_address("unknown X-address prefix")),
    };

    let mut account_id = [0u8; 20];
    account_id.copy_from_slice(&payload[2..22]);

    let mut tag_bytes = [0u8; 8];
    tag_bytes.copy_from_slice(&payload[23..31]);
    let raw_tag = u64::from_le_bytes(tag_bytes);

    let tag = match payload[22] {
        0 if raw_tag == 0 => None,
        1 => Some(u32::try_from(raw_tag).map_err(|_| {
            LedgerError::invalid_address("X-address tag exceeds 32 bits")
        })?),
        _ => return Err(LedgerError::invalid_address("malformed X-address tag flag")),
    };

    Ok((RippleDestination { account_id, tag }, testnet))
}

/// Resolve either address form
pub fn parse_destination(address: &str) -> LedgerResult<RippleDestination> {
    let trimmed = address.trim();
    if trimmed.starts_with('X') || trimmed.starts_with('T') {
        let (destination, testnet) = decode_x_address(trimmed)?;
        if testnet {
            return Err(LedgerError::invalid_address("X-address belongs to the test network"));
        }
        return Ok(destination);
    }
    Ok(RippleDestination {
        account_id: decode_classic_address(trimmed)?,
        tag: None,
    })
}
