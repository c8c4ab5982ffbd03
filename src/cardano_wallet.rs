// Cardano (ADA) addresses
// Byron-era bootstrap addresses (Base58 CBOR with CRC32) and
// Shelley-era Bech32 addresses.

use crate::encoding::base58::{self, Base58Alphabet};
use crate::encoding::cbor::{Cbor, TAG_ENCODED_CBOR};
use crate::error::{LedgerError, LedgerResult};
use crate::utils::crypto::{blake2b_224, crc32, sha3_256};
use bech32::{FromBase32, ToBase32, Variant};
use serde::{Deserialize, Serialize};

/// Header of an enterprise (payment key, no stake part) address, low
/// nibble is the network id
const HEADER_ENTERPRISE: u8 = 0x60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardanoEra {
    Byron,
    Shelley,
}

/// A decoded destination, ready to embed in a transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardanoAddress {
    pub era: CardanoEra,
    /// Byron: the full CBOR `[tag24(payload), crc]`; Shelley: header and hashes
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub bytes: Vec<u8>,
}

impl CardanoAddress {
    /// Address as it appears inside an output
    pub fn to_cbor(&self) -> Cbor {
        match self.era {
            CardanoEra::Byron => Cbor::Raw(self.bytes.clone()),
            CardanoEra::Shelley => Cbor::Bytes(self.bytes.clone()),
        }
    }
}

/// Byron bootstrap address of an extended public key
pub fn byron_address(public_key: &[u8; 32], chain_code: &[u8; 32]) -> String {
    let mut xpub = public_key.to_vec();
    xpub.extend_from_slice(chain_code);

    let spending = Cbor::Array(vec![
        Cbor::Unsigned(0),
        Cbor::Array(vec![Cbor::Unsigned(0), Cbor::Bytes(xpub)]),
        Cbor::Map(vec![]),
    ]);
    let root = blake2b_224(&sha3_256(&spending.encode()));

    let payload = Cbor::Array(vec![
        Cbor::bytes(root.to_vec()),
        Cbor::Map(vec![]),
        Cbor::Unsigned(0),
    ])
    .encode();
    let checksum = crc32(&payload);

    let address = Cbor::Array(vec![
        Cbor::Tag(TAG_ENCODED_CBOR, Box::new(Cbor::Bytes(payload))),
        Cbor::Unsigned(checksum as u64),
    ]);
    base58::encode(&address.encode(), Base58Alphabet::Bitcoin)
}

/// Shelley enterprise address `header ‖ blake2b224(pk)`
pub fn enterprise_address(public_key: &[u8; 32], network_id: u8) -> LedgerResult<String> {
    let mut bytes = Vec::with_capacity(29);
    bytes.push(HEADER_ENTERPRISE | (network_id & 0x0f));
    bytes.extend_from_slice(&blake2b_224(public_key));
    Ok(bech32::encode(hrp_for(network_id), bytes.to_base32(), Variant::Bech32)?)
}

fn hrp_for(network_id: u8) -> &'static str {
    if network_id == 1 {
        "addr"
    } else {
        "addr_test"
    }
}

/// Decode either era
pub fn decode_address(address: &str) -> LedgerResult<CardanoAddress> {
    let trimmed = address.trim();
    if trimmed.starts_with("addr") {
        decode_shelley(trimmed)
    } else {
        decode_byron(trimmed)
    }
}

fn decode_byron(address: &str) -> LedgerResult<CardanoAddress> {
    let raw = base58::decode(address, Base58Alphabet::Bitcoin)?;
    let value = Cbor::decode(&raw)
        .map_err(|e| LedgerError::invalid_address(format!("byron address is not CBOR: {}", e)))?;

    let items = value
        .as_array()
        .filter(|items| items.len() == 2)
        .ok_or_else(|| LedgerError::invalid_address("byron address must be a 2-element array"))?;
    let payload = items[0]
        .as_tag(TAG_ENCODED_CBOR)
        .and_then(Cbor::as_bytes)
        .ok_or_else(|| LedgerError::invalid_address("byron address payload is not tag 24"))?;
    let checksum = items[1]
        .as_u64()
        .ok_or_else(|| LedgerError::invalid_address("byron address checksum missing"))?;

    if crc32(payload) as u64 != checksum {
        return Err(LedgerError::invalid_address("byron address checksum mismatch"));
    }

    let inner = Cbor::decode(payload)
        .map_err(|e| LedgerError::invalid_address(format!("byron payload: {}", e)))?;
    let root_ok = inner
        .as_array()
        .and_then(|items| items.first())
        .and_then(Cbor::as_bytes)
        .map(|root| root.len() == 28)
        .unwrap_or(false);
    if !root_ok {
        return Err(LedgerError::invalid_address("byron address root must be 28 bytes"));
    }

    Ok(CardanoAddress {
        era: CardanoEra::Byron,
        bytes: raw,
    })
}

fn decode_shelley(address: &str) -> LedgerResult<CardanoAddress> {
    let (hrp, data, variant) = bech32::decode(address)?;
    if variant != Variant::Bech32 {
        return Err(LedgerError::invalid_address("shelley addresses use bech32, not bech32m"));
    }
    let bytes = Vec::<u8>::from_base32(&data)?;
    let header = *bytes
        .first()
        .ok_or_else(|| LedgerError::invalid_address("empty shelley address"))?;

    let network_id = header & 0x0f;
    if hrp != hrp_for(network_id) {
        return Err(LedgerError::invalid_address(format!(
            "prefix '{}' does not match network id {}",
            hrp, network_id
        )));
    }

    let expected_len = match header >> 4 {
        // base addresses: payment and stake credentials
        0..=3 => Some(57),
        // pointer addresses carry a variable-length pointer
        4 | 5 => None,
        // enterprise addresses
        6 | 7 => Some(29),
        kind => {
            return Err(LedgerError::invalid_address(format!(
                "address type {} cannot receive payments",
                kind
            )))
        }
    };
    match expected_len {
        Some(len) if bytes.len() != len => Err(LedgerError::invalid_address(format!(
            "shelley address is {} bytes, expected {}",
            bytes.len(),
            len
        ))),
        None if bytes.len() < 32 => Err(LedgerError::invalid_address("pointer address too short")),
        _ => Ok(CardanoAddress {
            era: CardanoEra::Shelley,
            bytes,
        }),
    }
}
