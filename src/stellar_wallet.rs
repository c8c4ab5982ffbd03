// Stellar (XLM) StrKey addresses
// Base32 with a version byte and CRC16-XModem checksum (G... accounts).

use crate::error::{LedgerError, LedgerResult};
use crate::utils::crypto::crc16_xmodem;
use data_encoding::BASE32_NOPAD;

/// Version byte for public key (account): 6 << 3 = 48 (G prefix)
const VERSION_ACCOUNT_ID: u8 = 6 << 3;
/// Version byte for muxed accounts: 12 << 3 = 96 (M prefix)
const VERSION_MUXED_ACCOUNT: u8 = 12 << 3;

fn encode_strkey(version: u8, body: &[u8]) -> String {
    let mut payload = vec![version];
    payload.extend_from_slice(body);

    let checksum = crc16_xmodem(&payload);
    payload.extend_from_slice(&checksum.to_le_bytes());

    BASE32_NOPAD.encode(&payload)
}

fn decode_strkey(address: &str, version: u8, body_len: usize) -> LedgerResult<Vec<u8>> {
    let payload = BASE32_NOPAD
        .decode(address.trim().as_bytes())
        .map_err(|e| LedgerError::invalid_address(format!("invalid base32: {}", e)))?;

    if payload.len() != 1 + body_len + 2 {
        return Err(LedgerError::invalid_address(format!(
            "strkey payload is {} bytes",
            payload.len()
        )));
    }
    if payload[0] != version {
        return Err(LedgerError::invalid_address("wrong strkey version byte"));
    }

    let (data, checksum) = payload.split_at(payload.len() - 2);
    if crc16_xmodem(data).to_le_bytes() != checksum {
        return Err(LedgerError::invalid_address("strkey checksum mismatch"));
    }
    Ok(data[1..].to_vec())
}

/// Encode Stellar address (G... format)
pub fn encode_account_id(public_key: &[u8; 32]) -> String {
    encode_strkey(VERSION_ACCOUNT_ID, public_key)
}

/// Decode a G... address to its ed25519 key
pub fn decode_account_id(address: &str) -> LedgerResult<[u8; 32]> {
    let body = decode_strkey(address, VERSION_ACCOUNT_ID, 32)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&body);
    Ok(key)
}

/// Encode a muxed account (M... format): key then big-endian 64-bit id
pub fn encode_muxed_account(public_key: &[u8; 32], id: u64) -> String {
    let mut body = public_key.to_vec();
    body.extend_from_slice(&id.to_be_bytes());
    encode_strkey(VERSION_MUXED_ACCOUNT, &body)
}

pub fn decode_muxed_account(address: &str) -> LedgerResult<([u8; 32], u64)> {
    let body = decode_strkey(address, VERSION_MUXED_ACCOUNT, 40)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&body[..32]);
    let mut id = [0u8; 8];
    id.copy_from_slice(&body[32..]);
    Ok((key, u64::from_be_bytes(id)))
}

/// A payment destination: plain account or muxed sub-account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StellarDestination {
    pub public_key: [u8; 32],
    pub muxed_id: Option<u64>,
}

pub fn parse_destination(address: &str) -> LedgerResult<StellarDestination> {
    let trimmed = address.trim();
    if trimmed.starts_with('M') {
        let (public_key, id) = decode_muxed_account(trimmed)?;
        return Ok(StellarDestination {
            public_key,
            muxed_id: Some(id),
        });
    }
    Ok(StellarDestination {
        public_key: decode_account_id(trimmed)?,
        muxed_id: None,
    })
}
