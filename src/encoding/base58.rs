//! Base58Check over the Bitcoin and Ripple alphabets

use crate::error::{LedgerError, LedgerResult};
use crate::utils::crypto::sha256d;
use bs58::Alphabet;

/// Which Base58 alphabet a ledger uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base58Alphabet {
    Bitcoin,
    Ripple,
}

impl Base58Alphabet {
    fn table(self) -> &'static Alphabet {
        match self {
            Base58Alphabet::Bitcoin => Alphabet::BITCOIN,
            Base58Alphabet::Ripple => Alphabet::RIPPLE,
        }
    }
}

pub fn encode(data: &[u8], alphabet: Base58Alphabet) -> String {
    bs58::encode(data).with_alphabet(alphabet.table()).into_string()
}

pub fn decode(text: &str, alphabet: Base58Alphabet) -> LedgerResult<Vec<u8>> {
    Ok(bs58::decode(text).with_alphabet(alphabet.table()).into_vec()?)
}

/// Encode `payload` followed by the first 4 bytes of its double SHA-256
pub fn encode_check(payload: &[u8], alphabet: Base58Alphabet) -> String {
    let checksum = sha256d(payload);
    let mut data = Vec::with_capacity(payload.len() + 4);
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum[..4]);
    encode(&data, alphabet)
}

/// Decode and verify a Base58Check string, returning the payload
pub fn decode_check(text: &str, alphabet: Base58Alphabet) -> LedgerResult<Vec<u8>> {
    let data = decode(text, alphabet)?;
    if data.len() < 5 {
        return Err(LedgerError::invalid_address("base58check payload too short"));
    }
    let (payload, checksum) = data.split_at(data.len() - 4);
    if sha256d(payload)[..4] != *checksum {
        return Err(LedgerError::invalid_address("base58check checksum mismatch"));
    }
    Ok(payload.to_vec())
}
