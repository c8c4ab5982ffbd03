// Ethereum-family addresses and ERC-20 call data
// Shared by every EVM chain; only the chain id differs.

use crate::error::{LedgerError, LedgerResult};
use crate::utils::crypto::{keccak256, to_checksum_address};
use ethers_core::types::U256;
use secp256k1::PublicKey;

/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// `approve(address,uint256)`
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Raw 20-byte account of a secp256k1 key
pub fn address_bytes(public_key: &PublicKey) -> [u8; 20] {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// EIP-55 checksummed address
pub fn address_from_public_key(public_key: &PublicKey) -> String {
    to_checksum_address(&address_bytes(public_key))
}

/// Parse a hex address; mixed-case input must carry a valid EIP-55 checksum
pub fn parse_address(address: &str) -> LedgerResult<[u8; 20]> {
    let trimmed = address.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| LedgerError::invalid_address("address must start with 0x"))?;

    if body.len() != 40 {
        return Err(LedgerError::invalid_address(format!(
            "address has {} hex characters, expected 40",
            body.len()
        )));
    }

    let bytes = hex::decode(body)
        .map_err(|e| LedgerError::invalid_address(format!("address is not hex: {}", e)))?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum_address(&out)[2..] != *body {
        return Err(LedgerError::invalid_address("EIP-55 checksum mismatch"));
    }

    Ok(out)
}

/// ABI call data for `transfer(to, amount)`: selector, left-padded address, amount word
pub fn transfer_call_data(to: &[u8; 20], amount: U256) -> Vec<u8> {
    address_amount_call(TRANSFER_SELECTOR, to, amount)
}

/// ABI call data for `approve(spender, amount)`
pub fn approve_call_data(spender: &[u8; 20], amount: U256) -> Vec<u8> {
    address_amount_call(APPROVE_SELECTOR, spender, amount)
}

fn address_amount_call(selector: [u8; 4], address: &[u8; 20], amount: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(&selector);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(address);
    let mut word = [0u8; 32];
    amount.to_big_endian(&mut word);
    data.extend_from_slice(&word);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches_signature() {
        assert_eq!(keccak256(b"transfer(address,uint256)")[..4], TRANSFER_SELECTOR);
        assert_eq!(keccak256(b"approve(address,uint256)")[..4], APPROVE_SELECTOR);
    }

    #[test]
    fn test_address_from_generator_key() {
        // secret key 1
        let pk = PublicKey::from_slice(
            &hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(
            address_from_public_key(&pk),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn test_parse_address_checksum_rules() {
        assert!(parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_ok());
        assert!(parse_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_ok());
        assert!(parse_address("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED").is_ok());
        assert!(parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD").is_err());
        assert!(parse_address("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_err());
        assert!(parse_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1bea").is_err());
    }

    #[test]
    fn test_transfer_call_data_layout() {
        let to = [0x11u8; 20];
        let data = transfer_call_data(&to, U256::from(1_000_000u64));
        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &TRANSFER_SELECTOR);
        assert_eq!(&data[16..36], &to);
        assert_eq!(&data[64..], &[0x00, 0x0f, 0x42, 0x40]);
    }

    #[test]
    fn test_approve_call_data_layout() {
        let spender: [u8; 20] = hex::decode("7a250d5630b4cf539739df2c5dacb4c659f2488d")
            .unwrap()
            .try_into()
            .unwrap();
        let data = approve_call_data(&spender, U256::MAX);
        assert_eq!(
            hex::encode(data),
            concat!(
                "095ea7b3",
                "0000000000000000000000007a250d5630b4cf539739df2c5dacb4c659f2488d",
                "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
            )
        );

        let small = approve_call_data(&[0x22; 20], U256::from(1_000_000u64));
        assert_eq!(
            hex::encode(&small[36..]),
            "00000000000000000000000000000000000000000000000000000000000f4240"
        );
    }
}
