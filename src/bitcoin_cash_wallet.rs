// Bitcoin Cash CashAddr format (bitcoincash:q...)
// Legacy base58 addresses are handled by bitcoin_wallet.

use crate::bitcoin_wallet::{p2pkh_script, p2sh_script, DecodedUtxoAddress, UtxoAddressKind, WalletKey};
use crate::error::{LedgerError, LedgerResult};

const CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

const TYPE_P2PKH: u8 = 0;
const TYPE_P2SH: u8 = 1;

/// CashAddr of a wallet key's P2PKH output
pub fn cash_address(key: &WalletKey, prefix: &str) -> String {
    encode_cash_address(prefix, UtxoAddressKind::P2pkh, &key.key_hash())
}

/// Encode a 160-bit hash as a CashAddr string
pub fn encode_cash_address(prefix: &str, kind: UtxoAddressKind, hash: &[u8; 20]) -> String {
    let type_bits = match kind {
        UtxoAddressKind::P2sh => TYPE_P2SH,
        _ => TYPE_P2PKH,
    };

    // Version byte: type in bits 3-6, size code 0 (160 bits)
    let mut payload = vec![type_bits << 3];
    payload.extend_from_slice(hash);

    let mut data = convert_bits(&payload, 8, 5, true);
    let checksum = calculate_checksum(prefix, &data);
    data.extend_from_slice(&checksum);

    let encoded: String = data.iter().map(|&b| CHARSET[b as usize] as char).collect();
    format!("{}:{}", prefix, encoded)
}

/// Heuristic used by address dispatch: explicit prefix, or a bare
/// 42-character q/p payload
pub fn looks_like_cashaddr(address: &str, prefix: &str) -> bool {
    let lower = address.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix(prefix) {
        return rest.starts_with(':');
    }
    !lower.contains(':') && lower.len() == 42 && (lower.starts_with('q') || lower.starts_with('p'))
}

/// Decode a CashAddr with or without its prefix
pub fn decode_cash_address(address: &str, prefix: &str) -> LedgerResult<DecodedUtxoAddress> {
    let has_lower = address.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = address.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(LedgerError::invalid_address("mixed-case cashaddr"));
    }
    let lower = address.to_ascii_lowercase();

    let body = match lower.split_once(':') {
        Some((p, body)) if p == prefix => body,
        Some((p, _)) => {
            return Err(LedgerError::invalid_address(format!(
                "cashaddr prefix '{}' does not match '{}'",
                p, prefix
            )))
        }
        None => lower.as_str(),
    };

    let data: Vec<u8> = body
        .bytes()
        .map(|c| {
            CHARSET
                .iter()
                .position(|&x| x == c)
                .map(|p| p as u8)
                .ok_or_else(|| LedgerError::invalid_address(format!("invalid cashaddr character '{}'", c as char)))
        })
        .collect::<LedgerResult<_>>()?;

    if data.len() <= 8 {
        return Err(LedgerError::invalid_address("cashaddr too short"));
    }

    let mut values = expand_prefix(prefix);
    values.extend_from_slice(&data);
    if polymod(&values) != 1 {
        return Err(LedgerError::invalid_address("cashaddr checksum mismatch"));
    }

    let payload_5bit = &data[..data.len() - 8];
    let payload = convert_bits(payload_5bit, 5, 8, false);
    if payload.len() != 21 {
        return Err(LedgerError::unsupported(format!(
            "cashaddr hash of {} bytes",
            payload.len().saturating_sub(1)
        )));
    }

    let version = payload[0];
    if version & 0x07 != 0 {
        return Err(LedgerError::invalid_address("cashaddr size code is not 160 bits"));
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);

    match version >> 3 {
        TYPE_P2PKH => Ok(DecodedUtxoAddress {
            kind: UtxoAddressKind::P2pkh,
            script_pubkey: p2pkh_script(&hash),
        }),
        TYPE_P2SH => Ok(DecodedUtxoAddress {
            kind: UtxoAddressKind::P2sh,
            script_pubkey: p2sh_script(&hash),
        }),
        other => Err(LedgerError::unsupported(format!("cashaddr type {}", other))),
    }
}

/// Convert between bit sizes
fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Vec<u8> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut result = Vec::new();
    let max_value = (1u32 << to_bits) - 1;

    for &byte in data {
        acc = (acc << from_bits) | (byte as u32);
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            result.push(((acc >> bits) & max_value) as u8);
        }
    }

    if pad && bits > 0 {
        result.push(((acc << (to_bits - bits)) & max_value) as u8);
    }

    result
}

fn expand_prefix(prefix: &str) -> Vec<u8> {
    let mut values: Vec<u8> = prefix.bytes().map(|c| c & 0x1f).collect();
    values.push(0);
    values
}

fn calculate_checksum(prefix: &str, payload: &[u8]) -> [u8; 8] {
    let mut values = expand_prefix(prefix);
    values.extend_from_slice(payload);
    values.extend_from_slice(&[0u8; 8]);

    let polymod = polymod(&values) ^ 1;

    let mut checksum = [0u8; 8];
    for (i, c) in checksum.iter_mut().enumerate() {
        *c = ((polymod >> (5 * (7 - i))) & 0x1f) as u8;
    }
    checksum
}

/// BCH polymod over GF(2^5)
fn polymod(values: &[u8]) -> u64 {
    const GENERATORS: [u64; 5] = [
        0x98f2bc8e61,
        0x79b76d99e2,
        0xf33e5fb3c4,
        0xae2eabe2a8,
        0x1e4f43e470,
    ];

    let mut c: u64 = 1;
    for &v in values {
        let c0 = c >> 35;
        c = ((c & 0x07ffffffff) << 5) ^ (v as u64);
        for (i, &gen) in GENERATORS.iter().enumerate() {
            if (c0 >> i) & 1 != 0 {
                c ^= gen;
            }
        }
    }

    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitcoin_wallet::{decode_address, p2pkh_address};
    use crate::types::Chain;
    use crate::utils::network_config::NetworkConfig;

    const PUBKEY: &str = "0241DCD64B5F4A039FC339A16300A833A883B218909F2EBCAF3906651C76842C45";

    #[test]
    fn test_cash_address_from_public_key() {
        let pk = WalletKey::parse(&hex::decode(PUBKEY).unwrap()).unwrap();
        assert_eq!(
            cash_address(&pk, "bitcoincash"),
            "bitcoincash:qrpgfcqrnqvp33vsex0clktvae2pqjfxnyxq0ml0zc"
        );
        let params = NetworkConfig::new().utxo(Chain::BitcoinCash).unwrap();
        assert_eq!(p2pkh_address(&pk, &params), "1JjXGY5KEcbT35uAo6P9A7DebBn4DXnjdQ");
    }

    #[test]
    fn test_decode_with_and_without_prefix() {
        let params = NetworkConfig::new().utxo(Chain::BitcoinCash).unwrap();
        let full = decode_address("bitcoincash:qrpgfcqrnqvp33vsex0clktvae2pqjfxnyxq0ml0zc", &params).unwrap();
        let bare = decode_address("qrpgfcqrnqvp33vsex0clktvae2pqjfxnyxq0ml0zc", &params).unwrap();
        let legacy = decode_address("1JjXGY5KEcbT35uAo6P9A7DebBn4DXnjdQ", &params).unwrap();
        assert_eq!(full, bare);
        assert_eq!(full, legacy);
        assert_eq!(full.kind, UtxoAddressKind::P2pkh);
    }

    #[test]
    fn test_p2sh_roundtrip_and_checksum() {
        let hash = [0x42u8; 20];
        let addr = encode_cash_address("bitcoincash", UtxoAddressKind::P2sh, &hash);
        assert!(addr.starts_with("bitcoincash:p"));
        let decoded = decode_cash_address(&addr, "bitcoincash").unwrap();
        assert_eq!(decoded.script_pubkey, p2sh_script(&hash));

        let mut corrupted = addr.clone();
        corrupted.pop();
        corrupted.push(if addr.ends_with('q') { 'p' } else { 'q' });
        assert!(decode_cash_address(&corrupted, "bitcoincash").is_err());
        assert!(decode_cash_address(&addr, "bchtest").is_err());
    }
}
