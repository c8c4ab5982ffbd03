// Bitcoin-family addresses and output scripts
// Covers Bitcoin mainnet/testnet and Litecoin; Bitcoin Cash adds CashAddr
// on top through bitcoin_cash_wallet.

use crate::bitcoin_cash_wallet;
use crate::encoding::base58::{self, Base58Alphabet};
use crate::error::{LedgerError, LedgerResult};
use crate::utils::crypto::hash160;
use crate::utils::network_config::UtxoParams;
use bech32::{FromBase32, ToBase32, Variant};
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

const OP_0: u8 = 0x00;
const OP_1: u8 = 0x51;
const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;

/// Output type an address resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtxoAddressKind {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    /// SegWit v1 and later (Taproot is v1 with a 32-byte program)
    WitnessV1Plus,
}

/// An address resolved against one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedUtxoAddress {
    pub kind: UtxoAddressKind,
    pub script_pubkey: Vec<u8>,
}

pub fn parse_public_key(bytes: &[u8]) -> LedgerResult<PublicKey> {
    PublicKey::from_slice(bytes)
        .map_err(|e| LedgerError::invalid_input(format!("invalid secp256k1 public key: {}", e)))
}

/// A wallet key that remembers whether it was supplied compressed.
///
/// Key-hash outputs (P2PKH, CashAddr) commit to the key bytes exactly as
/// supplied, so a 65-byte key has its own legacy address. SegWit programs
/// always use the compressed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletKey {
    key: PublicKey,
    compressed: bool,
}

impl WalletKey {
    pub fn parse(bytes: &[u8]) -> LedgerResult<Self> {
        Ok(Self {
            key: parse_public_key(bytes)?,
            compressed: bytes.len() == 33,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Key bytes in the supplied form, as pushed by a P2PKH scriptSig
    pub fn serialize(&self) -> Vec<u8> {
        if self.compressed {
            self.key.serialize().to_vec()
        } else {
            self.key.serialize_uncompressed().to_vec()
        }
    }

    /// HASH160 committed to by this key's P2PKH outputs
    pub fn key_hash(&self) -> [u8; 20] {
        hash160(&self.serialize())
    }
}

impl From<PublicKey> for WalletKey {
    fn from(key: PublicKey) -> Self {
        Self {
            key,
            compressed: true,
        }
    }
}

/// Legacy pay-to-public-key-hash address (1..., m..., L...)
pub fn p2pkh_address(key: &WalletKey, params: &UtxoParams) -> String {
    let mut payload = vec![params.p2pkh_version];
    payload.extend_from_slice(&key.key_hash());
    base58::encode_check(&payload, Base58Alphabet::Bitcoin)
}

/// Native SegWit v0 key-hash address (bc1q..., tb1q..., ltc1q...)
pub fn p2wpkh_address(public_key: &PublicKey, params: &UtxoParams) -> LedgerResult<String> {
    if params.bech32_hrp.is_empty() {
        return Err(LedgerError::unsupported("network has no SegWit addresses"));
    }
    segwit_address(&params.bech32_hrp, 0, &hash160(&public_key.serialize()))
}

/// SegWit key-hash nested in P2SH (3..., 2..., M...)
pub fn p2sh_p2wpkh_address(public_key: &PublicKey, params: &UtxoParams) -> String {
    let redeem = p2sh_p2wpkh_redeem_script(public_key);
    let mut payload = vec![params.p2sh_version];
    payload.extend_from_slice(&hash160(&redeem));
    base58::encode_check(&payload, Base58Alphabet::Bitcoin)
}

pub fn segwit_address(hrp: &str, version: u8, program: &[u8]) -> LedgerResult<String> {
    let variant = if version == 0 { Variant::Bech32 } else { Variant::Bech32m };
    let mut data = vec![bech32::u5::try_from_u8(version)?];
    data.extend(program.to_base32());
    Ok(bech32::encode(hrp, data, variant)?)
}

// =============================================================================
// Scripts
// =============================================================================

pub fn p2pkh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![OP_DUP, OP_HASH160, 0x14];
    script.extend_from_slice(hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

pub fn p2sh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![OP_HASH160, 0x14];
    script.extend_from_slice(hash);
    script.push(OP_EQUAL);
    script
}

/// `<version opcode> <program>`
pub fn witness_script(version: u8, program: &[u8]) -> Vec<u8> {
    let opcode = if version == 0 { OP_0 } else { OP_1 + version - 1 };
    let mut script = vec![opcode, program.len() as u8];
    script.extend_from_slice(program);
    script
}

pub fn p2wpkh_script(public_key: &PublicKey) -> Vec<u8> {
    witness_script(0, &hash160(&public_key.serialize()))
}

/// Redeem script `0014 <hash160(pk)>` for a nested P2WPKH input
pub fn p2sh_p2wpkh_redeem_script(public_key: &PublicKey) -> Vec<u8> {
    p2wpkh_script(public_key)
}

/// BIP-143 scriptCode of a key-hash spend
pub fn p2wpkh_script_code(public_key: &PublicKey) -> Vec<u8> {
    p2pkh_script(&hash160(&public_key.serialize()))
}

// =============================================================================
// Address Resolution
// =============================================================================

/// Resolve `address` to its output script on the network described by `params`
pub fn decode_address(address: &str, params: &UtxoParams) -> LedgerResult<DecodedUtxoAddress> {
    let address = address.trim();
    if address.is_empty() {
        return Err(LedgerError::invalid_address("empty address"));
    }

    if let Some(prefix) = params.cashaddr_prefix.as_deref() {
        if bitcoin_cash_wallet::looks_like_cashaddr(address, prefix) {
            return bitcoin_cash_wallet::decode_cash_address(address, prefix);
        }
    }

    if !params.bech32_hrp.is_empty() {
        let lower = address.to_ascii_lowercase();
        if lower.starts_with(&format!("{}1", params.bech32_hrp)) {
            return decode_segwit(address, &params.bech32_hrp);
        }
    }

    decode_base58(address, params)
}

fn decode_base58(address: &str, params: &UtxoParams) -> LedgerResult<DecodedUtxoAddress> {
    let payload = base58::decode_check(address, Base58Alphabet::Bitcoin)?;
    if payload.len() != 21 {
        return Err(LedgerError::invalid_address(format!(
            "base58 payload is {} bytes, expected 21",
            payload.len()
        )));
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);

    match payload[0] {
        v if v == params.p2pkh_version => Ok(DecodedUtxoAddress {
            kind: UtxoAddressKind::P2pkh,
            script_pubkey: p2pkh_script(&hash),
        }),
        v if v == params.p2sh_version => Ok(DecodedUtxoAddress {
            kind: UtxoAddressKind::P2sh,
            script_pubkey: p2sh_script(&hash),
        }),
        v => Err(LedgerError::invalid_address(format!(
            "version byte 0x{:02x} does not belong to this network",
            v
        ))),
    }
}

fn decode_segwit(address: &str, expected_hrp: &str) -> LedgerResult<DecodedUtxoAddress> {
    let has_lower = address.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = address.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(LedgerError::invalid_address("mixed-case bech32 address"));
    }

    let (hrp, data, variant) = bech32::decode(address)?;
    if hrp != expected_hrp {
        return Err(LedgerError::invalid_address(format!(
            "human-readable part '{}' does not match '{}'",
            hrp, expected_hrp
        )));
    }
    let (version, program) = data
        .split_first()
        .ok_or_else(|| LedgerError::invalid_address("empty witness program"))?;
    let version = version.to_u8();
    let program = Vec::<u8>::from_base32(program)?;

    if version > 16 {
        return Err(LedgerError::invalid_address(format!(
            "witness version {} out of range",
            version
        )));
    }
    if !(2..=40).contains(&program.len()) {
        return Err(LedgerError::invalid_address(format!(
            "witness program of {} bytes",
            program.len()
        )));
    }

    let kind = match (version, program.len()) {
        (0, 20) => UtxoAddressKind::P2wpkh,
        (0, 32) => UtxoAddressKind::P2wsh,
        (0, n) => {
            return Err(LedgerError::invalid_address(format!(
                "v0 witness program must be 20 or 32 bytes, got {}",
                n
            )))
        }
        _ => UtxoAddressKind::WitnessV1Plus,
    };

    let expected_variant = if version == 0 { Variant::Bech32 } else { Variant::Bech32m };
    if variant != expected_variant {
        return Err(LedgerError::invalid_address(
            "checksum variant does not match witness version",
        ));
    }

    Ok(DecodedUtxoAddress {
        kind,
        script_pubkey: witness_script(version, &program),
    })
}
