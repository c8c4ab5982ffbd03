//! Stellar Pre-Image Generation
//!
//! XDR model of a single-operation `Transaction` and its
//! `TransactionEnvelope`. The signed payload is
//! `SHA-256(networkId ‖ ENVELOPE_TYPE_TX ‖ tx)`.

use super::{SigningAlgorithm, SigningPreimage};
use crate::encoding::xdr::XdrWriter;
use crate::error::{LedgerError, LedgerResult};
use crate::utils::crypto::sha256;
use serde::{Deserialize, Serialize};

pub const ENVELOPE_TYPE_TX: i32 = 2;
/// Longest MEMO_TEXT, in bytes
pub const MAX_MEMO_TEXT: usize = 28;

const KEY_TYPE_ED25519: u32 = 0;
const KEY_TYPE_MUXED_ED25519: u32 = 0x100;
const PUBLIC_KEY_TYPE_ED25519: i32 = 0;

const OP_CREATE_ACCOUNT: i32 = 0;
const OP_PAYMENT: i32 = 1;
const OP_CHANGE_TRUST: i32 = 6;

const PRECOND_NONE: i32 = 0;
const PRECOND_TIME: i32 = 1;

/// Account that may carry a muxed sub-account id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuxedAccount {
    #[serde(with = "crate::serde_bytes::hex32")]
    pub key: [u8; 32],
    pub id: Option<u64>,
}

impl MuxedAccount {
    pub fn plain(key: [u8; 32]) -> Self {
        Self { key, id: None }
    }

    fn write(&self, xdr: &mut XdrWriter) {
        match self.id {
            None => {
                xdr.write_u32(KEY_TYPE_ED25519).write_fixed(&self.key);
            }
            Some(id) => {
                xdr.write_u32(KEY_TYPE_MUXED_ED25519)
                    .write_u64(id)
                    .write_fixed(&self.key);
            }
        }
    }
}

fn write_account_id(key: &[u8; 32], xdr: &mut XdrWriter) {
    xdr.write_i32(PUBLIC_KEY_TYPE_ED25519).write_fixed(key);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StellarAsset {
    Native,
    CreditAlphanum4 {
        code: String,
        #[serde(with = "crate::serde_bytes::hex32")]
        issuer: [u8; 32],
    },
    CreditAlphanum12 {
        code: String,
        #[serde(with = "crate::serde_bytes::hex32")]
        issuer: [u8; 32],
    },
}

impl StellarAsset {
    /// Pick AlphaNum4 or AlphaNum12 by code length
    pub fn issued(code: &str, issuer: [u8; 32]) -> LedgerResult<Self> {
        let valid_chars = code.bytes().all(|b| b.is_ascii_alphanumeric());
        match code.len() {
            1..=4 if valid_chars => Ok(StellarAsset::CreditAlphanum4 {
                code: code.to_string(),
                issuer,
            }),
            5..=12 if valid_chars => Ok(StellarAsset::CreditAlphanum12 {
                code: code.to_string(),
                issuer,
            }),
            _ => Err(LedgerError::unsupported(format!(
                "'{}' is not a valid Stellar asset code",
                code
            ))),
        }
    }

    fn write(&self, xdr: &mut XdrWriter) {
        match self {
            StellarAsset::Native => {
                xdr.write_i32(0);
            }
            StellarAsset::CreditAlphanum4 { code, issuer } => {
                xdr.write_i32(1).write_fixed(&padded_code::<4>(code));
                write_account_id(issuer, xdr);
            }
            StellarAsset::CreditAlphanum12 { code, issuer } => {
                xdr.write_i32(2).write_fixed(&padded_code::<12>(code));
                write_account_id(issuer, xdr);
            }
        }
    }
}

fn padded_code<const N: usize>(code: &str) -> [u8; N] {
    let mut out = [0u8; N];
    for (slot, byte) in out.iter_mut().zip(code.bytes()) {
        *slot = byte;
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StellarOperation {
    CreateAccount {
        #[serde(with = "crate::serde_bytes::hex32")]
        destination: [u8; 32],
        starting_balance: i64,
    },
    Payment {
        destination: MuxedAccount,
        asset: StellarAsset,
        amount: i64,
    },
    ChangeTrust {
        asset: StellarAsset,
        limit: i64,
    },
}

impl StellarOperation {
    pub fn name(&self) -> &'static str {
        match self {
            StellarOperation::CreateAccount { .. } => "create_account",
            StellarOperation::Payment { .. } => "payment",
            StellarOperation::ChangeTrust { .. } => "change_trust",
        }
    }

    fn write(&self, xdr: &mut XdrWriter) {
        // no per-operation source account
        xdr.write_bool(false);
        match self {
            StellarOperation::CreateAccount {
                destination,
                starting_balance,
            } => {
                xdr.write_i32(OP_CREATE_ACCOUNT);
                write_account_id(destination, xdr);
                xdr.write_i64(*starting_balance);
            }
            StellarOperation::Payment {
                destination,
                asset,
                amount,
            } => {
                xdr.write_i32(OP_PAYMENT);
                destination.write(xdr);
                asset.write(xdr);
                xdr.write_i64(*amount);
            }
            StellarOperation::ChangeTrust { asset, limit } => {
                xdr.write_i32(OP_CHANGE_TRUST);
                asset.write(xdr);
                xdr.write_i64(*limit);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StellarMemo {
    #[default]
    None,
    Text(String),
    Id(u64),
}

impl StellarMemo {
    fn write(&self, xdr: &mut XdrWriter) -> LedgerResult<()> {
        match self {
            StellarMemo::None => {
                xdr.write_i32(0);
            }
            StellarMemo::Text(text) => {
                if text.len() > MAX_MEMO_TEXT {
                    return Err(LedgerError::invalid_input(format!(
                        "memo text is {} bytes, at most {} allowed",
                        text.len(),
                        MAX_MEMO_TEXT
                    )));
                }
                xdr.write_i32(1).write_var(text.as_bytes());
            }
            StellarMemo::Id(id) => {
                xdr.write_i32(2).write_u64(*id);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

/// Unsigned single-operation transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedStellarTransaction {
    pub source: MuxedAccount,
    pub fee: u32,
    /// Sequence number carried by the transaction (account sequence + 1)
    pub sequence: i64,
    pub time_bounds: Option<TimeBounds>,
    #[serde(default)]
    pub memo: StellarMemo,
    pub operation: StellarOperation,
    pub network_passphrase: String,
}

impl UnsignedStellarTransaction {
    /// `Transaction` XDR
    pub fn to_xdr(&self) -> LedgerResult<Vec<u8>> {
        let mut xdr = XdrWriter::new();
        self.source.write(&mut xdr);
        xdr.write_u32(self.fee).write_i64(self.sequence);

        match self.time_bounds {
            None => {
                xdr.write_i32(PRECOND_NONE);
            }
            Some(bounds) => {
                xdr.write_i32(PRECOND_TIME)
                    .write_u64(bounds.min_time)
                    .write_u64(bounds.max_time);
            }
        }

        self.memo.write(&mut xdr)?;

        xdr.write_u32(1);
        self.operation.write(&mut xdr);

        // ext
        xdr.write_i32(0);
        Ok(xdr.into_bytes())
    }

    pub fn network_id(&self) -> [u8; 32] {
        sha256(self.network_passphrase.as_bytes())
    }

    /// `networkId ‖ ENVELOPE_TYPE_TX ‖ tx`
    pub fn signature_base(&self) -> LedgerResult<Vec<u8>> {
        let mut xdr = XdrWriter::new();
        xdr.write_raw(&self.network_id())
            .write_i32(ENVELOPE_TYPE_TX)
            .write_raw(&self.to_xdr()?);
        Ok(xdr.into_bytes())
    }

    pub fn hash(&self) -> LedgerResult<[u8; 32]> {
        Ok(sha256(&self.signature_base()?))
    }

    /// `TransactionEnvelope` with one decorated signature
    pub fn envelope(&self, signer_key: &[u8; 32], signature: &[u8; 64]) -> LedgerResult<Vec<u8>> {
        let mut xdr = XdrWriter::new();
        xdr.write_i32(ENVELOPE_TYPE_TX).write_raw(&self.to_xdr()?);
        xdr.write_u32(1)
            .write_fixed(&signature_hint(signer_key))
            .write_var(signature);
        Ok(xdr.into_bytes())
    }
}

/// Last four bytes of the signer's key
pub fn signature_hint(key: &[u8; 32]) -> [u8; 4] {
    let mut hint = [0u8; 4];
    hint.copy_from_slice(&key[28..]);
    hint
}

pub fn stellar_preimage(tx: &UnsignedStellarTransaction) -> LedgerResult<SigningPreimage> {
    let base = tx.signature_base()?;
    let hash = sha256(&base);

    Ok(SigningPreimage::new(base, hash.to_vec(), SigningAlgorithm::Ed25519).with_description(
        format!(
            "{} (fee {} stroops, sequence {})",
            tx.operation.name(),
            tx.fee,
            tx.sequence
        ),
    ))
}
