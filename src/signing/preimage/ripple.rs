//! Ripple Pre-Image Generation
//!
//! Canonical binary serialization of a Payment. Fields are sorted by
//! (type code, field code); the signing form is prefixed with `STX\0`.

use super::{SigningAlgorithm, SigningPreimage};
use crate::error::{LedgerError, LedgerResult};
use crate::utils::crypto::sha512_half;
use crate::xrp_wallet::RippleKeyType;
use serde::{Deserialize, Serialize};

/// Prefix of the single-signing serialization
pub const SIGNING_PREFIX: [u8; 4] = *b"STX\0";
/// Prefix hashed with a signed blob to obtain the transaction id
pub const TRANSACTION_ID_PREFIX: [u8; 4] = *b"TXN\0";

/// Largest native amount representable, 10^17 drops
pub const MAX_NATIVE_DROPS: u64 = 100_000_000_000_000_000;

const NATIVE_POSITIVE: u64 = 0x4000_0000_0000_0000;
const TRANSACTION_TYPE_PAYMENT: u16 = 0;

// type codes
const TYPE_UINT16: u8 = 1;
const TYPE_UINT32: u8 = 2;
const TYPE_AMOUNT: u8 = 6;
const TYPE_BLOB: u8 = 7;
const TYPE_ACCOUNT: u8 = 8;

/// Unsigned Payment transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedRipplePayment {
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub account: Vec<u8>,
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub destination: Vec<u8>,
    pub amount_drops: u64,
    pub fee_drops: u64,
    pub sequence: u32,
    pub destination_tag: Option<u32>,
    pub last_ledger_sequence: Option<u32>,
    /// Key as it appears in SigningPubKey (0xED-prefixed for ed25519)
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub signing_pub_key: Vec<u8>,
    pub key_type: RippleKeyType,
}

struct Field {
    type_code: u8,
    field_code: u8,
    value: Vec<u8>,
}

impl Field {
    fn new(type_code: u8, field_code: u8, value: Vec<u8>) -> Self {
        Self {
            type_code,
            field_code,
            value,
        }
    }

    fn write(&self, buf: &mut Vec<u8>) {
        write_field_id(self.type_code, self.field_code, buf);
        buf.extend_from_slice(&self.value);
    }
}

/// Field identifier: one byte when both codes are below 16, otherwise
/// the small code shares the first byte and large codes follow
pub fn write_field_id(type_code: u8, field_code: u8, buf: &mut Vec<u8>) {
    match (type_code < 16, field_code < 16) {
        (true, true) => buf.push((type_code << 4) | field_code),
        (true, false) => {
            buf.push(type_code << 4);
            buf.push(field_code);
        }
        (false, true) => {
            buf.push(field_code);
            buf.push(type_code);
        }
        (false, false) => {
            buf.push(0);
            buf.push(type_code);
            buf.push(field_code);
        }
    }
}

/// Variable-length prefix used by Blob and AccountID fields
pub fn encode_variable_length(contents: &[u8]) -> LedgerResult<Vec<u8>> {
    let len = contents.len();
    let mut out = Vec::with_capacity(len + 3);
    if len <= 192 {
        out.push(len as u8);
    } else if len <= 12_480 {
        let rest = len - 193;
        out.push((193 + (rest >> 8)) as u8);
        out.push((rest & 0xff) as u8);
    } else if len <= 918_744 {
        let rest = len - 12_481;
        out.push((241 + (rest >> 16)) as u8);
        out.push(((rest >> 8) & 0xff) as u8);
        out.push((rest & 0xff) as u8);
    } else {
        return Err(LedgerError::encoding(format!(
            "variable-length field of {} bytes is too long",
            len
        )));
    }
    out.extend_from_slice(contents);
    Ok(out)
}

/// Native XRP amount: positive bit set, 62-bit drop count
pub fn encode_native_amount(drops: u64) -> LedgerResult<Vec<u8>> {
    if drops > MAX_NATIVE_DROPS {
        return Err(LedgerError::encoding(format!(
            "{} drops exceeds the native amount range",
            drops
        )));
    }
    Ok((NATIVE_POSITIVE | drops).to_be_bytes().to_vec())
}

impl UnsignedRipplePayment {
    fn fields(&self, signature: Option<&[u8]>) -> LedgerResult<Vec<Field>> {
        let mut fields = vec![
            Field::new(TYPE_UINT16, 2, TRANSACTION_TYPE_PAYMENT.to_be_bytes().to_vec()),
            Field::new(TYPE_UINT32, 4, self.sequence.to_be_bytes().to_vec()),
            Field::new(TYPE_AMOUNT, 1, encode_native_amount(self.amount_drops)?),
            Field::new(TYPE_AMOUNT, 8, encode_native_amount(self.fee_drops)?),
            Field::new(TYPE_BLOB, 3, encode_variable_length(&self.signing_pub_key)?),
            Field::new(TYPE_ACCOUNT, 1, encode_variable_length(&self.account)?),
            Field::new(TYPE_ACCOUNT, 3, encode_variable_length(&self.destination)?),
        ];
        if let Some(tag) = self.destination_tag {
            fields.push(Field::new(TYPE_UINT32, 14, tag.to_be_bytes().to_vec()));
        }
        if let Some(ledger) = self.last_ledger_sequence {
            fields.push(Field::new(TYPE_UINT32, 27, ledger.to_be_bytes().to_vec()));
        }
        if let Some(signature) = signature {
            fields.push(Field::new(TYPE_BLOB, 4, encode_variable_length(signature)?));
        }

        fields.sort_by_key(|f| (f.type_code, f.field_code));
        Ok(fields)
    }

    /// Canonical field serialization, with TxnSignature when given
    pub fn serialize(&self, signature: Option<&[u8]>) -> LedgerResult<Vec<u8>> {
        let mut buf = Vec::new();
        for field in self.fields(signature)? {
            field.write(&mut buf);
        }
        Ok(buf)
    }

    /// `STX\0 ‖ fields`
    pub fn signing_data(&self) -> LedgerResult<Vec<u8>> {
        let mut data = SIGNING_PREFIX.to_vec();
        data.extend_from_slice(&self.serialize(None)?);
        Ok(data)
    }
}

/// Signing preimage: secp256k1 signs SHA-512-half of the signing data,
/// ed25519 signs the signing data itself
pub fn ripple_preimage(tx: &UnsignedRipplePayment) -> LedgerResult<SigningPreimage> {
    let preimage = tx.signing_data()?;
    let (payload, algorithm) = match tx.key_type {
        RippleKeyType::Secp256k1 => (
            sha512_half(&preimage).to_vec(),
            SigningAlgorithm::Secp256k1Ecdsa,
        ),
        RippleKeyType::Ed25519 => (preimage.clone(), SigningAlgorithm::Ed25519),
    };

    Ok(SigningPreimage::new(preimage, payload, algorithm).with_description(format!(
        "Payment of {} drops (fee {}, sequence {})",
        tx.amount_drops, tx.fee_drops, tx.sequence
    )))
}

/// Transaction id of a signed blob
pub fn transaction_id(signed_blob: &[u8]) -> [u8; 32] {
    let mut data = TRANSACTION_ID_PREFIX.to_vec();
    data.extend_from_slice(signed_blob);
    sha512_half(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(key_type: RippleKeyType) -> UnsignedRipplePayment {
        UnsignedRipplePayment {
            account: vec![0x11; 20],
            destination: vec![0x22; 20],
            amount_drops: 1_000_000,
            fee_drops: 12,
            sequence: 7,
            destination_tag: Some(12345),
            last_ledger_sequence: None,
            signing_pub_key: vec![0x02; 33],
            key_type,
        }
    }

    #[test]
    fn test_field_ids() {
        let mut buf = Vec::new();
        write_field_id(TYPE_UINT16, 2, &mut buf);
        write_field_id(TYPE_UINT32, 27, &mut buf);
        write_field_id(TYPE_ACCOUNT, 3, &mut buf);
        write_field_id(16, 1, &mut buf);
        write_field_id(16, 16, &mut buf);
        assert_eq!(buf, vec![0x12, 0x20, 0x1b, 0x83, 0x01, 0x10, 0x00, 0x10, 0x10]);
    }

    #[test]
    fn test_variable_length_prefix() {
        assert_eq!(encode_variable_length(&[0u8; 192]).unwrap()[0], 192);
        let two = encode_variable_length(&[0u8; 193]).unwrap();
        assert_eq!(&two[..2], &[193, 0]);
        let two = encode_variable_length(&[0u8; 12_480]).unwrap();
        assert_eq!(&two[..2], &[240, 255]);
        let three = encode_variable_length(&[0u8; 12_481]).unwrap();
        assert_eq!(&three[..3], &[241, 0, 0]);
    }

    #[test]
    fn test_native_amount() {
        assert_eq!(
            encode_native_amount(1_000_000).unwrap(),
            vec![0x40, 0, 0, 0, 0, 0x0f, 0x42, 0x40]
        );
        assert!(encode_native_amount(MAX_NATIVE_DROPS + 1).is_err());
    }

    #[test]
    fn test_canonical_field_order() {
        let bytes = payment(RippleKeyType::Secp256k1).serialize(None).unwrap();
        // TransactionType, Sequence, DestinationTag, Amount, Fee, SigningPubKey, Account, Destination
        assert_eq!(&bytes[..3], &[0x12, 0x00, 0x00]);
        assert_eq!(bytes[3], 0x24);
        assert_eq!(bytes[8], 0x2e);
        assert_eq!(bytes[13], 0x61);
        assert_eq!(bytes[22], 0x68);
        assert_eq!(bytes[31], 0x73);
        assert_eq!(bytes[32], 33);
        assert_eq!(bytes[66], 0x81);
        assert_eq!(bytes[67], 20);
        assert_eq!(bytes[88], 0x83);
        assert_eq!(bytes.len(), 88 + 2 + 20);
    }

    #[test]
    fn test_signature_field_sorts_after_pubkey() {
        let tx = payment(RippleKeyType::Secp256k1);
        let unsigned = tx.serialize(None).unwrap();
        let signed = tx.serialize(Some(&[0xaa; 70])).unwrap();
        assert_eq!(signed.len(), unsigned.len() + 2 + 70);
        // TxnSignature directly follows the 33-byte SigningPubKey
        assert_eq!(signed[31 + 2 + 33], 0x74);
        assert_eq!(signed[31 + 2 + 33 + 1], 70);
    }

    #[test]
    fn test_preimage_payload_by_key_type() {
        let secp = ripple_preimage(&payment(RippleKeyType::Secp256k1)).unwrap();
        assert_eq!(&secp.preimage[..4], b"STX\0");
        assert_eq!(secp.payload, sha512_half(&secp.preimage).to_vec());
        assert_eq!(secp.algorithm, SigningAlgorithm::Secp256k1Ecdsa);

        let ed = ripple_preimage(&payment(RippleKeyType::Ed25519)).unwrap();
        assert_eq!(ed.payload, ed.preimage);
        assert_eq!(ed.algorithm, SigningAlgorithm::Ed25519);
    }

    #[test]
    fn test_last_ledger_sequence_header() {
        let mut tx = payment(RippleKeyType::Secp256k1);
        tx.destination_tag = None;
        tx.last_ledger_sequence = Some(90_000_000);
        let bytes = tx.serialize(None).unwrap();
        assert_eq!(&bytes[8..10], &[0x20, 0x1b]);
        assert_eq!(&bytes[10..14], &90_000_000u32.to_be_bytes());
    }
}
