//! Signature Normalizer
//!
//! Free functions turning a raw 64-byte signature into a
//! [`NormalizedSignature`]. A `NormalizedSignature` can only be produced
//! here, after verification against the signed payload and the claimed
//! public key has succeeded.

use super::preimage::{RawSignature, SigningAlgorithm};
use crate::error::{LedgerError, LedgerResult};
use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signature as Ed25519Signature, VerifyingKey};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{Message, PublicKey, Secp256k1};

/// A signature that verified against its payload and key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSignature {
    algorithm: SigningAlgorithm,
    bytes: [u8; 64],
    recovery_id: Option<u8>,
}

impl NormalizedSignature {
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Compact r ‖ s (low-S) or the ed25519 R ‖ S
    pub fn bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    pub fn r(&self) -> &[u8] {
        &self.bytes[..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.bytes[32..]
    }

    pub fn recovery_id(&self) -> Option<u8> {
        self.recovery_id
    }

    /// DER encoding of an ECDSA signature
    pub fn to_der(&self) -> LedgerResult<Vec<u8>> {
        if self.algorithm != SigningAlgorithm::Secp256k1Ecdsa {
            return Err(LedgerError::invalid_state("DER applies to ECDSA signatures only"));
        }
        der_encode(&self.bytes)
    }
}

/// secp256k1 group order n
const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// n / 2, the largest S accepted as low
pub const HALF_CURVE_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

pub fn is_low_s(s: &[u8]) -> bool {
    s <= &HALF_CURVE_ORDER[..]
}

/// Replace S by n - S when S is in the upper half of the order
pub fn normalize_s(compact: &[u8; 64]) -> [u8; 64] {
    let mut out = *compact;
    if is_low_s(&compact[32..]) {
        return out;
    }
    let mut borrow = 0i16;
    for i in (0..32).rev() {
        let diff = CURVE_ORDER[i] as i16 - compact[32 + i] as i16 - borrow;
        if diff < 0 {
            out[32 + i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            out[32 + i] = diff as u8;
            borrow = 0;
        }
    }
    out
}

/// DER encoding of a compact r ‖ s
pub fn der_encode(compact: &[u8; 64]) -> LedgerResult<Vec<u8>> {
    let sig = Signature::from_compact(compact)
        .map_err(|e| LedgerError::verification_failed(format!("malformed signature: {}", e)))?;
    Ok(sig.serialize_der().to_vec())
}

/// Low-S normalize and verify an ECDSA signature over `digest`
pub fn normalize_ecdsa(
    raw: &RawSignature,
    digest: &[u8; 32],
    public_key: &PublicKey,
) -> LedgerResult<NormalizedSignature> {
    let bytes = normalize_s(&raw.bytes);
    let sig = Signature::from_compact(&bytes)
        .map_err(|e| LedgerError::verification_failed(format!("malformed signature: {}", e)))?;

    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&Message::from_digest(*digest), &sig, public_key)
        .map_err(|_| {
            LedgerError::verification_failed("signature does not verify against the sender key")
        })?;

    Ok(NormalizedSignature {
        algorithm: SigningAlgorithm::Secp256k1Ecdsa,
        bytes,
        recovery_id: None,
    })
}

/// Find the recovery id in {0, 1} whose recovered key equals `public_key`
pub fn find_recovery_id(
    compact: &[u8; 64],
    digest: &[u8; 32],
    public_key: &PublicKey,
) -> LedgerResult<u8> {
    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(*digest);

    let matches: Vec<u8> = (0..2u8)
        .filter(|candidate| {
            RecoveryId::from_i32(*candidate as i32)
                .and_then(|id| RecoverableSignature::from_compact(compact, id))
                .and_then(|sig| secp.recover_ecdsa(&message, &sig))
                .map(|recovered| recovered == *public_key)
                .unwrap_or(false)
        })
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(LedgerError::verification_failed(
            "no recovery id reproduces the sender key",
        )),
        _ => Err(LedgerError::verification_failed("ambiguous recovery id")),
    }
}

/// Normalize, verify, and attach the recovery id (account models that embed it)
pub fn normalize_ecdsa_recoverable(
    raw: &RawSignature,
    digest: &[u8; 32],
    public_key: &PublicKey,
) -> LedgerResult<NormalizedSignature> {
    let mut normalized = normalize_ecdsa(raw, digest, public_key)?;
    normalized.recovery_id = Some(find_recovery_id(&normalized.bytes, digest, public_key)?);
    Ok(normalized)
}

/// Recover the signer key of a normalized signature with a recovery id
pub fn recover_public_key(
    signature: &NormalizedSignature,
    digest: &[u8; 32],
) -> LedgerResult<PublicKey> {
    let id = signature
        .recovery_id
        .ok_or_else(|| LedgerError::invalid_state("signature carries no recovery id"))?;
    let secp = Secp256k1::verification_only();
    let sig = RecoverableSignature::from_compact(&signature.bytes, RecoveryId::from_i32(id as i32)?)?;
    Ok(secp.recover_ecdsa(&Message::from_digest(*digest), &sig)?)
}

/// Verify an ed25519 signature over `message`, rejecting small-order keys
pub fn verify_ed25519(
    raw: &RawSignature,
    message: &[u8],
    public_key: &[u8; 32],
) -> LedgerResult<NormalizedSignature> {
    let point = CompressedEdwardsY(*public_key)
        .decompress()
        .ok_or_else(|| LedgerError::verification_failed("public key is not a curve point"))?;
    if point.is_small_order() {
        return Err(LedgerError::verification_failed("public key has small order"));
    }

    let key = VerifyingKey::from_bytes(public_key)?;
    let sig = Ed25519Signature::from_bytes(&raw.bytes);
    key.verify_strict(message, &sig).map_err(|_| {
        LedgerError::verification_failed("ed25519 signature does not verify against the key")
    })?;

    Ok(NormalizedSignature {
        algorithm: SigningAlgorithm::Ed25519,
        bytes: raw.bytes,
        recovery_id: None,
    })
}
