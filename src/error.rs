//! Unified error types for ledger-preimage
//!
//! Every builder, codec and normalizer reports failures through
//! [`LedgerError`] so callers get a single, serializable error shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all preimage and assembly operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl LedgerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn invalid_fee(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFeeParameters, msg)
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientFunds, msg)
    }

    pub fn no_spendable_outputs(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoSpendableOutputs, msg)
    }

    pub fn verification_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SignatureVerificationFailed, msg)
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedContractOrAssetKind, msg)
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::EncodingFailed, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, msg)
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, msg)
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for LedgerError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Build errors
    InvalidAddress,
    InvalidFeeParameters,
    InsufficientFunds,
    NoSpendableOutputs,
    UnsupportedContractOrAssetKind,

    // Signature errors
    SignatureVerificationFailed,

    // Encoding errors
    EncodingFailed,
    HexError,
    JsonError,

    // Caller errors
    InvalidInput,
    InvalidConfig,
    InvalidState,
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failures raised by the byte-level codecs (RLP, CBOR, XDR, varints)
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEnd(usize),

    #[error("unexpected major type {found} at offset {offset}")]
    UnexpectedType { found: u8, offset: usize },

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("trailing bytes after value: {0}")]
    TrailingBytes(usize),

    #[error("invalid encoding: {0}")]
    Invalid(String),
}

pub type CodecResult<T> = Result<T, CodecError>;

// Conversions from common error types

impl From<CodecError> for LedgerError {
    fn from(e: CodecError) -> Self {
        LedgerError::new(ErrorCode::EncodingFailed, e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for LedgerError {
    fn from(e: hex::FromHexError) -> Self {
        LedgerError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::new(ErrorCode::InvalidInput, e.to_string())
    }
}

impl From<secp256k1::Error> for LedgerError {
    fn from(e: secp256k1::Error) -> Self {
        LedgerError::new(
            ErrorCode::SignatureVerificationFailed,
            format!("secp256k1 error: {}", e),
        )
    }
}

impl From<ed25519_dalek::SignatureError> for LedgerError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        LedgerError::new(
            ErrorCode::SignatureVerificationFailed,
            format!("ed25519 error: {}", e),
        )
    }
}

impl From<bech32::Error> for LedgerError {
    fn from(e: bech32::Error) -> Self {
        LedgerError::new(ErrorCode::InvalidAddress, format!("bech32 error: {}", e))
    }
}

impl From<bs58::decode::Error> for LedgerError {
    fn from(e: bs58::decode::Error) -> Self {
        LedgerError::new(ErrorCode::InvalidAddress, format!("base58 error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code_and_details() {
        let err = LedgerError::insufficient_funds("need 10, have 5").with_details("fee 1");
        assert_eq!(
            err.to_string(),
            "[InsufficientFunds] need 10, have 5 (fee 1)"
        );
    }

    #[test]
    fn test_codec_error_maps_to_encoding_failed() {
        let err: LedgerError = CodecError::UnexpectedEnd(4).into();
        assert_eq!(err.code, ErrorCode::EncodingFailed);
        assert!(err.message.contains("offset 4"));
    }

    #[test]
    fn test_error_code_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCode::SignatureVerificationFailed).unwrap();
        assert_eq!(json, "\"signature_verification_failed\"");
    }
}
