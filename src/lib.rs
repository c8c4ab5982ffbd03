//! Ledger Preimage Library
//!
//! Builds the exact bytes a detached signer must sign for several ledgers,
//! then turns the signatures it returns into broadcast-ready transactions.
//!
//! # Architecture
//!
//! This crate provides:
//! - **tx**: per-ledger builders (`build_preimage` / `assemble`) and the
//!   build session that drives them around an async external signer
//! - **signing**: preimage encoders, the signature normalizer and the
//!   signed-transaction compilers
//! - **fees**: fee levels from market prices and estimated sizes
//! - **wallet**: address derivation and validation
//! - **encoding**: RLP, XDR, CBOR, Base58 and varint codecs
//! - **utils**: hashing, structured logging and network configuration
//!
//! Supported ledgers: Bitcoin (main and test), Litecoin, Bitcoin Cash,
//! Ethereum-family chains, XRP Ledger, Stellar and Cardano.
//!
//! # Security
//!
//! No private key ever enters this crate. Signatures are verified against
//! the wallet's public key before a transaction is assembled, and ECDSA
//! signatures are normalized to low-S.
//!
//! # Example
//!
//! ```rust,ignore
//! use ledger_preimage::tx::{BuildSession, LedgerBuilder};
//!
//! let builder = LedgerBuilder::for_chain(Chain::Bitcoin, &config, &wallet)?;
//! let mut session = BuildSession::new(builder);
//! let signed = session.run(&intent, &device).await?;
//! println!("{}", signed.raw_hex());
//! ```

pub mod error;
pub mod types;
pub mod serde_bytes;
pub mod encoding;
pub mod signing;
pub mod tx;
pub mod fees;
pub mod wallet;
pub mod utils;

// Per-chain address and script helpers
pub mod bitcoin_wallet;
pub mod bitcoin_cash_wallet;
pub mod ethereum_wallet;
pub mod xrp_wallet;
pub mod stellar_wallet;
pub mod cardano_wallet;

// Re-export key types for convenience
pub use error::{ErrorCode, LedgerError, LedgerResult};
pub use types::*;

// Re-export crypto utilities for binaries and integration tests
pub use utils::crypto::{keccak256, to_checksum_address};
