//! Byte-level codecs shared by the ledger builders
//!
//! Every ledger speaks its own wire dialect; the builders compose these
//! writers rather than depending on per-chain protocol compilers.

pub mod base58;
pub mod cbor;
pub mod rlp;
pub mod varint;
pub mod xdr;
