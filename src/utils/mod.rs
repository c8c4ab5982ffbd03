//! Hashing primitives, redacting log output and per-chain network parameters.

pub mod crypto;
pub mod logging;
pub mod network_config;

pub use crypto::*;
