//! Wallet Module
//!
//! Address derivation from public keys and address validation for every
//! supported chain. Key material never enters this crate.

mod address_validation;
mod derivation;

pub use address_validation::*;
pub use derivation::*;
