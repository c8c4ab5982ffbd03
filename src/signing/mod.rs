//! External Signature Handling
//!
//! 1. Generate signing preimages from unsigned transactions
//! 2. Normalize and verify the raw signatures a device returns
//! 3. Compile verified signatures into final signed transactions
//!
//! Supported ledgers:
//! - Bitcoin family (Legacy, SegWit v0, Bitcoin Cash FORKID)
//! - Ethereum family (Legacy EIP-155, EIP-1559)
//! - Ripple, Stellar, Cardano (Byron and Shelley)

pub mod compiler;
pub mod normalizer;
pub mod preimage;

pub use compiler::*;
pub use normalizer::*;
pub use preimage::*;
