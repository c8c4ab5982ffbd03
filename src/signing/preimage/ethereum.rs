//! Ethereum Pre-Image Hashing
//!
//! Generates signing hashes for Ethereum-family transactions.
//! Supports Legacy (EIP-155 replay protection) and EIP-1559 (Fee Market).

use super::{SigningAlgorithm, SigningPreimage};
use crate::encoding::rlp;
use crate::utils::crypto::keccak256;
use serde::{Deserialize, Serialize};

/// EIP-2718 type byte of a fee-market transaction
pub const EIP1559_TX_TYPE: u8 = 0x02;

/// Fee fields of an Ethereum transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvmFee {
    Legacy {
        #[serde(with = "crate::serde_bytes::u128_dec")]
        gas_price: u128,
    },
    Eip1559 {
        #[serde(with = "crate::serde_bytes::u128_dec")]
        max_fee: u128,
        #[serde(with = "crate::serde_bytes::u128_dec")]
        priority_fee: u128,
    },
}

impl EvmFee {
    /// Highest price per gas the sender may pay
    pub fn max_price(&self) -> u128 {
        match self {
            EvmFee::Legacy { gas_price } => *gas_price,
            EvmFee::Eip1559 { max_fee, .. } => *max_fee,
        }
    }
}

/// Unsigned Ethereum transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvmTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_limit: u64,
    pub fee: EvmFee,
    /// Recipient, or the token contract for ERC-20 calls
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub to: Vec<u8>,
    /// Value in wei
    #[serde(with = "crate::serde_bytes::u128_dec")]
    pub value: u128,
    #[serde(with = "crate::serde_bytes::hex_vec", default)]
    pub data: Vec<u8>,
}

impl UnsignedEvmTransaction {
    pub fn is_eip1559(&self) -> bool {
        matches!(self.fee, EvmFee::Eip1559 { .. })
    }

    /// Fields shared by the unsigned and signed encodings, in wire order
    pub fn rlp_fields(&self) -> Vec<Vec<u8>> {
        match self.fee {
            EvmFee::Legacy { gas_price } => vec![
                rlp::encode_u64(self.nonce),
                rlp::encode_u128(gas_price),
                rlp::encode_u64(self.gas_limit),
                rlp::encode_bytes(&self.to),
                rlp::encode_u128(self.value),
                rlp::encode_bytes(&self.data),
            ],
            EvmFee::Eip1559 {
                max_fee,
                priority_fee,
            } => vec![
                rlp::encode_u64(self.chain_id),
                rlp::encode_u64(self.nonce),
                rlp::encode_u128(priority_fee),
                rlp::encode_u128(max_fee),
                rlp::encode_u64(self.gas_limit),
                rlp::encode_bytes(&self.to),
                rlp::encode_u128(self.value),
                rlp::encode_bytes(&self.data),
                // empty access list
                rlp::encode_list(&[]),
            ],
        }
    }

    /// Bytes whose Keccak-256 is signed
    pub fn unsigned_rlp(&self) -> Vec<u8> {
        let mut items = self.rlp_fields();
        if self.is_eip1559() {
            let mut typed = vec![EIP1559_TX_TYPE];
            typed.extend_from_slice(&rlp::encode_list(&items));
            typed
        } else {
            // EIP-155: chainId, 0, 0
            items.push(rlp::encode_u64(self.chain_id));
            items.push(rlp::encode_u64(0));
            items.push(rlp::encode_u64(0));
            rlp::encode_list(&items)
        }
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.unsigned_rlp())
    }
}

/// Get the signing preimage for an Ethereum transaction
pub fn evm_preimage(tx: &UnsignedEvmTransaction) -> SigningPreimage {
    let preimage = tx.unsigned_rlp();
    let hash = keccak256(&preimage);

    let description = format!(
        "{} tx: {} wei to 0x{} (nonce {}, chain {})",
        if tx.is_eip1559() { "EIP-1559" } else { "Legacy" },
        tx.value,
        hex::encode(&tx.to),
        tx.nonce,
        tx.chain_id
    );

    SigningPreimage::new(preimage, hash.to_vec(), SigningAlgorithm::Secp256k1Ecdsa)
        .with_description(description)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(s: &str) -> Vec<u8> {
        hex::decode(s.trim_start_matches("0x")).unwrap()
    }

    fn legacy_coin() -> UnsignedEvmTransaction {
        UnsignedEvmTransaction {
            chain_id: 1,
            nonce: 15,
            gas_limit: 21000,
            fee: EvmFee::Legacy {
                gas_price: 476_190_476_190,
            },
            to: address("7655b9b19ffab8b897f836857dae22a1e7f8d735"),
            value: 100_000_000_000_000_000,
            data: vec![],
        }
    }

    #[test]
    fn test_legacy_signing_hash() {
        let preimage = evm_preimage(&legacy_coin());
        assert_eq!(
            preimage.payload_hex(),
            "bdbecf64b443f82d1f9fda3f2d6ba69af6d82029b8271339b7e775613ae57761"
        );
        assert_eq!(preimage.algorithm, SigningAlgorithm::Secp256k1Ecdsa);
        assert!(preimage.input_index.is_none());
    }

    #[test]
    fn test_eip1559_signing_hash() {
        let tx = UnsignedEvmTransaction {
            chain_id: 137,
            nonce: 196,
            gas_limit: 21000,
            fee: EvmFee::Eip1559 {
                max_fee: 4_478_253_867_089,
                priority_fee: 31_900_000_000,
            },
            to: address("90e4d59c8583e37426b37d1d7394b6008a987c67"),
            value: 1_000_000_000_000_000_000,
            data: vec![],
        };
        let preimage = evm_preimage(&tx);
        assert_eq!(preimage.preimage[0], EIP1559_TX_TYPE);
        assert_eq!(
            preimage.payload_hex(),
            "925f1debbb96941544aefe6a5532508e51f2b8ae1f3a911abfb24b83af610400"
        );
    }

    #[test]
    fn test_zero_value_encodes_as_empty_string() {
        let mut tx = legacy_coin();
        tx.value = 0;
        let fields = tx.rlp_fields();
        assert_eq!(fields[4], vec![0x80]);
        assert_eq!(fields[5], vec![0x80]);
    }

    #[test]
    fn test_max_price() {
        assert_eq!(legacy_coin().fee.max_price(), 476_190_476_190);
        let fee = EvmFee::Eip1559 {
            max_fee: 10,
            priority_fee: 2,
        };
        assert_eq!(fee.max_price(), 10);
    }
}
