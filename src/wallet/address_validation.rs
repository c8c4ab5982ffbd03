//! Address Validation
//!
//! Per-chain validation with:
//! - BIP-0350 bech32m support for Taproot addresses
//! - EIP-55 checksum validation and normalization
//! - CashAddr normalization of legacy Bitcoin Cash addresses
//! - X-address tags and Stellar muxed ids surfaced to the caller
//! - Cardano Byron and Shelley (base, pointer, enterprise) addresses

use crate::bitcoin_cash_wallet::encode_cash_address;
use crate::bitcoin_wallet::{decode_address as decode_utxo_address, UtxoAddressKind};
use crate::cardano_wallet::{decode_address as decode_cardano_address, CardanoEra};
use crate::error::{LedgerError, LedgerResult};
use crate::ethereum_wallet::parse_address as parse_evm_address;
use crate::stellar_wallet::{encode_account_id, parse_destination as parse_stellar_destination};
use crate::types::{Chain, ChainFamily};
use crate::utils::crypto::to_checksum_address;
use crate::utils::network_config::{NetworkConfig, CARDANO_MAINNET_PROTOCOL_MAGIC};
use crate::xrp_wallet::parse_destination as parse_ripple_destination;
use serde::{Deserialize, Serialize};

/// Detailed address validation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressValidation {
    pub is_valid: bool,
    pub normalized: Option<String>,
    pub address_type: AddressType,
    pub checksum_valid: bool,
    /// Destination tag of an X-address or id of a muxed Stellar account
    pub embedded_id: Option<u64>,
    pub warnings: Vec<String>,
}

/// Address type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    /// Witness versions without a defined spend rule yet
    FutureWitness,
    EvmAccount,
    RippleClassic,
    RippleX,
    StellarAccount,
    StellarMuxed,
    CardanoByron,
    CardanoBase,
    CardanoPointer,
    CardanoEnterprise,
    Unknown,
}

impl AddressValidation {
    fn valid(address_type: AddressType, normalized: String) -> Self {
        Self {
            is_valid: true,
            normalized: Some(normalized),
            address_type,
            checksum_valid: true,
            embedded_id: None,
            warnings: vec![],
        }
    }

    fn invalid(error: &LedgerError, checksum_valid: bool) -> Self {
        Self {
            is_valid: false,
            normalized: None,
            address_type: AddressType::Unknown,
            checksum_valid,
            embedded_id: None,
            warnings: vec![error.message.clone()],
        }
    }

    fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Validate `address` against `chain` with a detailed result
pub fn validate_address(address: &str, chain: Chain, config: &NetworkConfig) -> AddressValidation {
    let trimmed = address.trim();
    let result = match chain.family() {
        ChainFamily::Utxo => validate_utxo(trimmed, chain, config),
        ChainFamily::Evm => validate_evm(trimmed),
        ChainFamily::Ripple => validate_ripple(trimmed),
        ChainFamily::Stellar => validate_stellar(trimmed),
        ChainFamily::Cardano => validate_cardano(trimmed, chain, config),
    };
    result.unwrap_or_else(|e| AddressValidation::invalid(&e, !is_checksum_error(&e)))
}

fn is_checksum_error(error: &LedgerError) -> bool {
    let message = error.message.to_ascii_lowercase();
    message.contains("checksum")
}

/// Bitcoin family, including Taproot and CashAddr
fn validate_utxo(address: &str, chain: Chain, config: &NetworkConfig) -> LedgerResult<AddressValidation> {
    let params = config.utxo(chain)?;
    let decoded = decode_utxo_address(address, &params)?;
    let script = &decoded.script_pubkey;

    let address_type = match decoded.kind {
        UtxoAddressKind::P2pkh => AddressType::P2pkh,
        UtxoAddressKind::P2sh => AddressType::P2sh,
        UtxoAddressKind::P2wpkh => AddressType::P2wpkh,
        UtxoAddressKind::P2wsh => AddressType::P2wsh,
        // OP_1 <32 bytes>
        UtxoAddressKind::WitnessV1Plus if script.len() == 34 && script[0] == 0x51 => {
            AddressType::P2tr
        }
        UtxoAddressKind::WitnessV1Plus => AddressType::FutureWitness,
    };

    let mut result = match params.cashaddr_prefix.as_deref() {
        Some(prefix) => {
            let hash = match address_type {
                AddressType::P2pkh => &script[3..23],
                _ => &script[2..22],
            };
            let hash: [u8; 20] = hash
                .try_into()
                .map_err(|_| LedgerError::invalid_address("script hash is not 20 bytes"))?;
            let cash = encode_cash_address(prefix, decoded.kind, &hash);
            let legacy = !address.to_ascii_lowercase().ends_with(
                cash.split_once(':').map(|(_, body)| body).unwrap_or_default(),
            );
            let result = AddressValidation::valid(address_type, cash);
            if legacy {
                result.warn("Legacy base58 address - normalized to CashAddr")
            } else {
                result
            }
        }
        None if address_type == AddressType::P2pkh || address_type == AddressType::P2sh => {
            AddressValidation::valid(address_type, address.to_string())
        }
        None => AddressValidation::valid(address_type, address.to_ascii_lowercase()),
    };

    if address_type == AddressType::P2pkh && params.cashaddr_prefix.is_none() {
        result = result.warn("Legacy P2PKH address - SegWit outputs are cheaper to spend");
    }
    if address_type == AddressType::FutureWitness {
        result = result.warn("Witness version without a defined spend rule - funds may be lost");
    }
    Ok(result)
}

/// EIP-55 checksum validation
fn validate_evm(address: &str) -> LedgerResult<AddressValidation> {
    let bytes = parse_evm_address(address)?;
    let body = &address[2..];
    let checksummed = to_checksum_address(&bytes);

    let mut result = AddressValidation::valid(AddressType::EvmAccount, checksummed);
    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        result = result.warn("Address has no EIP-55 checksum - using normalized form");
    }
    if bytes.iter().all(|&b| b == 0) {
        result = result.warn("Zero address - this is typically the burn address");
    }
    Ok(result)
}

fn validate_ripple(address: &str) -> LedgerResult<AddressValidation> {
    let destination = parse_ripple_destination(address)?;
    let address_type = if address.starts_with('X') {
        AddressType::RippleX
    } else {
        AddressType::RippleClassic
    };
    let mut result = AddressValidation::valid(address_type, address.to_string());
    result.embedded_id = destination.tag.map(u64::from);
    Ok(result)
}

fn validate_stellar(address: &str) -> LedgerResult<AddressValidation> {
    let destination = parse_stellar_destination(address)?;
    let mut result = match destination.muxed_id {
        Some(_) => AddressValidation::valid(AddressType::StellarMuxed, address.to_string())
            .warn(format!(
                "Muxed account of {}",
                encode_account_id(&destination.public_key)
            )),
        None => AddressValidation::valid(AddressType::StellarAccount, address.to_string()),
    };
    result.embedded_id = destination.muxed_id;
    Ok(result)
}

fn validate_cardano(address: &str, chain: Chain, config: &NetworkConfig) -> LedgerResult<AddressValidation> {
    let params = config.cardano(chain)?;
    let decoded = decode_cardano_address(address)?;

    if decoded.era == CardanoEra::Byron {
        return Ok(AddressValidation::valid(AddressType::CardanoByron, address.to_string())
            .warn("Byron-era bootstrap address"));
    }

    let header = decoded.bytes.first().copied().unwrap_or_default();
    let expected_network = u8::from(params.protocol_magic == CARDANO_MAINNET_PROTOCOL_MAGIC);
    if header & 0x0f != expected_network {
        return Err(LedgerError::invalid_address(format!(
            "address belongs to network {}, expected {}",
            header & 0x0f,
            expected_network
        )));
    }

    let address_type = match header >> 4 {
        0..=3 => AddressType::CardanoBase,
        4 | 5 => AddressType::CardanoPointer,
        _ => AddressType::CardanoEnterprise,
    };
    Ok(AddressValidation::valid(address_type, address.to_string()))
}

/// Quick validation check - returns the normalized address or an `InvalidAddress` error
pub fn require_valid_address(address: &str, chain: Chain, config: &NetworkConfig) -> LedgerResult<String> {
    let validation = validate_address(address, chain, config);

    if !validation.is_valid {
        let errors = validation.warnings.join("; ");
        return Err(LedgerError::invalid_address(format!(
            "invalid {} address '{}': {}",
            chain.symbol(),
            address,
            if errors.is_empty() { "format error" } else { &errors }
        )));
    }

    Ok(validation.normalized.unwrap_or_else(|| address.to_string()))
}
