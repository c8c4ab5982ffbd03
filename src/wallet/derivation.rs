//! Address Derivation
//!
//! Receive addresses of a public key on every supported chain.

use crate::bitcoin_cash_wallet::cash_address;
use crate::bitcoin_wallet::{p2pkh_address, p2sh_p2wpkh_address, p2wpkh_address, parse_public_key, WalletKey};
use crate::cardano_wallet::{byron_address, enterprise_address};
use crate::error::{LedgerError, LedgerResult};
use crate::ethereum_wallet::address_from_public_key;
use crate::stellar_wallet::encode_account_id;
use crate::types::{Chain, ChainFamily};
use crate::utils::network_config::{NetworkConfig, CARDANO_MAINNET_PROTOCOL_MAGIC};
use crate::xrp_wallet::RipplePublicKey;
use serde::{Deserialize, Serialize};

/// Address flavour, for chains that have more than one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AddressFormat {
    /// Native SegWit on Bitcoin and Litecoin, CashAddr on Bitcoin Cash,
    /// Byron when a chain code is given on Cardano
    #[default]
    Default,
    /// Base58 pay-to-public-key-hash
    Legacy,
    /// SegWit key hash nested in P2SH
    NestedSegwit,
    /// Shelley enterprise address even when a chain code is present
    Shelley,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAddress {
    pub chain: Chain,
    pub format: AddressFormat,
    pub address: String,
}

/// Address of `public_key` on `chain`
///
/// `chain_code` is only read for Cardano, where it selects a Byron
/// bootstrap address.
pub fn derive_address(
    chain: Chain,
    config: &NetworkConfig,
    public_key: &[u8],
    chain_code: Option<&[u8; 32]>,
    format: AddressFormat,
) -> LedgerResult<DerivedAddress> {
    let address = match chain.family() {
        ChainFamily::Utxo => derive_utxo(chain, config, public_key, format)?,
        ChainFamily::Evm => {
            expect_default(chain, format)?;
            address_from_public_key(&parse_public_key(public_key)?)
        }
        ChainFamily::Ripple => {
            expect_default(chain, format)?;
            RipplePublicKey::parse(public_key)?.classic_address()
        }
        ChainFamily::Stellar => {
            expect_default(chain, format)?;
            encode_account_id(&ed25519_key(public_key)?)
        }
        ChainFamily::Cardano => derive_cardano(chain, config, public_key, chain_code, format)?,
    };

    Ok(DerivedAddress {
        chain,
        format,
        address,
    })
}

fn derive_utxo(
    chain: Chain,
    config: &NetworkConfig,
    public_key: &[u8],
    format: AddressFormat,
) -> LedgerResult<String> {
    let params = config.utxo(chain)?;
    let key = WalletKey::parse(public_key)?;

    match (format, params.cashaddr_prefix.as_deref()) {
        (AddressFormat::Legacy, _) => Ok(p2pkh_address(&key, &params)),
        (AddressFormat::Default, Some(prefix)) => Ok(cash_address(&key, prefix)),
        (AddressFormat::Default, None) => p2wpkh_address(key.public_key(), &params),
        (AddressFormat::NestedSegwit, None) => Ok(p2sh_p2wpkh_address(key.public_key(), &params)),
        (other, _) => Err(LedgerError::unsupported(format!(
            "{:?} addresses do not exist on {}",
            other, chain
        ))),
    }
}

fn derive_cardano(
    chain: Chain,
    config: &NetworkConfig,
    public_key: &[u8],
    chain_code: Option<&[u8; 32]>,
    format: AddressFormat,
) -> LedgerResult<String> {
    let params = config.cardano(chain)?;
    let key = ed25519_key(public_key)?;

    match (format, chain_code) {
        (AddressFormat::Default, Some(chain_code)) => Ok(byron_address(&key, chain_code)),
        (AddressFormat::Default, None) | (AddressFormat::Shelley, _) => {
            let network_id = u8::from(params.protocol_magic == CARDANO_MAINNET_PROTOCOL_MAGIC);
            enterprise_address(&key, network_id)
        }
        (other, _) => Err(LedgerError::unsupported(format!(
            "{:?} addresses do not exist on {}",
            other, chain
        ))),
    }
}

fn expect_default(chain: Chain, format: AddressFormat) -> LedgerResult<()> {
    if format == AddressFormat::Default {
        return Ok(());
    }
    Err(LedgerError::unsupported(format!(
        "{} has a single address format",
        chain
    )))
}

fn ed25519_key(public_key: &[u8]) -> LedgerResult<[u8; 32]> {
    public_key
        .try_into()
        .map_err(|_| LedgerError::invalid_input("expected a 32-byte ed25519 public key"))
}
