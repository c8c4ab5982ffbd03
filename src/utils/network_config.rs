//! Network Configuration
//!
//! Per-chain constants the builders need: address version bytes,
//! replay-protection ids, reserves, passphrases, fee constants. Defaults
//! are derived from [`Chain`]; a JSON document may override any block.

use crate::error::{LedgerError, LedgerResult};
use crate::types::{Chain, ChainFamily};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const STELLAR_PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
pub const STELLAR_TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const CARDANO_MAINNET_PROTOCOL_MAGIC: u32 = 764824073;

/// Bitcoin-family parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoParams {
    pub p2pkh_version: u8,
    pub p2sh_version: u8,
    /// Bech32 human-readable part; empty when the chain has no SegWit
    pub bech32_hrp: String,
    /// CashAddr prefix for Bitcoin Cash style chains
    pub cashaddr_prefix: Option<String>,
    /// Sign with SIGHASH_FORKID
    pub fork_id: bool,
    pub tx_version: u32,
    pub sequence: u32,
    /// Minimum relay fee in satoshis
    pub min_relay_fee: u64,
}

/// Ethereum-family parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmParams {
    pub chain_id: u64,
    pub coin_gas_limit: u64,
    pub token_gas_limit: u64,
    /// Gas limits for tokens whose transfer costs more than a plain ERC-20
    pub token_gas_overrides: BTreeMap<String, u64>,
}

impl EvmParams {
    pub fn gas_limit_for(&self, token_symbol: Option<&str>) -> u64 {
        match token_symbol {
            None => self.coin_gas_limit,
            Some(symbol) => self
                .token_gas_overrides
                .get(&symbol.to_ascii_uppercase())
                .copied()
                .unwrap_or(self.token_gas_limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleParams {
    /// Minimum amount that funds a new account, in drops
    pub reserve_drops: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StellarParams {
    pub passphrase: String,
    /// Smallest CreateAccount starting balance, in stroops
    pub min_create_balance: u64,
    /// Limit used when establishing a trust line, in stroops
    pub trustline_limit: i64,
    /// Half-width of the time-bounds window around "now"
    pub time_bound_window_secs: u64,
}

/// Which transaction layout the Cardano builder emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardanoTxFormat {
    Byron,
    Shelley,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardanoParams {
    pub protocol_magic: u32,
    pub ttl: u64,
    pub format: CardanoTxFormat,
    /// Constant part of the linear fee, in lovelace
    pub fee_a: u64,
    /// Per-byte part of the linear fee, in thousandths of a lovelace
    pub fee_b_milli: u64,
}

/// Parameter block for one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ChainParams {
    Utxo(UtxoParams),
    Evm(EvmParams),
    Ripple(RippleParams),
    Stellar(StellarParams),
    Cardano(CardanoParams),
}

impl ChainParams {
    pub fn defaults(chain: Chain) -> Self {
        match chain {
            Chain::Bitcoin => ChainParams::Utxo(UtxoParams {
                p2pkh_version: 0x00,
                p2sh_version: 0x05,
                bech32_hrp: "bc".to_string(),
                cashaddr_prefix: None,
                fork_id: false,
                tx_version: 1,
                sequence: 0xffff_ffff,
                min_relay_fee: 1000,
            }),
            Chain::BitcoinTestnet => ChainParams::Utxo(UtxoParams {
                p2pkh_version: 0x6f,
                p2sh_version: 0xc4,
                bech32_hrp: "tb".to_string(),
                cashaddr_prefix: None,
                fork_id: false,
                tx_version: 1,
                sequence: 0xffff_ffff,
                min_relay_fee: 1000,
            }),
            Chain::Litecoin => ChainParams::Utxo(UtxoParams {
                p2pkh_version: 0x30,
                p2sh_version: 0x32,
                bech32_hrp: "ltc".to_string(),
                cashaddr_prefix: None,
                fork_id: false,
                tx_version: 1,
                sequence: 0xffff_ffff,
                min_relay_fee: 1000,
            }),
            Chain::BitcoinCash => ChainParams::Utxo(UtxoParams {
                p2pkh_version: 0x00,
                p2sh_version: 0x05,
                bech32_hrp: String::new(),
                cashaddr_prefix: Some("bitcoincash".to_string()),
                fork_id: true,
                tx_version: 2,
                sequence: 0xffff_ffff,
                min_relay_fee: 1000,
            }),
            Chain::Ethereum
            | Chain::EthereumSepolia
            | Chain::Polygon
            | Chain::Base
            | Chain::Bnb => {
                let mut overrides = BTreeMap::new();
                overrides.insert("DGX".to_string(), 300_000);
                overrides.insert("AWG".to_string(), 150_000);
                ChainParams::Evm(EvmParams {
                    chain_id: chain.chain_id().unwrap_or(1),
                    coin_gas_limit: 21_000,
                    token_gas_limit: 60_000,
                    token_gas_overrides: overrides,
                })
            }
            Chain::Xrp => ChainParams::Ripple(RippleParams {
                reserve_drops: 10_000_000,
            }),
            Chain::Stellar | Chain::StellarTestnet => ChainParams::Stellar(StellarParams {
                passphrase: if chain == Chain::Stellar {
                    STELLAR_PUBLIC_PASSPHRASE.to_string()
                } else {
                    STELLAR_TESTNET_PASSPHRASE.to_string()
                },
                min_create_balance: 10_000_000,
                trustline_limit: 9_000_000_000_000_000_000,
                time_bound_window_secs: 60,
            }),
            Chain::Cardano => ChainParams::Cardano(CardanoParams {
                protocol_magic: CARDANO_MAINNET_PROTOCOL_MAGIC,
                ttl: 190_000_000,
                format: CardanoTxFormat::Shelley,
                fee_a: 155_381,
                fee_b_milli: 43_946,
            }),
        }
    }

    pub fn family(&self) -> ChainFamily {
        match self {
            ChainParams::Utxo(_) => ChainFamily::Utxo,
            ChainParams::Evm(_) => ChainFamily::Evm,
            ChainParams::Ripple(_) => ChainFamily::Ripple,
            ChainParams::Stellar(_) => ChainFamily::Stellar,
            ChainParams::Cardano(_) => ChainFamily::Cardano,
        }
    }
}

/// Network configuration for every supported chain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chains whose parameters differ from the defaults
    #[serde(default)]
    pub overrides: BTreeMap<Chain, ChainParams>,
}

impl NetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> LedgerResult<Self> {
        let config: NetworkConfig = serde_json::from_str(json)
            .map_err(|e| LedgerError::invalid_config(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LedgerError::invalid_config(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&text)
    }

    pub fn with_override(mut self, chain: Chain, params: ChainParams) -> LedgerResult<Self> {
        self.overrides.insert(chain, params);
        self.validate()?;
        Ok(self)
    }

    pub fn params(&self, chain: Chain) -> ChainParams {
        self.overrides
            .get(&chain)
            .cloned()
            .unwrap_or_else(|| ChainParams::defaults(chain))
    }

    pub fn utxo(&self, chain: Chain) -> LedgerResult<UtxoParams> {
        match self.params(chain) {
            ChainParams::Utxo(p) => Ok(p),
            _ => Err(wrong_family(chain, "utxo")),
        }
    }

    pub fn evm(&self, chain: Chain) -> LedgerResult<EvmParams> {
        match self.params(chain) {
            ChainParams::Evm(p) => Ok(p),
            _ => Err(wrong_family(chain, "evm")),
        }
    }

    pub fn ripple(&self, chain: Chain) -> LedgerResult<RippleParams> {
        match self.params(chain) {
            ChainParams::Ripple(p) => Ok(p),
            _ => Err(wrong_family(chain, "ripple")),
        }
    }

    pub fn stellar(&self, chain: Chain) -> LedgerResult<StellarParams> {
        match self.params(chain) {
            ChainParams::Stellar(p) => Ok(p),
            _ => Err(wrong_family(chain, "stellar")),
        }
    }

    pub fn cardano(&self, chain: Chain) -> LedgerResult<CardanoParams> {
        match self.params(chain) {
            ChainParams::Cardano(p) => Ok(p),
            _ => Err(wrong_family(chain, "cardano")),
        }
    }

    /// Reject overrides that could only produce invalid transactions
    pub fn validate(&self) -> LedgerResult<()> {
        for (chain, params) in &self.overrides {
            if params.family() != chain.family() {
                return Err(LedgerError::invalid_config(format!(
                    "{:?} cannot take {:?} parameters",
                    chain,
                    params.family()
                )));
            }
            match params {
                ChainParams::Utxo(p) => {
                    if p.bech32_hrp.is_empty() && p.cashaddr_prefix.is_none() && !p.fork_id {
                        return Err(LedgerError::invalid_config(format!(
                            "{:?}: bech32_hrp must be set",
                            chain
                        )));
                    }
                }
                ChainParams::Evm(p) => {
                    if p.chain_id == 0 {
                        return Err(LedgerError::invalid_config("chain_id must be non-zero"));
                    }
                    if p.coin_gas_limit < 21_000 || p.token_gas_limit < 21_000 {
                        return Err(LedgerError::invalid_config(
                            "gas limits below 21000 can never be mined",
                        ));
                    }
                }
                ChainParams::Ripple(_) => {}
                ChainParams::Stellar(p) => {
                    if p.passphrase.is_empty() {
                        return Err(LedgerError::invalid_config("stellar passphrase is empty"));
                    }
                    if p.trustline_limit <= 0 {
                        return Err(LedgerError::invalid_config(
                            "trust line limit must be positive",
                        ));
                    }
                }
                ChainParams::Cardano(p) => {
                    if p.fee_a == 0 && p.fee_b_milli == 0 {
                        return Err(LedgerError::invalid_config(
                            "cardano linear fee constants are both zero",
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

fn wrong_family(chain: Chain, wanted: &str) -> LedgerError {
    LedgerError::invalid_config(format!("{:?} has no {} parameters", chain, wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_defaults_cover_every_family() {
        let config = NetworkConfig::new();
        assert_eq!(config.utxo(Chain::Litecoin).unwrap().p2pkh_version, 0x30);
        assert!(config.utxo(Chain::BitcoinCash).unwrap().fork_id);
        assert_eq!(config.evm(Chain::Base).unwrap().chain_id, 8453);
        assert_eq!(config.ripple(Chain::Xrp).unwrap().reserve_drops, 10_000_000);
        assert_eq!(
            config.stellar(Chain::StellarTestnet).unwrap().passphrase,
            STELLAR_TESTNET_PASSPHRASE
        );
        assert_eq!(config.cardano(Chain::Cardano).unwrap().ttl, 190_000_000);
    }

    #[test]
    fn test_gas_limit_overrides() {
        let evm = NetworkConfig::new().evm(Chain::Ethereum).unwrap();
        assert_eq!(evm.gas_limit_for(None), 21_000);
        assert_eq!(evm.gas_limit_for(Some("USDC")), 60_000);
        assert_eq!(evm.gas_limit_for(Some("dgx")), 300_000);
        assert_eq!(evm.gas_limit_for(Some("AWG")), 150_000);
    }

    #[test]
    fn test_json_override() {
        let json = r#"{
            "overrides": {
                "cardano": {
                    "family": "cardano",
                    "protocol_magic": 1097911063,
                    "ttl": 5000,
                    "format": "byron",
                    "fee_a": 155381,
                    "fee_b_milli": 43946
                }
            }
        }"#;
        let config = NetworkConfig::from_json(json).unwrap();
        let cardano = config.cardano(Chain::Cardano).unwrap();
        assert_eq!(cardano.protocol_magic, 1097911063);
        assert_eq!(cardano.format, CardanoTxFormat::Byron);
    }

    #[test]
    fn test_family_mismatch_rejected() {
        let err = NetworkConfig::new()
            .with_override(Chain::Xrp, ChainParams::defaults(Chain::Bitcoin))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfig);
    }

    #[test]
    fn test_wrong_accessor_is_config_error() {
        let err = NetworkConfig::new().evm(Chain::Bitcoin).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfig);
    }
}
