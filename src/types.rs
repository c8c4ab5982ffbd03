//! Shared types for ledger-preimage
//!
//! All data structures that cross module boundaries are defined here
//! for consistent serialization.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// =============================================================================
// Chain Types
// =============================================================================

/// Supported ledgers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
    Bitcoin,
    BitcoinTestnet,
    Litecoin,
    BitcoinCash,
    Ethereum,
    EthereumSepolia,
    Polygon,
    Base,
    Bnb,
    Xrp,
    Stellar,
    StellarTestnet,
    Cardano,
}

/// Encoding family a chain belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    Utxo,
    Evm,
    Ripple,
    Stellar,
    Cardano,
}

impl Chain {
    pub fn family(&self) -> ChainFamily {
        match self {
            Chain::Bitcoin | Chain::BitcoinTestnet | Chain::Litecoin | Chain::BitcoinCash => {
                ChainFamily::Utxo
            }
            Chain::Ethereum
            | Chain::EthereumSepolia
            | Chain::Polygon
            | Chain::Base
            | Chain::Bnb => ChainFamily::Evm,
            Chain::Xrp => ChainFamily::Ripple,
            Chain::Stellar | Chain::StellarTestnet => ChainFamily::Stellar,
            Chain::Cardano => ChainFamily::Cardano,
        }
    }

    pub fn is_evm(&self) -> bool {
        self.family() == ChainFamily::Evm
    }

    pub fn is_utxo(&self) -> bool {
        self.family() == ChainFamily::Utxo
    }

    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Chain::Ethereum => Some(1),
            Chain::EthereumSepolia => Some(11155111),
            Chain::Polygon => Some(137),
            Chain::Base => Some(8453),
            Chain::Bnb => Some(56),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Chain::Bitcoin | Chain::BitcoinTestnet => "BTC",
            Chain::Litecoin => "LTC",
            Chain::BitcoinCash => "BCH",
            Chain::Ethereum | Chain::EthereumSepolia | Chain::Base => "ETH",
            Chain::Polygon => "POL",
            Chain::Bnb => "BNB",
            Chain::Xrp => "XRP",
            Chain::Stellar | Chain::StellarTestnet => "XLM",
            Chain::Cardano => "ADA",
        }
    }

    /// Number of decimal places in the chain's minor unit
    pub fn decimals(&self) -> u8 {
        match self.family() {
            ChainFamily::Utxo => 8,
            ChainFamily::Evm => 18,
            ChainFamily::Ripple | ChainFamily::Cardano => 6,
            ChainFamily::Stellar => 7,
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(name)) => f.write_str(&name),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::str::FromStr for Chain {
    type Err = crate::error::LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
            .map_err(|_| crate::error::LedgerError::invalid_input(format!("unknown chain: {}", s)))
    }
}

// =============================================================================
// Build Inputs
// =============================================================================

/// A spendable output as reported by the UTXO-set provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    /// Previous transaction hash in display (big-endian) order
    #[serde(with = "crate::serde_bytes::hex32")]
    pub previous_tx_hash: [u8; 32],
    pub output_index: u32,
    /// Value in the chain's minor unit
    pub amount: u64,
    #[serde(with = "crate::serde_bytes::hex_vec", default)]
    pub locking_script: Vec<u8>,
}

/// What is being moved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Asset {
    #[default]
    Native,
    /// ERC-20 token held at `contract`
    Erc20 { contract: String },
    /// Stellar issued asset
    Issued { code: String, issuer: String },
}

/// Memo attached to the transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Memo {
    Text(String),
    Id(u64),
}

/// Fee parameters, one variant per chain family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeParameters {
    Legacy {
        gas_limit: u64,
        #[serde(with = "crate::serde_bytes::u128_dec")]
        gas_price: u128,
    },
    Eip1559 {
        gas_limit: u64,
        #[serde(with = "crate::serde_bytes::u128_dec")]
        max_fee: u128,
        #[serde(with = "crate::serde_bytes::u128_dec")]
        priority_fee: u128,
    },
    UtxoByteRate {
        satoshis_per_byte: u64,
    },
    FixedDrops {
        drops: u64,
    },
    FixedStroops {
        stroops: u32,
    },
    /// `a` in lovelace, `b_milli` in thousandths of a lovelace per byte
    LinearBySize {
        a: u64,
        b_milli: u64,
    },
    /// A fee already computed in the chain's minor unit
    Absolute {
        amount: u64,
    },
}

impl FeeParameters {
    pub fn kind(&self) -> &'static str {
        match self {
            FeeParameters::Legacy { .. } => "legacy",
            FeeParameters::Eip1559 { .. } => "eip1559",
            FeeParameters::UtxoByteRate { .. } => "utxo_byte_rate",
            FeeParameters::FixedDrops { .. } => "fixed_drops",
            FeeParameters::FixedStroops { .. } => "fixed_stroops",
            FeeParameters::LinearBySize { .. } => "linear_by_size",
            FeeParameters::Absolute { .. } => "absolute",
        }
    }
}

/// Chain-agnostic request to move value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionIntent {
    pub destination: String,
    /// Amount in the minor unit of the asset being moved
    #[serde(with = "crate::serde_bytes::u128_dec")]
    pub amount: u128,
    pub fee: FeeParameters,
    #[serde(with = "crate::serde_bytes::hex_vec_option", default)]
    pub extra_data: Option<Vec<u8>>,
    #[serde(default)]
    pub sequence_or_nonce: Option<u64>,
    #[serde(default)]
    pub include_fee: bool,
    #[serde(default)]
    pub asset: Asset,
    #[serde(default)]
    pub memo: Option<Memo>,
}

impl TransactionIntent {
    pub fn new(destination: impl Into<String>, amount: u128, fee: FeeParameters) -> Self {
        Self {
            destination: destination.into(),
            amount,
            fee,
            extra_data: None,
            sequence_or_nonce: None,
            include_fee: false,
            asset: Asset::Native,
            memo: None,
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.sequence_or_nonce = Some(nonce);
        self
    }

    pub fn with_include_fee(mut self, include_fee: bool) -> Self {
        self.include_fee = include_fee;
        self
    }

    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.asset = asset;
        self
    }

    pub fn with_extra_data(mut self, data: Vec<u8>) -> Self {
        self.extra_data = Some(data);
        self
    }

    pub fn with_memo(mut self, memo: Memo) -> Self {
        self.memo = Some(memo);
        self
    }

    /// Amount narrowed to `u64`, for ledgers whose minor unit fits 64 bits
    pub fn amount_u64(&self) -> crate::error::LedgerResult<u64> {
        u64::try_from(self.amount).map_err(|_| {
            crate::error::LedgerError::encoding(format!(
                "amount {} does not fit in 64 bits",
                self.amount
            ))
        })
    }
}

// =============================================================================
// Build Outputs
// =============================================================================

/// Final wire bytes ready for a broadcaster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub chain: Chain,
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub raw: Vec<u8>,
    /// Chain-native transaction identifier, hex encoded
    pub tx_id: Option<String>,
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> String {
        hex::encode(&self.raw)
    }
}

/// Three fee levels offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    #[serde(with = "crate::serde_bytes::u128_dec")]
    pub minimal: u128,
    #[serde(with = "crate::serde_bytes::u128_dec")]
    pub normal: u128,
    #[serde(with = "crate::serde_bytes::u128_dec")]
    pub priority: u128,
}

impl FeeEstimate {
    pub fn flat(fee: u128) -> Self {
        Self {
            minimal: fee,
            normal: fee,
            priority: fee,
        }
    }
}
