//! Fee Estimation Module
//!
//! Fee levels for every supported chain, computed from market prices the
//! caller fetched and from the size of the transaction the builder would
//! produce for the same wallet snapshot.

mod estimator;

pub use estimator::*;

use crate::error::{LedgerError, LedgerResult};
use crate::log_debug;
use crate::tx::{LedgerBuilder, WalletSnapshot};
use crate::types::{Chain, ChainFamily, FeeEstimate};
use crate::utils::network_config::NetworkConfig;
use serde::{Deserialize, Serialize};

const MODULE: &str = "fees";

/// Prices quoted by a state provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketFees {
    /// Satoshis per virtual byte
    ByteRates {
        minimal: u64,
        normal: u64,
        priority: u64,
    },
    GasPrice {
        #[serde(with = "crate::serde_bytes::u128_dec")]
        wei: u128,
    },
    RippleDrops {
        minimum: u64,
        open_ledger: u64,
        median: u64,
    },
    StellarBaseFee {
        stroops: u32,
        #[serde(default = "one")]
        operations: u32,
    },
    /// Protocol constants from the network configuration
    CardanoLinear,
}

fn one() -> u32 {
    1
}

impl MarketFees {
    fn family(&self) -> ChainFamily {
        match self {
            MarketFees::ByteRates { .. } => ChainFamily::Utxo,
            MarketFees::GasPrice { .. } => ChainFamily::Evm,
            MarketFees::RippleDrops { .. } => ChainFamily::Ripple,
            MarketFees::StellarBaseFee { .. } => ChainFamily::Stellar,
            MarketFees::CardanoLinear => ChainFamily::Cardano,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRequest {
    pub chain: Chain,
    pub market: MarketFees,
    /// Needed for Bitcoin-family size estimates
    #[serde(default)]
    pub destination: Option<String>,
    /// Decides the Cardano output count
    #[serde(default, with = "crate::serde_bytes::u128_dec")]
    pub amount: u128,
    /// Selects the gas limit for token transfers
    #[serde(default)]
    pub token_symbol: Option<String>,
    /// UTXO set and key for size-dependent fees
    #[serde(default)]
    pub wallet: Option<WalletSnapshot>,
}

impl FeeRequest {
    pub fn new(chain: Chain, market: MarketFees) -> Self {
        Self {
            chain,
            market,
            destination: None,
            amount: 0,
            token_symbol: None,
            wallet: None,
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_amount(mut self, amount: u128) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_token_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.token_symbol = Some(symbol.into());
        self
    }

    pub fn with_wallet(mut self, wallet: WalletSnapshot) -> Self {
        self.wallet = Some(wallet);
        self
    }

    fn builder(&self, config: &NetworkConfig) -> LedgerResult<LedgerBuilder> {
        let wallet = self.wallet.as_ref().ok_or_else(|| {
            LedgerError::invalid_input(format!(
                "{:?} fees depend on the wallet's unspent outputs",
                self.chain
            ))
        })?;
        LedgerBuilder::for_chain(self.chain, config, wallet)
    }
}

/// Fee levels for `request`
pub fn estimate_fees(request: &FeeRequest, config: &NetworkConfig) -> LedgerResult<FeeEstimate> {
    if request.market.family() != request.chain.family() {
        return Err(LedgerError::invalid_fee(format!(
            "{:?} prices do not apply to {:?}",
            request.market.family(),
            request.chain
        )));
    }

    let estimate = match &request.market {
        MarketFees::ByteRates {
            minimal,
            normal,
            priority,
        } => {
            let destination = request.destination.as_deref().ok_or_else(|| {
                LedgerError::invalid_input("a destination is needed to size the transaction")
            })?;
            let LedgerBuilder::Utxo(builder) = request.builder(config)? else {
                return Err(LedgerError::invalid_state("expected a Bitcoin-family builder"));
            };
            let vsize = builder.estimated_vsize(destination)?;
            log_debug!(MODULE, "sized transaction", chain = request.chain, vsize = vsize);
            utxo_fee_levels(
                ByteRates {
                    minimal: *minimal,
                    normal: *normal,
                    priority: *priority,
                },
                vsize,
                builder.params().min_relay_fee,
            )?
        }
        MarketFees::GasPrice { wei } => {
            let gas_limit = config
                .evm(request.chain)?
                .gas_limit_for(request.token_symbol.as_deref());
            evm_fee_levels(*wei, gas_limit)?
        }
        MarketFees::RippleDrops {
            minimum,
            open_ledger,
            median,
        } => ripple_fee_levels(*minimum, *open_ledger, *median)?,
        MarketFees::StellarBaseFee {
            stroops,
            operations,
        } => stellar_fee_levels(*stroops, *operations)?,
        MarketFees::CardanoLinear => {
            let LedgerBuilder::Cardano(builder) = request.builder(config)? else {
                return Err(LedgerError::invalid_state("expected a Cardano builder"));
            };
            let amount = u64::try_from(request.amount)
                .map_err(|_| LedgerError::encoding("amount does not fit in 64 bits"))?;
            FeeEstimate::flat(u128::from(builder.estimate_fee(amount)?))
        }
    };

    log_debug!(
        MODULE,
        "fee levels",
        chain = request.chain,
        minimal = estimate.minimal,
        normal = estimate.normal,
        priority = estimate.priority
    );
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::tx::UtxoBuilder;
    use crate::types::UnspentOutput;
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    fn secp_public_key() -> String {
        let sk = SecretKey::from_slice(&[0x11; 32]).unwrap();
        hex::encode(PublicKey::from_secret_key(&Secp256k1::new(), &sk).serialize())
    }

    fn wallet(public_key: String, amounts: &[u64]) -> WalletSnapshot {
        let utxos = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| UnspentOutput {
                previous_tx_hash: [i as u8 + 1; 32],
                output_index: i as u32,
                amount: *amount,
                locking_script: vec![],
            })
            .collect();
        serde_json::from_value(serde_json::json!({ "public_key": public_key }))
            .map(|w: WalletSnapshot| WalletSnapshot { utxos, ..w })
            .unwrap()
    }

    #[test]
    fn test_bitcoin_levels_follow_estimated_size() {
        let config = NetworkConfig::new();
        let snapshot = wallet(secp_public_key(), &[50_000, 70_000]);
        let destination = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
        let request = FeeRequest::new(
            Chain::Bitcoin,
            MarketFees::ByteRates {
                minimal: 1,
                normal: 12,
                priority: 40,
            },
        )
        .with_destination(destination)
        .with_wallet(snapshot.clone());

        let fees = estimate_fees(&request, &config).unwrap();

        let pk = hex::decode(&snapshot.public_key).unwrap();
        let vsize = UtxoBuilder::new(Chain::Bitcoin, &config, &pk, snapshot.utxos)
            .unwrap()
            .estimated_vsize(destination)
            .unwrap();
        assert_eq!(fees.minimal, 1_000);
        assert_eq!(fees.normal, u128::from(12 * vsize));
        assert_eq!(fees.priority, u128::from(40 * vsize));
    }

    #[test]
    fn test_bitcoin_needs_wallet_and_destination() {
        let request = FeeRequest::new(
            Chain::Litecoin,
            MarketFees::ByteRates {
                minimal: 1,
                normal: 2,
                priority: 3,
            },
        );
        assert_eq!(
            estimate_fees(&request, &NetworkConfig::new()).unwrap_err().code,
            ErrorCode::InvalidInput
        );
    }

    #[test]
    fn test_token_gas_limits() {
        let config = NetworkConfig::new();
        let coin = FeeRequest::new(Chain::Ethereum, MarketFees::GasPrice { wei: 10 });
        assert_eq!(estimate_fees(&coin, &config).unwrap().minimal, 210_000);

        let token = coin.clone().with_token_symbol("USDT");
        assert_eq!(estimate_fees(&token, &config).unwrap().minimal, 600_000);

        let dgx = coin.with_token_symbol("DGX");
        assert_eq!(estimate_fees(&dgx, &config).unwrap().minimal, 3_000_000);
    }

    #[test]
    fn test_cardano_output_count() {
        let config = NetworkConfig::new();
        let snapshot = wallet(hex::encode([0x5a; 32]), &[10_000_000]);
        let sweep = FeeRequest::new(Chain::Cardano, MarketFees::CardanoLinear)
            .with_amount(10_000_000)
            .with_wallet(snapshot.clone());
        assert_eq!(estimate_fees(&sweep, &config).unwrap(), FeeEstimate::flat(167_027));

        let partial = sweep.with_amount(2_000_000);
        assert_eq!(estimate_fees(&partial, &config).unwrap(), FeeEstimate::flat(169_883));
    }

    #[test]
    fn test_market_must_match_chain() {
        let request = FeeRequest::new(
            Chain::Stellar,
            MarketFees::RippleDrops {
                minimum: 10,
                open_ledger: 10,
                median: 10,
            },
        );
        assert_eq!(
            estimate_fees(&request, &NetworkConfig::new()).unwrap_err().code,
            ErrorCode::InvalidFeeParameters
        );
    }

    #[test]
    fn test_request_from_json() {
        let request: FeeRequest = serde_json::from_str(
            r#"{"chain":"stellar","market":{"kind":"stellar_base_fee","stroops":100}}"#,
        )
        .unwrap();
        assert_eq!(
            estimate_fees(&request, &NetworkConfig::new()).unwrap(),
            FeeEstimate::flat(100)
        );
    }
}
