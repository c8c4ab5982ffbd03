//! Fee Estimator
//!
//! Turns prices quoted by a state provider into three fee levels.
//! Every function here is pure; sizes come from the builders.

use crate::error::{LedgerError, LedgerResult};
use crate::tx::linear_fee;
use crate::types::FeeEstimate;

// =============================================================================
// Bitcoin family
// =============================================================================

/// Satoshis per virtual byte for each level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRates {
    pub minimal: u64,
    pub normal: u64,
    pub priority: u64,
}

/// `rate × vsize` per level, never below the relay floor
pub fn utxo_fee_levels(rates: ByteRates, vsize: u64, min_relay_fee: u64) -> LedgerResult<FeeEstimate> {
    let level = |rate: u64| -> LedgerResult<u128> {
        if rate == 0 {
            return Err(LedgerError::invalid_fee("byte rate must be positive"));
        }
        let fee = rate
            .checked_mul(vsize)
            .ok_or_else(|| LedgerError::invalid_fee("fee overflows 64 bits"))?;
        Ok(u128::from(fee.max(min_relay_fee)))
    };

    Ok(FeeEstimate {
        minimal: level(rates.minimal)?,
        normal: level(rates.normal)?,
        priority: level(rates.priority)?,
    })
}

// =============================================================================
// Ethereum family
// =============================================================================

/// `price × limit`, then the price raised by 20% and 50%
pub fn evm_fee_levels(gas_price: u128, gas_limit: u64) -> LedgerResult<FeeEstimate> {
    if gas_price == 0 || gas_limit == 0 {
        return Err(LedgerError::invalid_fee("gas price and gas limit must be positive"));
    }
    let limit = u128::from(gas_limit);
    let level = |numerator: u128| -> LedgerResult<u128> {
        gas_price
            .checked_mul(numerator)
            .map(|p| p / 10)
            .and_then(|p| p.checked_mul(limit))
            .ok_or_else(|| LedgerError::invalid_fee("gas fee overflows 128 bits"))
    };

    Ok(FeeEstimate {
        minimal: level(10)?,
        normal: level(12)?,
        priority: level(15)?,
    })
}

// =============================================================================
// Ripple
// =============================================================================

/// Ledger-reported minimum, open-ledger and median fees, in drops
pub fn ripple_fee_levels(minimum: u64, open_ledger: u64, median: u64) -> LedgerResult<FeeEstimate> {
    if minimum == 0 {
        return Err(LedgerError::invalid_fee("XRP fee must be at least one drop"));
    }
    Ok(FeeEstimate {
        minimal: u128::from(minimum),
        normal: u128::from(open_ledger.max(minimum)),
        priority: u128::from(median.max(open_ledger).max(minimum)),
    })
}

// =============================================================================
// Stellar
// =============================================================================

pub fn stellar_fee_levels(base_fee: u32, operations: u32) -> LedgerResult<FeeEstimate> {
    if base_fee == 0 || operations == 0 {
        return Err(LedgerError::invalid_fee(
            "base fee and operation count must be positive",
        ));
    }
    let fee = base_fee
        .checked_mul(operations)
        .ok_or_else(|| LedgerError::invalid_fee("Stellar fee overflows 32 bits"))?;
    Ok(FeeEstimate::flat(u128::from(fee)))
}

// =============================================================================
// Cardano
// =============================================================================

pub fn cardano_fee_levels(a: u64, b_milli: u64, size: u64) -> LedgerResult<FeeEstimate> {
    Ok(FeeEstimate::flat(u128::from(linear_fee(a, b_milli, size)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_utxo_levels_with_relay_floor() {
        let rates = ByteRates {
            minimal: 1,
            normal: 10,
            priority: 25,
        };
        let fees = utxo_fee_levels(rates, 141, 1_000).unwrap();
        assert_eq!(fees.minimal, 1_000);
        assert_eq!(fees.normal, 1_410);
        assert_eq!(fees.priority, 3_525);
    }

    #[test]
    fn test_utxo_zero_rate() {
        let rates = ByteRates {
            minimal: 0,
            normal: 10,
            priority: 25,
        };
        assert_eq!(
            utxo_fee_levels(rates, 141, 1_000).unwrap_err().code,
            ErrorCode::InvalidFeeParameters
        );
    }

    #[test]
    fn test_evm_levels() {
        let fees = evm_fee_levels(20_000_000_000, 21_000).unwrap();
        assert_eq!(fees.minimal, 420_000_000_000_000);
        assert_eq!(fees.normal, 504_000_000_000_000);
        assert_eq!(fees.priority, 630_000_000_000_000);
    }

    #[test]
    fn test_evm_levels_truncate_the_raised_price() {
        // 7 × 1.2 = 8.4 → 8, 7 × 1.5 = 10.5 → 10
        let fees = evm_fee_levels(7, 60_000).unwrap();
        assert_eq!(fees.minimal, 420_000);
        assert_eq!(fees.normal, 480_000);
        assert_eq!(fees.priority, 600_000);
    }

    #[test]
    fn test_ripple_levels_are_monotonic() {
        let fees = ripple_fee_levels(10, 12, 5_000).unwrap();
        assert_eq!((fees.minimal, fees.normal, fees.priority), (10, 12, 5_000));

        let skewed = ripple_fee_levels(10, 8, 9).unwrap();
        assert_eq!((skewed.minimal, skewed.normal, skewed.priority), (10, 10, 10));

        assert!(ripple_fee_levels(0, 12, 5_000).is_err());
    }

    #[test]
    fn test_stellar_levels() {
        assert_eq!(stellar_fee_levels(100, 1).unwrap(), FeeEstimate::flat(100));
        assert_eq!(stellar_fee_levels(100, 3).unwrap(), FeeEstimate::flat(300));
        assert!(stellar_fee_levels(u32::MAX, 2).is_err());
    }

    #[test]
    fn test_cardano_levels() {
        assert_eq!(
            cardano_fee_levels(155_381, 43_946, 265).unwrap(),
            FeeEstimate::flat(167_027)
        );
    }
}
