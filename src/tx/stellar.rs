//! Stellar transaction builder
//!
//! One operation per transaction, chosen from the account snapshot:
//! CreateAccount, Payment or ChangeTrust.

use super::{wrong_context, PreparedTransaction, SigningContext, TransactionBuilder};
use crate::error::{LedgerError, LedgerResult};
use crate::signing::compiler::compile_stellar_transaction;
use crate::signing::normalizer::verify_ed25519;
use crate::signing::preimage::stellar::{
    MuxedAccount, StellarAsset, StellarMemo, StellarOperation, TimeBounds,
    UnsignedStellarTransaction,
};
use crate::signing::preimage::RawSignature;
use crate::stellar_wallet::{decode_account_id, encode_account_id, parse_destination};
use crate::types::{
    Asset, Chain, ChainFamily, FeeParameters, Memo, SignedTransaction, TransactionIntent,
};
use crate::utils::network_config::{NetworkConfig, StellarParams};
use crate::{log_debug, log_info};
use serde::{Deserialize, Serialize};

const MODULE: &str = "tx::stellar";

/// Account facts the operation choice depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StellarLedgerState {
    #[serde(default = "default_true")]
    pub destination_exists: bool,
    #[serde(default = "default_true")]
    pub destination_has_trustline: bool,
    #[serde(default = "default_true")]
    pub source_has_trustline: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StellarLedgerState {
    fn default() -> Self {
        Self {
            destination_exists: true,
            destination_has_trustline: true,
            source_has_trustline: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StellarBuilder {
    chain: Chain,
    params: StellarParams,
    public_key: [u8; 32],
    state: StellarLedgerState,
    time_bounds: Option<TimeBounds>,
}

impl StellarBuilder {
    pub fn new(chain: Chain, config: &NetworkConfig, public_key: &[u8]) -> LedgerResult<Self> {
        let public_key: [u8; 32] = public_key
            .try_into()
            .map_err(|_| LedgerError::invalid_input("Stellar keys are 32-byte ed25519 keys"))?;
        Ok(Self {
            chain,
            params: config.stellar(chain)?,
            public_key,
            state: StellarLedgerState::default(),
            time_bounds: None,
        })
    }

    pub fn with_state(mut self, state: StellarLedgerState) -> Self {
        self.state = state;
        self
    }

    pub fn with_time_bounds(mut self, bounds: TimeBounds) -> Self {
        self.time_bounds = Some(bounds);
        self
    }

    /// Validity window of `time_bound_window_secs` either side of `now`
    pub fn with_time_bounds_around(self, now: u64) -> Self {
        let window = self.params.time_bound_window_secs;
        self.with_time_bounds(TimeBounds {
            min_time: now.saturating_sub(window),
            max_time: now.saturating_add(window),
        })
    }

    pub fn address(&self) -> String {
        encode_account_id(&self.public_key)
    }

    fn fee_stroops(&self, fee: &FeeParameters) -> LedgerResult<u32> {
        let stroops = match *fee {
            FeeParameters::FixedStroops { stroops } => stroops,
            FeeParameters::Absolute { amount } => u32::try_from(amount)
                .map_err(|_| LedgerError::invalid_fee("Stellar fees are 32-bit stroop counts"))?,
            other => {
                return Err(LedgerError::invalid_fee(format!(
                    "{} fees do not apply to Stellar",
                    other.kind()
                )))
            }
        };
        if stroops == 0 {
            return Err(LedgerError::invalid_fee("Stellar fee must be positive"));
        }
        Ok(stroops)
    }

    fn operation(&self, intent: &TransactionIntent, fee: u32) -> LedgerResult<StellarOperation> {
        let destination = parse_destination(&intent.destination)?;
        let amount = i64::try_from(intent.amount)
            .map_err(|_| LedgerError::encoding("amount exceeds the 64-bit stroop range"))?;

        match &intent.asset {
            Asset::Native => {
                let amount = if intent.include_fee {
                    amount - i64::from(fee)
                } else {
                    amount
                };
                if amount <= 0 {
                    return Err(LedgerError::insufficient_funds(
                        "nothing left to send after the fee",
                    ));
                }

                if self.state.destination_exists {
                    return Ok(StellarOperation::Payment {
                        destination: MuxedAccount {
                            key: destination.public_key,
                            id: destination.muxed_id,
                        },
                        asset: StellarAsset::Native,
                        amount,
                    });
                }
                if (amount as u64) < self.params.min_create_balance {
                    return Err(LedgerError::insufficient_funds(format!(
                        "creating an account needs at least {} stroops, got {}",
                        self.params.min_create_balance, amount
                    )));
                }
                Ok(StellarOperation::CreateAccount {
                    destination: destination.public_key,
                    starting_balance: amount,
                })
            }
            Asset::Issued { code, issuer } => {
                let asset = StellarAsset::issued(code, decode_account_id(issuer)?)?;
                if !self.state.source_has_trustline {
                    return Ok(StellarOperation::ChangeTrust {
                        asset,
                        limit: self.params.trustline_limit,
                    });
                }
                if !(self.state.destination_exists && self.state.destination_has_trustline) {
                    return Err(LedgerError::unsupported(format!(
                        "destination cannot receive {}: no account or no trust line",
                        code
                    )));
                }
                if amount <= 0 {
                    return Err(LedgerError::invalid_input("amount must be positive"));
                }
                Ok(StellarOperation::Payment {
                    destination: MuxedAccount {
                        key: destination.public_key,
                        id: destination.muxed_id,
                    },
                    asset,
                    amount,
                })
            }
            Asset::Erc20 { .. } => Err(LedgerError::unsupported(
                "Stellar moves lumens or issued assets only",
            )),
        }
    }

    pub fn unsigned_transaction(
        &self,
        intent: &TransactionIntent,
    ) -> LedgerResult<UnsignedStellarTransaction> {
        if intent.extra_data.is_some() {
            return Err(LedgerError::unsupported("Stellar transactions carry no call data"));
        }
        let account_sequence = intent
            .sequence_or_nonce
            .ok_or_else(|| LedgerError::invalid_input("Stellar transactions need a sequence"))?;
        let sequence = i64::try_from(account_sequence)
            .ok()
            .and_then(|s| s.checked_add(1))
            .ok_or_else(|| LedgerError::invalid_input("sequence exceeds the 64-bit range"))?;

        let fee = self.fee_stroops(&intent.fee)?;
        let operation = self.operation(intent, fee)?;
        let memo = match &intent.memo {
            None => StellarMemo::None,
            Some(Memo::Text(text)) => StellarMemo::Text(text.clone()),
            Some(Memo::Id(id)) => StellarMemo::Id(*id),
        };

        Ok(UnsignedStellarTransaction {
            source: MuxedAccount::plain(self.public_key),
            fee,
            sequence,
            time_bounds: self.time_bounds,
            memo,
            operation,
            network_passphrase: self.params.passphrase.clone(),
        })
    }
}

impl TransactionBuilder for StellarBuilder {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn build_preimage(&self, intent: &TransactionIntent) -> LedgerResult<PreparedTransaction> {
        let tx = self.unsigned_transaction(intent)?;
        log_debug!(
            MODULE,
            "transaction ready",
            account = self.address(),
            operation = tx.operation.name(),
            sequence = tx.sequence
        );
        PreparedTransaction::new(self.chain, SigningContext::Stellar(tx))
    }

    fn assemble(
        &self,
        prepared: &PreparedTransaction,
        signatures: &[RawSignature],
    ) -> LedgerResult<SignedTransaction> {
        let SigningContext::Stellar(tx) = &prepared.context else {
            return Err(wrong_context(ChainFamily::Stellar, prepared));
        };
        prepared.check_signatures(signatures)?;

        let signature =
            verify_ed25519(&signatures[0], &prepared.preimages[0].payload, &self.public_key)?;
        let compiled = compile_stellar_transaction(tx, &signature)?;
        log_info!(MODULE, "envelope assembled", hash = compiled.tx_id);

        Ok(SignedTransaction {
            chain: self.chain,
            raw: compiled.raw_tx,
            tx_id: Some(compiled.tx_id),
        })
    }
}
