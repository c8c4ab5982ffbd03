//! Ethereum-family transaction builder
//!
//! Native transfers, ERC-20 `transfer` calls and arbitrary call data,
//! in the legacy (EIP-155) or fee-market (EIP-1559) envelope.

use super::{wrong_context, PreparedTransaction, SigningContext, TransactionBuilder};
use crate::bitcoin_wallet::parse_public_key;
use crate::error::{LedgerError, LedgerResult};
use crate::ethereum_wallet::{parse_address, transfer_call_data};
use crate::signing::compiler::compile_evm_transaction;
use crate::signing::normalizer::normalize_ecdsa_recoverable;
use crate::signing::preimage::ethereum::{EvmFee, UnsignedEvmTransaction};
use crate::signing::preimage::RawSignature;
use crate::types::{Asset, Chain, ChainFamily, FeeParameters, SignedTransaction, TransactionIntent};
use crate::utils::network_config::{EvmParams, NetworkConfig};
use crate::{log_debug, log_info};
use ethers_core::types::U256;
use secp256k1::PublicKey;

const MODULE: &str = "tx::evm";

#[derive(Debug, Clone)]
pub struct EvmBuilder {
    chain: Chain,
    params: EvmParams,
    public_key: PublicKey,
}

impl EvmBuilder {
    pub fn new(chain: Chain, config: &NetworkConfig, public_key: &[u8]) -> LedgerResult<Self> {
        Ok(Self {
            chain,
            params: config.evm(chain)?,
            public_key: parse_public_key(public_key)?,
        })
    }

    pub fn params(&self) -> &EvmParams {
        &self.params
    }

    fn fee(&self, fee: &FeeParameters) -> LedgerResult<(u64, EvmFee)> {
        let (gas_limit, evm_fee) = match *fee {
            FeeParameters::Legacy {
                gas_limit,
                gas_price,
            } => (gas_limit, EvmFee::Legacy { gas_price }),
            FeeParameters::Eip1559 {
                gas_limit,
                max_fee,
                priority_fee,
            } => {
                if priority_fee > max_fee {
                    return Err(LedgerError::invalid_fee(
                        "priority fee exceeds the max fee per gas",
                    ));
                }
                (
                    gas_limit,
                    EvmFee::Eip1559 {
                        max_fee,
                        priority_fee,
                    },
                )
            }
            other => {
                return Err(LedgerError::invalid_fee(format!(
                    "{} fees do not apply to {:?}",
                    other.kind(),
                    self.chain
                )))
            }
        };
        if gas_limit == 0 {
            return Err(LedgerError::invalid_fee("gas limit must be positive"));
        }
        Ok((gas_limit, evm_fee))
    }

    pub fn unsigned_transaction(
        &self,
        intent: &TransactionIntent,
    ) -> LedgerResult<UnsignedEvmTransaction> {
        let nonce = intent
            .sequence_or_nonce
            .ok_or_else(|| LedgerError::invalid_input("Ethereum transactions need a nonce"))?;
        if intent.memo.is_some() {
            return Err(LedgerError::unsupported("Ethereum transactions carry no memo"));
        }

        let (gas_limit, fee) = self.fee(&intent.fee)?;
        let destination = parse_address(&intent.destination)?;

        let (to, value, data) = match &intent.asset {
            Asset::Native => {
                let value = if intent.include_fee {
                    let max_cost = fee
                        .max_price()
                        .checked_mul(gas_limit as u128)
                        .ok_or_else(|| LedgerError::invalid_fee("gas cost overflows"))?;
                    intent.amount.checked_sub(max_cost).ok_or_else(|| {
                        LedgerError::insufficient_funds(format!(
                            "gas cost {} exceeds the amount {}",
                            max_cost, intent.amount
                        ))
                    })?
                } else {
                    intent.amount
                };
                let data = intent.extra_data.clone().unwrap_or_default();
                (destination.to_vec(), value, data)
            }
            Asset::Erc20 { contract } => {
                if intent.extra_data.is_some() {
                    return Err(LedgerError::unsupported(
                        "token transfers build their own call data",
                    ));
                }
                let contract = parse_address(contract)?;
                let data = transfer_call_data(&destination, U256::from(intent.amount));
                (contract.to_vec(), 0, data)
            }
            Asset::Issued { .. } => {
                return Err(LedgerError::unsupported(
                    "issued assets do not exist on Ethereum-family chains",
                ))
            }
        };

        Ok(UnsignedEvmTransaction {
            chain_id: self.params.chain_id,
            nonce,
            gas_limit,
            fee,
            to,
            value,
            data,
        })
    }
}

impl TransactionBuilder for EvmBuilder {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn build_preimage(&self, intent: &TransactionIntent) -> LedgerResult<PreparedTransaction> {
        let tx = self.unsigned_transaction(intent)?;
        log_debug!(
            MODULE,
            "unsigned transaction ready",
            chain_id = tx.chain_id,
            nonce = tx.nonce,
            to = format!("0x{}", hex::encode(&tx.to)),
            eip1559 = tx.is_eip1559()
        );
        PreparedTransaction::new(self.chain, SigningContext::Evm(tx))
    }

    fn assemble(
        &self,
        prepared: &PreparedTransaction,
        signatures: &[RawSignature],
    ) -> LedgerResult<SignedTransaction> {
        let SigningContext::Evm(tx) = &prepared.context else {
            return Err(wrong_context(ChainFamily::Evm, prepared));
        };
        prepared.check_signatures(signatures)?;

        let digest = tx.signing_hash();
        let signature = normalize_ecdsa_recoverable(&signatures[0], &digest, &self.public_key)?;
        let compiled = compile_evm_transaction(tx, &signature)?;
        log_info!(MODULE, "transaction assembled", txid = compiled.tx_id);

        Ok(SignedTransaction {
            chain: self.chain,
            raw: compiled.raw_tx,
            tx_id: Some(compiled.tx_id),
        })
    }
}
