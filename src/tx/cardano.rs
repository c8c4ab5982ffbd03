//! Cardano transaction builder
//!
//! Spends every supplied output; change goes back to the wallet's own
//! Byron or enterprise address.

use super::{wrong_context, PreparedTransaction, SigningContext, TransactionBuilder};
use crate::cardano_wallet::{byron_address, decode_address, enterprise_address, CardanoAddress};
use crate::error::{LedgerError, LedgerResult};
use crate::signing::compiler::{compile_cardano_transaction, CardanoWitnessKey};
use crate::signing::normalizer::verify_ed25519;
use crate::signing::preimage::cardano::{
    CardanoTxInput, CardanoTxOutput, UnsignedCardanoTransaction,
};
use crate::signing::preimage::RawSignature;
use crate::types::{
    Asset, Chain, ChainFamily, FeeParameters, SignedTransaction, TransactionIntent, UnspentOutput,
};
use crate::utils::network_config::{CardanoParams, NetworkConfig, CARDANO_MAINNET_PROTOCOL_MAGIC};
use crate::{log_debug, log_info};

const MODULE: &str = "tx::cardano";

const INPUT_SIZE: u64 = 40;
const OUTPUT_SIZE: u64 = 65;
const BASE_SIZE: u64 = 160;

/// Estimated serialized size used by the linear fee
pub fn estimated_size(inputs: usize, outputs: usize) -> u64 {
    inputs as u64 * INPUT_SIZE + outputs as u64 * OUTPUT_SIZE + BASE_SIZE
}

/// `a + b × size`, with `b` in thousandths of a lovelace, rounded half-up
pub fn linear_fee(a: u64, b_milli: u64, size: u64) -> LedgerResult<u64> {
    b_milli
        .checked_mul(size)
        .and_then(|v| v.checked_add(500))
        .map(|v| v / 1000)
        .and_then(|v| v.checked_add(a))
        .ok_or_else(|| LedgerError::invalid_fee("linear fee overflows 64 bits"))
}

#[derive(Debug, Clone)]
pub struct CardanoBuilder {
    chain: Chain,
    params: CardanoParams,
    key: CardanoWitnessKey,
    utxos: Vec<UnspentOutput>,
}

impl CardanoBuilder {
    pub fn new(
        chain: Chain,
        config: &NetworkConfig,
        public_key: &[u8],
        chain_code: Option<[u8; 32]>,
        utxos: Vec<UnspentOutput>,
    ) -> LedgerResult<Self> {
        let public_key: [u8; 32] = public_key
            .try_into()
            .map_err(|_| LedgerError::invalid_input("Cardano keys are 32-byte ed25519 keys"))?;
        Ok(Self {
            chain,
            params: config.cardano(chain)?,
            key: CardanoWitnessKey {
                public_key,
                chain_code,
            },
            utxos,
        })
    }

    pub fn params(&self) -> &CardanoParams {
        &self.params
    }

    /// Byron address for wallets with a chain code, enterprise otherwise
    pub fn own_address(&self) -> LedgerResult<String> {
        match &self.key.chain_code {
            Some(chain_code) => Ok(byron_address(&self.key.public_key, chain_code)),
            None => {
                let network_id = u8::from(self.params.protocol_magic == CARDANO_MAINNET_PROTOCOL_MAGIC);
                enterprise_address(&self.key.public_key, network_id)
            }
        }
    }

    fn fee(&self, fee: &FeeParameters, inputs: usize, outputs: usize) -> LedgerResult<u64> {
        match *fee {
            FeeParameters::LinearBySize { a, b_milli } => {
                linear_fee(a, b_milli, estimated_size(inputs, outputs))
            }
            FeeParameters::Absolute { amount } => Ok(amount),
            other => Err(LedgerError::invalid_fee(format!(
                "{} fees do not apply to Cardano",
                other.kind()
            ))),
        }
    }

    fn total(&self) -> LedgerResult<u64> {
        if self.utxos.is_empty() {
            return Err(LedgerError::no_spendable_outputs("the UTXO set is empty"));
        }
        self.utxos
            .iter()
            .try_fold(0u64, |acc, u| acc.checked_add(u.amount))
            .ok_or_else(|| LedgerError::encoding("UTXO total overflows 64 bits"))
    }

    fn output_count(amount: u64, total: u64) -> usize {
        if amount == total {
            1
        } else {
            2
        }
    }

    /// Linear fee with the configured constants for sending `amount`
    pub fn estimate_fee(&self, amount: u64) -> LedgerResult<u64> {
        let outputs = Self::output_count(amount, self.total()?);
        linear_fee(
            self.params.fee_a,
            self.params.fee_b_milli,
            estimated_size(self.utxos.len(), outputs),
        )
    }

    pub fn unsigned_transaction(
        &self,
        intent: &TransactionIntent,
    ) -> LedgerResult<UnsignedCardanoTransaction> {
        if intent.asset != Asset::Native {
            return Err(LedgerError::unsupported("only ADA transfers are supported"));
        }
        if intent.memo.is_some() || intent.extra_data.is_some() {
            return Err(LedgerError::unsupported("Cardano transfers carry no metadata"));
        }
        let total = self.total()?;
        let amount = intent.amount_u64()?;
        let destination = decode_address(&intent.destination)?;

        let fee = self.fee(&intent.fee, self.utxos.len(), Self::output_count(amount, total))?;

        let (send, change) = if intent.include_fee {
            if total < amount {
                return Err(LedgerError::insufficient_funds(format!(
                    "need {} lovelace, have {}",
                    amount, total
                )));
            }
            let send = amount.checked_sub(fee).filter(|s| *s > 0).ok_or_else(|| {
                LedgerError::insufficient_funds(format!(
                    "fee {} consumes the whole amount {}",
                    fee, amount
                ))
            })?;
            (send, total - amount)
        } else {
            let needed = amount
                .checked_add(fee)
                .ok_or_else(|| LedgerError::insufficient_funds("amount plus fee overflows"))?;
            let change = total.checked_sub(needed).ok_or_else(|| {
                LedgerError::insufficient_funds(format!(
                    "need {} lovelace, have {}",
                    needed, total
                ))
            })?;
            (amount, change)
        };

        let mut outputs = vec![CardanoTxOutput {
            address: destination,
            amount: send,
        }];
        if change > 0 {
            let own: CardanoAddress = decode_address(&self.own_address()?)?;
            outputs.push(CardanoTxOutput {
                address: own,
                amount: change,
            });
        }

        let inputs = self
            .utxos
            .iter()
            .map(|u| CardanoTxInput {
                tx_hash: u.previous_tx_hash,
                index: u.output_index,
            })
            .collect();

        Ok(UnsignedCardanoTransaction {
            format: self.params.format,
            inputs,
            outputs,
            fee,
            ttl: self.params.ttl,
            protocol_magic: self.params.protocol_magic,
        })
    }
}

impl TransactionBuilder for CardanoBuilder {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn build_preimage(&self, intent: &TransactionIntent) -> LedgerResult<PreparedTransaction> {
        let tx = self.unsigned_transaction(intent)?;
        log_debug!(
            MODULE,
            "transaction body ready",
            format = format!("{:?}", tx.format),
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            fee = tx.fee
        );
        PreparedTransaction::new(self.chain, SigningContext::Cardano(tx))
    }

    fn assemble(
        &self,
        prepared: &PreparedTransaction,
        signatures: &[RawSignature],
    ) -> LedgerResult<SignedTransaction> {
        let SigningContext::Cardano(tx) = &prepared.context else {
            return Err(wrong_context(ChainFamily::Cardano, prepared));
        };
        prepared.check_signatures(signatures)?;

        let signature = verify_ed25519(
            &signatures[0],
            &prepared.preimages[0].payload,
            &self.key.public_key,
        )?;
        let compiled = compile_cardano_transaction(tx, &signature, &self.key)?;
        log_info!(MODULE, "transaction assembled", txid = compiled.tx_id);

        Ok(SignedTransaction {
            chain: self.chain,
            raw: compiled.raw_tx,
            tx_id: Some(compiled.tx_id),
        })
    }
}
