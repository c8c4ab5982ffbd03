//! Bitcoin-family transaction builder
//!
//! Spends the whole supplied UTXO set to one destination plus change.

use super::{wrong_context, PreparedTransaction, SigningContext, TransactionBuilder};
use crate::bitcoin_wallet::{
    decode_address, p2pkh_script, p2sh_p2wpkh_redeem_script, p2sh_script, p2wpkh_script,
    p2wpkh_script_code, WalletKey,
};
use crate::error::{LedgerError, LedgerResult};
use crate::signing::compiler::{compile_utxo_transaction, estimate_utxo_vsize};
use crate::signing::normalizer::normalize_ecdsa;
use crate::signing::preimage::bitcoin::{
    SighashScheme, SpendKind, UnsignedUtxoTransaction, UtxoTxInput, UtxoTxOutput,
};
use crate::signing::preimage::RawSignature;
use crate::types::{
    Asset, Chain, ChainFamily, FeeParameters, SignedTransaction, TransactionIntent, UnspentOutput,
};
use crate::utils::crypto::hash160;
use crate::utils::network_config::{NetworkConfig, UtxoParams};
use crate::{log_debug, log_info, log_warn};

const MODULE: &str = "tx::utxo";

#[derive(Debug, Clone)]
pub struct UtxoBuilder {
    chain: Chain,
    params: UtxoParams,
    key: WalletKey,
    utxos: Vec<UnspentOutput>,
    change_address: Option<String>,
}

impl UtxoBuilder {
    pub fn new(
        chain: Chain,
        config: &NetworkConfig,
        public_key: &[u8],
        utxos: Vec<UnspentOutput>,
    ) -> LedgerResult<Self> {
        Ok(Self {
            chain,
            params: config.utxo(chain)?,
            key: WalletKey::parse(public_key)?,
            utxos,
            change_address: None,
        })
    }

    pub fn with_change_address(mut self, address: impl Into<String>) -> Self {
        self.change_address = Some(address.into());
        self
    }

    pub fn params(&self) -> &UtxoParams {
        &self.params
    }

    /// Match a locking script against the scripts this wallet key can unlock
    fn classify(&self, locking_script: &[u8]) -> LedgerResult<SpendKind> {
        let segwit_key = self.key.public_key();

        let kind = if locking_script == p2pkh_script(&self.key.key_hash()).as_slice() {
            SpendKind::P2pkh
        } else if locking_script == p2wpkh_script(segwit_key).as_slice() {
            SpendKind::P2wpkh
        } else if locking_script
            == p2sh_script(&hash160(&p2sh_p2wpkh_redeem_script(segwit_key))).as_slice()
        {
            SpendKind::P2shP2wpkh
        } else {
            return Err(LedgerError::unsupported(format!(
                "locking script {} is not spendable by the wallet key",
                hex::encode(locking_script)
            )));
        };

        if self.params.fork_id && kind != SpendKind::P2pkh {
            return Err(LedgerError::unsupported(
                "fork-id chains only spend pay-to-public-key-hash outputs",
            ));
        }
        Ok(kind)
    }

    fn inputs(&self) -> LedgerResult<Vec<UtxoTxInput>> {
        if self.utxos.is_empty() {
            return Err(LedgerError::no_spendable_outputs("the UTXO set is empty"));
        }

        self.utxos
            .iter()
            .map(|utxo| {
                // providers that omit scripts report outputs of the legacy wallet address
                let locking_script = if utxo.locking_script.is_empty() {
                    p2pkh_script(&self.key.key_hash())
                } else {
                    utxo.locking_script.clone()
                };
                let spend = self.classify(&locking_script)?;
                let script_code = match spend {
                    SpendKind::P2pkh => locking_script.clone(),
                    SpendKind::P2wpkh | SpendKind::P2shP2wpkh => {
                        p2wpkh_script_code(self.key.public_key())
                    }
                };

                Ok(UtxoTxInput {
                    prev_hash: utxo.previous_tx_hash,
                    vout: utxo.output_index,
                    value: utxo.amount,
                    sequence: self.params.sequence,
                    locking_script,
                    script_code,
                    spend,
                })
            })
            .collect()
    }

    fn change_script(&self, inputs: &[UtxoTxInput]) -> LedgerResult<Vec<u8>> {
        match &self.change_address {
            Some(address) => Ok(decode_address(address, &self.params)?.script_pubkey),
            None => inputs
                .first()
                .map(|input| input.locking_script.clone())
                .ok_or_else(|| LedgerError::no_spendable_outputs("the UTXO set is empty")),
        }
    }

    fn scheme(&self) -> SighashScheme {
        if self.params.fork_id {
            SighashScheme::ForkId
        } else {
            SighashScheme::Standard
        }
    }

    /// Signed size in virtual bytes of a send to `destination` with change
    pub fn estimated_vsize(&self, destination: &str) -> LedgerResult<u64> {
        let destination_script = decode_address(destination, &self.params)?.script_pubkey;
        let inputs = self.inputs()?;
        let change_script = self.change_script(&inputs)?;
        let draft = self.draft(inputs, destination_script, change_script);
        Ok(self.sized(&draft))
    }

    fn draft(
        &self,
        inputs: Vec<UtxoTxInput>,
        destination_script: Vec<u8>,
        change_script: Vec<u8>,
    ) -> UnsignedUtxoTransaction {
        UnsignedUtxoTransaction {
            version: self.params.tx_version,
            inputs,
            outputs: vec![
                UtxoTxOutput {
                    value: 0,
                    script_pubkey: destination_script,
                },
                UtxoTxOutput {
                    value: 0,
                    script_pubkey: change_script,
                },
            ],
            locktime: 0,
            scheme: self.scheme(),
        }
    }

    /// Fee in satoshis for a transaction shaped like `draft`
    fn fee_for(&self, fee: &FeeParameters, draft: &UnsignedUtxoTransaction) -> LedgerResult<u64> {
        match *fee {
            FeeParameters::Absolute { amount } => Ok(amount),
            FeeParameters::UtxoByteRate { satoshis_per_byte } => {
                if satoshis_per_byte == 0 {
                    return Err(LedgerError::invalid_fee("byte rate must be positive"));
                }
                let fee = satoshis_per_byte
                    .checked_mul(self.sized(draft))
                    .ok_or_else(|| LedgerError::invalid_fee("fee overflows 64 bits"))?;
                Ok(fee.max(self.params.min_relay_fee))
            }
            other => Err(LedgerError::invalid_fee(format!(
                "{} fees do not apply to {:?}",
                other.kind(),
                self.chain
            ))),
        }
    }

    /// Estimated virtual size; legacy-only spends get one spare byte for signature length variance
    fn sized(&self, draft: &UnsignedUtxoTransaction) -> u64 {
        let size = estimate_utxo_vsize(draft, &self.key) as u64;
        if draft.inputs.iter().any(|i| i.spend.is_segwit()) {
            size
        } else {
            size + 1
        }
    }

    /// Assemble the unsigned transaction for `intent`
    pub fn unsigned_transaction(
        &self,
        intent: &TransactionIntent,
    ) -> LedgerResult<UnsignedUtxoTransaction> {
        if intent.asset != Asset::Native {
            return Err(LedgerError::unsupported(format!(
                "{:?} only moves its native coin",
                self.chain
            )));
        }
        if intent.memo.is_some() || intent.extra_data.is_some() {
            return Err(LedgerError::unsupported(
                "memos and extra data are not carried by UTXO transactions",
            ));
        }

        let amount = intent.amount_u64()?;
        if amount == 0 {
            return Err(LedgerError::invalid_input("amount must be positive"));
        }

        let destination_script = decode_address(&intent.destination, &self.params)?.script_pubkey;
        let inputs = self.inputs()?;
        let change_script = self.change_script(&inputs)?;

        let total = inputs
            .iter()
            .try_fold(0u64, |acc, input| acc.checked_add(input.value))
            .ok_or_else(|| LedgerError::encoding("UTXO total overflows 64 bits"))?;

        let mut tx = self.draft(inputs, destination_script, change_script);
        let fee = self.fee_for(&intent.fee, &tx)?;

        let (send, change) = if intent.include_fee {
            if total < amount {
                return Err(LedgerError::insufficient_funds(format!(
                    "need {} sats, have {}",
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
                LedgerError::insufficient_funds(format!("need {} sats, have {}", needed, total))
            })?;
            (amount, change)
        };

        tx.outputs[0].value = send;
        if change == 0 {
            tx.outputs.truncate(1);
        } else {
            tx.outputs[1].value = change;
        }

        log_debug!(
            MODULE,
            "unsigned transaction ready",
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            fee = fee,
            change = change
        );
        Ok(tx)
    }
}


impl TransactionBuilder for UtxoBuilder {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn build_preimage(&self, intent: &TransactionIntent) -> LedgerResult<PreparedTransaction> {
        let tx = self.unsigned_transaction(intent)?;
        PreparedTransaction::new(self.chain, SigningContext::Utxo(tx))
    }

    fn assemble(
        &self,
        prepared: &PreparedTransaction,
        signatures: &[RawSignature],
    ) -> LedgerResult<SignedTransaction> {
        let SigningContext::Utxo(tx) = &prepared.context else {
            return Err(wrong_context(ChainFamily::Utxo, prepared));
        };
        prepared.check_signatures(signatures)?;

        let mut normalized = Vec::with_capacity(signatures.len());
        for (preimage, raw) in prepared.preimages.iter().zip(signatures) {
            let signature = normalize_ecdsa(raw, &preimage.digest()?, self.key.public_key())
                .inspect_err(|e| {
                    log_warn!(MODULE, "input signature rejected", input = preimage.input_index.unwrap_or(0), reason = e)
                })?;
            normalized.push(signature);
        }

        let compiled = compile_utxo_transaction(tx, &normalized, &self.key)?;
        log_info!(MODULE, "transaction assembled", txid = compiled.txid, vsize = compiled.vsize);

        Ok(SignedTransaction {
            chain: self.chain,
            raw: compiled.raw_tx,
            tx_id: Some(compiled.txid),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

    const DESTINATION: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

    fn secret_key() -> SecretKey {
        SecretKey::from_slice(&[0x11; 32]).unwrap()
    }

    fn public_key() -> PublicKey {
        PublicKey::from_secret_key(&Secp256k1::new(), &secret_key())
    }

    fn utxo(tag: u8, amount: u64, script: Vec<u8>) -> UnspentOutput {
        UnspentOutput {
            previous_tx_hash: [tag; 32],
            output_index: tag as u32,
            amount,
            locking_script: script,
        }
    }

    fn builder(chain: Chain, utxos: Vec<UnspentOutput>) -> UtxoBuilder {
        UtxoBuilder::new(
            chain,
            &NetworkConfig::new(),
            &public_key().serialize(),
            utxos,
        )
        .unwrap()
    }

    fn sign_all(prepared: &PreparedTransaction) -> Vec<RawSignature> {
        let secp = Secp256k1::new();
        prepared
            .preimages
            .iter()
            .map(|p| {
                let msg = Message::from_digest(p.digest().unwrap());
                RawSignature::new(secp.sign_ecdsa(&msg, &secret_key()).serialize_compact())
            })
            .collect()
    }

    #[test]
    fn test_change_after_fixed_fee() {
        let b = builder(
            Chain::Bitcoin,
            vec![utxo(1, 100_000_000, p2wpkh_script(&public_key()))],
        );
        let intent = TransactionIntent::new(
            DESTINATION,
            50_000_000,
            FeeParameters::Absolute { amount: 10_000 },
        );
        let tx = b.unsigned_transaction(&intent).unwrap();
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[0].value, 50_000_000);
        assert_eq!(tx.outputs[1].value, 49_990_000);
        assert_eq!(tx.outputs[1].script_pubkey, p2wpkh_script(&public_key()));
    }

    #[test]
    fn test_include_fee_reduces_send_amount() {
        let b = builder(
            Chain::Bitcoin,
            vec![utxo(1, 100_000_000, p2wpkh_script(&public_key()))],
        );
        let intent = TransactionIntent::new(
            DESTINATION,
            50_000_000,
            FeeParameters::Absolute { amount: 10_000 },
        )
        .with_include_fee(true);
        let tx = b.unsigned_transaction(&intent).unwrap();
        assert_eq!(tx.outputs[0].value, 49_990_000);
        assert_eq!(tx.outputs[1].value, 50_000_000);
    }

    #[test]
    fn test_zero_change_is_omitted() {
        let b = builder(
            Chain::Bitcoin,
            vec![
                utxo(1, 30_000, p2wpkh_script(&public_key())),
                utxo(2, 25_000, p2wpkh_script(&public_key())),
            ],
        );
        let intent =
            TransactionIntent::new(DESTINATION, 50_000, FeeParameters::Absolute { amount: 5_000 });
        let tx = b.unsigned_transaction(&intent).unwrap();
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.inputs.len(), 2);
    }

    #[test]
    fn test_insufficient_funds() {
        let b = builder(
            Chain::Bitcoin,
            vec![utxo(1, 10_000, p2wpkh_script(&public_key()))],
        );
        let intent =
            TransactionIntent::new(DESTINATION, 9_000, FeeParameters::Absolute { amount: 2_000 });
        let err = b.unsigned_transaction(&intent).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientFunds);
    }

    #[test]
    fn test_empty_utxo_set() {
        let b = builder(Chain::Bitcoin, vec![]);
        let intent =
            TransactionIntent::new(DESTINATION, 1_000, FeeParameters::Absolute { amount: 100 });
        assert_eq!(
            b.build_preimage(&intent).unwrap_err().code,
            ErrorCode::NoSpendableOutputs
        );
    }

    #[test]
    fn test_foreign_script_rejected() {
        let b = builder(Chain::Bitcoin, vec![utxo(1, 10_000, p2pkh_script(&[0x42; 20]))]);
        let intent =
            TransactionIntent::new(DESTINATION, 1_000, FeeParameters::Absolute { amount: 100 });
        assert_eq!(
            b.build_preimage(&intent).unwrap_err().code,
            ErrorCode::UnsupportedContractOrAssetKind
        );
    }

    #[test]
    fn test_byte_rate_fee_respects_relay_floor() {
        let b = builder(
            Chain::Bitcoin,
            vec![utxo(1, 1_000_000, p2wpkh_script(&public_key()))],
        );
        let cheap = TransactionIntent::new(
            DESTINATION,
            100_000,
            FeeParameters::UtxoByteRate { satoshis_per_byte: 1 },
        );
        let tx = b.unsigned_transaction(&cheap).unwrap();
        assert_eq!(tx.outputs[1].value, 1_000_000 - 100_000 - 1_000);

        let rated = TransactionIntent::new(
            DESTINATION,
            100_000,
            FeeParameters::UtxoByteRate { satoshis_per_byte: 20 },
        );
        let tx = b.unsigned_transaction(&rated).unwrap();
        let fee = 1_000_000 - 100_000 - tx.outputs[1].value;
        assert!(fee > 1_000);
        assert_eq!(fee % 20, 0);
    }

    #[test]
    fn test_wrong_fee_kind() {
        let b = builder(
            Chain::Bitcoin,
            vec![utxo(1, 1_000_000, p2wpkh_script(&public_key()))],
        );
        let intent =
            TransactionIntent::new(DESTINATION, 1_000, FeeParameters::FixedDrops { drops: 12 });
        assert_eq!(
            b.build_preimage(&intent).unwrap_err().code,
            ErrorCode::InvalidFeeParameters
        );
    }

    #[test]
    fn test_segwit_round_trip_through_bitcoin_parser() {
        let nested = p2sh_script(&hash160(&p2sh_p2wpkh_redeem_script(&public_key())));
        let b = builder(
            Chain::Bitcoin,
            vec![
                utxo(1, 60_000, p2wpkh_script(&public_key())),
                utxo(2, 70_000, nested),
                utxo(3, 80_000, p2pkh_script(&hash160(&public_key().serialize()))),
            ],
        );
        let intent =
            TransactionIntent::new(DESTINATION, 150_000, FeeParameters::Absolute { amount: 2_000 });
        let prepared = b.build_preimage(&intent).unwrap();
        assert_eq!(prepared.preimages.len(), 3);

        let signed = b.assemble(&prepared, &sign_all(&prepared)).unwrap();
        let parsed: bitcoin::Transaction = bitcoin::consensus::deserialize(&signed.raw).unwrap();
        assert_eq!(parsed.input.len(), 3);
        assert_eq!(parsed.output[0].value.to_sat(), 150_000);
        assert_eq!(parsed.output[1].value.to_sat(), 58_000);
        assert_eq!(parsed.compute_txid().to_string(), signed.tx_id.unwrap());
        assert_eq!(parsed.input[0].witness.len(), 2);
        assert_eq!(parsed.input[1].witness.len(), 2);
        assert!(parsed.input[2].witness.is_empty());
    }

    #[test]
    fn test_uncompressed_key_spends_its_own_p2pkh_output() {
        let uncompressed = public_key().serialize_uncompressed();
        let legacy_script = p2pkh_script(&hash160(&uncompressed));
        let b = UtxoBuilder::new(
            Chain::Bitcoin,
            &NetworkConfig::new(),
            &uncompressed,
            vec![
                utxo(1, 90_000, legacy_script.clone()),
                utxo(2, 40_000, p2wpkh_script(&public_key())),
            ],
        )
        .unwrap();
        let intent =
            TransactionIntent::new(DESTINATION, 100_000, FeeParameters::Absolute { amount: 2_000 });
        let prepared = b.build_preimage(&intent).unwrap();
        let SigningContext::Utxo(tx) = &prepared.context else {
            panic!("wrong context");
        };
        assert_eq!(tx.inputs[0].spend, SpendKind::P2pkh);
        assert_eq!(tx.inputs[1].spend, SpendKind::P2wpkh);
        assert_eq!(tx.outputs[1].script_pubkey, legacy_script);

        let signed = b.assemble(&prepared, &sign_all(&prepared)).unwrap();
        let parsed: bitcoin::Transaction = bitcoin::consensus::deserialize(&signed.raw).unwrap();
        let script_sig = parsed.input[0].script_sig.as_bytes();
        let key_push = script_sig.len() - 66;
        assert_eq!(script_sig[key_push], 0x41);
        assert_eq!(&script_sig[key_push + 1..], &uncompressed[..]);
        assert_eq!(parsed.input[1].witness.nth(1), Some(&public_key().serialize()[..]));
    }

    #[test]
    fn test_missing_script_defaults_to_the_supplied_key_form() {
        let uncompressed = public_key().serialize_uncompressed();
        let b = UtxoBuilder::new(
            Chain::Bitcoin,
            &NetworkConfig::new(),
            &uncompressed,
            vec![utxo(1, 50_000, vec![])],
        )
        .unwrap();
        let intent =
            TransactionIntent::new(DESTINATION, 10_000, FeeParameters::Absolute { amount: 1_000 });
        let SigningContext::Utxo(tx) = b.build_preimage(&intent).unwrap().context else {
            panic!("wrong context");
        };
        assert_eq!(
            hex::encode(&tx.inputs[0].locking_script),
            format!("76a914{}88ac", hex::encode(hash160(&uncompressed)))
        );
    }

    #[test]
    fn test_bitcoin_cash_uses_forkid_and_cashaddr() {
        let b = builder(Chain::BitcoinCash, vec![utxo(7, 500_000, vec![])]);
        let cashaddr = crate::bitcoin_cash_wallet::cash_address(&public_key().into(), "bitcoincash");
        let intent =
            TransactionIntent::new(cashaddr, 100_000, FeeParameters::Absolute { amount: 1_000 });
        let prepared = b.build_preimage(&intent).unwrap();
        let SigningContext::Utxo(tx) = &prepared.context else {
            panic!("wrong context");
        };
        assert_eq!(tx.scheme, SighashScheme::ForkId);
        assert_eq!(&prepared.preimages[0].preimage[prepared.preimages[0].preimage.len() - 4..], &[0x41, 0, 0, 0]);

        let signed = b.assemble(&prepared, &sign_all(&prepared)).unwrap();
        // scriptSig ends with the compressed key; the DER signature carries 0x41
        let hex = signed.raw_hex();
        assert!(hex.contains(&format!("41{}{}", "21", hex::encode(public_key().serialize()))));
    }

    #[test]
    fn test_bad_signature_is_rejected() {
        let b = builder(
            Chain::Litecoin,
            vec![utxo(1, 100_000, p2wpkh_script(&public_key()))],
        );
        let ltc_dest = crate::bitcoin_wallet::p2pkh_address(&public_key().into(), b.params());
        let intent =
            TransactionIntent::new(ltc_dest, 10_000, FeeParameters::Absolute { amount: 1_000 });
        let prepared = b.build_preimage(&intent).unwrap();
        let mut sigs = sign_all(&prepared);
        sigs[0].bytes[5] ^= 0xff;
        assert_eq!(
            b.assemble(&prepared, &sigs).unwrap_err().code,
            ErrorCode::SignatureVerificationFailed
        );
    }

    #[test]
    fn test_tampered_context_is_invalid_state() {
        let b = builder(
            Chain::Bitcoin,
            vec![utxo(1, 100_000, p2wpkh_script(&public_key()))],
        );
        let intent =
            TransactionIntent::new(DESTINATION, 10_000, FeeParameters::Absolute { amount: 1_000 });
        let mut prepared = b.build_preimage(&intent).unwrap();
        let sigs = sign_all(&prepared);
        if let SigningContext::Utxo(tx) = &mut prepared.context {
            tx.outputs[0].value += 1;
        }
        assert_eq!(b.assemble(&prepared, &sigs).unwrap_err().code, ErrorCode::InvalidState);
    }
}
