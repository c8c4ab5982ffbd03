//! XRP Ledger Payment builder

use super::{wrong_context, PreparedTransaction, SigningContext, TransactionBuilder};
use crate::error::{LedgerError, LedgerResult};
use crate::signing::compiler::compile_ripple_transaction;
use crate::signing::normalizer::{normalize_ecdsa, verify_ed25519};
use crate::signing::preimage::ripple::UnsignedRipplePayment;
use crate::signing::preimage::RawSignature;
use crate::types::{
    Asset, Chain, ChainFamily, FeeParameters, Memo, SignedTransaction, TransactionIntent,
};
use crate::utils::network_config::{NetworkConfig, RippleParams};
use crate::xrp_wallet::{parse_destination, RippleKeyType, RipplePublicKey};
use crate::{log_debug, log_info};
use serde::{Deserialize, Serialize};

const MODULE: &str = "tx::ripple";

/// What the ledger reports about the destination account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleLedgerState {
    #[serde(default = "default_true")]
    pub destination_exists: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RippleLedgerState {
    fn default() -> Self {
        Self {
            destination_exists: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RippleBuilder {
    chain: Chain,
    params: RippleParams,
    public_key: RipplePublicKey,
    state: RippleLedgerState,
    last_ledger_sequence: Option<u32>,
}

impl RippleBuilder {
    pub fn new(chain: Chain, config: &NetworkConfig, public_key: &[u8]) -> LedgerResult<Self> {
        Ok(Self {
            chain,
            params: config.ripple(chain)?,
            public_key: RipplePublicKey::parse(public_key)?,
            state: RippleLedgerState::default(),
            last_ledger_sequence: None,
        })
    }

    pub fn with_state(mut self, state: RippleLedgerState) -> Self {
        self.state = state;
        self
    }

    pub fn with_last_ledger_sequence(mut self, ledger: u32) -> Self {
        self.last_ledger_sequence = Some(ledger);
        self
    }

    pub fn public_key(&self) -> &RipplePublicKey {
        &self.public_key
    }

    fn fee_drops(&self, fee: &FeeParameters) -> LedgerResult<u64> {
        match *fee {
            FeeParameters::FixedDrops { drops } | FeeParameters::Absolute { amount: drops } => {
                if drops == 0 {
                    return Err(LedgerError::invalid_fee("XRP fee must be at least one drop"));
                }
                Ok(drops)
            }
            other => Err(LedgerError::invalid_fee(format!(
                "{} fees do not apply to XRP",
                other.kind()
            ))),
        }
    }

    pub fn unsigned_transaction(
        &self,
        intent: &TransactionIntent,
    ) -> LedgerResult<UnsignedRipplePayment> {
        if intent.asset != Asset::Native {
            return Err(LedgerError::unsupported("only XRP payments are supported"));
        }
        if intent.extra_data.is_some() {
            return Err(LedgerError::unsupported("XRP payments carry no call data"));
        }

        let sequence = intent
            .sequence_or_nonce
            .ok_or_else(|| LedgerError::invalid_input("XRP payments need the account sequence"))?;
        let sequence = u32::try_from(sequence)
            .map_err(|_| LedgerError::invalid_input("account sequence exceeds 32 bits"))?;

        let destination = parse_destination(&intent.destination)?;
        let memo_tag = match &intent.memo {
            None => None,
            Some(Memo::Id(id)) => Some(u32::try_from(*id).map_err(|_| {
                LedgerError::invalid_input("destination tag exceeds 32 bits")
            })?),
            Some(Memo::Text(_)) => {
                return Err(LedgerError::unsupported("XRP payments take numeric tags only"))
            }
        };
        let destination_tag = match (destination.tag, memo_tag) {
            (Some(a), Some(b)) if a != b => {
                return Err(LedgerError::invalid_address(format!(
                    "X-address tag {} conflicts with destination tag {}",
                    a, b
                )))
            }
            (tag, memo) => tag.or(memo),
        };

        let fee = self.fee_drops(&intent.fee)?;
        let amount = intent.amount_u64()?;
        let amount = if intent.include_fee {
            amount.checked_sub(fee).filter(|a| *a > 0).ok_or_else(|| {
                LedgerError::insufficient_funds(format!(
                    "fee {} consumes the whole amount {}",
                    fee, amount
                ))
            })?
        } else {
            amount
        };

        if !self.state.destination_exists && amount < self.params.reserve_drops {
            return Err(LedgerError::insufficient_funds(format!(
                "destination is unfunded; {} drops is below the {} drop reserve",
                amount, self.params.reserve_drops
            )));
        }

        Ok(UnsignedRipplePayment {
            account: self.public_key.account_id().to_vec(),
            destination: destination.account_id.to_vec(),
            amount_drops: amount,
            fee_drops: fee,
            sequence,
            destination_tag,
            last_ledger_sequence: self.last_ledger_sequence,
            signing_pub_key: self.public_key.bytes.clone(),
            key_type: self.public_key.key_type,
        })
    }
}

impl TransactionBuilder for RippleBuilder {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn build_preimage(&self, intent: &TransactionIntent) -> LedgerResult<PreparedTransaction> {
        let tx = self.unsigned_transaction(intent)?;
        log_debug!(
            MODULE,
            "payment ready",
            account = self.public_key.classic_address(),
            sequence = tx.sequence,
            drops = tx.amount_drops
        );
        PreparedTransaction::new(self.chain, SigningContext::Ripple(tx))
    }

    fn assemble(
        &self,
        prepared: &PreparedTransaction,
        signatures: &[RawSignature],
    ) -> LedgerResult<SignedTransaction> {
        let SigningContext::Ripple(tx) = &prepared.context else {
            return Err(wrong_context(ChainFamily::Ripple, prepared));
        };
        prepared.check_signatures(signatures)?;
        let preimage = &prepared.preimages[0];

        let signature = match self.public_key.key_type {
            RippleKeyType::Secp256k1 => {
                let key = secp256k1::PublicKey::from_slice(&self.public_key.bytes)?;
                normalize_ecdsa(&signatures[0], &preimage.digest()?, &key)?
            }
            RippleKeyType::Ed25519 => {
                let key: [u8; 32] = self
                    .public_key
                    .verifying_bytes()
                    .try_into()
                    .map_err(|_| LedgerError::invalid_state("ed25519 key must be 32 bytes"))?;
                verify_ed25519(&signatures[0], &preimage.payload, &key)?
            }
        };

        let compiled = compile_ripple_transaction(tx, &signature)?;
        log_info!(MODULE, "payment assembled", txid = compiled.tx_id);

        Ok(SignedTransaction {
            chain: self.chain,
            raw: compiled.raw_tx,
            tx_id: Some(compiled.tx_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::signing::preimage::ripple::transaction_id;
    use crate::xrp_wallet::{encode_classic_address, encode_x_address};
    use ed25519_dalek::{Signer, SigningKey};
    use secp256k1::{Message, Secp256k1, SecretKey};

    fn destination() -> String {
        encode_classic_address(&[0x22; 20])
    }

    fn secp_keys() -> (SecretKey, Vec<u8>) {
        let sk = SecretKey::from_slice(&[0x33; 32]).unwrap();
        let pk = secp256k1::PublicKey::from_secret_key(&Secp256k1::new(), &sk);
        (sk, pk.serialize().to_vec())
    }

    fn intent(amount: u128) -> TransactionIntent {
        TransactionIntent::new(destination(), amount, FeeParameters::FixedDrops { drops: 12 })
            .with_nonce(7)
    }

    #[test]
    fn test_secp256k1_payment_round_trip() {
        let (sk, pk) = secp_keys();
        let b = RippleBuilder::new(Chain::Xrp, &NetworkConfig::new(), &pk).unwrap();
        let prepared = b.build_preimage(&intent(25_000_000)).unwrap();
        assert_eq!(&prepared.preimages[0].preimage[..4], b"STX\0");

        let msg = Message::from_digest(prepared.preimages[0].digest().unwrap());
        let sig = Secp256k1::new().sign_ecdsa(&msg, &sk).serialize_compact();
        let signed = b.assemble(&prepared, &[RawSignature::new(sig)]).unwrap();

        assert_eq!(
            signed.tx_id.unwrap(),
            hex::encode_upper(transaction_id(&signed.raw))
        );
        // TxnSignature directly follows the 33-byte SigningPubKey
        let pk_at = signed
            .raw
            .windows(35)
            .position(|w| w[0] == 0x73 && w[1] == 33 && w[2..] == pk[..])
            .unwrap();
        assert_eq!(signed.raw[pk_at + 35], 0x74);
    }

    #[test]
    fn test_ed25519_signs_raw_preimage() {
        let signing_key = SigningKey::from_bytes(&[0x44; 32]);
        let pk = signing_key.verifying_key().to_bytes();
        let b = RippleBuilder::new(Chain::Xrp, &NetworkConfig::new(), &pk).unwrap();
        assert_eq!(b.public_key().key_type, RippleKeyType::Ed25519);

        let prepared = b.build_preimage(&intent(25_000_000)).unwrap();
        assert_eq!(prepared.preimages[0].payload, prepared.preimages[0].preimage);

        let sig = signing_key.sign(&prepared.preimages[0].payload).to_bytes();
        let signed = b.assemble(&prepared, &[RawSignature::new(sig)]).unwrap();
        assert!(signed.raw.windows(64).any(|w| w == sig));
    }

    #[test]
    fn test_unfunded_destination_below_reserve() {
        let (_, pk) = secp_keys();
        let b = RippleBuilder::new(Chain::Xrp, &NetworkConfig::new(), &pk)
            .unwrap()
            .with_state(RippleLedgerState {
                destination_exists: false,
            });
        assert_eq!(
            b.build_preimage(&intent(5_000_000)).unwrap_err().code,
            ErrorCode::InsufficientFunds
        );
        assert!(b.build_preimage(&intent(10_000_000)).is_ok());
    }

    #[test]
    fn test_x_address_tag_and_conflict() {
        let (_, pk) = secp_keys();
        let b = RippleBuilder::new(Chain::Xrp, &NetworkConfig::new(), &pk).unwrap();
        let x_address = encode_x_address(&[0x22; 20], Some(5), false);

        let mut with_tag = intent(1_000_000);
        with_tag.destination = x_address.clone();
        let tx = b.unsigned_transaction(&with_tag).unwrap();
        assert_eq!(tx.destination_tag, Some(5));
        assert_eq!(tx.destination, vec![0x22; 20]);

        let conflicting = with_tag.with_memo(Memo::Id(6));
        assert_eq!(
            b.build_preimage(&conflicting).unwrap_err().code,
            ErrorCode::InvalidAddress
        );
    }

    #[test]
    fn test_include_fee_and_sequence_bounds() {
        let (_, pk) = secp_keys();
        let b = RippleBuilder::new(Chain::Xrp, &NetworkConfig::new(), &pk)
            .unwrap()
            .with_last_ledger_sequence(90_000_000);
        let tx = b
            .unsigned_transaction(&intent(1_000_000).with_include_fee(true))
            .unwrap();
        assert_eq!(tx.amount_drops, 999_988);
        assert_eq!(tx.last_ledger_sequence, Some(90_000_000));

        let too_far = intent(1_000_000).with_nonce(u64::from(u32::MAX) + 1);
        assert_eq!(
            b.build_preimage(&too_far).unwrap_err().code,
            ErrorCode::InvalidInput
        );
    }
}
