//! Transaction Module
//!
//! Per-ledger builders sharing one contract: `build_preimage` turns an
//! intent into the bytes a signer must sign, `assemble` turns the raw
//! signatures back into a broadcast-ready transaction.

mod cardano;
mod evm;
mod ripple;
mod session;
mod stellar;
mod utxo;

pub use cardano::*;
pub use evm::*;
pub use ripple::*;
pub use session::*;
pub use stellar::*;
pub use utxo::*;

use crate::error::{LedgerError, LedgerResult};
use crate::signing::preimage::{
    bitcoin::{utxo_preimages, UnsignedUtxoTransaction},
    cardano::{cardano_preimage, UnsignedCardanoTransaction},
    ethereum::{evm_preimage, UnsignedEvmTransaction},
    ripple::{ripple_preimage, UnsignedRipplePayment},
    stellar::{stellar_preimage, UnsignedStellarTransaction},
    RawSignature, SigningPreimage,
};
use crate::types::{Chain, ChainFamily, SignedTransaction, TransactionIntent};
use crate::utils::network_config::NetworkConfig;
use serde::{Deserialize, Serialize};

/// The unsigned transaction a preimage set was derived from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", content = "transaction", rename_all = "snake_case")]
pub enum SigningContext {
    Utxo(UnsignedUtxoTransaction),
    Evm(UnsignedEvmTransaction),
    Ripple(UnsignedRipplePayment),
    Stellar(UnsignedStellarTransaction),
    Cardano(UnsignedCardanoTransaction),
}

impl SigningContext {
    pub fn family(&self) -> ChainFamily {
        match self {
            SigningContext::Utxo(_) => ChainFamily::Utxo,
            SigningContext::Evm(_) => ChainFamily::Evm,
            SigningContext::Ripple(_) => ChainFamily::Ripple,
            SigningContext::Stellar(_) => ChainFamily::Stellar,
            SigningContext::Cardano(_) => ChainFamily::Cardano,
        }
    }

    /// Re-run the preimage encoder over the stored transaction
    pub fn preimages(&self) -> LedgerResult<Vec<SigningPreimage>> {
        match self {
            SigningContext::Utxo(tx) => utxo_preimages(tx),
            SigningContext::Evm(tx) => Ok(vec![evm_preimage(tx)]),
            SigningContext::Ripple(tx) => Ok(vec![ripple_preimage(tx)?]),
            SigningContext::Stellar(tx) => Ok(vec![stellar_preimage(tx)?]),
            SigningContext::Cardano(tx) => Ok(vec![cardano_preimage(tx)?]),
        }
    }
}

/// Output of `build_preimage`, threaded into `assemble`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTransaction {
    pub chain: Chain,
    pub preimages: Vec<SigningPreimage>,
    pub context: SigningContext,
}

impl PreparedTransaction {
    pub fn new(chain: Chain, context: SigningContext) -> LedgerResult<Self> {
        let preimages = context.preimages()?;
        Ok(Self {
            chain,
            preimages,
            context,
        })
    }

    /// Check the preimages still match the stored transaction and that
    /// exactly one signature arrived per preimage
    pub fn check_signatures(&self, signatures: &[RawSignature]) -> LedgerResult<()> {
        if self.context.preimages()? != self.preimages {
            return Err(LedgerError::invalid_state(
                "preimages do not match the prepared transaction",
            ));
        }
        if signatures.len() != self.preimages.len() {
            return Err(LedgerError::verification_failed(format!(
                "expected {} signatures, got {}",
                self.preimages.len(),
                signatures.len()
            )));
        }
        Ok(())
    }
}

/// Shared contract of every ledger builder
pub trait TransactionBuilder {
    fn chain(&self) -> Chain;

    fn build_preimage(&self, intent: &TransactionIntent) -> LedgerResult<PreparedTransaction>;

    fn assemble(
        &self,
        prepared: &PreparedTransaction,
        signatures: &[RawSignature],
    ) -> LedgerResult<SignedTransaction>;
}

fn wrong_context(expected: ChainFamily, prepared: &PreparedTransaction) -> LedgerError {
    LedgerError::invalid_state(format!(
        "{:?} builder cannot assemble a {:?} transaction",
        expected,
        prepared.context.family()
    ))
}

/// Wallet-side inputs a builder is constructed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    /// Sender public key, hex
    pub public_key: String,
    /// Cardano Byron chain code, hex
    #[serde(default)]
    pub chain_code: Option<String>,
    #[serde(default)]
    pub utxos: Vec<crate::types::UnspentOutput>,
    #[serde(default)]
    pub change_address: Option<String>,
    #[serde(default)]
    pub ripple: RippleLedgerState,
    #[serde(default)]
    pub stellar: StellarLedgerState,
    /// Unix time used to centre Stellar time bounds
    #[serde(default)]
    pub now: Option<u64>,
}

/// One builder per ledger family
#[derive(Debug, Clone)]
pub enum LedgerBuilder {
    Utxo(UtxoBuilder),
    Evm(EvmBuilder),
    Ripple(RippleBuilder),
    Stellar(StellarBuilder),
    Cardano(CardanoBuilder),
}

impl LedgerBuilder {
    /// Construct the builder for `chain` from a wallet snapshot
    pub fn for_chain(
        chain: Chain,
        config: &NetworkConfig,
        wallet: &WalletSnapshot,
    ) -> LedgerResult<Self> {
        let public_key = decode_hex(&wallet.public_key, "public key")?;

        Ok(match chain.family() {
            ChainFamily::Utxo => {
                let mut builder =
                    UtxoBuilder::new(chain, config, &public_key, wallet.utxos.clone())?;
                if let Some(change) = &wallet.change_address {
                    builder = builder.with_change_address(change.clone());
                }
                LedgerBuilder::Utxo(builder)
            }
            ChainFamily::Evm => LedgerBuilder::Evm(EvmBuilder::new(chain, config, &public_key)?),
            ChainFamily::Ripple => LedgerBuilder::Ripple(
                RippleBuilder::new(chain, config, &public_key)?.with_state(wallet.ripple),
            ),
            ChainFamily::Stellar => {
                let mut builder = StellarBuilder::new(chain, config, &public_key)?
                    .with_state(wallet.stellar);
                if let Some(now) = wallet.now {
                    builder = builder.with_time_bounds_around(now);
                }
                LedgerBuilder::Stellar(builder)
            }
            ChainFamily::Cardano => {
                let chain_code = wallet
                    .chain_code
                    .as_deref()
                    .map(|c| decode_key32(c, "chain code"))
                    .transpose()?;
                LedgerBuilder::Cardano(CardanoBuilder::new(
                    chain,
                    config,
                    &public_key,
                    chain_code,
                    wallet.utxos.clone(),
                )?)
            }
        })
    }

    fn inner(&self) -> &dyn TransactionBuilder {
        match self {
            LedgerBuilder::Utxo(b) => b,
            LedgerBuilder::Evm(b) => b,
            LedgerBuilder::Ripple(b) => b,
            LedgerBuilder::Stellar(b) => b,
            LedgerBuilder::Cardano(b) => b,
        }
    }
}

impl TransactionBuilder for LedgerBuilder {
    fn chain(&self) -> Chain {
        self.inner().chain()
    }

    fn build_preimage(&self, intent: &TransactionIntent) -> LedgerResult<PreparedTransaction> {
        self.inner().build_preimage(intent)
    }

    fn assemble(
        &self,
        prepared: &PreparedTransaction,
        signatures: &[RawSignature],
    ) -> LedgerResult<SignedTransaction> {
        if prepared.chain != self.chain() {
            return Err(LedgerError::invalid_state(format!(
                "prepared for {:?}, builder is for {:?}",
                prepared.chain,
                self.chain()
            )));
        }
        self.inner().assemble(prepared, signatures)
    }
}

pub(crate) fn decode_hex(value: &str, what: &str) -> LedgerResult<Vec<u8>> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(trimmed).map_err(|e| LedgerError::invalid_input(format!("{} is not hex: {}", what, e)))
}

pub(crate) fn decode_key32(value: &str, what: &str) -> LedgerResult<[u8; 32]> {
    decode_hex(value, what)?
        .try_into()
        .map_err(|_| LedgerError::invalid_input(format!("{} must be 32 bytes", what)))
}
