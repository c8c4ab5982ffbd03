//! Cardano Pre-Image Generation
//!
//! Transaction bodies in the Byron layout (indefinite arrays, tag-24
//! wrapped inputs) and the Shelley layout (integer-keyed map).

use super::{SigningAlgorithm, SigningPreimage};
use crate::cardano_wallet::{CardanoAddress, CardanoEra};
use crate::encoding::cbor::Cbor;
use crate::error::{LedgerError, LedgerResult};
use crate::utils::crypto::blake2b_256;
use crate::utils::network_config::CardanoTxFormat;
use serde::{Deserialize, Serialize};

/// Byron signing data tag for a transaction signature
const BYRON_SIG_TAG: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardanoTxInput {
    #[serde(with = "crate::serde_bytes::hex32")]
    pub tx_hash: [u8; 32],
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardanoTxOutput {
    pub address: CardanoAddress,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedCardanoTransaction {
    pub format: CardanoTxFormat,
    pub inputs: Vec<CardanoTxInput>,
    pub outputs: Vec<CardanoTxOutput>,
    /// Implicit in the Byron layout (inputs minus outputs)
    pub fee: u64,
    pub ttl: u64,
    pub protocol_magic: u32,
}

impl UnsignedCardanoTransaction {
    pub fn body(&self) -> LedgerResult<Cbor> {
        match self.format {
            CardanoTxFormat::Byron => self.byron_body(),
            CardanoTxFormat::Shelley => Ok(self.shelley_body()),
        }
    }

    fn byron_body(&self) -> LedgerResult<Cbor> {
        let inputs = self
            .inputs
            .iter()
            .map(|input| {
                let outpoint = Cbor::Array(vec![
                    Cbor::bytes(input.tx_hash.to_vec()),
                    Cbor::Unsigned(input.index as u64),
                ]);
                Cbor::Array(vec![Cbor::Unsigned(0), Cbor::embedded(&outpoint)])
            })
            .collect();

        let mut outputs = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            if output.address.era != CardanoEra::Byron {
                return Err(LedgerError::unsupported(
                    "Byron transactions can only pay to Byron addresses",
                ));
            }
            outputs.push(Cbor::Array(vec![
                output.address.to_cbor(),
                Cbor::Unsigned(output.amount),
            ]));
        }

        Ok(Cbor::Array(vec![
            Cbor::IndefiniteArray(inputs),
            Cbor::IndefiniteArray(outputs),
            Cbor::Map(vec![]),
        ]))
    }

    fn shelley_body(&self) -> Cbor {
        let inputs = self
            .inputs
            .iter()
            .map(|input| {
                Cbor::Array(vec![
                    Cbor::bytes(input.tx_hash.to_vec()),
                    Cbor::Unsigned(input.index as u64),
                ])
            })
            .collect();

        // both eras travel as plain bytes in Shelley outputs
        let outputs = self
            .outputs
            .iter()
            .map(|output| {
                Cbor::Array(vec![
                    Cbor::bytes(output.address.bytes.clone()),
                    Cbor::Unsigned(output.amount),
                ])
            })
            .collect();

        Cbor::int_map(vec![
            (0, Cbor::Array(inputs)),
            (1, Cbor::Array(outputs)),
            (2, Cbor::Unsigned(self.fee)),
            (3, Cbor::Unsigned(self.ttl)),
        ])
    }

    pub fn body_bytes(&self) -> LedgerResult<Vec<u8>> {
        Ok(self.body()?.encode())
    }

    /// Blake2b-256 of the body, which is also the transaction id
    pub fn body_hash(&self) -> LedgerResult<[u8; 32]> {
        Ok(blake2b_256(&self.body_bytes()?))
    }
}

/// `0x01 ‖ cbor(protocol_magic) ‖ cbor(bytes(body_hash))`
pub fn byron_signing_data(protocol_magic: u32, body_hash: &[u8; 32]) -> Vec<u8> {
    let mut data = vec![BYRON_SIG_TAG];
    Cbor::Unsigned(protocol_magic as u64).encode_into(&mut data);
    Cbor::bytes(body_hash.to_vec()).encode_into(&mut data);
    data
}

pub fn cardano_preimage(tx: &UnsignedCardanoTransaction) -> LedgerResult<SigningPreimage> {
    if tx.inputs.is_empty() {
        return Err(LedgerError::no_spendable_outputs("transaction has no inputs"));
    }

    let body = tx.body_bytes()?;
    let hash = blake2b_256(&body);
    let payload = match tx.format {
        CardanoTxFormat::Byron => byron_signing_data(tx.protocol_magic, &hash),
        CardanoTxFormat::Shelley => hash.to_vec(),
    };

    Ok(SigningPreimage::new(body, payload, SigningAlgorithm::Ed25519).with_description(format!(
        "{:?} body: {} inputs, {} outputs, fee {} lovelace",
        tx.format,
        tx.inputs.len(),
        tx.outputs.len(),
        tx.fee
    )))
}
