//! Bitcoin-Family Pre-Image Hashing
//!
//! Per-input sighash preimages: legacy (pre-SegWit), BIP-143 (SegWit v0)
//! and the BIP-143 layout with SIGHASH_FORKID used by Bitcoin Cash.

use super::{SigningAlgorithm, SigningPreimage};
use crate::encoding::varint::{write_var_bytes, write_var_int};
use crate::error::{LedgerError, LedgerResult};
use crate::utils::crypto::sha256d;
use serde::{Deserialize, Serialize};

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_FORKID: u32 = 0x40;

/// How an input is spent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendKind {
    P2pkh,
    P2wpkh,
    P2shP2wpkh,
}

impl SpendKind {
    pub fn is_segwit(&self) -> bool {
        matches!(self, SpendKind::P2wpkh | SpendKind::P2shP2wpkh)
    }
}

/// Which sighash algorithm a transaction uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SighashScheme {
    /// Legacy for P2PKH, BIP-143 for SegWit inputs
    Standard,
    /// BIP-143 layout for every input, sighash type ALL|FORKID
    ForkId,
}

/// Transaction input for sighash calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoTxInput {
    /// Previous transaction hash in display order
    #[serde(with = "crate::serde_bytes::hex32")]
    pub prev_hash: [u8; 32],
    pub vout: u32,
    /// Value in satoshis (required for SegWit)
    pub value: u64,
    pub sequence: u32,
    /// Locking script of the spent output
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub locking_script: Vec<u8>,
    /// Script code for signing (locking script, or P2PKH template for SegWit)
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub script_code: Vec<u8>,
    pub spend: SpendKind,
}

impl UtxoTxInput {
    /// Outpoint in wire order (reversed hash, LE index)
    pub fn write_outpoint(&self, buf: &mut Vec<u8>) {
        let mut txid = self.prev_hash;
        txid.reverse();
        buf.extend_from_slice(&txid);
        buf.extend_from_slice(&self.vout.to_le_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoTxOutput {
    pub value: u64,
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub script_pubkey: Vec<u8>,
}

impl UtxoTxOutput {
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_var_bytes(&self.script_pubkey, buf);
    }
}

/// Unsigned Bitcoin-family transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedUtxoTransaction {
    pub version: u32,
    pub inputs: Vec<UtxoTxInput>,
    pub outputs: Vec<UtxoTxOutput>,
    pub locktime: u32,
    pub scheme: SighashScheme,
}

impl UnsignedUtxoTransaction {
    /// The 4-byte sighash type appended to every preimage
    pub fn sighash_type(&self) -> u32 {
        match self.scheme {
            SighashScheme::Standard => SIGHASH_ALL,
            SighashScheme::ForkId => SIGHASH_ALL | SIGHASH_FORKID,
        }
    }
}

/// Build one signing preimage per input
pub fn utxo_preimages(tx: &UnsignedUtxoTransaction) -> LedgerResult<Vec<SigningPreimage>> {
    let mut preimages = Vec::with_capacity(tx.inputs.len());

    for (index, input) in tx.inputs.iter().enumerate() {
        let preimage = match tx.scheme {
            SighashScheme::ForkId => bip143_preimage(tx, index)?,
            SighashScheme::Standard if input.spend.is_segwit() => bip143_preimage(tx, index)?,
            SighashScheme::Standard => legacy_preimage(tx, index)?,
        };
        let digest = sha256d(&preimage);

        preimages.push(
            SigningPreimage::new(preimage, digest.to_vec(), SigningAlgorithm::Secp256k1Ecdsa)
                .with_input_index(index)
                .with_description(format!(
                    "{:?} input {} ({} sats)",
                    input.spend, index, input.value
                )),
        );
    }

    Ok(preimages)
}

/// Legacy preimage: other inputs' scripts blanked, sighash type appended
pub fn legacy_preimage(tx: &UnsignedUtxoTransaction, input_index: usize) -> LedgerResult<Vec<u8>> {
    if input_index >= tx.inputs.len() {
        return Err(LedgerError::invalid_state(format!(
            "input index {} out of range",
            input_index
        )));
    }

    let mut serialized = Vec::new();
    serialized.extend_from_slice(&tx.version.to_le_bytes());

    write_var_int(tx.inputs.len() as u64, &mut serialized);
    for (i, input) in tx.inputs.iter().enumerate() {
        input.write_outpoint(&mut serialized);
        if i == input_index {
            write_var_bytes(&input.script_code, &mut serialized);
        } else {
            serialized.push(0x00);
        }
        serialized.extend_from_slice(&input.sequence.to_le_bytes());
    }

    write_var_int(tx.outputs.len() as u64, &mut serialized);
    for output in &tx.outputs {
        output.write(&mut serialized);
    }

    serialized.extend_from_slice(&tx.locktime.to_le_bytes());
    serialized.extend_from_slice(&tx.sighash_type().to_le_bytes());
    Ok(serialized)
}

/// BIP-143 preimage (also the FORKID layout)
pub fn bip143_preimage(tx: &UnsignedUtxoTransaction, input_index: usize) -> LedgerResult<Vec<u8>> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        LedgerError::invalid_state(format!("input index {} out of range", input_index))
    })?;

    let mut serialized = Vec::new();

    // 1. Version
    serialized.extend_from_slice(&tx.version.to_le_bytes());

    // 2. hashPrevouts
    let mut prevouts = Vec::new();
    for inp in &tx.inputs {
        inp.write_outpoint(&mut prevouts);
    }
    serialized.extend_from_slice(&sha256d(&prevouts));

    // 3. hashSequence
    let mut sequences = Vec::new();
    for inp in &tx.inputs {
        sequences.extend_from_slice(&inp.sequence.to_le_bytes());
    }
    serialized.extend_from_slice(&sha256d(&sequences));

    // 4. outpoint
    input.write_outpoint(&mut serialized);

    // 5. scriptCode
    write_var_bytes(&input.script_code, &mut serialized);

    // 6. value
    serialized.extend_from_slice(&input.value.to_le_bytes());

    // 7. nSequence
    serialized.extend_from_slice(&input.sequence.to_le_bytes());

    // 8. hashOutputs
    let mut outputs = Vec::new();
    for out in &tx.outputs {
        out.write(&mut outputs);
    }
    serialized.extend_from_slice(&sha256d(&outputs));

    // 9. nLocktime
    serialized.extend_from_slice(&tx.locktime.to_le_bytes());

    // 10. sighash type
    serialized.extend_from_slice(&tx.sighash_type().to_le_bytes());

    Ok(serialized)
}
