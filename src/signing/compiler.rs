//! Transaction Compiler
//!
//! Compiles verified signatures back into complete, broadcast-ready
//! transactions. Every function here re-runs the same encoder that
//! produced the signing preimage, so the signed bytes commit to exactly
//! what the signer saw.

use crate::bitcoin_wallet::WalletKey;
use crate::encoding::cbor::Cbor;
use crate::encoding::rlp;
use crate::encoding::varint::{push_data, write_var_bytes, write_var_int};
use crate::error::{LedgerError, LedgerResult};
use crate::signing::normalizer::NormalizedSignature;
use crate::signing::preimage::{
    bitcoin::{SpendKind, UnsignedUtxoTransaction},
    cardano::UnsignedCardanoTransaction,
    ethereum::{UnsignedEvmTransaction, EIP1559_TX_TYPE},
    ripple::{transaction_id, UnsignedRipplePayment},
    stellar::UnsignedStellarTransaction,
    SigningAlgorithm,
};
use crate::utils::crypto::{hash160, keccak256, sha256d};
use crate::utils::network_config::CardanoTxFormat;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::utils::rlp::Rlp;
use serde::{Deserialize, Serialize};

/// Longest DER signature plus its sighash byte, used for size estimates
const DUMMY_SIGNATURE_LEN: usize = 73;

/// Compiled Bitcoin-family transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledUtxoTransaction {
    /// Raw transaction bytes (ready to broadcast)
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub raw_tx: Vec<u8>,
    /// Transaction ID in display order
    pub txid: String,
    /// Witness transaction ID, for SegWit spends
    pub wtxid: Option<String>,
    /// Virtual size in vbytes
    pub vsize: usize,
}

/// Compiled account-model transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledTransaction {
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub raw_tx: Vec<u8>,
    pub tx_id: String,
}

// =============================================================================
// Bitcoin family
// =============================================================================

struct InputUnlock {
    script_sig: Vec<u8>,
    witness: Vec<Vec<u8>>,
}

/// `legacy_key` is pushed by P2PKH scriptSigs as supplied; witnesses carry `witness_key`
fn unlock_input(
    spend: SpendKind,
    signature: &[u8],
    legacy_key: &[u8],
    witness_key: &[u8],
) -> InputUnlock {
    match spend {
        SpendKind::P2pkh => {
            let mut script_sig = Vec::new();
            push_data(signature, &mut script_sig);
            push_data(legacy_key, &mut script_sig);
            InputUnlock {
                script_sig,
                witness: vec![],
            }
        }
        SpendKind::P2wpkh => InputUnlock {
            script_sig: vec![],
            witness: vec![signature.to_vec(), witness_key.to_vec()],
        },
        SpendKind::P2shP2wpkh => {
            let mut redeem = vec![0x00, 0x14];
            redeem.extend_from_slice(&hash160(witness_key));
            let mut script_sig = Vec::new();
            push_data(&redeem, &mut script_sig);
            InputUnlock {
                script_sig,
                witness: vec![signature.to_vec(), witness_key.to_vec()],
            }
        }
    }
}

fn serialize_utxo(tx: &UnsignedUtxoTransaction, unlocks: &[InputUnlock], with_witness: bool) -> Vec<u8> {
    let mut raw = Vec::new();
    raw.extend_from_slice(&tx.version.to_le_bytes());

    // SegWit marker and flag
    if with_witness {
        raw.push(0x00);
        raw.push(0x01);
    }

    write_var_int(tx.inputs.len() as u64, &mut raw);
    for (input, unlock) in tx.inputs.iter().zip(unlocks) {
        input.write_outpoint(&mut raw);
        write_var_bytes(&unlock.script_sig, &mut raw);
        raw.extend_from_slice(&input.sequence.to_le_bytes());
    }

    write_var_int(tx.outputs.len() as u64, &mut raw);
    for output in &tx.outputs {
        output.write(&mut raw);
    }

    if with_witness {
        for unlock in unlocks {
            write_var_int(unlock.witness.len() as u64, &mut raw);
            for item in &unlock.witness {
                write_var_bytes(item, &mut raw);
            }
        }
    }

    raw.extend_from_slice(&tx.locktime.to_le_bytes());
    raw
}

fn display_hash(data: &[u8]) -> String {
    let mut hash = sha256d(data);
    hash.reverse();
    hex::encode(hash)
}

fn assemble_utxo(tx: &UnsignedUtxoTransaction, unlocks: &[InputUnlock]) -> CompiledUtxoTransaction {
    let has_witness = tx.inputs.iter().any(|i| i.spend.is_segwit());

    let stripped = serialize_utxo(tx, unlocks, false);
    let raw_tx = if has_witness {
        serialize_utxo(tx, unlocks, true)
    } else {
        stripped.clone()
    };

    let base_size = stripped.len();
    let total_size = raw_tx.len();
    let vsize = (base_size * 3 + total_size + 3) / 4;

    CompiledUtxoTransaction {
        txid: display_hash(&stripped),
        wtxid: has_witness.then(|| display_hash(&raw_tx)),
        raw_tx,
        vsize,
    }
}

/// Compile a Bitcoin-family transaction from one verified signature per input
pub fn compile_utxo_transaction(
    tx: &UnsignedUtxoTransaction,
    signatures: &[NormalizedSignature],
    key: &WalletKey,
) -> LedgerResult<CompiledUtxoTransaction> {
    if signatures.len() != tx.inputs.len() {
        return Err(LedgerError::verification_failed(format!(
            "expected {} signatures, got {}",
            tx.inputs.len(),
            signatures.len()
        )));
    }

    let legacy_key = key.serialize();
    let witness_key = key.public_key().serialize();
    let sighash_byte = (tx.sighash_type() & 0xff) as u8;

    let mut unlocks = Vec::with_capacity(tx.inputs.len());
    for (input, signature) in tx.inputs.iter().zip(signatures) {
        let mut sig = signature.to_der()?;
        sig.push(sighash_byte);
        unlocks.push(unlock_input(input.spend, &sig, &legacy_key, &witness_key));
    }

    Ok(assemble_utxo(tx, &unlocks))
}

/// Virtual size of `tx` once signed by `key`, using worst-case signature lengths
pub fn estimate_utxo_vsize(tx: &UnsignedUtxoTransaction, key: &WalletKey) -> usize {
    let dummy_sig = [0u8; DUMMY_SIGNATURE_LEN];
    let legacy_key = key.serialize();
    let witness_key = key.public_key().serialize();
    let unlocks: Vec<InputUnlock> = tx
        .inputs
        .iter()
        .map(|input| unlock_input(input.spend, &dummy_sig, &legacy_key, &witness_key))
        .collect();
    assemble_utxo(tx, &unlocks).vsize
}

// =============================================================================
// Ethereum family
// =============================================================================

/// Compile a signed Ethereum transaction; the signature must carry its recovery id
pub fn compile_evm_transaction(
    tx: &UnsignedEvmTransaction,
    signature: &NormalizedSignature,
) -> LedgerResult<CompiledTransaction> {
    let recovery_id = signature
        .recovery_id()
        .ok_or_else(|| LedgerError::invalid_state("Ethereum signatures need a recovery id"))?;

    let mut items = tx.rlp_fields();
    let raw_tx = if tx.is_eip1559() {
        items.push(rlp::encode_u64(recovery_id as u64));
        items.push(rlp::encode_uint_bytes(signature.r()));
        items.push(rlp::encode_uint_bytes(signature.s()));
        let mut typed = vec![EIP1559_TX_TYPE];
        typed.extend_from_slice(&rlp::encode_list(&items));
        typed
    } else {
        // EIP-155
        let v = tx
            .chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + recovery_id as u64))
            .ok_or_else(|| LedgerError::encoding("chain id too large for EIP-155"))?;
        items.push(rlp::encode_u64(v));
        items.push(rlp::encode_uint_bytes(signature.r()));
        items.push(rlp::encode_uint_bytes(signature.s()));
        rlp::encode_list(&items)
    };

    let tx_hash = keccak256(&raw_tx);
    Ok(CompiledTransaction {
        raw_tx,
        tx_id: format!("0x{}", hex::encode(tx_hash)),
    })
}

/// Recover the sender of a signed Ethereum transaction
pub fn recover_evm_sender(raw_tx: &[u8]) -> LedgerResult<[u8; 20]> {
    let (tx, signature) = TypedTransaction::decode_signed(&Rlp::new(raw_tx))
        .map_err(|e| LedgerError::encoding(format!("not a signed transaction: {}", e)))?;
    let sender = signature
        .recover(tx.sighash())
        .map_err(|e| LedgerError::verification_failed(format!("sender recovery failed: {}", e)))?;
    Ok(sender.0)
}

// =============================================================================
// Ripple
// =============================================================================

/// Signed blob with TxnSignature (DER for secp256k1, raw for ed25519)
pub fn compile_ripple_transaction(
    tx: &UnsignedRipplePayment,
    signature: &NormalizedSignature,
) -> LedgerResult<CompiledTransaction> {
    let txn_signature = match signature.algorithm() {
        SigningAlgorithm::Secp256k1Ecdsa => signature.to_der()?,
        SigningAlgorithm::Ed25519 => signature.bytes().to_vec(),
    };

    let raw_tx = tx.serialize(Some(&txn_signature))?;
    let tx_id = hex::encode_upper(transaction_id(&raw_tx));
    Ok(CompiledTransaction { raw_tx, tx_id })
}

// =============================================================================
// Stellar
// =============================================================================

pub fn compile_stellar_transaction(
    tx: &UnsignedStellarTransaction,
    signature: &NormalizedSignature,
) -> LedgerResult<CompiledTransaction> {
    let raw_tx = tx.envelope(&tx.source.key, signature.bytes())?;
    Ok(CompiledTransaction {
        raw_tx,
        tx_id: hex::encode(tx.hash()?),
    })
}

// =============================================================================
// Cardano
// =============================================================================

/// Key that produced a Cardano signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardanoWitnessKey {
    pub public_key: [u8; 32],
    /// Present for Byron (bootstrap) wallets
    pub chain_code: Option<[u8; 32]>,
}

impl CardanoWitnessKey {
    fn xpub(&self) -> Vec<u8> {
        let mut xpub = self.public_key.to_vec();
        xpub.extend_from_slice(&self.chain_code.unwrap_or([0u8; 32]));
        xpub
    }
}

pub fn compile_cardano_transaction(
    tx: &UnsignedCardanoTransaction,
    signature: &NormalizedSignature,
    key: &CardanoWitnessKey,
) -> LedgerResult<CompiledTransaction> {
    let body = tx.body_bytes()?;
    let sig = Cbor::bytes(signature.bytes().to_vec());

    let signed = match tx.format {
        CardanoTxFormat::Byron => {
            let witness_data = Cbor::Array(vec![Cbor::bytes(key.xpub()), sig]);
            // one witness per input, all from the same key
            let witnesses = tx
                .inputs
                .iter()
                .map(|_| Cbor::Array(vec![Cbor::Unsigned(0), Cbor::embedded(&witness_data)]))
                .collect();
            Cbor::Array(vec![Cbor::Raw(body.clone()), Cbor::Array(witnesses)])
        }
        CardanoTxFormat::Shelley => {
            let pk = Cbor::bytes(key.public_key.to_vec());
            let witness_set = match key.chain_code {
                None => Cbor::int_map(vec![(0, Cbor::Array(vec![Cbor::Array(vec![pk, sig])]))]),
                Some(chain_code) => {
                    let attributes = Cbor::bytes(Cbor::Map(vec![]).encode());
                    Cbor::int_map(vec![(
                        2,
                        Cbor::Array(vec![Cbor::Array(vec![
                            pk,
                            sig,
                            Cbor::bytes(chain_code.to_vec()),
                            attributes,
                        ])]),
                    )])
                }
            };
            Cbor::Array(vec![Cbor::Raw(body.clone()), witness_set, Cbor::Null])
        }
    };

    Ok(CompiledTransaction {
        raw_tx: signed.encode(),
        tx_id: hex::encode(crate::utils::crypto::blake2b_256(&body)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::normalizer::{normalize_ecdsa, normalize_ecdsa_recoverable, verify_ed25519};
    use crate::signing::preimage::bitcoin::{utxo_preimages, SighashScheme, UtxoTxInput, UtxoTxOutput};
    use crate::signing::preimage::ethereum::{evm_preimage, EvmFee};
    use crate::signing::preimage::RawSignature;
    use secp256k1::PublicKey;

    fn pk(hex_str: &str) -> PublicKey {
        PublicKey::from_slice(&hex::decode(hex_str).unwrap()).unwrap()
    }

    fn segwit_tx() -> UnsignedUtxoTransaction {
        let input = |prev: &str, vout: u32, value: u64| {
            let mut hash: [u8; 32] = hex::decode(prev).unwrap().try_into().unwrap();
            hash.reverse();
            UtxoTxInput {
                prev_hash: hash,
                vout,
                value,
                sequence: 0xffff_fffa,
                locking_script: hex::decode("0014309a0c6efa0da7966d5c42dc5a928f6baf0e47ef").unwrap(),
                script_code: hex::decode("76a914309a0c6efa0da7966d5c42dc5a928f6baf0e47ef88ac")
                    .unwrap(),
                spend: SpendKind::P2wpkh,
            }
        };
        UnsignedUtxoTransaction {
            version: 1,
            inputs: vec![
                input("df05ddaf1b9e0d7a36672da32986499f5ec8b3946429d16e1cd6736cf4a3fecf", 1, 12_210_000),
                input("ef0788c82e89047d926062a41c8500c4fe896069e95c37251d6b8ceed67a908b", 0, 39_920_000),
            ],
            outputs: vec![
                UtxoTxOutput {
                    value: 40_000_000,
                    script_pubkey: hex::decode(
                        "0020d79bb4e313e9a85557d685d363601a00e9176dc04f6b051f1c0d97257769a4b9",
                    )
                    .unwrap(),
                },
                UtxoTxOutput {
                    value: 12_125_359,
                    script_pubkey: hex::decode("0014309a0c6efa0da7966d5c42dc5a928f6baf0e47ef").unwrap(),
                },
            ],
            locktime: 0,
            scheme: SighashScheme::Standard,
        }
    }

    #[test]
    fn test_compile_segwit_vector() {
        let tx = segwit_tx();
        let key = pk("036DB397495FA03FE263EE4021B77C49496E5C7DB8266E6E33A03D5B3A370C3D6D");
        let raw_sigs = [
            "00325BF907137BB6ED0A84D78C12F9680DD57AE374F45D43CDC7068ABF56F5B93C08BC1F9CD1E91E7A496DA2ECD54597B11AE0DDA4F6672235853C0CEF6BF8B4",
            "ED59AEECB1AC0BAF31B6D84BB51C060DBBC3E0321EEEE6FADEBF073099629A9A7247306451FD78488B1AAE38391DA6CAA72B52D2E6D9359F9C682EFCBF388B07",
        ];
        let preimages = utxo_preimages(&tx).unwrap();
        let signatures: Vec<NormalizedSignature> = preimages
            .iter()
            .zip(raw_sigs)
            .map(|(p, s)| {
                normalize_ecdsa(&RawSignature::from_hex(s).unwrap(), &p.digest().unwrap(), &key)
                    .unwrap()
            })
            .collect();

        let compiled = compile_utxo_transaction(&tx, &signatures, &WalletKey::from(key)).unwrap();
        assert_eq!(
            hex::encode_upper(&compiled.raw_tx),
            "01000000000102DF05DDAF1B9E0D7A36672DA32986499F5EC8B3946429D16E1CD6736CF4A3FECF0100000000FAFFFFFFEF0788C82E89047D926062A41C8500C4FE896069E95C37251D6B8CEED67A908B0000000000FAFFFFFF02005A620200000000220020D79BB4E313E9A85557D685D363601A00E9176DC04F6B051F1C0D97257769A4B9AF04B90000000000160014309A0C6EFA0DA7966D5C42DC5A928F6BAF0E47EF02463043021F325BF907137BB6ED0A84D78C12F9680DD57AE374F45D43CDC7068ABF56F5B902203C08BC1F9CD1E91E7A496DA2ECD54597B11AE0DDA4F6672235853C0CEF6BF8B40121036DB397495FA03FE263EE4021B77C49496E5C7DB8266E6E33A03D5B3A370C3D6D02483045022100ED59AEECB1AC0BAF31B6D84BB51C060DBBC3E0321EEEE6FADEBF073099629A9A02207247306451FD78488B1AAE38391DA6CAA72B52D2E6D9359F9C682EFCBF388B070121036DB397495FA03FE263EE4021B77C49496E5C7DB8266E6E33A03D5B3A370C3D6D00000000"
        );
        assert!(compiled.wtxid.is_some());
        assert!(compiled.vsize < compiled.raw_tx.len());

        // the independent parser agrees on the txid
        let parsed: bitcoin::Transaction =
            bitcoin::consensus::deserialize(&compiled.raw_tx).unwrap();
        assert_eq!(parsed.compute_txid().to_string(), compiled.txid);
        assert_eq!(parsed.output[0].value.to_sat(), 40_000_000);
    }

    #[test]
    fn test_signature_count_mismatch() {
        let tx = segwit_tx();
        let key = pk("036DB397495FA03FE263EE4021B77C49496E5C7DB8266E6E33A03D5B3A370C3D6D");
        assert!(compile_utxo_transaction(&tx, &[], &WalletKey::from(key)).is_err());
    }

    #[test]
    fn test_estimate_covers_real_size() {
        let tx = segwit_tx();
        let key = pk("036DB397495FA03FE263EE4021B77C49496E5C7DB8266E6E33A03D5B3A370C3D6D");
        // the signed vector is 220 vbytes
        let estimate = estimate_utxo_vsize(&tx, &key.into());
        assert_eq!(estimate, 221);

        let mut legacy = tx.clone();
        for input in &mut legacy.inputs {
            input.spend = SpendKind::P2pkh;
        }
        let compressed = estimate_utxo_vsize(&legacy, &key.into());
        assert!(compressed > estimate);

        // a 65-byte key costs 32 more bytes per P2PKH input
        let uncompressed = WalletKey::parse(&key.serialize_uncompressed()).unwrap();
        assert_eq!(estimate_utxo_vsize(&legacy, &uncompressed), compressed + 64);
        // witnesses always carry the compressed key
        assert_eq!(estimate_utxo_vsize(&tx, &uncompressed), estimate);
    }

    #[test]
    fn test_compile_legacy_evm_vector() {
        let tx = UnsignedEvmTransaction {
            chain_id: 1,
            nonce: 15,
            gas_limit: 21000,
            fee: EvmFee::Legacy {
                gas_price: 476_190_476_190,
            },
            to: hex::decode("7655b9b19ffab8b897f836857dae22a1e7f8d735").unwrap(),
            value: 100_000_000_000_000_000,
            data: vec![],
        };
        let key = pk("04EB30400CE9D1DEED12B84D4161A1FA922EF4185A155EF3EC208078B3807B126FA22C335081AAEBF161095C11C7D8BD550EF8882A3125B0EE9AE96DDDE1AE743F");
        let digest = evm_preimage(&tx).digest().unwrap();
        let sig = normalize_ecdsa_recoverable(
            &RawSignature::from_hex("B945398FB90158761F6D61789B594D042F0F490F9656FBFFAE8F18B49D5F30054F43EE43CCAB2703F0E2E4E61D99CF3D4A875CD759569787CF0AED02415434C6").unwrap(),
            &digest,
            &key,
        )
        .unwrap();
        assert_eq!(sig.recovery_id(), Some(0));

        let compiled = compile_evm_transaction(&tx, &sig).unwrap();
        assert_eq!(
            hex::encode_upper(&compiled.raw_tx),
            "F86C0F856EDF2A079E825208947655B9B19FFAB8B897F836857DAE22A1E7F8D73588016345785D8A00008025A0B945398FB90158761F6D61789B594D042F0F490F9656FBFFAE8F18B49D5F3005A04F43EE43CCAB2703F0E2E4E61D99CF3D4A875CD759569787CF0AED02415434C6"
        );
        assert_eq!(
            hex::encode(recover_evm_sender(&compiled.raw_tx).unwrap()),
            "b1123eff798183b7cb32f62607d3d39e950d9cc3"
        );
    }

    #[test]
    fn test_evm_requires_recovery_id() {
        let key = pk("04EB30400CE9D1DEED12B84D4161A1FA922EF4185A155EF3EC208078B3807B126FA22C335081AAEBF161095C11C7D8BD550EF8882A3125B0EE9AE96DDDE1AE743F");
        let digest: [u8; 32] = hex::decode("BDBECF64B443F82D1F9FDA3F2D6BA69AF6D82029B8271339B7E775613AE57761")
            .unwrap()
            .try_into()
            .unwrap();
        let sig = normalize_ecdsa(
            &RawSignature::from_hex("B945398FB90158761F6D61789B594D042F0F490F9656FBFFAE8F18B49D5F30054F43EE43CCAB2703F0E2E4E61D99CF3D4A875CD759569787CF0AED02415434C6").unwrap(),
            &digest,
            &key,
        )
        .unwrap();
        let tx = UnsignedEvmTransaction {
            chain_id: 1,
            nonce: 0,
            gas_limit: 21000,
            fee: EvmFee::Legacy { gas_price: 1 },
            to: vec![0u8; 20],
            value: 0,
            data: vec![],
        };
        assert!(compile_evm_transaction(&tx, &sig).is_err());
    }

    #[test]
    fn test_compile_shelley_vector() {
        use crate::cardano_wallet::decode_address;
        use crate::signing::preimage::cardano::{cardano_preimage, CardanoTxInput, CardanoTxOutput};

        let hash = |s: &str| -> [u8; 32] { hex::decode(s).unwrap().try_into().unwrap() };
        let tx = UnsignedCardanoTransaction {
            format: CardanoTxFormat::Shelley,
            inputs: vec![
                CardanoTxInput {
                    tx_hash: hash("1992f01dfd9a94d7a2896617a96b3deb5f007ca32e8860e7c1720714ae6a17e5"),
                    index: 0,
                },
                CardanoTxInput {
                    tx_hash: hash("2a14228eb7d7ac30ed019ec139f0120e4538fb3f6d52dd97c8d416468ef87c24"),
                    index: 0,
                },
            ],
            outputs: vec![
                CardanoTxOutput {
                    address: decode_address("addr1q90uh2eawrdc9vaemftgd50l28yrh9lqxtjjh4z6dnn0u7ggasexxdyyk9f05atygnjlccsjsggtc87hhqjna32fpv5qeq96ls").unwrap(),
                    amount: 1_800_000,
                },
                CardanoTxOutput {
                    address: decode_address("addr1vyn6tvyc3daxl8wwvm2glay287dfa7xjgdm2jdl308ksy9canqafn").unwrap(),
                    amount: 1_981_037,
                },
            ],
            fee: 168_963,
            ttl: 190_000_000,
            protocol_magic: 764_824_073,
        };
        let public_key = hash("de60f41ab5045ce1b9b37e386570ed63499a53ee93ca3073e54a80065678384d");
        let preimage = cardano_preimage(&tx).unwrap();
        let sig = verify_ed25519(
            &RawSignature::from_hex("d110d0ae92016c4edf0eefb2c54ad71b4e9b27f8427f6bd895e94f3beded57f839deecea4f50a3ff6730409b323fa2b07c1e1529e8ebbdebb5138b5ee2f4ab09").unwrap(),
            &preimage.payload,
            &public_key,
        )
        .unwrap();

        let compiled = compile_cardano_transaction(
            &tx,
            &sig,
            &CardanoWitnessKey {
                public_key,
                chain_code: None,
            },
        )
        .unwrap();
        assert_eq!(
            hex::encode(&compiled.raw_tx),
            "83a400828258201992f01dfd9a94d7a2896617a96b3deb5f007ca32e8860e7c1720714ae6a17e5008258202a14228eb7d7ac30ed019ec139f0120e4538fb3f6d52dd97c8d416468ef87c24000182825839015fcbab3d70db82b3b9da5686d1ff51c83b97e032e52bd45a6ce6fe7908ec32633484b152fa756444e5fc62128210bc1fd7b8253ec5490b281a001b774082581d6127a5b0988b7a6f9dce66d48ff48a3f9a9ef8d24376a937f179ed02171a001e3a6d021a00029403031a0b532b80a10081825820de60f41ab5045ce1b9b37e386570ed63499a53ee93ca3073e54a80065678384d5840d110d0ae92016c4edf0eefb2c54ad71b4e9b27f8427f6bd895e94f3beded57f839deecea4f50a3ff6730409b323fa2b07c1e1529e8ebbdebb5138b5ee2f4ab09f6"
        );
        assert_eq!(
            compiled.tx_id,
            "db2306d819d848f67f70ab898028d9827e5d1fccc7033531534fdd39e93a796e"
        );
    }
}
