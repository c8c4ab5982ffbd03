//! Build Session
//!
//! Drives one builder through
//! `Idle → PreimageBuilt → AwaitingSignature → Assembling → Signed | Failed`.
//! The external signer is the only await point. `Failed` is terminal.

use super::{PreparedTransaction, TransactionBuilder};
use crate::error::{LedgerError, LedgerResult};
use crate::signing::preimage::{RawSignature, SigningPreimage};
use crate::types::{SignedTransaction, TransactionIntent};
use crate::{log_debug, log_info, log_warn};
use serde::{Deserialize, Serialize};
use std::future::Future;

const MODULE: &str = "tx::session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Idle,
    PreimageBuilt,
    AwaitingSignature,
    Assembling,
    Signed,
    Failed,
}

/// Device or service holding the private key
pub trait ExternalSigner {
    /// Sign `preimage.payload`; S need not be low
    fn sign(
        &self,
        preimage: &SigningPreimage,
    ) -> impl Future<Output = LedgerResult<RawSignature>> + Send;
}

/// Signer replaying signatures collected out of band, in preimage order
#[derive(Debug, Clone)]
pub struct PresignedSigner {
    signatures: Vec<RawSignature>,
}

impl PresignedSigner {
    pub fn new(signatures: Vec<RawSignature>) -> Self {
        Self { signatures }
    }
}

impl ExternalSigner for PresignedSigner {
    fn sign(
        &self,
        preimage: &SigningPreimage,
    ) -> impl Future<Output = LedgerResult<RawSignature>> + Send {
        let index = preimage.input_index.unwrap_or(0);
        let result = self.signatures.get(index).copied().ok_or_else(|| {
            LedgerError::verification_failed(format!("no signature supplied for preimage {}", index))
        });
        async move { result }
    }
}

pub struct BuildSession<B> {
    builder: B,
    state: BuildState,
    prepared: Option<PreparedTransaction>,
    signatures: Vec<RawSignature>,
    error: Option<LedgerError>,
}

impl<B: TransactionBuilder> BuildSession<B> {
    pub fn new(builder: B) -> Self {
        Self {
            builder,
            state: BuildState::Idle,
            prepared: None,
            signatures: Vec::new(),
            error: None,
        }
    }

    /// Continue from a transaction prepared earlier, e.g. in another process
    pub fn resume(builder: B, prepared: PreparedTransaction) -> Self {
        Self {
            builder,
            state: BuildState::PreimageBuilt,
            prepared: Some(prepared),
            signatures: Vec::new(),
            error: None,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn prepared(&self) -> Option<&PreparedTransaction> {
        self.prepared.as_ref()
    }

    /// The error that moved the session to `Failed`
    pub fn error(&self) -> Option<&LedgerError> {
        self.error.as_ref()
    }

    fn expect_state(&self, expected: BuildState) -> LedgerResult<()> {
        if self.state == expected {
            return Ok(());
        }
        Err(LedgerError::invalid_state(format!(
            "session is {:?}, expected {:?}",
            self.state, expected
        )))
    }

    fn fail(&mut self, error: LedgerError) -> LedgerError {
        log_warn!(MODULE, "build failed", state = format!("{:?}", self.state), reason = error);
        self.state = BuildState::Failed;
        self.prepared = None;
        self.signatures.clear();
        self.error = Some(error.clone());
        error
    }

    fn transition(&mut self, next: BuildState) {
        log_debug!(
            MODULE,
            "state change",
            from = format!("{:?}", self.state),
            next = format!("{:?}", next)
        );
        self.state = next;
    }

    pub fn prepare(&mut self, intent: &TransactionIntent) -> LedgerResult<&PreparedTransaction> {
        self.expect_state(BuildState::Idle)?;
        match self.builder.build_preimage(intent) {
            Ok(prepared) => {
                self.prepared = Some(prepared);
                self.transition(BuildState::PreimageBuilt);
                self.prepared
                    .as_ref()
                    .ok_or_else(|| LedgerError::invalid_state("prepared transaction missing"))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Ask `signer` for one signature per preimage
    pub async fn collect_signatures<S: ExternalSigner>(&mut self, signer: &S) -> LedgerResult<()> {
        self.expect_state(BuildState::PreimageBuilt)?;
        let Some(preimages) = self.prepared.as_ref().map(|p| p.preimages.clone()) else {
            return Err(self.fail(LedgerError::invalid_state("nothing to sign")));
        };
        self.transition(BuildState::AwaitingSignature);

        let mut signatures = Vec::with_capacity(preimages.len());
        for preimage in &preimages {
            match signer.sign(preimage).await {
                Ok(signature) => signatures.push(signature),
                Err(e) => return Err(self.fail(e)),
            }
        }
        self.signatures = signatures;
        Ok(())
    }

    /// Verify the collected signatures and assemble the final transaction
    pub fn complete(&mut self) -> LedgerResult<SignedTransaction> {
        self.expect_state(BuildState::AwaitingSignature)?;
        self.transition(BuildState::Assembling);

        let result = match &self.prepared {
            Some(prepared) => self.builder.assemble(prepared, &self.signatures),
            None => Err(LedgerError::invalid_state("nothing to assemble")),
        };
        match result {
            Ok(signed) => {
                self.transition(BuildState::Signed);
                log_info!(
                    MODULE,
                    "signed transaction ready",
                    txid = signed.tx_id.clone().unwrap_or_default(),
                    size = signed.raw.len()
                );
                Ok(signed)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Whole flow: build, sign, assemble
    pub async fn run<S: ExternalSigner>(
        &mut self,
        intent: &TransactionIntent,
        signer: &S,
    ) -> LedgerResult<SignedTransaction> {
        self.prepare(intent)?;
        self.collect_signatures(signer).await?;
        self.complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::tx::EvmBuilder;
    use crate::types::{Chain, FeeParameters};
    use crate::utils::network_config::NetworkConfig;
    use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

    struct KeySigner {
        secret: SecretKey,
        flip_s: bool,
    }

    impl ExternalSigner for KeySigner {
        fn sign(
            &self,
            preimage: &SigningPreimage,
        ) -> impl Future<Output = LedgerResult<RawSignature>> + Send {
            let result = preimage.digest().map(|digest| {
                let sig = Secp256k1::new()
                    .sign_ecdsa(&Message::from_digest(digest), &self.secret)
                    .serialize_compact();
                RawSignature::new(if self.flip_s { high_s(sig) } else { sig })
            });
            async move {
                tokio::task::yield_now().await;
                result
            }
        }
    }

    /// n - s, turning a low-S signature into its high-S twin
    fn high_s(compact: [u8; 64]) -> [u8; 64] {
        const N: [u8; 32] = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c,
            0xd0, 0x36, 0x41, 0x41,
        ];
        let mut out = compact;
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let diff = N[i] as i16 - compact[32 + i] as i16 - borrow;
            borrow = i16::from(diff < 0);
            out[32 + i] = (diff + 256 * borrow) as u8;
        }
        out
    }

    struct RefusingSigner;

    impl ExternalSigner for RefusingSigner {
        fn sign(
            &self,
            _preimage: &SigningPreimage,
        ) -> impl Future<Output = LedgerResult<RawSignature>> + Send {
            async { Err(LedgerError::invalid_input("user rejected the request")) }
        }
    }

    fn secret() -> SecretKey {
        SecretKey::from_slice(&[0x42; 32]).unwrap()
    }

    fn session() -> BuildSession<EvmBuilder> {
        let pk = PublicKey::from_secret_key(&Secp256k1::new(), &secret());
        let builder = EvmBuilder::new(Chain::Polygon, &NetworkConfig::new(), &pk.serialize()).unwrap();
        BuildSession::new(builder)
    }

    fn intent() -> TransactionIntent {
        TransactionIntent::new(
            "0x90e4d59c8583e37426b37d1d7394b6008a987c67",
            1_000_000_000_000_000_000,
            FeeParameters::Eip1559 {
                gas_limit: 21_000,
                max_fee: 4_478_253_867_089,
                priority_fee: 31_900_000_000,
            },
        )
        .with_nonce(196)
    }

    #[tokio::test]
    async fn test_run_reaches_signed() {
        let mut session = session();
        let signer = KeySigner {
            secret: secret(),
            flip_s: false,
        };
        let signed = session.run(&intent(), &signer).await.unwrap();
        assert_eq!(session.state(), BuildState::Signed);
        assert_eq!(signed.raw[0], 0x02);
    }

    #[tokio::test]
    async fn test_high_s_signature_is_normalized() {
        let mut low = session();
        let low_tx = low
            .run(&intent(), &KeySigner { secret: secret(), flip_s: false })
            .await
            .unwrap();
        let mut high = session();
        let high_tx = high
            .run(&intent(), &KeySigner { secret: secret(), flip_s: true })
            .await
            .unwrap();
        assert_eq!(low_tx, high_tx);
    }

    #[tokio::test]
    async fn test_signer_refusal_is_terminal() {
        let mut session = session();
        let err = session.run(&intent(), &RefusingSigner).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(session.state(), BuildState::Failed);
        assert!(session.prepared().is_none());
        assert_eq!(session.error(), Some(&err));

        let retry = session.prepare(&intent()).unwrap_err();
        assert_eq!(retry.code, ErrorCode::InvalidState);
    }

    #[tokio::test]
    async fn test_build_error_fails_session() {
        let mut session = session();
        let mut bad = intent();
        bad.destination = "0x1234".to_string();
        let err = session.run(&bad, &RefusingSigner).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAddress);
        assert_eq!(session.state(), BuildState::Failed);
    }

    #[tokio::test]
    async fn test_resume_with_presigned_signatures() {
        let mut first = session();
        let prepared = first.prepare(&intent()).unwrap().clone();
        assert_eq!(first.state(), BuildState::PreimageBuilt);

        let digest = prepared.preimages[0].digest().unwrap();
        let sig = Secp256k1::new()
            .sign_ecdsa(&Message::from_digest(digest), &secret())
            .serialize_compact();

        let pk = PublicKey::from_secret_key(&Secp256k1::new(), &secret());
        let builder = EvmBuilder::new(Chain::Polygon, &NetworkConfig::new(), &pk.serialize()).unwrap();
        let mut resumed = BuildSession::resume(builder, prepared);
        resumed
            .collect_signatures(&PresignedSigner::new(vec![RawSignature::new(sig)]))
            .await
            .unwrap();
        assert_eq!(resumed.state(), BuildState::AwaitingSignature);
        resumed.complete().unwrap();
        assert_eq!(resumed.state(), BuildState::Signed);
    }

    #[test]
    fn test_complete_out_of_order() {
        let mut session = session();
        assert_eq!(session.complete().unwrap_err().code, ErrorCode::InvalidState);
        assert_eq!(session.state(), BuildState::Idle);
    }
}
