//! Signed envelopes and the external signer seam.
//!
//! Keys never live here. A [`TransactionSigner`] is anything that can return
//! an ed25519 signature over the signing bytes; the envelope is assembled
//! from that signature.

use crate::wire::{SignedTransaction, Transaction, WireError};
use algotx_types::Address;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::future::Future;
use thiserror::Error;

/// Prefix of the persisted data-URL form.
pub const DATA_URL_PREFIX: &str = "data:application/octet-stream;base64,";

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("signer rejected the request: {0}")]
    Rejected(String),

    #[error("signer unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Wire(#[from] WireError),
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("not a base64 data URL")]
    NotDataUrl,

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("not a signed transaction")]
    Unsigned,

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Raw signed-transaction bytes plus the derived transaction id.
///
/// The bytes are kept exactly as received so resubmission sends them
/// unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub bytes: Vec<u8>,
    pub tx_id: String,
}

impl SignedEnvelope {
    /// Wrap existing signed bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, EnvelopeError> {
        let signed = SignedTransaction::from_msgpack(&bytes)?;
        if !signed.is_signed() {
            return Err(EnvelopeError::Unsigned);
        }
        let tx_id = signed.txn.id()?;
        Ok(Self { bytes, tx_id })
    }

    /// Assemble an envelope from a detached signature.
    ///
    /// `signer` is recorded as the authorizer only when it differs from the
    /// transaction sender (a rekeyed account).
    pub fn from_signature(
        txn: &Transaction,
        signature: [u8; 64],
        signer: Option<Address>,
    ) -> Result<Self, WireError> {
        let sgnr = signer.filter(|s| *s != txn.sender);
        let signed = SignedTransaction::new(txn.clone(), signature, sgnr);
        Ok(Self {
            bytes: signed.to_msgpack()?,
            tx_id: txn.id()?,
        })
    }

    pub fn decode(&self) -> Result<SignedTransaction, WireError> {
        SignedTransaction::from_msgpack(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(&self.bytes))
    }

    pub fn from_data_url(url: &str) -> Result<Self, EnvelopeError> {
        let payload = url
            .trim()
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or(EnvelopeError::NotDataUrl)?;
        Self::from_bytes(STANDARD.decode(payload)?)
    }
}

/// Something that can sign transaction bytes and report its address.
pub trait TransactionSigner {
    fn address(&self) -> Address;

    /// Sign `bytes_to_sign` (the `"TX"`-prefixed canonical encoding).
    fn sign(
        &self,
        bytes_to_sign: &[u8],
    ) -> impl Future<Output = Result<[u8; 64], SignerError>> + Send;
}

/// Sign `txn` with `signer` and assemble the envelope.
pub async fn sign_transaction<S: TransactionSigner>(
    signer: &S,
    txn: &Transaction,
) -> Result<SignedEnvelope, SignerError> {
    let bytes_to_sign = txn.bytes_to_sign()?;
    let signature = signer.sign(&bytes_to_sign).await?;
    let envelope = SignedEnvelope::from_signature(txn, signature, Some(signer.address()))?;
    log::info!("Signed transaction {}", envelope.tx_id);
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ByteArray;

    struct FixedSigner(Address);

    impl TransactionSigner for FixedSigner {
        fn address(&self) -> Address {
            self.0
        }

        async fn sign(&self, bytes_to_sign: &[u8]) -> Result<[u8; 64], SignerError> {
            assert!(bytes_to_sign.starts_with(b"TX"));
            Ok([0xAB; 64])
        }
    }

    fn txn() -> Transaction {
        Transaction {
            tx_type: "pay".into(),
            sender: Address([1; 32]),
            receiver: Some(Address([2; 32])),
            amount: 1,
            fee: 1_000,
            first_valid: 1,
            last_valid: 10,
            genesis_hash: ByteArray([7; 32]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sign_by_sender_omits_sgnr() {
        let env = sign_transaction(&FixedSigner(Address([1; 32])), &txn())
            .await
            .unwrap();
        let signed = env.decode().unwrap();
        assert!(signed.sgnr.is_none());
        assert_eq!(signed.sig, Some(ByteArray([0xAB; 64])));
        assert_eq!(env.tx_id, txn().id().unwrap());
    }

    #[tokio::test]
    async fn test_sign_by_rekeyed_authorizer_sets_sgnr() {
        let env = sign_transaction(&FixedSigner(Address([9; 32])), &txn())
            .await
            .unwrap();
        assert_eq!(env.decode().unwrap().sgnr, Some(Address([9; 32])));
    }

    #[test]
    fn test_data_url_roundtrip() {
        let env = SignedEnvelope::from_signature(&txn(), [1; 64], None).unwrap();
        let url = env.to_data_url();
        assert!(url.starts_with(DATA_URL_PREFIX));
        assert_eq!(SignedEnvelope::from_data_url(&url).unwrap(), env);
    }

    #[test]
    fn test_data_url_rejects_garbage() {
        assert!(matches!(
            SignedEnvelope::from_data_url("hello"),
            Err(EnvelopeError::NotDataUrl)
        ));
        let unsigned = format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(txn().to_msgpack().unwrap()));
        assert!(SignedEnvelope::from_data_url(&unsigned).is_err());
    }
}
