//! Transaction drafts, validation, and canonical encoding.
//!
//! Provides the editable [`TransactionDraft`] model with named presets, the
//! validation engine that gates signing, the canonical wire format, and the
//! encoder/decoder pair that converts between drafts and signable bytes.

pub mod decode;
pub mod draft;
pub mod encode;
pub mod envelope;
pub mod params;
pub mod presets;
pub mod text;
pub mod validation;
pub mod wire;

pub use decode::{
    decode_transaction, draft_from_transaction, DecodeError, DecodeOptions, DecodedTransaction,
};
pub use draft::{OnComplete, TransactionDraft, TxFields, TxKind};
pub use encode::{encode_draft, encode_draft_json, EncodeError, EncodedTransaction};
pub use envelope::{
    sign_transaction, EnvelopeError, SignedEnvelope, SignerError, TransactionSigner,
};
pub use params::NetworkParams;
pub use presets::{DraftSeed, Preset, UnknownPreset};
pub use validation::{
    validate, ConditionalGroup, ConditionalGroupError, Field, SubmitGate, ValidationContext,
    ValidationError, ValidationResult,
};
pub use wire::{SignedTransaction, Transaction, WireError};
