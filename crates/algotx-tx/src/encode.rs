//! Draft → canonical transaction.
//!
//! The encoder assumes validation already ran (or was bypassed). It still
//! rejects data that cannot be represented at all: a missing identifier the
//! kind needs, an unparseable address or amount, a lease that does not
//! resolve to 32 bytes.

use crate::draft::{
    ApplicationCallFields, AssetConfigFields, KeyRegistrationFields, TransactionDraft, TxFields,
    TxKind,
};
use crate::params::NetworkParams;
use crate::text::{self, TextError};
use crate::wire::{AssetParams, BoxRef, ByteArray, StateSchema, Transaction, WireError};
use algotx_types::constants::{NATIVE_DECIMALS, SIGNATURE_OVERHEAD};
use algotx_types::units::decimal_to_base_units_u64;
use algotx_types::{parse_address, Address, AddressError, AmountError};
use serde_bytes::ByteBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("unsupported transaction type: '{0}'")]
    UnsupportedKind(String),

    #[error("{kind:?} transaction is missing required field '{field}'")]
    MissingField { kind: TxKind, field: &'static str },

    #[error("invalid address in '{field}': {source}")]
    InvalidAddress {
        field: &'static str,
        source: AddressError,
    },

    #[error("invalid amount in '{field}': {source}")]
    InvalidAmount {
        field: &'static str,
        source: AmountError,
    },

    #[error("invalid bytes in '{field}': {source}")]
    InvalidBytes {
        field: &'static str,
        source: TextError,
    },

    #[error("lease does not resolve to 32 bytes: {0}")]
    InvalidLease(TextError),

    #[error("box reference to application {0} is not the called app or a foreign app")]
    InvalidBoxReference(u64),

    #[error("invalid draft: {0}")]
    InvalidDraft(#[from] serde_json::Error),

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// An encoded, unsigned transaction ready for an external signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTransaction {
    pub transaction: Transaction,
    /// Canonical msgpack of `transaction`.
    pub bytes: Vec<u8>,
    pub id: String,
    /// Whether the fee was entered manually rather than suggested.
    pub flat_fee: bool,
}

impl EncodedTransaction {
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>, WireError> {
        self.transaction.bytes_to_sign()
    }
}

// ─── Field helpers ──────────────────────────────────────────────────────────

fn required_address(
    kind: TxKind,
    field: &'static str,
    text: &str,
) -> Result<Address, EncodeError> {
    if text.trim().is_empty() {
        return Err(EncodeError::MissingField { kind, field });
    }
    parse_address(text).map_err(|source| EncodeError::InvalidAddress { field, source })
}

fn optional_address(field: &'static str, text: &str) -> Result<Option<Address>, EncodeError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_address(text)
        .map(Some)
        .map_err(|source| EncodeError::InvalidAddress { field, source })
}

fn required_id(kind: TxKind, field: &'static str, id: Option<u64>) -> Result<u64, EncodeError> {
    match id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(EncodeError::MissingField { kind, field }),
    }
}

fn native_amount(field: &'static str, value: &str) -> Result<u64, EncodeError> {
    decimal_to_base_units_u64(value, NATIVE_DECIMALS)
        .map_err(|source| EncodeError::InvalidAmount { field, source })
}

fn base64_field(field: &'static str, value: &str) -> Result<Vec<u8>, EncodeError> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    text::decode_base64(value).map_err(|source| EncodeError::InvalidBytes { field, source })
}

/// A fixed-size Base64 key; empty input is the zero key.
fn key_field<const N: usize>(field: &'static str, value: &str) -> Result<ByteArray<N>, EncodeError> {
    let bytes = base64_field(field, value)?;
    if bytes.is_empty() {
        return Ok(ByteArray::default());
    }
    let key: [u8; N] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| EncodeError::InvalidBytes {
            field,
            source: TextError::Length {
                expected: N,
                actual: bytes.len(),
            },
        })?;
    Ok(ByteArray(key))
}

fn schema(ints: Option<u64>, bytes: Option<u64>) -> Option<StateSchema> {
    let schema = StateSchema {
        num_uints: ints.unwrap_or(0),
        num_byte_slices: bytes.unwrap_or(0),
    };
    (!schema.is_empty()).then_some(schema)
}

// ─── Per-kind encoding ──────────────────────────────────────────────────────

fn encode_asset_config(tx: &mut Transaction, c: &AssetConfigFields) -> Result<(), EncodeError> {
    tx.config_asset = c.asset_id.unwrap_or(0);

    let metadata_hash = text::resolve_fixed_32(&c.metadata_hash, c.metadata_hash_base64)
        .map_err(|source| EncodeError::InvalidBytes {
            field: "metadata_hash",
            source,
        })?;

    let params = AssetParams {
        metadata_hash: metadata_hash.map(ByteArray).unwrap_or_default(),
        asset_name: c.asset_name.clone(),
        url: c.url.clone(),
        clawback: optional_address("clawback", &c.clawback)?,
        decimals: u64::from(c.decimals.unwrap_or(0)),
        default_frozen: c.default_frozen,
        freeze: optional_address("freeze", &c.freeze)?,
        manager: optional_address("manager", &c.manager)?,
        reserve: optional_address("reserve", &c.reserve)?,
        total: c.total.unwrap_or(0),
        unit_name: c.unit_name.clone(),
    };
    // Destroy carries no parameters at all.
    tx.asset_params = (!params.is_empty()).then_some(params);
    Ok(())
}

fn encode_key_registration(
    tx: &mut Transaction,
    k: &KeyRegistrationFields,
) -> Result<(), EncodeError> {
    tx.vote_key = key_field("vote_key", &k.vote_key)?;
    tx.selection_key = key_field("selection_key", &k.selection_key)?;
    tx.state_proof_key = key_field("state_proof_key", &k.state_proof_key)?;
    tx.vote_first = k.vote_first.unwrap_or(0);
    tx.vote_last = k.vote_last.unwrap_or(0);
    tx.vote_key_dilution = k.vote_key_dilution.unwrap_or(0);
    tx.non_participation = k.non_participation;
    Ok(())
}

fn encode_application_call(
    tx: &mut Transaction,
    app: &ApplicationCallFields,
) -> Result<(), EncodeError> {
    let app_id = app.app_id.unwrap_or(0);
    if app_id == 0 && app.on_complete.requires_existing_app() {
        return Err(EncodeError::MissingField {
            kind: TxKind::ApplicationCall,
            field: "app_id",
        });
    }
    tx.app_id = app_id;
    tx.on_completion = app.on_complete.as_u64();

    tx.app_args = app
        .app_args
        .iter()
        .map(|arg| {
            text::text_to_bytes(arg, app.app_args_base64)
                .map(ByteBuf::from)
                .map_err(|source| EncodeError::InvalidBytes {
                    field: "app_args",
                    source,
                })
        })
        .collect::<Result<_, _>>()?;

    tx.accounts = app
        .foreign_accounts
        .iter()
        .map(|a| {
            parse_address(a).map_err(|source| EncodeError::InvalidAddress {
                field: "foreign_accounts",
                source,
            })
        })
        .collect::<Result<_, _>>()?;
    tx.foreign_apps = app.foreign_apps.clone();
    tx.foreign_assets = app.foreign_assets.clone();

    for b in &app.boxes {
        let index = if b.app_id == 0 || b.app_id == app_id {
            0
        } else {
            app.foreign_apps
                .iter()
                .position(|id| *id == b.app_id)
                .map(|i| i as u64 + 1)
                .ok_or(EncodeError::InvalidBoxReference(b.app_id))?
        };
        let name = text::text_to_bytes(&b.name, b.name_base64).map_err(|source| {
            EncodeError::InvalidBytes {
                field: "boxes",
                source,
            }
        })?;
        tx.boxes.push(BoxRef { index, name });
    }

    tx.approval_program = base64_field("approval_program", &app.approval_program)?;
    tx.clear_program = base64_field("clear_program", &app.clear_program)?;
    tx.global_schema = schema(app.global_ints, app.global_bytes);
    tx.local_schema = schema(app.local_ints, app.local_bytes);
    tx.extra_pages = app.extra_pages.unwrap_or(0);
    Ok(())
}

// ─── Entry points ───────────────────────────────────────────────────────────

/// Encode a draft into a canonical unsigned transaction.
pub fn encode_draft(
    draft: &TransactionDraft,
    params: &NetworkParams,
) -> Result<EncodedTransaction, EncodeError> {
    let kind = draft.kind();
    let common = &draft.common;

    let sender = required_address(kind, "sender", &common.sender)?;

    let (first_valid, last_valid) = if common.use_suggested_rounds {
        (params.first_round, params.last_round)
    } else {
        (
            common.first_valid.ok_or(EncodeError::MissingField {
                kind,
                field: "first_valid",
            })?,
            common.last_valid.ok_or(EncodeError::MissingField {
                kind,
                field: "last_valid",
            })?,
        )
    };

    let note = text::text_to_bytes(&common.note, common.note_base64)
        .map_err(|source| EncodeError::InvalidBytes {
            field: "note",
            source,
        })?;
    let lease = text::resolve_fixed_32(&common.lease, common.lease_base64)
        .map_err(EncodeError::InvalidLease)?;

    let mut tx = Transaction {
        tx_type: kind.wire_type().to_string(),
        sender,
        first_valid,
        last_valid,
        genesis_id: params.genesis_id.clone(),
        genesis_hash: ByteArray(params.genesis_hash),
        note,
        lease: lease.map(ByteArray).unwrap_or_default(),
        rekey_to: optional_address("rekey_to", &common.rekey_to)?,
        ..Default::default()
    };

    match &draft.fields {
        TxFields::Payment(p) => {
            tx.receiver = Some(required_address(kind, "receiver", &p.receiver)?);
            tx.amount = native_amount("amount", &p.amount)?;
            tx.close_remainder_to = optional_address("close_remainder_to", &p.close_remainder_to)?;
        }
        TxFields::AssetTransfer(a) => {
            tx.transfer_asset = required_id(kind, "asset_id", a.asset_id)?;
            tx.asset_receiver = Some(required_address(kind, "receiver", &a.receiver)?);
            tx.asset_amount = a.amount;
            tx.asset_sender = optional_address("clawback_sender", &a.clawback_sender)?;
            tx.asset_close_to = optional_address("close_remainder_to", &a.close_remainder_to)?;
        }
        TxFields::AssetConfig(c) => encode_asset_config(&mut tx, c)?,
        TxFields::AssetFreeze(f) => {
            tx.freeze_asset = required_id(kind, "asset_id", f.asset_id)?;
            tx.freeze_account = Some(required_address(kind, "target", &f.target)?);
            tx.asset_frozen = f.frozen;
        }
        TxFields::KeyRegistration(k) => encode_key_registration(&mut tx, k)?,
        TxFields::ApplicationCall(app) => encode_application_call(&mut tx, app)?,
    }

    let flat_fee = !common.use_suggested_fee;
    if flat_fee {
        tx.fee = native_amount("fee", &common.fee)?;
    } else {
        tx.fee = params.min_fee;
        let size = tx.to_msgpack()?.len() + SIGNATURE_OVERHEAD;
        tx.fee = params.suggested_fee(size);
    }

    let bytes = tx.to_msgpack()?;
    let id = tx.id()?;
    log::debug!(
        "Encoded {} transaction {} ({} bytes, fee {})",
        tx.tx_type,
        id,
        bytes.len(),
        tx.fee
    );

    Ok(EncodedTransaction {
        transaction: tx,
        bytes,
        id,
        flat_fee,
    })
}

/// Encode a draft given in JSON form.
///
/// An unknown or missing `type` is reported as [`EncodeError::UnsupportedKind`]
/// rather than as a parse failure.
pub fn encode_draft_json(
    value: &serde_json::Value,
    params: &NetworkParams,
) -> Result<EncodedTransaction, EncodeError> {
    let type_name = value.get("type").and_then(|t| t.as_str()).unwrap_or("");
    if TxKind::from_draft_type(type_name).is_none() {
        return Err(EncodeError::UnsupportedKind(type_name.to_string()));
    }
    let draft: TransactionDraft = serde_json::from_value(value.clone())?;
    encode_draft(&draft, params)
}
