//! Canonical bytes → draft.
//!
//! Input is tried as an unsigned transaction first, then as a signed
//! envelope. The genesis hash is checked against the active network unless
//! the caller disables the guard.

use crate::draft::{
    ApplicationCallFields, AssetConfigFields, AssetFreezeFields, AssetTransferFields, BoxReference,
    CommonFields, KeyRegistrationFields, OnComplete, PaymentFields, TransactionDraft, TxFields,
    TxKind,
};
use crate::envelope::SignedEnvelope;
use crate::params::NetworkParams;
use crate::text;
use crate::wire::{SignedTransaction, Transaction, WireError};
use algotx_types::constants::NATIVE_DECIMALS;
use algotx_types::units::format_base_units;
use algotx_types::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not an unsigned transaction ({unsigned}) nor a signed transaction ({signed})")]
    Malformed {
        unsigned: WireError,
        signed: WireError,
    },

    #[error(
        "transaction belongs to another network: expected genesis hash {expected}, found {}",
        found.as_deref().unwrap_or("none")
    )]
    NetworkMismatch {
        expected: String,
        found: Option<String>,
    },

    #[error("unsupported transaction type: '{0}'")]
    UnsupportedKind(String),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Caller-selected decode behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Abort when the genesis hash differs from the active network's.
    pub reject_cross_network: bool,
    pub note_base64: bool,
    pub lease_base64: bool,
    pub metadata_hash_base64: bool,
    pub app_args_base64: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            reject_cross_network: true,
            note_base64: false,
            lease_base64: false,
            metadata_hash_base64: false,
            app_args_base64: false,
        }
    }
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTransaction {
    pub draft: TransactionDraft,
    pub transaction: Transaction,
    /// The original signed bytes, present only for signed input.
    pub envelope: Option<SignedEnvelope>,
}

fn address_text(addr: Option<Address>) -> String {
    match addr {
        Some(a) if !a.is_zero() => a.encode(),
        _ => String::new(),
    }
}

fn non_zero(v: u64) -> Option<u64> {
    (v != 0).then_some(v)
}

fn key_text(bytes: &[u8], zero: bool) -> String {
    if zero {
        String::new()
    } else {
        text::encode_base64(bytes)
    }
}

// ─── Per-kind decoding ──────────────────────────────────────────────────────

fn decode_asset_config(tx: &Transaction, options: &DecodeOptions) -> Result<TxFields, DecodeError> {
    let creation = tx.config_asset == 0;
    let ap = tx.asset_params.clone().unwrap_or_default();

    let decimals = u32::try_from(ap.decimals).map_err(|_| DecodeError::InvalidField {
        field: "decimals",
        reason: format!("{} out of range", ap.decimals),
    })?;
    let (metadata_hash, metadata_hash_base64) = match ap.metadata_hash.non_zero() {
        Some(hash) => text::render_fixed_32(hash, options.metadata_hash_base64),
        None => (String::new(), options.metadata_hash_base64),
    };

    Ok(TxFields::AssetConfig(AssetConfigFields {
        asset_id: non_zero(tx.config_asset),
        total: creation.then_some(ap.total),
        decimals: creation.then_some(decimals),
        default_frozen: ap.default_frozen,
        unit_name: ap.unit_name,
        asset_name: ap.asset_name,
        url: ap.url,
        metadata_hash,
        metadata_hash_base64,
        manager: address_text(ap.manager),
        reserve: address_text(ap.reserve),
        freeze: address_text(ap.freeze),
        clawback: address_text(ap.clawback),
    }))
}

fn decode_key_registration(tx: &Transaction) -> TxFields {
    let online = !tx.vote_key.is_zero();
    TxFields::KeyRegistration(KeyRegistrationFields {
        vote_key: key_text(&tx.vote_key.0, tx.vote_key.is_zero()),
        selection_key: key_text(&tx.selection_key.0, tx.selection_key.is_zero()),
        state_proof_key: key_text(&tx.state_proof_key.0, tx.state_proof_key.is_zero()),
        vote_first: online.then_some(tx.vote_first),
        vote_last: online.then_some(tx.vote_last),
        vote_key_dilution: online.then_some(tx.vote_key_dilution),
        non_participation: tx.non_participation,
    })
}

fn decode_application_call(
    tx: &Transaction,
    options: &DecodeOptions,
) -> Result<TxFields, DecodeError> {
    let on_complete =
        OnComplete::from_u64(tx.on_completion).ok_or_else(|| DecodeError::InvalidField {
            field: "on_complete",
            reason: format!("unknown action {}", tx.on_completion),
        })?;

    // One toggle covers every argument; any non-UTF-8 argument forces Base64.
    let app_args_base64 = options.app_args_base64
        || tx
            .app_args
            .iter()
            .any(|a| std::str::from_utf8(a).is_err());
    let app_args = tx
        .app_args
        .iter()
        .map(|a| text::bytes_to_text(a, app_args_base64).0)
        .collect();

    let boxes = tx
        .boxes
        .iter()
        .map(|b| {
            let app_id = match b.index {
                0 => 0,
                i => *tx
                    .foreign_apps
                    .get(i as usize - 1)
                    .ok_or_else(|| DecodeError::InvalidField {
                        field: "boxes",
                        reason: format!("index {} beyond foreign apps", i),
                    })?,
            };
            let (name, name_base64) = text::bytes_to_text(&b.name, false);
            Ok(BoxReference {
                app_id,
                name,
                name_base64,
            })
        })
        .collect::<Result<_, DecodeError>>()?;

    let creation = tx.app_id == 0;
    let global = tx.global_schema.unwrap_or_default();
    let local = tx.local_schema.unwrap_or_default();
    // Creation drafts always carry a schema; zeros are simply omitted on the wire.
    let schema_value = |v: u64, present: bool| (creation || present).then_some(v);

    Ok(TxFields::ApplicationCall(ApplicationCallFields {
        app_id: non_zero(tx.app_id),
        on_complete,
        app_args,
        app_args_base64,
        foreign_accounts: tx.accounts.iter().map(Address::encode).collect(),
        foreign_apps: tx.foreign_apps.clone(),
        foreign_assets: tx.foreign_assets.clone(),
        boxes,
        approval_program: key_text(&tx.approval_program, tx.approval_program.is_empty()),
        clear_program: key_text(&tx.clear_program, tx.clear_program.is_empty()),
        global_ints: schema_value(global.num_uints, tx.global_schema.is_some()),
        global_bytes: schema_value(global.num_byte_slices, tx.global_schema.is_some()),
        local_ints: schema_value(local.num_uints, tx.local_schema.is_some()),
        local_bytes: schema_value(local.num_byte_slices, tx.local_schema.is_some()),
        extra_pages: schema_value(tx.extra_pages, tx.extra_pages != 0),
    }))
}

/// Build a draft mirroring the encoder in reverse.
pub fn draft_from_transaction(
    tx: &Transaction,
    options: &DecodeOptions,
) -> Result<TransactionDraft, DecodeError> {
    let kind = TxKind::from_wire_type(&tx.tx_type)
        .ok_or_else(|| DecodeError::UnsupportedKind(tx.tx_type.clone()))?;

    let (note, note_base64) = if tx.note.is_empty() {
        (String::new(), options.note_base64)
    } else {
        text::bytes_to_text(&tx.note, options.note_base64)
    };
    let (lease, lease_base64) = match tx.lease.non_zero() {
        Some(lease) => text::render_fixed_32(lease, options.lease_base64),
        None => (String::new(), options.lease_base64),
    };

    let common = CommonFields {
        sender: address_text(Some(tx.sender)),
        fee: format_base_units(tx.fee, NATIVE_DECIMALS),
        use_suggested_fee: false,
        first_valid: Some(tx.first_valid),
        last_valid: Some(tx.last_valid),
        use_suggested_rounds: false,
        note,
        note_base64,
        lease,
        lease_base64,
        rekey_to: address_text(tx.rekey_to),
    };

    let fields = match kind {
        TxKind::Payment => TxFields::Payment(PaymentFields {
            receiver: address_text(tx.receiver),
            amount: format_base_units(tx.amount, NATIVE_DECIMALS),
            close_remainder_to: address_text(tx.close_remainder_to),
        }),
        TxKind::AssetTransfer => TxFields::AssetTransfer(AssetTransferFields {
            asset_id: non_zero(tx.transfer_asset),
            receiver: address_text(tx.asset_receiver),
            amount: tx.asset_amount,
            clawback_sender: address_text(tx.asset_sender),
            close_remainder_to: address_text(tx.asset_close_to),
            asset_decimals: None,
        }),
        TxKind::AssetConfig => decode_asset_config(tx, options)?,
        TxKind::AssetFreeze => TxFields::AssetFreeze(AssetFreezeFields {
            asset_id: non_zero(tx.freeze_asset),
            target: address_text(tx.freeze_account),
            frozen: tx.asset_frozen,
        }),
        TxKind::KeyRegistration => decode_key_registration(tx),
        TxKind::ApplicationCall => decode_application_call(tx, options)?,
    };

    Ok(TransactionDraft { common, fields })
}

/// Decode imported bytes into a draft.
///
/// On any error nothing is returned; in particular a network mismatch yields
/// no draft at all.
pub fn decode_transaction(
    bytes: &[u8],
    params: &NetworkParams,
    options: &DecodeOptions,
) -> Result<DecodedTransaction, DecodeError> {
    let (transaction, envelope) = match Transaction::from_msgpack(bytes) {
        Ok(tx) => (tx, None),
        Err(unsigned) => {
            let signed = SignedTransaction::from_msgpack(bytes)
                .map_err(|signed| DecodeError::Malformed { unsigned, signed })?;
            let envelope = if signed.is_signed() {
                Some(SignedEnvelope {
                    bytes: bytes.to_vec(),
                    tx_id: signed.txn.id()?,
                })
            } else {
                None
            };
            (signed.txn, envelope)
        }
    };

    if options.reject_cross_network {
        let found = transaction.genesis_hash.non_zero().copied();
        if found != Some(params.genesis_hash) {
            let found = found.map(|h| text::encode_base64(&h));
            log::warn!(
                "Rejecting transaction for genesis hash {:?} (active network {})",
                found,
                params.genesis_id
            );
            return Err(DecodeError::NetworkMismatch {
                expected: params.genesis_hash_base64(),
                found,
            });
        }
    }

    let draft = draft_from_transaction(&transaction, options)?;
    log::debug!(
        "Decoded {} transaction ({})",
        transaction.tx_type,
        if envelope.is_some() { "signed" } else { "unsigned" }
    );

    Ok(DecodedTransaction {
        draft,
        transaction,
        envelope,
    })
}
