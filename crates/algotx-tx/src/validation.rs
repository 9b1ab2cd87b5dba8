//! Draft validation.
//!
//! [`validate`] is a pure function of the draft and its context (the active
//! preset). It yields one error per field plus one entry per conditional
//! group that cannot be pinned on a single field. Errors carry a message key
//! and interpolation values rather than rendered text.

use crate::draft::{
    ApplicationCallFields, AssetConfigFields, CommonFields, KeyRegistrationFields,
    TransactionDraft, TxFields,
};
use crate::presets::Preset;
use crate::text;
use algotx_types::constants::{limits, DEFAULT_VALIDITY_WINDOW, MIN_TXN_FEE, NATIVE_DECIMALS};
use algotx_types::units::{decimal_to_base_units_u64, format_base_units};
use algotx_types::parse_address;
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// Error Types
// =============================================================================

/// A localizable validation message: key plus interpolation values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub key: &'static str,
    pub values: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }
}

pub mod keys {
    pub const REQUIRED: &str = "validation.required";
    pub const INVALID_ADDRESS: &str = "validation.invalid_address";
    pub const INVALID_AMOUNT: &str = "validation.invalid_amount";
    pub const TOO_MANY_DECIMALS: &str = "validation.too_many_decimals";
    pub const MIN_FEE: &str = "validation.min_fee";
    pub const MIN_VALUE: &str = "validation.min_value";
    pub const MAX_VALUE: &str = "validation.max_value";
    pub const MAX_LENGTH: &str = "validation.max_length";
    pub const EXACT_LENGTH: &str = "validation.exact_length";
    pub const MAX_COUNT: &str = "validation.max_count";
    pub const INVALID_BASE64: &str = "validation.invalid_base64";
    pub const ROUND_ORDER: &str = "validation.round_order";
    pub const WINDOW_TOO_LONG: &str = "validation.window_too_long";
    pub const FORBIDDEN: &str = "validation.forbidden";
    pub const CONFLICT: &str = "validation.conflict";
    pub const BOX_APP_NOT_REFERENCED: &str = "validation.box_app_not_referenced";
    pub const GROUP_INCOMPLETE: &str = "validation.group_incomplete";
    pub const GROUP_FORBIDDEN: &str = "validation.group_forbidden";
    pub const TOTAL_TOO_LARGE: &str = "validation.total_too_large";
}

/// Every validated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Sender,
    Fee,
    FirstValid,
    LastValid,
    Note,
    Lease,
    RekeyTo,
    Receiver,
    Amount,
    CloseRemainderTo,
    AssetId,
    ClawbackSender,
    Total,
    Decimals,
    UnitName,
    AssetName,
    Url,
    MetadataHash,
    Manager,
    Reserve,
    Freeze,
    Clawback,
    Target,
    VoteKey,
    SelectionKey,
    StateProofKey,
    VoteFirst,
    VoteLast,
    VoteKeyDilution,
    NonParticipation,
    AppId,
    AppArgs,
    ForeignAccounts,
    ForeignApps,
    ForeignAssets,
    Boxes,
    ApprovalProgram,
    ClearProgram,
    GlobalInts,
    GlobalBytes,
    LocalInts,
    LocalBytes,
    ExtraPages,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Sender => "sender",
            Field::Fee => "fee",
            Field::FirstValid => "first_valid",
            Field::LastValid => "last_valid",
            Field::Note => "note",
            Field::Lease => "lease",
            Field::RekeyTo => "rekey_to",
            Field::Receiver => "receiver",
            Field::Amount => "amount",
            Field::CloseRemainderTo => "close_remainder_to",
            Field::AssetId => "asset_id",
            Field::ClawbackSender => "clawback_sender",
            Field::Total => "total",
            Field::Decimals => "decimals",
            Field::UnitName => "unit_name",
            Field::AssetName => "asset_name",
            Field::Url => "url",
            Field::MetadataHash => "metadata_hash",
            Field::Manager => "manager",
            Field::Reserve => "reserve",
            Field::Freeze => "freeze",
            Field::Clawback => "clawback",
            Field::Target => "target",
            Field::VoteKey => "vote_key",
            Field::SelectionKey => "selection_key",
            Field::StateProofKey => "state_proof_key",
            Field::VoteFirst => "vote_first",
            Field::VoteLast => "vote_last",
            Field::VoteKeyDilution => "vote_key_dilution",
            Field::NonParticipation => "non_participation",
            Field::AppId => "app_id",
            Field::AppArgs => "app_args",
            Field::ForeignAccounts => "foreign_accounts",
            Field::ForeignApps => "foreign_apps",
            Field::ForeignAssets => "foreign_assets",
            Field::Boxes => "boxes",
            Field::ApprovalProgram => "approval_program",
            Field::ClearProgram => "clear_program",
            Field::GlobalInts => "global_ints",
            Field::GlobalBytes => "global_bytes",
            Field::LocalInts => "local_ints",
            Field::LocalBytes => "local_bytes",
            Field::ExtraPages => "extra_pages",
        }
    }
}

/// Requirements that span several fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionalGroup {
    KeyRegistrationOnline,
    AssetCreation,
    ApplicationPrograms,
    ApplicationSchema,
    TotalDependencies,
    AppArgsSize,
    ProgramSize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionalGroupError {
    pub group: ConditionalGroup,
    pub error: ValidationError,
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub fields: BTreeMap<Field, ValidationError>,
    pub groups: Vec<ConditionalGroupError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.fields.is_empty() && self.groups.is_empty()
    }

    pub fn field(&self, field: Field) -> Option<&ValidationError> {
        self.fields.get(&field)
    }

    pub fn group(&self, group: ConditionalGroup) -> Option<&ConditionalGroupError> {
        self.groups.iter().find(|g| g.group == group)
    }

    pub fn error_count(&self) -> usize {
        self.fields.len() + self.groups.len()
    }

    // First error for a field wins.
    fn push_field(&mut self, field: Field, error: ValidationError) {
        self.fields.entry(field).or_insert(error);
    }

    fn check(&mut self, field: Field, error: Option<ValidationError>) {
        if let Some(error) = error {
            self.push_field(field, error);
        }
    }

    fn push_group(&mut self, group: ConditionalGroup, error: ValidationError) {
        self.groups.push(ConditionalGroupError { group, error });
    }
}

/// Context that changes which fields are required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationContext {
    pub preset: Option<Preset>,
}

impl ValidationContext {
    pub fn with_preset(preset: Preset) -> Self {
        Self {
            preset: Some(preset),
        }
    }

    fn is(&self, presets: &[Preset]) -> bool {
        self.preset.is_some_and(|p| presets.contains(&p))
    }
}

/// The submit gate: whether a draft may proceed to encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitGate {
    Open,
    /// Errors exist but the "ignore validation errors" setting lets them pass.
    Bypassed(ValidationResult),
    Blocked(ValidationResult),
}

impl SubmitGate {
    pub fn evaluate(result: ValidationResult, ignore_validation_errors: bool) -> Self {
        if result.is_valid() {
            SubmitGate::Open
        } else if ignore_validation_errors {
            log::warn!(
                "Proceeding despite {} validation error(s)",
                result.error_count()
            );
            SubmitGate::Bypassed(result)
        } else {
            SubmitGate::Blocked(result)
        }
    }

    pub fn allows_encoding(&self) -> bool {
        !matches!(self, SubmitGate::Blocked(_))
    }
}

// =============================================================================
// Field Rules
// =============================================================================

fn required() -> ValidationError {
    ValidationError::new(keys::REQUIRED)
}

fn check_address(value: &str, is_required: bool) -> Option<ValidationError> {
    if value.trim().is_empty() {
        return is_required.then(required);
    }
    parse_address(value)
        .err()
        .map(|e| ValidationError::new(keys::INVALID_ADDRESS).with("reason", e))
}

fn check_native_amount(value: &str) -> Option<ValidationError> {
    if let Some((_, frac)) = value.trim().split_once('.') {
        if frac.len() > NATIVE_DECIMALS as usize {
            return Some(
                ValidationError::new(keys::TOO_MANY_DECIMALS).with("max", NATIVE_DECIMALS),
            );
        }
    }
    decimal_to_base_units_u64(value, NATIVE_DECIMALS)
        .err()
        .map(|e| ValidationError::new(keys::INVALID_AMOUNT).with("reason", e))
}

fn check_required_id(id: Option<u64>) -> Option<ValidationError> {
    match id {
        None => Some(required()),
        Some(0) => Some(ValidationError::new(keys::MIN_VALUE).with("min", 1)),
        Some(_) => None,
    }
}

fn check_max_len(len: usize, max: usize) -> Option<ValidationError> {
    (len > max).then(|| {
        ValidationError::new(keys::MAX_LENGTH)
            .with("max", max)
            .with("length", len)
    })
}

/// Variable-length byte field whose ceiling depends on the Base64 toggle.
fn check_bytes(
    value: &str,
    base64: bool,
    max_bytes: usize,
    max_base64_chars: usize,
) -> Option<ValidationError> {
    if base64 {
        if let Some(e) = check_max_len(value.trim().len(), max_base64_chars) {
            return Some(e);
        }
        match text::decode_base64(value) {
            Ok(bytes) => check_max_len(bytes.len(), max_bytes),
            Err(_) => Some(ValidationError::new(keys::INVALID_BASE64)),
        }
    } else {
        check_max_len(value.len(), max_bytes)
    }
}

/// Lease or metadata hash.
fn check_fixed_32(value: &str, base64: bool) -> Option<ValidationError> {
    if value.trim().is_empty() {
        return None;
    }
    if base64 {
        if let Some(e) = check_max_len(value.trim().len(), limits::LEASE_BASE64_CHARS) {
            return Some(e);
        }
        match text::decode_base64(value) {
            Ok(bytes) if bytes.len() == limits::LEASE_BYTES => None,
            Ok(bytes) => Some(
                ValidationError::new(keys::EXACT_LENGTH)
                    .with("length", limits::LEASE_BYTES)
                    .with("actual", bytes.len()),
            ),
            Err(_) => Some(ValidationError::new(keys::INVALID_BASE64)),
        }
    } else {
        check_max_len(value.len(), limits::LEASE_BYTES)
    }
}

fn check_key(value: &str, len: usize) -> Option<ValidationError> {
    if value.trim().is_empty() {
        return None;
    }
    match text::decode_base64(value) {
        Ok(bytes) if bytes.len() == len => None,
        Ok(bytes) => Some(
            ValidationError::new(keys::EXACT_LENGTH)
                .with("length", len)
                .with("actual", bytes.len()),
        ),
        Err(_) => Some(ValidationError::new(keys::INVALID_BASE64)),
    }
}

fn check_max_value(value: Option<u64>, max: u64) -> Option<ValidationError> {
    value
        .filter(|v| *v > max)
        .map(|_| ValidationError::new(keys::MAX_VALUE).with("max", max))
}

fn check_max_count(count: usize, max: usize) -> Option<ValidationError> {
    (count > max).then(|| {
        ValidationError::new(keys::MAX_COUNT)
            .with("max", max)
            .with("count", count)
    })
}

fn forbidden_if(present: bool) -> Option<ValidationError> {
    present.then(|| ValidationError::new(keys::FORBIDDEN))
}

fn missing_list(missing: &[Field]) -> String {
    missing
        .iter()
        .map(Field::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

// =============================================================================
// Per-kind Rules
// =============================================================================

fn validate_common(out: &mut ValidationResult, c: &CommonFields, ctx: &ValidationContext) {
    out.check(Field::Sender, check_address(&c.sender, true));

    if !c.use_suggested_fee {
        if c.fee.trim().is_empty() {
            out.push_field(Field::Fee, required());
        } else if let Some(e) = check_native_amount(&c.fee) {
            out.push_field(Field::Fee, e);
        } else if decimal_to_base_units_u64(&c.fee, NATIVE_DECIMALS).unwrap_or(0) < MIN_TXN_FEE {
            out.push_field(
                Field::Fee,
                ValidationError::new(keys::MIN_FEE)
                    .with("min", format_base_units(MIN_TXN_FEE, NATIVE_DECIMALS)),
            );
        }
    }

    if !c.use_suggested_rounds {
        if c.first_valid.is_none() {
            out.push_field(Field::FirstValid, required());
        }
        if c.last_valid.is_none() {
            out.push_field(Field::LastValid, required());
        }
        if let (Some(first), Some(last)) = (c.first_valid, c.last_valid) {
            if first > last {
                out.push_field(
                    Field::LastValid,
                    ValidationError::new(keys::ROUND_ORDER)
                        .with("first", first)
                        .with("last", last),
                );
            } else if last - first > DEFAULT_VALIDITY_WINDOW {
                out.push_field(
                    Field::LastValid,
                    ValidationError::new(keys::WINDOW_TOO_LONG).with("max", DEFAULT_VALIDITY_WINDOW),
                );
            }
        }
    }

    out.check(
        Field::Note,
        check_bytes(
            &c.note,
            c.note_base64,
            limits::MAX_NOTE_BYTES,
            limits::MAX_NOTE_BASE64_CHARS,
        ),
    );
    out.check(Field::Lease, check_fixed_32(&c.lease, c.lease_base64));
    out.check(
        Field::RekeyTo,
        check_address(&c.rekey_to, ctx.is(&[Preset::RekeyAccount])),
    );
}

fn validate_asset_config(out: &mut ValidationResult, c: &AssetConfigFields, ctx: &ValidationContext) {
    if ctx.is(&[Preset::AssetReconfig, Preset::AssetDestroy]) {
        out.check(Field::AssetId, check_required_id(c.asset_id));
    }
    if ctx.is(&[Preset::AssetCreate]) {
        out.check(Field::AssetId, forbidden_if(c.asset_id.is_some()));
    }

    let creation = c.asset_id.is_none();
    if creation {
        let mut missing = Vec::new();
        for (field, absent) in [
            (Field::Total, c.total.is_none()),
            (Field::Decimals, c.decimals.is_none()),
            (Field::UnitName, c.unit_name.is_empty()),
            (Field::AssetName, c.asset_name.is_empty()),
            (Field::Url, c.url.is_empty()),
            (Field::MetadataHash, c.metadata_hash.trim().is_empty()),
        ] {
            if absent {
                out.push_field(field, required());
                missing.push(field);
            }
        }
        if !missing.is_empty() {
            out.push_group(
                ConditionalGroup::AssetCreation,
                ValidationError::new(keys::GROUP_INCOMPLETE).with("missing", missing_list(&missing)),
            );
        }
        if c.total == Some(0) {
            out.push_field(Field::Total, ValidationError::new(keys::MIN_VALUE).with("min", 1));
        }
    } else {
        // Creation-only parameters are immutable once the asset exists.
        out.check(Field::Total, forbidden_if(c.total.is_some()));
        out.check(Field::Decimals, forbidden_if(c.decimals.is_some()));
        out.check(Field::UnitName, forbidden_if(!c.unit_name.is_empty()));
        out.check(Field::AssetName, forbidden_if(!c.asset_name.is_empty()));
        out.check(Field::Url, forbidden_if(!c.url.is_empty()));
        out.check(Field::MetadataHash, forbidden_if(!c.metadata_hash.is_empty()));
    }

    if c.decimals.is_some_and(|d| d > limits::MAX_ASSET_DECIMALS) {
        out.push_field(
            Field::Decimals,
            ValidationError::new(keys::MAX_VALUE).with("max", limits::MAX_ASSET_DECIMALS),
        );
    }
    out.check(Field::UnitName, check_max_len(c.unit_name.len(), limits::MAX_UNIT_NAME_BYTES));
    out.check(Field::AssetName, check_max_len(c.asset_name.len(), limits::MAX_ASSET_NAME_BYTES));
    out.check(Field::Url, check_max_len(c.url.len(), limits::MAX_ASSET_URL_BYTES));
    out.check(
        Field::MetadataHash,
        check_fixed_32(&c.metadata_hash, c.metadata_hash_base64),
    );

    out.check(Field::Manager, check_address(&c.manager, false));
    out.check(Field::Reserve, check_address(&c.reserve, false));
    out.check(Field::Freeze, check_address(&c.freeze, false));
    out.check(Field::Clawback, check_address(&c.clawback, false));
}

fn validate_key_registration(
    out: &mut ValidationResult,
    k: &KeyRegistrationFields,
    ctx: &ValidationContext,
) {
    let populated = k.online_fields_populated();
    let online = [
        (Field::VoteKey, k.vote_key.trim().is_empty()),
        (Field::SelectionKey, k.selection_key.trim().is_empty()),
        (Field::StateProofKey, k.state_proof_key.trim().is_empty()),
        (Field::VoteFirst, k.vote_first.is_none()),
        (Field::VoteLast, k.vote_last.is_none()),
        (Field::VoteKeyDilution, k.vote_key_dilution.is_none()),
    ];

    let must_be_online = ctx.is(&[Preset::RegOnline]);
    if populated > 0 || must_be_online {
        let missing: Vec<Field> = online
            .iter()
            .filter(|(_, absent)| *absent)
            .map(|(field, _)| *field)
            .collect();
        for field in &missing {
            out.push_field(*field, required());
        }
        if !missing.is_empty() {
            out.push_group(
                ConditionalGroup::KeyRegistrationOnline,
                ValidationError::new(keys::GROUP_INCOMPLETE).with("missing", missing_list(&missing)),
            );
        }
    }
    if populated > 0 && ctx.is(&[Preset::RegOffline, Preset::RegNonpart]) {
        out.push_group(
            ConditionalGroup::KeyRegistrationOnline,
            ValidationError::new(keys::GROUP_FORBIDDEN),
        );
    }
    if populated > 0 && k.non_participation {
        out.push_field(Field::NonParticipation, ValidationError::new(keys::CONFLICT));
    }
    if ctx.is(&[Preset::RegNonpart]) && !k.non_participation {
        out.push_field(Field::NonParticipation, required());
    }

    out.check(Field::VoteKey, check_key(&k.vote_key, limits::VOTE_KEY_BYTES));
    out.check(
        Field::SelectionKey,
        check_key(&k.selection_key, limits::SELECTION_KEY_BYTES),
    );
    out.check(
        Field::StateProofKey,
        check_key(&k.state_proof_key, limits::STATE_PROOF_KEY_BYTES),
    );
    if let (Some(first), Some(last)) = (k.vote_first, k.vote_last) {
        if first > last {
            out.push_field(
                Field::VoteLast,
                ValidationError::new(keys::ROUND_ORDER)
                    .with("first", first)
                    .with("last", last),
            );
        }
    }
}

fn validate_application_call(
    out: &mut ValidationResult,
    app: &ApplicationCallFields,
    ctx: &ValidationContext,
) {
    let needs_app_id = app.on_complete.requires_existing_app()
        || ctx.is(&[
            Preset::AppUpdate,
            Preset::AppCall,
            Preset::AppOptIn,
            Preset::AppCloseOut,
            Preset::AppClear,
            Preset::AppDelete,
        ]);
    if needs_app_id {
        out.check(Field::AppId, check_required_id(app.app_id));
    }
    if ctx.is(&[Preset::AppCreate]) {
        out.check(Field::AppId, forbidden_if(app.app_id.is_some()));
    }

    // Programs
    if app.carries_programs() {
        let mut missing = Vec::new();
        for (field, value) in [
            (Field::ApprovalProgram, &app.approval_program),
            (Field::ClearProgram, &app.clear_program),
        ] {
            if value.trim().is_empty() {
                out.push_field(field, required());
                missing.push(field);
            }
        }
        if !missing.is_empty() {
            out.push_group(
                ConditionalGroup::ApplicationPrograms,
                ValidationError::new(keys::GROUP_INCOMPLETE).with("missing", missing_list(&missing)),
            );
        }
    } else {
        out.check(
            Field::ApprovalProgram,
            forbidden_if(!app.approval_program.trim().is_empty()),
        );
        out.check(
            Field::ClearProgram,
            forbidden_if(!app.clear_program.trim().is_empty()),
        );
    }

    let mut program_bytes = 0;
    for (field, value) in [
        (Field::ApprovalProgram, &app.approval_program),
        (Field::ClearProgram, &app.clear_program),
    ] {
        if value.trim().is_empty() {
            continue;
        }
        match text::decode_base64(value) {
            Ok(bytes) => program_bytes += bytes.len(),
            Err(_) => out.push_field(field, ValidationError::new(keys::INVALID_BASE64)),
        }
    }
    let extra_pages = app.extra_pages.unwrap_or(0);
    let max_program_bytes =
        limits::PROGRAM_PAGE_BYTES * (1 + extra_pages.min(limits::MAX_EXTRA_PROGRAM_PAGES) as usize);
    if program_bytes > max_program_bytes {
        out.push_group(
            ConditionalGroup::ProgramSize,
            ValidationError::new(keys::TOTAL_TOO_LARGE)
                .with("max", max_program_bytes)
                .with("length", program_bytes),
        );
    }

    // Schema and extra pages only on creation.
    let creation = app.is_creation();
    let schema_fields = [
        (Field::GlobalInts, app.global_ints),
        (Field::GlobalBytes, app.global_bytes),
        (Field::LocalInts, app.local_ints),
        (Field::LocalBytes, app.local_bytes),
        (Field::ExtraPages, app.extra_pages),
    ];
    if creation {
        let missing: Vec<Field> = schema_fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| *field)
            .collect();
        for field in &missing {
            out.push_field(*field, required());
        }
        if !missing.is_empty() {
            out.push_group(
                ConditionalGroup::ApplicationSchema,
                ValidationError::new(keys::GROUP_INCOMPLETE).with("missing", missing_list(&missing)),
            );
        }

        let global = app
            .global_ints
            .unwrap_or(0)
            .saturating_add(app.global_bytes.unwrap_or(0));
        if global > limits::MAX_GLOBAL_SCHEMA_ENTRIES {
            for field in [Field::GlobalInts, Field::GlobalBytes] {
                out.push_field(
                    field,
                    ValidationError::new(keys::MAX_VALUE).with("max", limits::MAX_GLOBAL_SCHEMA_ENTRIES),
                );
            }
        }
        let local = app
            .local_ints
            .unwrap_or(0)
            .saturating_add(app.local_bytes.unwrap_or(0));
        if local > limits::MAX_LOCAL_SCHEMA_ENTRIES {
            for field in [Field::LocalInts, Field::LocalBytes] {
                out.push_field(
                    field,
                    ValidationError::new(keys::MAX_VALUE).with("max", limits::MAX_LOCAL_SCHEMA_ENTRIES),
                );
            }
        }
        out.check(
            Field::ExtraPages,
            check_max_value(app.extra_pages, limits::MAX_EXTRA_PROGRAM_PAGES),
        );
    } else {
        // Absent on the wire for calls, so any value would not survive a decode.
        for (field, value) in schema_fields {
            out.check(field, forbidden_if(value.is_some()));
        }
    }

    // Arguments
    out.check(Field::AppArgs, check_max_count(app.app_args.len(), limits::MAX_APP_ARGS));
    let mut arg_bytes = 0;
    for arg in &app.app_args {
        match text::text_to_bytes(arg, app.app_args_base64) {
            Ok(bytes) => arg_bytes += bytes.len(),
            Err(_) => out.push_field(Field::AppArgs, ValidationError::new(keys::INVALID_BASE64)),
        }
    }
    if arg_bytes > limits::MAX_APP_TOTAL_ARG_BYTES {
        out.push_group(
            ConditionalGroup::AppArgsSize,
            ValidationError::new(keys::TOTAL_TOO_LARGE)
                .with("max", limits::MAX_APP_TOTAL_ARG_BYTES)
                .with("length", arg_bytes),
        );
    }

    // References
    for account in &app.foreign_accounts {
        out.check(Field::ForeignAccounts, check_address(account, true));
    }
    out.check(
        Field::ForeignAccounts,
        check_max_count(app.foreign_accounts.len(), limits::MAX_FOREIGN_ACCOUNTS),
    );
    out.check(
        Field::ForeignApps,
        check_max_count(app.foreign_apps.len(), limits::MAX_FOREIGN_APPS),
    );
    out.check(
        Field::ForeignAssets,
        check_max_count(app.foreign_assets.len(), limits::MAX_FOREIGN_ASSETS),
    );
    out.check(
        Field::Boxes,
        check_max_count(app.boxes.len(), limits::MAX_BOX_REFERENCES),
    );
    for b in &app.boxes {
        let referenced = b.app_id == 0
            || Some(b.app_id) == app.app_id
            || app.foreign_apps.contains(&b.app_id);
        if !referenced {
            out.push_field(
                Field::Boxes,
                ValidationError::new(keys::BOX_APP_NOT_REFERENCED).with("app_id", b.app_id),
            );
        }
        match text::text_to_bytes(&b.name, b.name_base64) {
            Ok(name) => out.check(Field::Boxes, check_max_len(name.len(), limits::MAX_BOX_NAME_BYTES)),
            Err(_) => out.push_field(Field::Boxes, ValidationError::new(keys::INVALID_BASE64)),
        }
    }

    let dependencies = app.total_dependencies();
    if dependencies > limits::MAX_TOTAL_DEPENDENCIES {
        out.push_group(
            ConditionalGroup::TotalDependencies,
            ValidationError::new(keys::MAX_COUNT)
                .with("max", limits::MAX_TOTAL_DEPENDENCIES)
                .with("count", dependencies),
        );
    }
}

// =============================================================================
// Entry Point
// =============================================================================

/// Validate a draft under the given context.
pub fn validate(draft: &TransactionDraft, ctx: &ValidationContext) -> ValidationResult {
    let mut out = ValidationResult::default();
    validate_common(&mut out, &draft.common, ctx);

    match &draft.fields {
        TxFields::Payment(p) => {
            out.check(Field::Receiver, check_address(&p.receiver, true));
            out.check(Field::Amount, check_native_amount(&p.amount));
            out.check(
                Field::CloseRemainderTo,
                check_address(&p.close_remainder_to, ctx.is(&[Preset::CloseAccount])),
            );
        }
        TxFields::AssetTransfer(a) => {
            out.check(Field::AssetId, check_required_id(a.asset_id));
            out.check(Field::Receiver, check_address(&a.receiver, true));
            out.check(
                Field::ClawbackSender,
                check_address(&a.clawback_sender, ctx.is(&[Preset::AssetClawback])),
            );
            out.check(
                Field::CloseRemainderTo,
                check_address(&a.close_remainder_to, ctx.is(&[Preset::AssetOptOut])),
            );
        }
        TxFields::AssetConfig(c) => validate_asset_config(&mut out, c, ctx),
        TxFields::AssetFreeze(f) => {
            out.check(Field::AssetId, check_required_id(f.asset_id));
            out.check(Field::Target, check_address(&f.target, true));
        }
        TxFields::KeyRegistration(k) => validate_key_registration(&mut out, k, ctx),
        TxFields::ApplicationCall(app) => validate_application_call(&mut out, app, ctx),
    }

    out
}
