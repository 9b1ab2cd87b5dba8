//! Editable transaction drafts.
//!
//! A [`TransactionDraft`] holds exactly what a user typed (or what an
//! imported file decoded to): addresses as text, native amounts as decimal
//! strings, byte fields as text or Base64 with a per-field toggle. It is
//! converted to the canonical [`Transaction`](crate::wire::Transaction) only
//! by the encoder.

use serde::{Deserialize, Serialize};

// ─── Transaction Kinds ──────────────────────────────────────────────────────

/// Supported transaction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Payment,
    AssetTransfer,
    AssetConfig,
    AssetFreeze,
    KeyRegistration,
    ApplicationCall,
}

impl TxKind {
    pub const ALL: [TxKind; 6] = [
        TxKind::Payment,
        TxKind::AssetTransfer,
        TxKind::AssetConfig,
        TxKind::AssetFreeze,
        TxKind::KeyRegistration,
        TxKind::ApplicationCall,
    ];

    /// The `type` discriminator used in the canonical encoding.
    pub fn wire_type(&self) -> &'static str {
        match self {
            TxKind::Payment => "pay",
            TxKind::AssetTransfer => "axfer",
            TxKind::AssetConfig => "acfg",
            TxKind::AssetFreeze => "afrz",
            TxKind::KeyRegistration => "keyreg",
            TxKind::ApplicationCall => "appl",
        }
    }

    pub fn from_wire_type(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.wire_type() == s)
    }

    /// The `type` discriminator used in serialized drafts.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Payment => "payment",
            TxKind::AssetTransfer => "asset_transfer",
            TxKind::AssetConfig => "asset_config",
            TxKind::AssetFreeze => "asset_freeze",
            TxKind::KeyRegistration => "key_registration",
            TxKind::ApplicationCall => "application_call",
        }
    }

    pub fn from_draft_type(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// Application on-completion action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnComplete {
    #[default]
    NoOp,
    OptIn,
    CloseOut,
    ClearState,
    UpdateApplication,
    DeleteApplication,
}

impl OnComplete {
    pub fn as_u64(&self) -> u64 {
        match self {
            OnComplete::NoOp => 0,
            OnComplete::OptIn => 1,
            OnComplete::CloseOut => 2,
            OnComplete::ClearState => 3,
            OnComplete::UpdateApplication => 4,
            OnComplete::DeleteApplication => 5,
        }
    }

    pub fn from_u64(v: u64) -> Option<Self> {
        match v {
            0 => Some(OnComplete::NoOp),
            1 => Some(OnComplete::OptIn),
            2 => Some(OnComplete::CloseOut),
            3 => Some(OnComplete::ClearState),
            4 => Some(OnComplete::UpdateApplication),
            5 => Some(OnComplete::DeleteApplication),
            _ => None,
        }
    }

    /// Actions that only make sense against an existing application.
    pub fn requires_existing_app(&self) -> bool {
        matches!(
            self,
            OnComplete::CloseOut
                | OnComplete::ClearState
                | OnComplete::UpdateApplication
                | OnComplete::DeleteApplication
        )
    }
}

// ─── Draft Fields ───────────────────────────────────────────────────────────

/// Fields shared by every transaction kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonFields {
    pub sender: String,
    /// Fee in native decimal units (e.g. "0.001").
    pub fee: String,
    pub use_suggested_fee: bool,
    pub first_valid: Option<u64>,
    pub last_valid: Option<u64>,
    pub use_suggested_rounds: bool,
    pub note: String,
    pub note_base64: bool,
    pub lease: String,
    pub lease_base64: bool,
    pub rekey_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentFields {
    pub receiver: String,
    /// Amount in native decimal units.
    pub amount: String,
    pub close_remainder_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetTransferFields {
    pub asset_id: Option<u64>,
    pub receiver: String,
    /// Amount in the asset's base units.
    pub amount: u64,
    /// Account the asset is clawed back from (revocation target).
    pub clawback_sender: String,
    pub close_remainder_to: String,
    /// The asset's decimal count, filled in from an asset lookup. Display
    /// only: never applied to `amount` and not encoded, so a decoded draft
    /// always has `None`.
    pub asset_decimals: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfigFields {
    /// Present for reconfigure/destroy, absent for creation.
    pub asset_id: Option<u64>,
    pub total: Option<u64>,
    pub decimals: Option<u32>,
    pub default_frozen: bool,
    pub unit_name: String,
    pub asset_name: String,
    pub url: String,
    pub metadata_hash: String,
    pub metadata_hash_base64: bool,
    pub manager: String,
    pub reserve: String,
    pub freeze: String,
    pub clawback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetFreezeFields {
    pub asset_id: Option<u64>,
    pub target: String,
    pub frozen: bool,
}

/// Key registration. The six participation fields form one all-or-nothing
/// group; keys are Base64.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyRegistrationFields {
    pub vote_key: String,
    pub selection_key: String,
    pub state_proof_key: String,
    pub vote_first: Option<u64>,
    pub vote_last: Option<u64>,
    pub vote_key_dilution: Option<u64>,
    pub non_participation: bool,
}

impl KeyRegistrationFields {
    /// Number of populated participation fields (0..=6).
    pub fn online_fields_populated(&self) -> usize {
        [
            !self.vote_key.trim().is_empty(),
            !self.selection_key.trim().is_empty(),
            !self.state_proof_key.trim().is_empty(),
            self.vote_first.is_some(),
            self.vote_last.is_some(),
            self.vote_key_dilution.is_some(),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }
}

/// Box reference. `app_id` 0 refers to the called application itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxReference {
    pub app_id: u64,
    pub name: String,
    pub name_base64: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationCallFields {
    /// Absent for application creation.
    pub app_id: Option<u64>,
    pub on_complete: OnComplete,
    pub app_args: Vec<String>,
    pub app_args_base64: bool,
    pub foreign_accounts: Vec<String>,
    pub foreign_apps: Vec<u64>,
    pub foreign_assets: Vec<u64>,
    pub boxes: Vec<BoxReference>,
    /// Compiled approval program, Base64.
    pub approval_program: String,
    /// Compiled clear-state program, Base64.
    pub clear_program: String,
    pub global_ints: Option<u64>,
    pub global_bytes: Option<u64>,
    pub local_ints: Option<u64>,
    pub local_bytes: Option<u64>,
    pub extra_pages: Option<u64>,
}

impl ApplicationCallFields {
    pub fn is_creation(&self) -> bool {
        self.app_id.is_none()
    }

    /// Whether programs belong in this call (creation or update).
    pub fn carries_programs(&self) -> bool {
        self.is_creation() || self.on_complete == OnComplete::UpdateApplication
    }

    /// Accounts + apps + assets + box references.
    pub fn total_dependencies(&self) -> usize {
        self.foreign_accounts.len()
            + self.foreign_apps.len()
            + self.foreign_assets.len()
            + self.boxes.len()
    }
}

/// Kind-specific fields, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TxFields {
    Payment(PaymentFields),
    AssetTransfer(AssetTransferFields),
    AssetConfig(AssetConfigFields),
    AssetFreeze(AssetFreezeFields),
    KeyRegistration(KeyRegistrationFields),
    ApplicationCall(ApplicationCallFields),
}

impl TxFields {
    pub fn empty(kind: TxKind) -> Self {
        match kind {
            TxKind::Payment => TxFields::Payment(PaymentFields::default()),
            TxKind::AssetTransfer => TxFields::AssetTransfer(AssetTransferFields::default()),
            TxKind::AssetConfig => TxFields::AssetConfig(AssetConfigFields::default()),
            TxKind::AssetFreeze => TxFields::AssetFreeze(AssetFreezeFields::default()),
            TxKind::KeyRegistration => {
                TxFields::KeyRegistration(KeyRegistrationFields::default())
            }
            TxKind::ApplicationCall => {
                TxFields::ApplicationCall(ApplicationCallFields::default())
            }
        }
    }

    pub fn kind(&self) -> TxKind {
        match self {
            TxFields::Payment(_) => TxKind::Payment,
            TxFields::AssetTransfer(_) => TxKind::AssetTransfer,
            TxFields::AssetConfig(_) => TxKind::AssetConfig,
            TxFields::AssetFreeze(_) => TxKind::AssetFreeze,
            TxFields::KeyRegistration(_) => TxKind::KeyRegistration,
            TxFields::ApplicationCall(_) => TxKind::ApplicationCall,
        }
    }
}

// ─── Draft ──────────────────────────────────────────────────────────────────

/// A not-yet-submitted transaction as entered or imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(flatten)]
    pub fields: TxFields,
}

impl TransactionDraft {
    /// An empty draft of the given kind.
    pub fn new(kind: TxKind) -> Self {
        Self {
            common: CommonFields::default(),
            fields: TxFields::empty(kind),
        }
    }

    pub fn kind(&self) -> TxKind {
        self.fields.kind()
    }

    /// Parse a draft from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the draft to JSON (used for persisted state).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
