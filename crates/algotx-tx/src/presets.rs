//! Named presets that seed a draft.
//!
//! A preset picks the transaction kind, fixes the on-complete action for
//! application calls, pre-fills the fields it implies and adds conditional
//! requirements during validation.

use crate::draft::{OnComplete, TransactionDraft, TxFields, TxKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown preset: {0}")]
pub struct UnknownPreset(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Transfer,
    CloseAccount,
    RekeyAccount,
    AssetCreate,
    AssetReconfig,
    AssetDestroy,
    AssetOptIn,
    AssetOptOut,
    AssetSend,
    AssetClawback,
    AssetFreeze,
    AssetUnfreeze,
    RegOnline,
    RegOffline,
    RegNonpart,
    AppCreate,
    AppUpdate,
    AppCall,
    AppOptIn,
    AppCloseOut,
    AppClear,
    AppDelete,
}

impl Preset {
    pub const ALL: [Preset; 22] = [
        Preset::Transfer,
        Preset::CloseAccount,
        Preset::RekeyAccount,
        Preset::AssetCreate,
        Preset::AssetReconfig,
        Preset::AssetDestroy,
        Preset::AssetOptIn,
        Preset::AssetOptOut,
        Preset::AssetSend,
        Preset::AssetClawback,
        Preset::AssetFreeze,
        Preset::AssetUnfreeze,
        Preset::RegOnline,
        Preset::RegOffline,
        Preset::RegNonpart,
        Preset::AppCreate,
        Preset::AppUpdate,
        Preset::AppCall,
        Preset::AppOptIn,
        Preset::AppCloseOut,
        Preset::AppClear,
        Preset::AppDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Transfer => "transfer",
            Preset::CloseAccount => "close_account",
            Preset::RekeyAccount => "rekey_account",
            Preset::AssetCreate => "asset_create",
            Preset::AssetReconfig => "asset_reconfig",
            Preset::AssetDestroy => "asset_destroy",
            Preset::AssetOptIn => "asset_opt_in",
            Preset::AssetOptOut => "asset_opt_out",
            Preset::AssetSend => "asset_send",
            Preset::AssetClawback => "asset_clawback",
            Preset::AssetFreeze => "asset_freeze",
            Preset::AssetUnfreeze => "asset_unfreeze",
            Preset::RegOnline => "reg_online",
            Preset::RegOffline => "reg_offline",
            Preset::RegNonpart => "reg_nonpart",
            Preset::AppCreate => "app_create",
            Preset::AppUpdate => "app_update",
            Preset::AppCall => "app_call",
            Preset::AppOptIn => "app_opt_in",
            Preset::AppCloseOut => "app_close_out",
            Preset::AppClear => "app_clear",
            Preset::AppDelete => "app_delete",
        }
    }

    pub fn kind(&self) -> TxKind {
        match self {
            Preset::Transfer | Preset::CloseAccount | Preset::RekeyAccount => TxKind::Payment,
            Preset::AssetCreate | Preset::AssetReconfig | Preset::AssetDestroy => {
                TxKind::AssetConfig
            }
            Preset::AssetOptIn
            | Preset::AssetOptOut
            | Preset::AssetSend
            | Preset::AssetClawback => TxKind::AssetTransfer,
            Preset::AssetFreeze | Preset::AssetUnfreeze => TxKind::AssetFreeze,
            Preset::RegOnline | Preset::RegOffline | Preset::RegNonpart => {
                TxKind::KeyRegistration
            }
            Preset::AppCreate
            | Preset::AppUpdate
            | Preset::AppCall
            | Preset::AppOptIn
            | Preset::AppCloseOut
            | Preset::AppClear
            | Preset::AppDelete => TxKind::ApplicationCall,
        }
    }

    /// The on-complete action fixed by an application preset.
    pub fn on_complete(&self) -> Option<OnComplete> {
        match self {
            Preset::AppCreate | Preset::AppCall => Some(OnComplete::NoOp),
            Preset::AppUpdate => Some(OnComplete::UpdateApplication),
            Preset::AppOptIn => Some(OnComplete::OptIn),
            Preset::AppCloseOut => Some(OnComplete::CloseOut),
            Preset::AppClear => Some(OnComplete::ClearState),
            Preset::AppDelete => Some(OnComplete::DeleteApplication),
            _ => None,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

/// Initial values taken from user settings when a draft is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSeed {
    pub sender: String,
    pub use_suggested_fee: bool,
    pub use_suggested_rounds: bool,
    pub manager_is_sender: bool,
    pub freeze_is_sender: bool,
    pub clawback_is_sender: bool,
    pub reserve_is_sender: bool,
}

impl Default for DraftSeed {
    fn default() -> Self {
        Self {
            sender: String::new(),
            use_suggested_fee: true,
            use_suggested_rounds: true,
            manager_is_sender: true,
            freeze_is_sender: true,
            clawback_is_sender: true,
            reserve_is_sender: true,
        }
    }
}

impl TransactionDraft {
    /// A draft seeded from settings, optionally shaped by a preset.
    pub fn seeded(kind: TxKind, seed: &DraftSeed) -> Self {
        let mut draft = TransactionDraft::new(kind);
        draft.common.sender = seed.sender.clone();
        draft.common.fee = "0.001".to_string();
        draft.common.use_suggested_fee = seed.use_suggested_fee;
        draft.common.use_suggested_rounds = seed.use_suggested_rounds;
        draft
    }

    pub fn from_preset(preset: Preset, seed: &DraftSeed) -> Self {
        let mut draft = TransactionDraft::seeded(preset.kind(), seed);
        let sender = seed.sender.clone();
        let sender_if = |on: bool| if on { sender.clone() } else { String::new() };

        match &mut draft.fields {
            TxFields::Payment(p) => match preset {
                Preset::CloseAccount => p.amount = "0".into(),
                Preset::RekeyAccount => {
                    p.receiver = sender.clone();
                    p.amount = "0".into();
                }
                _ => {}
            },
            TxFields::AssetTransfer(a) => {
                if matches!(preset, Preset::AssetOptIn | Preset::AssetOptOut) {
                    a.receiver = sender.clone();
                    a.amount = 0;
                }
            }
            TxFields::AssetConfig(c) => {
                if preset == Preset::AssetCreate {
                    c.decimals = Some(0);
                    c.manager = sender_if(seed.manager_is_sender);
                    c.freeze = sender_if(seed.freeze_is_sender);
                    c.clawback = sender_if(seed.clawback_is_sender);
                    c.reserve = sender_if(seed.reserve_is_sender);
                }
            }
            TxFields::AssetFreeze(f) => f.frozen = preset == Preset::AssetFreeze,
            TxFields::KeyRegistration(k) => k.non_participation = preset == Preset::RegNonpart,
            TxFields::ApplicationCall(app) => {
                app.on_complete = preset.on_complete().unwrap_or_default();
                if preset == Preset::AppCreate {
                    app.global_ints = Some(0);
                    app.global_bytes = Some(0);
                    app.local_ints = Some(0);
                    app.local_bytes = Some(0);
                    app.extra_pages = Some(0);
                }
            }
        }
        draft
    }
}
