//! User settings.
//!
//! Settings seed new drafts and configure the submission engine. They never
//! change how an existing draft is validated or encoded.

use crate::error::StoreError;
use algotx_tx::DraftSeed;
use algotx_types::constants::DEFAULT_CONFIRMATION_ROUNDS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub use_suggested_fee: bool,
    pub use_suggested_rounds: bool,
    /// Clear the stored draft and envelope once a transaction confirms.
    pub always_clear_after_send: bool,
    /// Let composing proceed past validation errors.
    pub ignore_validation_errors: bool,
    pub confirmation_rounds: u64,
    pub manager_is_sender: bool,
    pub freeze_is_sender: bool,
    pub clawback_is_sender: bool,
    pub reserve_is_sender: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_suggested_fee: true,
            use_suggested_rounds: true,
            always_clear_after_send: true,
            ignore_validation_errors: false,
            confirmation_rounds: DEFAULT_CONFIRMATION_ROUNDS,
            manager_is_sender: true,
            freeze_is_sender: true,
            clawback_is_sender: true,
            reserve_is_sender: true,
        }
    }
}

impl Settings {
    /// Load from a JSON file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        match fs::read_to_string(path.as_ref()) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write as JSON, creating the parent directory if needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Initial draft values for `sender`.
    pub fn draft_seed(&self, sender: &str) -> DraftSeed {
        DraftSeed {
            sender: sender.to_string(),
            use_suggested_fee: self.use_suggested_fee,
            use_suggested_rounds: self.use_suggested_rounds,
            manager_is_sender: self.manager_is_sender,
            freeze_is_sender: self.freeze_is_sender,
            clawback_is_sender: self.clawback_is_sender,
            reserve_is_sender: self.reserve_is_sender,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.confirmation_rounds, 10);
        assert!(s.use_suggested_fee);
        assert!(!s.ignore_validation_errors);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{"confirmation_rounds": 20, "freeze_is_sender": false}"#)
                .unwrap();
        assert_eq!(s.confirmation_rounds, 20);
        assert!(!s.freeze_is_sender);
        assert!(s.manager_is_sender);
    }

    #[test]
    fn test_load_missing_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("algotx").join("settings.json");
        assert_eq!(Settings::load(&path).unwrap(), Settings::default());

        let custom = Settings {
            always_clear_after_send: false,
            ..Default::default()
        };
        custom.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), custom);
    }

    #[test]
    fn test_draft_seed() {
        let s = Settings {
            use_suggested_fee: false,
            clawback_is_sender: false,
            ..Default::default()
        };
        let seed = s.draft_seed("SENDER");
        assert_eq!(seed.sender, "SENDER");
        assert!(!seed.use_suggested_fee);
        assert!(!seed.clawback_is_sender);
        assert!(seed.reserve_is_sender);
    }
}
