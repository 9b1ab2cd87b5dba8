//! Persisted draft and signed-envelope state.
//!
//! Two independent slots: the draft as JSON and the signed envelope as a
//! Base64 data URL. Either can be cleared without touching the other.

use crate::error::StoreError;
use algotx_tx::{SignedEnvelope, TransactionDraft};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const DRAFT_FILE: &str = "draft.json";
pub const SIGNED_FILE: &str = "signed.txt";

pub trait StateStore: Send + Sync {
    fn load_draft(&self) -> Result<Option<TransactionDraft>, StoreError>;
    fn save_draft(&self, draft: &TransactionDraft) -> Result<(), StoreError>;
    fn clear_draft(&self) -> Result<(), StoreError>;

    fn load_signed(&self) -> Result<Option<SignedEnvelope>, StoreError>;
    fn save_signed(&self, envelope: &SignedEnvelope) -> Result<(), StoreError>;
    fn clear_signed(&self) -> Result<(), StoreError>;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store holding the serialized forms.
#[derive(Debug, Default)]
pub struct MemoryStore {
    draft: Mutex<Option<String>>,
    signed: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(slot: &Mutex<Option<String>>) -> Result<Option<String>, StoreError> {
        Ok(slot.lock().map_err(|_| StoreError::Poisoned)?.clone())
    }

    fn set(slot: &Mutex<Option<String>>, value: Option<String>) -> Result<(), StoreError> {
        *slot.lock().map_err(|_| StoreError::Poisoned)? = value;
        Ok(())
    }
}

impl StateStore for MemoryStore {
    fn load_draft(&self) -> Result<Option<TransactionDraft>, StoreError> {
        Self::get(&self.draft)?
            .map(|json| TransactionDraft::from_json(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    fn save_draft(&self, draft: &TransactionDraft) -> Result<(), StoreError> {
        Self::set(&self.draft, Some(draft.to_json()?))
    }

    fn clear_draft(&self) -> Result<(), StoreError> {
        Self::set(&self.draft, None)
    }

    fn load_signed(&self) -> Result<Option<SignedEnvelope>, StoreError> {
        Self::get(&self.signed)?
            .map(|url| SignedEnvelope::from_data_url(&url))
            .transpose()
            .map_err(StoreError::from)
    }

    fn save_signed(&self, envelope: &SignedEnvelope) -> Result<(), StoreError> {
        Self::set(&self.signed, Some(envelope.to_data_url()))
    }

    fn clear_signed(&self) -> Result<(), StoreError> {
        Self::set(&self.signed, None)
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// Directory-backed store (`draft.json`, `signed.txt`).
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a state directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, name: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.dir.join(name)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, contents: &str) -> Result<(), StoreError> {
        // Write-then-rename so a crash never leaves a truncated file.
        let tmp = self.dir.join(format!("{}.tmp", name));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, self.dir.join(name))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.dir.join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl StateStore for FileStore {
    fn load_draft(&self) -> Result<Option<TransactionDraft>, StoreError> {
        self.read(DRAFT_FILE)?
            .map(|json| TransactionDraft::from_json(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    fn save_draft(&self, draft: &TransactionDraft) -> Result<(), StoreError> {
        self.write(DRAFT_FILE, &draft.to_json()?)
    }

    fn clear_draft(&self) -> Result<(), StoreError> {
        self.remove(DRAFT_FILE)
    }

    fn load_signed(&self) -> Result<Option<SignedEnvelope>, StoreError> {
        self.read(SIGNED_FILE)?
            .map(|url| SignedEnvelope::from_data_url(&url))
            .transpose()
            .map_err(StoreError::from)
    }

    fn save_signed(&self, envelope: &SignedEnvelope) -> Result<(), StoreError> {
        self.write(SIGNED_FILE, &envelope.to_data_url())
    }

    fn clear_signed(&self) -> Result<(), StoreError> {
        self.remove(SIGNED_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algotx_tx::{NetworkParams, TxKind};
    use algotx_types::Address;

    fn draft() -> TransactionDraft {
        let mut d = TransactionDraft::new(TxKind::Payment);
        d.common.sender = Address([1; 32]).to_string();
        d.common.note = "stored".into();
        d
    }

    fn envelope() -> SignedEnvelope {
        let mut d = draft();
        d.common.fee = "0.001".into();
        d.common.use_suggested_rounds = true;
        if let algotx_tx::TxFields::Payment(p) = &mut d.fields {
            p.receiver = Address([2; 32]).to_string();
            p.amount = "1".into();
        }
        let params = NetworkParams::at_round("testnet-v1.0", [7; 32], 1000);
        let encoded = algotx_tx::encode_draft(&d, &params).unwrap();
        SignedEnvelope::from_signature(&encoded.transaction, [9; 64], None).unwrap()
    }

    fn exercise(store: &dyn StateStore) {
        assert!(store.load_draft().unwrap().is_none());
        assert!(store.load_signed().unwrap().is_none());

        store.save_draft(&draft()).unwrap();
        store.save_signed(&envelope()).unwrap();
        assert_eq!(store.load_draft().unwrap(), Some(draft()));
        assert_eq!(store.load_signed().unwrap(), Some(envelope()));

        store.clear_signed().unwrap();
        assert!(store.load_signed().unwrap().is_none());
        assert_eq!(store.load_draft().unwrap(), Some(draft()));

        store.clear_draft().unwrap();
        store.clear_draft().unwrap();
        assert!(store.load_draft().unwrap().is_none());
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("state")).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_file_store_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.save_signed(&envelope()).unwrap();
        let text = fs::read_to_string(dir.path().join(SIGNED_FILE)).unwrap();
        assert!(text.starts_with("data:application/octet-stream;base64,"));
        assert!(!dir.path().join(DRAFT_FILE).exists());
    }

    #[test]
    fn test_corrupt_signed_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join(SIGNED_FILE), "not a data url").unwrap();
        assert!(matches!(
            store.load_signed(),
            Err(StoreError::Envelope(_))
        ));
    }
}
