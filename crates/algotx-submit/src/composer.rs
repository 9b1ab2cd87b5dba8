//! Composer session: the draft being edited, its validation and storage.
//!
//! Every change is a discrete event. The draft is revalidated from scratch
//! and written through the state store after each one.

use crate::error::{ComposeError, ImportError, StoreError};
use crate::settings::Settings;
use crate::store::StateStore;
use algotx_rpc::AssetInfo;
use algotx_tx::{
    decode_transaction, encode_draft, validate, DecodeOptions, DecodedTransaction,
    EncodedTransaction, NetworkParams, Preset, SignedEnvelope, SubmitGate, TransactionDraft,
    TxFields, TxKind, ValidationContext, ValidationResult,
};
use std::sync::Arc;

pub struct Composer {
    draft: TransactionDraft,
    preset: Option<Preset>,
    settings: Settings,
    store: Arc<dyn StateStore>,
    validation: ValidationResult,
}

impl Composer {
    /// Start a fresh draft of `kind` for `sender`.
    pub fn new(
        kind: TxKind,
        sender: &str,
        settings: Settings,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, StoreError> {
        let draft = TransactionDraft::seeded(kind, &settings.draft_seed(sender));
        Self::with_draft(draft, None, settings, store)
    }

    /// Start a fresh draft shaped by `preset`.
    pub fn from_preset(
        preset: Preset,
        sender: &str,
        settings: Settings,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, StoreError> {
        let draft = TransactionDraft::from_preset(preset, &settings.draft_seed(sender));
        Self::with_draft(draft, Some(preset), settings, store)
    }

    /// Resume the stored draft, if any.
    pub fn restore(
        settings: Settings,
        store: Arc<dyn StateStore>,
    ) -> Result<Option<Self>, StoreError> {
        let Some(draft) = store.load_draft()? else {
            return Ok(None);
        };
        let validation = validate(&draft, &ValidationContext::default());
        Ok(Some(Self {
            draft,
            preset: None,
            settings,
            store,
            validation,
        }))
    }

    /// Start from an existing draft, e.g. one loaded from a file.
    pub fn with_draft(
        draft: TransactionDraft,
        preset: Option<Preset>,
        settings: Settings,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, StoreError> {
        let mut composer = Self {
            draft,
            preset,
            settings,
            store,
            validation: ValidationResult::default(),
        };
        composer.commit()?;
        Ok(composer)
    }

    pub fn draft(&self) -> &TransactionDraft {
        &self.draft
    }

    pub fn preset(&self) -> Option<Preset> {
        self.preset
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    fn context(&self) -> ValidationContext {
        ValidationContext {
            preset: self.preset,
        }
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.validation = validate(&self.draft, &self.context());
        self.store.save_draft(&self.draft)
    }

    /// Apply one edit, then revalidate and persist.
    pub fn edit<F>(&mut self, change: F) -> Result<&ValidationResult, StoreError>
    where
        F: FnOnce(&mut TransactionDraft),
    {
        change(&mut self.draft);
        self.commit()?;
        Ok(&self.validation)
    }

    /// Replace the whole draft (a loaded draft file, for instance).
    pub fn replace(&mut self, draft: TransactionDraft) -> Result<&ValidationResult, StoreError> {
        self.draft = draft;
        self.commit()?;
        Ok(&self.validation)
    }

    /// Record display decimals from an asset lookup. Ignored when the draft
    /// has moved on to another asset.
    pub fn apply_asset_info(&mut self, info: &AssetInfo) -> Result<bool, StoreError> {
        match &mut self.draft.fields {
            TxFields::AssetTransfer(f) if f.asset_id == Some(info.index) => {
                f.asset_decimals = Some(info.params.decimals);
            }
            _ => return Ok(false),
        }
        self.commit()?;
        Ok(true)
    }

    /// Gate on validation, then encode.
    pub fn compose(&self, params: &NetworkParams) -> Result<EncodedTransaction, ComposeError> {
        let gate = SubmitGate::evaluate(
            self.validation.clone(),
            self.settings.ignore_validation_errors,
        );
        if let SubmitGate::Blocked(result) = gate {
            return Err(ComposeError::Blocked(result));
        }
        Ok(encode_draft(&self.draft, params)?)
    }

    /// Load a transaction file. On success the draft is replaced and, for
    /// signed input, the envelope is stored and returned. Unsigned input
    /// clears the stored envelope. On failure nothing changes.
    pub fn import(
        &mut self,
        bytes: &[u8],
        params: &NetworkParams,
        options: &DecodeOptions,
    ) -> Result<Option<SignedEnvelope>, ImportError> {
        let decoded = decode_transaction(bytes, params, options)?;
        self.accept(decoded)
    }

    /// Open a session on a transaction file, as [`Composer::import`] does.
    /// Nothing is stored when decoding fails.
    pub fn from_import(
        bytes: &[u8],
        params: &NetworkParams,
        options: &DecodeOptions,
        settings: Settings,
        store: Arc<dyn StateStore>,
    ) -> Result<(Self, Option<SignedEnvelope>), ImportError> {
        let decoded = decode_transaction(bytes, params, options)?;
        let mut composer = Self {
            draft: decoded.draft.clone(),
            preset: None,
            settings,
            store,
            validation: ValidationResult::default(),
        };
        let envelope = composer.accept(decoded)?;
        Ok((composer, envelope))
    }

    fn accept(
        &mut self,
        decoded: DecodedTransaction,
    ) -> Result<Option<SignedEnvelope>, ImportError> {
        log::info!(
            "Imported {} transaction {}",
            decoded.draft.kind().as_str(),
            decoded
                .envelope
                .as_ref()
                .map(|e| e.tx_id.as_str())
                .unwrap_or("(unsigned)")
        );

        match &decoded.envelope {
            Some(envelope) => self.store.save_signed(envelope)?,
            // A stored envelope belongs to the draft being replaced.
            None => self.store.clear_signed()?,
        }
        self.draft = decoded.draft;
        self.preset = None;
        self.commit()?;
        Ok(decoded.envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use algotx_rpc::AssetInfoParams;
    use algotx_tx::validation::keys;
    use algotx_tx::{DecodeError, Field};
    use algotx_types::Address;

    fn sender() -> String {
        Address([1; 32]).to_string()
    }

    fn params() -> NetworkParams {
        NetworkParams::at_round("testnet-v1.0", [7; 32], 1000)
    }

    fn payment(store: Arc<MemoryStore>) -> Composer {
        let mut c = Composer::new(TxKind::Payment, &sender(), Settings::default(), store).unwrap();
        c.edit(|d| {
            if let TxFields::Payment(p) = &mut d.fields {
                p.receiver = Address([2; 32]).to_string();
                p.amount = "5".into();
            }
        })
        .unwrap();
        c
    }

    #[test]
    fn test_new_draft_is_seeded_and_stored() {
        let store = Arc::new(MemoryStore::new());
        let c = Composer::new(
            TxKind::Payment,
            &sender(),
            Settings::default(),
            store.clone(),
        )
        .unwrap();
        assert_eq!(c.draft().common.sender, sender());
        assert!(c.draft().common.use_suggested_fee);
        assert_eq!(store.load_draft().unwrap().as_ref(), Some(c.draft()));
        assert_eq!(
            c.validation().field(Field::Receiver).map(|e| e.key),
            Some(keys::REQUIRED)
        );
    }

    #[test]
    fn test_edit_revalidates() {
        let store = Arc::new(MemoryStore::new());
        let c = payment(store.clone());
        assert!(c.validation().is_valid(), "{:?}", c.validation());
        assert_eq!(store.load_draft().unwrap().as_ref(), Some(c.draft()));
    }

    #[test]
    fn test_compose_encodes_valid_draft() {
        let c = payment(Arc::new(MemoryStore::new()));
        let encoded = c.compose(&params()).unwrap();
        assert_eq!(encoded.transaction.amount, 5_000_000);
        assert_eq!(encoded.id.len(), 52);
    }

    #[test]
    fn test_compose_blocked_by_validation() {
        let store = Arc::new(MemoryStore::new());
        let c = Composer::new(TxKind::Payment, &sender(), Settings::default(), store).unwrap();
        match c.compose(&params()) {
            Err(ComposeError::Blocked(result)) => assert!(result.field(Field::Receiver).is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ignore_validation_errors_reaches_encoder() {
        let settings = Settings {
            ignore_validation_errors: true,
            ..Default::default()
        };
        let store = Arc::new(MemoryStore::new());
        let mut c = Composer::new(TxKind::Payment, &sender(), settings, store).unwrap();
        assert!(matches!(c.compose(&params()), Err(ComposeError::Encode(_))));

        c.edit(|d| {
            if let TxFields::Payment(p) = &mut d.fields {
                p.receiver = Address([2; 32]).to_string();
            }
            d.common.note = "x".repeat(1100);
        })
        .unwrap();
        assert!(!c.validation().is_valid());
        assert!(c.compose(&params()).is_ok());
    }

    #[test]
    fn test_preset_context() {
        let store = Arc::new(MemoryStore::new());
        let c = Composer::from_preset(
            Preset::CloseAccount,
            &sender(),
            Settings::default(),
            store,
        )
        .unwrap();
        assert_eq!(c.preset(), Some(Preset::CloseAccount));
        assert_eq!(
            c.validation().field(Field::CloseRemainderTo).map(|e| e.key),
            Some(keys::REQUIRED)
        );
    }

    #[test]
    fn test_import_unsigned() {
        let source = payment(Arc::new(MemoryStore::new()));
        let encoded = source.compose(&params()).unwrap();

        let store = Arc::new(MemoryStore::new());
        let mut c = Composer::new(
            TxKind::AssetFreeze,
            &sender(),
            Settings::default(),
            store.clone(),
        )
        .unwrap();
        let envelope = c
            .import(&encoded.bytes, &params(), &DecodeOptions::default())
            .unwrap();
        assert!(envelope.is_none());
        assert_eq!(c.draft().kind(), TxKind::Payment);
        assert_eq!(store.load_draft().unwrap().unwrap().kind(), TxKind::Payment);
        assert!(store.load_signed().unwrap().is_none());
    }

    #[test]
    fn test_import_signed_stores_envelope() {
        let source = payment(Arc::new(MemoryStore::new()));
        let encoded = source.compose(&params()).unwrap();
        let signed =
            SignedEnvelope::from_signature(&encoded.transaction, [3; 64], None).unwrap();

        let store = Arc::new(MemoryStore::new());
        let mut c = Composer::new(
            TxKind::Payment,
            &sender(),
            Settings::default(),
            store.clone(),
        )
        .unwrap();
        let envelope = c
            .import(&signed.bytes, &params(), &DecodeOptions::default())
            .unwrap();
        assert_eq!(envelope.as_ref(), Some(&signed));
        assert_eq!(store.load_signed().unwrap(), Some(signed));
    }

    #[test]
    fn test_unsigned_import_clears_stored_envelope() {
        let first = payment(Arc::new(MemoryStore::new()));
        let first_tx = first.compose(&params()).unwrap();
        let signed =
            SignedEnvelope::from_signature(&first_tx.transaction, [3; 64], None).unwrap();

        let mut second = payment(Arc::new(MemoryStore::new()));
        second.edit(|d| d.common.note = "second".into()).unwrap();
        let second_tx = second.compose(&params()).unwrap();
        assert_ne!(first_tx.id, second_tx.id);

        let store = Arc::new(MemoryStore::new());
        let mut c = payment(store.clone());
        c.import(&signed.bytes, &params(), &DecodeOptions::default()).unwrap();
        c.edit(|d| {
            if let TxFields::Payment(p) = &mut d.fields {
                p.amount = "9".into();
            }
        })
        .unwrap();
        assert_eq!(store.load_signed().unwrap(), Some(signed));

        c.import(&second_tx.bytes, &params(), &DecodeOptions::default())
            .unwrap();
        assert_eq!(c.draft().common.note, "second");
        assert!(store.load_signed().unwrap().is_none());
    }

    #[test]
    fn test_from_import() {
        let source = payment(Arc::new(MemoryStore::new()));
        let encoded = source.compose(&params()).unwrap();
        let signed =
            SignedEnvelope::from_signature(&encoded.transaction, [3; 64], None).unwrap();

        let store = Arc::new(MemoryStore::new());
        let mainnet = NetworkParams::at_round("mainnet-v1.0", [0xC0; 32], 1000);
        assert!(Composer::from_import(
            &signed.bytes,
            &mainnet,
            &DecodeOptions::default(),
            Settings::default(),
            store.clone(),
        )
        .is_err());
        assert!(store.load_draft().unwrap().is_none());

        let (c, envelope) = Composer::from_import(
            &signed.bytes,
            &params(),
            &DecodeOptions::default(),
            Settings::default(),
            store.clone(),
        )
        .unwrap();
        assert_eq!(envelope.as_ref(), Some(&signed));
        assert_eq!(store.load_draft().unwrap().as_ref(), Some(c.draft()));
        assert_eq!(store.load_signed().unwrap(), Some(signed));
    }

    #[test]
    fn test_failed_import_leaves_state_untouched() {
        let source = payment(Arc::new(MemoryStore::new()));
        let encoded = source.compose(&params()).unwrap();
        let mainnet = NetworkParams::at_round("mainnet-v1.0", [0xC0; 32], 1000);

        let store = Arc::new(MemoryStore::new());
        let mut c = Composer::new(
            TxKind::AssetFreeze,
            &sender(),
            Settings::default(),
            store.clone(),
        )
        .unwrap();
        let before = store.load_draft().unwrap();

        let err = c
            .import(&encoded.bytes, &mainnet, &DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::Decode(DecodeError::NetworkMismatch { .. })
        ));
        assert!(c.import(b"garbage", &params(), &DecodeOptions::default()).is_err());

        assert_eq!(c.draft().kind(), TxKind::AssetFreeze);
        assert_eq!(store.load_draft().unwrap(), before);
        assert!(store.load_signed().unwrap().is_none());
    }

    #[test]
    fn test_apply_asset_info() {
        let store = Arc::new(MemoryStore::new());
        let mut c =
            Composer::new(TxKind::AssetTransfer, &sender(), Settings::default(), store).unwrap();
        c.edit(|d| {
            if let TxFields::AssetTransfer(f) = &mut d.fields {
                f.asset_id = Some(10);
            }
        })
        .unwrap();

        let info = |index| AssetInfo {
            index,
            params: AssetInfoParams {
                decimals: 2,
                ..Default::default()
            },
        };
        assert!(!c.apply_asset_info(&info(11)).unwrap());
        assert!(c.apply_asset_info(&info(10)).unwrap());
        match &c.draft().fields {
            TxFields::AssetTransfer(f) => assert_eq!(f.asset_decimals, Some(2)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_restore() {
        let store = Arc::new(MemoryStore::new());
        assert!(Composer::restore(Settings::default(), store.clone())
            .unwrap()
            .is_none());
        let c = payment(store.clone());
        let restored = Composer::restore(Settings::default(), store)
            .unwrap()
            .unwrap();
        assert_eq!(restored.draft(), c.draft());
        assert!(restored.validation().is_valid());
    }
}
