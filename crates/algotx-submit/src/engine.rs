//! Submission engine.
//!
//! Sends a signed envelope and waits a bounded number of rounds for its
//! confirmation:
//!
//! ```text
//! Idle -> Sending -> WaitingConfirmation -> Confirmed
//!                                        -> FailedError
//!                                        -> FailedTimeoutWarning
//! ```
//!
//! Failed states accept `retry` (full resend). The timeout warning also
//! accepts `wait_longer`, which polls the known transaction id again
//! without resending. Only one send/wait cycle runs at a time; triggers
//! arriving while one is in flight are coalesced. Every attempt carries a
//! generation number so a result for an abandoned attempt is dropped.

use crate::broadcast::Broadcaster;
use crate::error::{is_confirmation_timeout, EngineError, SubmissionError};
use crate::settings::Settings;
use crate::store::StateStore;
use algotx_rpc::PendingTransaction;
use algotx_tx::SignedEnvelope;
use algotx_types::constants::DEFAULT_CONFIRMATION_ROUNDS;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Sending,
    WaitingConfirmation {
        tx_id: String,
    },
    Confirmed {
        tx_id: String,
        response: PendingTransaction,
    },
    FailedError(SubmissionError),
    /// The round budget ran out. Not an error: the transaction may still
    /// confirm later.
    FailedTimeoutWarning {
        tx_id: String,
        rounds: u64,
    },
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Sending => "sending",
            SubmissionState::WaitingConfirmation { .. } => "waiting_confirmation",
            SubmissionState::Confirmed { .. } => "confirmed",
            SubmissionState::FailedError(_) => "failed_error",
            SubmissionState::FailedTimeoutWarning { .. } => "failed_timeout_warning",
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SubmissionState::Sending | SubmissionState::WaitingConfirmation { .. }
        )
    }

    /// Transaction id known for this state, if any.
    pub fn tx_id(&self) -> Option<&str> {
        match self {
            SubmissionState::WaitingConfirmation { tx_id }
            | SubmissionState::Confirmed { tx_id, .. }
            | SubmissionState::FailedTimeoutWarning { tx_id, .. } => Some(tx_id),
            _ => None,
        }
    }
}

/// Engine notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    /// Attempt `generation` moved to `state`.
    Transition {
        generation: u64,
        state: SubmissionState,
    },
    /// A trigger arrived while an attempt was in flight and was ignored.
    Coalesced { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub confirmation_rounds: u64,
    /// Clear the stored draft and envelope after confirmation.
    pub clear_after_send: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confirmation_rounds: DEFAULT_CONFIRMATION_ROUNDS,
            clear_after_send: true,
        }
    }
}

impl From<&Settings> for EngineConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            confirmation_rounds: settings.confirmation_rounds,
            clear_after_send: settings.always_clear_after_send,
        }
    }
}

struct Inner {
    state: SubmissionState,
    envelope: Option<SignedEnvelope>,
    generation: u64,
    in_flight: bool,
}

enum Start {
    Send(Vec<u8>),
    Wait(String),
}

pub struct SubmissionEngine<B> {
    broadcaster: B,
    store: Arc<dyn StateStore>,
    config: EngineConfig,
    inner: Mutex<Inner>,
    events: Option<UnboundedSender<SubmissionEvent>>,
}

impl<B: Broadcaster> SubmissionEngine<B> {
    pub fn new(broadcaster: B, store: Arc<dyn StateStore>, config: EngineConfig) -> Self {
        Self {
            broadcaster,
            store,
            config,
            inner: Mutex::new(Inner {
                state: SubmissionState::Idle,
                envelope: None,
                generation: 0,
                in_flight: false,
            }),
            events: None,
        }
    }

    /// Report transitions on `events`.
    pub fn with_events(mut self, events: UnboundedSender<SubmissionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }

    pub fn state(&self) -> SubmissionState {
        self.lock().state.clone()
    }

    /// The envelope the next `retry` would send.
    pub fn envelope(&self) -> Option<SignedEnvelope> {
        self.lock().envelope.clone()
    }

    /// A signed envelope became available: store it and send it.
    pub async fn envelope_available(
        &self,
        envelope: SignedEnvelope,
    ) -> Result<SubmissionState, EngineError> {
        let bytes = envelope.bytes.clone();
        let started = self.begin(|inner| {
            inner.envelope = Some(envelope.clone());
            Ok(Start::Send(bytes))
        })?;
        let Some((generation, start)) = started else {
            return Ok(self.state());
        };

        if let Err(e) = self.store.save_signed(&envelope) {
            log::warn!("Failed to persist signed transaction: {}", e);
        }
        self.run(generation, start).await;
        Ok(self.state())
    }

    /// A transaction file was imported. Signed input is sent right away;
    /// unsigned input replaces whatever was signed before, so the held
    /// envelope and any attempt for it are dropped.
    pub async fn transaction_imported(
        &self,
        envelope: Option<SignedEnvelope>,
    ) -> Result<SubmissionState, EngineError> {
        match envelope {
            Some(envelope) => self.envelope_available(envelope).await,
            None => {
                self.reset();
                Ok(self.state())
            }
        }
    }

    /// Resend the current envelope, falling back to the stored one.
    pub async fn retry(&self) -> Result<SubmissionState, EngineError> {
        let stored = if self.lock().envelope.is_none() {
            self.store.load_signed()?
        } else {
            None
        };

        let started = self.begin(|inner| {
            if inner.envelope.is_none() {
                inner.envelope = stored;
            }
            let envelope = inner.envelope.as_ref().ok_or(EngineError::NoEnvelope)?;
            Ok(Start::Send(envelope.bytes.clone()))
        })?;
        let Some((generation, start)) = started else {
            return Ok(self.state());
        };

        self.run(generation, start).await;
        Ok(self.state())
    }

    /// Keep waiting for the transaction that timed out, without resending.
    pub async fn wait_longer(&self) -> Result<SubmissionState, EngineError> {
        let started = self.begin(|inner| match &inner.state {
            SubmissionState::FailedTimeoutWarning { tx_id, .. } => Ok(Start::Wait(tx_id.clone())),
            _ => Err(EngineError::NothingPending),
        })?;
        let Some((generation, start)) = started else {
            return Ok(self.state());
        };

        self.run(generation, start).await;
        Ok(self.state())
    }

    /// Abandon any attempt and return to `Idle`. A result still on its way
    /// for the abandoned attempt is discarded.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.in_flight = false;
        inner.envelope = None;
        inner.state = SubmissionState::Idle;
        log::info!("Submission reset (generation {})", inner.generation);
        self.emit(SubmissionEvent::Transition {
            generation: inner.generation,
            state: SubmissionState::Idle,
        });
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SubmissionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Claim the in-flight guard. `None` when an attempt is already running.
    fn begin<F>(&self, prepare: F) -> Result<Option<(u64, Start)>, EngineError>
    where
        F: FnOnce(&mut Inner) -> Result<Start, EngineError>,
    {
        let mut inner = self.lock();
        if inner.in_flight {
            log::debug!(
                "Submission trigger ignored: attempt {} in flight ({})",
                inner.generation,
                inner.state.name()
            );
            self.emit(SubmissionEvent::Coalesced {
                generation: inner.generation,
            });
            return Ok(None);
        }

        let start = prepare(&mut inner)?;
        inner.in_flight = true;
        inner.generation += 1;
        let state = match &start {
            Start::Send(_) => SubmissionState::Sending,
            Start::Wait(tx_id) => SubmissionState::WaitingConfirmation {
                tx_id: tx_id.clone(),
            },
        };
        log::info!("Submission {}: {}", inner.generation, state.name());
        inner.state = state.clone();
        self.emit(SubmissionEvent::Transition {
            generation: inner.generation,
            state,
        });
        Ok(Some((inner.generation, start)))
    }

    /// Apply `state` if `generation` is still current. Terminal states
    /// release the in-flight guard.
    fn transition(&self, generation: u64, state: SubmissionState) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            log::debug!(
                "Dropping {} for superseded attempt {} (current {})",
                state.name(),
                generation,
                inner.generation
            );
            return false;
        }
        if !state.is_in_flight() {
            inner.in_flight = false;
        }
        log::info!("Submission {}: {}", generation, state.name());
        inner.state = state.clone();
        self.emit(SubmissionEvent::Transition { generation, state });
        true
    }

    async fn run(&self, generation: u64, start: Start) {
        let tx_id = match start {
            Start::Send(bytes) => match self.broadcaster.send(&bytes).await {
                Ok(tx_id) => {
                    let waiting = SubmissionState::WaitingConfirmation {
                        tx_id: tx_id.clone(),
                    };
                    if !self.transition(generation, waiting) {
                        return;
                    }
                    tx_id
                }
                Err(e) => {
                    let err = SubmissionError::from_send(&e);
                    log::warn!("Send failed: {}", err);
                    self.transition(generation, SubmissionState::FailedError(err));
                    return;
                }
            },
            Start::Wait(tx_id) => tx_id,
        };

        let rounds = self.config.confirmation_rounds;
        let next = match self.broadcaster.wait_for_confirmation(&tx_id, rounds).await {
            Ok(response) => SubmissionState::Confirmed { tx_id, response },
            Err(e) if is_confirmation_timeout(&e) => {
                log::warn!("Transaction {} not confirmed after {} rounds", tx_id, rounds);
                SubmissionState::FailedTimeoutWarning { tx_id, rounds }
            }
            Err(e) => {
                let err = SubmissionError::from_confirmation(&e);
                log::warn!("Confirmation failed: {}", err);
                SubmissionState::FailedError(err)
            }
        };

        let confirmed = matches!(next, SubmissionState::Confirmed { .. });
        if self.transition(generation, next) && confirmed && self.config.clear_after_send {
            self.clear_stored();
        }
    }

    fn clear_stored(&self) {
        self.lock().envelope = None;
        if let Err(e) = self.store.clear_signed() {
            log::warn!("Failed to clear signed transaction: {}", e);
        }
        if let Err(e) = self.store.clear_draft() {
            log::warn!("Failed to clear draft: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::Composer;
    use crate::error::SubmissionErrorKind;
    use crate::store::MemoryStore;
    use algotx_rpc::RpcError;
    use algotx_tx::{
        encode_draft, DecodeOptions, NetworkParams, TransactionDraft, TxFields, TxKind,
    };
    use algotx_types::Address;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct MockNode {
        sends: AtomicUsize,
        polls: AtomicUsize,
        send_results: Mutex<VecDeque<Result<String, RpcError>>>,
        poll_results: Mutex<VecDeque<Result<PendingTransaction, RpcError>>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockNode {
        fn polls(results: Vec<Result<PendingTransaction, RpcError>>) -> Self {
            Self {
                poll_results: Mutex::new(results.into()),
                ..Default::default()
            }
        }

        fn sends(&self) -> usize {
            self.sends.load(Ordering::SeqCst)
        }

        fn poll_count(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    impl Broadcaster for MockNode {
        async fn send(&self, _signed: &[u8]) -> Result<String, RpcError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            let next = self.send_results.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok("TXID".to_string()))
        }

        async fn wait_for_confirmation(
            &self,
            _tx_id: &str,
            _rounds: u64,
        ) -> Result<PendingTransaction, RpcError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let next = self.poll_results.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(confirmed()))
        }
    }

    fn confirmed() -> PendingTransaction {
        PendingTransaction {
            confirmed_round: Some(5),
            ..Default::default()
        }
    }

    fn not_confirmed() -> RpcError {
        RpcError::NotConfirmed {
            tx_id: "TXID".into(),
            rounds: 10,
        }
    }

    fn envelope() -> SignedEnvelope {
        let mut d = TransactionDraft::new(TxKind::Payment);
        d.common.sender = Address([1; 32]).to_string();
        d.common.fee = "0.001".into();
        d.common.use_suggested_rounds = true;
        if let TxFields::Payment(p) = &mut d.fields {
            p.receiver = Address([2; 32]).to_string();
            p.amount = "1".into();
        }
        let params = NetworkParams::at_round("testnet-v1.0", [7; 32], 1000);
        let encoded = encode_draft(&d, &params).unwrap();
        SignedEnvelope::from_signature(&encoded.transaction, [9; 64], None).unwrap()
    }

    fn engine(node: MockNode) -> (SubmissionEngine<MockNode>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = SubmissionEngine::new(node, store.clone(), EngineConfig::default());
        (engine, store)
    }

    #[tokio::test]
    async fn test_envelope_triggers_send_and_confirms() {
        let (engine, store) = engine(MockNode::default());
        store
            .save_draft(&TransactionDraft::new(TxKind::Payment))
            .unwrap();

        let state = engine.envelope_available(envelope()).await.unwrap();
        assert_eq!(
            state,
            SubmissionState::Confirmed {
                tx_id: "TXID".into(),
                response: confirmed()
            }
        );
        assert_eq!(engine.broadcaster().sends(), 1);
        assert!(store.load_signed().unwrap().is_none());
        assert!(store.load_draft().unwrap().is_none());
        assert!(engine.envelope().is_none());
    }

    #[tokio::test]
    async fn test_keep_state_when_clear_disabled() {
        let store = Arc::new(MemoryStore::new());
        let engine = SubmissionEngine::new(
            MockNode::default(),
            store.clone(),
            EngineConfig {
                clear_after_send: false,
                ..Default::default()
            },
        );
        engine.envelope_available(envelope()).await.unwrap();
        assert_eq!(store.load_signed().unwrap(), Some(envelope()));
    }

    #[tokio::test]
    async fn test_retry_after_timeout_resends() {
        let (engine, _store) = engine(MockNode::polls(vec![Err(not_confirmed())]));

        let state = engine.envelope_available(envelope()).await.unwrap();
        assert_eq!(
            state,
            SubmissionState::FailedTimeoutWarning {
                tx_id: "TXID".into(),
                rounds: 10
            }
        );

        let state = engine.retry().await.unwrap();
        assert_eq!(state.name(), "confirmed");
        assert_eq!(engine.broadcaster().sends(), 2);
        assert_eq!(engine.broadcaster().poll_count(), 2);
    }

    #[tokio::test]
    async fn test_wait_longer_does_not_resend() {
        let (engine, _store) = engine(MockNode::polls(vec![Err(not_confirmed())]));

        engine.envelope_available(envelope()).await.unwrap();
        let state = engine.wait_longer().await.unwrap();
        assert_eq!(state.tx_id(), Some("TXID"));
        assert_eq!(state.name(), "confirmed");
        assert_eq!(engine.broadcaster().sends(), 1);
        assert_eq!(engine.broadcaster().poll_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_trigger_is_coalesced() {
        let gate = Arc::new(Notify::new());
        let (engine, _store) = engine(MockNode {
            gate: Some(gate.clone()),
            ..Default::default()
        });

        let (first, second) = tokio::join!(engine.envelope_available(envelope()), async {
            tokio::task::yield_now().await;
            let state = engine.retry().await.unwrap();
            gate.notify_one();
            state
        });

        assert_eq!(
            second,
            SubmissionState::WaitingConfirmation {
                tx_id: "TXID".into()
            }
        );
        assert_eq!(first.unwrap().name(), "confirmed");
        assert_eq!(engine.broadcaster().sends(), 1);
        assert_eq!(engine.broadcaster().poll_count(), 1);
    }

    #[tokio::test]
    async fn test_reset_discards_stale_result() {
        let gate = Arc::new(Notify::new());
        let (engine, _store) = engine(MockNode {
            gate: Some(gate.clone()),
            ..Default::default()
        });

        let (first, _) = tokio::join!(engine.envelope_available(envelope()), async {
            tokio::task::yield_now().await;
            engine.reset();
            gate.notify_one();
        });

        assert_eq!(first.unwrap(), SubmissionState::Idle);
        assert_eq!(engine.state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_send_failure_classified() {
        let node = MockNode::default();
        node.send_results
            .lock()
            .unwrap()
            .push_back(Err(RpcError::HttpStatus {
                method: "POST".into(),
                url: "http://node/v2/transactions".into(),
                status: 503,
                body: "unavailable".into(),
            }));
        let (engine, _store) = engine(node);

        let state = engine.envelope_available(envelope()).await.unwrap();
        match state {
            SubmissionState::FailedError(err) => {
                assert_eq!(err.kind, SubmissionErrorKind::Server);
                assert_eq!(err.status, Some(503));
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(engine.broadcaster().poll_count(), 0);
    }

    #[tokio::test]
    async fn test_pool_rejection_classified() {
        let (engine, store) = engine(MockNode::polls(vec![Err(RpcError::Rejected {
            tx_id: "TXID".into(),
            pool_error: "overspend".into(),
        })]));

        let state = engine.envelope_available(envelope()).await.unwrap();
        match state {
            SubmissionState::FailedError(err) => {
                assert_eq!(err.kind, SubmissionErrorKind::Rejected)
            }
            other => panic!("unexpected state {:?}", other),
        }
        // Failed attempts keep the envelope for a retry.
        assert!(store.load_signed().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_preconditions() {
        let (engine, _store) = engine(MockNode::default());
        assert!(matches!(
            engine.wait_longer().await,
            Err(EngineError::NothingPending)
        ));
        assert!(matches!(engine.retry().await, Err(EngineError::NoEnvelope)));
        assert_eq!(engine.state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_retry_uses_stored_envelope() {
        let (engine, store) = engine(MockNode::default());
        store.save_signed(&envelope()).unwrap();

        let state = engine.retry().await.unwrap();
        assert_eq!(state.name(), "confirmed");
        assert_eq!(engine.broadcaster().sends(), 1);
    }

    #[tokio::test]
    async fn test_events() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let (engine, _store) = engine(MockNode::default());
        let engine = engine.with_events(tx);

        engine.envelope_available(envelope()).await.unwrap();
        drop(engine);

        let mut names = Vec::new();
        while let Some(event) = rx.recv().await {
            if let SubmissionEvent::Transition { generation, state } = event {
                assert_eq!(generation, 1);
                names.push(state.name());
            }
        }
        assert_eq!(names, ["sending", "waiting_confirmation", "confirmed"]);
    }

    #[tokio::test]
    async fn test_unsigned_import_drops_previous_envelope() {
        let node = MockNode::default();
        node.send_results
            .lock()
            .unwrap()
            .push_back(Err(RpcError::HttpStatus {
                method: "POST".into(),
                url: "http://node/v2/transactions".into(),
                status: 503,
                body: "unavailable".into(),
            }));
        let (engine, store) = engine(node);

        let signed = envelope();
        let state = engine.transaction_imported(Some(signed.clone())).await.unwrap();
        assert_eq!(state.name(), "failed_error");
        assert_eq!(engine.envelope(), Some(signed.clone()));
        assert_eq!(store.load_signed().unwrap(), Some(signed));

        // Replace it with an unsigned transaction through a composer session.
        let params = NetworkParams::at_round("testnet-v1.0", [7; 32], 1000);
        let mut composer = Composer::new(
            TxKind::Payment,
            &Address([1; 32]).to_string(),
            Settings::default(),
            store.clone(),
        )
        .unwrap();
        composer
            .edit(|d| {
                if let TxFields::Payment(p) = &mut d.fields {
                    p.receiver = Address([3; 32]).to_string();
                    p.amount = "2".into();
                }
            })
            .unwrap();
        let unsigned = composer.compose(&params).unwrap();
        let imported = composer
            .import(&unsigned.bytes, &params, &DecodeOptions::default())
            .unwrap();
        let state = engine.transaction_imported(imported).await.unwrap();

        assert_eq!(state, SubmissionState::Idle);
        assert!(engine.envelope().is_none());
        assert!(store.load_signed().unwrap().is_none());
        assert!(matches!(engine.retry().await, Err(EngineError::NoEnvelope)));
        assert_eq!(engine.broadcaster().sends(), 1);
    }
}
