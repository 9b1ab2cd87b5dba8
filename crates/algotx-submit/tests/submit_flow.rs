//! Compose → sign → submit against a mock node.

use algotx_rpc::{NodeRpc, PendingTransaction, RpcConfig};
use algotx_submit::{
    Composer, EngineConfig, FileStore, Settings, StateStore, SubmissionEngine,
    SubmissionErrorKind, SubmissionState,
};
use algotx_tx::{sign_transaction, NetworkParams, SignerError, TransactionSigner, TxFields, TxKind};
use algotx_types::Address;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestSigner;

impl TransactionSigner for TestSigner {
    fn address(&self) -> Address {
        Address([1; 32])
    }

    async fn sign(&self, _bytes_to_sign: &[u8]) -> Result<[u8; 64], SignerError> {
        Ok([0x11; 64])
    }
}

fn params() -> NetworkParams {
    NetworkParams::at_round("testnet-v1.0", [0x48; 32], 2000)
}

fn node(server: &MockServer) -> NodeRpc {
    NodeRpc::with_config(RpcConfig {
        url: server.uri(),
        retry_delay: Duration::from_millis(5),
        ..Default::default()
    })
}

async fn mount_rounds(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "last-round": 2000 })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v2/status/wait-for-block-after/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "last-round": 2001 })))
        .mount(server)
        .await;
}

fn pending(p: &PendingTransaction) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_bytes(rmp_serde::to_vec_named(p).unwrap())
}

async fn composed_envelope(store: Arc<dyn StateStore>) -> algotx_tx::SignedEnvelope {
    let mut composer = Composer::new(
        TxKind::Payment,
        &Address([1; 32]).to_string(),
        Settings::default(),
        store,
    )
    .unwrap();
    composer
        .edit(|d| {
            if let TxFields::Payment(p) = &mut d.fields {
                p.receiver = Address([2; 32]).to_string();
                p.amount = "1.5".into();
            }
        })
        .unwrap();
    let encoded = composer.compose(&params()).unwrap();
    sign_transaction(&TestSigner, &encoded.transaction)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_full_flow_confirms_and_clears_state() {
    let server = MockServer::start().await;
    mount_rounds(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn StateStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let envelope = composed_envelope(store.clone()).await;

    Mock::given(method("POST"))
        .and(path("/v2/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "txId": envelope.tx_id })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/transactions/pending/{}", envelope.tx_id)))
        .respond_with(pending(&PendingTransaction {
            confirmed_round: Some(2001),
            ..Default::default()
        }))
        .mount(&server)
        .await;

    let engine = SubmissionEngine::new(
        node(&server),
        store.clone(),
        EngineConfig::from(&Settings::default()),
    );
    let state = engine.envelope_available(envelope.clone()).await.unwrap();

    match state {
        SubmissionState::Confirmed { tx_id, response } => {
            assert_eq!(tx_id, envelope.tx_id);
            assert_eq!(response.confirmed_round, Some(2001));
        }
        other => panic!("unexpected state {:?}", other),
    }
    assert!(store.load_draft().unwrap().is_none());
    assert!(store.load_signed().unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_then_retry() {
    let server = MockServer::start().await;
    mount_rounds(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn StateStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let envelope = composed_envelope(store.clone()).await;

    Mock::given(method("POST"))
        .and(path("/v2/transactions"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "txId": envelope.tx_id })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/transactions/pending/{}", envelope.tx_id)))
        .respond_with(pending(&PendingTransaction {
            confirmed_round: Some(2001),
            ..Default::default()
        }))
        .mount(&server)
        .await;

    let engine = SubmissionEngine::new(node(&server), store.clone(), EngineConfig::default());
    match engine.envelope_available(envelope.clone()).await.unwrap() {
        SubmissionState::FailedError(err) => {
            assert_eq!(err.kind, SubmissionErrorKind::Server);
            assert_eq!(err.status, Some(503));
        }
        other => panic!("unexpected state {:?}", other),
    }
    assert_eq!(store.load_signed().unwrap(), Some(envelope));

    let state = engine.retry().await.unwrap();
    assert_eq!(state.name(), "confirmed");
}

#[tokio::test]
async fn test_timeout_then_wait_longer() {
    let server = MockServer::start().await;
    mount_rounds(&server).await;

    let store: Arc<dyn StateStore> = Arc::new(algotx_submit::MemoryStore::new());
    let envelope = composed_envelope(store.clone()).await;

    Mock::given(method("POST"))
        .and(path("/v2/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "txId": envelope.tx_id })))
        .expect(1)
        .mount(&server)
        .await;
    // Two rounds of "still pending", then confirmed.
    Mock::given(method("GET"))
        .and(path(format!("/v2/transactions/pending/{}", envelope.tx_id)))
        .respond_with(pending(&PendingTransaction::default()))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/transactions/pending/{}", envelope.tx_id)))
        .respond_with(pending(&PendingTransaction {
            confirmed_round: Some(2003),
            ..Default::default()
        }))
        .mount(&server)
        .await;

    let engine = SubmissionEngine::new(
        node(&server),
        store,
        EngineConfig {
            confirmation_rounds: 2,
            clear_after_send: true,
        },
    );
    let state = engine.envelope_available(envelope.clone()).await.unwrap();
    assert_eq!(
        state,
        SubmissionState::FailedTimeoutWarning {
            tx_id: envelope.tx_id.clone(),
            rounds: 2
        }
    );

    let state = engine.wait_longer().await.unwrap();
    assert_eq!(state.name(), "confirmed");
}
