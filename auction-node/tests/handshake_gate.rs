use auction_core::mock::MockWalletProvider;
use auction_core::{ErrorKind, ProviderFailure, WalletProvider};
use auction_node::engine::{EngineConfig, SessionEngine};
use auction_node::session::{ConnectionStatus, Modal};
use std::sync::Arc;

const ACCOUNT: &str = "0xf00d00000000000000000000000000000000cafe";
const EXPECTED_CHAIN: u64 = 137;

fn engine_config() -> EngineConfig {
    EngineConfig {
        expected_chain_id: EXPECTED_CHAIN,
        expected_chain_name: "Polygon Mainnet".to_string(),
        lookback_blocks: 6_500,
        unit_decimals: 18,
        confirmation_timeout_ms: None,
    }
}

fn engine_with(mock: &Arc<MockWalletProvider>) -> SessionEngine {
    let provider: Arc<dyn WalletProvider> = Arc::clone(mock);
    SessionEngine::new(Some(provider), engine_config())
}

#[tokio::test]
async fn missing_provider_is_fatal() {
    let engine = SessionEngine::new(None, engine_config());
    let err = engine.place_bid("1").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoProvider);
    assert_eq!(engine.snapshot().connection, ConnectionStatus::Disconnected);

    let err = engine.run().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoProvider);
}

#[tokio::test]
async fn successful_handshake_connects_the_session() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let engine = engine_with(&mock);
    engine.reconcile().await;
    assert_eq!(engine.snapshot().connection, ConnectionStatus::Connected);
}

#[tokio::test]
async fn empty_account_list_surfaces_no_accounts() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    mock.set_accounts(Vec::new());
    let engine = engine_with(&mock);

    engine.reconcile().await;
    let snapshot = engine.snapshot();
    assert!(snapshot.bids.is_empty());
    assert_eq!(snapshot.connection, ConnectionStatus::Disconnected);
    match snapshot.modal {
        Modal::Error { message, .. } => assert!(message.contains("locked")),
        other => panic!("expected error modal, got {other:?}"),
    }
}

#[tokio::test]
async fn chain_mismatch_gates_every_action() {
    let mock = Arc::new(MockWalletProvider::new(1, ACCOUNT));
    let engine = engine_with(&mock);

    let err = engine.place_bid("1").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ChainMismatch);
    assert!(err.message.contains("Polygon Mainnet"));
    assert!(mock.bid_submissions().is_empty());
    assert_eq!(engine.snapshot().connection, ConnectionStatus::Mismatched);

    // Withdraw is gated the same way once a refund is on the books.
    mock.set_chain_id(EXPECTED_CHAIN);
    mock.set_payment(ACCOUNT, 5);
    engine.reconcile().await;
    mock.set_chain_id(1);
    let err = engine.withdraw().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ChainMismatch);
    assert!(mock.withdrawal_submissions().is_empty());
}

#[tokio::test]
async fn provider_rejection_is_classified() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    mock.fail_next_accounts(ProviderFailure::coded(4001, "denied in wallet"));
    let engine = engine_with(&mock);

    engine.reconcile().await;
    match engine.snapshot().modal {
        Modal::Error { message, .. } => {
            assert_eq!(message, "Connection request has been rejected.");
        }
        other => panic!("expected error modal, got {other:?}"),
    }
}

#[tokio::test]
async fn chain_mismatch_ends_the_session_loop() {
    let mock = Arc::new(MockWalletProvider::new(1, ACCOUNT));
    let engine = Arc::new(engine_with(&mock));
    let err = engine.run().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ChainMismatch);
}
