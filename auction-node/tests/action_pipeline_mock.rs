use async_trait::async_trait;
use auction_core::mock::MockWalletProvider;
use auction_core::{
    AssetDescriptor, BidEvent, ErrorKind, ProviderFailure, SubscriptionHandle, TxOutcome,
    WalletProvider,
};
use auction_node::actions::WITHDRAW_SUCCESS_MESSAGE;
use auction_node::engine::{EngineConfig, SessionEngine};
use auction_node::session::Modal;
use std::sync::Arc;
use tokio::sync::mpsc;

const ACCOUNT: &str = "0xf00d00000000000000000000000000000000cafe";
const EXPECTED_CHAIN: u64 = 137;
const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

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

fn auction_asset() -> AssetDescriptor {
    AssetDescriptor {
        token_id: "42".to_string(),
        contract_address: "0x0000000000000000000000000000000000000009".to_string(),
        symbol: "VEG".to_string(),
        decimals: 0,
        image_url: None,
    }
}

fn placeholder_asset() -> AssetDescriptor {
    AssetDescriptor {
        token_id: "-".to_string(),
        contract_address: String::new(),
        symbol: String::new(),
        decimals: 0,
        image_url: None,
    }
}

#[tokio::test]
async fn zero_bid_is_rejected_without_submission() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let engine = engine_with(&mock);

    let err = engine.place_bid("0").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidAmount);
    assert!(mock.bid_submissions().is_empty());
    assert!(matches!(engine.snapshot().modal, Modal::Error { .. }));
}

#[tokio::test]
async fn malformed_bids_are_rejected_without_submission() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let engine = engine_with(&mock);

    for input in ["", "-1", "1.2.3", "lots"] {
        let err = engine.place_bid(input).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAmount, "input {input:?}");
    }
    assert!(mock.bid_submissions().is_empty());
}

#[tokio::test]
async fn bid_converts_to_smallest_units_and_closes_modal() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let engine = engine_with(&mock);

    let outcome = engine.place_bid("1.5").await.unwrap();
    assert!(outcome.tx_ref.starts_with("0x"));
    assert_eq!(mock.bid_submissions(), vec![ONE_TOKEN + ONE_TOKEN / 2]);
    assert_eq!(engine.snapshot().modal, Modal::None);
}

#[tokio::test]
async fn contract_revert_is_classified_for_display() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    mock.fail_next_bid(ProviderFailure::with_data(
        "execution reverted",
        "execution reverted: custom error 'BidNotHighEnough()'",
    ));
    let engine = engine_with(&mock);

    let err = engine.place_bid("1").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ContractRejected);
    assert_eq!(err.message, "Bid Not High Enough");
    match engine.snapshot().modal {
        Modal::Error { message, .. } => assert_eq!(message, "Bid Not High Enough"),
        other => panic!("expected error modal, got {other:?}"),
    }
}

#[tokio::test]
async fn withdraw_requires_a_nonzero_refund() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let engine = engine_with(&mock);

    let err = engine.withdraw().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotAvailable);
    assert!(mock.withdrawal_submissions().is_empty());
}

#[tokio::test]
async fn withdraw_confirms_and_zeroes_the_refund() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    mock.set_payment(ACCOUNT, 7 * ONE_TOKEN);
    let engine = engine_with(&mock);

    engine.reconcile().await;
    assert!(engine.snapshot().modal.is_refund_offer());

    engine.withdraw().await.unwrap();
    assert_eq!(mock.withdrawal_submissions(), vec![ACCOUNT.to_string()]);

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.refund, None, "post-withdraw reconcile zeroes refund");
    match snapshot.modal {
        Modal::Info { message } => assert_eq!(message, WITHDRAW_SUCCESS_MESSAGE),
        other => panic!("expected info message, got {other:?}"),
    }
}

#[tokio::test]
async fn second_action_is_rejected_while_one_is_pending() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let engine = engine_with(&mock);

    engine.session().try_begin_action("first action").unwrap();
    let err = engine.place_bid("1").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RequestAlreadyPending);
    assert!(mock.bid_submissions().is_empty());
    assert!(engine.snapshot().modal.is_pending(), "owner's modal survives");
}

#[tokio::test]
async fn register_rejects_the_no_item_placeholder() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let engine = engine_with(&mock);

    let err = engine.register_asset(&placeholder_asset()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotAvailable);
}

#[tokio::test]
async fn register_accepted_shows_the_thank_you_modal() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let engine = engine_with(&mock);

    let accepted = engine.register_asset(&auction_asset()).await.unwrap();
    assert!(accepted);
    match engine.snapshot().modal {
        Modal::Success {
            message,
            action_label,
            ..
        } => {
            assert_eq!(message, "Thanks for your interest!");
            assert_eq!(action_label, None);
        }
        other => panic!("expected success modal, got {other:?}"),
    }
}

#[tokio::test]
async fn register_declined_in_wallet_is_user_rejected() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    mock.fail_next_watch(ProviderFailure::coded(4001, "declined"));
    let engine = engine_with(&mock);

    let err = engine.register_asset(&auction_asset()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::UserRejected);
    assert!(matches!(engine.snapshot().modal, Modal::Error { .. }));
}

/// Provider whose submissions never confirm, for exercising the
/// confirmation budget.
struct StallingProvider;

#[async_trait]
impl WalletProvider for StallingProvider {
    async fn accounts(&self) -> Result<Vec<String>, ProviderFailure> {
        Ok(vec![ACCOUNT.to_string()])
    }

    async fn chain_id(&self) -> Result<u64, ProviderFailure> {
        Ok(EXPECTED_CHAIN)
    }

    async fn query_bid_events(&self, _: u64) -> Result<Vec<BidEvent>, ProviderFailure> {
        Ok(Vec::new())
    }

    async fn subscribe_bids(
        &self,
        _: mpsc::Sender<BidEvent>,
    ) -> Result<SubscriptionHandle, ProviderFailure> {
        Ok(SubscriptionHandle::detached())
    }

    async fn pending_payments(&self, _: &str) -> Result<u128, ProviderFailure> {
        Ok(0)
    }

    async fn submit_bid(&self, _: u128) -> Result<TxOutcome, ProviderFailure> {
        std::future::pending().await
    }

    async fn submit_withdrawal(&self, _: &str) -> Result<TxOutcome, ProviderFailure> {
        std::future::pending().await
    }

    async fn watch_asset(&self, _: &AssetDescriptor) -> Result<bool, ProviderFailure> {
        Ok(true)
    }
}

#[tokio::test]
async fn confirmation_budget_bounds_the_finality_wait() {
    let engine = SessionEngine::new(
        Some(Arc::new(StallingProvider)),
        EngineConfig {
            confirmation_timeout_ms: Some(50),
            ..engine_config()
        },
    );

    let err = engine.place_bid("1").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unknown);
    assert!(err.message.contains("No confirmation"));
    // The failure must not leave the modal pending.
    assert!(matches!(engine.snapshot().modal, Modal::Error { .. }));
}
