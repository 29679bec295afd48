use auction_core::mock::MockWalletProvider;
use auction_core::{BidEvent, ProviderFailure, WalletProvider};
use auction_node::engine::{EngineConfig, SessionEngine};
use auction_node::session::Modal;
use std::sync::Arc;
use std::time::Duration;

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

fn event(bidder: &str, amount: u128, block: u64) -> BidEvent {
    BidEvent {
        bidder: bidder.to_string(),
        amount,
        block_height: block,
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn duplicate_events_collapse_and_sort() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let alice = "0xAAAA000000000000000000000000000000001111";
    let bob = "0xBBBB000000000000000000000000000000002222";
    mock.push_history(event(alice, ONE_TOKEN, 100));
    mock.push_history(event(bob, 2 * ONE_TOKEN, 101));
    mock.push_history(event(alice, ONE_TOKEN, 100));

    let engine = engine_with(&mock);
    engine.reconcile().await;

    let bids = engine.snapshot().bids;
    assert_eq!(bids.len(), 2);
    assert_eq!(bids[0].display_bidder, "0xBB...2222");
    assert_eq!(bids[0].amount, 2 * ONE_TOKEN);
    assert_eq!(bids[1].display_bidder, "0xAA...1111");
    assert_eq!(bids[1].amount, ONE_TOKEN);
}

#[tokio::test]
async fn reconciliation_is_idempotent() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    mock.push_history(event("0xAAAA000000000000000000000000000000001111", 7, 3));
    mock.push_history(event("0xBBBB000000000000000000000000000000002222", 7, 2));
    mock.set_payment(ACCOUNT, 5);

    let engine = engine_with(&mock);
    engine.reconcile().await;
    let first = engine.snapshot();
    engine.reconcile().await;
    let second = engine.snapshot();
    assert_eq!(first, second);
}

#[tokio::test]
async fn transient_failure_keeps_previous_ledger() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    mock.push_history(event("0xAAAA000000000000000000000000000000001111", 10, 100));

    let engine = engine_with(&mock);
    engine.reconcile().await;
    assert_eq!(engine.snapshot().bids.len(), 1);

    mock.push_history(event("0xBBBB000000000000000000000000000000002222", 20, 101));
    mock.fail_next_events(ProviderFailure::message("rpc timed out"));
    engine.reconcile().await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.bids.len(), 1, "failed pass must not shrink the ledger");
    assert!(matches!(snapshot.modal, Modal::Error { .. }));

    // Next pass recovers and picks up the new event.
    engine.reconcile().await;
    assert_eq!(engine.snapshot().bids.len(), 2);
}

#[tokio::test]
async fn refund_balance_opens_and_clears_the_offer() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let engine = engine_with(&mock);

    mock.set_payment(ACCOUNT, 42);
    engine.reconcile().await;
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.refund.as_ref().map(|r| r.owed), Some(42));
    assert!(snapshot.modal.is_refund_offer());

    mock.set_payment(ACCOUNT, 0);
    engine.reconcile().await;
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.refund, None);
    assert_eq!(snapshot.modal, Modal::None);
}

#[tokio::test]
async fn zero_refund_never_discards_a_pending_action_modal() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let engine = engine_with(&mock);

    engine.session().try_begin_action("working").unwrap();
    engine.reconcile().await;
    assert!(engine.snapshot().modal.is_pending());
}

#[tokio::test]
async fn payment_query_failure_keeps_ledger_and_refund() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    mock.push_history(event("0xAAAA000000000000000000000000000000001111", 10, 100));
    mock.set_payment(ACCOUNT, 9);

    let engine = engine_with(&mock);
    engine.reconcile().await;
    assert_eq!(engine.snapshot().refund.as_ref().map(|r| r.owed), Some(9));

    mock.fail_next_payments(ProviderFailure::message("rpc unavailable"));
    engine.reconcile().await;
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.bids.len(), 1);
    assert_eq!(snapshot.refund.as_ref().map(|r| r.owed), Some(9));
    assert!(matches!(snapshot.modal, Modal::Error { .. }));
}

#[tokio::test]
async fn live_events_trigger_reconciliation_until_teardown() {
    let mock = Arc::new(MockWalletProvider::new(EXPECTED_CHAIN, ACCOUNT));
    let engine = Arc::new(engine_with(&mock));

    let task = engine.spawn();
    {
        let mock = Arc::clone(&mock);
        wait_until(move || mock.has_subscriber()).await;
    }
    assert_eq!(mock.event_queries(), 1, "initial reconcile runs once");

    assert!(mock.push_live(event(
        "0xCCCC000000000000000000000000000000003333",
        30,
        200
    )));
    {
        let engine = Arc::clone(&engine);
        wait_until(move || engine.snapshot().bids.len() == 1).await;
    }
    let bids = engine.snapshot().bids;
    assert_eq!(bids[0].display_bidder, "0xCC...3333");

    // A replay of the same event must not grow the ledger.
    assert!(mock.push_live(event(
        "0xCCCC000000000000000000000000000000003333",
        30,
        200
    )));
    {
        let mock = Arc::clone(&mock);
        wait_until(move || mock.event_queries() >= 3).await;
    }
    assert_eq!(engine.snapshot().bids.len(), 1);

    task.shutdown();
    assert!(task.join().await.is_ok());
}
