//! Deterministic in-memory wallet provider for tests.
//!
//! No randomness and no clocks: transaction references are sequential,
//! block heights advance by one per submission, and injected failures fire
//! exactly once. The mock plays both roles of the seam: scripted wallet
//! responses and a tiny in-memory auction ledger.

use crate::error::ProviderFailure;
use crate::ledger::BidEvent;
use crate::provider::{AssetDescriptor, SubscriptionHandle, TxOutcome, WalletProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

const FIRST_BLOCK: u64 = 100;

#[derive(Debug, Default)]
struct MockState {
    accounts: Vec<String>,
    chain_id: u64,
    history: Vec<BidEvent>,
    payments: HashMap<String, u128>,
    watch_accepted: bool,
    next_block: u64,
    tx_seq: u64,
    live_sender: Option<mpsc::Sender<BidEvent>>,
    bid_submissions: Vec<u128>,
    withdrawal_submissions: Vec<String>,
    event_queries: u64,
    // One-shot failure injections, consumed by the next matching call.
    fail_accounts: Option<ProviderFailure>,
    fail_chain_id: Option<ProviderFailure>,
    fail_events: Option<ProviderFailure>,
    fail_payments: Option<ProviderFailure>,
    fail_bid: Option<ProviderFailure>,
    fail_withdrawal: Option<ProviderFailure>,
    fail_watch: Option<ProviderFailure>,
}

/// Scripted [`WalletProvider`] used by the unit and integration suites.
#[derive(Debug)]
pub struct MockWalletProvider {
    state: Mutex<MockState>,
}

impl Default for MockWalletProvider {
    fn default() -> Self {
        Self::new(1, "0xf00d00000000000000000000000000000000cafe")
    }
}

impl MockWalletProvider {
    pub fn new(chain_id: u64, account: &str) -> Self {
        Self {
            state: Mutex::new(MockState {
                accounts: vec![account.to_string()],
                chain_id,
                watch_accepted: true,
                next_block: FIRST_BLOCK,
                ..MockState::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_accounts(&self, accounts: Vec<String>) {
        self.lock().accounts = accounts;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.lock().chain_id = chain_id;
    }

    pub fn set_payment(&self, account: &str, owed: u128) {
        self.lock().payments.insert(account.to_string(), owed);
    }

    pub fn set_watch_accepted(&self, accepted: bool) {
        self.lock().watch_accepted = accepted;
    }

    /// Seed a historical event, visible to `query_bid_events`.
    pub fn push_history(&self, event: BidEvent) {
        self.lock().history.push(event);
    }

    /// Deliver a live event over the subscribed channel, without touching
    /// history. Returns false when no subscriber is attached.
    pub fn push_live(&self, event: BidEvent) -> bool {
        let sender = self.lock().live_sender.clone();
        match sender {
            Some(tx) => tx.try_send(event).is_ok(),
            None => false,
        }
    }

    pub fn fail_next_accounts(&self, failure: ProviderFailure) {
        self.lock().fail_accounts = Some(failure);
    }

    pub fn fail_next_chain_id(&self, failure: ProviderFailure) {
        self.lock().fail_chain_id = Some(failure);
    }

    pub fn fail_next_events(&self, failure: ProviderFailure) {
        self.lock().fail_events = Some(failure);
    }

    pub fn fail_next_payments(&self, failure: ProviderFailure) {
        self.lock().fail_payments = Some(failure);
    }

    pub fn fail_next_bid(&self, failure: ProviderFailure) {
        self.lock().fail_bid = Some(failure);
    }

    pub fn fail_next_withdrawal(&self, failure: ProviderFailure) {
        self.lock().fail_withdrawal = Some(failure);
    }

    pub fn fail_next_watch(&self, failure: ProviderFailure) {
        self.lock().fail_watch = Some(failure);
    }

    /// Amounts submitted through `submit_bid`, in call order.
    pub fn bid_submissions(&self) -> Vec<u128> {
        self.lock().bid_submissions.clone()
    }

    /// Accounts submitted through `submit_withdrawal`, in call order.
    pub fn withdrawal_submissions(&self) -> Vec<String> {
        self.lock().withdrawal_submissions.clone()
    }

    /// Number of `query_bid_events` calls served.
    pub fn event_queries(&self) -> u64 {
        self.lock().event_queries
    }

    pub fn has_subscriber(&self) -> bool {
        self.lock().live_sender.is_some()
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn accounts(&self) -> Result<Vec<String>, ProviderFailure> {
        let mut state = self.lock();
        if let Some(failure) = state.fail_accounts.take() {
            return Err(failure);
        }
        Ok(state.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, ProviderFailure> {
        let mut state = self.lock();
        if let Some(failure) = state.fail_chain_id.take() {
            return Err(failure);
        }
        Ok(state.chain_id)
    }

    async fn query_bid_events(
        &self,
        _lookback_blocks: u64,
    ) -> Result<Vec<BidEvent>, ProviderFailure> {
        let mut state = self.lock();
        if let Some(failure) = state.fail_events.take() {
            return Err(failure);
        }
        state.event_queries += 1;
        Ok(state.history.clone())
    }

    async fn subscribe_bids(
        &self,
        events: mpsc::Sender<BidEvent>,
    ) -> Result<SubscriptionHandle, ProviderFailure> {
        self.lock().live_sender = Some(events);
        Ok(SubscriptionHandle::detached())
    }

    async fn pending_payments(&self, account: &str) -> Result<u128, ProviderFailure> {
        let mut state = self.lock();
        if let Some(failure) = state.fail_payments.take() {
            return Err(failure);
        }
        Ok(state.payments.get(account).copied().unwrap_or(0))
    }

    async fn submit_bid(&self, amount: u128) -> Result<TxOutcome, ProviderFailure> {
        let mut state = self.lock();
        if let Some(failure) = state.fail_bid.take() {
            return Err(failure);
        }
        let bidder = state
            .accounts
            .first()
            .cloned()
            .ok_or_else(|| ProviderFailure::message("no account to bid from"))?;
        state.bid_submissions.push(amount);
        state.next_block += 1;
        let block_height = state.next_block;
        state.history.push(BidEvent {
            bidder,
            amount,
            block_height,
        });
        state.tx_seq += 1;
        Ok(TxOutcome {
            tx_ref: format!("0xmocktx{:08x}", state.tx_seq),
            block_height,
        })
    }

    async fn submit_withdrawal(&self, account: &str) -> Result<TxOutcome, ProviderFailure> {
        let mut state = self.lock();
        if let Some(failure) = state.fail_withdrawal.take() {
            return Err(failure);
        }
        state.withdrawal_submissions.push(account.to_string());
        state.payments.insert(account.to_string(), 0);
        state.next_block += 1;
        state.tx_seq += 1;
        Ok(TxOutcome {
            tx_ref: format!("0xmocktx{:08x}", state.tx_seq),
            block_height: state.next_block,
        })
    }

    async fn watch_asset(&self, _asset: &AssetDescriptor) -> Result<bool, ProviderFailure> {
        let mut state = self.lock();
        if let Some(failure) = state.fail_watch.take() {
            return Err(failure);
        }
        Ok(state.watch_accepted)
    }
}
