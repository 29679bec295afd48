//! The seam between the session engine and the on-chain world.
//!
//! [`WalletProvider`] covers both roles the environment plays for a session:
//! the signer/identity agent (accounts, chain id, asset tracking) and the
//! opaque auction ledger service (events, balances, transactions). In
//! production it is backed by a JSON-RPC provider plus a contract binding;
//! in tests it is mocked.

use crate::error::ProviderFailure;
use crate::ledger::BidEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Token identity used when no item is attached to the auction.
pub const NO_ITEM_SENTINEL: &str = "-";

/// Confirmed result of a state-changing submission.
///
/// Returned only once the ledger service reports finality for the
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutcome {
    /// Transaction reference (hash) assigned by the ledger service.
    pub tx_ref: String,
    /// Block height at which finality was reported.
    pub block_height: u64,
}

/// Asset the wallet is asked to track for the register action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Token identity; [`NO_ITEM_SENTINEL`] marks the "no item" placeholder.
    pub token_id: String,
    pub contract_address: String,
    pub symbol: String,
    pub decimals: u8,
    pub image_url: Option<String>,
}

impl AssetDescriptor {
    /// True when this descriptor is the "no item" placeholder and must not
    /// be sent to the wallet.
    pub fn is_placeholder(&self) -> bool {
        self.token_id == NO_ITEM_SENTINEL
    }
}

/// Handle for a live event listener. Shutting it down (or dropping it)
/// detaches the listener so repeated reconnects cannot stack subscriptions.
#[derive(Debug)]
pub struct SubscriptionHandle {
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Handle owning a background forwarding task.
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// Handle for a provider that delivers events without a background task.
    pub fn detached() -> Self {
        Self { task: None }
    }

    /// Stop forwarding events. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Everything the session engine needs from the wallet provider and the
/// auction ledger service. All fallible calls return the raw
/// [`ProviderFailure`]; classification happens at the engine boundary.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Authorized accounts, first entry is the active one.
    async fn accounts(&self) -> Result<Vec<String>, ProviderFailure>;

    /// Identifier of the chain the provider is currently connected to.
    async fn chain_id(&self) -> Result<u64, ProviderFailure>;

    /// Historical bid-increase events over the trailing lookback window.
    async fn query_bid_events(
        &self,
        lookback_blocks: u64,
    ) -> Result<Vec<BidEvent>, ProviderFailure>;

    /// Start forwarding live bid-increase events into `events`. The returned
    /// handle must be shut down on session teardown.
    async fn subscribe_bids(
        &self,
        events: mpsc::Sender<BidEvent>,
    ) -> Result<SubscriptionHandle, ProviderFailure>;

    /// Pending-payment (refund) balance the ledger service owes `account`.
    async fn pending_payments(&self, account: &str) -> Result<u128, ProviderFailure>;

    /// Submit a bid of `amount` smallest units and wait for finality.
    async fn submit_bid(&self, amount: u128) -> Result<TxOutcome, ProviderFailure>;

    /// Withdraw the pending payments owed to `account` and wait for finality.
    async fn submit_withdrawal(&self, account: &str) -> Result<TxOutcome, ProviderFailure>;

    /// Ask the wallet to track an asset. `Ok(true)` means the user accepted.
    async fn watch_asset(&self, asset: &AssetDescriptor) -> Result<bool, ProviderFailure>;
}
