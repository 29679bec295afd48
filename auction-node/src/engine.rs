//! Session wiring and the live event loop.
//!
//! The engine owns one [`SessionHandle`] and the single consumer loop that
//! drains live bid events into reconciliation passes. Draining through one
//! channel gives deterministic ordering and a single cancellation point for
//! teardown.

use crate::actions::ActionPipeline;
use crate::config::NodeConfig;
use crate::handshake::Handshake;
use crate::reconcile::Reconciler;
use crate::session::{ConnectionStatus, SessionHandle, SessionState};
use auction_core::{
    classify, AssetDescriptor, ClassifiedError, ProviderFailure, TxOutcome, WalletProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub expected_chain_id: u64,
    pub expected_chain_name: String,
    pub lookback_blocks: u64,
    pub unit_decimals: u32,
    pub confirmation_timeout_ms: Option<u64>,
}

impl From<&NodeConfig> for EngineConfig {
    fn from(cfg: &NodeConfig) -> Self {
        Self {
            expected_chain_id: cfg.chain.id,
            expected_chain_name: cfg.chain.name.clone(),
            lookback_blocks: cfg.auction.lookback_blocks,
            unit_decimals: cfg.auction.unit_decimals,
            confirmation_timeout_ms: cfg.actions.confirmation_timeout_ms,
        }
    }
}

pub struct SessionEngine {
    provider: Option<Arc<dyn WalletProvider>>,
    session: SessionHandle,
    reconciler: Arc<Reconciler>,
    actions: ActionPipeline,
    expected_chain_name: String,
}

impl SessionEngine {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, cfg: EngineConfig) -> Self {
        let session = SessionHandle::new();
        let handshake = Handshake::new(
            provider.clone(),
            cfg.expected_chain_id,
            cfg.expected_chain_name.clone(),
            session.clone(),
        );
        let reconciler = Arc::new(Reconciler::new(
            provider.clone(),
            handshake.clone(),
            session.clone(),
            cfg.lookback_blocks,
        ));
        let actions = ActionPipeline::new(
            provider.clone(),
            handshake,
            session.clone(),
            Arc::clone(&reconciler),
            cfg.unit_decimals,
            cfg.confirmation_timeout_ms.map(Duration::from_millis),
        );
        Self {
            provider,
            session,
            reconciler,
            actions,
            expected_chain_name: cfg.expected_chain_name,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn snapshot(&self) -> SessionState {
        self.session.snapshot()
    }

    pub async fn reconcile(&self) {
        self.reconciler.reconcile().await;
    }

    pub async fn place_bid(&self, amount_text: &str) -> Result<TxOutcome, ClassifiedError> {
        self.actions.place_bid(amount_text).await
    }

    pub async fn withdraw(&self) -> Result<TxOutcome, ClassifiedError> {
        self.actions.withdraw().await
    }

    pub async fn register_asset(&self, asset: &AssetDescriptor) -> Result<bool, ClassifiedError> {
        self.actions.register_asset(asset).await
    }

    /// Run the session: initial reconciliation, then one reconcile pass per
    /// live event until teardown or a fatal chain switch.
    ///
    /// A chain mismatch ends the session rather than being retried in place:
    /// the event subscription is bound to the old chain context, so the only
    /// safe recovery is a full reload.
    pub async fn run(&self) -> Result<(), ClassifiedError> {
        let provider = self
            .provider
            .clone()
            .ok_or_else(ClassifiedError::no_provider)?;

        self.reconciler.reconcile().await;
        if self.session.connection() == ConnectionStatus::Mismatched {
            return Err(ClassifiedError::chain_mismatch(&self.expected_chain_name));
        }

        let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);
        let mut subscription = provider
            .subscribe_bids(events_tx)
            .await
            .map_err(|raw| classify(&raw))?;
        info!("listening for live bid events");

        let mut outcome = Ok(());
        while let Some(event) = events_rx.recv().await {
            debug!(
                bidder = %event.bidder,
                amount = event.amount,
                block = event.block_height,
                "live bid event"
            );
            self.reconciler.record_live(event);
            self.reconciler.reconcile().await;
            if self.session.connection() == ConnectionStatus::Mismatched {
                warn!("provider switched chains, tearing down session");
                outcome = Err(ClassifiedError::chain_mismatch(&self.expected_chain_name));
                break;
            }
        }

        subscription.shutdown();
        outcome
    }

    /// Run the session on a background task. The returned handle is the
    /// teardown point: aborting it detaches the listener loop.
    pub fn spawn(self: &Arc<Self>) -> SessionTask {
        let engine = Arc::clone(self);
        SessionTask {
            handle: tokio::spawn(async move { engine.run().await }),
        }
    }
}

/// Handle on a running session loop.
pub struct SessionTask {
    handle: JoinHandle<Result<(), ClassifiedError>>,
}

impl SessionTask {
    /// Stop the session loop. Idempotent; safe to call while a
    /// reconciliation pass is in flight.
    pub fn shutdown(&self) {
        self.handle.abort();
    }

    /// Wait for the loop to finish. A shutdown-induced cancellation is a
    /// clean exit, not an error.
    pub async fn join(self) -> Result<(), ClassifiedError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Ok(()),
            Err(err) => Err(classify(&ProviderFailure::message(format!(
                "session task failed: {err}"
            )))),
        }
    }
}
