//! Event-driven bid-state reconciliation.
//!
//! Every pass rebuilds the ledger from scratch out of the historical window
//! merged with the live events recorded since process start. On any failure
//! the previously published ledger is retained: stale-but-valid beats blank.

use crate::handshake::Handshake;
use crate::session::SessionHandle;
use auction_core::{
    build_ledger, classify, AccountIdentity, BidEvent, ClassifiedError, RefundEntry,
    WalletProvider,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub struct Reconciler {
    provider: Option<Arc<dyn WalletProvider>>,
    handshake: Handshake,
    session: SessionHandle,
    lookback_blocks: u64,
    /// Live events seen since process start; merged into every rebuild so a
    /// bid landing after the lookback snapshot is never lost.
    live: Mutex<Vec<BidEvent>>,
}

impl Reconciler {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        handshake: Handshake,
        session: SessionHandle,
        lookback_blocks: u64,
    ) -> Self {
        Self {
            provider,
            handshake,
            session,
            lookback_blocks,
            live: Mutex::new(Vec::new()),
        }
    }

    /// Remember a live event for all subsequent rebuilds.
    pub fn record_live(&self, event: BidEvent) {
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    /// One reconciliation pass: handshake, rebuild, publish. Failures are
    /// classified and surfaced as an error modal; the published ledger is
    /// only ever replaced wholesale on success.
    pub async fn reconcile(&self) {
        let identity = match self.handshake.connect().await {
            Ok(identity) => identity,
            Err(err) => {
                warn!(error = %err, "handshake failed, keeping previous ledger");
                self.session.present_reconcile_error(&err);
                return;
            }
        };

        if let Err(err) = self.rebuild(&identity).await {
            warn!(error = %err, "reconciliation failed, keeping previous ledger");
            self.session.present_reconcile_error(&err);
        }
    }

    async fn rebuild(&self, identity: &AccountIdentity) -> Result<(), ClassifiedError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(ClassifiedError::no_provider)?;

        let mut events = provider
            .query_bid_events(self.lookback_blocks)
            .await
            .map_err(|raw| classify(&raw))?;
        {
            let live = self.live.lock().unwrap_or_else(|e| e.into_inner());
            events.extend(live.iter().cloned());
        }
        let bids = build_ledger(events);

        let owed = provider
            .pending_payments(&identity.address)
            .await
            .map_err(|raw| classify(&raw))?;
        let refund = (owed > 0).then(|| RefundEntry {
            account: identity.clone(),
            owed,
        });

        debug!(
            bids = bids.len(),
            owed,
            account = %identity.address,
            "publishing reconciled state"
        );
        self.session.publish_reconciled(bids, refund);
        Ok(())
    }
}
