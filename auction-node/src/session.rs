//! The single in-memory view of a session.
//!
//! One [`SessionHandle`] is shared by the handshake, the reconciler and the
//! action pipeline; the presentation layer only ever sees cloned snapshots.
//! Critical sections never suspend, so lock hold times are bounded by the
//! copy cost.
//!
//! Modal ownership: the action pipeline owns the modal slot while an action
//! is in flight. A concurrent reconciliation may only replace it with a more
//! specific outcome (an error, or the refund-available offer) and never
//! downgrades `Pending` to an informational state.

use auction_core::{BidRecord, ClassifiedError, RefundEntry};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const REFUND_OFFER_TITLE: &str = "Funds Available";
pub const REFUND_OFFER_MESSAGE: &str =
    "You may withdraw previous bids that were overbid once the auction is over.";
pub const REFUND_OFFER_ACTION: &str = "Withdraw Now";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// The provider reports a chain other than the configured one; the
    /// session is unusable until the user switches networks.
    Mismatched,
}

/// What the presentation layer should be showing on top of the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modal {
    #[default]
    None,
    /// Plain informational message, no blocking overlay.
    Info { message: String },
    /// A state-changing request is awaiting finality.
    Pending { message: String },
    Error {
        title: String,
        message: String,
    },
    Success {
        title: String,
        message: String,
        action_label: Option<String>,
    },
}

impl Modal {
    pub fn error(err: &ClassifiedError) -> Self {
        Modal::Error {
            title: err.title.clone(),
            message: err.message.clone(),
        }
    }

    /// The refund-available offer opened by the reconciler.
    pub fn refund_offer() -> Self {
        Modal::Success {
            title: REFUND_OFFER_TITLE.to_string(),
            message: REFUND_OFFER_MESSAGE.to_string(),
            action_label: Some(REFUND_OFFER_ACTION.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Modal::Pending { .. })
    }

    /// Only the refund offer carries an action label, which is how the
    /// reconciler recognizes its own modal when clearing it.
    pub fn is_refund_offer(&self) -> bool {
        matches!(
            self,
            Modal::Success {
                action_label: Some(_),
                ..
            }
        )
    }
}

/// Snapshot of everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub connection: ConnectionStatus,
    pub bids: Vec<BidRecord>,
    pub refund: Option<RefundEntry>,
    pub modal: Modal,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            connection: ConnectionStatus::Disconnected,
            bids: Vec::new(),
            refund: None,
            modal: Modal::None,
        }
    }
}

/// Shared, cheaply clonable handle onto the session state.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.read().connection
    }

    pub fn set_connection(&self, status: ConnectionStatus) {
        self.write().connection = status;
    }

    /// Clear any visible message or modal. Action-pipeline entry step.
    pub fn clear_message(&self) {
        self.write().modal = Modal::None;
    }

    /// Unconditional modal replacement, used by the action that currently
    /// owns the slot.
    pub fn set_modal(&self, modal: Modal) {
        self.write().modal = modal;
    }

    /// Claim the modal slot for a new user action. Fails without touching
    /// the slot when another action's `Pending` modal is already open.
    pub fn try_begin_action(&self, pending_message: &str) -> Result<(), ClassifiedError> {
        let mut state = self.write();
        if state.modal.is_pending() {
            return Err(ClassifiedError::action_in_flight());
        }
        state.modal = Modal::Pending {
            message: pending_message.to_string(),
        };
        Ok(())
    }

    /// Surface a reconciliation failure. Errors are specific outcomes and may
    /// replace a `Pending` modal.
    pub fn present_reconcile_error(&self, err: &ClassifiedError) {
        self.write().modal = Modal::error(err);
    }

    /// Publish a reconciled ledger and refund atomically, applying the modal
    /// discipline: a non-zero refund opens the refund offer (even over
    /// `Pending`); a zero refund removes a previously opened offer and
    /// nothing else.
    pub fn publish_reconciled(&self, bids: Vec<BidRecord>, refund: Option<RefundEntry>) {
        let mut state = self.write();
        state.bids = bids;
        state.refund = refund.clone();
        match refund {
            Some(entry) if entry.owed > 0 => {
                state.modal = Modal::refund_offer();
            }
            _ => {
                if state.modal.is_refund_offer() {
                    state.modal = Modal::None;
                }
            }
        }
    }
}
