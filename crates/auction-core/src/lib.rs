#![forbid(unsafe_code)]
#![deny(clippy::float_arithmetic)]
#![deny(clippy::float_cmp)]
#![deny(clippy::cast_precision_loss)]
#![deny(clippy::cast_possible_truncation)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::cast_sign_loss)]

//! Core types and primitives for the auction session engine.
//!
//! This crate defines the shared abstractions used by the session node:
//! the closed error taxonomy and classifier, smallest-unit amount
//! arithmetic, the bid ledger model, and the [`WalletProvider`] seam over
//! which the on-chain auction contract and the signing wallet are reached.

use serde::{Deserialize, Serialize};

pub mod amount;
pub mod error;
pub mod ledger;
pub mod mock;
pub mod provider;

pub use amount::{format_amount, parse_amount, AmountError};
pub use error::{classify, ClassifiedError, ErrorKind, FailureData, ProviderFailure};
pub use ledger::{build_ledger, truncate_address, BidEvent, BidRecord, RefundEntry};
pub use provider::{
    AssetDescriptor, SubscriptionHandle, TxOutcome, WalletProvider, NO_ITEM_SENTINEL,
};

/// The account the session acts as, bound to the chain it was observed on.
///
/// An identity is only meaningful while the provider still reports the same
/// chain; it is re-derived by the handshake before every state-changing
/// action rather than cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    /// Chain address as reported by the wallet provider (opaque string).
    pub address: String,
    /// Chain identifier the address was observed on.
    pub chain_id: u64,
}

impl AccountIdentity {
    pub fn new(address: impl Into<String>, chain_id: u64) -> Self {
        Self {
            address: address.into(),
            chain_id,
        }
    }
}

impl std::fmt::Display for AccountIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.address, self.chain_id)
    }
}
