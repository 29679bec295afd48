//! Bid ledger model: observed bid events, deduplication and ordering.
//!
//! The ledger is always rebuilt from the full deduplicated event set rather
//! than patched incrementally, so re-delivered events and partial updates
//! cannot corrupt the sort order.

use crate::AccountIdentity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A bid-increase event as decoded from the ledger service.
///
/// Events may be re-delivered after provider reconnects; the triple
/// `(bidder, block_height, amount)` identifies an event uniquely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BidEvent {
    pub bidder: String,
    pub amount: u128,
    pub block_height: u64,
}

/// One row of the published bid ledger. Immutable once observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRecord {
    pub bidder: String,
    /// Truncated display form of the bidder address.
    pub display_bidder: String,
    /// Bid amount in smallest units.
    pub amount: u128,
    /// Block the bid was observed in.
    pub block_height: u64,
}

/// Pending refund owed to the session account; `owed == 0` means nothing is
/// claimable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundEntry {
    pub account: AccountIdentity,
    pub owed: u128,
}

/// Shorten an address for display: first 4 + last 4 characters joined by an
/// ellipsis. Addresses shorter than 8 characters pass through unchanged.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() < 8 {
        return address.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Rebuild the bid ledger from scratch: deduplicate by
/// `(bidder, block_height, amount)`, derive display addresses, and sort
/// descending by amount with the earlier block winning ties.
pub fn build_ledger(events: impl IntoIterator<Item = BidEvent>) -> Vec<BidRecord> {
    let mut seen: HashSet<(String, u64, u128)> = HashSet::new();
    let mut records: Vec<BidRecord> = Vec::new();
    for event in events {
        let key = (event.bidder.clone(), event.block_height, event.amount);
        if !seen.insert(key) {
            continue;
        }
        records.push(BidRecord {
            display_bidder: truncate_address(&event.bidder),
            bidder: event.bidder,
            amount: event.amount,
            block_height: event.block_height,
        });
    }
    records.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then(a.block_height.cmp(&b.block_height))
    });
    records
}
