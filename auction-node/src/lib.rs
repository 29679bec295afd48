#![forbid(unsafe_code)]
#![deny(clippy::float_arithmetic)]
#![deny(clippy::float_cmp)]

//! Auction session node.
//!
//! Keeps a single coherent local view of an on-chain auction for one
//! configured chain and one wallet provider per session: connection
//! handshake, event-driven bid-ledger reconciliation, and the one-shot
//! action pipeline (bid, withdraw, register).

pub mod actions;
pub mod config;
pub mod engine;
pub mod eth_provider;
pub mod handshake;
pub mod reconcile;
pub mod session;
