//! Account discovery and chain-identity verification.
//!
//! The handshake is re-run before every state-changing action rather than
//! cached: the active account or chain may change between calls, and only
//! the provider knows the current truth.

use crate::session::{ConnectionStatus, SessionHandle};
use auction_core::{classify, AccountIdentity, ClassifiedError, WalletProvider};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Handshake {
    provider: Option<Arc<dyn WalletProvider>>,
    expected_chain_id: u64,
    expected_chain_name: String,
    session: SessionHandle,
}

impl Handshake {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        expected_chain_id: u64,
        expected_chain_name: impl Into<String>,
        session: SessionHandle,
    ) -> Self {
        Self {
            provider,
            expected_chain_id,
            expected_chain_name: expected_chain_name.into(),
            session,
        }
    }

    /// Verify provider presence, accounts and chain identity as one logical
    /// unit; both requests run concurrently and either failure aborts the
    /// whole call.
    pub async fn connect(&self) -> Result<AccountIdentity, ClassifiedError> {
        let Some(provider) = &self.provider else {
            self.session.set_connection(ConnectionStatus::Disconnected);
            return Err(ClassifiedError::no_provider());
        };

        self.session.set_connection(ConnectionStatus::Connecting);
        let (accounts, chain_id) =
            match tokio::try_join!(provider.accounts(), provider.chain_id()) {
                Ok(pair) => pair,
                Err(raw) => {
                    self.session.set_connection(ConnectionStatus::Disconnected);
                    return Err(classify(&raw));
                }
            };

        let Some(active) = accounts.first() else {
            self.session.set_connection(ConnectionStatus::Disconnected);
            return Err(ClassifiedError::no_accounts());
        };

        if chain_id != self.expected_chain_id {
            self.session.set_connection(ConnectionStatus::Mismatched);
            return Err(ClassifiedError::chain_mismatch(&self.expected_chain_name));
        }

        debug!(account = %active, chain_id, "handshake complete");
        self.session.set_connection(ConnectionStatus::Connected);
        Ok(AccountIdentity::new(active.clone(), chain_id))
    }
}
