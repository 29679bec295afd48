//! One-shot user actions against the auction ledger.
//!
//! Every operation follows the same shape: clear the current message, claim
//! the modal slot with a `Pending` modal, re-verify identity where needed,
//! submit, await finality, and end in a terminal modal. Nothing is retried
//! internally; a failed invocation must be re-triggered by the user.

use crate::handshake::Handshake;
use crate::reconcile::Reconciler;
use crate::session::{Modal, SessionHandle};
use auction_core::{
    classify, parse_amount, AssetDescriptor, ClassifiedError, ProviderFailure, TxOutcome,
    WalletProvider,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const PENDING_MESSAGE: &str = "Please wait. Smart contract is processing.";
pub const WITHDRAW_SUCCESS_MESSAGE: &str = "Withdrawal completed successfully.";
pub const REGISTER_SUCCESS_TITLE: &str = "Asset Registered";
pub const REGISTER_SUCCESS_MESSAGE: &str = "Thanks for your interest!";

pub struct ActionPipeline {
    provider: Option<Arc<dyn WalletProvider>>,
    handshake: Handshake,
    session: SessionHandle,
    reconciler: Arc<Reconciler>,
    unit_decimals: u32,
    confirmation_timeout: Option<Duration>,
}

impl ActionPipeline {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        handshake: Handshake,
        session: SessionHandle,
        reconciler: Arc<Reconciler>,
        unit_decimals: u32,
        confirmation_timeout: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            handshake,
            session,
            reconciler,
            unit_decimals,
            confirmation_timeout,
        }
    }

    /// Parse, submit and confirm a bid. Invalid input is rejected before any
    /// submission call is made.
    pub async fn place_bid(&self, amount_text: &str) -> Result<TxOutcome, ClassifiedError> {
        self.session.clear_message();
        let units = match parse_amount(amount_text, self.unit_decimals) {
            Ok(units) => units,
            Err(reason) => return Err(self.fail(ClassifiedError::invalid_amount(reason))),
        };
        self.session.try_begin_action(PENDING_MESSAGE)?;

        let result = async {
            self.handshake.connect().await?;
            let provider = self.provider()?;
            self.await_finality(provider.submit_bid(units)).await
        }
        .await;

        match result {
            Ok(outcome) => {
                info!(tx_ref = %outcome.tx_ref, units, "bid confirmed");
                self.session.set_modal(Modal::None);
                Ok(outcome)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Withdraw the pending refund owed to the active account, then run a
    /// reconciliation pass so the published refund returns to zero.
    pub async fn withdraw(&self) -> Result<TxOutcome, ClassifiedError> {
        self.session.clear_message();
        let claimable = self
            .session
            .snapshot()
            .refund
            .filter(|entry| entry.owed > 0);
        if claimable.is_none() {
            return Err(self.fail(ClassifiedError::not_available(
                "No withdrawable funds for this account.",
            )));
        }
        self.session.try_begin_action(PENDING_MESSAGE)?;

        let result = async {
            let identity = self.handshake.connect().await?;
            let provider = self.provider()?;
            self.await_finality(provider.submit_withdrawal(&identity.address))
                .await
        }
        .await;

        match result {
            Ok(outcome) => {
                info!(tx_ref = %outcome.tx_ref, "withdrawal confirmed");
                self.session.set_modal(Modal::Info {
                    message: WITHDRAW_SUCCESS_MESSAGE.to_string(),
                });
                self.reconciler.reconcile().await;
                Ok(outcome)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Ask the wallet to track the auctioned asset. `Ok(true)` means the
    /// user accepted, `Ok(false)` that the request was dismissed silently.
    pub async fn register_asset(&self, asset: &AssetDescriptor) -> Result<bool, ClassifiedError> {
        self.session.clear_message();
        if asset.is_placeholder() {
            return Err(self.fail(ClassifiedError::not_available(
                "Unable to reach the network. Check your wallet and try again.",
            )));
        }
        self.session.try_begin_action(PENDING_MESSAGE)?;

        let result = async {
            let provider = self.provider()?;
            provider
                .watch_asset(asset)
                .await
                .map_err(|raw| classify(&raw))
        }
        .await;

        match result {
            Ok(true) => {
                info!(token_id = %asset.token_id, "asset registered in wallet");
                self.session.set_modal(Modal::Success {
                    title: REGISTER_SUCCESS_TITLE.to_string(),
                    message: REGISTER_SUCCESS_MESSAGE.to_string(),
                    action_label: None,
                });
                Ok(true)
            }
            Ok(false) => {
                self.session.set_modal(Modal::None);
                Ok(false)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn provider(&self) -> Result<&Arc<dyn WalletProvider>, ClassifiedError> {
        self.provider.as_ref().ok_or_else(ClassifiedError::no_provider)
    }

    /// Wait for the submission to reach finality, bounded by the configured
    /// confirmation budget when one is set.
    async fn await_finality<F>(&self, submit: F) -> Result<TxOutcome, ClassifiedError>
    where
        F: Future<Output = Result<TxOutcome, ProviderFailure>>,
    {
        match self.confirmation_timeout {
            Some(budget) => match tokio::time::timeout(budget, submit).await {
                Ok(result) => result.map_err(|raw| classify(&raw)),
                Err(_) => Err(ClassifiedError::confirmation_timeout(
                    u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                )),
            },
            None => submit.await.map_err(|raw| classify(&raw)),
        }
    }

    /// Terminal failure: surface the error modal and hand the error back.
    fn fail(&self, err: ClassifiedError) -> ClassifiedError {
        self.session.set_modal(Modal::error(&err));
        err
    }
}
