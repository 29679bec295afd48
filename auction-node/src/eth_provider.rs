//! Ethereum-backed [`WalletProvider`] over JSON-RPC.
//!
//! The auction ledger contract is reached through an abigen binding on top
//! of a signing middleware; the raw provider failures are lowered into
//! [`ProviderFailure`] so the classifier sees the same JSON-RPC shape
//! regardless of transport.

use crate::config::{required_env, NodeConfig};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use auction_core::{
    AssetDescriptor, BidEvent, FailureData, ProviderFailure, SubscriptionHandle, TxOutcome,
    WalletProvider,
};
use ethers::contract::{abigen, ContractError};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{
    Http, JsonRpcError, Middleware, MiddlewareError, Provider, ProviderError, RpcError,
};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

abigen!(
    AuctionLedger,
    r#"[
        event HighestBidIncreased(address bidder, uint256 amount)
        function bid() external payable
        function withdrawPayments(address payee) external
        function payments(address dest) external view returns (uint256)
    ]"#
);

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// How often the subscription task polls for new events.
const EVENT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct EthWalletProvider {
    rpc: Provider<Http>,
    client: Arc<SignerClient>,
    contract: AuctionLedger<SignerClient>,
}

impl EthWalletProvider {
    pub async fn new(cfg: &NodeConfig) -> Result<Self> {
        let rpc_url = cfg.chain.rpc_url.clone();
        let rpc = Provider::<Http>::try_from(rpc_url.clone())
            .with_context(|| format!("invalid chain rpc url: {rpc_url}"))?;

        let private_key = required_env("ETH_PRIVATE_KEY")?;
        let wallet: LocalWallet = private_key
            .parse::<LocalWallet>()
            .context("failed parsing ETH_PRIVATE_KEY")?
            .with_chain_id(cfg.chain.id);

        let client = Arc::new(SignerMiddleware::new(rpc.clone(), wallet));

        let addr: Address = cfg
            .contract
            .address
            .parse()
            .context("invalid contract.address")?;
        if addr == Address::zero() {
            return Err(anyhow!("contract.address is zero; deploy and update config"));
        }

        let contract = AuctionLedger::new(addr, client.clone());
        Ok(Self {
            rpc,
            client,
            contract,
        })
    }

    fn bid_event(filter: HighestBidIncreasedFilter, block_height: u64) -> Option<BidEvent> {
        let amount = match u128::try_from(filter.amount) {
            Ok(amount) => amount,
            Err(_) => {
                warn!(block_height, "bid amount exceeds supported range, skipping event");
                return None;
            }
        };
        Some(BidEvent {
            bidder: format!("{:#x}", filter.bidder),
            amount,
            block_height,
        })
    }
}

#[async_trait]
impl WalletProvider for EthWalletProvider {
    async fn accounts(&self) -> Result<Vec<String>, ProviderFailure> {
        // The local signer is the single authorized account.
        Ok(vec![format!("{:#x}", self.client.signer().address())])
    }

    async fn chain_id(&self) -> Result<u64, ProviderFailure> {
        let id = self
            .client
            .get_chainid()
            .await
            .map_err(|err| failure_from_middleware(&err))?;
        Ok(id.as_u64())
    }

    async fn query_bid_events(
        &self,
        lookback_blocks: u64,
    ) -> Result<Vec<BidEvent>, ProviderFailure> {
        let latest = self
            .client
            .get_block_number()
            .await
            .map_err(|err| failure_from_middleware(&err))?
            .as_u64();
        let from_block = latest.saturating_sub(lookback_blocks);

        let entries = self
            .contract
            .event::<HighestBidIncreasedFilter>()
            .from_block(from_block)
            .to_block(latest)
            .query_with_meta()
            .await
            .map_err(|err| failure_from_contract(&err))?;

        let mut out = Vec::with_capacity(entries.len());
        for (filter, meta) in entries {
            if let Some(event) = Self::bid_event(filter, meta.block_number.as_u64()) {
                out.push(event);
            }
        }
        Ok(out)
    }

    async fn subscribe_bids(
        &self,
        events: mpsc::Sender<BidEvent>,
    ) -> Result<SubscriptionHandle, ProviderFailure> {
        let contract = self.contract.clone();
        let client = Arc::clone(&self.client);
        let start = self
            .client
            .get_block_number()
            .await
            .map_err(|err| failure_from_middleware(&err))?
            .as_u64();

        let task = tokio::spawn(async move {
            let mut next_block = start.saturating_add(1);
            loop {
                tokio::time::sleep(EVENT_POLL_INTERVAL).await;
                let latest = match client.get_block_number().await {
                    Ok(block) => block.as_u64(),
                    Err(err) => {
                        warn!(error = %err, "block number poll failed");
                        continue;
                    }
                };
                if latest < next_block {
                    continue;
                }
                let query = contract
                    .event::<HighestBidIncreasedFilter>()
                    .from_block(next_block)
                    .to_block(latest);
                match query.query_with_meta().await {
                    Ok(entries) => {
                        for (filter, meta) in entries {
                            let Some(event) =
                                EthWalletProvider::bid_event(filter, meta.block_number.as_u64())
                            else {
                                continue;
                            };
                            // Receiver gone means the session tore down.
                            if events.send(event).await.is_err() {
                                return;
                            }
                        }
                        next_block = latest.saturating_add(1);
                    }
                    Err(err) => {
                        warn!(error = %err, "bid event poll failed");
                    }
                }
            }
        });
        Ok(SubscriptionHandle::from_task(task))
    }

    async fn pending_payments(&self, account: &str) -> Result<u128, ProviderFailure> {
        let account: Address = account
            .parse()
            .map_err(|_| ProviderFailure::message(format!("invalid account address: {account}")))?;
        let owed: U256 = self
            .contract
            .payments(account)
            .call()
            .await
            .map_err(|err| failure_from_contract(&err))?;
        u128::try_from(owed)
            .map_err(|_| ProviderFailure::message("pending payment exceeds supported range"))
    }

    async fn submit_bid(&self, amount: u128) -> Result<TxOutcome, ProviderFailure> {
        let call = self.contract.bid().value(U256::from(amount));
        let pending = call
            .send()
            .await
            .map_err(|err| failure_from_contract(&err))?;
        let receipt = pending
            .await
            .map_err(|err| failure_from_provider(&err))?
            .ok_or_else(|| ProviderFailure::message("transaction dropped from mempool"))?;
        Ok(TxOutcome {
            tx_ref: format!("0x{}", hex::encode(receipt.transaction_hash.as_bytes())),
            block_height: receipt.block_number.map(|b| b.as_u64()).unwrap_or_default(),
        })
    }

    async fn submit_withdrawal(&self, account: &str) -> Result<TxOutcome, ProviderFailure> {
        let payee: Address = account
            .parse()
            .map_err(|_| ProviderFailure::message(format!("invalid account address: {account}")))?;
        let call = self.contract.withdraw_payments(payee);
        let pending = call
            .send()
            .await
            .map_err(|err| failure_from_contract(&err))?;
        let receipt = pending
            .await
            .map_err(|err| failure_from_provider(&err))?
            .ok_or_else(|| ProviderFailure::message("transaction dropped from mempool"))?;
        Ok(TxOutcome {
            tx_ref: format!("0x{}", hex::encode(receipt.transaction_hash.as_bytes())),
            block_height: receipt.block_number.map(|b| b.as_u64()).unwrap_or_default(),
        })
    }

    async fn watch_asset(&self, asset: &AssetDescriptor) -> Result<bool, ProviderFailure> {
        let params = serde_json::json!({
            "type": "ERC20",
            "options": {
                "address": asset.contract_address,
                "symbol": asset.symbol,
                "decimals": asset.decimals,
                "image": asset.image_url,
            }
        });
        self.rpc
            .request::<_, bool>("wallet_watchAsset", params)
            .await
            .map_err(|err| failure_from_provider(&err))
    }
}

fn failure_from_rpc(err: &JsonRpcError) -> ProviderFailure {
    ProviderFailure {
        code: Some(err.code),
        message: err.message.clone(),
        data: err.data.as_ref().map(|data| FailureData {
            message: data.to_string(),
        }),
    }
}

fn failure_from_provider(err: &ProviderError) -> ProviderFailure {
    match err.as_error_response() {
        Some(rpc) => failure_from_rpc(rpc),
        None => ProviderFailure::message(err.to_string()),
    }
}

fn failure_from_middleware<E: MiddlewareError>(err: &E) -> ProviderFailure {
    match err.as_error_response() {
        Some(rpc) => failure_from_rpc(rpc),
        None => ProviderFailure::message(err.to_string()),
    }
}

fn failure_from_contract<M: Middleware>(err: &ContractError<M>) -> ProviderFailure {
    if let Some(reason) = err.decode_revert::<String>() {
        return ProviderFailure::with_data(
            err.to_string(),
            format!("execution reverted: custom error '{reason}'"),
        );
    }
    if let Some(mw) = err.as_middleware_error() {
        return failure_from_middleware(mw);
    }
    ProviderFailure::message(err.to_string())
}
