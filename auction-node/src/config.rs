use anyhow::{anyhow, Context, Result};
use auction_core::provider::{AssetDescriptor, NO_ITEM_SENTINEL};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Default trailing window scanned for historical bid events, sized to
/// roughly one day of chain activity.
const DEFAULT_LOOKBACK_BLOCKS: u64 = 6_500;
/// Default smallest-unit exponent of the chain's native value.
const DEFAULT_UNIT_DECIMALS: u32 = 18;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub chain: ChainConfig,
    pub contract: ContractConfig,
    #[serde(default)]
    pub auction: AuctionConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub asset: AssetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    /// Chain identifier the session is bound to; any other chain reported by
    /// the provider is a mismatch.
    pub id: u64,
    /// Display name used in chain-mismatch messages.
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// Address of the auction ledger contract.
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuctionConfig {
    #[serde(default = "default_lookback_blocks")]
    pub lookback_blocks: u64,
    #[serde(default = "default_unit_decimals")]
    pub unit_decimals: u32,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            lookback_blocks: DEFAULT_LOOKBACK_BLOCKS,
            unit_decimals: DEFAULT_UNIT_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionsConfig {
    /// Upper bound on waiting for transaction finality. Absent means wait
    /// indefinitely.
    #[serde(default)]
    pub confirmation_timeout_ms: Option<u64>,
}

/// Display metadata for the register-asset action. The defaults describe the
/// "no item" placeholder, which the pipeline refuses to register.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    #[serde(default = "default_token_id")]
    pub token_id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            token_id: NO_ITEM_SENTINEL.to_string(),
            symbol: String::new(),
            decimals: 0,
            image_url: None,
        }
    }
}

fn default_lookback_blocks() -> u64 {
    DEFAULT_LOOKBACK_BLOCKS
}

fn default_unit_decimals() -> u32 {
    DEFAULT_UNIT_DECIMALS
}

fn default_token_id() -> String {
    NO_ITEM_SENTINEL.to_string()
}

impl NodeConfig {
    pub fn from_toml(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading config file: {}", path.display()))?;
        let mut cfg: NodeConfig = toml::from_str(&raw).context("failed parsing config toml")?;

        // Env override (explicit) first.
        if let Ok(v) = env::var("AUCTION_RPC_URL") {
            if !v.trim().is_empty() {
                cfg.chain.rpc_url = v;
            }
        }

        // Resolve env:VAR references.
        cfg.chain.rpc_url = resolve_env_ref(&cfg.chain.rpc_url)?;

        if cfg.chain.rpc_url.trim().is_empty() {
            return Err(anyhow!("chain.rpc_url must not be empty"));
        }
        if cfg.chain.name.trim().is_empty() {
            return Err(anyhow!("chain.name must not be empty"));
        }
        if cfg.contract.address.trim().is_empty() {
            return Err(anyhow!("contract.address must not be empty"));
        }
        if cfg.auction.lookback_blocks == 0 {
            return Err(anyhow!("auction.lookback_blocks must be > 0"));
        }
        if cfg.auction.unit_decimals > 38 {
            return Err(anyhow!("auction.unit_decimals must be <= 38"));
        }

        Ok(cfg)
    }

    /// Asset descriptor handed to the register-asset action.
    pub fn asset_descriptor(&self) -> AssetDescriptor {
        AssetDescriptor {
            token_id: self.asset.token_id.clone(),
            contract_address: self.contract.address.clone(),
            symbol: self.asset.symbol.clone(),
            decimals: self.asset.decimals,
            image_url: self.asset.image_url.clone(),
        }
    }
}

pub fn resolve_env_ref(value: &str) -> Result<String> {
    const PREFIX: &str = "env:";
    if let Some(var) = value.strip_prefix(PREFIX) {
        let var = var.trim();
        if var.is_empty() {
            return Err(anyhow!("invalid env ref: {value}"));
        }
        return env::var(var).with_context(|| format!("missing env var {var} for {value}"));
    }
    Ok(value.to_string())
}

pub fn required_env(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("missing required env var {name}"))
}
