#![forbid(unsafe_code)]
#![deny(clippy::float_arithmetic)]
#![deny(clippy::float_cmp)]

use anyhow::Result;
use auction_core::format_amount;
use auction_node::config::NodeConfig;
use auction_node::engine::{EngineConfig, SessionEngine};
use auction_node::eth_provider::EthWalletProvider;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const DEFAULT_CONFIG: &str = "configs/auction.toml";

#[derive(Parser, Debug)]
#[command(name = "auction-node", about = "Auction session node")]
struct Args {
    #[command(subcommand)]
    command: Option<Cli>,
}

#[derive(Parser, Debug)]
#[command(name = "auction-node")]
enum Cli {
    /// Run the session loop: reconcile once, then on every live bid event (default).
    Watch {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
    /// One-shot: reconcile once and print the bid ledger and refund state.
    Status {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
    /// Place a bid, given as a decimal amount in whole tokens.
    Bid {
        amount: String,
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
    /// Withdraw the pending refund owed to the signing account.
    Withdraw {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
    /// Ask the wallet to track the auctioned asset.
    Register {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let cmd = args.command.unwrap_or(Cli::Watch {
        config: PathBuf::from(DEFAULT_CONFIG),
    });

    match cmd {
        Cli::Watch { config } => run_watch(&config).await,
        Cli::Status { config } => run_status(&config).await,
        Cli::Bid { amount, config } => run_bid(&config, &amount).await,
        Cli::Withdraw { config } => run_withdraw(&config).await,
        Cli::Register { config } => run_register(&config).await,
    }
}

async fn build_engine(config_path: &Path) -> Result<(NodeConfig, Arc<SessionEngine>)> {
    let cfg = NodeConfig::from_toml(config_path)?;
    let provider = EthWalletProvider::new(&cfg).await?;
    let engine = Arc::new(SessionEngine::new(
        Some(Arc::new(provider)),
        EngineConfig::from(&cfg),
    ));
    Ok((cfg, engine))
}

async fn run_watch(config_path: &Path) -> Result<()> {
    let (cfg, engine) = build_engine(config_path).await?;
    info!(
        rpc_url = %cfg.chain.rpc_url,
        chain = %cfg.chain.name,
        contract = %cfg.contract.address,
        lookback = cfg.auction.lookback_blocks,
        "starting auction session node"
    );

    tokio::select! {
        result = engine.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("session stopped by user");
        }
    }
    Ok(())
}

async fn run_status(config_path: &Path) -> Result<()> {
    let (cfg, engine) = build_engine(config_path).await?;
    engine.reconcile().await;
    let snapshot = engine.snapshot();

    println!("connection: {:?}", snapshot.connection);
    println!("bids ({}):", snapshot.bids.len());
    for bid in &snapshot.bids {
        println!(
            "- {} {} (block {})",
            bid.display_bidder,
            format_amount(bid.amount, cfg.auction.unit_decimals),
            bid.block_height
        );
    }
    match snapshot.refund {
        Some(refund) if refund.owed > 0 => println!(
            "refund owed to {}: {}",
            refund.account.address,
            format_amount(refund.owed, cfg.auction.unit_decimals)
        ),
        _ => println!("no refund owed"),
    }
    Ok(())
}

async fn run_bid(config_path: &Path, amount: &str) -> Result<()> {
    let (_, engine) = build_engine(config_path).await?;
    let outcome = engine.place_bid(amount).await?;
    println!("bid confirmed: {} (block {})", outcome.tx_ref, outcome.block_height);
    Ok(())
}

async fn run_withdraw(config_path: &Path) -> Result<()> {
    let (_, engine) = build_engine(config_path).await?;
    // Withdraw needs the published refund state, so reconcile first.
    engine.reconcile().await;
    let outcome = engine.withdraw().await?;
    println!(
        "withdrawal confirmed: {} (block {})",
        outcome.tx_ref, outcome.block_height
    );
    Ok(())
}

async fn run_register(config_path: &Path) -> Result<()> {
    let (cfg, engine) = build_engine(config_path).await?;
    let accepted = engine.register_asset(&cfg.asset_descriptor()).await?;
    if accepted {
        println!("asset registered in wallet");
    } else {
        println!("asset registration dismissed");
    }
    Ok(())
}
