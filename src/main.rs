//! Faucet Rebalancer
//!
//! Claims faucet tokens and rebalances them through the swap router for every
//! account in the credentials file, round-robin, until the cycle budget is
//! used up or Ctrl-C is pressed.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin faucet-rebalancer -- --config config/faucet-rebalancer.toml
//! ```
//!
//! Or set the config path via environment variable:
//!
//! ```bash
//! FAUCET_REBALANCER_CONFIG_PATH=rebalancer.toml cargo run --bin faucet-rebalancer
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use faucet_rebalancer::{
    config::{Config, DEFAULT_CONFIG_PATH},
    logging, ClaimEvaluator, CycleScheduler, EvmRpcClient, KeyRing, SwapPercentRange,
    SwapPlanner, TokenRegistry, TransactionBudget, TransactionOrchestrator,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "faucet-rebalancer")]
#[command(about = "Claims faucet tokens and rebalances them through a swap router")]
struct Args {
    /// Path to configuration file (default: config/faucet-rebalancer.toml)
    #[arg(short, long, env = "FAUCET_REBALANCER_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Credentials file, one hex secret per line (overrides config)
    #[arg(short, long)]
    keys: Option<PathBuf>,

    /// Maximum number of account cycles (overrides config)
    #[arg(short, long)]
    budget: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        // No-op when logging is already up; covers config errors before init.
        let _ = logging::try_init("info");
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    // Priority: --config > FAUCET_REBALANCER_CONFIG_PATH (both via clap) > default
    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if let Some(keys) = args.keys {
        config.credentials.path = keys;
    }
    if let Some(budget) = args.budget {
        config.schedule.transaction_budget = budget;
    }

    let level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    if let Err(e) = logging::try_init(level) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("Starting Faucet Rebalancer");
    match &args.config {
        Some(path) => info!("Configuration loaded from: {}", path.display()),
        None => info!("Configuration loaded from {} (or built-in defaults)", DEFAULT_CONFIG_PATH),
    }
    info!("RPC URL: {}", config.chain.rpc_url);
    info!("Router: {}", config.router.address);
    info!("Budget: {} cycle(s)", config.schedule.transaction_budget);

    let keys = KeyRing::load_or_empty(&config.credentials.path);
    if keys.is_empty() {
        warn!("No private keys found in {}", config.credentials.path.display());
        return Ok(());
    }

    let client = EvmRpcClient::new(&config.chain)?;
    let chain_id = match config.chain.chain_id {
        Some(id) => id,
        None => client
            .chain_id()
            .await
            .context("Failed to query chain ID from RPC")?,
    };
    info!("Chain ID: {}", chain_id);

    let registry = TokenRegistry::from_config(&config.tokens)?;
    let range = SwapPercentRange::new(config.swap.min_pct, config.swap.max_pct)?;
    info!(
        "Swap range: {:.2}% to {:.2}% of balance",
        range.min() * 100.0,
        range.max() * 100.0
    );
    let orchestrator = TransactionOrchestrator::new(
        client,
        registry,
        config.router.clone(),
        config.gas.clone(),
        chain_id,
        Duration::from_millis(config.schedule.settle_delay_ms),
    );
    let scheduler = CycleScheduler::new(
        orchestrator,
        SwapPlanner::new(range),
        ClaimEvaluator::new(Duration::from_secs(config.schedule.claim_cooldown_secs)),
        TransactionBudget::new(config.schedule.transaction_budget),
        Duration::from_millis(config.schedule.inter_account_delay_ms),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, finishing current cycle...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!("Failed to listen for shutdown signal: {}", e);
                // Keep the sender alive so the scheduler never sees a closed channel.
                std::future::pending::<()>().await;
            }
        }
    });

    let summary = scheduler.run(&keys, shutdown_rx).await;
    info!(
        "Run finished: {} cycle(s) completed, {} failed, {} transaction(s) attempted",
        summary.cycles_completed, summary.cycles_failed, summary.transactions_attempted
    );
    Ok(())
}
