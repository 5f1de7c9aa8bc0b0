//! Cycle Scheduler
//!
//! Drives the outer loop: a bounded round-robin over all accounts, one full
//! cycle per account, until the budget is used up or a shutdown is requested.
//!
//! One cycle = open session → claim from each eligible faucet → read balances
//! → phase 1 swaps → re-read balances → phase 2 swaps → re-read and log
//! balances → close session.
//!
//! Accounts run one after another. Failures inside a cycle are logged and the
//! cycle still counts against the budget; they never stop the run.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::claim::ClaimEvaluator;
use crate::credentials::KeyRing;
use crate::orchestrator::{PlanReport, TransactionOrchestrator};
use crate::planner::{BalanceSheet, SwapPlanner};
use crate::session::AccountSession;
use crate::tokens::format_units;
use crate::{custom, success};

// ============================================================================
// BUDGET
// ============================================================================

/// Global cycle budget. Clones share the same counter.
#[derive(Debug, Clone)]
pub struct TransactionBudget {
    used: Arc<AtomicU64>,
    limit: u64,
}

impl TransactionBudget {
    pub fn new(limit: u64) -> Self {
        Self {
            used: Arc::new(AtomicU64::new(0)),
            limit,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used() >= self.limit
    }

    /// Counts one unit, never going past the limit. Returns the new count.
    pub fn consume(&self) -> u64 {
        let limit = self.limit;
        match self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < limit).then_some(used + 1)
            }) {
            Ok(previous) => previous + 1,
            Err(current) => current,
        }
    }
}

// ============================================================================
// REPORTS
// ============================================================================

/// Outcome of one account cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub address: String,
    pub mints: usize,
    pub mint_failures: usize,
    pub outbound: PlanReport,
    pub inbound: PlanReport,
}

impl CycleReport {
    /// Transactions attempted during the cycle.
    pub fn transactions(&self) -> usize {
        self.mints + self.mint_failures + self.outbound.submitted + self.inbound.submitted
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub transactions_attempted: usize,
    pub budget_exhausted: bool,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn cycles(&self) -> u64 {
        self.cycles_completed + self.cycles_failed
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

pub struct CycleScheduler {
    orchestrator: TransactionOrchestrator,
    planner: SwapPlanner,
    claims: ClaimEvaluator,
    budget: TransactionBudget,
    inter_account_delay: Duration,
}

impl CycleScheduler {
    pub fn new(
        orchestrator: TransactionOrchestrator,
        planner: SwapPlanner,
        claims: ClaimEvaluator,
        budget: TransactionBudget,
        inter_account_delay: Duration,
    ) -> Self {
        Self {
            orchestrator,
            planner,
            claims,
            budget,
            inter_account_delay,
        }
    }

    pub fn budget(&self) -> &TransactionBudget {
        &self.budget
    }

    /// Runs cycles round-robin over `keys` until the budget is used up or
    /// `shutdown` turns true. A running cycle always finishes first.
    ///
    /// An empty key ring does no work.
    pub async fn run(&self, keys: &KeyRing, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        let mut summary = RunSummary::default();
        if keys.is_empty() {
            warn!("No accounts loaded, nothing to do");
            return summary;
        }

        let limit = self.budget.limit();
        'rounds: loop {
            for (index, secret) in keys.iter().enumerate() {
                if *shutdown.borrow() {
                    info!("Shutdown requested, stopping before account #{}", index + 1);
                    summary.interrupted = true;
                    break 'rounds;
                }
                if self.budget.is_exhausted() {
                    summary.budget_exhausted = true;
                    break 'rounds;
                }

                info!("Transaction {}/{}", self.budget.used() + 1, limit);
                match self.run_cycle(secret).await {
                    Ok(report) => {
                        summary.cycles_completed += 1;
                        summary.transactions_attempted += report.transactions();
                    }
                    Err(e) => {
                        summary.cycles_failed += 1;
                        error!("Error processing account #{}: {:#}", index + 1, e);
                    }
                }

                if self.budget.consume() >= limit {
                    success!("Reached maximum number of transactions ({})", limit);
                    summary.budget_exhausted = true;
                    break 'rounds;
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.inter_account_delay) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
        summary
    }

    /// One full cycle for one account. The session is closed on every path.
    pub async fn run_cycle(&self, secret: &str) -> Result<CycleReport> {
        let session = AccountSession::open(secret).context("Invalid account secret")?;
        let report = self.cycle(&session).await;
        session.close();
        Ok(report)
    }

    async fn cycle(&self, session: &AccountSession) -> CycleReport {
        let client = self.orchestrator.client();
        let registry = self.orchestrator.registry();
        let address = session.address();
        let mut report = CycleReport {
            address: address.to_string(),
            ..Default::default()
        };

        match client.native_balance(address).await {
            Ok(balance) => info!("Wallet balance {}: {}", address, format_units(balance, 18)),
            Err(e) => warn!("Could not read native balance of {}: {}", address, e),
        }

        for token in registry.faucets() {
            let status = self.claims.check(client, &token.address, address).await;
            if !status.eligible {
                warn!(
                    "Cannot claim {} right now. Please wait until the next claim time.",
                    token.symbol
                );
                continue;
            }
            custom!("Starting to mint {} token...", token.symbol);
            match self.orchestrator.mint(session, token).await {
                Ok(_) => report.mints += 1,
                Err(e) => {
                    report.mint_failures += 1;
                    error!("{:#}", e);
                }
            }
        }

        custom!("Checking balance and preparing to swap for wallet {}", address);
        let mut rng = StdRng::from_entropy();

        let sheet = self.read_balances(address, true).await;
        let outbound = self.planner.plan_outbound(registry, &sheet, &mut rng);
        report.outbound = self.orchestrator.execute_plan(session, &outbound).await;

        let sheet = self.read_balances(address, false).await;
        let inbound = self.planner.plan_return(registry, &sheet, &mut rng);
        report.inbound = self.orchestrator.execute_plan(session, &inbound).await;

        let sheet = self.read_balances(address, false).await;
        let summary: Vec<String> = registry
            .all()
            .iter()
            .map(|t| match sheet.get(&t.address) {
                Some(b) => format!("{}={}", t.symbol, format_units(b, t.decimals)),
                None => format!("{}=?", t.symbol),
            })
            .collect();
        custom!("Balances after swapping: {}", summary.join(", "));

        report
    }

    /// Reads every token balance independently; a failed read is recorded, not fatal.
    async fn read_balances(&self, owner: &str, log_each: bool) -> BalanceSheet {
        let client = self.orchestrator.client();
        let mut sheet = BalanceSheet::new();
        for token in self.orchestrator.registry().all() {
            match client.token_balance(&token.address, owner).await {
                Ok(balance) => {
                    if log_each {
                        info!(
                            "{} balance: {}",
                            token.symbol,
                            format_units(balance, token.decimals)
                        );
                    }
                    sheet.set(&token.address, balance);
                }
                Err(e) => {
                    error!("Failed to read {} balance: {}", token.symbol, e);
                    sheet.mark_failed(&token.address);
                }
            }
        }
        sheet
    }
}
