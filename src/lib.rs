//! Faucet Rebalancer Library
//!
//! Drives a batch of EVM accounts through a repeating cycle: claim the daily
//! allowance from each faucet token, then rebalance a random fraction of the
//! hub token into every spoke token and part of the result back, through a
//! Uniswap-V3-style router.

pub mod abi;
pub mod chain;
pub mod claim;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod planner;
pub mod scheduler;
pub mod session;
pub mod tokens;
pub mod tx;

// Re-export commonly used types
pub use chain::{EvmRpcClient, Receipt};
pub use claim::{ClaimEvaluator, ClaimReason, ClaimStatus};
pub use config::Config;
pub use credentials::KeyRing;
pub use error::{ChainError, CredentialsError, SessionError};
pub use orchestrator::{PlanReport, TransactionOrchestrator};
pub use planner::{BalanceSheet, SwapLeg, SwapPercentRange, SwapPlanner};
pub use scheduler::{CycleReport, CycleScheduler, RunSummary, TransactionBudget};
pub use session::AccountSession;
pub use tokens::{Token, TokenRegistry};
