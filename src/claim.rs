//! Claim Eligibility
//!
//! Decides whether an account may claim from a faucet now, from the
//! contract's `lastClaimed(address)` timestamp and a fixed cooldown.

use ethereum_types::U256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

use crate::abi;
use crate::chain::EvmRpcClient;
use crate::custom;

/// Why an account is (or is not) eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimReason {
    /// `lastClaimed` is zero: the account never claimed
    FirstClaim,
    /// The cooldown has elapsed since the last claim
    CooldownElapsed,
    /// The cooldown is still running
    CoolingDown,
    /// The query reverted; treated as a first claim
    QueryReverted,
    /// The query failed for another reason; no claim is attempted
    QueryFailed,
}

/// Claim status derived from chain state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimStatus {
    /// Epoch seconds of the last claim, 0 when unknown or never claimed
    pub last_claimed: u64,
    pub eligible: bool,
    /// Epoch seconds at which the next claim becomes possible, when cooling down
    pub next_eligible_at: Option<u64>,
    pub reason: ClaimReason,
}

/// Pure eligibility rule.
///
/// `last_claimed == 0` is a first claim; otherwise the account is eligible
/// once `now - last_claimed >= cooldown`.
pub fn evaluate(last_claimed: u64, now: u64, cooldown: Duration) -> ClaimStatus {
    if last_claimed == 0 {
        return ClaimStatus {
            last_claimed,
            eligible: true,
            next_eligible_at: None,
            reason: ClaimReason::FirstClaim,
        };
    }

    let cooldown = cooldown.as_secs();
    let elapsed = now.saturating_sub(last_claimed);
    if elapsed >= cooldown {
        ClaimStatus {
            last_claimed,
            eligible: true,
            next_eligible_at: None,
            reason: ClaimReason::CooldownElapsed,
        }
    } else {
        ClaimStatus {
            last_claimed,
            eligible: false,
            next_eligible_at: Some(last_claimed.saturating_add(cooldown)),
            reason: ClaimReason::CoolingDown,
        }
    }
}

/// Queries faucet contracts and applies [`evaluate`].
#[derive(Debug, Clone)]
pub struct ClaimEvaluator {
    cooldown: Duration,
}

impl ClaimEvaluator {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    /// Checks whether `account` may claim from `contract` now.
    ///
    /// Never fails: a reverted query is read as "never claimed" (some faucets
    /// revert for unknown addresses instead of returning zero), and any other
    /// failure is logged and reported as ineligible.
    pub async fn check(&self, client: &EvmRpcClient, contract: &str, account: &str) -> ClaimStatus {
        self.check_at(client, contract, account, unix_now()).await
    }

    /// [`check`](Self::check) with an explicit current time.
    pub async fn check_at(
        &self,
        client: &EvmRpcClient,
        contract: &str,
        account: &str,
        now: u64,
    ) -> ClaimStatus {
        let last_claimed = match self.query_last_claimed(client, contract, account).await {
            Ok(ts) => ts,
            Err(QueryError::Reverted(msg)) => {
                error!("Error checking eligibility to claim: {}", msg);
                custom!("Query reverted, but this may be the first claim; trying to claim");
                return ClaimStatus {
                    last_claimed: 0,
                    eligible: true,
                    next_eligible_at: None,
                    reason: ClaimReason::QueryReverted,
                };
            }
            Err(QueryError::Other(msg)) => {
                error!("Error checking eligibility to claim: {}", msg);
                return ClaimStatus {
                    last_claimed: 0,
                    eligible: false,
                    next_eligible_at: None,
                    reason: ClaimReason::QueryFailed,
                };
            }
        };

        let status = evaluate(last_claimed, now, self.cooldown);
        match status.reason {
            ClaimReason::FirstClaim => custom!("This is the first claim"),
            _ => {
                info!(
                    "Last claim: {} | Can claim now: {}",
                    describe_age(last_claimed, now),
                    status.eligible
                );
                if let Some(next) = status.next_eligible_at {
                    warn!(
                        "Next claim time: {} (epoch {})",
                        describe_wait(next.saturating_sub(now)),
                        next
                    );
                }
            }
        }
        status
    }

    async fn query_last_claimed(
        &self,
        client: &EvmRpcClient,
        contract: &str,
        account: &str,
    ) -> Result<u64, QueryError> {
        let data = abi::encode_last_claimed(account).map_err(|e| QueryError::Other(e.to_string()))?;
        let result = client.call(contract, &data).await.map_err(|e| {
            if e.is_revert() {
                QueryError::Reverted(e.to_string())
            } else {
                QueryError::Other(e.to_string())
            }
        })?;
        let value = abi::decode_uint(&result).map_err(|e| QueryError::Other(e.to_string()))?;
        if value > U256::from(u64::MAX) {
            return Err(QueryError::Other(format!("lastClaimed {} out of range", value)));
        }
        Ok(value.as_u64())
    }
}

enum QueryError {
    Reverted(String),
    Other(String),
}

/// Current time in epoch seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn describe_age(last_claimed: u64, now: u64) -> String {
    format!("{} ago (epoch {})", describe_wait(now.saturating_sub(last_claimed)), last_claimed)
}

fn describe_wait(secs: u64) -> String {
    format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
}
