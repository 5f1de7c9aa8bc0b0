//! Transaction Orchestration
//!
//! Executes mints and swap legs for one account session. Every on-chain
//! operation follows the same chain:
//!
//! 1. Read the pending nonce
//! 2. Read the gas price and apply the configured multiplier
//! 3. Build the intent with the static gas limit for its kind
//! 4. Sign with the session key
//! 5. Submit and wait for the receipt
//!
//! A swap leg is an approve for the router followed by the swap itself, both
//! strictly sequential so nonces never race. Swaps are submitted with
//! `amountOutMinimum = 0`: there is no slippage protection, and the received
//! amount is only known by re-reading balances afterwards.

use anyhow::{Context, Result};
use ethereum_types::U256;
use std::time::Duration;
use tracing::{debug, error};

use crate::abi::{self, ExactInputSingleParams};
use crate::chain::{EvmRpcClient, Receipt};
use crate::claim::unix_now;
use crate::config::{GasConfig, RouterConfig};
use crate::planner::SwapLeg;
use crate::session::AccountSession;
use crate::{custom, success};
use crate::tokens::{format_units, Token, TokenRegistry};
use crate::tx::{TransactionIntent, TxKind};

/// Summary of a plan execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanReport {
    /// Legs whose approve and swap were both mined
    pub completed: usize,
    /// Legs that failed at either step
    pub failed: usize,
    /// Approve and swap transactions attempted, whether or not they were mined
    pub submitted: usize,
}

/// Runs mint, approve and swap transactions for one account at a time.
#[derive(Debug, Clone)]
pub struct TransactionOrchestrator {
    client: EvmRpcClient,
    registry: TokenRegistry,
    router: RouterConfig,
    gas: GasConfig,
    chain_id: u64,
    settle_delay: Duration,
}

impl TransactionOrchestrator {
    pub fn new(
        client: EvmRpcClient,
        registry: TokenRegistry,
        router: RouterConfig,
        gas: GasConfig,
        chain_id: u64,
        settle_delay: Duration,
    ) -> Self {
        Self {
            client,
            registry,
            router,
            gas,
            chain_id,
            settle_delay,
        }
    }

    pub fn client(&self) -> &EvmRpcClient {
        &self.client
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    fn gas_limit(&self, kind: TxKind) -> u64 {
        match kind {
            TxKind::Mint => self.gas.mint_limit,
            TxKind::Approve => self.gas.approve_limit,
            TxKind::Swap => self.gas.swap_limit,
        }
    }

    /// Builds, signs, submits and awaits one transaction.
    async fn submit(
        &self,
        session: &AccountSession,
        kind: TxKind,
        to: &str,
        data: Vec<u8>,
    ) -> Result<Receipt> {
        let nonce = self
            .client
            .pending_nonce(session.address())
            .await
            .context("Failed to read nonce")?;
        let gas_price = self
            .client
            .adjusted_gas_price(self.gas.price_multiplier)
            .await
            .context("Failed to read gas price")?;

        let intent = TransactionIntent {
            kind,
            to: abi::parse_address(to)?,
            data,
            gas_limit: self.gas_limit(kind),
            gas_price,
            nonce,
            chain_id: self.chain_id,
        };
        let signed = session.sign(intent)?;
        debug!(
            "Submitting {} tx: from={}, to={}, nonce={}, gas_price={}",
            kind,
            session.address(),
            to,
            nonce,
            gas_price
        );

        let receipt = self
            .client
            .send_signed(&signed)
            .await
            .with_context(|| format!("{} transaction failed", kind))?;
        Ok(receipt)
    }

    /// Claims from a faucet token by calling `mint()` on it.
    pub async fn mint(&self, session: &AccountSession, token: &Token) -> Result<Receipt> {
        let receipt = self
            .submit(session, TxKind::Mint, &token.address, abi::encode_mint())
            .await
            .with_context(|| {
                format!("Mint {} failed for wallet {}", token.symbol, session.address())
            })?;
        success!(
            "{} mint successful for wallet {}. Tx hash: {}",
            token.symbol,
            session.address(),
            receipt.transaction_hash
        );
        Ok(receipt)
    }

    /// Approves the router to spend `amount` of `token`.
    pub async fn approve(
        &self,
        session: &AccountSession,
        token: &str,
        amount: U256,
    ) -> Result<Receipt> {
        let data = abi::encode_approve(&self.router.address, amount)?;
        let receipt = self
            .submit(session, TxKind::Approve, token, data)
            .await
            .with_context(|| format!("Error approving token {}", token))?;
        success!(
            "Approved {} {}. Tx hash: {}",
            self.human_amount(token, amount),
            self.registry.symbol_of(token),
            receipt.transaction_hash
        );
        Ok(receipt)
    }

    /// Swaps `leg.amount` of `leg.token_in` into `leg.token_out` through the router.
    pub async fn swap(&self, session: &AccountSession, leg: &SwapLeg) -> Result<Receipt> {
        let params = ExactInputSingleParams {
            token_in: leg.token_in.clone(),
            token_out: leg.token_out.clone(),
            fee: self.router.fee_tier,
            recipient: session.address().to_string(),
            deadline: unix_now() + self.router.deadline_secs,
            amount_in: leg.amount,
            amount_out_minimum: U256::zero(),
            sqrt_price_limit_x96: U256::zero(),
        };
        let data = abi::encode_exact_input_single(&params)?;
        let receipt = self
            .submit(session, TxKind::Swap, &self.router.address, data)
            .await
            .context("Error swapping token")?;
        success!(
            "Swapped {} {} to {}. Tx hash: {}",
            self.human_amount(&leg.token_in, leg.amount),
            self.registry.symbol_of(&leg.token_in),
            self.registry.symbol_of(&leg.token_out),
            receipt.transaction_hash
        );
        Ok(receipt)
    }

    /// Approve then swap. The swap is only submitted once the approve is mined.
    ///
    /// Returns the number of transactions submitted alongside the result.
    async fn execute_leg(&self, session: &AccountSession, leg: &SwapLeg) -> (usize, Result<()>) {
        if let Err(e) = self.approve(session, &leg.token_in, leg.amount).await {
            return (1, Err(e));
        }
        match self.swap(session, leg).await {
            Ok(_) => (2, Ok(())),
            Err(e) => (2, Err(e)),
        }
    }

    /// Executes legs in order. A failing leg is logged and the next leg still runs.
    pub async fn execute_plan(&self, session: &AccountSession, legs: &[SwapLeg]) -> PlanReport {
        let mut report = PlanReport::default();
        for leg in legs {
            custom!(
                "Swapping {} {} to {}...",
                self.human_amount(&leg.token_in, leg.amount),
                self.registry.symbol_of(&leg.token_in),
                self.registry.symbol_of(&leg.token_out)
            );

            let (submitted, result) = self.execute_leg(session, leg).await;
            report.submitted += submitted;
            match result {
                Ok(()) => report.completed += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(
                        "Error swapping {} to {}: {:#}",
                        self.registry.symbol_of(&leg.token_in),
                        self.registry.symbol_of(&leg.token_out),
                        e
                    );
                }
            }

            tokio::time::sleep(self.settle_delay).await;
        }
        report
    }

    fn human_amount(&self, token: &str, amount: U256) -> String {
        let decimals = self.registry.by_address(token).map(|t| t.decimals).unwrap_or(18);
        format_units(amount, decimals)
    }
}
