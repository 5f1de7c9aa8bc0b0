//! Swap Planning
//!
//! Turns current balances into a randomized rebalancing plan:
//!
//! - Phase 1 (outbound): one hub → spoke leg per spoke, each sized from the
//!   hub balance with its own random fraction.
//! - Phase 2 (return): one spoke → hub leg per spoke whose refreshed balance
//!   is nonzero, again with an independent fraction.
//!
//! Planning is pure; the caller supplies the balances and the RNG. Legs whose
//! computed amount is zero are dropped rather than submitted.

use ethereum_types::U256;
use rand::Rng;
use std::collections::HashMap;

use crate::tokens::{normalize_address, Token, TokenRegistry};

/// Fixed-point scale for sampled fractions.
const FRACTION_SCALE: u128 = 1_000_000_000_000_000_000;

/// Half-open range `[min, max)` of balance fractions a leg may move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapPercentRange {
    min: f64,
    max: f64,
}

impl SwapPercentRange {
    /// # Returns
    ///
    /// * `Ok(SwapPercentRange)` - `0 <= min < max <= 1`
    /// * `Err(anyhow::Error)` - Any other combination
    pub fn new(min: f64, max: f64) -> anyhow::Result<Self> {
        if !(min >= 0.0 && min < max && max <= 1.0) {
            anyhow::bail!(
                "Swap percentage range must satisfy 0 <= min < max <= 1, got [{}, {})",
                min,
                max
            );
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Draws a fraction in `[min, max)` as a fixed-point value over `FRACTION_SCALE`.
    fn sample_scaled<R: Rng + ?Sized>(&self, rng: &mut R) -> u128 {
        let lower = (self.min * FRACTION_SCALE as f64).ceil() as u128;
        let upper = (self.max * FRACTION_SCALE as f64).floor() as u128;
        let fraction: f64 = rng.gen_range(self.min..self.max);
        let scaled = (fraction * FRACTION_SCALE as f64) as u128;
        scaled.clamp(lower, upper.saturating_sub(1).max(lower))
    }
}

/// `floor(balance * fraction)` for a fraction drawn in `[min, max)`.
///
/// Returns zero for a zero balance.
pub fn calculate_swap_amount<R: Rng + ?Sized>(
    balance: U256,
    range: &SwapPercentRange,
    rng: &mut R,
) -> U256 {
    if balance.is_zero() {
        return U256::zero();
    }
    let scaled = U256::from(range.sample_scaled(rng));
    let scale = U256::from(FRACTION_SCALE);

    // floor(B * f / S) = (B / S) * f + floor((B % S) * f / S), without overflowing B * f
    let whole = (balance / scale).saturating_mul(scaled);
    let rest = (balance % scale) * scaled / scale;
    whole.saturating_add(rest).min(balance)
}

/// One planned swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapLeg {
    pub token_in: String,
    pub token_out: String,
    pub amount: U256,
}

/// Token balances keyed by address. `None` marks a balance that could not be read.
#[derive(Debug, Clone, Default)]
pub struct BalanceSheet {
    balances: HashMap<String, Option<U256>>,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful read.
    pub fn set(&mut self, token: &str, amount: U256) {
        self.balances.insert(normalize_address(token), Some(amount));
    }

    /// Records a failed read.
    pub fn mark_failed(&mut self, token: &str) {
        self.balances.insert(normalize_address(token), None);
    }

    /// Known balance, `None` when unread or failed.
    pub fn get(&self, token: &str) -> Option<U256> {
        self.balances.get(&normalize_address(token)).copied().flatten()
    }

    pub fn is_known(&self, token: &str) -> bool {
        self.get(token).is_some()
    }
}

/// Builds the two plan phases from a token registry and a percentage range.
#[derive(Debug, Clone)]
pub struct SwapPlanner {
    range: SwapPercentRange,
}

impl SwapPlanner {
    pub fn new(range: SwapPercentRange) -> Self {
        Self { range }
    }

    /// Phase 1: hub → every spoke.
    ///
    /// Nothing is planned when the hub balance is unknown or zero. A spoke
    /// whose balance read failed gets no leg.
    pub fn plan_outbound<R: Rng + ?Sized>(
        &self,
        registry: &TokenRegistry,
        sheet: &BalanceSheet,
        rng: &mut R,
    ) -> Vec<SwapLeg> {
        let hub = registry.hub();
        let hub_balance = match sheet.get(&hub.address) {
            Some(b) if !b.is_zero() => b,
            _ => return Vec::new(),
        };

        registry
            .spokes()
            .filter(|spoke| sheet.is_known(&spoke.address))
            .filter_map(|spoke| self.leg(hub, spoke, hub_balance, rng))
            .collect()
    }

    /// Phase 2: every spoke with a nonzero refreshed balance → hub.
    ///
    /// Nothing is planned when the hub balance read failed.
    pub fn plan_return<R: Rng + ?Sized>(
        &self,
        registry: &TokenRegistry,
        sheet: &BalanceSheet,
        rng: &mut R,
    ) -> Vec<SwapLeg> {
        let hub = registry.hub();
        if !sheet.is_known(&hub.address) {
            return Vec::new();
        }

        registry
            .spokes()
            .filter_map(|spoke| {
                let balance = sheet.get(&spoke.address).filter(|b| !b.is_zero())?;
                self.leg(spoke, hub, balance, rng)
            })
            .collect()
    }

    fn leg<R: Rng + ?Sized>(
        &self,
        from: &Token,
        to: &Token,
        balance: U256,
        rng: &mut R,
    ) -> Option<SwapLeg> {
        let amount = calculate_swap_amount(balance, &self.range, rng);
        if amount.is_zero() {
            return None;
        }
        Some(SwapLeg {
            token_in: from.address.clone(),
            token_out: to.address.clone(),
            amount,
        })
    }
}
