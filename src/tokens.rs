//! Token Registry
//!
//! Static view of the configured tokens: which one is the hub, which are
//! spokes, and a reverse address → token map built once for log output.

use ethereum_types::U256;
use std::collections::HashMap;

use crate::config::{TokenConfig, TokenRole};

/// A token known to the rebalancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    /// Lowercase `0x`-prefixed contract address
    pub address: String,
    pub role: TokenRole,
    pub faucet: bool,
    pub decimals: u8,
}

/// Immutable token registry for the process lifetime.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
    by_address: HashMap<String, usize>,
    hub: usize,
}

impl TokenRegistry {
    /// Builds the registry from validated config entries.
    ///
    /// # Returns
    ///
    /// * `Ok(TokenRegistry)` - Registry with exactly one hub token
    /// * `Err(anyhow::Error)` - No hub token, or more than one
    pub fn from_config(entries: &[TokenConfig]) -> anyhow::Result<Self> {
        let tokens: Vec<Token> = entries
            .iter()
            .map(|t| Token {
                symbol: t.symbol.clone(),
                address: normalize_address(&t.address),
                role: t.role,
                faucet: t.faucet,
                decimals: t.decimals,
            })
            .collect();

        let mut hubs = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.role == TokenRole::Hub)
            .map(|(i, _)| i);
        let hub = hubs
            .next()
            .ok_or_else(|| anyhow::anyhow!("Token registry has no hub token"))?;
        if hubs.next().is_some() {
            anyhow::bail!("Token registry has more than one hub token");
        }

        let by_address = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.address.clone(), i))
            .collect();

        Ok(Self {
            tokens,
            by_address,
            hub,
        })
    }

    pub fn hub(&self) -> &Token {
        &self.tokens[self.hub]
    }

    /// Spoke tokens in configuration order.
    pub fn spokes(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.role == TokenRole::Spoke)
    }

    /// Tokens whose contract is also a faucet.
    pub fn faucets(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.faucet)
    }

    pub fn all(&self) -> &[Token] {
        &self.tokens
    }

    /// Looks up a token by contract address (case-insensitive).
    pub fn by_address(&self, address: &str) -> Option<&Token> {
        self.by_address
            .get(&normalize_address(address))
            .map(|&i| &self.tokens[i])
    }

    /// Symbol for a contract address, or `"Unknown"`.
    pub fn symbol_of(&self, address: &str) -> &str {
        self.by_address(address)
            .map(|t| t.symbol.as_str())
            .unwrap_or("Unknown")
    }
}

/// Lowercases an address and ensures a `0x` prefix.
pub fn normalize_address(addr: &str) -> String {
    let clean = addr.strip_prefix("0x").unwrap_or(addr);
    format!("0x{}", clean.to_lowercase())
}

/// Formats a raw token amount with the given decimals, trimming trailing zeros.
///
/// `format_units(1_500_000_000_000_000_000, 18)` → `"1.5"`.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let (whole, frac) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };

    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole
    } else {
        format!("{}.{}", whole, frac)
    }
}
