//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the rebalancer.
//! Configuration includes the chain endpoint, router and token registry, swap
//! sizing, gas settings, scheduling limits, and the credentials file location.
//!
//! Every field has a default matching the 0G testnet deployment, so a
//! config file only needs to list what differs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "FAUCET_REBALANCER_CONFIG_PATH";

/// Config file location used when neither the CLI nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "config/faucet-rebalancer.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all rebalancer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chain connection settings
    #[serde(default)]
    pub chain: ChainConfig,
    /// Swap router settings
    #[serde(default)]
    pub router: RouterConfig,
    /// Token registry (exactly one hub token, any number of spokes)
    #[serde(default = "default_tokens")]
    pub tokens: Vec<TokenConfig>,
    /// Swap sizing
    #[serde(default)]
    pub swap: SwapConfig,
    /// Gas price multiplier and static gas limits
    #[serde(default)]
    pub gas: GasConfig,
    /// Budget and delays
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Credentials file
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Log level
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// JSON-RPC endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Chain ID used for EIP-155 signing. Queried via `eth_chainId` when absent.
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Upper bound for a single RPC call, in seconds
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    /// Delay between `eth_getTransactionReceipt` polls, in milliseconds
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    /// How long to wait for a submitted transaction to be mined, in seconds
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
}

/// Swap router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Router contract address (exposes `exactInputSingle`)
    #[serde(default = "default_router_address")]
    pub address: String,
    /// Pool fee tier in hundredths of a bip (3000 = 0.3%)
    #[serde(default = "default_fee_tier")]
    pub fee_tier: u32,
    /// Swap deadline offset from submission time, in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

/// Role a token plays in the rebalancing plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenRole {
    /// Stable token every swap routes through
    Hub,
    /// Token swapped to and from the hub
    Spoke,
}

/// A single token registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Display symbol (e.g., "USDT")
    pub symbol: String,
    /// ERC-20 contract address
    pub address: String,
    /// Hub or spoke
    pub role: TokenRole,
    /// Whether the token contract is also a faucet (`lastClaimed`/`mint`)
    #[serde(default = "default_true")]
    pub faucet: bool,
    /// Token decimals, used only for human-readable log amounts
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

/// Swap sizing: each leg moves a random fraction in `[min_pct, max_pct)` of the input balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapConfig {
    #[serde(default = "default_min_pct")]
    pub min_pct: f64,
    #[serde(default = "default_max_pct")]
    pub max_pct: f64,
}

/// Gas pricing and per-operation gas limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Multiplier applied to `eth_gasPrice` (result rounded down)
    #[serde(default = "default_price_multiplier")]
    pub price_multiplier: f64,
    #[serde(default = "default_mint_limit")]
    pub mint_limit: u64,
    #[serde(default = "default_approve_limit")]
    pub approve_limit: u64,
    #[serde(default = "default_swap_limit")]
    pub swap_limit: u64,
}

/// Budget and pacing of the account loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Maximum number of account cycles before the run stops
    #[serde(default = "default_transaction_budget")]
    pub transaction_budget: u64,
    /// Delay between consecutive accounts, in milliseconds
    #[serde(default = "default_inter_account_delay_ms")]
    pub inter_account_delay_ms: u64,
    /// Delay after each swap leg of one account, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Minimum time between two claims on a faucet, in seconds
    #[serde(default = "default_claim_cooldown_secs")]
    pub claim_cooldown_secs: u64,
}

/// Location of the newline-delimited secrets file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_credentials_path")]
    pub path: PathBuf,
}

/// Logging configuration. `RUST_LOG` takes precedence when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ============================================================================
// DEFAULTS
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_rpc_url() -> String {
    "https://evmrpc-testnet.0g.ai".to_string()
}

fn default_rpc_timeout_secs() -> u64 {
    15
}

fn default_receipt_poll_interval_ms() -> u64 {
    1000
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

fn default_router_address() -> String {
    "0xd86b764618c6e3c078845be3c3fce50ce9535da7".to_string()
}

fn default_fee_tier() -> u32 {
    3000
}

fn default_deadline_secs() -> u64 {
    20 * 60
}

fn default_decimals() -> u8 {
    18
}

fn default_tokens() -> Vec<TokenConfig> {
    vec![
        TokenConfig {
            symbol: "USDT".to_string(),
            address: "0x3ec8a8705be1d5ca90066b37ba62c4183b024ebf".to_string(),
            role: TokenRole::Hub,
            faucet: true,
            decimals: 18,
        },
        TokenConfig {
            symbol: "BTC".to_string(),
            address: "0x36f6414ff1df609214ddaba71c84f18bcf00f67d".to_string(),
            role: TokenRole::Spoke,
            faucet: true,
            decimals: 18,
        },
        TokenConfig {
            symbol: "ETH".to_string(),
            address: "0x0fe9b43625fa7edd663adcec0728dd635e4abf7c".to_string(),
            role: TokenRole::Spoke,
            faucet: true,
            decimals: 18,
        },
    ]
}

fn default_min_pct() -> f64 {
    0.05
}

fn default_max_pct() -> f64 {
    0.10
}

fn default_price_multiplier() -> f64 {
    1.2
}

fn default_mint_limit() -> u64 {
    500_000
}

fn default_approve_limit() -> u64 {
    100_000
}

fn default_swap_limit() -> u64 {
    300_000
}

fn default_transaction_budget() -> u64 {
    100
}

fn default_inter_account_delay_ms() -> u64 {
    2000
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_claim_cooldown_secs() -> u64 {
    24 * 60 * 60
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("privatekey.txt")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: None,
            rpc_timeout_secs: default_rpc_timeout_secs(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            address: default_router_address(),
            fee_tier: default_fee_tier(),
            deadline_secs: default_deadline_secs(),
        }
    }
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            min_pct: default_min_pct(),
            max_pct: default_max_pct(),
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            price_multiplier: default_price_multiplier(),
            mint_limit: default_mint_limit(),
            approve_limit: default_approve_limit(),
            swap_limit: default_swap_limit(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            transaction_budget: default_transaction_budget(),
            inter_account_delay_ms: default_inter_account_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            claim_cooldown_secs: default_claim_cooldown_secs(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: default_credentials_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            router: RouterConfig::default(),
            tokens: default_tokens(),
            swap: SwapConfig::default(),
            gas: GasConfig::default(),
            schedule: ScheduleConfig::default(),
            credentials: CredentialsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ============================================================================
// CONFIGURATION LOADING AND VALIDATION
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// This function ensures that:
    /// - The RPC URL is an http(s) URL
    /// - Router and token addresses are 20-byte hex addresses
    /// - There is exactly one hub token and at least one spoke
    /// - Token symbols and addresses are unique
    /// - The swap percentage range satisfies `0 <= min < max <= 1`
    /// - The gas multiplier and gas limits are positive
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - The first problem found
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.chain.rpc_url).map_err(|e| {
            anyhow::anyhow!("Configuration error: invalid rpc_url '{}': {}", self.chain.rpc_url, e)
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!(
                "Configuration error: rpc_url must use http or https, got '{}'",
                url.scheme()
            );
        }
        if self.chain.rpc_timeout_secs == 0 {
            anyhow::bail!("Configuration error: rpc_timeout_secs must be greater than 0");
        }

        validate_address("router.address", &self.router.address)?;
        if self.router.fee_tier >= 1 << 24 {
            anyhow::bail!(
                "Configuration error: fee_tier {} does not fit in uint24",
                self.router.fee_tier
            );
        }

        let hubs = self.tokens.iter().filter(|t| t.role == TokenRole::Hub).count();
        if hubs != 1 {
            anyhow::bail!(
                "Configuration error: exactly one hub token is required, found {}",
                hubs
            );
        }
        if !self.tokens.iter().any(|t| t.role == TokenRole::Spoke) {
            anyhow::bail!("Configuration error: at least one spoke token is required");
        }

        let mut symbols = HashSet::new();
        let mut addresses = HashSet::new();
        for token in &self.tokens {
            validate_address(&format!("tokens.{}", token.symbol), &token.address)?;
            if !symbols.insert(token.symbol.as_str()) {
                anyhow::bail!("Configuration error: duplicate token symbol '{}'", token.symbol);
            }
            if !addresses.insert(token.address.to_lowercase()) {
                anyhow::bail!(
                    "Configuration error: duplicate token address '{}'",
                    token.address
                );
            }
        }

        let (min, max) = (self.swap.min_pct, self.swap.max_pct);
        if !(min >= 0.0 && min < max && max <= 1.0) {
            anyhow::bail!(
                "Configuration error: swap range must satisfy 0 <= min_pct < max_pct <= 1, got [{}, {})",
                min,
                max
            );
        }

        if !(self.gas.price_multiplier.is_finite() && self.gas.price_multiplier > 0.0) {
            anyhow::bail!(
                "Configuration error: gas price_multiplier must be positive, got {}",
                self.gas.price_multiplier
            );
        }
        for (name, limit) in [
            ("mint_limit", self.gas.mint_limit),
            ("approve_limit", self.gas.approve_limit),
            ("swap_limit", self.gas.swap_limit),
        ] {
            if limit == 0 {
                anyhow::bail!("Configuration error: gas {} must be greater than 0", name);
            }
        }

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Uses `FAUCET_REBALANCER_CONFIG_PATH` if set, otherwise
    /// `config/faucet-rebalancer.toml`. A missing default file falls back to
    /// built-in defaults; a missing file named by the environment is an error.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load_from_path(Path::new(&path)),
            Err(_) => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load_from_path(path)
                } else {
                    let config = Self::default();
                    config.validate()?;
                    Ok(config)
                }
            }
        }
    }

    /// Loads configuration from an explicit path.
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Configuration file '{}' not found", path.display());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load '{}': {}", path.display(), e))
    }
}

fn validate_address(field: &str, addr: &str) -> anyhow::Result<()> {
    let hex_part = addr
        .strip_prefix("0x")
        .ok_or_else(|| anyhow::anyhow!("Configuration error: {} must start with 0x", field))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!(
            "Configuration error: {} must be a 20-byte hex address, got '{}'",
            field,
            addr
        );
    }
    Ok(())
}
