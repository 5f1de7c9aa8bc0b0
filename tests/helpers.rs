//! Shared test helpers
//!
//! The module is organized into several categories:
//! - **Constants**: Well-known test keys, dummy addresses and amounts
//! - **Configuration Builders**: Configs pointed at a mock RPC server
//! - **RPC Mocks**: wiremock matchers and responses for JSON-RPC methods
//! - **Component Builders**: Clients, orchestrators and schedulers wired to a mock

#![allow(dead_code)]

use ethereum_types::U256;
use faucet_rebalancer::abi;
use faucet_rebalancer::config::Config;
use faucet_rebalancer::{
    ClaimEvaluator, CycleScheduler, EvmRpcClient, SwapPercentRange, SwapPlanner, TokenRegistry,
    TransactionBudget, TransactionOrchestrator,
};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

// ============================================================================
// CONSTANTS
// ============================================================================

// -------------------------------- USERS ---------------------------------

/// Well-known development key #0 (Hardhat / Anvil)
pub const TEST_SECRET_0: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Address derived from `TEST_SECRET_0`
pub const TEST_ADDR_0: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// Well-known development key #1 (Hardhat / Anvil)
pub const TEST_SECRET_1: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

/// Address derived from `TEST_SECRET_1`
pub const TEST_ADDR_1: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

// ------------------------- TOKENS AND CONTRACTS -------------------------

/// Dummy hub token (EVM format, 20 bytes)
pub const DUMMY_HUB_TOKEN: &str = "0x00000000000000000000000000000000000000a1";

/// Dummy spoke tokens (EVM format, 20 bytes)
pub const DUMMY_SPOKE_TOKEN_A: &str = "0x00000000000000000000000000000000000000b1";
pub const DUMMY_SPOKE_TOKEN_B: &str = "0x00000000000000000000000000000000000000b2";

/// Dummy swap router (EVM format, 20 bytes)
pub const DUMMY_ROUTER: &str = "0x00000000000000000000000000000000000000c1";

// -------------------------------- OTHER ---------------------------------

/// Dummy transaction hash (64 hex characters)
pub const DUMMY_TX_HASH: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000012";

/// Chain ID used by test configs
pub const TEST_CHAIN_ID: u64 = 16601;

/// 1 gwei, returned by the mocked `eth_gasPrice`
pub const TEST_GAS_PRICE: u64 = 1_000_000_000;

/// One whole token at 18 decimals
pub fn whole_tokens(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// Valid config pointed at `rpc_url` with dummy tokens, a fixed chain ID and
/// no delays, so cycles run as fast as the mock answers.
pub fn build_test_config(rpc_url: &str) -> Config {
    let mut config = Config::from_toml_str(&format!(
        r#"
[chain]
rpc_url = "{rpc_url}"
chain_id = {TEST_CHAIN_ID}
rpc_timeout_secs = 5
receipt_poll_interval_ms = 10
receipt_timeout_secs = 2

[router]
address = "{DUMMY_ROUTER}"

[[tokens]]
symbol = "USDT"
address = "{DUMMY_HUB_TOKEN}"
role = "hub"

[[tokens]]
symbol = "BTC"
address = "{DUMMY_SPOKE_TOKEN_A}"
role = "spoke"

[[tokens]]
symbol = "ETH"
address = "{DUMMY_SPOKE_TOKEN_B}"
role = "spoke"

[schedule]
inter_account_delay_ms = 0
settle_delay_ms = 0
"#
    ))
    .expect("test config must be valid");
    config.credentials.path = std::env::temp_dir().join("faucet-rebalancer-unused-keys.txt");
    config
}

// ============================================================================
// RPC MOCKS
// ============================================================================

/// Matches an `eth_call` by target contract and/or calldata selector.
pub struct EthCall {
    to: Option<String>,
    selector: Option<String>,
}

impl EthCall {
    pub fn selector(signature: &str) -> Self {
        Self {
            to: None,
            selector: Some(hex::encode(abi::selector(signature))),
        }
    }

    pub fn to(mut self, contract: &str) -> Self {
        self.to = Some(contract.to_lowercase());
        self
    }
}

impl Match for EthCall {
    fn matches(&self, request: &Request) -> bool {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return false,
        };
        if body["method"] != "eth_call" {
            return false;
        }
        let call = &body["params"][0];
        if let Some(to) = &self.to {
            match call["to"].as_str() {
                Some(target) if target.to_lowercase() == *to => {}
                _ => return false,
            }
        }
        if let Some(selector) = &self.selector {
            match call["data"].as_str() {
                Some(data) if data.trim_start_matches("0x").starts_with(selector.as_str()) => {}
                _ => return false,
            }
        }
        true
    }
}

/// JSON-RPC success envelope.
pub fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result
    }))
}

/// JSON-RPC error envelope.
pub fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message }
    }))
}

/// A single ABI word holding `value`.
pub fn uint_word(value: U256) -> Value {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    json!(format!("0x{}", hex::encode(word)))
}

/// Mined receipt with the given status (`"0x1"` or `"0x0"`).
pub fn receipt(status: &str) -> Value {
    json!({
        "transactionHash": DUMMY_TX_HASH,
        "status": status,
        "blockNumber": "0x10",
        "gasUsed": "0x5208"
    })
}

pub async fn mount_method(server: &MockServer, rpc_method: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts everything needed to submit and mine transactions: gas price,
/// nonce, raw submission and a successful receipt.
pub async fn mount_submission(server: &MockServer) {
    mount_method(
        server,
        "eth_gasPrice",
        rpc_result(json!(format!("0x{:x}", TEST_GAS_PRICE))),
    )
    .await;
    mount_method(server, "eth_getTransactionCount", rpc_result(json!("0x0"))).await;
    mount_method(server, "eth_sendRawTransaction", rpc_result(json!(DUMMY_TX_HASH))).await;
    mount_method(server, "eth_getTransactionReceipt", rpc_result(receipt("0x1"))).await;
}

/// Mounts a `balanceOf` answer for one token.
pub async fn mount_token_balance(server: &MockServer, token: &str, balance: U256) {
    Mock::given(method("POST"))
        .and(EthCall::selector(abi::BALANCE_OF_SIGNATURE).to(token))
        .respond_with(rpc_result(uint_word(balance)))
        .mount(server)
        .await;
}

/// Mounts a `lastClaimed` answer shared by every faucet.
pub async fn mount_last_claimed(server: &MockServer, last_claimed: u64) {
    Mock::given(method("POST"))
        .and(EthCall::selector(abi::LAST_CLAIMED_SIGNATURE))
        .respond_with(rpc_result(uint_word(U256::from(last_claimed))))
        .mount(server)
        .await;
}

/// Native balance, submission, equal token balances and the given claim state.
pub async fn mount_healthy_chain(server: &MockServer, token_balance: U256, last_claimed: u64) {
    mount_method(server, "eth_getBalance", rpc_result(json!("0xde0b6b3a7640000"))).await;
    mount_submission(server).await;
    mount_last_claimed(server, last_claimed).await;
    for token in [DUMMY_HUB_TOKEN, DUMMY_SPOKE_TOKEN_A, DUMMY_SPOKE_TOKEN_B] {
        mount_token_balance(server, token, token_balance).await;
    }
}

/// Raw transaction hex strings submitted to the mock, in submission order.
pub async fn submitted_raw_transactions(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
        .filter(|body| body["method"] == "eth_sendRawTransaction")
        .filter_map(|body| body["params"][0].as_str().map(str::to_string))
        .collect()
}

// ============================================================================
// COMPONENT BUILDERS
// ============================================================================

pub fn build_orchestrator(config: &Config) -> TransactionOrchestrator {
    let client = EvmRpcClient::new(&config.chain).unwrap();
    let registry = TokenRegistry::from_config(&config.tokens).unwrap();
    TransactionOrchestrator::new(
        client,
        registry,
        config.router.clone(),
        config.gas.clone(),
        config.chain.chain_id.unwrap_or(TEST_CHAIN_ID),
        Duration::from_millis(config.schedule.settle_delay_ms),
    )
}

pub fn build_scheduler(config: &Config) -> CycleScheduler {
    let range = SwapPercentRange::new(config.swap.min_pct, config.swap.max_pct).unwrap();
    CycleScheduler::new(
        build_orchestrator(config),
        SwapPlanner::new(range),
        ClaimEvaluator::new(Duration::from_secs(config.schedule.claim_cooldown_secs)),
        TransactionBudget::new(config.schedule.transaction_budget),
        Duration::from_millis(config.schedule.inter_account_delay_ms),
    )
}
