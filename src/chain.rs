//! EVM JSON-RPC Client
//!
//! Thin client over the JSON-RPC methods the rebalancer needs: balances,
//! gas price, pending nonce, read-only calls, raw submission and receipts.
//!
//! Every call is bounded by the configured RPC timeout. Nothing here retries;
//! callers decide whether a failure skips a leg, a cycle, or nothing at all.

use ethereum_types::U256;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::abi;
use crate::config::ChainConfig;
use crate::error::ChainError;
use crate::tx::SignedTransaction;

/// Subset of an `eth_getTransactionReceipt` result.
#[derive(Debug, Clone, Deserialize)]
pub struct Receipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    /// `0x1` on success, `0x0` on revert
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<String>,
    #[serde(rename = "gasUsed", default)]
    pub gas_used: Option<String>,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() == Some("0x1")
    }
}

/// Client for a single EVM JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct EvmRpcClient {
    http_client: Client,
    rpc_url: String,
    rpc_timeout: Duration,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl EvmRpcClient {
    /// Creates a new client
    ///
    /// # Arguments
    ///
    /// * `config` - Chain configuration (URL and timeouts)
    ///
    /// # Returns
    ///
    /// * `Ok(EvmRpcClient)` - Successfully created client
    /// * `Err(anyhow::Error)` - Failed to build the HTTP client
    pub fn new(config: &ChainConfig) -> anyhow::Result<Self> {
        let rpc_timeout = Duration::from_secs(config.rpc_timeout_secs);
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(10).min(rpc_timeout))
            .timeout(rpc_timeout)
            .no_proxy()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            rpc_url: config.rpc_url.clone(),
            rpc_timeout,
            receipt_poll_interval: Duration::from_millis(config.receipt_poll_interval_ms),
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
        })
    }

    /// Chain ID reported by the node (`eth_chainId`).
    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let hex: String = self.json_rpc("eth_chainId", vec![]).await?;
        parse_hex_u64("eth_chainId", &hex)
    }

    /// Native coin balance of an address (`eth_getBalance`, latest block).
    pub async fn native_balance(&self, address: &str) -> Result<U256, ChainError> {
        let hex: String = self
            .json_rpc(
                "eth_getBalance",
                vec![serde_json::json!(address), serde_json::json!("latest")],
            )
            .await?;
        parse_hex_u256("eth_getBalance", &hex)
    }

    /// ERC-20 `balanceOf(owner)` on `token`.
    pub async fn token_balance(&self, token: &str, owner: &str) -> Result<U256, ChainError> {
        let data = abi::encode_balance_of(owner)
            .map_err(|e| ChainError::decode("balanceOf", e.to_string()))?;
        let result = self.call(token, &data).await?;
        abi::decode_uint(&result).map_err(|e| ChainError::decode("balanceOf", e.to_string()))
    }

    /// Raw `eth_gasPrice`.
    pub async fn gas_price(&self) -> Result<u128, ChainError> {
        let hex: String = self.json_rpc("eth_gasPrice", vec![]).await?;
        let price = parse_hex_u256("eth_gasPrice", &hex)?;
        if price > U256::from(u128::MAX) {
            return Err(ChainError::decode("eth_gasPrice", "gas price exceeds u128"));
        }
        Ok(price.as_u128())
    }

    /// `eth_gasPrice` scaled by `multiplier`, rounded down.
    pub async fn adjusted_gas_price(&self, multiplier: f64) -> Result<u128, ChainError> {
        Ok(apply_multiplier(self.gas_price().await?, multiplier))
    }

    /// Transaction count including pending transactions, so back-to-back
    /// submissions from one account get consecutive nonces.
    pub async fn pending_nonce(&self, address: &str) -> Result<u64, ChainError> {
        let hex: String = self
            .json_rpc(
                "eth_getTransactionCount",
                vec![serde_json::json!(address), serde_json::json!("pending")],
            )
            .await?;
        parse_hex_u64("eth_getTransactionCount", &hex)
    }

    /// Read-only contract call against the latest block.
    pub async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let result: String = self
            .json_rpc(
                "eth_call",
                vec![
                    serde_json::json!({
                        "to": to,
                        "data": format!("0x{}", hex::encode(data)),
                    }),
                    serde_json::json!("latest"),
                ],
            )
            .await?;
        let clean = result.strip_prefix("0x").unwrap_or(&result);
        hex::decode(clean).map_err(|e| ChainError::decode("eth_call", e.to_string()))
    }

    /// Submits a signed transaction and returns the node's transaction hash.
    pub async fn send_raw(&self, tx: &SignedTransaction) -> Result<String, ChainError> {
        let hash: String = self
            .json_rpc(
                "eth_sendRawTransaction",
                vec![serde_json::json!(tx.raw_hex())],
            )
            .await?;
        if !hash.eq_ignore_ascii_case(&tx.hash) {
            debug!("Node returned hash {} for locally computed {}", hash, tx.hash);
        }
        Ok(hash)
    }

    /// Polls for a receipt until it appears or the receipt timeout elapses.
    ///
    /// A mined receipt with a failure status is reported as `Reverted`.
    pub async fn wait_for_receipt(&self, tx_hash: &str) -> Result<Receipt, ChainError> {
        let started = tokio::time::Instant::now();
        loop {
            let receipt: Option<Receipt> = self
                .json_rpc(
                    "eth_getTransactionReceipt",
                    vec![serde_json::json!(tx_hash)],
                )
                .await?;

            if let Some(receipt) = receipt {
                if receipt.succeeded() {
                    return Ok(receipt);
                }
                return Err(ChainError::Reverted(format!(
                    "transaction {} failed with status {}",
                    tx_hash,
                    receipt.status.as_deref().unwrap_or("unknown")
                )));
            }

            if started.elapsed() >= self.receipt_timeout {
                return Err(ChainError::Timeout {
                    method: format!("receipt of {}", tx_hash),
                    secs: self.receipt_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }

    /// Submits a signed transaction and blocks until it is mined.
    pub async fn send_signed(&self, tx: &SignedTransaction) -> Result<Receipt, ChainError> {
        let hash = self.send_raw(tx).await?;
        self.wait_for_receipt(&hash).await
    }

    /// Generic JSON-RPC call helper.
    async fn json_rpc<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T, ChainError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let rpc_future = async {
            let resp = self
                .http_client
                .post(&self.rpc_url)
                .json(&request)
                .send()
                .await
                .map_err(|e| self.transport_error(method, e))?;
            resp.json::<serde_json::Value>()
                .await
                .map_err(|e| self.transport_error(method, e))
        };

        let response = tokio::time::timeout(self.rpc_timeout, rpc_future)
            .await
            .map_err(|_| ChainError::Timeout {
                method: method.to_string(),
                secs: self.rpc_timeout.as_secs(),
            })??;

        if let Some(error) = response.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            if is_revert_message(code, &message) {
                return Err(ChainError::Reverted(message));
            }
            return Err(ChainError::Rpc {
                method: method.to_string(),
                code,
                message,
            });
        }

        let result = response
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::decode(method, "no result field"))?;

        serde_json::from_value(result).map_err(|e| ChainError::decode(method, e.to_string()))
    }

    fn transport_error(&self, method: &str, e: reqwest::Error) -> ChainError {
        if e.is_timeout() {
            return ChainError::Timeout {
                method: method.to_string(),
                secs: self.rpc_timeout.as_secs(),
            };
        }
        ChainError::Transport {
            method: method.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Nodes report reverts as code 3 (geth with revert data) or as a message
/// mentioning `execution reverted`.
fn is_revert_message(code: i64, message: &str) -> bool {
    code == 3 || message.to_lowercase().contains("execution reverted")
}

/// Floors `value * multiplier` using six decimal places of the multiplier.
pub fn apply_multiplier(value: u128, multiplier: f64) -> u128 {
    const SCALE: u128 = 1_000_000;
    let scaled = (multiplier * SCALE as f64).round() as u128;
    value.saturating_mul(scaled) / SCALE
}

fn parse_hex_u64(method: &str, hex: &str) -> Result<u64, ChainError> {
    let clean = hex.strip_prefix("0x").unwrap_or(hex);
    u64::from_str_radix(clean, 16).map_err(|e| ChainError::decode(method, e.to_string()))
}

fn parse_hex_u256(method: &str, hex: &str) -> Result<U256, ChainError> {
    let clean = hex.strip_prefix("0x").unwrap_or(hex);
    if clean.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(clean, 16).map_err(|e| ChainError::decode(method, format!("{:?}", e)))
}
