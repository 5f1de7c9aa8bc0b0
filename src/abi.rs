//! EVM ABI Encoding Helpers
//!
//! Calldata builders for the handful of contract functions the rebalancer
//! touches. All arguments are static types, so every call is a selector
//! followed by 32-byte head words.

use anyhow::{Context, Result};
use ethereum_types::U256;
use sha3::{Digest, Keccak256};

pub const LAST_CLAIMED_SIGNATURE: &str = "lastClaimed(address)";
pub const MINT_SIGNATURE: &str = "mint()";
pub const APPROVE_SIGNATURE: &str = "approve(address,uint256)";
pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";
pub const EXACT_INPUT_SINGLE_SIGNATURE: &str =
    "exactInputSingle((address,address,uint24,address,uint256,uint256,uint256,uint160))";

/// First four bytes of keccak256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Decodes a `0x`-prefixed 20-byte address.
pub fn parse_address(addr: &str) -> Result<[u8; 20]> {
    let clean = addr.strip_prefix("0x").unwrap_or(addr);
    let bytes = hex::decode(clean).with_context(|| format!("Invalid address hex: {}", addr))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("Address must be 20 bytes, got {}", b.len()))
}

/// Address left-padded to a 32-byte word.
fn address_word(addr: &str) -> Result<[u8; 32]> {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&parse_address(addr)?);
    Ok(word)
}

fn uint_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

/// `lastClaimed(address)`
pub fn encode_last_claimed(account: &str) -> Result<Vec<u8>> {
    let mut data = selector(LAST_CLAIMED_SIGNATURE).to_vec();
    data.extend_from_slice(&address_word(account)?);
    Ok(data)
}

/// `mint()`
pub fn encode_mint() -> Vec<u8> {
    selector(MINT_SIGNATURE).to_vec()
}

/// `approve(spender, amount)`
pub fn encode_approve(spender: &str, amount: U256) -> Result<Vec<u8>> {
    let mut data = selector(APPROVE_SIGNATURE).to_vec();
    data.extend_from_slice(&address_word(spender)?);
    data.extend_from_slice(&uint_word(amount));
    Ok(data)
}

/// `balanceOf(owner)`
pub fn encode_balance_of(owner: &str) -> Result<Vec<u8>> {
    let mut data = selector(BALANCE_OF_SIGNATURE).to_vec();
    data.extend_from_slice(&address_word(owner)?);
    Ok(data)
}

/// Parameters of the router's `exactInputSingle` call.
#[derive(Debug, Clone)]
pub struct ExactInputSingleParams {
    pub token_in: String,
    pub token_out: String,
    pub fee: u32,
    pub recipient: String,
    pub deadline: u64,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
    pub sqrt_price_limit_x96: U256,
}

/// `exactInputSingle(params)`. The tuple is fully static, so it is encoded inline.
pub fn encode_exact_input_single(params: &ExactInputSingleParams) -> Result<Vec<u8>> {
    let mut data = selector(EXACT_INPUT_SINGLE_SIGNATURE).to_vec();
    data.extend_from_slice(&address_word(&params.token_in)?);
    data.extend_from_slice(&address_word(&params.token_out)?);
    data.extend_from_slice(&uint_word(U256::from(params.fee)));
    data.extend_from_slice(&address_word(&params.recipient)?);
    data.extend_from_slice(&uint_word(U256::from(params.deadline)));
    data.extend_from_slice(&uint_word(params.amount_in));
    data.extend_from_slice(&uint_word(params.amount_out_minimum));
    data.extend_from_slice(&uint_word(params.sqrt_price_limit_x96));
    Ok(data)
}

/// Decodes a single `uint256` return value.
///
/// An empty return (a call to an address without code) is rejected rather
/// than read as zero.
pub fn decode_uint(data: &[u8]) -> Result<U256> {
    if data.len() < 32 {
        anyhow::bail!("Expected a 32-byte uint256 return value, got {} bytes", data.len());
    }
    Ok(U256::from_big_endian(&data[..32]))
}
