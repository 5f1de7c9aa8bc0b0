//! Transaction Intents and Legacy RLP Encoding
//!
//! An intent is everything needed to sign one legacy (pre-EIP-1559) EVM
//! transaction. Signing lives in [`crate::session`]; this module only builds
//! the EIP-155 signing payload and the final signed envelope.

use sha3::{Digest, Keccak256};

/// Kind of on-chain operation, used for gas limits and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Mint,
    Approve,
    Swap,
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxKind::Mint => write!(f, "mint"),
            TxKind::Approve => write!(f, "approve"),
            TxKind::Swap => write!(f, "swap"),
        }
    }
}

/// An unsigned transaction built from the current nonce, gas price and calldata.
#[derive(Debug, Clone)]
pub struct TransactionIntent {
    pub kind: TxKind,
    /// Target contract (20 bytes)
    pub to: [u8; 20],
    pub data: Vec<u8>,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub nonce: u64,
    pub chain_id: u64,
}

impl TransactionIntent {
    /// RLP of `[nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]`.
    pub fn signing_payload(&self) -> Vec<u8> {
        rlp_encode_list(&[
            rlp_encode_uint(self.nonce as u128),
            rlp_encode_uint(self.gas_price),
            rlp_encode_uint(self.gas_limit as u128),
            self.to.to_vec(),
            vec![], // value = 0
            self.data.clone(),
            rlp_encode_uint(self.chain_id as u128),
            vec![],
            vec![],
        ])
    }

    /// Keccak-256 of the signing payload.
    pub fn signing_hash(&self) -> [u8; 32] {
        Keccak256::digest(self.signing_payload()).into()
    }

    /// Assembles the signed envelope `[nonce, gasPrice, gasLimit, to, value, data, v, r, s]`.
    pub fn into_signed(self, r: [u8; 32], s: [u8; 32], recovery_id: u8) -> SignedTransaction {
        let v = recovery_id as u128 + self.chain_id as u128 * 2 + 35;
        let raw = rlp_encode_list(&[
            rlp_encode_uint(self.nonce as u128),
            rlp_encode_uint(self.gas_price),
            rlp_encode_uint(self.gas_limit as u128),
            self.to.to_vec(),
            vec![],
            self.data,
            rlp_encode_uint(v),
            strip_leading_zeros(&r),
            strip_leading_zeros(&s),
        ]);
        let hash = format!("0x{}", hex::encode(Keccak256::digest(&raw)));
        SignedTransaction {
            kind: self.kind,
            nonce: self.nonce,
            raw,
            hash,
        }
    }
}

/// A signed, ready-to-submit transaction.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub kind: TxKind,
    pub nonce: u64,
    pub raw: Vec<u8>,
    /// Locally computed transaction hash (`0x`-prefixed)
    pub hash: String,
}

impl SignedTransaction {
    /// Hex form expected by `eth_sendRawTransaction`.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

// ============================================================================
// RLP ENCODING HELPERS
// ============================================================================

/// Big-endian bytes with no leading zeros (RLP integer format).
fn rlp_encode_uint(val: u128) -> Vec<u8> {
    strip_leading_zeros(&val.to_be_bytes())
}

fn strip_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

fn rlp_length_prefix(len: usize, short_base: u8, long_base: u8) -> Vec<u8> {
    if len <= 55 {
        vec![short_base + len as u8]
    } else {
        let len_bytes = strip_leading_zeros(&(len as u64).to_be_bytes());
        let mut out = vec![long_base + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out
    }
}

/// RLP-encode a single byte-string item.
fn rlp_encode_item(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return vec![data[0]];
    }
    let mut out = rlp_length_prefix(data.len(), 0x80, 0xb7);
    out.extend_from_slice(data);
    out
}

/// RLP-encode a list of raw byte strings.
fn rlp_encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.iter().flat_map(|item| rlp_encode_item(item)).collect();
    let mut out = rlp_length_prefix(payload.len(), 0xc0, 0xf7);
    out.extend(payload);
    out
}
