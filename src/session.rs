//! Account Sessions
//!
//! A session owns one account's secp256k1 key for the duration of one cycle.
//! It is built from the raw secret, derives the account address, and signs
//! transaction intents. Closing (or simply dropping) the session discards the
//! key: the k256 signing key zeroizes its scalar on drop, and the decoded
//! secret bytes are wiped as soon as the key has been built.
//!
//! Sessions are neither `Clone` nor shared; one cycle signs everything for
//! its account through a single `&AccountSession`, one intent at a time.

use elliptic_curve::zeroize::Zeroize;
use k256::ecdsa::{RecoveryId, SigningKey};
use sha3::{Digest, Keccak256};

use crate::error::SessionError;
use crate::tx::{SignedTransaction, TransactionIntent};

pub struct AccountSession {
    signing_key: SigningKey,
    address: String,
}

impl AccountSession {
    /// Opens a session from a hex secret (with or without `0x`).
    ///
    /// # Returns
    ///
    /// * `Ok(AccountSession)` - Key loaded and address derived
    /// * `Err(SessionError)` - Secret is not 32 bytes of valid hex, or not a valid scalar
    pub fn open(secret: &str) -> Result<Self, SessionError> {
        let trimmed = secret.trim();
        let clean = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let mut bytes = hex::decode(clean).map_err(|_| SessionError::InvalidHex)?;
        if bytes.len() != 32 {
            let len = bytes.len();
            bytes.zeroize();
            return Err(SessionError::InvalidLength(len));
        }

        let mut secret_bytes = [0u8; 32];
        secret_bytes.copy_from_slice(&bytes);
        bytes.zeroize();

        let key = SigningKey::from_bytes(&secret_bytes.into());
        secret_bytes.zeroize();
        let signing_key = key.map_err(|_| SessionError::InvalidScalar)?;

        let address = ethereum_address(&signing_key);
        Ok(Self {
            signing_key,
            address,
        })
    }

    /// Lowercase `0x`-prefixed account address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Signs an intent as a legacy EIP-155 transaction.
    pub fn sign(&self, intent: TransactionIntent) -> anyhow::Result<SignedTransaction> {
        let hash = intent.signing_hash();
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&hash)
            .map_err(|e| anyhow::anyhow!("Failed to sign transaction hash: {}", e))?;

        // Ethereum requires low-s signatures; flipping s flips the recovery parity.
        let (signature, recovery_id) = match signature.normalize_s() {
            Some(normalized) => (
                normalized,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (signature, recovery_id),
        };

        let sig_bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..64]);

        Ok(intent.into_signed(r, s, recovery_id.is_y_odd() as u8))
    }

    /// Ends the session, discarding the key.
    pub fn close(self) {}
}

impl std::fmt::Debug for AccountSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSession")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// keccak256(uncompressed_public_key[1..])[12..32]
fn ethereum_address(signing_key: &SigningKey) -> String {
    let point = signing_key.verifying_key().to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..32]))
}
