//! Credentials File
//!
//! Reads the newline-delimited list of account secrets once at startup.
//! The secrets stay in memory only as long as the [`KeyRing`] lives and are
//! wiped when it is dropped.

use elliptic_curve::zeroize::Zeroize;
use std::path::Path;
use tracing::{error, info};

use crate::error::CredentialsError;

/// Raw account secrets in file order.
#[derive(Default)]
pub struct KeyRing {
    secrets: Vec<String>,
}

impl KeyRing {
    /// Parses file contents: CRLF is accepted, blank lines are skipped,
    /// surrounding whitespace is trimmed.
    pub fn parse(content: &str) -> Self {
        let secrets = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { secrets }
    }

    /// Reads and parses a credentials file.
    pub fn read(path: &Path) -> Result<Self, CredentialsError> {
        let mut content =
            std::fs::read_to_string(path).map_err(|source| CredentialsError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let ring = Self::parse(&content);
        content.zeroize();
        Ok(ring)
    }

    /// Like [`read`](Self::read), but a missing or unreadable file is logged
    /// and yields an empty key ring.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::read(path) {
            Ok(ring) => {
                info!("Loaded {} account(s) from {}", ring.len(), path.display());
                ring
            }
            Err(e) => {
                error!("{}", e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Secrets in file order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.secrets.iter().map(String::as_str)
    }
}

impl Drop for KeyRing {
    fn drop(&mut self) {
        for secret in &mut self.secrets {
            secret.zeroize();
        }
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("accounts", &self.secrets.len())
            .finish()
    }
}
