use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Cached OAuth token set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Access token for API requests
    pub access_token: String,

    /// Optional refresh token for token renewal
    pub refresh_token: Option<String>,

    /// Token expiration timestamp (Unix timestamp)
    pub expires_at: i64,

    /// Scopes granted to this token
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl TokenSet {
    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at
    }

    /// Check if the token needs refresh (within 5 minutes of expiry).
    pub fn needs_refresh(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - 300
    }
}

/// File-backed token cache at a configurable path.
///
/// The file is read once on startup and overwritten after a successful
/// interactive authorization or refresh.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Load the cached token set, if the file exists and parses.
    pub fn load(&self) -> Result<TokenSet> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read token file {}", self.path.display()))?;

        serde_json::from_str(&json)
            .with_context(|| format!("failed to parse token file {}", self.path.display()))
    }

    /// Persist a token set, creating parent directories as needed.
    pub fn store(&self, token_set: &TokenSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("failed to create token directory")?;
            }
        }

        let json =
            serde_json::to_string_pretty(token_set).context("failed to serialize token set")?;

        fs::write(&self.path, &json)
            .with_context(|| format!("failed to write token file {}", self.path.display()))?;

        tracing::info!("stored token at {}", self.path.display());
        Ok(())
    }
}
