//! Resolved runtime configuration.
//!
//! The CLI layer parses flags and environment variables into this struct;
//! everything below the entry point receives already-validated values.

use std::path::PathBuf;

use url::Url;

use crate::error::ConfigError;

/// Garoon (authoritative source) connection settings.
#[derive(Debug, Clone)]
pub struct GaroonConfig {
    /// Login user name.
    pub user: String,

    /// Login password.
    pub password: String,

    /// Target user whose schedule is synced. Defaults to the login user
    /// on the Garoon side when empty.
    pub user_id: Option<String>,

    /// Cloud-tenant subdomain (`<subdomain>.cybozu.com`). Either this or
    /// `base_url` must be set.
    pub subdomain: Option<String>,

    /// Explicit API base URL for package (on-premise) installations.
    pub base_url: Option<Url>,

    /// Base URL used to build deep links back into Garoon.
    pub link_base: Url,
}

/// Google Calendar (destination) settings.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth client id.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// Target calendar id.
    pub calendar_id: String,

    /// Path of the cached token file.
    pub token_path: PathBuf,

    /// Whether the interactive authorization flow may run when no cached
    /// token is usable.
    pub interactive: bool,

    /// Loopback port for the authorization callback.
    pub callback_port: u16,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub garoon: GaroonConfig,
    pub google: GoogleConfig,
}

impl Config {
    /// Validate cross-field constraints the CLI parser cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.garoon.subdomain.is_none() && self.garoon.base_url.is_none() {
            return Err(ConfigError::MissingSetting("grn-subdomain or grn-url"));
        }
        if self.garoon.user.is_empty() {
            return Err(ConfigError::MissingSetting("grn-user"));
        }
        if self.google.calendar_id.is_empty() {
            return Err(ConfigError::MissingSetting("gcal-id"));
        }
        if self.google.callback_port == 0 {
            return Err(ConfigError::Invalid {
                field: "port",
                message: "callback port must be non-zero".into(),
            });
        }
        Ok(())
    }
}
