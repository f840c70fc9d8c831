//! Shared error types for the calbridge workspace.
//!
//! Each service crate carries its own error enum; this module holds the
//! cross-cutting configuration and authorization failures that terminate
//! a run before any reconciliation happens.

use thiserror::Error;

/// Configuration errors, fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("invalid setting {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Authorization failures from the token manager.
///
/// None of these are retried: a run either ends up with a usable token
/// or terminates with one of these.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no cached token at {0} and interactive mode is disabled")]
    NonInteractive(String),

    #[error("timed out waiting for the authorization callback")]
    Timeout,

    #[error("authorization callback listener failed: {0}")]
    Listener(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("token cache error: {0}")]
    Cache(String),
}
