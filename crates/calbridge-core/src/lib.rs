//! Shared configuration and error types for calbridge.

pub mod config;
pub mod error;

pub use config::{Config, GaroonConfig, GoogleConfig};
pub use error::{AuthError, ConfigError};
