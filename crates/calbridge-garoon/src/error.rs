//! Garoon-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GaroonError {
    #[error("Authentication rejected by Garoon")]
    AuthRejected,

    #[error("Garoon API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}
