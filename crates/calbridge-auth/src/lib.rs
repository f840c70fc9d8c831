//! Google OAuth token acquisition for calbridge.
//!
//! Covers the cached-token fast path, refresh-grant renewal, and the
//! interactive loopback authorization flow with a bounded wait.

pub mod flow;
pub mod google;
pub mod manager;
pub mod storage;

pub use flow::{wait_for_callback, CallbackResult, AUTH_TIMEOUT};
pub use google::{GoogleOAuth, GoogleTokenResponse};
pub use manager::TokenManager;
pub use storage::{TokenCache, TokenSet};
