//! Token acquisition state machine.
//!
//! Resolution order: cached file, refresh grant, interactive loopback
//! flow. Non-interactive runs fail instead of starting the listener.

use std::time::Duration;

use calbridge_core::AuthError;

use crate::flow::{wait_for_callback, AUTH_TIMEOUT};
use crate::google::GoogleOAuth;
use crate::storage::{TokenCache, TokenSet};

pub struct TokenManager {
    cache: TokenCache,
    oauth: GoogleOAuth,
    interactive: bool,
    callback_port: u16,
    auth_timeout: Duration,
}

impl TokenManager {
    pub fn new(cache: TokenCache, oauth: GoogleOAuth, interactive: bool, callback_port: u16) -> Self {
        Self {
            cache,
            oauth,
            interactive,
            callback_port,
            auth_timeout: AUTH_TIMEOUT,
        }
    }

    /// Produce a usable token set, consulting the cache first.
    ///
    /// # Errors
    /// Fails without retry when no cached token is usable and either
    /// interactive mode is disabled or the authorization wait times out.
    pub async fn obtain(&self) -> Result<TokenSet, AuthError> {
        match self.cache.load() {
            Ok(cached) if !cached.is_expired() => {
                tracing::debug!("using cached token from {}", self.cache.path().display());
                return Ok(cached);
            }
            Ok(cached) => {
                if let Some(refresh) = cached.refresh_token.clone() {
                    tracing::info!("cached token expired, attempting refresh");
                    match self.oauth.refresh_token(&refresh).await {
                        Ok(response) => {
                            let token = response.into_token_set(Some(refresh));
                            self.cache
                                .store(&token)
                                .map_err(|e| AuthError::Cache(e.to_string()))?;
                            return Ok(token);
                        }
                        Err(e) => {
                            tracing::warn!("token refresh failed, falling back: {e:#}");
                        }
                    }
                }
            }
            Err(e) => {
                tracing::debug!("no usable cached token: {e:#}");
            }
        }

        if !self.interactive {
            return Err(AuthError::NonInteractive(
                self.cache.path().display().to_string(),
            ));
        }

        self.interactive_flow().await
    }

    async fn interactive_flow(&self) -> Result<TokenSet, AuthError> {
        let (auth_url, _state) = self.oauth.authorization_url(self.callback_port);

        println!("Go to the following link in your browser to authorize access:\n{auth_url}");

        let callback = wait_for_callback(self.callback_port, self.auth_timeout).await?;

        let response = self
            .oauth
            .exchange_code(&callback.code, self.callback_port)
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        let token = response.into_token_set(None);
        self.cache
            .store(&token)
            .map_err(|e| AuthError::Cache(e.to_string()))?;

        println!("Saving credential file to: {}", self.cache.path().display());
        Ok(token)
    }
}
