//! Loopback listener for the interactive authorization flow.
//!
//! One background task serves the callback route while the caller blocks
//! on a deadline-bound wait. The first of {valid callback, deadline}
//! wins; both outcomes request a graceful listener shutdown that is
//! itself bounded so it cannot hang the process.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use calbridge_core::AuthError;
use tokio::sync::{oneshot, Mutex};
use warp::Filter;

/// How long the run waits for the user to complete authorization.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(3 * 60);

/// Bound on listener teardown after the wait resolves.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type CodeSender = Arc<Mutex<Option<oneshot::Sender<(String, String)>>>>;

/// Authorization code and `state` parameter delivered by the callback.
#[derive(Debug)]
pub struct CallbackResult {
    pub code: String,
    pub state: String,
}

/// Serve the callback route on `port` and wait up to `timeout` for a
/// request carrying a `code` query parameter.
///
/// Requests without a `code` parameter are answered but do not complete
/// the wait. The listener is torn down before this function returns,
/// whichever way the wait resolves.
pub async fn wait_for_callback(port: u16, timeout: Duration) -> Result<CallbackResult, AuthError> {
    let (code_tx, code_rx) = oneshot::channel();
    let code_tx: CodeSender = Arc::new(Mutex::new(Some(code_tx)));

    let routes = warp::get()
        .and(warp::path::end())
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::any().map(move || code_tx.clone()))
        .and_then(
            |params: HashMap<String, String>, tx: CodeSender| async move {
                let Some(code) = params.get("code").cloned() else {
                    return Ok::<_, warp::Rejection>(warp::reply::html(
                        "<html><body><p>Waiting for authorization...</p></body></html>",
                    ));
                };
                let state = params.get("state").cloned().unwrap_or_default();

                if let Some(sender) = tx.lock().await.take() {
                    let _ = sender.send((code, state));
                }

                Ok(warp::reply::html(
                    "<html><body><h1>Authorization successful!</h1>\
                     <p>You can close this window and return to the terminal.</p></body></html>",
                ))
            },
        );

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = shutdown_rx.await;
        })
        .map_err(|e| AuthError::Listener(e.to_string()))?;
    tracing::debug!("callback listener bound on {}", bound);

    let server_task = tokio::spawn(server);

    let outcome = tokio::time::timeout(timeout, code_rx).await;

    // Tear the listener down regardless of outcome; the join itself is
    // bounded so a stuck connection cannot hang the run.
    let _ = shutdown_tx.send(());
    let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, server_task).await;

    match outcome {
        Ok(Ok((code, state))) => Ok(CallbackResult { code, state }),
        Ok(Err(_)) => Err(AuthError::Listener("callback channel closed".into())),
        Err(_) => Err(AuthError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn callback_with_code_completes_the_wait() {
        let port = 18431;
        let wait = tokio::spawn(wait_for_callback(port, Duration::from_secs(10)));

        // Give the listener a moment to bind.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let resp = reqwest::get(format!(
            "http://127.0.0.1:{}/?code=the-code&state=the-state",
            port
        ))
        .await
        .unwrap();
        assert!(resp.status().is_success());

        let result = wait.await.unwrap().unwrap();
        assert_eq!(result.code, "the-code");
        assert_eq!(result.state, "the-state");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn request_without_code_is_ignored() {
        let port = 18432;
        let wait = tokio::spawn(wait_for_callback(port, Duration::from_millis(600)));

        tokio::time::sleep(Duration::from_millis(100)).await;

        let resp = reqwest::get(format!("http://127.0.0.1:{}/?error=denied", port))
            .await
            .unwrap();
        assert!(resp.status().is_success());

        // The wait must still run into its deadline.
        let result = wait.await.unwrap();
        assert!(matches!(result, Err(AuthError::Timeout)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deadline_elapses_without_any_request() {
        let result = wait_for_callback(18433, Duration::from_millis(200)).await;
        assert!(matches!(result, Err(AuthError::Timeout)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn listener_is_gone_after_the_wait() {
        let port = 18434;
        let _ = wait_for_callback(port, Duration::from_millis(100)).await;

        let err = reqwest::Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap()
            .get(format!("http://127.0.0.1:{}/", port))
            .send()
            .await;
        assert!(err.is_err());
    }
}
