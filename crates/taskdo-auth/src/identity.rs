//! Interactive sign-in: hand the consent URL to a browser and wait for the
//! redirect carrying the authorization code.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use url::Url;
use warp::Filter;

use crate::error::AuthError;

const CALLBACK_PAGE: &str = "<html><body><h1>Signed in</h1><p>You can close this window and return to taskdo.</p></body></html>";

/// The browser identity API.
pub trait IdentityFlow: Send + Sync {
    /// Redirect URI registered for this flow.
    fn redirect_uri(&self) -> String;

    /// Run the interactive flow and return the full redirect URL.
    fn launch(&self, auth_url: &str) -> impl Future<Output = Result<Url, AuthError>> + Send;
}

/// Opens a URL in the user's browser.
pub type BrowserOpener = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

type CallbackSender = Arc<tokio::sync::Mutex<Option<oneshot::Sender<HashMap<String, String>>>>>;

/// Opens the system browser and catches the redirect on a local callback server.
pub struct LoopbackIdentityFlow {
    port: u16,
    timeout: Duration,
    opener: BrowserOpener,
}

impl LoopbackIdentityFlow {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self {
            port,
            timeout,
            opener: Arc::new(|url: &str| webbrowser::open(url)),
        }
    }

    /// Replace how the consent URL is opened.
    pub fn with_opener(mut self, opener: BrowserOpener) -> Self {
        self.opener = opener;
        self
    }
}

impl IdentityFlow for LoopbackIdentityFlow {
    fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.port)
    }

    async fn launch(&self, auth_url: &str) -> Result<Url, AuthError> {
        let (tx, rx) = oneshot::channel();
        let tx: CallbackSender = Arc::new(tokio::sync::Mutex::new(Some(tx)));

        let routes = warp::get()
            .and(warp::path("callback"))
            .and(warp::path::end())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::any().map(move || tx.clone()))
            .and_then(
                |params: HashMap<String, String>, tx: CallbackSender| async move {
                    if let Some(sender) = tx.lock().await.take() {
                        let _ = sender.send(params);
                    }
                    Ok::<_, warp::Rejection>(warp::reply::html(CALLBACK_PAGE))
                },
            );

        // Dropping `shutdown_tx` also stops the server.
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([127, 0, 0, 1], self.port), async move {
                let _ = shutdown_rx.await;
            })
            .map_err(|e| {
                tracing::warn!("OAuth callback server failed to bind: {}", e);
                AuthError::PortInUse(self.port)
            })?;
        tokio::spawn(server);
        tracing::debug!("OAuth callback listening on {}", addr);

        tracing::info!("Opening browser for Google sign-in");
        (self.opener)(auth_url)
            .map_err(|e| AuthError::OAuthFailed(format!("Failed to open browser: {}", e)))?;

        let outcome = tokio::time::timeout(self.timeout, rx).await;
        let _ = shutdown_tx.send(());

        let params = match outcome {
            Ok(Ok(params)) => params,
            Ok(Err(_)) => {
                return Err(AuthError::OAuthFailed(
                    "OAuth callback closed without a response".to_string(),
                ))
            }
            Err(_) => {
                tracing::info!("Sign-in timed out after {:?}", self.timeout);
                return Err(AuthError::Cancelled);
            }
        };

        Url::parse_with_params(&self.redirect_uri(), params.iter())
            .map_err(|e| AuthError::OAuthFailed(format!("Invalid redirect: {}", e)))
    }
}

/// Pull the authorization code out of a redirect URL, checking CSRF state.
pub(crate) fn authorization_code(redirect: &Url, expected_state: &str) -> Result<String, AuthError> {
    let params: HashMap<String, String> = redirect.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        return if error == "access_denied" {
            Err(AuthError::Cancelled)
        } else {
            Err(AuthError::OAuthFailed(error.clone()))
        };
    }

    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }

    params
        .get("code")
        .filter(|code| !code.is_empty())
        .cloned()
        .ok_or(AuthError::MissingCode)
}
