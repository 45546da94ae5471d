//! Authentication error types.

use taskdo_core::{AppError, ReqwestErrorExt, StorageError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Sign-in was cancelled")]
    Cancelled,

    #[error("OAuth flow failed: {0}")]
    OAuthFailed(String),

    #[error("No authorization code in redirect URL")]
    MissingCode,

    #[error("CSRF state mismatch")]
    StateMismatch,

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("No refresh token")]
    NoRefreshToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Could not read account profile: {0}")]
    Profile(String),

    #[error("Google Tasks API access denied")]
    TasksAccessDenied,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Google Tasks API error: {0}")]
    TasksApi(u16),

    #[error("Port {0} already in use for OAuth callback")]
    PortInUse(u16),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AuthError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Cancelled => "Sign-in was cancelled.".to_string(),
            Self::TasksAccessDenied => {
                "Google Tasks access was denied. Please grant permission to manage your tasks."
                    .to_string()
            }
            Self::AuthenticationFailed => "Authentication failed. Please try again.".to_string(),
            Self::TasksApi(status) => {
                format!("Could not verify Google Tasks access (status {}).", status)
            }
            Self::NoRefreshToken | Self::RefreshFailed(_) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            Self::PortInUse(port) => {
                format!("Sign-in port {} is busy. Close other apps and try again.", port)
            }
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Storage(e) => e.user_message().to_string(),
            Self::OAuthFailed(_)
            | Self::MissingCode
            | Self::StateMismatch
            | Self::TokenExchange(_)
            | Self::Profile(_) => "Failed to add account. Please try again.".to_string(),
        }
    }

    /// Whether the user backed out of the interactive flow.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Storage(e) => AppError::Storage(e),
            AuthError::Network(e) => AppError::Network(e.into_network_error()),
            AuthError::NoRefreshToken | AuthError::RefreshFailed(_) => {
                AppError::ReauthRequired(err.to_string())
            }
            other => AppError::Auth(other.user_message()),
        }
    }
}
