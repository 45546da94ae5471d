//! Tasks API error types.

use taskdo_core::{AppError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TasksError {
    #[error("Token expired")]
    TokenExpired,

    /// The token could not be refreshed; the account must sign in again.
    #[error("Authentication expired: {0}")]
    ReauthRequired(String),

    #[error("Access forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Invalid task data: {0}")]
    InvalidData(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl TasksError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::TokenExpired | Self::ReauthRequired(_) => {
                "Authentication expired. Please re-authenticate your Google account.".to_string()
            }
            Self::Forbidden(_) => "Access to Google Tasks was denied.".to_string(),
            Self::NotFound(_) => "The item no longer exists.".to_string(),
            Self::RateLimited(secs) => format!("Too many requests. Please wait {} seconds.", secs),
            Self::InvalidData(msg) => format!("Invalid task: {}", msg),
            Self::Api { status, .. } => format!("Google Tasks request failed ({}).", status),
            Self::Network(_) => "Network error. Check your connection.".to_string(),
        }
    }

    /// Whether the caller must route the account back through sign-in.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::ReauthRequired(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<TasksError> for AppError {
    fn from(err: TasksError) -> Self {
        match err {
            TasksError::ReauthRequired(reason) => AppError::ReauthRequired(reason),
            TasksError::TokenExpired => AppError::ReauthRequired(err.to_string()),
            TasksError::Network(e) => AppError::Network(e.into_network_error()),
            TasksError::Api { status, message } if status >= 500 => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            TasksError::InvalidData(message) => {
                AppError::Network(NetworkError::InvalidResponse(message))
            }
            other => AppError::Tasks(other.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        assert!(TasksError::ReauthRequired("x".into())
            .user_message()
            .contains("re-authenticate"));
        assert!(TasksError::RateLimited(30).user_message().contains("30"));
        assert!(TasksError::Api {
            status: 500,
            message: "boom".into()
        }
        .user_message()
        .contains("500"));
    }

    #[test]
    fn test_into_app_error() {
        assert!(AppError::from(TasksError::ReauthRequired("expired".into())).requires_reauth());
        assert!(matches!(
            AppError::from(TasksError::Api {
                status: 503,
                message: "down".into()
            }),
            AppError::Network(NetworkError::ServerError { status: 503, .. })
        ));
        assert_eq!(
            AppError::from(TasksError::RateLimited(30)).user_message(),
            "Too many requests. Please wait 30 seconds."
        );
    }

    #[test]
    fn test_classification() {
        assert!(TasksError::ReauthRequired("x".into()).requires_reauth());
        assert!(!TasksError::TokenExpired.requires_reauth());
        assert!(TasksError::NotFound("gone".into()).is_not_found());
    }
}
