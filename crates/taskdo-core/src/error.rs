//! Shared error types for taskdo.
//!
//! Crate-specific errors (`AuthError`, `TasksError`) live next to their
//! clients and convert into `AppError` at the application boundary.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get text suitable for a notification.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Sign-in failures, holding the text shown to the user.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Authentication expired and could not be refreshed.
    #[error("Re-authentication required: {0}")]
    ReauthRequired(String),

    /// Tasks API failures, holding the text shown to the user.
    #[error("Tasks API error: {0}")]
    Tasks(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(e) => e.user_message().to_string(),
            AppError::Storage(e) => e.user_message().to_string(),
            AppError::Config(e) => e.user_message().to_string(),
            AppError::Auth(message) | AppError::Tasks(message) | AppError::Validation(message) => {
                message.clone()
            }
            AppError::ReauthRequired(_) => {
                "Authentication expired. Please re-authenticate your Google account.".to_string()
            }
            AppError::Other(_) => "An unexpected error occurred. Please try again.".to_string(),
        }
    }

    /// Whether the error should send the user back through sign-in.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, AppError::ReauthRequired(_))
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Synced store errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage query failed: {0}")]
    QueryFailed(String),

    #[error("Stored value for '{key}' is malformed: {message}")]
    Malformed { key: String, message: String },
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::Unavailable(_) => "Unable to access saved data. Try restarting.",
            StorageError::QueryFailed(_) => "Saving data failed. Please try again.",
            StorageError::Malformed { .. } => "Saved data was unreadable and has been reset.",
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("unable to open") => {
                StorageError::Unavailable(e.to_string())
            }
            _ => StorageError::QueryFailed(e.to_string()),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let err: AppError = StorageError::QueryFailed("disk full".into()).into();
        assert!(matches!(err, AppError::Storage(StorageError::QueryFailed(_))));
    }

    #[test]
    fn test_user_message_propagation() {
        let err = AppError::Network(NetworkError::Timeout);
        assert_eq!(err.user_message(), "The request timed out. Please try again.");

        let err = AppError::Network(NetworkError::ServerError {
            status: 503,
            message: "unavailable".into(),
        });
        assert!(err.user_message().contains("try again later"));
    }

    #[test]
    fn test_validation_message_is_shown_as_is() {
        let err = AppError::Validation("Title is required".into());
        assert_eq!(err.user_message(), "Title is required");
    }

    #[test]
    fn test_reauth_is_flagged() {
        assert!(AppError::ReauthRequired("expired".into()).requires_reauth());
        assert!(!AppError::Tasks("boom".into()).requires_reauth());
    }
}
