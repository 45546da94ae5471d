pub mod config;
pub mod error;
pub mod store;

pub use config::{
    Config, GoogleConfig, ProfileConfig, RelayConfig, TasksApiConfig, ValidationResult,
};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt, StorageError};
pub use store::{keys, MemorySyncStore, SqliteSyncStore, SyncStore, SyncStoreExt};

use anyhow::Result;

/// Initialize logging for any taskdo binary.
///
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("taskdo core initialized");
    Ok(())
}
