use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TASKS_API: &str = "https://tasks.googleapis.com/tasks/v1";
const DEFAULT_PEOPLE_URL: &str =
    "https://people.googleapis.com/v1/people/me?personFields=names,emailAddresses,photos";
const PLACEHOLDER_CLIENT_ID: &str = "your-google-client-id.apps.googleusercontent.com";
const PLACEHOLDER_RELAY_URL: &str = "https://your-relay.example.com";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Google OAuth client settings
    #[serde(default)]
    pub google: GoogleConfig,

    /// Token relay settings
    #[serde(default)]
    pub relay: RelayConfig,

    /// Google Tasks API settings
    #[serde(default)]
    pub tasks: TasksApiConfig,

    /// Profile lookup used when no identity token is returned
    #[serde(default)]
    pub profile: ProfileConfig,
}

/// Google OAuth client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client ID (public; the secret only lives on the relay)
    pub client_id: String,

    /// Authorization endpoint
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Local port receiving the OAuth redirect
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,

    /// Seconds to wait for the user to finish signing in
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,

    /// Scopes requested during sign-in
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_redirect_port() -> u16 {
    8085
}

fn default_auth_timeout() -> u64 {
    300
}

fn default_scopes() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/tasks".to_string(),
        "profile".to_string(),
        "email".to_string(),
    ]
}

impl GoogleConfig {
    /// Check if the client ID is set (not a placeholder)
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && self.client_id != PLACEHOLDER_CLIENT_ID
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: PLACEHOLDER_CLIENT_ID.to_string(),
            auth_url: default_auth_url(),
            redirect_port: default_redirect_port(),
            auth_timeout_secs: default_auth_timeout(),
            scopes: default_scopes(),
        }
    }
}

/// Token relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the deployed relay (serves `/exchange` and `/refresh`)
    pub base_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: PLACEHOLDER_RELAY_URL.to_string(),
        }
    }
}

/// Google Tasks API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksApiConfig {
    #[serde(default = "default_tasks_api")]
    pub base_url: String,

    /// Tasks requested per page (the API caps this at 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Retries for transient failures (5xx, 429, timeouts)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_tasks_api() -> String {
    DEFAULT_TASKS_API.to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_retries() -> u32 {
    2
}

impl Default for TasksApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_tasks_api(),
            page_size: default_page_size(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_people_url")]
    pub people_url: String,
}

fn default_people_url() -> String {
    DEFAULT_PEOPLE_URL.to_string()
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            people_url: default_people_url(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("taskdo");

        Self {
            config_dir,
            google: GoogleConfig::default(),
            relay: RelayConfig::default(),
            tasks: TasksApiConfig::default(),
            profile: ProfileConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from an explicit path, writing defaults if it doesn't exist.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Environment variables take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = std::env::var("GOOGLE_CLIENT_ID") {
            self.google.client_id = client_id;
        }
        if let Ok(relay_url) = std::env::var("TASKDO_RELAY_URL") {
            self.relay.base_url = relay_url;
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_url(&self.google.auth_url, "google.auth_url", &mut result);
        Self::validate_url(&self.relay.base_url, "relay.base_url", &mut result);
        Self::validate_url(&self.tasks.base_url, "tasks.base_url", &mut result);
        Self::validate_url(&self.profile.people_url, "profile.people_url", &mut result);

        if !self.google.is_configured() {
            result.add_warning(
                "google.client_id",
                "Google OAuth client ID not configured - sign-in will fail",
            );
        }

        if self.relay.base_url == PLACEHOLDER_RELAY_URL {
            result.add_warning("relay.base_url", "Token relay URL is still the placeholder");
        }

        if self.google.redirect_port == 0 {
            result.add_error("google.redirect_port", "Redirect port cannot be 0");
        }

        if self.google.auth_timeout_secs == 0 {
            result.add_error(
                "google.auth_timeout_secs",
                "Sign-in timeout must be greater than 0",
            );
        }

        if self.tasks.page_size == 0 {
            result.add_error("tasks.page_size", "Page size must be greater than 0");
        } else if self.tasks.page_size > 100 {
            result.add_warning(
                "tasks.page_size",
                "Page size above 100 is capped by the Tasks API",
            );
        }

        if self.google.scopes.is_empty() {
            result.add_error("google.scopes", "At least one scope is required");
        }

        result
    }

    fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Path of the synced key-value store database
    pub fn storage_path(&self) -> PathBuf {
        self.config_dir.join("sync_store.db")
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("taskdo");

        Ok(config_dir.join("config.toml"))
    }
}
