use std::fmt;
use std::net::SocketAddr;

use taskdo_core::ConfigError;

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_ADDR: &str = "127.0.0.1:8787";

/// Client credentials and listen address of the relay.
#[derive(Clone)]
pub struct RelaySettings {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub addr: SocketAddr,
}

impl fmt::Debug for RelaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaySettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url)
            .field("addr", &self.addr)
            .finish()
    }
}

impl RelaySettings {
    /// Read `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `TASKDO_RELAY_ADDR`
    /// and `GOOGLE_TOKEN_URL` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingSetting(key.to_string()))
        };

        let client_id = required("GOOGLE_CLIENT_ID")?;
        let client_secret = required("GOOGLE_CLIENT_SECRET")?;

        let addr = lookup("TASKDO_RELAY_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid(format!("TASKDO_RELAY_ADDR: {}", e)))?;

        let token_url = lookup("GOOGLE_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string());
        let parsed = url::Url::parse(&token_url)
            .map_err(|e| ConfigError::Invalid(format!("GOOGLE_TOKEN_URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "GOOGLE_TOKEN_URL must use http or https".to_string(),
            ));
        }

        Ok(Self {
            client_id,
            client_secret,
            token_url,
            addr,
        })
    }
}
