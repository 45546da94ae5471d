//! Forwarding of token grants to Google's token endpoint.

use serde::Deserialize;
use tracing::instrument;

use crate::settings::RelaySettings;

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub code: String,
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Adds the client credentials to grants and posts them upstream.
pub struct TokenRelay {
    client: reqwest::Client,
    settings: RelaySettings,
}

impl TokenRelay {
    pub fn new(settings: RelaySettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    /// Authorization-code grant. Returns the upstream body untouched.
    #[instrument(skip_all, level = "info")]
    pub async fn exchange(&self, request: &ExchangeRequest) -> Result<Vec<u8>, reqwest::Error> {
        self.forward(&[
            ("code", request.code.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("redirect_uri", request.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Refresh-token grant. Returns the upstream body untouched.
    #[instrument(skip_all, level = "info")]
    pub async fn refresh(&self, request: &RefreshRequest) -> Result<Vec<u8>, reqwest::Error> {
        self.forward(&[
            ("refresh_token", request.refresh_token.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn forward(&self, form: &[(&str, &str)]) -> Result<Vec<u8>, reqwest::Error> {
        let response = self
            .client
            .post(&self.settings.token_url)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::info!("Token endpoint answered {}", status);
        }
        Ok(response.bytes().await?.to_vec())
    }
}
