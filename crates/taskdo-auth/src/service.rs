//! Account sign-in, token refresh and access probing.

use std::future::Future;
use std::sync::Arc;

use taskdo_core::{Config, SyncStore};

use crate::account::{AccountStore, UserAccount};
use crate::error::AuthError;
use crate::google::{authorization_url, decode_id_token, PeopleResponse, Profile, RelayClient};
use crate::identity::{authorization_code, IdentityFlow};

/// Endpoints and client identity used during sign-in.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub client_id: String,
    pub auth_url: String,
    pub scopes: Vec<String>,
    pub relay_url: String,
    pub tasks_api_url: String,
    pub people_url: String,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.google.client_id.clone(),
            auth_url: config.google.auth_url.clone(),
            scopes: config.google.scopes.clone(),
            relay_url: config.relay.base_url.clone(),
            tasks_api_url: config.tasks.base_url.trim_end_matches('/').to_string(),
            people_url: config.profile.people_url.clone(),
        }
    }
}

/// Obtains a fresh access token for an account, updating it in place.
pub trait TokenRefresher: Send + Sync {
    fn refresh_access_token(
        &self,
        account: &mut UserAccount,
    ) -> impl Future<Output = Result<String, AuthError>> + Send;
}

/// The authentication helper.
pub struct AuthService<F> {
    settings: AuthSettings,
    http: reqwest::Client,
    relay: RelayClient,
    accounts: AccountStore,
    identity: F,
}

impl<F: IdentityFlow> AuthService<F> {
    pub fn new(settings: AuthSettings, store: Arc<dyn SyncStore>, identity: F) -> Self {
        let http = reqwest::Client::new();
        Self {
            relay: RelayClient::new(http.clone(), &settings.relay_url),
            http,
            accounts: AccountStore::new(store),
            identity,
            settings,
        }
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    /// Run the interactive flow and return a verified account.
    ///
    /// The account is upserted into storage by email before returning.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn authenticate_account(&self) -> Result<UserAccount, AuthError> {
        let redirect_uri = self.identity.redirect_uri();
        let request = authorization_url(
            &self.settings.auth_url,
            &self.settings.client_id,
            &redirect_uri,
            &self.settings.scopes,
        )?;

        let redirect = self.identity.launch(&request.url).await?;
        let code = authorization_code(&redirect, &request.state)?;

        let tokens = self.relay.exchange(&code, &redirect_uri).await?;
        let access_token = tokens
            .access_token
            .clone()
            .ok_or_else(|| AuthError::TokenExchange("response has no access_token".to_string()))?;

        let profile = match tokens.id_token.as_deref().map(decode_id_token) {
            Some(Ok(profile)) => profile,
            Some(Err(e)) => {
                tracing::warn!("Identity token unreadable, using profile API: {}", e);
                self.fetch_profile(&access_token).await?
            }
            None => self.fetch_profile(&access_token).await?,
        };

        self.verify_tasks_access(&access_token).await?;

        let account = UserAccount {
            id: profile.email.clone(),
            email: profile.email,
            name: profile.name,
            picture: profile.picture,
            access_token,
            refresh_token: tokens.refresh_token,
        };

        if let Err(e) = self.accounts.upsert(&account) {
            tracing::warn!("Failed to persist account {}: {}", account.email, e);
        }

        tracing::info!("Signed in {}", account.email);
        Ok(account)
    }

    /// Refresh the access token through the relay.
    ///
    /// Keeps the existing refresh token unless the relay returns a new one.
    #[tracing::instrument(skip(self, account), fields(account = %account.email), level = "info")]
    pub async fn refresh_token(&self, account: &mut UserAccount) -> Result<String, AuthError> {
        let refresh_token = account
            .refresh_token
            .clone()
            .ok_or(AuthError::NoRefreshToken)?;

        let tokens = self.relay.refresh(&refresh_token).await?;
        let access_token = tokens
            .access_token
            .ok_or_else(|| AuthError::RefreshFailed("response has no access_token".to_string()))?;

        account.access_token = access_token.clone();
        if let Some(new_refresh) = tokens.refresh_token {
            account.refresh_token = Some(new_refresh);
        }

        if let Err(e) = self.accounts.update(account) {
            tracing::warn!("Failed to persist refreshed token: {}", e);
        }

        Ok(access_token)
    }

    /// Whether the account's token still reaches the Tasks API, refreshing once.
    pub async fn test_authentication(&self, account: &mut UserAccount) -> bool {
        if self.verify_tasks_access(&account.access_token).await.is_ok() {
            return true;
        }

        match self.refresh_token(account).await {
            Ok(token) => self.verify_tasks_access(&token).await.is_ok(),
            Err(e) => {
                tracing::info!("Stored credentials for {} are no longer valid: {}", account.email, e);
                false
            }
        }
    }

    pub fn remove_account(&self, account_id: &str) -> Result<(), AuthError> {
        self.accounts.remove(account_id)?;
        tracing::info!("Removed account {}", account_id);
        Ok(())
    }

    #[tracing::instrument(skip(self, access_token), level = "debug")]
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile, AuthError> {
        let response = self
            .http
            .get(&self.settings.people_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::Profile(format!(
                "profile request returned {}",
                response.status()
            )));
        }

        let people: PeopleResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Profile(e.to_string()))?;
        people.into_profile()
    }

    #[tracing::instrument(skip(self, access_token), level = "debug")]
    async fn verify_tasks_access(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .get(format!("{}/users/@me/lists", self.settings.tasks_api_url))
            .query(&[("maxResults", "1")])
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status().as_u16() {
            200..=299 => Ok(()),
            401 => Err(AuthError::AuthenticationFailed),
            403 => Err(AuthError::TasksAccessDenied),
            status => Err(AuthError::TasksApi(status)),
        }
    }
}

impl<F: IdentityFlow> TokenRefresher for AuthService<F> {
    async fn refresh_access_token(&self, account: &mut UserAccount) -> Result<String, AuthError> {
        self.refresh_token(account).await
    }
}
