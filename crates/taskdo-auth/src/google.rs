//! Google OAuth pieces: authorization URL, relay token calls, profile decoding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Authorization URL plus the CSRF state to verify on return.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Build the consent URL for the authorization-code flow.
///
/// Requests offline access so Google issues a refresh token.
pub fn authorization_url(
    auth_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
) -> Result<AuthorizationRequest, AuthError> {
    let client = BasicClient::new(
        ClientId::new(client_id.to_string()),
        None,
        AuthUrl::new(auth_url.to_string())
            .map_err(|e| AuthError::OAuthFailed(format!("Invalid auth URL: {}", e)))?,
        None,
    )
    .set_redirect_uri(
        RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| AuthError::OAuthFailed(format!("Invalid redirect URI: {}", e)))?,
    );

    let (url, csrf_token) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(scopes.iter().cloned().map(Scope::new))
        .add_extra_param("access_type", "offline")
        .add_extra_param("prompt", "consent")
        .add_extra_param("include_granted_scopes", "true")
        .url();

    Ok(AuthorizationRequest {
        url: url.to_string(),
        state: csrf_token.secret().clone(),
    })
}

/// Token endpoint body as relayed verbatim.
///
/// Google reports failures in-band with `error`/`error_description`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenResponse {
    /// The in-band failure, if any.
    fn failure(&self) -> Option<String> {
        match (&self.error, &self.error_description) {
            (Some(err), Some(desc)) => Some(format!("{}: {}", err, desc)),
            (Some(err), None) => Some(err.clone()),
            _ if self.access_token.is_none() => Some("response has no access_token".to_string()),
            _ => None,
        }
    }
}

/// Client for the token relay (`/exchange`, `/refresh`).
#[derive(Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Exchange an authorization code for tokens.
    #[tracing::instrument(skip(self, code), level = "info")]
    pub async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(format!("{}/exchange", self.base_url))
            .json(&serde_json::json!({ "code": code, "redirect_uri": redirect_uri }))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange(error_text));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("Unreadable response: {}", e)))?;

        match tokens.failure() {
            Some(message) => Err(AuthError::TokenExchange(message)),
            None => Ok(tokens),
        }
    }

    /// Trade a refresh token for a new access token.
    #[tracing::instrument(skip(self, refresh_token), level = "info")]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(format!("{}/refresh", self.base_url))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed(error_text));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("Unreadable response: {}", e)))?;

        match tokens.failure() {
            Some(message) => Err(AuthError::RefreshFailed(message)),
            None => Ok(tokens),
        }
    }
}

/// Display identity of an account.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Deserialize)]
struct IdTokenClaims {
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Read email, name and picture from an identity token's payload.
///
/// The signature is not checked: the token came straight from Google's
/// token endpoint over TLS.
pub fn decode_id_token(id_token: &str) -> Result<Profile, AuthError> {
    let payload = id_token
        .split('.')
        .nth(1)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AuthError::Profile("malformed identity token".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::Profile(format!("identity token payload: {}", e)))?;

    let claims: IdTokenClaims = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::Profile(format!("identity token claims: {}", e)))?;

    let email = claims
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AuthError::Profile("identity token has no email".to_string()))?;

    Ok(Profile {
        name: claims.name.unwrap_or_else(|| email.clone()),
        email,
        picture: claims.picture,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PeopleResponse {
    #[serde(default)]
    names: Vec<PersonName>,
    #[serde(default)]
    email_addresses: Vec<PersonEmail>,
    #[serde(default)]
    photos: Vec<PersonPhoto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonName {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersonEmail {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersonPhoto {
    url: Option<String>,
}

impl PeopleResponse {
    pub(crate) fn into_profile(self) -> Result<Profile, AuthError> {
        let email = self
            .email_addresses
            .into_iter()
            .find_map(|e| e.value)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthError::Profile("profile has no email address".to_string()))?;

        let name = self
            .names
            .into_iter()
            .find_map(|n| n.display_name)
            .unwrap_or_default();

        Ok(Profile {
            email,
            name,
            picture: self.photos.into_iter().find_map(|p| p.url),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scopes() -> Vec<String> {
        vec![
            "https://www.googleapis.com/auth/tasks".to_string(),
            "profile".to_string(),
            "email".to_string(),
        ]
    }

    fn id_token(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn test_authorization_url_contains_offline_access() {
        let request = authorization_url(
            "https://accounts.google.com/o/oauth2/v2/auth",
            "client-123",
            "http://127.0.0.1:8085/callback",
            &scopes(),
        )
        .unwrap();

        assert!(request.url.contains("client_id=client-123"));
        assert!(request.url.contains("response_type=code"));
        assert!(request.url.contains("access_type=offline"));
        assert!(request.url.contains("prompt=consent"));
        assert!(request.url.contains("include_granted_scopes=true"));
        assert!(request.url.contains("auth%2Ftasks"));
        assert!(request.url.contains(&format!("state={}", request.state)));
    }

    #[test]
    fn test_state_is_unique() {
        let a = authorization_url("https://a.test/auth", "c", "http://127.0.0.1:1/cb", &scopes())
            .unwrap();
        let b = authorization_url("https://a.test/auth", "c", "http://127.0.0.1:1/cb", &scopes())
            .unwrap();
        assert_ne!(a.state, b.state);
    }

    #[test]
    fn test_invalid_auth_url() {
        let result = authorization_url("not a url", "c", "http://127.0.0.1:1/cb", &scopes());
        assert!(matches!(result, Err(AuthError::OAuthFailed(_))));
    }

    #[test]
    fn test_decode_id_token() {
        let token = id_token(serde_json::json!({
            "email": "ada@example.com",
            "name": "Ada Lovelace",
            "picture": "https://example.com/ada.png"
        }));

        let profile = decode_id_token(&token).unwrap();
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.picture.as_deref(), Some("https://example.com/ada.png"));
    }

    #[test]
    fn test_decode_id_token_without_email() {
        let token = id_token(serde_json::json!({ "name": "Nobody" }));
        assert!(matches!(decode_id_token(&token), Err(AuthError::Profile(_))));
        assert!(matches!(decode_id_token("garbage"), Err(AuthError::Profile(_))));
    }

    #[test]
    fn test_people_response_into_profile() {
        let people: PeopleResponse = serde_json::from_value(serde_json::json!({
            "names": [{ "displayName": "Grace Hopper" }],
            "emailAddresses": [{ "value": "grace@example.com" }],
            "photos": [{ "url": "https://example.com/g.png" }]
        }))
        .unwrap();

        let profile = people.into_profile().unwrap();
        assert_eq!(profile.email, "grace@example.com");
        assert_eq!(profile.name, "Grace Hopper");
    }

    #[tokio::test]
    async fn test_exchange_posts_code_and_redirect() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/exchange"))
            .and(body_json(serde_json::json!({
                "code": "auth-code",
                "redirect_uri": "http://127.0.0.1:8085/callback"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access",
                "refresh_token": "refresh",
                "expires_in": 3599
            })))
            .mount(&mock_server)
            .await;

        let relay = RelayClient::new(reqwest::Client::new(), &mock_server.uri());
        let tokens = relay
            .exchange("auth-code", "http://127.0.0.1:8085/callback")
            .await
            .unwrap();

        assert_eq!(tokens.access_token.as_deref(), Some("access"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn test_exchange_in_band_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/exchange"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .mount(&mock_server)
            .await;

        let relay = RelayClient::new(reqwest::Client::new(), &mock_server.uri());
        let result = relay.exchange("stale", "http://127.0.0.1/cb").await;

        assert!(matches!(result, Err(AuthError::TokenExchange(msg)) if msg.contains("invalid_grant")));
    }

    #[tokio::test]
    async fn test_refresh_http_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&mock_server)
            .await;

        let relay = RelayClient::new(reqwest::Client::new(), &format!("{}/", mock_server.uri()));
        let result = relay.refresh("refresh").await;

        assert!(matches!(result, Err(AuthError::RefreshFailed(_))));
    }
}
