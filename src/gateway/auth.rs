//! Bearer token acquisition for the gateway.

use crate::config::GatewaySettings;
use crate::error::{ChainlabError, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of the bearer token sent with gateway requests.
pub enum TokenProvider {
    /// No credentials; requests are sent without `Authorization`.
    Anonymous,
    /// Pre-issued token.
    Static(String),
    /// OAuth2 client-credentials exchange, cached until shortly before expiry.
    ClientCredentials {
        token_url: String,
        client_id: String,
        client_secret: String,
        cached: Mutex<Option<CachedToken>>,
    },
}

/// A token together with its refresh deadline.
#[derive(Debug, Clone)]
pub struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl TokenProvider {
    /// Pick a provider from settings. A static token wins over client credentials.
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        if let Some(token) = settings.token.as_ref().filter(|t| !t.is_empty()) {
            return TokenProvider::Static(token.clone());
        }

        match (&settings.auth_url, &settings.client_id, &settings.client_secret) {
            (Some(auth_url), Some(client_id), Some(client_secret)) => {
                TokenProvider::ClientCredentials {
                    token_url: token_url(auth_url),
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    cached: Mutex::new(None),
                }
            }
            _ => TokenProvider::Anonymous,
        }
    }

    /// Current bearer token, fetching a new one if needed.
    pub async fn bearer(&self, http: &reqwest::Client) -> Result<Option<String>> {
        match self {
            TokenProvider::Anonymous => Ok(None),
            TokenProvider::Static(token) => Ok(Some(token.clone())),
            TokenProvider::ClientCredentials {
                token_url,
                client_id,
                client_secret,
                cached,
            } => {
                let mut guard = cached.lock().await;
                if let Some(token) = guard.as_ref() {
                    if Instant::now() < token.refresh_at {
                        return Ok(Some(token.value.clone()));
                    }
                }

                debug!("Requesting gateway token from {}", token_url);
                let response = http
                    .post(token_url.as_str())
                    .basic_auth(client_id, Some(client_secret))
                    .form(&[("grant_type", "client_credentials")])
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ChainlabError::Auth(format!(
                        "token endpoint returned {}: {}",
                        status, body
                    )));
                }

                let token: TokenResponse = response.json().await?;
                let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
                info!("Obtained gateway token (valid for {}s)", lifetime.as_secs());

                *guard = Some(CachedToken {
                    value: token.access_token.clone(),
                    refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
                });
                Ok(Some(token.access_token))
            }
        }
    }
}

/// Normalize an auth URL into the token endpoint.
fn token_url(auth_url: &str) -> String {
    let trimmed = auth_url.trim_end_matches('/');
    if trimmed.ends_with("/oauth/token") {
        trimmed.to_string()
    } else {
        format!("{}/oauth/token", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url() {
        assert_eq!(
            token_url("https://auth.example.com"),
            "https://auth.example.com/oauth/token"
        );
        assert_eq!(
            token_url("https://auth.example.com/oauth/token/"),
            "https://auth.example.com/oauth/token"
        );
    }

    #[test]
    fn test_static_token_wins() {
        let settings = GatewaySettings {
            token: Some("abc".to_string()),
            auth_url: Some("https://auth".to_string()),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            TokenProvider::from_settings(&settings),
            TokenProvider::Static(t) if t == "abc"
        ));
    }

    #[test]
    fn test_incomplete_credentials_are_anonymous() {
        let settings = GatewaySettings {
            auth_url: Some("https://auth".to_string()),
            client_id: Some("id".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            TokenProvider::from_settings(&settings),
            TokenProvider::Anonymous
        ));
    }

    #[tokio::test]
    async fn test_static_bearer() {
        let provider = TokenProvider::Static("tok".to_string());
        let http = reqwest::Client::new();
        assert_eq!(provider.bearer(&http).await.unwrap(), Some("tok".to_string()));
    }

    fn client_credentials(refresh_at: Instant) -> TokenProvider {
        TokenProvider::ClientCredentials {
            token_url: "http://127.0.0.1:9/oauth/token".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            cached: Mutex::new(Some(CachedToken {
                value: "cached".to_string(),
                refresh_at,
            })),
        }
    }

    #[tokio::test]
    async fn test_cached_token_reused_before_refresh() {
        let provider = client_credentials(Instant::now() + Duration::from_secs(600));
        let http = reqwest::Client::new();
        assert_eq!(provider.bearer(&http).await.unwrap(), Some("cached".to_string()));
    }

    #[tokio::test]
    async fn test_expired_token_is_refetched() {
        let provider = client_credentials(Instant::now());
        let http = reqwest::Client::new();
        let err = provider.bearer(&http).await.unwrap_err();
        assert!(matches!(err, ChainlabError::Http(_)));
    }
}
