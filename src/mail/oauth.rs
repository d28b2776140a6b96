//! OAuth2 access tokens for XOAUTH2 authentication.

use std::time::Duration;

use serde::Deserialize;

use super::{MailError, OAuth2Transport};

/// Timeout for a single token endpoint request.
pub const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client for the OAuth2 token endpoint.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
}

impl Default for TokenClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenClient {
    /// Create a token client with a 30 second request timeout.
    pub fn new() -> Self {
        Self::with_timeout(TOKEN_REQUEST_TIMEOUT)
    }

    /// Create a token client with the given request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let http = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(
                    "Failed to build token HTTP client, falling back to defaults without a timeout: {}",
                    e
                );
                reqwest::Client::new()
            }
        };
        Self { http }
    }

    /// Return an access token for the transport.
    ///
    /// A configured access token is used as-is. Otherwise the refresh token is
    /// exchanged for a fresh one. Tokens are not cached between requests.
    pub async fn access_token(&self, oauth: &OAuth2Transport) -> Result<String, MailError> {
        match &oauth.access_token {
            Some(token) => Ok(token.clone()),
            None => self.refresh(oauth).await,
        }
    }

    /// Exchange the refresh token for an access token.
    pub async fn refresh(&self, oauth: &OAuth2Transport) -> Result<String, MailError> {
        let params = [
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("refresh_token", oauth.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&oauth.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| MailError::delivery(format!("Failed to refresh access token: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<TokenErrorResponse>().await {
                Ok(body) => body.error_description.unwrap_or(body.error),
                Err(_) => status.to_string(),
            };
            return Err(MailError::delivery(format!(
                "Failed to refresh access token: {message}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MailError::delivery(format!("Invalid token response: {e}")))?;

        tracing::debug!(
            expires_in = token.expires_in.unwrap_or(oauth.expires_in),
            "Obtained OAuth2 access token"
        );

        Ok(token.access_token)
    }
}
