//! OAuth token exchange and refresh.
//!
//! Handles the authorization-code exchange during bootstrap and the
//! refresh-token grant during normal use. Both are single bounded POSTs to
//! the provider's token endpoint; retry policy, if any, belongs to callers.

use chrono::{Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::provider::ProviderConfig;
use crate::credentials::TokenState;

/// OAuth token response (standard OAuth 2.0)
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Error body some providers return alongside a 4xx status
#[derive(Deserialize, Debug, Default)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Token endpoint failures
#[derive(Debug)]
pub enum ExchangeError {
    /// The provider rejected the grant; only a fresh consent flow helps
    ReauthorizationRequired(String),
    /// Timeout or connection failure; transient from the caller's view
    Network(String),
    /// The provider answered with something unusable
    Provider(String),
}

impl std::fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeError::ReauthorizationRequired(detail) => write!(
                f,
                "token provider rejected the stored grant ({}); run `bootkit token` to authorize again",
                if detail.is_empty() { "invalid_grant" } else { detail }
            ),
            ExchangeError::Network(e) => write!(f, "can't reach the token endpoint: {}", e),
            ExchangeError::Provider(e) => write!(f, "token endpoint failure: {}", e),
        }
    }
}

impl std::error::Error for ExchangeError {}

/// Exchange an authorization code for the initial token pair.
pub async fn exchange_code(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    client_id: &str,
    client_secret: &str,
    code: &str,
) -> Result<TokenState, ExchangeError> {
    let mut form = HashMap::new();
    form.insert("grant_type", "authorization_code");
    form.insert("code", code);
    form.insert("redirect_uri", provider.redirect_uri.as_str());
    form.insert("client_id", client_id);
    form.insert("client_secret", client_secret);

    request_token(client, provider, &form, None).await
}

/// Obtain a new access token from a refresh token.
///
/// The existing refresh token is carried forward unless the provider
/// rotates it in the response.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<TokenState, ExchangeError> {
    let mut form = HashMap::new();
    form.insert("grant_type", "refresh_token");
    form.insert("refresh_token", refresh_token);
    form.insert("client_id", client_id);
    form.insert("client_secret", client_secret);

    request_token(client, provider, &form, Some(refresh_token)).await
}

async fn request_token(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    form: &HashMap<&str, &str>,
    prior_refresh_token: Option<&str>,
) -> Result<TokenState, ExchangeError> {
    debug!(token_url = %provider.token_url, "requesting token");

    let response = client
        .post(&provider.token_url)
        .header("Accept", "application/json")
        .timeout(provider.http_timeout)
        .form(form)
        .send()
        .await
        .map_err(|e| ExchangeError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read body>".to_string());
        let parsed: TokenErrorResponse = serde_json::from_str(&body).unwrap_or_default();
        if parsed.error == "invalid_grant" {
            return Err(ExchangeError::ReauthorizationRequired(
                parsed.error_description,
            ));
        }
        return Err(ExchangeError::Provider(format!(
            "status {}: {}",
            status, body
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ExchangeError::Provider(format!("can't decode token response: {}", e)))?;

    debug!(
        has_refresh_token = token.refresh_token.is_some(),
        expires_in = ?token.expires_in,
        "token request successful"
    );

    let expiry = token
        .expires_in
        .map(|seconds| Utc::now() + Duration::seconds(seconds));

    let refresh_token = token
        .refresh_token
        .or_else(|| prior_refresh_token.map(str::to_string))
        .unwrap_or_default();

    Ok(TokenState {
        access_token: token.access_token,
        token_type: token.token_type.unwrap_or_else(|| "Bearer".to_string()),
        refresh_token,
        expiry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_deserialization() {
        let json = r#"{
            "access_token": "ya29.1234567890",
            "refresh_token": "1//0987654321",
            "expires_in": 3600,
            "token_type": "Bearer"
        }"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "ya29.1234567890");
        assert_eq!(response.refresh_token, Some("1//0987654321".to_string()));
        assert_eq!(response.expires_in, Some(3600));
        assert_eq!(response.token_type, Some("Bearer".to_string()));
    }

    #[test]
    fn test_token_response_minimal() {
        let json = r#"{"access_token": "token_12345"}"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "token_12345");
        assert_eq!(response.refresh_token, None);
        assert_eq!(response.expires_in, None);
    }

    #[test]
    fn test_error_response_deserialization() {
        let json = r#"{"error": "invalid_grant", "error_description": "Token has been revoked."}"#;
        let parsed: TokenErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.error, "invalid_grant");
        assert_eq!(parsed.error_description, "Token has been revoked.");
    }

    #[test]
    fn test_error_response_tolerates_non_json() {
        let parsed: TokenErrorResponse = serde_json::from_str("<html>").unwrap_or_default();
        assert!(parsed.error.is_empty());
    }

    #[test]
    fn test_reauthorization_message_names_the_fix() {
        let err = ExchangeError::ReauthorizationRequired(String::new());
        assert!(err.to_string().contains("bootkit token"));
    }
}
