//! OAuth provider and client-identity configuration.
//!
//! Endpoints are plain values handed to the lifecycle manager, never
//! free-standing globals, so tests can point everything at a mock provider.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// OAuth provider configuration
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// OAuth authorization endpoint URL
    pub auth_url: String,

    /// OAuth token exchange endpoint URL
    pub token_url: String,

    /// Required OAuth scopes
    pub scopes: Vec<String>,

    /// Redirect target; the out-of-band flow shows the code to the operator
    pub redirect_uri: String,

    /// Client-side bound on token endpoint calls
    pub http_timeout: Duration,
}

impl ProviderConfig {
    /// Provider configuration for the read-only object store the install
    /// command pulls binaries from.
    pub fn google_storage() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/devstorage.read_only".to_string()],
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            http_timeout: Duration::from_secs(5),
        }
    }

    /// Build the consent URL presented to the operator.
    pub fn build_auth_url(&self, client_id: &str) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&response_type=code&access_type=offline",
            self.auth_url,
            urlencoding::encode(client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes),
        )
    }
}

/// Application client identity, supplied by the operator as a JSON file
/// downloaded from the provider's console.
#[derive(Clone, Debug, Deserialize)]
pub struct ClientIdentity {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientIdentity {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("can't read client identity file {}", path.display()))?;
        serde_json::from_slice(&data)
            .with_context(|| format!("can't decode client identity file {}", path.display()))
    }
}
