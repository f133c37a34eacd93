//! OAuth2 bootstrap and token lifecycle.
//!
//! Two entry points, mirroring the two lives of the tool:
//!
//! - [`TokenLifecycle::bootstrap`] runs the one-time interactive consent
//!   flow and persists the resulting credential bundle.
//! - [`TokenLifecycle::authorized_client`] loads the bundle on every later
//!   invocation and wraps it in an [`AuthorizedClient`] that refreshes the
//!   access token when it has expired. [`TokenLifecycle::finish`] writes the
//!   bundle back, at most once, if the token state changed.
//!
//! Callers never see encryption or store-backend details; they get an
//! authorized transport and hand it back when they are done.

pub mod exchange;
pub mod provider;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::credentials::{CredentialBundle, TokenState, TokenStore};

pub use exchange::ExchangeError;
pub use provider::{ClientIdentity, ProviderConfig};

/// Refresh when the recorded expiry is within this many seconds of now.
const REFRESH_SKEW_SECONDS: i64 = 30;

/// Supplies the authorization code during interactive bootstrap.
///
/// The consent flow blocks on operator input; routing that input through a
/// trait keeps the wait out of the core, so a test harness or a future
/// non-interactive flow can supply the code directly.
pub trait CodeSource {
    fn authorization_code(&mut self, auth_url: &str) -> Result<String>;
}

/// Interactive source: print the consent URL, read the code from stdin.
///
/// Blocks indefinitely; the operator finishes the browser dialog on their
/// own time.
pub struct StdinCodeSource;

impl CodeSource for StdinCodeSource {
    fn authorization_code(&mut self, auth_url: &str) -> Result<String> {
        println!("Visit the URL for the auth dialog: {}", auth_url);

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("can't read the authorization code")?;
        let code = line.trim();
        if code.is_empty() {
            bail!("empty authorization code");
        }
        Ok(code.to_string())
    }
}

/// Orchestrates bootstrap, load-refresh-use-save, and write-back.
pub struct TokenLifecycle {
    provider: ProviderConfig,
    store: Box<dyn TokenStore>,
    http: reqwest::Client,
}

impl TokenLifecycle {
    pub fn new(provider: ProviderConfig, store: Box<dyn TokenStore>) -> Result<Self> {
        // Connects are bounded for every call through this lifecycle; the
        // token endpoint additionally gets a per-request overall timeout.
        let http = reqwest::Client::builder()
            .connect_timeout(provider.http_timeout)
            .build()
            .context("can't build HTTP client")?;
        Ok(Self {
            provider,
            store,
            http,
        })
    }

    /// One-time interactive consent flow.
    ///
    /// Presents the consent URL, waits for the operator-supplied code,
    /// exchanges it for the initial token pair, and persists the assembled
    /// bundle. Failure at any step leaves the store untouched.
    pub async fn bootstrap(
        &self,
        identity: ClientIdentity,
        code_source: &mut dyn CodeSource,
    ) -> Result<()> {
        let auth_url = self.provider.build_auth_url(&identity.client_id);
        let code = code_source.authorization_code(&auth_url)?;

        let token = exchange::exchange_code(
            &self.http,
            &self.provider,
            &identity.client_id,
            &identity.client_secret,
            &code,
        )
        .await
        .context("can't complete the oauth2 exchange")?;
        info!("retrieved a token via oauth exchange");

        let bundle = CredentialBundle {
            client_id: identity.client_id,
            client_secret: identity.client_secret,
            token,
        };
        self.store.write(&bundle.to_bytes()?)?;
        info!("credential bundle persisted");
        Ok(())
    }

    /// Load the stored bundle and wrap it in an authorized transport.
    ///
    /// An absent bundle surfaces as the store's NotFound error, which tells
    /// the operator to run the bootstrap; nothing is ever synthesized.
    pub async fn authorized_client(&self) -> Result<AuthorizedClient> {
        let bytes = self.store.read()?;
        let bundle = CredentialBundle::from_bytes(&bytes)?;
        debug!(client_id = %bundle.client_id, "credential bundle loaded");

        Ok(AuthorizedClient {
            http: self.http.clone(),
            provider: self.provider.clone(),
            loaded_token: bundle.token.clone(),
            bundle,
        })
    }

    /// Persist the transport's token state iff it changed since load.
    ///
    /// Called once, after the caller's authorized operations complete.
    pub fn finish(&self, client: AuthorizedClient) -> Result<()> {
        if !client.token_changed() {
            debug!("token state unchanged, no write-back");
            return Ok(());
        }
        self.store.write(&client.bundle.to_bytes()?)?;
        info!("refreshed token state written back");
        Ok(())
    }
}

/// HTTP transport carrying the bundle's access token.
///
/// Refreshes lazily: each request first checks the recorded expiry and
/// performs the refresh grant when it has passed. The caller observes
/// refresh failures directly; there are no retries here.
#[derive(Debug)]
pub struct AuthorizedClient {
    http: reqwest::Client,
    provider: ProviderConfig,
    bundle: CredentialBundle,
    loaded_token: TokenState,
}

impl AuthorizedClient {
    /// GET `url` with a fresh bearer token.
    pub async fn get(&mut self, url: &str) -> Result<reqwest::Response> {
        self.ensure_fresh().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.bundle.token.access_token)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        Ok(response)
    }

    async fn ensure_fresh(&mut self) -> Result<()> {
        if !self
            .bundle
            .token
            .is_expired(chrono::Duration::seconds(REFRESH_SKEW_SECONDS))
        {
            return Ok(());
        }

        info!("access token expired, refreshing");
        let token = exchange::refresh_access_token(
            &self.http,
            &self.provider,
            &self.bundle.client_id,
            &self.bundle.client_secret,
            &self.bundle.token.refresh_token,
        )
        .await?;
        self.bundle.token = token;
        Ok(())
    }

    /// Whether the token state differs from what was loaded from the store.
    pub fn token_changed(&self) -> bool {
        self.bundle.token != self.loaded_token
    }

    pub fn bundle(&self) -> &CredentialBundle {
        &self.bundle
    }
}
