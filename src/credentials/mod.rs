//! Encrypted credential persistence for the OAuth token bundle.
//!
//! The unit of persisted state is the [`CredentialBundle`]: the OAuth client
//! identity plus the current token state. The bundle is serialized to JSON,
//! encrypted with AES-256-GCM under a key derived from an operator
//! passphrase, and written to one of the [`store`] backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       TokenStore backends                │
//! │  - encrypted file (default)              │
//! │  - macOS Keychain                        │
//! │  - in-memory (tests)                     │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!    (encrypt)            (decrypt)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       Encryption module                  │
//! │  - HMAC-SHA-512/256 key derivation       │
//! │  - AES-256-GCM, unique nonce per write   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Security
//!
//! - The bundle is encrypted at rest; the key never touches disk and is
//!   re-derived from the passphrase on every store operation
//! - Each encryption uses a fresh random nonce (never reused)
//! - Authenticated encryption: tampering and wrong passphrases are detected
//! - The Keychain backend relies on the OS store's own encryption instead

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub mod encryption;
#[cfg(target_os = "macos")]
mod keychain;
pub mod store;

pub use store::{default_store, FileStore, MemoryStore, TokenStore, PASSPHRASE_ENV};

/// OAuth token state as returned by the provider's token endpoint.
///
/// All fields are required in the persisted form except `expiry`, whose
/// absence means "unknown or never expires".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenState {
    /// Short-lived bearer token used to authorize requests
    pub access_token: String,

    /// Token scheme, in practice always "Bearer"
    pub token_type: String,

    /// Long-lived token used to mint new access tokens
    pub refresh_token: String,

    /// When the access token expires (UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl TokenState {
    /// Whether the access token is expired (or expires within `skew`).
    ///
    /// A token with no recorded expiry is treated as non-expiring.
    pub fn is_expired(&self, skew: Duration) -> bool {
        match self.expiry {
            Some(expiry) => expiry <= Utc::now() + skew,
            None => false,
        }
    }
}

/// The persisted credential: client identity plus current token state.
///
/// A bundle is either wholly present in the store or absent; a store entry
/// that decodes to anything less is a [`StoreError::MalformedBundle`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredentialBundle {
    /// OAuth client id issued by the credential provider
    pub client_id: String,

    /// OAuth client secret paired with the id
    pub client_secret: String,

    /// Current token state, replaced on refresh
    pub token: TokenState,
}

impl CredentialBundle {
    /// Decode a bundle from its stored byte form.
    ///
    /// Missing required fields are an error, never defaulted: a partially
    /// populated bundle would silently strip authorization capability.
    pub fn from_bytes(data: &[u8]) -> Result<Self, StoreError> {
        serde_json::from_slice(data).map_err(|e| StoreError::MalformedBundle(e.to_string()))
    }

    /// Encode the bundle to the byte form handed to a [`TokenStore`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(self).map_err(|e| StoreError::MalformedBundle(e.to_string()))
    }
}

/// Credential store and codec errors
#[derive(Debug, PartialEq, Clone)]
pub enum StoreError {
    /// The passphrase environment variable is not set
    PassphraseMissing,
    /// No credential has been stored at the given location
    NotFound(String),
    /// Ciphertext blob too short to contain a nonce
    MalformedInput,
    /// Authentication tag did not verify (wrong passphrase, corruption, or tampering)
    IntegrityFailure,
    /// Stored bundle is not a complete, well-formed credential
    MalformedBundle(String),
    /// Backend I/O or OS secure-store failure
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::PassphraseMissing => write!(
                f,
                "no ${} set; export the passphrase before reading or writing tokens",
                PASSPHRASE_ENV
            ),
            StoreError::NotFound(location) => write!(
                f,
                "no stored credential at {}; run `bootkit token` first",
                location
            ),
            StoreError::MalformedInput => write!(f, "encrypted token blob is truncated"),
            StoreError::IntegrityFailure => write!(
                f,
                "can't decrypt tokens: wrong passphrase or corrupted store"
            ),
            StoreError::MalformedBundle(e) => write!(f, "stored credential is malformed: {}", e),
            StoreError::Unavailable(e) => write!(f, "credential store unavailable: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}
