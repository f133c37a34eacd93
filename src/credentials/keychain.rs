//! macOS Keychain Services credential backend.
//!
//! Stores the bundle bytes as a generic password, so encryption at rest and
//! access control come from the OS rather than the passphrase scheme the
//! file backend uses.

use tracing::debug;

use super::store::TokenStore;
use super::StoreError;

/// Service identifier for the stored credential. Generic passwords key on
/// (service, account) only, so there is no separate access-group field.
const SERVICE_NAME: &str = "org.liqui.bootkit.tokens";

/// Token store backed by the macOS Keychain.
pub struct KeychainStore {
    service: String,
    account: String,
}

impl KeychainStore {
    /// Keys the entry by the current OS username.
    pub fn for_current_user() -> Result<Self, StoreError> {
        let account = std::env::var("USER")
            .map_err(|_| StoreError::Unavailable("can't resolve the current user name".to_string()))?;
        Ok(Self {
            service: SERVICE_NAME.to_string(),
            account,
        })
    }
}

impl TokenStore for KeychainStore {
    fn read(&self) -> Result<Vec<u8>, StoreError> {
        match security_framework::passwords::get_generic_password(&self.service, &self.account) {
            Ok(data) => Ok(data),
            Err(e) => {
                let err_str = format!("{:?}", e);
                // errSecItemNotFound
                if err_str.contains("errSecItemNotFound") || err_str.contains("-25300") {
                    Err(StoreError::NotFound(format!(
                        "keychain entry {},{}",
                        self.service, self.account
                    )))
                } else {
                    Err(StoreError::Unavailable(format!(
                        "can't read keychain {},{}: {}",
                        self.service, self.account, e
                    )))
                }
            }
        }
    }

    fn write(&self, data: &[u8]) -> Result<(), StoreError> {
        // set_generic_password replaces an existing entry for the same
        // (service, account) pair.
        security_framework::passwords::set_generic_password(&self.service, &self.account, data)
            .map_err(|e| {
                StoreError::Unavailable(format!(
                    "can't write keychain {},{}: {}",
                    self.service, self.account, e
                ))
            })?;
        debug!(service = %self.service, account = %self.account, "keychain entry written");
        Ok(())
    }
}
