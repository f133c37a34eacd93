//! Credential store backends.
//!
//! A [`TokenStore`] persists the opaque bundle bytes and hands them back on
//! the next invocation. The file backend encrypts with the passphrase-derived
//! key before touching disk; the macOS Keychain backend stores raw bytes and
//! relies on the OS store's own encryption. [`default_store`] picks the
//! platform-appropriate backend once at startup.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{encryption, StoreError};

/// Environment variable holding the store passphrase.
///
/// Read at the moment of each encryption or decryption, never cached.
pub const PASSPHRASE_ENV: &str = "BOOTKIT_PASSPHRASE";

/// Persistence capability for the serialized credential bundle.
///
/// Backends own their at-rest representation; callers only ever see the
/// decrypted bundle bytes.
pub trait TokenStore: Send + Sync {
    /// Retrieve the stored bundle bytes.
    fn read(&self) -> Result<Vec<u8>, StoreError>;

    /// Persist the bundle bytes, replacing any previous entry.
    fn write(&self, data: &[u8]) -> Result<(), StoreError>;
}

/// Encrypted single-file backend.
///
/// The blob lives at a fixed path under the per-user configuration
/// directory with owner-only permissions. Writes go to a sibling temporary
/// file which is then renamed over the target, so a crash mid-write never
/// leaves a truncated store behind.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The fixed per-user store location: `<config_dir>/bootkit/auth.enc`.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dir = dirs::config_dir()
            .ok_or_else(|| StoreError::Unavailable("no per-user config directory".to_string()))?;
        Ok(dir.join("bootkit").join("auth.enc"))
    }

    fn passphrase() -> Result<String, StoreError> {
        std::env::var(PASSPHRASE_ENV).map_err(|_| StoreError::PassphraseMissing)
    }
}

impl TokenStore for FileStore {
    fn read(&self) -> Result<Vec<u8>, StoreError> {
        let blob = match std::fs::read(&self.path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.path.display().to_string()));
            }
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "can't read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let key = encryption::derive_key(&Self::passphrase()?);
        encryption::decrypt(&blob, &key)
    }

    fn write(&self, data: &[u8]) -> Result<(), StoreError> {
        let key = encryption::derive_key(&Self::passphrase()?);
        let blob = encryption::encrypt(data, &key)?;

        let dir = self.path.parent().ok_or_else(|| {
            StoreError::Unavailable(format!("store path {} has no parent", self.path.display()))
        })?;
        let file_name = self.path.file_name().ok_or_else(|| {
            StoreError::Unavailable(format!("store path {} has no file name", self.path.display()))
        })?;

        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(dir)
            .map_err(|e| StoreError::Unavailable(format!("can't make dir {}: {}", dir.display(), e)))?;

        // Write beside the target, then atomically rename over it.
        let tmp = dir.join(format!("{}.tmp", file_name.to_string_lossy()));
        {
            let mut options = std::fs::OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let mut fd = options.open(&tmp).map_err(|e| {
                StoreError::Unavailable(format!("can't open token store {}: {}", tmp.display(), e))
            })?;
            fd.write_all(&blob).map_err(|e| {
                StoreError::Unavailable(format!("can't write tokens to {}: {}", tmp.display(), e))
            })?;
        }
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            StoreError::Unavailable(format!(
                "can't move {} into place: {}",
                tmp.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), bytes = blob.len(), "token store written");
        Ok(())
    }
}

/// In-process backend used by tests.
///
/// Clones share the same underlying slot, so a test can hand one clone to a
/// lifecycle and inspect the other afterwards.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryStore {
    fn read(&self) -> Result<Vec<u8>, StoreError> {
        let slot = self
            .data
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        slot.clone()
            .ok_or_else(|| StoreError::NotFound("in-memory store".to_string()))
    }

    fn write(&self, data: &[u8]) -> Result<(), StoreError> {
        let mut slot = self
            .data
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        *slot = Some(data.to_vec());
        Ok(())
    }
}

/// Create the platform-appropriate store backend.
///
/// - **macOS**: Keychain Services generic password
/// - **Other platforms**: encrypted file under the user config directory
pub fn default_store() -> Result<Box<dyn TokenStore>, StoreError> {
    #[cfg(target_os = "macos")]
    {
        Ok(Box::new(super::keychain::KeychainStore::for_current_user()?))
    }

    #[cfg(not(target_os = "macos"))]
    {
        Ok(Box::new(FileStore::new(FileStore::default_path()?)))
    }
}
