//! File-backend integration tests.
//!
//! Tests that touch the process-wide passphrase variable serialize on a
//! shared lock so they never mutate it concurrently.

use bootkit::credentials::{
    CredentialBundle, FileStore, StoreError, TokenState, TokenStore, PASSPHRASE_ENV,
};
use chrono::{Duration, Utc};
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn sample_bundle() -> CredentialBundle {
    CredentialBundle {
        client_id: "abc".to_string(),
        client_secret: "s3cr3t".to_string(),
        token: TokenState {
            access_token: "A1".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: "R1".to_string(),
            expiry: Some(Utc::now() - Duration::hours(1)),
        },
    }
}

#[test]
fn file_store_missing_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("never-written").join("auth.enc"));

    match store.read() {
        Err(StoreError::NotFound(location)) => assert!(location.contains("auth.enc")),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn file_store_passphrase_scenarios() {
    let _guard = ENV_LOCK.lock().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bootkit").join("auth.enc");
    let store = FileStore::new(path.clone());
    let bundle = sample_bundle();
    let bytes = bundle.to_bytes().unwrap();

    // Without a passphrase nothing can be written
    std::env::remove_var(PASSPHRASE_ENV);
    assert_eq!(
        store.write(&bytes).unwrap_err(),
        StoreError::PassphraseMissing
    );

    // Write then read back with the same passphrase
    std::env::set_var(PASSPHRASE_ENV, "correct-horse");
    store.write(&bytes).unwrap();
    let decoded = CredentialBundle::from_bytes(&store.read().unwrap()).unwrap();
    assert_eq!(decoded, bundle);

    // No leftover temporary file after the atomic rename
    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(leftovers, vec!["auth.enc".to_string()]);

    // On-disk blob is opaque: nonce + ciphertext + tag, no plaintext
    let raw = std::fs::read(&path).unwrap();
    assert!(raw.len() > 12 + 16);
    let raw_text = String::from_utf8_lossy(&raw);
    assert!(!raw_text.contains("s3cr3t"));
    assert!(!raw_text.contains("client_id"));

    // Wrong passphrase fails verification, returns no plaintext
    std::env::set_var(PASSPHRASE_ENV, "wrong");
    assert_eq!(store.read().unwrap_err(), StoreError::IntegrityFailure);

    // Tampered ciphertext fails verification
    std::env::set_var(PASSPHRASE_ENV, "correct-horse");
    let mut tampered = raw.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;
    std::fs::write(&path, &tampered).unwrap();
    assert_eq!(store.read().unwrap_err(), StoreError::IntegrityFailure);

    // Truncated below the nonce size is malformed, not an integrity error
    std::fs::write(&path, &raw[..4]).unwrap();
    assert_eq!(store.read().unwrap_err(), StoreError::MalformedInput);

    // Overwrite replaces the previous entry entirely
    std::fs::write(&path, &raw).unwrap();
    let mut replacement = bundle.clone();
    replacement.token.access_token = "A2".to_string();
    store.write(&replacement.to_bytes().unwrap()).unwrap();
    let decoded = CredentialBundle::from_bytes(&store.read().unwrap()).unwrap();
    assert_eq!(decoded.token.access_token, "A2");

    // Reading without a passphrase fails even though the file exists
    std::env::remove_var(PASSPHRASE_ENV);
    assert_eq!(store.read().unwrap_err(), StoreError::PassphraseMissing);
}

#[cfg(unix)]
#[test]
fn file_store_permissions_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let _guard = ENV_LOCK.lock().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg").join("auth.enc");
    let store = FileStore::new(path.clone());

    std::env::set_var(PASSPHRASE_ENV, "correct-horse");
    store.write(&sample_bundle().to_bytes().unwrap()).unwrap();
    std::env::remove_var(PASSPHRASE_ENV);

    let dir_mode = std::fs::metadata(path.parent().unwrap())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(dir_mode & 0o777, 0o700);

    let file_mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(file_mode & 0o777, 0o600);
}
