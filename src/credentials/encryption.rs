//! AES-256-GCM encryption for the credential bundle.
//!
//! The symmetric key is derived from an operator passphrase with
//! HMAC-SHA-512/256 under a fixed purpose tag, so the same passphrase always
//! yields the same key and keys derived for other purposes can never
//! collide with this one. The ciphertext blob is self-contained:
//! `nonce | ciphertext | tag` where `|` is concatenation.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use hmac::{Hmac, Mac};
use sha2::Sha512_256;

use super::StoreError;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
pub const NONCE_SIZE: usize = 12;

/// Purpose tag keying the derivation HMAC.
const KEY_DERIVATION_TAG: &[u8] = b"passphrase";

/// Derives the 32-byte encryption key from the operator passphrase.
///
/// Deterministic and one-way: decryption must be able to reproduce the
/// exact key the original encryption used. The key is never persisted.
pub fn derive_key(passphrase: &str) -> [u8; KEY_SIZE] {
    let mut mac = <Hmac<Sha512_256> as Mac>::new_from_slice(KEY_DERIVATION_TAG)
        .expect("HMAC accepts any key length");
    mac.update(passphrase.as_bytes());

    // SHA-512/256 yields exactly 32 bytes.
    let digest = mac.finalize().into_bytes();
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&digest);
    key
}

/// Encrypts plaintext using AES-256-GCM with a random nonce.
///
/// # Returns
/// * `Ok(blob)` - `nonce | ciphertext | tag`, ready for a store backend
/// * `Err` - If the cipher cannot be constructed or sealing fails
///
/// # Security
/// - Uses a cryptographically secure random nonce (never reuse)
/// - Authenticated encryption (tampering detected on decrypt)
pub fn encrypt(plaintext: &[u8], key: &[u8; KEY_SIZE]) -> Result<Vec<u8>, StoreError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| StoreError::Unavailable(format!("can't create cipher: {}", e)))?;

    // Generate random nonce (never reuse!)
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| StoreError::Unavailable("encryption failed".to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypts a `nonce | ciphertext | tag` blob using AES-256-GCM.
///
/// # Returns
/// * `Ok(plaintext)` - The full original plaintext
/// * `Err(MalformedInput)` - Blob shorter than the nonce
/// * `Err(IntegrityFailure)` - Tag verification failed: wrong key,
///   corrupted data, or tampering. No partial plaintext is ever returned.
pub fn decrypt(blob: &[u8], key: &[u8; KEY_SIZE]) -> Result<Vec<u8>, StoreError> {
    if blob.len() < NONCE_SIZE {
        return Err(StoreError::MalformedInput);
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| StoreError::Unavailable(format!("can't create cipher: {}", e)))?;

    let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| StoreError::IntegrityFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        assert_eq!(derive_key("correct-horse"), derive_key("correct-horse"));
    }

    #[test]
    fn test_derive_key_distinct_passphrases() {
        assert_ne!(derive_key("correct-horse"), derive_key("wrong"));
        assert_ne!(derive_key(""), derive_key("x"));
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = derive_key("correct-horse");
        let plaintext = b"my-secret-access-token-12345";

        let blob = encrypt(plaintext, &key).expect("encryption failed");
        assert_ne!(&blob[NONCE_SIZE..], plaintext.as_slice());

        let decrypted = decrypt(&blob, &key).expect("decryption failed");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let key = derive_key("k");
        let blob = encrypt(b"", &key).unwrap();
        assert_eq!(decrypt(&blob, &key).unwrap(), b"");
    }

    #[test]
    fn test_nonce_uniqueness() {
        let key = derive_key("same-key");
        let plaintext = b"same-plaintext";

        let blob1 = encrypt(plaintext, &key).unwrap();
        let blob2 = encrypt(plaintext, &key).unwrap();

        // Nonces differ, so whole blobs differ
        assert_ne!(blob1[..NONCE_SIZE], blob2[..NONCE_SIZE]);
        assert_ne!(blob1, blob2);

        assert_eq!(decrypt(&blob1, &key).unwrap(), plaintext);
        assert_eq!(decrypt(&blob2, &key).unwrap(), plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = encrypt(b"secret", &derive_key("correct-horse")).unwrap();
        let err = decrypt(&blob, &derive_key("wrong")).unwrap_err();
        assert_eq!(err, StoreError::IntegrityFailure);
    }

    #[test]
    fn test_single_bit_flips_detected() {
        let key = derive_key("k");
        let blob = encrypt(b"secret payload", &key).unwrap();

        // Flip one bit in every byte of the ciphertext and tag regions
        for i in NONCE_SIZE..blob.len() {
            let mut tampered = blob.clone();
            tampered[i] ^= 0x01;
            assert_eq!(
                decrypt(&tampered, &key).unwrap_err(),
                StoreError::IntegrityFailure,
                "bit flip at byte {} went undetected",
                i
            );
        }
    }

    #[test]
    fn test_tampered_nonce_fails() {
        let key = derive_key("k");
        let mut blob = encrypt(b"secret", &key).unwrap();
        blob[0] ^= 0xff;
        assert_eq!(decrypt(&blob, &key).unwrap_err(), StoreError::IntegrityFailure);
    }

    #[test]
    fn test_truncated_blob_is_malformed() {
        let key = derive_key("k");
        assert_eq!(decrypt(&[], &key).unwrap_err(), StoreError::MalformedInput);
        assert_eq!(
            decrypt(&[0u8; NONCE_SIZE - 1], &key).unwrap_err(),
            StoreError::MalformedInput
        );
    }

    #[test]
    fn test_nonce_only_blob_fails_verification() {
        // Exactly a nonce and nothing else: structurally parseable but
        // cannot carry a valid tag.
        let key = derive_key("k");
        assert_eq!(
            decrypt(&[0u8; NONCE_SIZE], &key).unwrap_err(),
            StoreError::IntegrityFailure
        );
    }
}
