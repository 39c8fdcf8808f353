use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::constants::{KDF_CONTEXT_PASSWORD_CHECK, NONCE_SIZE, SYMMETRIC_KEY_SIZE};
use crate::error::CryptoError;

pub type SymmetricKey = [u8; SYMMETRIC_KEY_SIZE];

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

// Returns nonce || ciphertext (24 bytes nonce prepended)
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

pub fn decrypt(key: &SymmetricKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Encrypt a note body for storage at rest.
pub fn encrypt_text(key: &SymmetricKey, text: &str) -> Result<Vec<u8>, CryptoError> {
    encrypt(key, text.as_bytes())
}

pub fn decrypt_text(key: &SymmetricKey, data: &[u8]) -> Result<String, CryptoError> {
    let plaintext = decrypt(key, data)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
}

/// Deterministic verifier proving knowledge of `data_secret` for an account.
///
/// Stored in the local settings row at first unlock and recomputed on every
/// later unlock; the secret itself is never persisted.
pub fn password_check(data_secret: &SymmetricKey, user_hash: &str) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new_keyed(data_secret);
    hasher.update(KDF_CONTEXT_PASSWORD_CHECK.as_bytes());
    hasher.update(user_hash.as_bytes());
    hasher.finalize().as_bytes().to_vec()
}

pub fn verify_password_check(data_secret: &SymmetricKey, user_hash: &str, stored: &[u8]) -> bool {
    let expected = password_check(data_secret, user_hash);
    expected.len() == stored.len() && expected.ct_eq(stored).unwrap_u8() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SymmetricKey {
        [byte; 32]
    }

    #[test]
    fn test_text_roundtrip() {
        let key = key(7);
        let note = "# groceries\n- eggs\n- flour, more than one block of text for sure";

        let encrypted = encrypt_text(&key, note).unwrap();
        assert_eq!(decrypt_text(&key, &encrypted).unwrap(), note);
    }

    #[test]
    fn test_empty_text_roundtrip() {
        let key = key(1);
        let encrypted = encrypt_text(&key, "").unwrap();
        assert_eq!(decrypt_text(&key, &encrypted).unwrap(), "");
    }

    #[test]
    fn test_same_text_different_ciphertext() {
        let key = key(3);
        let a = encrypt_text(&key, "hello").unwrap();
        let b = encrypt_text(&key, "hello").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = encrypt(&key(1), b"Secret note").unwrap();
        assert!(decrypt(&key(2), &encrypted).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = key(9);
        let mut encrypted = encrypt(&key, b"Important data").unwrap();
        let len = encrypted.len();
        encrypted[len - 1] ^= 0xFF;

        assert!(decrypt(&key, &encrypted).is_err());
    }

    #[test]
    fn test_truncated_data_fails() {
        assert!(decrypt(&key(4), &[0u8; 10]).is_err());
    }

    #[test]
    fn test_password_check_deterministic() {
        let a = password_check(&key(5), "abc123");
        let b = password_check(&key(5), "abc123");
        assert_eq!(a, b);
        assert!(verify_password_check(&key(5), "abc123", &a));
    }

    #[test]
    fn test_password_check_rejects_other_key() {
        let stored = password_check(&key(5), "abc123");
        assert!(!verify_password_check(&key(6), "abc123", &stored));
        assert!(!verify_password_check(&key(5), "abc124", &stored));
        assert!(!verify_password_check(&key(5), "abc123", &stored[..16]));
    }
}
