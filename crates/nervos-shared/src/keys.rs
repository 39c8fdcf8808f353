use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use crate::constants::{AUTH_SALT_PREFIX, DATA_SALT_PREFIX, PBKDF2_ITERATIONS};
use crate::crypto::SymmetricKey;
use crate::types::UserHash;

/// Secrets derived from a username + password pair.
///
/// `auth_secret` is the only value that ever leaves the device (hex encoded in
/// the `passkey` header). `data_secret` encrypts payloads at rest and is
/// derived with a different salt so the server never learns it.
#[derive(Clone)]
pub struct AccountKeys {
    user_hash: UserHash,
    auth_secret: SymmetricKey,
    data_secret: SymmetricKey,
}

impl AccountKeys {
    /// Derive both secrets. This runs 2 x 100k PBKDF2 rounds; async callers
    /// should move it onto a blocking thread.
    pub fn derive(username: &str, password: Zeroizing<String>) -> Self {
        let user_hash = UserHash::from_username(username);

        let auth_salt = format!("{AUTH_SALT_PREFIX}{}", user_hash.as_str());
        let data_salt = format!("{DATA_SALT_PREFIX}{}", user_hash.as_str());

        let mut auth_secret = [0u8; 32];
        let mut data_secret = [0u8; 32];
        pbkdf2_hmac::<Sha256>(
            password.as_bytes(),
            auth_salt.as_bytes(),
            PBKDF2_ITERATIONS,
            &mut auth_secret,
        );
        pbkdf2_hmac::<Sha256>(
            password.as_bytes(),
            data_salt.as_bytes(),
            PBKDF2_ITERATIONS,
            &mut data_secret,
        );

        Self {
            user_hash,
            auth_secret,
            data_secret,
        }
    }

    /// Assemble from secrets derived elsewhere.
    pub fn from_secrets(user_hash: UserHash, auth_secret: SymmetricKey, data_secret: SymmetricKey) -> Self {
        Self {
            user_hash,
            auth_secret,
            data_secret,
        }
    }

    pub fn user_hash(&self) -> &UserHash {
        &self.user_hash
    }

    pub fn auth_secret(&self) -> &SymmetricKey {
        &self.auth_secret
    }

    pub fn data_secret(&self) -> &SymmetricKey {
        &self.data_secret
    }

    /// Value of the `passkey` header.
    pub fn auth_secret_hex(&self) -> String {
        hex::encode(self.auth_secret)
    }
}

impl Drop for AccountKeys {
    fn drop(&mut self) {
        self.auth_secret.zeroize();
        self.data_secret.zeroize();
    }
}

impl std::fmt::Debug for AccountKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKeys")
            .field("user_hash", &self.user_hash)
            .finish_non_exhaustive()
    }
}

/// Hex-encoded SHA-256 of the username.
pub fn hash_username(username: &str) -> String {
    hex::encode(Sha256::digest(username.as_bytes()))
}
