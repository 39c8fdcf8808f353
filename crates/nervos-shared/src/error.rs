use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Empty payload")]
    Empty,

    #[error("Unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Invalid account identifier")]
    InvalidUserHash,
}
