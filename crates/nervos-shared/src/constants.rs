/// Application name
pub const APP_NAME: &str = "nervos";

/// Wire/object format version prefixed to every encoded item batch
pub const WIRE_VERSION: u8 = 1;

/// Content type of sync request and response bodies
pub const ITEMS_CONTENT_TYPE: &str = "application/x-nervos-items";

/// Sync request/response headers
pub const HEADER_USER_HASH: &str = "userhash";
pub const HEADER_PASS_KEY: &str = "passkey";
pub const HEADER_CHECKPOINT: &str = "checkpoint";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Symmetric key size in bytes (auth and data secrets)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// PBKDF2-HMAC-SHA256 rounds for both derived secrets
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt prefixes; the hex user hash is appended
pub const AUTH_SALT_PREFIX: &str = "auth:";
pub const DATA_SALT_PREFIX: &str = "data:";

/// Key derivation context for the local password verifier (BLAKE3)
pub const KDF_CONTEXT_PASSWORD_CHECK: &str = "nervos-password-check-v1";

/// Milliseconds since the Unix epoch of 2010-01-01T00:00:00Z
pub const REVISION_EPOCH_MS: i64 = 1_262_304_000_000;

/// Low bits of a revision holding the per-millisecond sequence
pub const REVISION_SEQ_BITS: u32 = 12;

/// Items per server chunk before rollover
pub const DEFAULT_CHUNK_CAPACITY: usize = 500;

/// Longest accepted account identifier
pub const MAX_USER_HASH_LEN: usize = 128;

/// Default HTTP port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8000;
