//! # nervos-server
//!
//! Chunked log server for Nervos note sync.
//!
//! Each account owns an append-only log of items stored as bounded
//! chunks in an object store. A single `POST /` both uploads a device's
//! pending changes and returns everything after the device's checkpoint.
//!
//! Item payloads are stored as received, in plaintext. The only secret the
//! server keeps is a bcrypt hash of each account's passkey.

pub mod api;
pub mod chunk_log;
pub mod config;
pub mod error;
pub mod locks;
pub mod object_store;

pub use api::{build_router, serve, serve_listener, AppState};
pub use chunk_log::{ChunkLog, SyncRequest, SyncResponse};
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use object_store::{FsObjectStore, MemoryObjectStore, ObjectStore};
