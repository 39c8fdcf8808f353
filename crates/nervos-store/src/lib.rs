//! # nervos-store
//!
//! On-device storage for nervos, backed by SQLite.
//!
//! Two tables: a singleton `settings` row (schema version, username, password
//! verifier, last sync checkpoint) and `items`, keyed by item id. Item
//! payloads are encrypted with the account's data secret before they are
//! written and decrypted after they are read; the rest of the row is plain.
//!
//! The crate exposes a synchronous `Database` handle around a single
//! `rusqlite::Connection`, which serializes all access.

pub mod database;
pub mod items;
pub mod migrations;
pub mod models;
pub mod settings;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
