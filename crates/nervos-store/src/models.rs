//! Domain model structs persisted in the local database.

pub use nervos_shared::types::{Item, Rev};

/// Schema version written into a freshly created settings row.
pub const SETTINGS_VERSION: i64 = 1;

/// Per-device account state (singleton row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub version: i64,
    /// Empty until the first login.
    pub username: String,
    /// Password verifier; empty until the first unlock.
    pub password_check: Vec<u8>,
    /// Checkpoint: every server item with `rev <= last_sync` has been received.
    pub last_sync: Rev,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            username: String::new(),
            password_check: Vec::new(),
            last_sync: 0,
        }
    }
}

/// Every readable item, plus the ids of rows whose payload did not decrypt.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadedItems {
    pub items: Vec<Item>,
    pub unreadable: Vec<i64>,
}
