//! # nervos-client
//!
//! Device side of Nervos note sync: unlocks the local encrypted store,
//! exposes note operations, and keeps the store in step with the sync
//! server through two supervised background tasks (the sync loop and the
//! debounced writer).

pub mod client;
pub mod config;
pub mod error;
pub mod notes;
pub mod session;
pub mod state;
pub mod sync;
pub mod tasks;
pub mod writer;

use tracing_subscriber::{fmt, EnvFilter};

pub use client::Client;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use notes::{note_updated_at, search_items};
pub use state::{Context, Phase};
pub use sync::{merge_remote, SyncClient, SyncStats};

/// Install a `tracing` subscriber for hosts that don't bring their own.
/// Respects `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("nervos_client=debug,nervos_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
