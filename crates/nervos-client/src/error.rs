use thiserror::Error;

use nervos_shared::ProtocolError;
use nervos_store::StoreError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status {0}")]
    Status(u16),

    #[error("Invalid server response: {0}")]
    BadResponse(String),

    #[error("Wrong password")]
    WrongPassword,

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Locked")]
    Locked,

    #[error("Unknown note {0}")]
    UnknownNote(i64),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Background task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
