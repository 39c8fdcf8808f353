//! Types and primitives shared by the nervos client, store and server:
//! account key derivation, payload encryption, the revision clock and the
//! item wire format.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod protocol;
pub mod revision;
pub mod types;

pub use error::{CryptoError, ProtocolError};
pub use keys::AccountKeys;
pub use types::{Item, Rev, UserHash};
