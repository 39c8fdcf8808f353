use serde::{de::DeserializeOwned, Serialize};

use crate::constants::WIRE_VERSION;
use crate::error::ProtocolError;
use crate::types::Item;

/// Serialize to binary: one version byte followed by bincode.
///
/// Used for sync request/response bodies, chunk objects and server metadata,
/// so the format stays fixed across the wire and the object store.
pub fn to_versioned_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    let body = bincode::serialize(value)?;
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(WIRE_VERSION);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Deserialize from binary written by [`to_versioned_bytes`]
pub fn from_versioned_bytes<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProtocolError> {
    let (&version, body) = data.split_first().ok_or(ProtocolError::Empty)?;
    if version != WIRE_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }
    Ok(bincode::deserialize(body)?)
}

pub fn encode_items(items: &[Item]) -> Result<Vec<u8>, ProtocolError> {
    to_versioned_bytes(items)
}

/// An empty body is an empty batch.
pub fn decode_items(data: &[u8]) -> Result<Vec<Item>, ProtocolError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    from_versioned_bytes(data)
}
