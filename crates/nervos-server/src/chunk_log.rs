//! Per-account append-only item log, split into bounded chunks.
//!
//! Object layout:
//! - `{user_hash}/_meta`: [`Metadata`] (passkey hash + chunk boundaries)
//! - `{user_hash}/{n}`:   encoded `Vec<Item>` for chunk `n`
//!
//! `chunks[0]` is always `0`; `chunks[n]` (n > 0) is the revision of the last
//! item appended to chunk `n - 1` when it filled up.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use nervos_shared::protocol::{decode_items, encode_items, from_versioned_bytes, to_versioned_bytes};
use nervos_shared::{Item, Rev, UserHash};

use crate::error::{Result, ServerError};
use crate::locks::AccountLocks;
use crate::object_store::ObjectStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub user_hash: String,
    /// bcrypt hash of the hex-encoded passkey.
    pub pass_hash: String,
    /// Ascending chunk boundaries, starting with `[0]`.
    pub chunks: Vec<Rev>,
}

#[derive(Debug)]
pub struct SyncRequest {
    pub user_hash: UserHash,
    pub pass_key: Vec<u8>,
    pub checkpoint: Rev,
    pub changes: Vec<Item>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SyncResponse {
    pub items: Vec<Item>,
    pub checkpoint: Rev,
}

pub struct ChunkLog {
    store: Arc<dyn ObjectStore>,
    locks: AccountLocks,
    chunk_capacity: usize,
    bcrypt_cost: u32,
}

impl ChunkLog {
    pub fn new(store: Arc<dyn ObjectStore>, chunk_capacity: usize, bcrypt_cost: u32) -> Self {
        Self {
            store,
            locks: AccountLocks::new(),
            chunk_capacity: chunk_capacity.max(1),
            bcrypt_cost,
        }
    }

    pub fn locks(&self) -> &AccountLocks {
        &self.locks
    }

    /// Authenticate, append the uploaded changes, and return what the caller
    /// has not seen yet. Runs under the account's lock; any failure aborts
    /// the whole request.
    pub async fn sync(&self, req: SyncRequest) -> Result<SyncResponse> {
        let user = req.user_hash;
        let _guard = self.locks.acquire(user.as_str()).await;

        let mut metadata = self.authenticate(&user, &req.pass_key).await?;

        let mut changes = req.changes;
        let uploaded = changes.len();
        changes.sort_by_key(|item| item.rev);
        if !changes.is_empty() {
            self.append(&user, &mut metadata, changes).await?;
        }

        let response = self.read_since(&user, &metadata, req.checkpoint).await?;

        info!(
            user = %user.short(),
            changes = uploaded,
            items = response.items.len(),
            checkpoint = response.checkpoint,
            "sync request"
        );
        Ok(response)
    }

    /// Load the account metadata, creating it (and trusting the presented
    /// passkey) on first contact.
    async fn authenticate(&self, user: &UserHash, pass_key: &[u8]) -> Result<Metadata> {
        let pass_key = hex::encode(pass_key);

        match self.load_metadata(user).await? {
            Some(metadata) => {
                let hash = metadata.pass_hash.clone();
                let valid = tokio::task::spawn_blocking(move || bcrypt::verify(pass_key, &hash))
                    .await
                    .map_err(|e| ServerError::Internal(format!("hash task failed: {e}")))?
                    .map_err(|e| ServerError::Internal(format!("bcrypt: {e}")))?;
                if !valid {
                    return Err(ServerError::Unauthorized);
                }
                Ok(metadata)
            }
            None => {
                let cost = self.bcrypt_cost;
                let pass_hash = tokio::task::spawn_blocking(move || bcrypt::hash(pass_key, cost))
                    .await
                    .map_err(|e| ServerError::Internal(format!("hash task failed: {e}")))?
                    .map_err(|e| ServerError::Internal(format!("bcrypt: {e}")))?;

                let metadata = Metadata {
                    user_hash: user.as_str().to_string(),
                    pass_hash,
                    chunks: vec![0],
                };
                self.save_metadata(user, &metadata).await?;
                info!(user = %user.short(), "registered new account");
                Ok(metadata)
            }
        }
    }

    /// Append a sorted batch to the last chunk. A chunk that reaches
    /// capacity closes after the write; batches are never split.
    async fn append(&self, user: &UserHash, metadata: &mut Metadata, changes: Vec<Item>) -> Result<()> {
        let index = metadata.chunks.len().saturating_sub(1);
        let mut chunk = self.load_chunk(user, index).await?;
        chunk.extend(changes);
        self.save_chunk(user, index, &chunk).await?;

        if chunk.len() >= self.chunk_capacity {
            if let Some(last) = chunk.last() {
                metadata.chunks.push(last.rev);
                self.save_metadata(user, metadata).await?;
                debug!(
                    user = %user.short(),
                    chunk = index,
                    boundary = last.rev,
                    "chunk rolled over"
                );
            }
        }
        Ok(())
    }

    /// Items newer than `checkpoint` from the single chunk that follows it.
    ///
    /// Starts at the chunk with the greatest boundary `<= checkpoint` and
    /// moves forward past chunks holding nothing newer, so a device that is
    /// several chunks behind pages through them oldest first.
    async fn read_since(&self, user: &UserHash, metadata: &Metadata, checkpoint: Rev) -> Result<SyncResponse> {
        let mut index = metadata
            .chunks
            .iter()
            .rposition(|&boundary| boundary <= checkpoint)
            .unwrap_or(0);

        loop {
            let items: Vec<Item> = self
                .load_chunk(user, index)
                .await?
                .into_iter()
                .filter(|item| item.rev > checkpoint)
                .collect();

            if !items.is_empty() || index + 1 >= metadata.chunks.len() {
                let checkpoint = items.last().map_or(checkpoint, |item| item.rev);
                return Ok(SyncResponse { items, checkpoint });
            }
            index += 1;
        }
    }

    pub(crate) async fn load_metadata(&self, user: &UserHash) -> Result<Option<Metadata>> {
        let key = meta_key(user);
        match self.store.get(&key).await? {
            Some(bytes) => {
                let metadata: Metadata =
                    from_versioned_bytes(&bytes).map_err(|e| ServerError::CorruptObject {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?;
                if metadata.chunks.is_empty() {
                    return Err(ServerError::CorruptObject {
                        key,
                        reason: "no chunk boundaries".into(),
                    });
                }
                Ok(Some(metadata))
            }
            None => Ok(None),
        }
    }

    async fn save_metadata(&self, user: &UserHash, metadata: &Metadata) -> Result<()> {
        let bytes = to_versioned_bytes(metadata).map_err(|e| ServerError::Internal(e.to_string()))?;
        self.store.put(&meta_key(user), &bytes).await
    }

    pub(crate) async fn load_chunk(&self, user: &UserHash, index: usize) -> Result<Vec<Item>> {
        let key = chunk_key(user, index);
        match self.store.get(&key).await? {
            Some(bytes) => {
                decode_items(&bytes).map_err(|e| ServerError::CorruptObject {
                    key,
                    reason: e.to_string(),
                })
            }
            None => Ok(Vec::new()),
        }
    }

    async fn save_chunk(&self, user: &UserHash, index: usize, items: &[Item]) -> Result<()> {
        let bytes = encode_items(items).map_err(|e| ServerError::Internal(e.to_string()))?;
        self.store.put(&chunk_key(user, index), &bytes).await
    }
}

fn meta_key(user: &UserHash) -> String {
    format!("{}/_meta", user.as_str())
}

fn chunk_key(user: &UserHash, index: usize) -> String {
    format!("{}/{}", user.as_str(), index)
}
