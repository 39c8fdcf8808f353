//! Sync client: upload local changes, merge remote ones, advance the
//! checkpoint.

use std::collections::{HashMap, HashSet};

use reqwest::header::CONTENT_TYPE;
use tracing::{info, warn};

use nervos_shared::constants::{
    HEADER_CHECKPOINT, HEADER_PASS_KEY, HEADER_USER_HASH, ITEMS_CONTENT_TYPE,
};
use nervos_shared::protocol::{decode_items, encode_items};
use nervos_shared::{AccountKeys, Item, Rev};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::state::Context;

/// HTTP transport for the sync endpoint.
#[derive(Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    url: String,
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub uploaded: usize,
    pub downloaded: usize,
    pub adopted: usize,
    pub checkpoint: Rev,
}

impl SyncClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            url: format!("{}/", config.server_url.trim_end_matches('/')),
        })
    }

    /// One request/response round trip. Any non-200 status is an error.
    pub async fn exchange(
        &self,
        keys: &AccountKeys,
        checkpoint: Rev,
        changes: &[Item],
    ) -> Result<(Vec<Item>, Rev)> {
        let body = encode_items(changes)?;

        let response = self
            .http
            .post(&self.url)
            .header(HEADER_USER_HASH, keys.user_hash().as_str())
            .header(HEADER_PASS_KEY, keys.auth_secret_hex())
            .header(HEADER_CHECKPOINT, checkpoint.to_string())
            .header(CONTENT_TYPE, ITEMS_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        let checkpoint = response
            .headers()
            .get(HEADER_CHECKPOINT)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<Rev>().ok())
            .ok_or_else(|| ClientError::BadResponse("missing or invalid checkpoint".into()))?;

        let bytes = response.bytes().await?;
        let items = decode_items(&bytes)?;
        Ok((items, checkpoint))
    }
}

/// Remote items that win against the local map: unknown ids, or a strictly
/// greater revision. Ties and older revisions keep the local state.
///
/// Duplicates within `remote` are resolved the same way, so at most one
/// item per id is returned.
pub fn merge_remote(local: &HashMap<i64, Item>, remote: Vec<Item>) -> Vec<Item> {
    let mut winners: HashMap<i64, Item> = HashMap::new();
    for item in remote {
        let current = winners.get(&item.id).or_else(|| local.get(&item.id));
        if current.map_or(true, |current| current.is_superseded_by(&item)) {
            winners.insert(item.id, item);
        }
    }
    winners.into_values().collect()
}

/// Upper bound on exchanges in one cycle. A device that is several chunks
/// behind receives one chunk per exchange.
pub const MAX_ROUNDS_PER_CYCLE: usize = 16;

/// Run one sync cycle: exchange with the server until a response brings
/// nothing new, or [`MAX_ROUNDS_PER_CYCLE`] is reached.
///
/// Each exchange commits on its own. A failed exchange merges nothing and
/// leaves the checkpoint where the previous one put it.
pub async fn sync_once(ctx: &Context, client: &SyncClient) -> Result<SyncStats> {
    let keys = ctx.keys()?;
    // (id, rev) pairs the server already holds, as far as this cycle knows.
    let mut known: HashSet<(i64, Rev)> = HashSet::new();
    let mut stats = SyncStats {
        uploaded: 0,
        downloaded: 0,
        adopted: 0,
        checkpoint: ctx.settings()?.last_sync,
    };

    for _ in 0..MAX_ROUNDS_PER_CYCLE {
        let (checkpoint, changes) = pending_changes(ctx, &known)?;
        let (remote, new_checkpoint) = client.exchange(&keys, checkpoint, &changes).await?;

        known.extend(changes.iter().map(|item| (item.id, item.rev)));
        known.extend(remote.iter().map(|item| (item.id, item.rev)));
        let downloaded = remote.len();
        let adopted = apply_remote(ctx, &keys, remote, new_checkpoint)?;

        stats.uploaded += changes.len();
        stats.downloaded += downloaded;
        stats.adopted += adopted;
        stats.checkpoint = new_checkpoint;

        if downloaded == 0 || new_checkpoint <= checkpoint {
            break;
        }
    }

    info!(
        uploaded = stats.uploaded,
        downloaded = stats.downloaded,
        adopted = stats.adopted,
        checkpoint = stats.checkpoint,
        "Synced"
    );
    Ok(stats)
}

/// Current checkpoint and the local items newer than it, oldest first.
fn pending_changes(ctx: &Context, known: &HashSet<(i64, Rev)>) -> Result<(Rev, Vec<Item>)> {
    let state = ctx.state()?;
    let checkpoint = state.settings.last_sync;
    let mut changes: Vec<Item> = state
        .items
        .values()
        .filter(|item| item.rev > checkpoint && !known.contains(&(item.id, item.rev)))
        .cloned()
        .collect();
    changes.sort_by_key(|item| item.rev);
    Ok((checkpoint, changes))
}

/// Merge one response into memory and the store, then advance the
/// checkpoint. Returns how many remote items were adopted.
fn apply_remote(ctx: &Context, keys: &AccountKeys, remote: Vec<Item>, checkpoint: Rev) -> Result<usize> {
    let mut state = ctx.state()?;
    if state.keys.is_none() {
        // Locked while the request was in flight.
        return Err(ClientError::Locked);
    }
    let adopted = merge_remote(&state.items, remote);

    let db = ctx.db()?;
    for item in &adopted {
        db.save_item(keys.data_secret(), item)?;
    }
    let mut settings = state.settings.clone();
    settings.last_sync = checkpoint;
    db.save_settings(&settings)?;
    drop(db);

    state.settings = settings;
    let count = adopted.len();
    for item in adopted {
        state.items.insert(item.id, item);
    }
    Ok(count)
}

/// Sync every `sync_interval` while unlocked; poll every `locked_poll`
/// while locked. Failures are logged and retried on the next cycle.
pub async fn run_sync_loop(ctx: Context, client: SyncClient, config: ClientConfig) {
    loop {
        if !ctx.is_unlocked() {
            tokio::time::sleep(config.locked_poll).await;
            continue;
        }

        if let Err(e) = sync_once(&ctx, &client).await {
            warn!(error = %e, "Sync failed");
        }
        tokio::time::sleep(config.sync_interval).await;
    }
}
