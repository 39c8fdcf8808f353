//! Note operations on an unlocked context.

use chrono::{DateTime, Utc};
use tracing::debug;

use nervos_shared::revision::{id_time, next_id};
use nervos_shared::Item;

use crate::error::{ClientError, Result};
use crate::state::Context;

impl Context {
    /// Mint a new empty note and persist it right away, so the id is
    /// reserved even if nothing is ever typed into it.
    pub fn create_note(&self) -> Result<Item> {
        let keys = self.keys()?;
        let item = Item::new(next_id());

        let mut state = self.state()?;
        self.db()?.save_item(keys.data_secret(), &item)?;
        state.items.insert(item.id, item.clone());

        debug!(id = item.id, "Created note");
        Ok(item)
    }

    /// Replace the text of a note under a fresh revision.
    ///
    /// Returns `None` when the text is unchanged. The returned item still has
    /// to be persisted (see [`crate::writer`]).
    pub fn edit_note(&self, id: i64, text: &str) -> Result<Option<Item>> {
        let mut state = self.state()?;
        if state.keys.is_none() {
            return Err(ClientError::Locked);
        }
        let item = state
            .items
            .get_mut(&id)
            .ok_or(ClientError::UnknownNote(id))?;

        if item.data == text {
            return Ok(None);
        }
        item.rev = next_id();
        item.data = text.to_string();
        Ok(Some(item.clone()))
    }

    pub fn note(&self, id: i64) -> Result<Option<Item>> {
        Ok(self.state()?.items.get(&id).cloned())
    }

    /// Notes matching `query`, most recently edited first.
    pub fn search(&self, query: &str) -> Result<Vec<Item>> {
        let state = self.state()?;
        Ok(search_items(state.items.values(), query))
    }
}

/// Case-insensitive substring match on the text, or exact match on the
/// decimal id. An empty query matches everything.
pub fn search_items<'a>(items: impl IntoIterator<Item = &'a Item>, query: &str) -> Vec<Item> {
    let query = query.to_lowercase();
    let mut results: Vec<Item> = items
        .into_iter()
        .filter(|item| {
            query.is_empty()
                || item.id.to_string() == query
                || item.data.to_lowercase().contains(&query)
        })
        .cloned()
        .collect();
    results.sort_by(|a, b| b.rev.cmp(&a.rev));
    results
}

/// Wall-clock time of the note's last edit.
pub fn note_updated_at(item: &Item) -> DateTime<Utc> {
    id_time(item.rev)
}
