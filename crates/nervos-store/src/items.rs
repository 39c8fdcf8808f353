//! CRUD operations for [`Item`] records.
//!
//! Payloads are encrypted with the caller's data secret on the way in and
//! decrypted on the way out. The store never compares revisions: whatever
//! is passed to [`Database::save_item`] becomes the stored state.

use rusqlite::{params, OptionalExtension};
use tracing::warn;

use nervos_shared::crypto::{self, SymmetricKey};

use crate::database::Database;
use crate::error::Result;
use crate::models::{Item, LoadedItems};

impl Database {
    /// Every stored item, decrypted. Empty payloads (placeholders for notes
    /// that were created but never written) are returned as-is.
    ///
    /// A row that fails to decrypt is skipped and its id reported in
    /// [`LoadedItems::unreadable`]; the remaining rows still load.
    pub fn load_items(&self, key: &SymmetricKey) -> Result<LoadedItems> {
        let mut stmt = self.conn().prepare("SELECT id, rev, data FROM items")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut loaded = LoadedItems::default();
        for row in rows {
            let (id, rev, data) = row?;
            match crypto::decrypt_text(key, &data) {
                Ok(data) => loaded.items.push(Item { id, rev, data }),
                Err(e) => {
                    warn!(id, error = %e, "Skipping unreadable item");
                    loaded.unreadable.push(id);
                }
            }
        }
        Ok(loaded)
    }

    pub fn get_item(&self, key: &SymmetricKey, id: i64) -> Result<Option<Item>> {
        let row = self
            .conn()
            .query_row(
                "SELECT rev, data FROM items WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)),
            )
            .optional()?;

        match row {
            Some((rev, data)) => Ok(Some(Item {
                id,
                rev,
                data: crypto::decrypt_text(key, &data)?,
            })),
            None => Ok(None),
        }
    }

    /// Upsert by id. An existing row takes the new revision and payload.
    pub fn save_item(&self, key: &SymmetricKey, item: &Item) -> Result<()> {
        let data = crypto::encrypt_text(key, &item.data)?;
        self.conn().execute(
            "INSERT INTO items (id, rev, data) VALUES (?1, ?2, ?3)
             ON CONFLICT (id) DO UPDATE SET rev = excluded.rev, data = excluded.data",
            params![item.id, item.rev, data],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    const KEY: SymmetricKey = [0x42; 32];

    fn item(id: i64, rev: i64, data: &str) -> Item {
        Item {
            id,
            rev,
            data: data.to_string(),
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.save_item(&KEY, &item(1, 1, "first")).unwrap();
        db.save_item(&KEY, &item(2, 5, "")).unwrap();

        let mut items = db.load_items(&KEY).unwrap().items;
        items.sort_by_key(|i| i.id);
        assert_eq!(items, vec![item(1, 1, "first"), item(2, 5, "")]);
    }

    #[test]
    fn test_payload_is_encrypted_at_rest() {
        let db = Database::open_in_memory().unwrap();
        db.save_item(&KEY, &item(1, 1, "top secret note")).unwrap();

        let raw: Vec<u8> = db
            .conn()
            .query_row("SELECT data FROM items WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert!(!raw
            .windows(b"top secret".len())
            .any(|w| w == b"top secret"));
    }

    #[test]
    fn test_upsert_replaces_payload_and_rev() {
        let db = Database::open_in_memory().unwrap();
        db.save_item(&KEY, &item(100, 100, "hello")).unwrap();
        db.save_item(&KEY, &item(100, 150, "hello world")).unwrap();

        let stored = db.get_item(&KEY, 100).unwrap().unwrap();
        assert_eq!(stored, item(100, 150, "hello world"));
        assert_eq!(db.load_items(&KEY).unwrap().items.len(), 1);
    }

    #[test]
    fn test_store_does_not_compare_revisions() {
        let db = Database::open_in_memory().unwrap();
        db.save_item(&KEY, &item(100, 150, "newer")).unwrap();
        db.save_item(&KEY, &item(100, 140, "older")).unwrap();

        assert_eq!(db.get_item(&KEY, 100).unwrap().unwrap().rev, 140);
    }

    #[test]
    fn test_missing_item_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_item(&KEY, 9).unwrap().is_none());
    }

    #[test]
    fn test_wrong_key_reports_every_row_unreadable() {
        let db = Database::open_in_memory().unwrap();
        db.save_item(&KEY, &item(1, 1, "data")).unwrap();

        let other = [0x01; 32];
        let loaded = db.load_items(&other).unwrap();
        assert!(loaded.items.is_empty());
        assert_eq!(loaded.unreadable, vec![1]);
        assert!(matches!(
            db.get_item(&other, 1),
            Err(StoreError::Crypto(_))
        ));
    }

    #[test]
    fn test_corrupt_row_does_not_hide_the_others() {
        let db = Database::open_in_memory().unwrap();
        db.save_item(&KEY, &item(1, 1, "one")).unwrap();
        db.save_item(&KEY, &item(2, 2, "two")).unwrap();
        db.save_item(&KEY, &item(3, 3, "three")).unwrap();
        db.conn()
            .execute("UPDATE items SET data = x'00010203' WHERE id = 2", [])
            .unwrap();

        let mut loaded = db.load_items(&KEY).unwrap();
        loaded.items.sort_by_key(|i| i.id);
        assert_eq!(loaded.items, vec![item(1, 1, "one"), item(3, 3, "three")]);
        assert_eq!(loaded.unreadable, vec![2]);
    }
}
