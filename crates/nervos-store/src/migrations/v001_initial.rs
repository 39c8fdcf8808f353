//! v001 -- Initial schema creation.
//!
//! Creates the `settings` singleton and the `items` table.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Settings (singleton row, created lazily by load_settings)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS settings (
    id             INTEGER PRIMARY KEY CHECK (id = 1),
    version        INTEGER NOT NULL,
    username       TEXT NOT NULL DEFAULT '',
    password_check BLOB NOT NULL DEFAULT x'',
    last_sync      INTEGER NOT NULL DEFAULT 0
);

-- ----------------------------------------------------------------
-- Items
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS items (
    id   INTEGER PRIMARY KEY NOT NULL,
    rev  INTEGER NOT NULL,
    data BLOB NOT NULL                 -- nonce || ciphertext
);

CREATE INDEX IF NOT EXISTS idx_items_rev ON items(rev);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
