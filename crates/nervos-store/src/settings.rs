//! Settings singleton.

use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;
use crate::models::{Settings, SETTINGS_VERSION};

impl Database {
    /// Load the settings row, creating the default row on first use.
    pub fn load_settings(&self) -> Result<Settings> {
        let existing = self
            .conn()
            .query_row(
                "SELECT version, username, password_check, last_sync FROM settings WHERE id = 1",
                [],
                |row| {
                    Ok(Settings {
                        version: row.get(0)?,
                        username: row.get(1)?,
                        password_check: row.get(2)?,
                        last_sync: row.get(3)?,
                    })
                },
            )
            .optional()?;

        if let Some(settings) = existing {
            return Ok(settings);
        }

        let settings = Settings::default();
        self.conn().execute(
            "INSERT INTO settings (id, version, username, password_check, last_sync)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                SETTINGS_VERSION,
                settings.username,
                settings.password_check,
                settings.last_sync,
            ],
        )?;
        tracing::info!("created default settings");
        Ok(settings)
    }

    /// Persist the settings singleton.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.conn().execute(
            "INSERT INTO settings (id, version, username, password_check, last_sync)
             VALUES (1, ?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET
                version = excluded.version,
                username = excluded.username,
                password_check = excluded.password_check,
                last_sync = excluded.last_sync",
            params![
                settings.version,
                settings.username,
                settings.password_check,
                settings.last_sync,
            ],
        )?;
        Ok(())
    }
}
