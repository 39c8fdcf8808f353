//! Login, unlock and lock.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use zeroize::Zeroizing;

use nervos_shared::crypto::{password_check, verify_password_check};
use nervos_shared::AccountKeys;

use crate::error::{ClientError, Result};
use crate::state::Context;

impl Context {
    /// First login on this device: remember `username`, then unlock.
    ///
    /// The username only sticks if the unlock succeeds.
    pub async fn login(&self, username: &str, password: Zeroizing<String>) -> Result<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ClientError::EmptyUsername);
        }

        let previous = {
            let mut state = self.state()?;
            std::mem::replace(&mut state.settings.username, username.to_string())
        };

        let result = self.unlock(password).await;
        if result.is_err() {
            self.state()?.settings.username = previous;
        }
        result
    }

    /// Derive the account secrets and load every note into memory.
    ///
    /// The first unlock stores a password verifier; later unlocks must
    /// match it or fail with [`ClientError::WrongPassword`] without touching
    /// any state.
    pub async fn unlock(&self, password: Zeroizing<String>) -> Result<()> {
        let username = self.state()?.settings.username.clone();
        if username.is_empty() {
            return Err(ClientError::NotLoggedIn);
        }

        let keys = tokio::task::spawn_blocking(move || AccountKeys::derive(&username, password))
            .await
            .map_err(|e| ClientError::Task(e.to_string()))?;
        let user_hash = keys.user_hash().as_str().to_string();

        let mut state = self.state()?;
        let db = self.db()?;

        let mut settings = state.settings.clone();
        if settings.password_check.is_empty() {
            settings.password_check = password_check(keys.data_secret(), &user_hash);
        } else if !verify_password_check(keys.data_secret(), &user_hash, &settings.password_check) {
            warn!(user = %keys.user_hash().short(), "Unlock rejected: wrong password");
            return Err(ClientError::WrongPassword);
        }

        let loaded = db.load_items(keys.data_secret())?;
        let items: HashMap<_, _> = loaded
            .items
            .into_iter()
            .filter(|item| !item.data.is_empty())
            .map(|item| (item.id, item))
            .collect();

        if settings != state.settings {
            db.save_settings(&settings)?;
            state.settings = settings;
        }

        info!(
            user = %keys.user_hash().short(),
            notes = items.len(),
            "Unlocked"
        );
        state.items = items;
        state.keys = Some(Arc::new(keys));
        state.last_error = if loaded.unreadable.is_empty() {
            None
        } else {
            warn!(ids = ?loaded.unreadable, "Some notes could not be decrypted");
            Some(format!(
                "{} note(s) could not be decrypted: {:?}",
                loaded.unreadable.len(),
                loaded.unreadable
            ))
        };
        Ok(())
    }

    /// Forget the secrets and the decrypted notes. Sync pauses until the
    /// next unlock.
    pub fn lock(&self) -> Result<()> {
        let mut state = self.state()?;
        state.keys = None;
        state.items.clear();
        info!("Locked");
        Ok(())
    }
}
