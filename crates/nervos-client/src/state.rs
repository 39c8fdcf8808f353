//! Client state shared between the caller and the background tasks.
//!
//! [`Context`] is cheap to clone; every clone points at the same state. Two
//! mutexes guard it: one for the in-memory state, one for the database
//! connection. When both are needed the state lock is taken first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use nervos_shared::{AccountKeys, Item};
use nervos_store::{Database, Settings};

use crate::error::{ClientError, Result};

/// In-memory client state.
#[derive(Default)]
pub struct ClientState {
    /// Copy of the persisted settings row.
    pub settings: Settings,

    /// Derived secrets. `None` while locked.
    pub keys: Option<Arc<AccountKeys>>,

    /// Every known note by id. Empty while locked.
    pub items: HashMap<i64, Item>,

    /// Last failure worth showing to the user (background faults included).
    pub last_error: Option<String>,
}

/// Where the user is in the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No username stored on this device yet.
    NeedsLogin,
    /// Username known, secrets not derived.
    Locked,
    Unlocked,
}

#[derive(Clone)]
pub struct Context {
    state: Arc<Mutex<ClientState>>,
    db: Arc<Mutex<Database>>,
}

impl Context {
    /// Wrap an opened database, loading (or creating) the settings row.
    pub fn new(db: Database) -> Result<Self> {
        let settings = db.load_settings()?;
        Ok(Self {
            state: Arc::new(Mutex::new(ClientState {
                settings,
                ..ClientState::default()
            })),
            db: Arc::new(Mutex::new(db)),
        })
    }

    pub fn state(&self) -> Result<MutexGuard<'_, ClientState>> {
        self.state.lock().map_err(|_| ClientError::LockPoisoned)
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| ClientError::LockPoisoned)
    }

    /// Current secrets, or [`ClientError::Locked`].
    pub fn keys(&self) -> Result<Arc<AccountKeys>> {
        self.state()?.keys.clone().ok_or(ClientError::Locked)
    }

    pub fn is_unlocked(&self) -> bool {
        self.state().map(|s| s.keys.is_some()).unwrap_or(false)
    }

    pub fn phase(&self) -> Phase {
        match self.state() {
            Ok(state) if state.keys.is_some() => Phase::Unlocked,
            Ok(state) if state.settings.username.is_empty() => Phase::NeedsLogin,
            _ => Phase::Locked,
        }
    }

    pub fn settings(&self) -> Result<Settings> {
        Ok(self.state()?.settings.clone())
    }

    pub fn record_error(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.state() {
            state.last_error = Some(message.into());
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().ok().and_then(|s| s.last_error.clone())
    }

    /// Return and clear the last recorded error.
    pub fn take_error(&self) -> Option<String> {
        self.state().ok().and_then(|mut s| s.last_error.take())
    }
}
