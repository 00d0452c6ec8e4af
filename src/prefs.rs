//! Operator display preferences, persisted across restarts.
//! The dark/light flag is the only preference today; it follows the same
//! persist-on-mutate, rehydrate-at-startup contract as the session store.

use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::session::{StateFile, PREFS_STORAGE_KEY};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prefs {
    pub dark_mode: bool,
}

pub struct PrefsStore {
    state: RwLock<Prefs>,
    disk: Option<StateFile>,
}

impl PrefsStore {
    pub fn in_memory() -> Self {
        Self { state: RwLock::new(Prefs::default()), disk: None }
    }

    /// Backed by `<dir>/theme-storage.json`, rehydrated immediately.
    pub fn with_storage(dir: &Path) -> Self {
        let disk = StateFile::new(dir, PREFS_STORAGE_KEY);
        let state = disk.load().unwrap_or_default();
        Self { state: RwLock::new(state), disk: Some(disk) }
    }

    /// Flip dark mode and return the new value.
    pub fn toggle_dark_mode(&self) -> bool {
        let mut state = self.state.write();
        state.dark_mode = !state.dark_mode;
        self.persist(&state);
        state.dark_mode
    }

    pub fn set_dark_mode(&self, dark: bool) {
        let mut state = self.state.write();
        state.dark_mode = dark;
        self.persist(&state);
    }

    pub fn snapshot(&self) -> Prefs {
        self.state.read().clone()
    }

    fn persist(&self, state: &Prefs) {
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.save(state) {
                warn!("prefs persist failed path={:?} err={}", disk.path(), e);
            }
        }
    }
}
