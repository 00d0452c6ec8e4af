//! Durable client-side state under fixed namespace keys.
//! One JSON file per key inside a configurable state directory, written on
//! every mutation and rehydrated once at startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Namespace key for the persisted session snapshot.
pub const SESSION_STORAGE_KEY: &str = "auth-storage";
/// Namespace key for persisted display preferences.
pub const PREFS_STORAGE_KEY: &str = "theme-storage";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state io: {0}")]
    Io(#[from] std::io::Error),
    #[error("state encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A single state file: `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(dir: &Path, key: &str) -> Self {
        Self { path: dir.join(format!("{key}.json")) }
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Write the full snapshot. Mutations are serialised by the owning store,
    /// so write-then-rename is enough to keep the file untorn.
    pub fn save<T: Serialize>(&self, value: &T) -> Result<(), PersistError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Load the snapshot if the file exists and decodes. A missing or corrupt
    /// file is treated as absent; startup never fails on bad state.
    pub fn load<T: DeserializeOwned>(&self) -> Option<T> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("state load failed path={:?} err={}", self.path, e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("state decode failed path={:?} err={}", self.path, e);
                None
            }
        }
    }
}
