//! Persisted session records.
//!
//! Two records survive a restart: the player's identity (display name plus
//! room code) and the one-shot result of the last finished game. A record
//! that cannot be read or parsed is treated as absent.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use werewolf_core::protocol::{GameResults, RoomCode};

use crate::error::StoreError;

pub const IDENTITY_FILE: &str = "identity.json";
pub const RESULTS_FILE: &str = "game-results.json";

/// Who this client is, and in which room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "userName")]
    pub display_name: String,
    #[serde(rename = "roomCode")]
    pub room_code: RoomCode,
}

impl Identity {
    pub fn new(display_name: impl Into<String>, room_code: RoomCode) -> Self {
        Self {
            display_name: display_name.into(),
            room_code,
        }
    }
}

/// Storage for the persisted session records.
///
/// Calls are synchronous so a screen can read the identity before its first
/// network call. Implementations log and swallow I/O failures.
pub trait SessionStore: Send + Sync {
    fn save(&self, identity: &Identity);
    fn load(&self) -> Option<Identity>;
    fn clear(&self);

    /// Keep the result of a finished game for the results screen.
    fn stash_results(&self, results: &GameResults);
    /// Read and delete the stashed result.
    fn take_results(&self) -> Option<GameResults>;
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Records stored as JSON files in a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn identity_path(&self) -> PathBuf {
        self.dir.join(IDENTITY_FILE)
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(RESULTS_FILE)
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Json {
                path: path.to_path_buf(),
                source,
            })
    }

    fn remove(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove record"),
        }
    }

    fn read_or_absent<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        match self.read(path) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable record");
                None
            }
        }
    }
}

impl SessionStore for FileStore {
    fn save(&self, identity: &Identity) {
        if let Err(e) = self.write(&self.identity_path(), identity) {
            tracing::warn!(error = %e, "failed to persist identity");
        }
    }

    fn load(&self) -> Option<Identity> {
        self.read_or_absent(&self.identity_path())
    }

    fn clear(&self) {
        self.remove(&self.identity_path());
    }

    fn stash_results(&self, results: &GameResults) {
        if let Err(e) = self.write(&self.results_path(), results) {
            tracing::warn!(error = %e, "failed to stash game results");
        }
    }

    fn take_results(&self) -> Option<GameResults> {
        let path = self.results_path();
        let results = self.read_or_absent(&path);
        self.remove(&path);
        results
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    identity: Mutex<Option<Identity>>,
    results: Mutex<Option<GameResults>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: Identity) -> Self {
        Self {
            identity: Mutex::new(Some(identity)),
            results: Mutex::new(None),
        }
    }
}

impl SessionStore for MemoryStore {
    fn save(&self, identity: &Identity) {
        *self.identity.lock() = Some(identity.clone());
    }

    fn load(&self) -> Option<Identity> {
        self.identity.lock().clone()
    }

    fn clear(&self) {
        self.identity.lock().take();
    }

    fn stash_results(&self, results: &GameResults) {
        *self.results.lock() = Some(results.clone());
    }

    fn take_results(&self) -> Option<GameResults> {
        self.results.lock().take()
    }
}
