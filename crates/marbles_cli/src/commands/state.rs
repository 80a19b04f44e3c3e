//! State file persistence.
//!
//! The state file is a JSON [`StoreSnapshot`]. A missing file is an empty
//! store.

use marbles_storage::{InMemoryStore, StorageError, StoreSnapshot};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors reading or writing the state file.
#[derive(Debug, Error)]
pub enum StateError {
    /// The file could not be read or written.
    #[error("state file {path:?}: {source}")]
    Io {
        /// The state file.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The file is not a valid snapshot.
    #[error("state file {path:?} is not a valid snapshot: {source}")]
    Format {
        /// The state file.
        path: PathBuf,
        /// Underlying error.
        source: StorageError,
    },
}

impl StateError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn format(path: &Path, source: StorageError) -> Self {
        Self::Format {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Loads the store held in `path`.
pub fn load(path: &Path) -> Result<InMemoryStore, StateError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no state file, starting empty");
            return Ok(InMemoryStore::new());
        }
        Err(e) => return Err(StateError::io(path, e)),
    };
    let snapshot = StoreSnapshot::from_json(&data).map_err(|e| StateError::format(path, e))?;
    Ok(InMemoryStore::from_snapshot(snapshot))
}

/// Writes the contents of `store` to `path`.
pub fn save(path: &Path, store: &InMemoryStore) -> Result<(), StateError> {
    let data = store
        .snapshot()
        .to_json()
        .map_err(|e| StateError::format(path, e))?;
    fs::write(path, data).map_err(|e| StateError::io(path, e))?;
    debug!(path = %path.display(), "state saved");
    Ok(())
}
