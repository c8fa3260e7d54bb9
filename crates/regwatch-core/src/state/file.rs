// # File State Store
//
// File-based implementation of ImageStateStore.
//
// ## Purpose
//
// Persists the last-seen update instants across daemon restarts so a
// restart does not re-baseline every image.
//
// ## Failure Model
//
// The state file is a disposable cache:
// - Missing file: treated as empty, an empty file is seeded
// - Unparsable content: logged, treated as empty (baselines reset)
// - Writes go through a temporary file and a rename, so a crashed save
//   leaves the previous content intact rather than a half-written file
//
// ## File Format
//
// ```json
// {
//   "library/nginx": {
//     "namespace": "library",
//     "repository": "nginx",
//     "last_updated": "2026-01-09T12:00:00Z"
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::{ImageStateStore, StateMap};

/// File-based state store
///
/// # Example
///
/// ```rust,no_run
/// use regwatch_core::state::FileStateStore;
/// use regwatch_core::traits::ImageStateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/regwatch/state.json");
///     let state = store.load().await?;
///     store.save(&state).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by the given path.
    ///
    /// The file itself is created lazily on the first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the parent directory if it doesn't exist
    async fn ensure_parent(&self) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::state_store(format!(
                        "failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Write the state to the backing file via a temp file and a rename
    async fn write_state(&self, state: &StateMap) -> Result<(), Error> {
        self.ensure_parent().await?;

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| Error::state_store(format!("failed to serialize state: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("state written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

#[async_trait]
impl ImageStateStore for FileStateStore {
    async fn load(&self) -> Result<StateMap, Error> {
        if !self.path.exists() {
            tracing::debug!("state file {} does not exist, seeding empty", self.path.display());
            let empty = StateMap::new();
            self.write_state(&empty).await?;
            return Ok(empty);
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            Error::state_store(format!(
                "failed to read state file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        match serde_json::from_str(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                // Corruption is non-fatal: the store is a cache, and an
                // empty map just resets every baseline on this cycle.
                tracing::warn!(
                    "state file {} is unparsable ({}), resetting baselines",
                    self.path.display(),
                    e
                );
                Ok(StateMap::new())
            }
        }
    }

    async fn save(&self, state: &StateMap) -> Result<(), Error> {
        self.write_state(state).await
    }
}
