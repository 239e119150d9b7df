// # File Record Store
//
// File-based implementation of RecordStore with crash recovery.
//
// ## Purpose
//
// Lets the daemon run without a cloud DNS provider: record sets and their
// owner tags persist across restarts in a single JSON file, which can be
// rendered into a zone file or synced elsewhere by other tooling.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "zones": ["foo.bar"],
//   "record_sets": [
//     {
//       "zone": "foo.bar",
//       "name": "www",
//       "family": "v4",
//       "owner": "foo",
//       "ttl": 3600,
//       "addresses": ["1.2.3.4"]
//     }
//   ]
// }
// ```

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::config::StoreConfig;
use crate::traits::{RecordSet, RecordSetKey, RecordStore, RecordStoreFactory};
use crate::Error;

/// Store file format version
/// Used for future migration if format changes
const STORE_FILE_VERSION: &str = "1.0";

/// File-based record store with crash recovery
///
/// Every write is flushed to disk before `create_or_update` returns.
///
/// # Example
///
/// ```rust,no_run
/// use ipdns_core::store::FileRecordStore;
/// use ipdns_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileRecordStore::new("/var/lib/ipdns/records.json", ["foo.bar"]).await?;
///
///     assert!(store.zone_exists("foo.bar").await?);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

/// Internal state for file-based store
#[derive(Debug, Default)]
struct FileState {
    zones: BTreeSet<String>,
    record_sets: BTreeMap<RecordSetKey, RecordSet>,
}

/// One record set as written to the file
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoredRecordSet {
    #[serde(flatten)]
    key: RecordSetKey,
    #[serde(flatten)]
    record_set: RecordSet,
}

/// Serializable store file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    #[serde(default)]
    zones: BTreeSet<String>,
    #[serde(default)]
    record_sets: Vec<StoredRecordSet>,
}

impl FileRecordStore {
    /// Create or load a file record store
    ///
    /// This will:
    /// 1. Try to load existing store file
    /// 2. If corruption detected, try to load from backup
    /// 3. If both fail, start with empty state
    /// 4. Create parent directories if needed
    ///
    /// `zones` are merged with the zones already recorded in the file.
    pub async fn new<P, I, S>(path: P, zones: I) -> Result<Self, Error>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = path.as_ref().to_path_buf();

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let mut state = Self::load_state_with_recovery(&path).await?;
        state.zones.extend(zones.into_iter().map(Into::into));

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Load state from file with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load main store file
    /// 2. If JSON parse error, try loading backup
    /// 3. If backup also fails, start with empty state
    async fn load_state_with_recovery(path: &Path) -> Result<FileState, Error> {
        match Self::load_state(path).await {
            Ok(state) => {
                tracing::debug!(
                    "Loaded record store from file: {} record sets",
                    state.record_sets.len()
                );
                Ok(state)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Store file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty store.");
                    return Ok(FileState::default());
                }

                match Self::load_state(&backup_path).await {
                    Ok(state) => {
                        tracing::info!(
                            "Recovered store from backup: {} record sets",
                            state.record_sets.len()
                        );

                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore store file from backup: {}",
                                restore_err
                            );
                        }

                        Ok(state)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty store.",
                            backup_err
                        );
                        Ok(FileState::default())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Load state from file
    async fn load_state(path: &Path) -> Result<FileState, Error> {
        if !path.exists() {
            tracing::debug!("Store file does not exist: {}", path.display());
            return Ok(FileState::default());
        }

        let content = fs::read_to_string(path).await?;
        let store_file: StoreFileFormat = serde_json::from_str(&content)?;

        if store_file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                STORE_FILE_VERSION,
                store_file.version
            );
        }

        Ok(FileState {
            zones: store_file.zones,
            record_sets: store_file
                .record_sets
                .into_iter()
                .map(|stored| (stored.key, stored.record_set))
                .collect(),
        })
    }

    /// Write state to file atomically
    async fn write_state(&self, state: &FileState) -> Result<(), Error> {
        let store_file = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            zones: state.zones.clone(),
            record_sets: state
                .record_sets
                .iter()
                .map(|(key, record_set)| StoredRecordSet {
                    key: key.clone(),
                    record_set: record_set.clone(),
                })
                .collect(),
        };

        let json = serde_json::to_string_pretty(&store_file)?;

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store_unavailable(
                    "file",
                    format!("Failed to create temp file {}: {}", temp_path.display(), e),
                )
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store_unavailable(
                    "file",
                    format!("Failed to write temp file {}: {}", temp_path.display(), e),
                )
            })?;

            file.flush().await.map_err(|e| {
                Error::store_unavailable(
                    "file",
                    format!("Failed to flush temp file {}: {}", temp_path.display(), e),
                )
            })?;
        }

        // Create backup of current file (if it exists)
        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store_unavailable(
                "file",
                format!(
                    "Failed to rename {} to {}: {}",
                    temp_path.display(),
                    self.path.display(),
                    e
                ),
            )
        })?;

        tracing::trace!("Record store written to file: {}", self.path.display());
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn fetch(&self, key: &RecordSetKey) -> Result<Option<RecordSet>, Error> {
        let state = self.state.read().await;
        Ok(state.record_sets.get(key).cloned())
    }

    async fn create_or_update(&self, key: &RecordSetKey, record_set: &RecordSet) -> Result<(), Error> {
        // Held across the write so file order matches update order
        let mut state = self.state.write().await;
        let previous = state.record_sets.insert(key.clone(), record_set.clone());

        if let Err(e) = self.write_state(&state).await {
            // Keep memory consistent with what is on disk
            match previous {
                Some(previous) => state.record_sets.insert(key.clone(), previous),
                None => state.record_sets.remove(key),
            };
            return Err(e);
        }

        Ok(())
    }

    async fn zone_exists(&self, zone: &str) -> Result<bool, Error> {
        let state = self.state.read().await;
        Ok(state.zones.contains(zone))
    }

    fn store_name(&self) -> &'static str {
        "file"
    }
}

/// Factory for creating file record stores
pub struct FileRecordStoreFactory;

#[async_trait]
impl RecordStoreFactory for FileRecordStoreFactory {
    async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn RecordStore>, Error> {
        match config {
            StoreConfig::File { path, zones } => {
                let store = FileRecordStore::new(path, zones.iter().cloned()).await?;
                Ok(Arc::new(store))
            }
            _ => Err(Error::config("Invalid config for file record store")),
        }
    }
}
