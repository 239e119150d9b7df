// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Purpose
//
// Provides a simple, fast record store that doesn't persist across restarts.
// Useful for testing, demos, and dry local runs of the daemon.
//
// ## Crash Behavior
//
// - All record sets and their owner tags are lost on restart/crash
// - After a restart every record set is unclaimed again

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::traits::{RecordSet, RecordSetKey, RecordStore, RecordStoreFactory};
use crate::Error;

/// In-memory record store implementation
///
/// Record sets live in a HashMap protected by a RwLock. Zones are declared up
/// front; `zone_exists` only knows about declared zones.
///
/// # Example
///
/// ```rust,no_run
/// use ipdns_core::store::MemoryRecordStore;
/// use ipdns_core::traits::{AddressFamily, RecordSetKey, RecordStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::with_zones(["foo.bar"]);
///
///     assert!(store.zone_exists("foo.bar").await?);
///
///     let key = RecordSetKey::new("foo.bar", "www", AddressFamily::V4);
///     assert!(store.fetch(&key).await?.is_none());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<HashMap<RecordSetKey, RecordSet>>>,
    zones: Arc<RwLock<HashSet<String>>>,
}

impl MemoryRecordStore {
    /// Create a new empty store with no zones
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store serving the given zones
    pub fn with_zones<I, S>(zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let zones = zones.into_iter().map(Into::into).collect();
        Self {
            records: Arc::default(),
            zones: Arc::new(RwLock::new(zones)),
        }
    }

    /// Declare a zone
    pub async fn add_zone(&self, zone: impl Into<String>) {
        self.zones.write().await.insert(zone.into());
    }

    /// Place a record set directly, bypassing the engine
    pub async fn insert(&self, key: RecordSetKey, record_set: RecordSet) {
        self.records.write().await.insert(key, record_set);
    }

    /// Read a record set directly
    pub async fn get(&self, key: &RecordSetKey) -> Option<RecordSet> {
        self.records.read().await.get(key).cloned()
    }

    /// Get the number of record sets in the store
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store holds no record sets
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Remove all record sets (zones are kept)
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch(&self, key: &RecordSetKey) -> Result<Option<RecordSet>, Error> {
        Ok(self.get(key).await)
    }

    async fn create_or_update(&self, key: &RecordSetKey, record_set: &RecordSet) -> Result<(), Error> {
        self.insert(key.clone(), record_set.clone()).await;
        Ok(())
    }

    async fn zone_exists(&self, zone: &str) -> Result<bool, Error> {
        Ok(self.zones.read().await.contains(zone))
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for creating memory record stores
pub struct MemoryRecordStoreFactory;

#[async_trait]
impl RecordStoreFactory for MemoryRecordStoreFactory {
    async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn RecordStore>, Error> {
        match config {
            StoreConfig::Memory { zones } => {
                Ok(Arc::new(MemoryRecordStore::with_zones(zones.iter().cloned())))
            }
            _ => Err(Error::config("Invalid config for memory record store")),
        }
    }
}
