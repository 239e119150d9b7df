//! Test doubles and common utilities for contract tests
//!
//! This module provides a scriptable record store that counts every call,
//! so tests can verify what the engine did and did not do.

#![allow(dead_code)]

use ipdns_core::config::{ClientIdentity, GatewayConfig, StoreConfig};
use ipdns_core::error::{Error, Result};
use ipdns_core::traits::{AddressFamily, RecordSet, RecordSetKey, RecordStore};
use ipdns_core::validation::UpdateFields;
use ipdns_core::{Credentials, EngineEvent, UpdateEngine};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Barrier};

/// Client id configured in [`gateway_config`]
pub const CLIENT_ID: &str = "foo";
/// Secret configured in [`gateway_config`]
pub const SECRET: &str = "bar";
/// Zone the default store serves
pub const ZONE: &str = "foo.bar";

/// A record store that tracks calls and can be told to fail
pub struct RecordingStore {
    records: Arc<Mutex<HashMap<RecordSetKey, RecordSet>>>,
    zones: Arc<Mutex<HashSet<String>>>,
    /// Call counter for fetch()
    fetch_calls: Arc<AtomicUsize>,
    /// Call counter for create_or_update()
    write_calls: Arc<AtomicUsize>,
    /// Call counter for zone_exists()
    zone_calls: Arc<AtomicUsize>,
    /// Families whose fetch() fails
    failing_fetch: HashSet<AddressFamily>,
    /// Families whose create_or_update() fails
    failing_write: HashSet<AddressFamily>,
    /// Whether zone_exists() fails
    failing_zone_lookup: bool,
    /// Every fetch() waits here before answering
    fetch_rendezvous: Option<Arc<Barrier>>,
}

impl RecordingStore {
    /// Create a store serving [`ZONE`] with no record sets
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            zones: Arc::new(Mutex::new(HashSet::from([ZONE.to_string()]))),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            write_calls: Arc::new(AtomicUsize::new(0)),
            zone_calls: Arc::new(AtomicUsize::new(0)),
            failing_fetch: HashSet::new(),
            failing_write: HashSet::new(),
            failing_zone_lookup: false,
            fetch_rendezvous: None,
        }
    }

    /// Create a store that shares records and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            zones: Arc::clone(&other.zones),
            fetch_calls: Arc::clone(&other.fetch_calls),
            write_calls: Arc::clone(&other.write_calls),
            zone_calls: Arc::clone(&other.zone_calls),
            failing_fetch: other.failing_fetch.clone(),
            failing_write: other.failing_write.clone(),
            failing_zone_lookup: other.failing_zone_lookup,
            fetch_rendezvous: other.fetch_rendezvous.clone(),
        }
    }

    /// Seed a record set under `name` in [`ZONE`]
    pub fn with_record_set(self, name: &str, family: AddressFamily, record_set: RecordSet) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(RecordSetKey::new(ZONE, name, family), record_set);
        self
    }

    /// Drop every zone
    pub fn without_zones(self) -> Self {
        self.zones.lock().unwrap().clear();
        self
    }

    /// Make fetch() fail for `family`
    pub fn failing_fetch_for(mut self, family: AddressFamily) -> Self {
        self.failing_fetch.insert(family);
        self
    }

    /// Make create_or_update() fail for `family`
    pub fn failing_write_for(mut self, family: AddressFamily) -> Self {
        self.failing_write.insert(family);
        self
    }

    /// Make zone_exists() fail
    pub fn failing_zone_lookup(mut self) -> Self {
        self.failing_zone_lookup = true;
        self
    }

    /// Make every fetch() wait on `barrier`
    pub fn with_fetch_rendezvous(mut self, barrier: Arc<Barrier>) -> Self {
        self.fetch_rendezvous = Some(barrier);
        self
    }

    /// Record set stored under `name` in [`ZONE`]
    pub fn record_set(&self, name: &str, family: AddressFamily) -> Option<RecordSet> {
        self.records
            .lock()
            .unwrap()
            .get(&RecordSetKey::new(ZONE, name, family))
            .cloned()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn zone_calls(&self) -> usize {
        self.zone_calls.load(Ordering::SeqCst)
    }

    /// Total number of calls of any kind
    pub fn total_calls(&self) -> usize {
        self.fetch_calls() + self.write_calls() + self.zone_calls()
    }
}

#[async_trait::async_trait]
impl RecordStore for RecordingStore {
    async fn fetch(&self, key: &RecordSetKey) -> Result<Option<RecordSet>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(barrier) = &self.fetch_rendezvous {
            barrier.wait().await;
        }

        if self.failing_fetch.contains(&key.family) {
            return Err(Error::store_unavailable("recording", "fetch refused"));
        }

        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn create_or_update(&self, key: &RecordSetKey, record_set: &RecordSet) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_write.contains(&key.family) {
            return Err(Error::store_unavailable("recording", "write refused"));
        }

        self.records
            .lock()
            .unwrap()
            .insert(key.clone(), record_set.clone());
        Ok(())
    }

    async fn zone_exists(&self, zone: &str) -> Result<bool> {
        self.zone_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_zone_lookup {
            return Err(Error::store_unavailable("recording", "zone lookup refused"));
        }

        Ok(self.zones.lock().unwrap().contains(zone))
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}

/// Gateway configuration expecting [`CLIENT_ID`] / [`SECRET`]
pub fn gateway_config() -> GatewayConfig {
    GatewayConfig::new(ClientIdentity::new(CLIENT_ID, SECRET)).with_store(StoreConfig::Memory {
        zones: vec![ZONE.to_string()],
    })
}

/// Engine over a store sharing counters with `store`
pub fn engine_over(store: &RecordingStore) -> (UpdateEngine, mpsc::Receiver<EngineEvent>) {
    UpdateEngine::new(
        Arc::new(RecordingStore::sharing_counters_with(store)),
        gateway_config(),
    )
    .expect("engine construction succeeds")
}

/// Authorization header for `client_id:secret`
pub fn basic(client_id: &str, secret: &str) -> String {
    Credentials::new(client_id, secret).to_authorization()
}

/// Update fields targeting `domain`
pub fn fields(ipv4: Option<&str>, ipv6: Option<&str>, domain: &str) -> UpdateFields {
    UpdateFields {
        ipv4: ipv4.map(String::from),
        ipv6: ipv6.map(String::from),
        domain: Some(domain.to_string()),
        dual_stack: None,
    }
}

/// Drain every event currently queued
pub fn drain(events: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
