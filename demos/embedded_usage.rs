//! Minimal embedding example for ipdns-core
//!
//! Drives the update engine directly, without the HTTP daemon, over a
//! record store supplied by the application.

use async_trait::async_trait;
use ipdns_core::config::{ClientIdentity, GatewayConfig};
use ipdns_core::traits::{AddressFamily, RecordSet, RecordSetKey, RecordStore};
use ipdns_core::{Credentials, Result, UpdateEngine, UpdateFields};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Record store kept in the application's own map
struct EmbeddedRecordStore {
    zones: HashSet<String>,
    record_sets: Mutex<HashMap<RecordSetKey, RecordSet>>,
    writes: AtomicUsize,
}

impl EmbeddedRecordStore {
    fn new(zone: &str) -> Self {
        Self {
            zones: HashSet::from([zone.to_string()]),
            record_sets: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for EmbeddedRecordStore {
    async fn fetch(&self, key: &RecordSetKey) -> Result<Option<RecordSet>> {
        let record_sets = self.record_sets.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(record_sets.get(key).cloned())
    }

    async fn create_or_update(&self, key: &RecordSetKey, record_set: &RecordSet) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        println!("[Embedded] {} -> {:?}", key, record_set.addresses);
        self.record_sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), record_set.clone());
        Ok(())
    }

    async fn zone_exists(&self, zone: &str) -> Result<bool> {
        Ok(self.zones.contains(zone))
    }

    fn store_name(&self) -> &'static str {
        "embedded"
    }
}

fn request(ipv4: &str) -> UpdateFields {
    UpdateFields::from_pairs([("ipv4", ipv4), ("fqdn", "home.example.com")])
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Embedded ipdns-core Example ===\n");

    let store = Arc::new(EmbeddedRecordStore::new("example.com"));
    let config = GatewayConfig::new(ClientIdentity::new("router", "s3cr3t"));

    println!("1. Creating engine...");
    let (engine, mut event_rx) = UpdateEngine::new(store.clone(), config)?;

    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    let router = Credentials::new("router", "s3cr3t").to_authorization();

    println!("2. First update claims the record set...");
    let report = engine.process(Some(&router), &request("192.0.2.1")).await?;
    println!("   {:?}", report.into_result()?);

    println!("3. Owner moves it to a new address...");
    let report = engine.process(Some(&router), &request("192.0.2.2")).await?;
    println!("   {:?}", report.into_result()?);

    println!("4. Another record set, owned by someone else, stays untouched...");
    let key = RecordSetKey::new("example.com", "nas", AddressFamily::V4);
    store
        .create_or_update(
            &key,
            &RecordSet::claimed_by("backup-host", 3600, Ipv4Addr::new(198, 51, 100, 9).into()),
        )
        .await?;
    let takeover = UpdateFields::from_pairs([("ipv4", "192.0.2.3"), ("fqdn", "nas.example.com")]);
    match engine.process(Some(&router), &takeover).await?.into_result() {
        Ok(_) => println!("   unexpectedly written"),
        Err(e) => println!("   refused: {}", e),
    }

    println!("5. Wrong secret is rejected before the store is touched...");
    let intruder = Credentials::new("router", "guess").to_authorization();
    if let Err(e) = engine.process(Some(&intruder), &request("203.0.113.66")).await {
        println!("   refused: {}", e);
    }

    drop(engine);
    let _ = event_listener.await;

    println!("\n=== Embedding Successful ===");
    println!("Store writes: {}", store.write_count());
    println!("Key Points:");
    println!("- The application supplies the record store");
    println!("- Ownership is checked on every write");
    println!("- No HTTP server required");

    Ok(())
}
