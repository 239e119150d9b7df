// # Record Store Trait
//
// Defines the interface to the remote DNS record store.
//
// ## Implementations
//
// - Azure DNS: `ipdns-store-azure` crate
// - In-memory: `ipdns_core::store::MemoryRecordStore`
// - JSON file: `ipdns_core::store::FileRecordStore`
//
// ## Usage
//
// ```rust,ignore
// use ipdns_core::traits::{AddressFamily, RecordSetKey, RecordStore};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* RecordStore implementation */;
//
//     let key = RecordSetKey::new("foo.bar", "www", AddressFamily::V4);
//     match store.fetch(&key).await? {
//         Some(record_set) => println!("owned by {:?}", record_set.owner),
//         None => println!("unclaimed"),
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// TTL written on record sets created by the gateway
pub const DEFAULT_TTL_SECS: u32 = 3600;

/// Address family of a record set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// IPv4, published as an A record
    V4,
    /// IPv6, published as an AAAA record
    V6,
}

impl AddressFamily {
    /// DNS record type for this family
    pub fn record_type(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "A",
            AddressFamily::V6 => "AAAA",
        }
    }

    /// Family of an address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_type())
    }
}

/// Identity of one record set in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordSetKey {
    /// Zone name (e.g. "foo.bar")
    pub zone: String,
    /// Record set name relative to the zone (e.g. "www")
    pub name: String,
    /// Address family, which fixes the record type
    pub family: AddressFamily,
}

impl RecordSetKey {
    /// Create a new key
    pub fn new(zone: impl Into<String>, name: impl Into<String>, family: AddressFamily) -> Self {
        Self {
            zone: zone.into(),
            name: name.into(),
            family,
        }
    }
}

impl fmt::Display for RecordSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.name, self.zone, self.family)
    }
}

/// A record set as held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Owner tag; `None` means nobody has claimed the record set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Published addresses, in order
    pub addresses: Vec<IpAddr>,
}

impl RecordSet {
    /// A freshly claimed record set holding a single address
    pub fn claimed_by(owner: impl Into<String>, ttl: u32, address: IpAddr) -> Self {
        Self {
            owner: Some(owner.into()),
            ttl,
            addresses: vec![address],
        }
    }

    /// Whether the owner tag equals `client_id` (ordinal comparison)
    pub fn is_owned_by(&self, client_id: &str) -> bool {
        self.owner.as_deref() == Some(client_id)
    }
}

/// Trait for record store implementations
///
/// The store is the single source of truth for record sets and the only
/// synchronization point between requests. Implementations must be
/// thread-safe and usable across async tasks.
///
/// ## Contract
///
/// - `fetch` returns `Ok(None)` when the record set does not exist. A
///   missing record set is an expected outcome, never an error.
/// - `create_or_update` is last-writer-wins. No compare-and-swap is
///   assumed by the engine.
/// - Transport or remote failures are reported as
///   [`Error::StoreUnavailable`](crate::Error::StoreUnavailable).
/// - Implementations must not retry; a failed call is reported as is.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the record set stored under `key`
    async fn fetch(&self, key: &RecordSetKey) -> Result<Option<RecordSet>, crate::Error>;

    /// Create the record set under `key`, or replace it if it exists
    async fn create_or_update(
        &self,
        key: &RecordSetKey,
        record_set: &RecordSet,
    ) -> Result<(), crate::Error>;

    /// Whether `zone` exists in the store's zone directory
    async fn zone_exists(&self, zone: &str) -> Result<bool, crate::Error>;

    /// Store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing record stores from configuration
#[async_trait]
pub trait RecordStoreFactory: Send + Sync {
    /// Create a RecordStore instance from configuration
    async fn create(
        &self,
        config: &crate::config::StoreConfig,
    ) -> Result<Arc<dyn RecordStore>, crate::Error>;
}
