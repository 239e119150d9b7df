//! Core traits for the gateway
//!
//! - [`RecordStore`]: Fetch and write record sets, look up zones

pub mod record_store;

pub use record_store::{
    AddressFamily, DEFAULT_TTL_SECS, RecordSet, RecordSetKey, RecordStore, RecordStoreFactory,
};
