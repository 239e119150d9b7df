//! Built-in record store implementations
//!
//! - [`MemoryRecordStore`]: volatile, for tests and local runs
//! - [`FileRecordStore`]: JSON file with crash recovery
//!
//! Remote stores live in their own crates (see `ipdns-store-azure`).

pub mod file;
pub mod memory;

pub use file::{FileRecordStore, FileRecordStoreFactory};
pub use memory::{MemoryRecordStore, MemoryRecordStoreFactory};
