// # ipdns-core
//
// Core library for the ownership-gated dynamic DNS gateway.
//
// ## Architecture Overview
//
// An authenticated client publishes its current IPv4/IPv6 address under a DNS
// name. The first client to write a record set owns it; nobody else may
// overwrite it afterwards.
//
// - **Credentials**: Decodes the Basic authorization header
// - **RequestValidator**: Checks fields, identity and zone existence
// - **Upserter**: Ownership-gated create-or-update, one per address family
// - **RecordStore**: Trait for the remote DNS record store
// - **UpdateEngine**: Wires the three stages and emits events
// - **StoreRegistry**: Plugin-based registry for record stores
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from store implementations
// 2. **Store as Source of Truth**: No record data is cached between requests
// 3. **Plugin-Based**: Stores are registered dynamically, no hard-coded if-else
// 4. **Library-First**: The daemon is a thin transport over `UpdateEngine`
// 5. **Partial Success**: Address families succeed or fail independently

pub mod config;
pub mod credentials;
pub mod domain;
pub mod engine;
pub mod error;
pub mod registry;
pub mod store;
pub mod traits;
pub mod validation;

// Re-export core types for convenience
pub use config::{ClientIdentity, EngineConfig, GatewayConfig, StoreConfig};
pub use credentials::Credentials;
pub use domain::Fqdn;
pub use engine::{EngineEvent, UpdateEngine, UpdateReport, UpsertAction, UpsertResult, Upserter};
pub use error::{Error, Result};
pub use registry::StoreRegistry;
pub use store::{FileRecordStore, MemoryRecordStore};
pub use traits::{AddressFamily, RecordSet, RecordSetKey, RecordStore};
pub use validation::{RequestValidator, UpdateFields, UpdateRequest, ValidationReport};
