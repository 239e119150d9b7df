//! Configuration types for the gateway
//!
//! Configuration is read once at startup and is immutable afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::traits::DEFAULT_TTL_SECS;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// The single credential pair every client must present
    pub identity: ClientIdentity,

    /// Record store configuration
    pub store: StoreConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl GatewayConfig {
    /// Create a configuration with default store and engine settings
    pub fn new(identity: ClientIdentity) -> Self {
        Self {
            identity,
            store: StoreConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Replace the store configuration
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Replace the engine configuration
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.identity.validate()?;
        self.store.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Expected client identity
///
/// One process-wide pair; it authorizes updates for every zone. Per-record
/// authorization is the owner tag, not this value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Expected client id
    pub client_id: String,
    /// Expected secret
    /// ⚠️ NEVER log this value
    pub secret: String,
}

// Custom Debug implementation that hides the secret
impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("client_id", &self.client_id)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

impl ClientIdentity {
    /// Create a new identity
    pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: secret.into(),
        }
    }

    /// Validate the identity
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.client_id.is_empty() {
            return Err(crate::Error::config("Expected client id cannot be empty"));
        }
        if self.client_id.contains(':') {
            return Err(crate::Error::config(
                "Expected client id cannot contain ':' (Basic credentials separator)",
            ));
        }
        if self.secret.is_empty() {
            return Err(crate::Error::config("Expected secret cannot be empty"));
        }
        if self.secret.contains(':') {
            return Err(crate::Error::config(
                "Expected secret cannot contain ':' (Basic credentials separator)",
            ));
        }
        Ok(())
    }
}

/// Record store configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory store (not persistent)
    Memory {
        /// Zones the store serves
        #[serde(default)]
        zones: Vec<String>,
    },

    /// JSON file store
    File {
        /// Path to the store file
        path: String,
        /// Zones the store serves
        #[serde(default)]
        zones: Vec<String>,
    },

    /// Azure DNS
    Azure {
        /// Azure AD tenant
        tenant_id: String,
        /// Subscription holding the DNS zones
        subscription_id: String,
        /// Resource group holding the DNS zones
        resource_group: String,
        /// Service principal application id
        client_id: String,
        /// Service principal secret
        /// ⚠️ NEVER log this value
        client_secret: String,
    },

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

// Custom Debug implementation that hides the Azure client secret
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreConfig::Memory { zones } => {
                f.debug_struct("Memory").field("zones", zones).finish()
            }
            StoreConfig::File { path, zones } => f
                .debug_struct("File")
                .field("path", path)
                .field("zones", zones)
                .finish(),
            StoreConfig::Azure {
                tenant_id,
                subscription_id,
                resource_group,
                client_id,
                ..
            } => f
                .debug_struct("Azure")
                .field("tenant_id", tenant_id)
                .field("subscription_id", subscription_id)
                .field("resource_group", resource_group)
                .field("client_id", client_id)
                .field("client_secret", &"<REDACTED>")
                .finish(),
            StoreConfig::Custom { factory, config } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", config)
                .finish(),
        }
    }
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Memory { .. } => Ok(()),
            StoreConfig::File { path, .. } => {
                if path.is_empty() {
                    return Err(crate::Error::config("File store path cannot be empty"));
                }
                Ok(())
            }
            StoreConfig::Azure {
                tenant_id,
                subscription_id,
                resource_group,
                client_id,
                client_secret,
            } => {
                let required = [
                    ("tenant_id", tenant_id),
                    ("subscription_id", subscription_id),
                    ("resource_group", resource_group),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                ];
                for (name, value) in required {
                    if value.is_empty() {
                        return Err(crate::Error::config(format!(
                            "Azure store {} cannot be empty",
                            name
                        )));
                    }
                }
                Ok(())
            }
            StoreConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom store factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom store config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Memory { .. } => "memory",
            StoreConfig::File { .. } => "file",
            StoreConfig::Azure { .. } => "azure",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory { zones: Vec::new() }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// TTL written when a record set is first created
    ///
    /// Updates never touch the TTL of an existing record set.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u32,

    /// Whether an existing record set without an owner tag may be claimed
    ///
    /// When false, writing to such a record set fails with an ownership
    /// conflict.
    #[serde(default = "default_claim_unowned")]
    pub claim_unowned: bool,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.default_ttl_secs == 0 {
            return Err(crate::Error::config("Default TTL must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            claim_unowned: default_claim_unowned(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_ttl_secs() -> u32 {
    DEFAULT_TTL_SECS
}

fn default_claim_unowned() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1000
}
