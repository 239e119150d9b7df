//! Daemon configuration from environment variables
//!
//! Read once at startup, validated, then turned into a [`GatewayConfig`].

use anyhow::Result;
use ipdns_core::config::{ClientIdentity, EngineConfig, GatewayConfig, StoreConfig};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Address the HTTP server binds when `IPDNS_LISTEN_ADDR` is unset
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Application configuration
pub struct Config {
    pub client_id: String,
    /// ⚠️ NEVER log this value
    pub secret: String,
    pub listen_addr: String,
    pub store_type: String,
    pub store_path: Option<String>,
    pub zones: Vec<String>,
    pub azure_tenant_id: Option<String>,
    pub azure_subscription_id: Option<String>,
    pub azure_resource_group: Option<String>,
    pub azure_client_id: Option<String>,
    /// ⚠️ NEVER log this value
    pub azure_client_secret: Option<String>,
    pub default_ttl: Option<u32>,
    pub claim_unowned: Option<bool>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            client_id: var("IPDNS_CLIENT_ID").unwrap_or_default(),
            secret: var("IPDNS_SECRET").unwrap_or_default(),
            listen_addr: var("IPDNS_LISTEN_ADDR")
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            store_type: var("IPDNS_STORE_TYPE").unwrap_or_else(|| "azure".to_string()),
            store_path: var("IPDNS_STORE_PATH"),
            zones: var("IPDNS_ZONES")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            azure_tenant_id: var("IPDNS_AZURE_TENANT_ID"),
            azure_subscription_id: var("IPDNS_AZURE_SUBSCRIPTION_ID"),
            azure_resource_group: var("IPDNS_AZURE_RESOURCE_GROUP"),
            azure_client_id: var("IPDNS_AZURE_CLIENT_ID"),
            azure_client_secret: var("IPDNS_AZURE_CLIENT_SECRET"),
            default_ttl: parse_var(var("IPDNS_DEFAULT_TTL"), "IPDNS_DEFAULT_TTL")?,
            claim_unowned: parse_var(var("IPDNS_CLAIM_UNOWNED"), "IPDNS_CLAIM_UNOWNED")?,
            log_level: var("IPDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This performs:
    /// - Required field presence
    /// - Placeholder detection for secrets
    /// - Numeric range validation
    /// - Type enumeration validation
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            anyhow::bail!(
                "IPDNS_CLIENT_ID is required. \
                Set it via: export IPDNS_CLIENT_ID=your_client_id"
            );
        }

        if self.secret.is_empty() {
            anyhow::bail!(
                "IPDNS_SECRET is required. \
                Set it via: export IPDNS_SECRET=your_secret"
            );
        }

        for (name, value) in [("IPDNS_CLIENT_ID", &self.client_id), ("IPDNS_SECRET", &self.secret)] {
            if value.contains(':') {
                anyhow::bail!(
                    "{} cannot contain ':' (it separates client id and secret in Basic credentials)",
                    name
                );
            }
        }

        // Check for obvious placeholder secrets (common mistake)
        if is_placeholder(&self.secret) {
            anyhow::bail!(
                "IPDNS_SECRET appears to be a placeholder. \
                Use the secret your clients are configured with."
            );
        }

        if self.listen_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!(
                "IPDNS_LISTEN_ADDR '{}' is not a socket address. Example: {}",
                self.listen_addr,
                DEFAULT_LISTEN_ADDR
            );
        }

        match self.store_type.as_str() {
            "azure" => self.validate_azure()?,
            "file" => {
                let Some(path) = self.store_path.as_deref() else {
                    anyhow::bail!(
                        "IPDNS_STORE_PATH is required when IPDNS_STORE_TYPE=file. \
                        Set it via: export IPDNS_STORE_PATH=/var/lib/ipdns/records.json"
                    );
                };

                // Check parent directory exists
                if let Some(parent) = std::path::Path::new(path).parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    anyhow::bail!(
                        "IPDNS_STORE_PATH parent directory does not exist: {}. \
                        Create it first: sudo mkdir -p {}",
                        parent.display(),
                        parent.display()
                    );
                }
            }
            "memory" => {
                if self.zones.is_empty() {
                    anyhow::bail!(
                        "IPDNS_ZONES must list at least one zone when IPDNS_STORE_TYPE=memory. \
                        Set it via: export IPDNS_ZONES=example.com"
                    );
                }
            }
            _ => anyhow::bail!(
                "IPDNS_STORE_TYPE '{}' is not supported. \
                Supported types: azure, file, memory",
                self.store_type
            ),
        }

        for zone in &self.zones {
            validate_domain_name(zone)?;
        }

        if let Some(ttl) = self.default_ttl
            && !(1..=86400).contains(&ttl)
        {
            anyhow::bail!(
                "IPDNS_DEFAULT_TTL must be between 1 and 86400 seconds. Got: {}",
                ttl
            );
        }

        // Validate log level
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "IPDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn validate_azure(&self) -> Result<()> {
        let required = [
            ("IPDNS_AZURE_TENANT_ID", &self.azure_tenant_id),
            ("IPDNS_AZURE_SUBSCRIPTION_ID", &self.azure_subscription_id),
            ("IPDNS_AZURE_RESOURCE_GROUP", &self.azure_resource_group),
            ("IPDNS_AZURE_CLIENT_ID", &self.azure_client_id),
            ("IPDNS_AZURE_CLIENT_SECRET", &self.azure_client_secret),
        ];

        for (name, value) in required {
            if value.is_none() {
                anyhow::bail!("{} is required when IPDNS_STORE_TYPE=azure", name);
            }
        }

        if self
            .azure_client_secret
            .as_deref()
            .is_some_and(is_placeholder)
        {
            anyhow::bail!(
                "IPDNS_AZURE_CLIENT_SECRET appears to be a placeholder. \
                Use the service principal's actual secret."
            );
        }

        Ok(())
    }

    /// Build the gateway configuration
    ///
    /// Call [`Config::validate`] first; missing values are turned into empty
    /// strings that the core rejects.
    pub fn to_gateway_config(&self) -> GatewayConfig {
        let store = match self.store_type.as_str() {
            "file" => StoreConfig::File {
                path: self.store_path.clone().unwrap_or_default(),
                zones: self.zones.clone(),
            },
            "memory" => StoreConfig::Memory {
                zones: self.zones.clone(),
            },
            _ => StoreConfig::Azure {
                tenant_id: self.azure_tenant_id.clone().unwrap_or_default(),
                subscription_id: self.azure_subscription_id.clone().unwrap_or_default(),
                resource_group: self.azure_resource_group.clone().unwrap_or_default(),
                client_id: self.azure_client_id.clone().unwrap_or_default(),
                client_secret: self.azure_client_secret.clone().unwrap_or_default(),
            },
        };

        let mut engine = EngineConfig::default();
        if let Some(ttl) = self.default_ttl {
            engine.default_ttl_secs = ttl;
        }
        if let Some(claim_unowned) = self.claim_unowned {
            engine.claim_unowned = claim_unowned;
        }

        GatewayConfig::new(ClientIdentity::new(&self.client_id, &self.secret))
            .with_store(store)
            .with_engine(engine)
    }
}

fn parse_var<T: FromStr>(value: Option<String>, name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, v, e))
        })
        .transpose()
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower.contains("your_secret")
        || lower.contains("replace_me")
        || lower.contains("changeme")
        || lower == "secret"
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks; catches common typos in `IPDNS_ZONES`.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    fn memory_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("IPDNS_CLIENT_ID", "foo"),
            ("IPDNS_SECRET", "s3cr3t-value"),
            ("IPDNS_STORE_TYPE", "memory"),
            ("IPDNS_ZONES", "foo.bar, example.com"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = load(&memory_vars()).unwrap();

        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.zones, vec!["foo.bar", "example.com"]);
        assert!(config.validate().is_ok());

        let gateway = config.to_gateway_config();
        assert_eq!(gateway.store.type_name(), "memory");
        assert_eq!(gateway.engine.default_ttl_secs, 3600);
        assert!(gateway.validate().is_ok());
    }

    #[test]
    fn test_store_type_defaults_to_azure() {
        let config = load(&[("IPDNS_CLIENT_ID", "foo"), ("IPDNS_SECRET", "s3cr3t-value")]).unwrap();

        assert_eq!(config.store_type, "azure");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("IPDNS_AZURE_TENANT_ID"));
    }

    #[test]
    fn test_missing_identity() {
        let config = load(&[("IPDNS_STORE_TYPE", "memory"), ("IPDNS_ZONES", "foo.bar")]).unwrap();
        assert!(config.validate().unwrap_err().to_string().contains("IPDNS_CLIENT_ID"));
    }

    #[test]
    fn test_placeholder_secret_rejected() {
        let mut vars = memory_vars();
        vars[1] = ("IPDNS_SECRET", "REPLACE_ME");

        let config = load(&vars).unwrap();
        assert!(config.validate().unwrap_err().to_string().contains("placeholder"));
    }

    #[test]
    fn test_engine_overrides() {
        let mut vars = memory_vars();
        vars.push(("IPDNS_DEFAULT_TTL", "300"));
        vars.push(("IPDNS_CLAIM_UNOWNED", "false"));

        let gateway = load(&vars).unwrap().to_gateway_config();
        assert_eq!(gateway.engine.default_ttl_secs, 300);
        assert!(!gateway.engine.claim_unowned);
    }

    #[test]
    fn test_unparsable_numbers_are_errors() {
        let mut vars = memory_vars();
        vars.push(("IPDNS_DEFAULT_TTL", "one hour"));

        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_ttl_range() {
        let mut vars = memory_vars();
        vars.push(("IPDNS_DEFAULT_TTL", "0"));

        assert!(load(&vars).unwrap().validate().is_err());
    }

    #[test]
    fn test_invalid_zone_rejected() {
        let mut vars = memory_vars();
        vars[3] = ("IPDNS_ZONES", "foo..bar");

        assert!(load(&vars).unwrap().validate().is_err());
    }

    #[test]
    fn test_file_store_requires_path() {
        let mut vars = memory_vars();
        vars[2] = ("IPDNS_STORE_TYPE", "file");

        let err = load(&vars).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("IPDNS_STORE_PATH"));
    }

    #[test]
    fn test_azure_config() {
        let config = load(&[
            ("IPDNS_CLIENT_ID", "foo"),
            ("IPDNS_SECRET", "s3cr3t-value"),
            ("IPDNS_AZURE_TENANT_ID", "tenant"),
            ("IPDNS_AZURE_SUBSCRIPTION_ID", "sub"),
            ("IPDNS_AZURE_RESOURCE_GROUP", "rg"),
            ("IPDNS_AZURE_CLIENT_ID", "app"),
            ("IPDNS_AZURE_CLIENT_SECRET", "app-secret-value"),
        ])
        .unwrap();

        assert!(config.validate().is_ok());
        let gateway = config.to_gateway_config();
        assert_eq!(gateway.store.type_name(), "azure");
        assert!(!format!("{:?}", gateway).contains("app-secret-value"));
    }
}
