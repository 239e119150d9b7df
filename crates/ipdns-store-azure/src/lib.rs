// # Azure DNS Record Store
//
// This crate provides an Azure DNS implementation of `RecordStore`.
//
// ## Behavior
//
// - Owner tag kept in record set metadata under the `Owner` key
// - One HTTP request per store call (plus a token request when the cached
//   token is about to expire)
// - Full error propagation to the engine; no retry, no backoff
// - HTTP timeout configured (30 seconds)
// - 404 on a record set or zone is an answer, not an error
// - Dry-run mode: reads go to Azure, writes are only logged
//
// ## Security Requirements
//
// - Client secret and access tokens NEVER appear in logs
// - Store MUST fail fast if any credential is empty
//
// ## API Reference
//
// - Token: POST `https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token`
// - Get zone: GET `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/dnsZones/{zone}`
// - Get record set: GET `.../dnsZones/{zone}/{A|AAAA}/{name}`
// - Create or update record set: PUT `.../dnsZones/{zone}/{A|AAAA}/{name}`

pub mod models;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ipdns_core::config::StoreConfig;
use ipdns_core::registry::StoreRegistry;
use ipdns_core::traits::{
    DEFAULT_TTL_SECS, RecordSet, RecordSetKey, RecordStore, RecordStoreFactory,
};
use ipdns_core::{Error, Result};
use models::{AzureRecordSet, TokenResponse};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Azure Resource Manager endpoint
pub const MANAGEMENT_BASE: &str = "https://management.azure.com";

/// Azure AD endpoint
pub const LOGIN_BASE: &str = "https://login.microsoftonline.com";

/// DNS API version
const API_VERSION: &str = "2018-05-01";

/// OAuth2 scope for Resource Manager
const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Tokens are renewed this long before they expire
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Store name used in errors and logs
const STORE_NAME: &str = "azure";

/// Service principal credentials
#[derive(Clone)]
pub struct ServicePrincipal {
    pub tenant_id: String,
    pub client_id: String,
    /// ⚠️ NEVER log this value
    pub client_secret: String,
}

// Custom Debug implementation that hides the client secret
impl std::fmt::Debug for ServicePrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePrincipal")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<REDACTED>")
            .finish()
    }
}

/// Cached bearer token
#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(TOKEN_EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Azure DNS record store
///
/// Stateless apart from the cached access token. All coordination is owned
/// by the update engine.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the store will:
/// - Perform all GET requests (zone lookup, record set lookup)
/// - Log the intended PUT payload
/// - **NOT** actually modify DNS records
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the client secret
/// or the cached token.
pub struct AzureDnsStore {
    principal: ServicePrincipal,
    subscription_id: String,
    resource_group: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    login_base: String,
    management_base: String,

    /// Dry-run mode: if true, perform GET requests but skip PUT updates
    dry_run: bool,

    token: Mutex<Option<AccessToken>>,
}

// Custom Debug implementation that hides credentials
impl std::fmt::Debug for AzureDnsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDnsStore")
            .field("principal", &self.principal)
            .field("subscription_id", &self.subscription_id)
            .field("resource_group", &self.resource_group)
            .field("management_base", &self.management_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl AzureDnsStore {
    /// Create a new Azure DNS store
    ///
    /// # Parameters
    ///
    /// - `principal`: Service principal with DNS Zone Contributor rights
    /// - `subscription_id`: Subscription holding the zones
    /// - `resource_group`: Resource group holding the zones
    /// - `dry_run`: If true, perform GET requests but skip PUT updates
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if any value is empty or the HTTP client cannot be
    /// built.
    pub fn new(
        principal: ServicePrincipal,
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let subscription_id = subscription_id.into();
        let resource_group = resource_group.into();

        let required = [
            ("tenant_id", &principal.tenant_id),
            ("client_id", &principal.client_id),
            ("client_secret", &principal.client_secret),
            ("subscription_id", &subscription_id),
            ("resource_group", &resource_group),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(Error::config(format!("Azure {} cannot be empty", name)));
            }
        }

        // Build HTTP client with timeout
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            principal,
            subscription_id,
            resource_group,
            client,
            login_base: LOGIN_BASE.to_string(),
            management_base: MANAGEMENT_BASE.to_string(),
            dry_run,
            token: Mutex::new(None),
        })
    }

    /// Point the store at different Azure AD / Resource Manager hosts
    ///
    /// Used for sovereign clouds and local test servers.
    pub fn with_endpoints(
        mut self,
        login_base: impl Into<String>,
        management_base: impl Into<String>,
    ) -> Self {
        self.login_base = login_base.into().trim_end_matches('/').to_string();
        self.management_base = management_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn zone_url(&self, zone: &str) -> Result<Url> {
        self.dns_zones_url(&[zone])
    }

    fn record_set_url(&self, key: &RecordSetKey) -> Result<Url> {
        self.dns_zones_url(&[&key.zone, key.family.record_type(), &key.name])
    }

    /// `.../dnsZones/{segments}?api-version=...`, each segment percent-encoded
    fn dns_zones_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.management_base).map_err(|e| {
            Error::config(format!(
                "Invalid Azure management endpoint {}: {}",
                self.management_base, e
            ))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                Error::config(format!(
                    "Azure management endpoint cannot hold a path: {}",
                    self.management_base
                ))
            })?
            .pop_if_empty()
            .extend([
                "subscriptions",
                self.subscription_id.as_str(),
                "resourceGroups",
                self.resource_group.as_str(),
                "providers",
                "Microsoft.Network",
                "dnsZones",
            ])
            .extend(segments);

        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    /// Get a bearer token, requesting a new one if the cached one is stale
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /{tenant}/oauth2/v2.0/token
    /// Content-Type: application/x-www-form-urlencoded
    ///
    /// grant_type=client_credentials&client_id=...&client_secret=...&scope=...
    /// ```
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Requesting Azure AD token for client {}", self.principal.client_id);

        let url = format!("{}/{}/oauth2/v2.0/token", self.login_base, self.principal.tenant_id);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.principal.client_id.as_str()),
            ("client_secret", self.principal.client_secret.as_str()),
            ("scope", MANAGEMENT_SCOPE),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| unavailable(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error("Token request", response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse token response: {}", e)))?;

        let value = token.access_token;
        *cached = Some(AccessToken {
            value: value.clone(),
            expires_at: Utc::now() + ChronoDuration::seconds(token.expires_in),
        });

        Ok(value)
    }

    /// GET a resource, `None` on 404
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        operation: &str,
    ) -> Result<Option<T>> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| unavailable(format!("HTTP request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(status_error(operation, response).await);
        }

        let body = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse {} response: {}", operation, e)))?;

        Ok(Some(body))
    }
}

#[async_trait]
impl RecordStore for AzureDnsStore {
    /// Fetch a record set
    ///
    /// # API Call
    ///
    /// ```http
    /// GET .../dnsZones/foo.bar/A/www?api-version=2018-05-01
    /// Authorization: Bearer <token>
    /// ```
    async fn fetch(&self, key: &RecordSetKey) -> Result<Option<RecordSet>> {
        tracing::debug!("Fetching Azure record set {}", key);

        let record_set: Option<AzureRecordSet> =
            self.get_json(self.record_set_url(key)?, "Record set lookup").await?;

        Ok(record_set.map(|r| r.into_record_set(key.family, DEFAULT_TTL_SECS)))
    }

    /// Create or replace a record set
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT .../dnsZones/foo.bar/A/www?api-version=2018-05-01
    /// Authorization: Bearer <token>
    ///
    /// { "properties": { "metadata": { "Owner": "foo" }, "TTL": 3600,
    ///                   "ARecords": [ { "ipv4Address": "1.2.3.4" } ] } }
    /// ```
    async fn create_or_update(&self, key: &RecordSetKey, record_set: &RecordSet) -> Result<()> {
        let url = self.record_set_url(key)?;
        let body = AzureRecordSet::from_record_set(key.family, record_set);

        // In dry-run mode, log the intended update and return success
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(&body)?
            );
            return Ok(());
        }

        let token = self.access_token().await?;

        let response = self
            .client
            .put(url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| unavailable(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error("Record set update", response).await);
        }

        tracing::info!("Azure record set {} written", key);
        Ok(())
    }

    /// Check that a zone exists
    ///
    /// # API Call
    ///
    /// ```http
    /// GET .../dnsZones/foo.bar?api-version=2018-05-01
    /// Authorization: Bearer <token>
    /// ```
    async fn zone_exists(&self, zone: &str) -> Result<bool> {
        let found: Option<serde_json::Value> =
            self.get_json(self.zone_url(zone)?, "Zone lookup").await?;

        tracing::debug!("Azure zone {} exists: {}", zone, found.is_some());
        Ok(found.is_some())
    }

    fn store_name(&self) -> &'static str {
        STORE_NAME
    }
}

fn unavailable(message: impl Into<String>) -> Error {
    Error::store_unavailable(STORE_NAME, message)
}

/// Map a non-success response to a store error
async fn status_error(operation: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    match status.as_u16() {
        401 | 403 => unavailable(format!(
            "{} failed: Authentication failed or insufficient permissions. Status: {}",
            operation, status
        )),
        412 => unavailable(format!(
            "{} failed: Record set was modified concurrently. Status: {}",
            operation, status
        )),
        429 => unavailable(format!(
            "{} failed: Rate limit exceeded. Status: {}",
            operation, status
        )),
        500..=599 => unavailable(format!(
            "{} failed: Azure server error (transient): {} - {}",
            operation, status, error_text
        )),
        _ => unavailable(format!("{} failed: {} - {}", operation, status, error_text)),
    }
}

/// Factory for creating Azure DNS stores
pub struct AzureDnsStoreFactory;

#[async_trait]
impl RecordStoreFactory for AzureDnsStoreFactory {
    async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
        match config {
            StoreConfig::Azure {
                tenant_id,
                subscription_id,
                resource_group,
                client_id,
                client_secret,
            } => {
                // Check for dry-run mode environment variable
                let dry_run = std::env::var("IPDNS_MODE")
                    .unwrap_or_default()
                    .eq_ignore_ascii_case("dry-run");

                if dry_run {
                    tracing::warn!("Azure DNS store running in DRY-RUN mode - no changes will be made");
                }

                let principal = ServicePrincipal {
                    tenant_id: tenant_id.clone(),
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                };

                Ok(Arc::new(AzureDnsStore::new(
                    principal,
                    subscription_id.clone(),
                    resource_group.clone(),
                    dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Azure DNS store")),
        }
    }
}

/// Register the Azure DNS store with a registry
///
/// # Example
///
/// ```rust
/// use ipdns_core::StoreRegistry;
///
/// let registry = StoreRegistry::with_builtin_stores();
/// ipdns_store_azure::register(&registry);
/// assert!(registry.has_store("azure"));
/// ```
pub fn register(registry: &StoreRegistry) {
    registry.register_store(STORE_NAME, Box::new(AzureDnsStoreFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipdns_core::traits::AddressFamily;

    fn principal() -> ServicePrincipal {
        ServicePrincipal {
            tenant_id: "tenant".to_string(),
            client_id: "app".to_string(),
            client_secret: "secret_value_12345".to_string(),
        }
    }

    fn store(dry_run: bool) -> AzureDnsStore {
        AzureDnsStore::new(principal(), "sub", "rg", dry_run).unwrap()
    }

    #[test]
    fn test_empty_values_are_rejected() {
        let mut missing_secret = principal();
        missing_secret.client_secret.clear();

        assert!(AzureDnsStore::new(missing_secret, "sub", "rg", false).is_err());
        assert!(AzureDnsStore::new(principal(), "sub", "", false).is_err());
    }

    #[test]
    fn test_urls() {
        let store = store(false);
        let key = RecordSetKey::new("foo.bar", "www", AddressFamily::V6);

        assert_eq!(
            store.record_set_url(&key).unwrap().as_str(),
            "https://management.azure.com/subscriptions/sub/resourceGroups/rg/providers/\
             Microsoft.Network/dnsZones/foo.bar/AAAA/www?api-version=2018-05-01"
        );
        assert_eq!(
            store.zone_url("foo.bar").unwrap().as_str(),
            "https://management.azure.com/subscriptions/sub/resourceGroups/rg/providers/\
             Microsoft.Network/dnsZones/foo.bar?api-version=2018-05-01"
        );
    }

    #[test]
    fn test_endpoints_override() {
        let store = store(false).with_endpoints("http://127.0.0.1:1/", "http://127.0.0.1:2/");
        assert!(
            store
                .zone_url("z")
                .unwrap()
                .as_str()
                .starts_with("http://127.0.0.1:2/subscriptions/")
        );
    }

    #[test]
    fn test_url_segments_are_encoded() {
        let store = store(false);
        let key = RecordSetKey::new("foo.bar/A/other", "www?x#y", AddressFamily::V4);

        let url = store.record_set_url(&key).unwrap();
        assert!(url.path().ends_with("/dnsZones/foo.bar%2FA%2Fother/A/www%3Fx%23y"));
        assert_eq!(url.query(), Some("api-version=2018-05-01"));
        assert_eq!(url.fragment(), None);

        let zone = store.zone_url("foo.bar/A/other").unwrap();
        assert!(zone.path().ends_with("/dnsZones/foo.bar%2FA%2Fother"));
        assert_eq!(zone.query(), Some("api-version=2018-05-01"));
    }

    #[test]
    fn test_token_freshness_margin() {
        let now = Utc::now();
        let token = |secs| AccessToken {
            value: "t".to_string(),
            expires_at: now + ChronoDuration::seconds(secs),
        };

        assert!(token(3600).is_fresh(now));
        assert!(!token(30).is_fresh(now));
        assert!(!token(-1).is_fresh(now));
    }

    #[test]
    fn test_secret_not_exposed_in_debug() {
        let debug_str = format!("{:?}", store(false));

        assert!(!debug_str.contains("secret_value_12345"));
        assert!(debug_str.contains("AzureDnsStore"));
    }

    #[tokio::test]
    async fn test_dry_run_write_sends_nothing() {
        // Unroutable endpoints: any request would fail
        let store = store(true).with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9");
        let key = RecordSetKey::new("foo.bar", "www", AddressFamily::V4);
        let record_set = RecordSet::claimed_by("foo", 3600, "1.2.3.4".parse().unwrap());

        assert!(store.create_or_update(&key, &record_set).await.is_ok());
    }

    #[tokio::test]
    async fn test_factory() {
        let config = StoreConfig::Azure {
            tenant_id: "tenant".to_string(),
            subscription_id: "sub".to_string(),
            resource_group: "rg".to_string(),
            client_id: "app".to_string(),
            client_secret: "secret".to_string(),
        };
        let store = AzureDnsStoreFactory.create(&config).await.unwrap();
        assert_eq!(store.store_name(), "azure");

        let wrong = AzureDnsStoreFactory
            .create(&StoreConfig::Memory { zones: vec![] })
            .await;
        assert!(wrong.is_err());
    }

    #[test]
    fn test_register() {
        let registry = StoreRegistry::new();
        register(&registry);
        assert!(registry.has_store("azure"));
    }
}
