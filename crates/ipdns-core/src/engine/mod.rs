//! Core update engine
//!
//! The UpdateEngine is responsible for:
//! - Decoding the client's credentials
//! - Validating the requested update against the configured identity
//! - Running the ownership-gated upsert per address family
//! - Emitting events for monitoring/auditing
//!
//! ## Architecture
//!
//! ```text
//!  Authorization header + UpdateFields
//!                 │
//!                 ▼
//!        ┌─────────────────┐
//!        │   Credentials   │── MissingCredentials / UnsupportedScheme / Malformed
//!        └─────────────────┘
//!                 │
//!                 ▼
//!        ┌─────────────────┐
//!        │RequestValidator │── ValidationFailed (zone lookup via RecordStore)
//!        └─────────────────┘
//!                 │ UpdateRequest
//!                 ▼
//!        ┌─────────────────┐
//!        │    Upserter     │── per family: fetch → ownership check → write
//!        └─────────────────┘
//!            │         │
//!            ▼         ▼
//!      ┌─────────────────────┐    ┌─────────────┐
//!      │     RecordStore     │    │   Events    │
//!      └─────────────────────┘    └─────────────┘
//! ```
//!
//! ## Request Flow
//!
//! 1. Authorization header decoded to `client_id:secret`
//! 2. Fields validated, every violation collected
//! 3. IPv4 and IPv6 upserted concurrently
//! 4. Events emitted, per-family report returned

mod upsert;

pub use upsert::{FamilyOutcome, UpdateReport, UpsertAction, UpsertResult, Upserter};

use crate::config::GatewayConfig;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::traits::{AddressFamily, RecordSetKey, RecordStore};
use crate::validation::{RequestValidator, UpdateFields, UpdateRequest};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Events emitted by the UpdateEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Request authenticated and validated
    UpdateAccepted {
        domain: String,
        client_id: String,
        families: Vec<AddressFamily>,
    },

    /// Request refused before any record set was touched
    UpdateRejected {
        /// Target domain, if the client supplied one
        domain: Option<String>,
        /// Stable error code (see [`Error::kind`])
        reason: &'static str,
        /// Human readable detail
        detail: String,
    },

    /// Record set created or updated
    RecordSetWritten {
        key: RecordSetKey,
        client_id: String,
        address: IpAddr,
        action: UpsertAction,
    },

    /// Write refused because another client owns the record set
    OwnershipConflict {
        key: RecordSetKey,
        requesting_client: String,
        current_owner: Option<String>,
    },

    /// Record store failed while handling one family
    StoreFailed {
        key: RecordSetKey,
        error: String,
    },
}

/// Core update engine
///
/// Stateless between requests: the record store is the only source of
/// truth. One engine serves any number of concurrent requests; wrap it in an
/// `Arc` to share it between tasks.
///
/// ## Lifecycle
///
/// 1. Create with [`UpdateEngine::new()`]
/// 2. Call [`UpdateEngine::process()`] once per client request
/// 3. Drain the event receiver for monitoring
pub struct UpdateEngine {
    store: Arc<dyn RecordStore>,
    validator: RequestValidator,
    upserter: Upserter,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl UpdateEngine {
    /// Create a new update engine
    ///
    /// # Parameters
    ///
    /// - `store`: Record store implementation
    /// - `config`: Gateway configuration (validated here)
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        store: Arc<dyn RecordStore>,
        config: GatewayConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            upserter: Upserter::new(
                store.clone(),
                config.engine.default_ttl_secs,
                config.engine.claim_unowned,
            ),
            validator: RequestValidator::new(config.identity),
            store,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Record store backing this engine
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Handle one update request
    ///
    /// # Parameters
    ///
    /// - `authorization`: Raw `Authorization` header value, `None` if absent
    /// - `fields`: Raw request fields
    ///
    /// # Returns
    ///
    /// - `Ok(report)`: Request was valid; the report holds one outcome per
    ///   family, any of which may have failed
    /// - `Err(Error)`: Authentication or validation failed, or the zone
    ///   lookup could not reach the store. Nothing was written.
    pub async fn process(
        &self,
        authorization: Option<&str>,
        fields: &UpdateFields,
    ) -> Result<UpdateReport> {
        let request = match self.authenticate_and_validate(authorization, fields).await {
            Ok(request) => request,
            Err(e) => {
                self.emit_event(EngineEvent::UpdateRejected {
                    domain: fields.domain.clone(),
                    reason: e.kind(),
                    detail: e.to_string(),
                });
                return Err(e);
            }
        };

        debug!(
            "Accepted update of {} from '{}' (dual stack: {})",
            request.domain, request.credentials.client_id, request.dual_stack
        );
        self.emit_event(EngineEvent::UpdateAccepted {
            domain: request.domain.to_string(),
            client_id: request.credentials.client_id.clone(),
            families: request
                .addresses()
                .iter()
                .map(AddressFamily::of)
                .collect(),
        });

        let report = self.upserter.apply(&request).await;

        for (family, outcome) in report.outcomes() {
            self.emit_outcome(&request, family, outcome);
        }

        Ok(report)
    }

    async fn authenticate_and_validate(
        &self,
        authorization: Option<&str>,
        fields: &UpdateFields,
    ) -> Result<UpdateRequest> {
        let credentials = Credentials::from_authorization(authorization)?;
        self.validator
            .validate(fields, credentials, self.store.as_ref())
            .await
    }

    fn emit_outcome(&self, request: &UpdateRequest, family: AddressFamily, outcome: &FamilyOutcome) {
        let event = match outcome {
            Ok(result) => EngineEvent::RecordSetWritten {
                key: result.key.clone(),
                client_id: request.credentials.client_id.clone(),
                address: result.address,
                action: result.action.clone(),
            },
            Err(Error::OwnershipConflict {
                requesting_client,
                current_owner,
                ..
            }) => EngineEvent::OwnershipConflict {
                key: request.record_set_key(family),
                requesting_client: requesting_client.clone(),
                current_owner: current_owner.clone(),
            },
            Err(e) => EngineEvent::StoreFailed {
                key: request.record_set_key(family),
                error: e.to_string(),
            },
        };

        self.emit_event(event);
    }

    /// Emit an engine event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: EngineEvent) {
        // Send event, logging warning if channel is full (backpressure)
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientIdentity, StoreConfig};
    use crate::store::MemoryRecordStore;

    fn engine(store: MemoryRecordStore) -> (UpdateEngine, mpsc::Receiver<EngineEvent>) {
        let config = GatewayConfig::new(ClientIdentity::new("foo", "bar")).with_store(
            StoreConfig::Memory {
                zones: vec!["foo.bar".to_string()],
            },
        );
        UpdateEngine::new(Arc::new(store), config).unwrap()
    }

    #[tokio::test]
    async fn test_accepted_update_emits_events() {
        let (engine, mut events) = engine(MemoryRecordStore::with_zones(["foo.bar"]));
        let fields = UpdateFields::from_pairs([("ipv4", "1.2.3.4"), ("fqdn", "www.foo.bar")]);

        let report = engine
            .process(Some("Basic Zm9vOmJhcg=="), &fields)
            .await
            .unwrap();
        assert!(report.is_success());

        assert_eq!(
            events.recv().await,
            Some(EngineEvent::UpdateAccepted {
                domain: "www.foo.bar".to_string(),
                client_id: "foo".to_string(),
                families: vec![AddressFamily::V4],
            })
        );
        assert!(matches!(
            events.recv().await,
            Some(EngineEvent::RecordSetWritten {
                action: UpsertAction::Created,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_rejection_emits_event_with_reason() {
        let (engine, mut events) = engine(MemoryRecordStore::with_zones(["foo.bar"]));
        let fields = UpdateFields::from_pairs([("ipv4", "1.2.3.4"), ("fqdn", "www.foo.bar")]);

        let err = engine.process(None, &fields).await.unwrap_err();
        assert!(matches!(err, Error::MissingCredentials));

        match events.recv().await {
            Some(EngineEvent::UpdateRejected { domain, reason, .. }) => {
                assert_eq!(domain.as_deref(), Some("www.foo.bar"));
                assert_eq!(reason, "missing_credentials");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = GatewayConfig::new(ClientIdentity::new("", "bar"));
        assert!(UpdateEngine::new(Arc::new(MemoryRecordStore::new()), config).is_err());
    }
}
