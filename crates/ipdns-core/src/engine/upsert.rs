//! Ownership-gated create-or-update of record sets
//!
//! For each address family present in a request, independently:
//!
//! 1. Fetch the record set `(zone, name, family)`
//! 2. Unclaimed: create it, tagged with the requesting client
//! 3. Claimed by the requesting client: replace its addresses
//! 4. Claimed by anybody else: refuse, no write
//!
//! Both families run concurrently and are not transactional. One family may
//! be written while the other fails; the [`UpdateReport`] says which.
//!
//! There is no compare-and-swap. Two clients racing on the same unclaimed
//! record set both read "unclaimed" and the last write wins.

use crate::error::{Error, Result};
use crate::traits::{AddressFamily, RecordSet, RecordSetKey, RecordStore};
use crate::validation::UpdateRequest;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

/// What the upserter did to a record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UpsertAction {
    /// The record set did not exist and was created
    Created,

    /// The requesting client already owned the record set
    Updated {
        /// Addresses held before the write
        previous: Vec<IpAddr>,
    },

    /// The record set existed without an owner tag and was claimed
    Claimed {
        /// Addresses held before the write
        previous: Vec<IpAddr>,
    },
}

/// Successful write of one record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertResult {
    /// Record set that was written
    pub key: RecordSetKey,
    /// Address now published
    pub address: IpAddr,
    /// What happened
    #[serde(flatten)]
    pub action: UpsertAction,
}

/// Outcome for one address family
pub type FamilyOutcome = Result<UpsertResult>;

/// Per-family outcomes of one update
///
/// A family is `None` when the request carried no address for it.
#[derive(Debug)]
pub struct UpdateReport {
    pub ipv4: Option<FamilyOutcome>,
    pub ipv6: Option<FamilyOutcome>,
}

impl UpdateReport {
    /// Outcome for `family`
    pub fn outcome(&self, family: AddressFamily) -> Option<&FamilyOutcome> {
        match family {
            AddressFamily::V4 => self.ipv4.as_ref(),
            AddressFamily::V6 => self.ipv6.as_ref(),
        }
    }

    /// Whether every attempted family was written
    pub fn is_success(&self) -> bool {
        self.outcomes().all(|(_, outcome)| outcome.is_ok())
    }

    /// First failure, IPv4 before IPv6
    pub fn first_error(&self) -> Option<&Error> {
        self.outcomes()
            .find_map(|(_, outcome)| outcome.as_ref().err())
    }

    /// Attempted families with their outcomes, IPv4 first
    pub fn outcomes(&self) -> impl Iterator<Item = (AddressFamily, &FamilyOutcome)> {
        let v4 = self.ipv4.as_ref().map(|o| (AddressFamily::V4, o));
        let v6 = self.ipv6.as_ref().map(|o| (AddressFamily::V6, o));
        v4.into_iter().chain(v6)
    }

    /// Collapse to a single result
    ///
    /// Fails with the first failure (IPv4 first) if any family failed, even
    /// when the other family was written.
    pub fn into_result(self) -> Result<Vec<UpsertResult>> {
        let mut written = Vec::new();
        for outcome in self.ipv4.into_iter().chain(self.ipv6) {
            written.push(outcome?);
        }
        Ok(written)
    }
}

/// Applies validated requests to the record store
pub struct Upserter {
    store: Arc<dyn RecordStore>,
    default_ttl_secs: u32,
    claim_unowned: bool,
}

impl Upserter {
    /// Create an upserter writing to `store`
    ///
    /// `default_ttl_secs` is used only when a record set is created or an
    /// untagged one is claimed.
    pub fn new(store: Arc<dyn RecordStore>, default_ttl_secs: u32, claim_unowned: bool) -> Self {
        Self {
            store,
            default_ttl_secs,
            claim_unowned,
        }
    }

    /// Apply `request`, one upsert per address family present
    ///
    /// Never fails as a whole; failures are reported per family.
    pub async fn apply(&self, request: &UpdateRequest) -> UpdateReport {
        let (ipv4, ipv6) = tokio::join!(
            self.apply_family(request, AddressFamily::V4),
            self.apply_family(request, AddressFamily::V6),
        );

        UpdateReport { ipv4, ipv6 }
    }

    async fn apply_family(
        &self,
        request: &UpdateRequest,
        family: AddressFamily,
    ) -> Option<FamilyOutcome> {
        let address = request.address(family)?;
        let key = request.record_set_key(family);

        Some(self.upsert(key, &request.credentials.client_id, address).await)
    }

    /// Fetch, check ownership, write
    async fn upsert(&self, key: RecordSetKey, client_id: &str, address: IpAddr) -> FamilyOutcome {
        let existing = self.store.fetch(&key).await?;

        let (record_set, action) = match existing {
            None => {
                debug!("Record set {} is unclaimed", key);
                (
                    RecordSet::claimed_by(client_id, self.default_ttl_secs, address),
                    UpsertAction::Created,
                )
            }
            Some(current) if current.is_owned_by(client_id) => {
                let record_set = RecordSet {
                    addresses: vec![address],
                    ..current.clone()
                };
                (record_set, UpsertAction::Updated {
                    previous: current.addresses,
                })
            }
            Some(current) if current.owner.is_none() && self.claim_unowned => {
                info!("Claiming record set {} without owner for '{}'", key, client_id);
                let record_set = RecordSet {
                    owner: Some(client_id.to_string()),
                    ttl: self.default_ttl_secs,
                    addresses: vec![address],
                };
                (record_set, UpsertAction::Claimed {
                    previous: current.addresses,
                })
            }
            Some(current) => {
                error!(
                    "Client '{}' is not authorized to update record set {} owned by '{}'",
                    client_id,
                    key,
                    current.owner.as_deref().unwrap_or("<none>")
                );
                return Err(Error::OwnershipConflict {
                    record_set_name: key.name,
                    requesting_client: client_id.to_string(),
                    current_owner: current.owner,
                });
            }
        };

        self.store.create_or_update(&key, &record_set).await?;
        info!("Record set {} -> {} ({:?})", key, address, action);

        Ok(UpsertResult {
            key,
            address,
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use crate::domain::Fqdn;
    use crate::store::MemoryRecordStore;

    fn request(ipv4: Option<&str>, ipv6: Option<&str>, client_id: &str) -> UpdateRequest {
        UpdateRequest {
            ipv4: ipv4.map(|ip| ip.parse().unwrap()),
            ipv6: ipv6.map(|ip| ip.parse().unwrap()),
            domain: Fqdn::parse("www.foo.bar").unwrap(),
            credentials: Credentials::new(client_id, "secret"),
            dual_stack: false,
        }
    }

    fn key(family: AddressFamily) -> RecordSetKey {
        RecordSetKey::new("foo.bar", "www", family)
    }

    #[tokio::test]
    async fn test_unclaimed_record_set_is_created() {
        let store = MemoryRecordStore::with_zones(["foo.bar"]);
        let upserter = Upserter::new(Arc::new(store.clone()), 3600, true);

        let report = upserter.apply(&request(Some("1.2.3.4"), None, "foo")).await;

        assert!(report.is_success());
        assert!(report.ipv6.is_none());
        let written = store.get(&key(AddressFamily::V4)).await.unwrap();
        assert_eq!(written.owner.as_deref(), Some("foo"));
        assert_eq!(written.ttl, 3600);
        assert_eq!(written.addresses, vec!["1.2.3.4".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_owner_update_keeps_ttl() {
        let store = MemoryRecordStore::with_zones(["foo.bar"]);
        store
            .insert(
                key(AddressFamily::V4),
                RecordSet::claimed_by("foo", 60, "5.6.7.8".parse().unwrap()),
            )
            .await;
        let upserter = Upserter::new(Arc::new(store.clone()), 3600, true);

        let mut written = upserter
            .apply(&request(Some("1.2.3.4"), None, "foo"))
            .await
            .into_result()
            .unwrap();

        let result = written.remove(0);
        assert_eq!(
            result.action,
            UpsertAction::Updated {
                previous: vec!["5.6.7.8".parse().unwrap()]
            }
        );
        let stored = store.get(&key(AddressFamily::V4)).await.unwrap();
        assert_eq!(stored.ttl, 60);
        assert_eq!(stored.owner.as_deref(), Some("foo"));
    }

    #[tokio::test]
    async fn test_unowned_record_set_follows_claim_setting() {
        let unowned = RecordSet {
            owner: None,
            ttl: 300,
            addresses: vec!["9.9.9.9".parse().unwrap()],
        };

        let store = MemoryRecordStore::with_zones(["foo.bar"]);
        store.insert(key(AddressFamily::V4), unowned.clone()).await;
        let strict = Upserter::new(Arc::new(store.clone()), 3600, false);

        let err = strict
            .apply(&request(Some("1.2.3.4"), None, "foo"))
            .await
            .into_result()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OwnershipConflict { current_owner: None, .. }
        ));
        assert_eq!(store.get(&key(AddressFamily::V4)).await, Some(unowned));

        let lenient = Upserter::new(Arc::new(store.clone()), 3600, true);
        let report = lenient.apply(&request(Some("1.2.3.4"), None, "foo")).await;
        assert!(matches!(
            report.ipv4,
            Some(Ok(UpsertResult {
                action: UpsertAction::Claimed { .. },
                ..
            }))
        ));
        let stored = store.get(&key(AddressFamily::V4)).await.unwrap();
        assert_eq!(stored.owner.as_deref(), Some("foo"));
        assert_eq!(stored.ttl, 3600, "a claim writes the default TTL");
    }

    #[tokio::test]
    async fn test_families_fail_independently() {
        let store = MemoryRecordStore::with_zones(["foo.bar"]);
        store
            .insert(
                key(AddressFamily::V6),
                RecordSet::claimed_by("baz", 3600, "::2".parse().unwrap()),
            )
            .await;
        let upserter = Upserter::new(Arc::new(store.clone()), 3600, true);

        let report = upserter
            .apply(&request(Some("1.2.3.4"), Some("::1"), "foo"))
            .await;

        assert!(!report.is_success());
        assert!(matches!(report.ipv4, Some(Ok(_))));
        assert!(matches!(
            report.first_error(),
            Some(Error::OwnershipConflict { .. })
        ));
        // IPv4 was written despite the IPv6 conflict
        assert!(store.get(&key(AddressFamily::V4)).await.is_some());
    }
}
