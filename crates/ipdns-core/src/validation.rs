//! Update request validation
//!
//! [`RequestValidator`] turns raw client fields into an [`UpdateRequest`].
//! Every rule is evaluated and every violation is reported, so a client can
//! fix all of them in one round trip.
//!
//! ## Rules
//!
//! | Field | Rule | When |
//! |---|---|---|
//! | `ipv4` / `ipv6` | `required` | both addresses are blank (reported on each) |
//! | `ipv4` / `ipv6` | `invalid_address` | non-blank and not a literal of that family |
//! | `domain` | `required` | blank |
//! | `domain` | `invalid_domain` | fewer than two labels, or a label that is not RFC 1035 host syntax |
//! | `domain` | `zone_not_found` | zone lookup in the record store says no |
//! | `client_id` / `secret` | `required` | empty |
//! | `client_id` / `secret` | `mismatch` | differs from the configured identity |

use crate::config::ClientIdentity;
use crate::credentials::Credentials;
use crate::domain::{Fqdn, FqdnError};
use crate::error::{Error, Result};
use crate::traits::{AddressFamily, RecordSetKey, RecordStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

/// Query parameter carrying the IPv4 address
pub const IPV4_PARAMETER: &str = "ipv4";
/// Query parameter carrying the IPv6 address
pub const IPV6_PARAMETER: &str = "ipv6";
/// Query parameter carrying the target domain
pub const DOMAIN_PARAMETER: &str = "fqdn";
/// Query parameter carrying the dual-stack flag
pub const DUAL_STACK_PARAMETER: &str = "ds";

/// Raw fields supplied by the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFields {
    /// IPv4 address, dotted decimal
    #[serde(default)]
    pub ipv4: Option<String>,
    /// IPv6 address, colon hex
    #[serde(default)]
    pub ipv6: Option<String>,
    /// Target domain
    #[serde(default, rename = "fqdn")]
    pub domain: Option<String>,
    /// Dual-stack flag, `"1"` means both families are expected
    #[serde(default, rename = "ds")]
    pub dual_stack: Option<String>,
}

impl UpdateFields {
    /// Collect fields from query-string style key/value pairs
    ///
    /// Unknown keys are ignored. A repeated key keeps its last value.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut fields = Self::default();
        for (key, value) in pairs {
            let slot = match key {
                IPV4_PARAMETER => &mut fields.ipv4,
                IPV6_PARAMETER => &mut fields.ipv6,
                DOMAIN_PARAMETER => &mut fields.domain,
                DUAL_STACK_PARAMETER => &mut fields.dual_stack,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        fields
    }

    /// Whether the client flagged the request as dual stack
    pub fn is_dual_stack(&self) -> bool {
        self.dual_stack.as_deref() == Some("1")
    }
}

/// A validated update, the unit of work for one client call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// IPv4 address to publish
    pub ipv4: Option<Ipv4Addr>,
    /// IPv6 address to publish
    pub ipv6: Option<Ipv6Addr>,
    /// Target domain
    pub domain: Fqdn,
    /// Credentials the client presented
    pub credentials: Credentials,
    /// Informational dual-stack flag
    pub dual_stack: bool,
}

impl UpdateRequest {
    /// Addresses to publish, IPv4 first
    pub fn addresses(&self) -> Vec<IpAddr> {
        let v4 = self.ipv4.map(IpAddr::V4);
        let v6 = self.ipv6.map(IpAddr::V6);
        v4.into_iter().chain(v6).collect()
    }

    /// Address requested for `family`, if any
    pub fn address(&self, family: AddressFamily) -> Option<IpAddr> {
        match family {
            AddressFamily::V4 => self.ipv4.map(IpAddr::V4),
            AddressFamily::V6 => self.ipv6.map(IpAddr::V6),
        }
    }

    /// Record set this request targets for `family`
    pub fn record_set_key(&self, family: AddressFamily) -> RecordSetKey {
        RecordSetKey::new(self.domain.zone_name(), self.domain.record_set_name(), family)
    }
}

/// Field a violation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Ipv4,
    Ipv6,
    Domain,
    ClientId,
    Secret,
}

impl Field {
    /// Stable field code
    pub fn code(&self) -> &'static str {
        match self {
            Field::Ipv4 => "ipv4",
            Field::Ipv6 => "ipv6",
            Field::Domain => "domain",
            Field::ClientId => "client_id",
            Field::Secret => "secret",
        }
    }
}

/// Rule a field violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Required,
    InvalidAddress,
    InvalidDomain,
    Mismatch,
    ZoneNotFound,
}

impl Rule {
    /// Stable rule code
    pub fn code(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::InvalidAddress => "invalid_address",
            Rule::InvalidDomain => "invalid_domain",
            Rule::Mismatch => "mismatch",
            Rule::ZoneNotFound => "zone_not_found",
        }
    }
}

/// One failed rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    pub field: Field,
    pub rule: Rule,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field.code(), self.rule.code())
    }
}

/// All violations found in one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Record a violation
    pub fn push(&mut self, field: Field, rule: Rule) {
        self.violations.push(Violation { field, rule });
    }

    /// Whether no rule failed
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether `field` failed `rule`
    pub fn contains(&self, field: Field, rule: Rule) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.rule == rule)
    }

    /// Whether the zone lookup failed
    pub fn is_zone_not_found(&self) -> bool {
        self.contains(Field::Domain, Rule::ZoneNotFound)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<String> = self.violations.iter().map(Violation::to_string).collect();
        f.write_str(&codes.join(", "))
    }
}

/// Validates raw update fields against the configured identity and the store
#[derive(Debug, Clone)]
pub struct RequestValidator {
    expected: ClientIdentity,
}

impl RequestValidator {
    /// Create a validator for the configured identity
    pub fn new(expected: ClientIdentity) -> Self {
        Self { expected }
    }

    /// Validate `fields` presented with `credentials`
    ///
    /// The zone lookup is the only remote call. It runs whenever the domain
    /// is structurally valid, regardless of other violations.
    ///
    /// # Errors
    ///
    /// - [`Error::ValidationFailed`]: at least one rule failed
    /// - [`Error::StoreUnavailable`]: the zone lookup itself failed
    pub async fn validate(
        &self,
        fields: &UpdateFields,
        credentials: Credentials,
        store: &dyn RecordStore,
    ) -> Result<UpdateRequest> {
        let mut report = ValidationReport::default();

        let ipv4_raw = non_blank(fields.ipv4.as_deref());
        let ipv6_raw = non_blank(fields.ipv6.as_deref());

        if ipv4_raw.is_none() && ipv6_raw.is_none() {
            report.push(Field::Ipv4, Rule::Required);
            report.push(Field::Ipv6, Rule::Required);
        }

        let ipv4 = ipv4_raw.and_then(|raw| {
            let parsed = raw.parse::<Ipv4Addr>().ok();
            if parsed.is_none() {
                report.push(Field::Ipv4, Rule::InvalidAddress);
            }
            parsed
        });

        let ipv6 = ipv6_raw.and_then(|raw| {
            let parsed = raw.parse::<Ipv6Addr>().ok();
            if parsed.is_none() {
                report.push(Field::Ipv6, Rule::InvalidAddress);
            }
            parsed
        });

        let domain = match Fqdn::parse(fields.domain.as_deref().unwrap_or_default().trim()) {
            Ok(domain) => Some(domain),
            Err(FqdnError::Empty) => {
                report.push(Field::Domain, Rule::Required);
                None
            }
            Err(e) => {
                debug!("Rejecting domain {:?}: {}", fields.domain, e);
                report.push(Field::Domain, Rule::InvalidDomain);
                None
            }
        };

        self.check_identity(&credentials, &mut report);

        if let Some(ref domain) = domain {
            let zone = domain.zone_name();
            if !store.zone_exists(zone).await? {
                debug!("Zone {} not found in {} store", zone, store.store_name());
                report.push(Field::Domain, Rule::ZoneNotFound);
            }
        }

        match domain {
            Some(domain) if report.is_empty() => Ok(UpdateRequest {
                ipv4,
                ipv6,
                domain,
                credentials,
                dual_stack: fields.is_dual_stack(),
            }),
            _ => {
                warn!("Update request rejected: {}", report);
                Err(Error::ValidationFailed(report))
            }
        }
    }

    fn check_identity(&self, credentials: &Credentials, report: &mut ValidationReport) {
        let checks = [
            (Field::ClientId, &credentials.client_id, &self.expected.client_id),
            (Field::Secret, &credentials.secret, &self.expected.secret),
        ];

        for (field, presented, expected) in checks {
            if presented.is_empty() {
                report.push(field, Rule::Required);
            } else if !bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
                report.push(field, Rule::Mismatch);
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;

    fn validator() -> RequestValidator {
        RequestValidator::new(ClientIdentity::new("client", "secret"))
    }

    fn fields(ipv4: Option<&str>, ipv6: Option<&str>, domain: Option<&str>) -> UpdateFields {
        UpdateFields {
            ipv4: ipv4.map(String::from),
            ipv6: ipv6.map(String::from),
            domain: domain.map(String::from),
            dual_stack: None,
        }
    }

    fn report_of(result: Result<UpdateRequest>) -> ValidationReport {
        match result {
            Err(Error::ValidationFailed(report)) => report,
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_valid_request() {
        let store = MemoryRecordStore::with_zones(["foo.bar"]);
        let request = validator()
            .validate(
                &fields(Some("1.2.3.4"), Some("::1"), Some("www.foo.bar")),
                Credentials::new("client", "secret"),
                &store,
            )
            .await
            .unwrap();

        assert_eq!(request.ipv4, Some(Ipv4Addr::new(1, 2, 3, 4)));
        assert_eq!(request.ipv6, Some(Ipv6Addr::LOCALHOST));
        assert_eq!(request.domain.zone_name(), "foo.bar");
        assert!(!request.dual_stack);
    }

    #[tokio::test]
    async fn test_addresses_are_trimmed() {
        let store = MemoryRecordStore::with_zones(["foo.bar"]);
        let request = validator()
            .validate(
                &fields(Some(" 1.2.3.4 "), Some("  "), Some("www.foo.bar")),
                Credentials::new("client", "secret"),
                &store,
            )
            .await
            .unwrap();

        assert_eq!(request.addresses(), vec!["1.2.3.4".parse::<IpAddr>().unwrap()]);
        assert_eq!(request.ipv6, None);
    }

    #[tokio::test]
    async fn test_both_addresses_missing() {
        let store = MemoryRecordStore::with_zones(["foo.bar"]);
        let report = report_of(
            validator()
                .validate(
                    &fields(None, Some(""), Some("www.foo.bar")),
                    Credentials::new("client", "secret"),
                    &store,
                )
                .await,
        );

        assert!(report.contains(Field::Ipv4, Rule::Required));
        assert!(report.contains(Field::Ipv6, Rule::Required));
    }

    #[tokio::test]
    async fn test_address_family_is_enforced() {
        let store = MemoryRecordStore::with_zones(["foo.bar"]);
        let report = report_of(
            validator()
                .validate(
                    &fields(Some("::1"), Some("1.2.3.4"), Some("www.foo.bar")),
                    Credentials::new("client", "secret"),
                    &store,
                )
                .await,
        );

        assert!(report.contains(Field::Ipv4, Rule::InvalidAddress));
        assert!(report.contains(Field::Ipv6, Rule::InvalidAddress));
        assert_eq!(report.violations.len(), 2);
    }

    #[tokio::test]
    async fn test_all_violations_are_accumulated() {
        let store = MemoryRecordStore::new();
        let report = report_of(
            validator()
                .validate(
                    &fields(Some("v4"), None, Some("domain.local")),
                    Credentials::new("other", ""),
                    &store,
                )
                .await,
        );

        assert!(report.contains(Field::Ipv4, Rule::InvalidAddress));
        assert!(report.contains(Field::ClientId, Rule::Mismatch));
        assert!(report.contains(Field::Secret, Rule::Required));
        assert!(report.is_zone_not_found());
        assert_eq!(
            report.to_string(),
            "ipv4:invalid_address, client_id:mismatch, secret:required, domain:zone_not_found"
        );
    }

    #[tokio::test]
    async fn test_single_label_domain_skips_zone_lookup() {
        let store = MemoryRecordStore::new();
        let report = report_of(
            validator()
                .validate(
                    &fields(Some("1.2.3.4"), None, Some("domain")),
                    Credentials::new("client", "secret"),
                    &store,
                )
                .await,
        );

        assert_eq!(
            report.violations,
            vec![Violation {
                field: Field::Domain,
                rule: Rule::InvalidDomain
            }]
        );
    }

    #[test]
    fn test_fields_from_pairs() {
        let fields = UpdateFields::from_pairs([
            ("ipv4", "1.2.3.4"),
            ("fqdn", "www.foo.bar"),
            ("ds", "1"),
            ("unrelated", "x"),
        ]);

        assert_eq!(fields.ipv4.as_deref(), Some("1.2.3.4"));
        assert_eq!(fields.domain.as_deref(), Some("www.foo.bar"));
        assert_eq!(fields.ipv6, None);
        assert!(fields.is_dual_stack());
    }
}
