//! Azure DNS REST payloads
//!
//! Only the parts of the record set resource the gateway reads or writes are
//! modelled. Field names follow the `2018-05-01` API version.

use ipdns_core::traits::{AddressFamily, RecordSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Metadata key holding the owner tag
pub const OWNER_METADATA_KEY: &str = "Owner";

/// Record set resource (`GET`/`PUT .../dnsZones/{zone}/{type}/{name}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureRecordSet {
    #[serde(default)]
    pub properties: RecordSetProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSetProperties {
    /// Free-form tags; Azure returns `null` when none are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,

    #[serde(rename = "TTL", default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    #[serde(rename = "ARecords", default, skip_serializing_if = "Option::is_none")]
    pub a_records: Option<Vec<ARecord>>,

    #[serde(rename = "AAAARecords", default, skip_serializing_if = "Option::is_none")]
    pub aaaa_records: Option<Vec<AaaaRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ARecord {
    pub ipv4_address: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AaaaRecord {
    pub ipv6_address: Ipv6Addr,
}

impl AzureRecordSet {
    /// Build the `PUT` body for `record_set`
    ///
    /// Addresses of the other family are dropped; the record type is fixed
    /// by the URL.
    pub fn from_record_set(family: AddressFamily, record_set: &RecordSet) -> Self {
        let metadata = record_set.owner.as_ref().map(|owner| {
            HashMap::from([(OWNER_METADATA_KEY.to_string(), owner.clone())])
        });

        let mut properties = RecordSetProperties {
            metadata,
            ttl: Some(record_set.ttl),
            ..Default::default()
        };

        match family {
            AddressFamily::V4 => {
                properties.a_records = Some(
                    record_set
                        .addresses
                        .iter()
                        .filter_map(|ip| match ip {
                            IpAddr::V4(ipv4_address) => Some(ARecord {
                                ipv4_address: *ipv4_address,
                            }),
                            IpAddr::V6(_) => None,
                        })
                        .collect(),
                );
            }
            AddressFamily::V6 => {
                properties.aaaa_records = Some(
                    record_set
                        .addresses
                        .iter()
                        .filter_map(|ip| match ip {
                            IpAddr::V6(ipv6_address) => Some(AaaaRecord {
                                ipv6_address: *ipv6_address,
                            }),
                            IpAddr::V4(_) => None,
                        })
                        .collect(),
                );
            }
        }

        Self { properties }
    }

    /// Owner tag, matched case-insensitively on the metadata key
    pub fn owner(&self) -> Option<&str> {
        self.properties
            .metadata
            .as_ref()?
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(OWNER_METADATA_KEY))
            .map(|(_, value)| value.as_str())
    }

    /// Convert to the store-neutral representation
    ///
    /// `default_ttl` fills in a missing TTL.
    pub fn into_record_set(self, family: AddressFamily, default_ttl: u32) -> RecordSet {
        let owner = self.owner().map(str::to_string);
        let properties = self.properties;

        let addresses = match family {
            AddressFamily::V4 => properties
                .a_records
                .unwrap_or_default()
                .into_iter()
                .map(|record| IpAddr::V4(record.ipv4_address))
                .collect(),
            AddressFamily::V6 => properties
                .aaaa_records
                .unwrap_or_default()
                .into_iter()
                .map(|record| IpAddr::V6(record.ipv6_address))
                .collect(),
        };

        RecordSet {
            owner,
            ttl: properties.ttl.unwrap_or(default_ttl),
            addresses,
        }
    }
}

/// OAuth2 token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}
