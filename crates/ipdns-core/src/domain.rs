//! Fully-qualified domain names
//!
//! A target domain is split lexically: the leftmost label names the record
//! set, the remaining labels name the zone.
//!
//! Labels follow RFC 1035 host syntax: ASCII letters, digits and `-`, no
//! hyphen at either end, at most 63 characters. The whole name is at most
//! 253 characters. Anything else (`*`, `_`, `/`, `?`, ...) is refused, so a
//! parsed name is safe to place in a store path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest accepted domain name (RFC 1035)
pub const MAX_DOMAIN_LEN: usize = 253;

/// Longest accepted label (RFC 1035)
pub const MAX_LABEL_LEN: usize = 63;

/// Why a string is not a usable target domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FqdnError {
    /// Empty string
    Empty,
    /// Fewer than two labels
    SingleLabel,
    /// An empty label (leading, trailing or doubled dot)
    EmptyLabel,
    /// Longer than 253 characters
    TooLong,
    /// A label longer than 63 characters
    LabelTooLong,
    /// A character other than an ASCII letter, digit or hyphen
    InvalidCharacter,
    /// A label starting or ending with a hyphen
    HyphenAtEdge,
}

impl fmt::Display for FqdnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FqdnError::Empty => f.write_str("domain is empty"),
            FqdnError::SingleLabel => f.write_str("domain needs a record set label and a zone"),
            FqdnError::EmptyLabel => f.write_str("domain contains an empty label"),
            FqdnError::TooLong => write!(f, "domain is longer than {} characters", MAX_DOMAIN_LEN),
            FqdnError::LabelTooLong => {
                write!(f, "domain label is longer than {} characters", MAX_LABEL_LEN)
            }
            FqdnError::InvalidCharacter => {
                f.write_str("domain labels may only hold ASCII letters, digits and hyphens")
            }
            FqdnError::HyphenAtEdge => f.write_str("domain label starts or ends with a hyphen"),
        }
    }
}

impl std::error::Error for FqdnError {}

/// A target domain with at least two non-empty labels
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fqdn(String);

impl Fqdn {
    /// Parse a domain name
    pub fn parse(domain: &str) -> Result<Self, FqdnError> {
        if domain.is_empty() {
            return Err(FqdnError::Empty);
        }
        if domain.len() > MAX_DOMAIN_LEN {
            return Err(FqdnError::TooLong);
        }
        for label in domain.split('.') {
            check_label(label)?;
        }
        if !domain.contains('.') {
            return Err(FqdnError::SingleLabel);
        }
        Ok(Self(domain.to_string()))
    }

    /// Leftmost label
    pub fn record_set_name(&self) -> &str {
        self.split().0
    }

    /// Everything after the leftmost label
    pub fn zone_name(&self) -> &str {
        self.split().1
    }

    /// The full name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> (&str, &str) {
        // Constructor guarantees a dot with non-empty text on both sides
        self.0.split_once('.').unwrap_or((&self.0, ""))
    }
}

fn check_label(label: &str) -> Result<(), FqdnError> {
    if label.is_empty() {
        return Err(FqdnError::EmptyLabel);
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(FqdnError::LabelTooLong);
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(FqdnError::InvalidCharacter);
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(FqdnError::HyphenAtEdge);
    }
    Ok(())
}

impl fmt::Display for Fqdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fqdn {
    type Err = FqdnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Fqdn {
    type Error = FqdnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Fqdn> for String {
    fn from(value: Fqdn) -> Self {
        value.0
    }
}
