//! Basic authorization decoding
//!
//! Turns an `Authorization` header value into a [`Credentials`] pair. The
//! decoder has no side effects and never logs the secret.

use crate::error::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fmt;

/// Authorization scheme accepted by the gateway
pub const BASIC_SCHEME: &str = "Basic";

/// Client identity presented with one request
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Client identifier, also used as the owner tag
    pub client_id: String,
    /// Shared secret
    pub secret: String,
}

// Custom Debug implementation that hides the secret
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

impl Credentials {
    /// Create a credential pair
    pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: secret.into(),
        }
    }

    /// Decode an `Authorization` header value
    ///
    /// # Errors
    ///
    /// - [`Error::MissingCredentials`]: no header, or an empty one
    /// - [`Error::UnsupportedScheme`]: scheme other than `Basic`
    /// - [`Error::MalformedCredentials`]: payload is not base64, not UTF-8,
    ///   or does not split into exactly `client_id:secret`
    pub fn from_authorization(header: Option<&str>) -> Result<Self> {
        let value = header.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return Err(Error::MissingCredentials);
        }

        let (scheme, payload) = match value.split_once(char::is_whitespace) {
            Some((scheme, payload)) => (scheme, payload.trim()),
            None => (value, ""),
        };

        if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
            return Err(Error::unsupported_scheme(scheme));
        }

        if payload.is_empty() {
            return Err(Error::malformed("Basic scheme without a payload"));
        }

        let decoded = STANDARD
            .decode(payload)
            .map_err(|e| Error::malformed(format!("payload is not base64 encoded: {}", e)))?;

        let decoded = String::from_utf8(decoded)
            .map_err(|_| Error::malformed("payload is not valid UTF-8"))?;

        let mut parts = decoded.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(client_id), Some(secret), None) => Ok(Self::new(client_id, secret)),
            _ => Err(Error::malformed(
                "payload must contain exactly one ':' separating client id and secret",
            )),
        }
    }

    /// Encode as an `Authorization` header value
    pub fn to_authorization(&self) -> String {
        let payload = format!("{}:{}", self.client_id, self.secret);
        format!("{} {}", BASIC_SCHEME, STANDARD.encode(payload))
    }
}
