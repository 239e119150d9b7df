//! Error types for the gateway
//!
//! Every failure the core can report is a variant here. Transports map
//! [`Error::kind`] to whatever status signaling they use.

use crate::validation::ValidationReport;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the gateway
#[derive(Error, Debug)]
pub enum Error {
    /// No authorization header, or an empty one
    #[error("Authorization either not provided or empty")]
    MissingCredentials,

    /// Authorization scheme other than Basic
    #[error("Unsupported authorization scheme: {scheme}")]
    UnsupportedScheme {
        /// The scheme token the client sent
        scheme: String,
    },

    /// Basic payload that does not decode to `client_id:secret`
    #[error("Malformed credentials: {0}")]
    MalformedCredentials(String),

    /// One or more validation rules failed
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationReport),

    /// The record set is owned by another client
    #[error(
        "Client '{requesting_client}' is not authorized for record set '{record_set_name}' \
         (owner: {})",
        .current_owner.as_deref().unwrap_or("<none>")
    )]
    OwnershipConflict {
        /// Name of the contested record set
        record_set_name: String,
        /// Client that attempted the write
        requesting_client: String,
        /// Owner tag found on the record set, if any
        current_owner: Option<String>,
    },

    /// The record store could not be reached or refused the call
    #[error("Record store unavailable ({store}): {message}")]
    StoreUnavailable {
        /// Store name
        store: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O errors (file store)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an unsupported scheme error
    pub fn unsupported_scheme(scheme: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
        }
    }

    /// Create a malformed credentials error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedCredentials(msg.into())
    }

    /// Create a store-unavailable error
    pub fn store_unavailable(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable identifier of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::UnsupportedScheme { .. } => "unsupported_scheme",
            Self::MalformedCredentials(_) => "malformed_credentials",
            Self::ValidationFailed(_) => "validation_failed",
            Self::OwnershipConflict { .. } => "ownership_conflict",
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }

    /// Whether resubmitting the same request may succeed
    ///
    /// Only transport failures qualify. The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }

    /// Whether this is an authentication-stage failure
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials | Self::UnsupportedScheme { .. } | Self::MalformedCredentials(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
