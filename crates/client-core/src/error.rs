//! Error types and handling for the client-core library
//!
//! Every failure that can happen while bringing a session up falls into one
//! of three transient categories:
//!
//! - **Credential errors** - the connection-details endpoint was unreachable,
//!   answered with a non-success status, or returned a body we could not parse
//! - **Media errors** - local microphone capture could not be enabled
//! - **Transport errors** - the real-time connection to the session server failed
//!
//! None of them is fatal to the controller: they are caught at the
//! [`SessionController`](crate::client::SessionController) boundary, turned
//! into an [`Alert`](crate::events::Alert), and the controller stays usable
//! for another `start`.
//!
//! # Reporting
//!
//! Alerts describe an error as `"<Name>: <message>"`:
//!
//! ```rust
//! use voxa_client_core::SessionError;
//!
//! let err = SessionError::credential_fetch("HTTP 503 Service Unavailable");
//! assert_eq!(err.name(), "CredentialFetchError");
//! assert_eq!(err.describe(), "CredentialFetchError: HTTP 503 Service Unavailable");
//! ```

use thiserror::Error;

/// Result type alias for client-core operations
pub type ClientResult<T> = Result<T, SessionError>;

/// Errors raised while starting or supervising a session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Obtaining a connection credential failed (network, status or parse)
    #[error("Credential fetch failed: {reason}")]
    CredentialFetch { reason: String },

    /// Local capture setup failed
    #[error("Media acquisition failed: {reason}")]
    MediaAcquisition { reason: String },

    /// Connecting to the session server failed
    #[error("Transport connect failed: {reason}")]
    TransportConnect { reason: String },

    /// Configuration values that cannot be used as given
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SessionError {
    /// Create a credential fetch error
    pub fn credential_fetch(reason: impl Into<String>) -> Self {
        Self::CredentialFetch { reason: reason.into() }
    }

    /// Create a media acquisition error
    pub fn media_acquisition(reason: impl Into<String>) -> Self {
        Self::MediaAcquisition { reason: reason.into() }
    }

    /// Create a transport connect error
    pub fn transport_connect(reason: impl Into<String>) -> Self {
        Self::TransportConnect { reason: reason.into() }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Stable name of the error kind, used as the prefix of alert descriptions
    pub fn name(&self) -> &'static str {
        match self {
            SessionError::CredentialFetch { .. } => "CredentialFetchError",
            SessionError::MediaAcquisition { .. } => "MediaAcquisitionError",
            SessionError::TransportConnect { .. } => "TransportConnectError",
            SessionError::InvalidConfiguration { .. } => "InvalidConfigurationError",
            SessionError::Internal { .. } => "InternalError",
        }
    }

    /// The bare message, without the kind prefix that `Display` adds
    pub fn message(&self) -> String {
        match self {
            SessionError::CredentialFetch { reason }
            | SessionError::MediaAcquisition { reason }
            | SessionError::TransportConnect { reason } => reason.clone(),
            SessionError::InvalidConfiguration { field, reason } => format!("{field} - {reason}"),
            SessionError::Internal { message } => message.clone(),
        }
    }

    /// `"<Name>: <message>"`, the form shown to users
    pub fn describe(&self) -> String {
        format!("{}: {}", self.name(), self.message())
    }

    /// Whether another `start` can reasonably succeed without changing anything
    pub fn is_recoverable(&self) -> bool {
        match self {
            SessionError::CredentialFetch { .. }
            | SessionError::MediaAcquisition { .. }
            | SessionError::TransportConnect { .. } => true,
            SessionError::InvalidConfiguration { .. } | SessionError::Internal { .. } => false,
        }
    }

    /// Error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            SessionError::CredentialFetch { .. } => "credential",
            SessionError::MediaAcquisition { .. } => "media",
            SessionError::TransportConnect { .. } => "transport",
            SessionError::InvalidConfiguration { .. } => "configuration",
            SessionError::Internal { .. } => "internal",
        }
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::credential_fetch(err.to_string())
    }
}
