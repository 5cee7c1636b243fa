//! Real-time transport seam
//!
//! The transport is the long-lived connection handle of a session: it
//! captures local media, connects to the session server and emits lifecycle
//! notifications. Media encoding and the wire protocol live behind this
//! trait; client-core only drives it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   connect / disconnect   ┌─────────────────┐
//! │  SessionController   │ ───────────────────────► │  dyn Transport  │
//! │                      │ ◄─────────────────────── │                 │
//! └──────────────────────┘   TransportEvent stream  └─────────────────┘
//! ```
//!
//! Exactly one transport exists per controller and it is reused across
//! connect/disconnect cycles. Nothing but the controller may call
//! [`Transport::connect`] or [`Transport::disconnect`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Connection state as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// At rest, no connection and no attempt in progress
    Disconnected,
    Connecting,
    Connected,
    /// Connection dropped, transport is trying to resume it
    Reconnecting,
}

impl ConnectionState {
    /// Whether a new session may be started from this state
    pub fn is_at_rest(&self) -> bool {
        matches!(self, ConnectionState::Disconnected)
    }
}

/// Failure reported by the transport, in `name` + `message` form
///
/// `name` is the transport's own classification, e.g. `NotAllowedError` for
/// a denied microphone permission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{name}: {message}")]
pub struct TransportError {
    pub name: String,
    pub message: String,
}

impl TransportError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Notifications emitted by the transport for the lifetime of the handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is gone, whichever side caused it
    Disconnected { reason: Option<String> },
    /// A local capture device failed or was denied
    MediaDevicesError(TransportError),
    ConnectionStateChanged(ConnectionState),
}

/// Options for enabling the microphone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MicrophoneOptions {
    /// Buffer captured audio until the remote agent is ready to receive it
    pub pre_connect_buffer: bool,
}

/// Options passed along with a connect call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Participant metadata, a JSON document such as `{"playerName":"Alice"}`
    pub metadata: String,
}

/// Participant metadata attached to the connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantMetadata {
    #[serde(rename = "playerName")]
    pub player_name: String,
}

impl ParticipantMetadata {
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
        }
    }

    /// Serialize to the metadata string expected by the agent
    pub fn to_json(&self) -> String {
        // A struct with one String field always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// The real-time connection handle driven by the session controller
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Subscribe to lifecycle notifications
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;

    /// Enable or disable local microphone capture
    ///
    /// May suspend while the platform asks the user for device permission.
    async fn set_microphone_enabled(
        &self,
        enabled: bool,
        options: MicrophoneOptions,
    ) -> Result<(), TransportError>;

    /// Connect to `server_url` using `token`
    async fn connect(
        &self,
        server_url: &str,
        token: &str,
        options: ConnectOptions,
    ) -> Result<(), TransportError>;

    /// Tear the connection down; a no-op when already disconnected
    async fn disconnect(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_json_shape() {
        assert_eq!(ParticipantMetadata::new("Alice").to_json(), r#"{"playerName":"Alice"}"#);
    }

    #[test]
    fn test_only_disconnected_is_at_rest() {
        assert!(ConnectionState::Disconnected.is_at_rest());
        assert!(!ConnectionState::Connecting.is_at_rest());
        assert!(!ConnectionState::Connected.is_at_rest());
        assert!(!ConnectionState::Reconnecting.is_at_rest());
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::new("NotAllowedError", "Permission denied");
        assert_eq!(err.to_string(), "NotAllowedError: Permission denied");
    }
}
