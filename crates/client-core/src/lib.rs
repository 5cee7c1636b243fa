//! Client-core: session lifecycle control for real-time voice agent sessions
//!
//! This crate supervises one real-time audio session between a human
//! participant and a remote voice agent. It fetches a short-lived
//! connection credential, enables local microphone capture, connects the
//! transport, and keeps an `is_session_active` flag in line with what the
//! transport reports for the session's whole lifetime.
//!
//! ## Layering
//! ```text
//! presentation -> SessionContext -> SessionController -> {CredentialSource, Transport}
//! ```
//!
//! Client-core focuses on:
//! - Credential exchange with the connection-details endpoint
//! - Start/end of sessions and teardown on unmount
//! - Lifecycle notifications turned into session events and alerts
//!
//! Media encoding and the wire protocol belong to the [`Transport`]
//! implementation supplied by the host.

pub mod client;
pub mod credentials;
pub mod error;
pub mod events;
pub mod transport;

// Public API exports
pub use client::{
    AppConfig, CredentialEndpointConfig, IMPROV_BATTLE_AGENT, SessionContext, SessionContextValue, SessionController,
    SessionOptions, StartHandle, StartOutcome,
};
pub use credentials::{ConnectionDetails, CredentialRequest, CredentialSource, HttpCredentialClient};
pub use error::{ClientResult, SessionError};
pub use events::{Alert, EventEmitter, EventSubscription, SessionEvent, SessionEventHandler};
pub use transport::{
    ConnectOptions, ConnectionState, MicrophoneOptions, ParticipantMetadata, Transport, TransportError,
    TransportEvent,
};

/// Client-core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
