//! High-level session client
//!
//! # Architecture Overview
//!
//! - **`config`** - host configuration, credential endpoint settings, controller options
//! - **`controller`** - the [`SessionController`] that owns the transport handle
//! - **`context`** - the [`SessionContext`] handed to the presentation layer
//!
//! # Basic Flow
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use voxa_client_core::{AppConfig, CredentialEndpointConfig, HttpCredentialClient, IMPROV_BATTLE_AGENT, SessionContext, SessionOptions, Transport};
//! # async fn example(transport: Arc<dyn Transport>) -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = HttpCredentialClient::new(
//!     &CredentialEndpointConfig::new().with_base_url("http://localhost:3000"),
//! )?;
//! let context = SessionContext::mount(
//!     AppConfig::new().with_agent_name(IMPROV_BATTLE_AGENT),
//!     transport,
//!     Arc::new(credentials),
//!     SessionOptions::default(),
//! );
//!
//! context.set_display_name("Alice");
//! let attempt = context.start();
//! assert!(context.is_session_active());
//!
//! attempt.wait().await;
//! context.end();
//! context.unmount().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod controller;

mod tests;

pub use config::{AppConfig, CredentialEndpointConfig, IMPROV_BATTLE_AGENT, SessionOptions};
pub use context::{SessionContext, SessionContextValue};
pub use controller::{SessionController, StartHandle, StartOutcome};
