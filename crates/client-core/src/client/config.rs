//! Client configuration structures
//!
//! Three records configure a session client:
//!
//! - **AppConfig** - the host application's feature flags and routing hints.
//!   Treated as read-only input; it is shared as `Arc<AppConfig>` and never
//!   mutated by the controller.
//! - **CredentialEndpointConfig** - where and how to request connection details.
//! - **SessionOptions** - controller behaviour knobs.
//!
//! # Usage Examples
//!
//! ```rust
//! use voxa_client_core::client::config::{AppConfig, IMPROV_BATTLE_AGENT};
//!
//! let config = AppConfig::new()
//!     .with_agent_name(IMPROV_BATTLE_AGENT)
//!     .with_sandbox_id("sbx-42")
//!     .with_pre_connect_buffer(true);
//!
//! assert_eq!(config.agent_name.as_deref(), Some("improv-battle-agent"));
//! assert!(config.is_pre_connect_buffer_enabled);
//! ```
//!
//! The host usually hands the configuration over as JSON:
//!
//! ```rust
//! use voxa_client_core::client::config::AppConfig;
//!
//! let config = AppConfig::from_json(r#"{"agentName":"foo","supportsChatInput":true}"#).unwrap();
//! assert_eq!(config.agent_name.as_deref(), Some("foo"));
//! assert!(config.supports_chat_input);
//! assert!(config.sandbox_id.is_none());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ClientResult, SessionError};

/// Default location of the connection-details endpoint
pub const DEFAULT_CONN_DETAILS_ENDPOINT: &str = "/api/connection-details";

/// Name the improv battle worker registers under
///
/// Explicit dispatch only reaches the worker when the requested agent name
/// matches this exactly; set it with [`AppConfig::with_agent_name`] or the
/// `AGENT_NAME` environment variable. It is not applied by default because
/// an unset agent name means "let the server pick".
pub const IMPROV_BATTLE_AGENT: &str = "improv-battle-agent";

/// Display name used when the participant did not enter one
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Default timeout for a single credential request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Application configuration supplied by the host
///
/// Field names follow the host's camelCase JSON shape when deserialized.
/// Unknown fields are ignored and missing ones take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Whether the UI offers a text chat input
    pub supports_chat_input: bool,
    /// Whether the UI offers camera publishing
    pub supports_video_input: bool,
    /// Whether the UI offers screen sharing
    pub supports_screen_share: bool,
    /// Buffer captured audio until the agent is connected
    pub is_pre_connect_buffer_enabled: bool,
    /// Remote agent to dispatch into the session, if any
    pub agent_name: Option<String>,
    /// Environment-scoped routing key forwarded to the credential endpoint
    pub sandbox_id: Option<String>,
}

impl AppConfig {
    /// Create a configuration with every feature disabled and no routing hints
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the host's JSON configuration object
    pub fn from_json(json: &str) -> ClientResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SessionError::invalid_configuration("app_config", e.to_string()))
    }

    /// Load from process environment variables
    ///
    /// Reads `AGENT_NAME`, `SANDBOX_ID`, `PRE_CONNECT_BUFFER`, `SUPPORTS_CHAT_INPUT`,
    /// `SUPPORTS_VIDEO_INPUT` and `SUPPORTS_SCREEN_SHARE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, see [`AppConfig::from_env`]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            supports_chat_input: lookup_flag(&lookup, "SUPPORTS_CHAT_INPUT"),
            supports_video_input: lookup_flag(&lookup, "SUPPORTS_VIDEO_INPUT"),
            supports_screen_share: lookup_flag(&lookup, "SUPPORTS_SCREEN_SHARE"),
            is_pre_connect_buffer_enabled: lookup_flag(&lookup, "PRE_CONNECT_BUFFER"),
            agent_name: lookup_non_empty(&lookup, "AGENT_NAME"),
            sandbox_id: lookup_non_empty(&lookup, "SANDBOX_ID"),
        }
    }

    pub fn with_agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = Some(agent_name.into());
        self
    }

    pub fn with_sandbox_id(mut self, sandbox_id: impl Into<String>) -> Self {
        self.sandbox_id = Some(sandbox_id.into());
        self
    }

    pub fn with_pre_connect_buffer(mut self, enabled: bool) -> Self {
        self.is_pre_connect_buffer_enabled = enabled;
        self
    }

    pub fn with_chat_input(mut self, enabled: bool) -> Self {
        self.supports_chat_input = enabled;
        self
    }

    pub fn with_video_input(mut self, enabled: bool) -> Self {
        self.supports_video_input = enabled;
        self
    }

    pub fn with_screen_share(mut self, enabled: bool) -> Self {
        self.supports_screen_share = enabled;
        self
    }
}

/// Location and transport settings of the connection-details endpoint
///
/// `endpoint` may be absolute (`https://host/api/token`) or a path that is
/// resolved against `base_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEndpointConfig {
    pub endpoint: String,
    pub base_url: Option<String>,
    pub request_timeout: Duration,
}

impl Default for CredentialEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CONN_DETAILS_ENDPOINT.to_string(),
            base_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl CredentialEndpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `CONN_DETAILS_ENDPOINT` and `CONN_DETAILS_BASE_URL`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(endpoint) = lookup_non_empty(&lookup, "CONN_DETAILS_ENDPOINT") {
            config.endpoint = endpoint;
        }
        config.base_url = lookup_non_empty(&lookup, "CONN_DETAILS_BASE_URL");
        config
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolve the endpoint to an absolute URL
    pub fn resolve(&self) -> ClientResult<Url> {
        match Url::parse(&self.endpoint) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_deref().ok_or_else(|| {
                    SessionError::invalid_configuration(
                        "endpoint",
                        format!("'{}' is relative and no base URL is configured", self.endpoint),
                    )
                })?;
                let base = Url::parse(base)
                    .map_err(|e| SessionError::invalid_configuration("base_url", e.to_string()))?;
                base.join(&self.endpoint)
                    .map_err(|e| SessionError::invalid_configuration("endpoint", e.to_string()))
            }
            Err(e) => Err(SessionError::invalid_configuration("endpoint", e.to_string())),
        }
    }
}

/// Behaviour knobs of the session controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Name attached to the connection when the participant left it blank
    pub default_player_name: String,
    /// Clear the active flag when `start` fails.
    ///
    /// Off by default: a failed start leaves the session marked active until
    /// the transport reports a disconnection or `end` is called.
    pub reset_active_on_failure: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_player_name: DEFAULT_PLAYER_NAME.to_string(),
            reset_active_on_failure: false,
        }
    }
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_player_name(mut self, name: impl Into<String>) -> Self {
        self.default_player_name = name.into();
        self
    }

    pub fn with_reset_active_on_failure(mut self, reset: bool) -> Self {
        self.reset_active_on_failure = reset;
        self
    }

    /// Trim `name`, falling back to the default player name when nothing is left
    pub fn player_name(&self, name: &str) -> String {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            self.default_player_name.clone()
        } else {
            trimmed.to_string()
        }
    }
}

fn lookup_non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn lookup_flag<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    matches!(
        lookup_non_empty(lookup, key).map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
