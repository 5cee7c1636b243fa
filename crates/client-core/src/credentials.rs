//! Connection credential exchange
//!
//! Before every session attempt the client asks an issuing endpoint for a
//! short-lived credential: the session server address plus a participant
//! token scoped to the requested agent. Credentials are never cached; each
//! `start` fetches a fresh one, and a failed fetch is reported once without
//! retrying.
//!
//! # Wire format
//!
//! ```text
//! POST /api/connection-details
//! X-Sandbox-Id: <sandbox id or empty>
//! Content-Type: application/json
//!
//! {"room_config":{"agents":[{"agent_name":"<agent>"}]}}    (or {} without an agent)
//!
//! 200 OK
//! {"serverUrl":"wss://...","participantToken":"...","roomName":"...","participantName":"..."}
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::client::config::{AppConfig, CredentialEndpointConfig};
use crate::error::{ClientResult, SessionError};

/// Header carrying the sandbox routing key
pub const SANDBOX_ID_HEADER: &str = "X-Sandbox-Id";

/// Credential returned by the issuing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    pub server_url: String,
    pub participant_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,
}

/// What a credential is requested for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialRequest {
    pub agent_name: Option<String>,
    pub sandbox_id: Option<String>,
}

impl CredentialRequest {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            agent_name: config.agent_name.clone(),
            sandbox_id: config.sandbox_id.clone(),
        }
    }

    /// JSON body sent to the endpoint
    pub fn body(&self) -> ConnectionDetailsRequest {
        ConnectionDetailsRequest {
            room_config: self.agent_name.as_ref().map(|agent_name| RoomConfiguration {
                agents: vec![RoomAgentDispatch {
                    agent_name: agent_name.clone(),
                }],
            }),
        }
    }
}

/// Request body of the connection-details endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionDetailsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_config: Option<RoomConfiguration>,
}

/// Routing directive for the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomConfiguration {
    pub agents: Vec<RoomAgentDispatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomAgentDispatch {
    pub agent_name: String,
}

/// Source of connection credentials
///
/// The controller only talks to this trait, so hosts can swap the HTTP
/// client for anything that produces [`ConnectionDetails`].
#[async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    async fn fetch(&self, request: &CredentialRequest) -> ClientResult<ConnectionDetails>;
}

/// HTTP client for the connection-details endpoint
#[derive(Debug, Clone)]
pub struct HttpCredentialClient {
    client: Client,
    endpoint: Url,
}

impl HttpCredentialClient {
    /// Build a client, resolving the endpoint eagerly
    pub fn new(config: &CredentialEndpointConfig) -> ClientResult<Self> {
        let endpoint = config.resolve()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SessionError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialClient {
    async fn fetch(&self, request: &CredentialRequest) -> ClientResult<ConnectionDetails> {
        debug!(
            endpoint = %self.endpoint,
            agent_name = ?request.agent_name,
            "Requesting connection details"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(SANDBOX_ID_HEADER, request.sandbox_id.as_deref().unwrap_or(""))
            .json(&request.body())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(endpoint = %self.endpoint, %status, "Connection details request rejected");
            return Err(SessionError::credential_fetch(format!("HTTP {status}: {text}")));
        }

        let details: ConnectionDetails = serde_json::from_str(&text).map_err(|e| {
            SessionError::credential_fetch(format!("invalid connection details: {e}"))
        })?;

        debug!(
            server_url = %details.server_url,
            room_name = ?details.room_name,
            "Received connection details"
        );
        Ok(details)
    }
}
