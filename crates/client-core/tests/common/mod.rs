//! Shared fakes for the session integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};

use voxa_client_core::{
    Alert, ClientResult, ConnectOptions, ConnectionDetails, ConnectionState, CredentialRequest,
    CredentialSource, MicrophoneOptions, SessionError, SessionEventHandler, Transport, TransportError,
    TransportEvent,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("voxa_client_core=debug")
        .with_test_writer()
        .try_init();
}

pub fn details(server_url: &str) -> ConnectionDetails {
    ConnectionDetails {
        server_url: server_url.to_string(),
        participant_token: "token-123".to_string(),
        room_name: Some("room-1".to_string()),
        participant_name: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectCall {
    pub server_url: String,
    pub token: String,
    pub options: ConnectOptions,
}

/// In-memory transport recording every call made to it
pub struct FakeTransport {
    state: Mutex<ConnectionState>,
    events: broadcast::Sender<TransportEvent>,
    mic_result: Mutex<Result<(), TransportError>>,
    connect_result: Mutex<Result<(), TransportError>>,
    pub mic_calls: Mutex<Vec<(bool, MicrophoneOptions)>>,
    pub connects: Mutex<Vec<ConnectCall>>,
    disconnects: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            state: Mutex::new(ConnectionState::Disconnected),
            events,
            mic_result: Mutex::new(Ok(())),
            connect_result: Mutex::new(Ok(())),
            mic_calls: Mutex::new(Vec::new()),
            connects: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
        })
    }

    pub fn fail_microphone(&self, error: TransportError) {
        *self.mic_result.lock() = Err(error);
    }

    pub fn fail_connect(&self, error: TransportError) {
        *self.connect_result.lock() = Err(error);
    }

    /// Push a notification as the underlying library would
    pub fn emit(&self, event: TransportEvent) {
        if let TransportEvent::Disconnected { .. } = event {
            *self.state.lock() = ConnectionState::Disconnected;
        }
        let _ = self.events.send(event);
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }

    pub fn last_connect(&self) -> Option<ConnectCall> {
        self.connects.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    async fn set_microphone_enabled(
        &self,
        enabled: bool,
        options: MicrophoneOptions,
    ) -> Result<(), TransportError> {
        self.mic_calls.lock().push((enabled, options));
        self.mic_result.lock().clone()
    }

    async fn connect(
        &self,
        server_url: &str,
        token: &str,
        options: ConnectOptions,
    ) -> Result<(), TransportError> {
        self.connects.lock().push(ConnectCall {
            server_url: server_url.to_string(),
            token: token.to_string(),
            options,
        });
        let result = self.connect_result.lock().clone();
        if result.is_ok() {
            *self.state.lock() = ConnectionState::Connected;
        }
        result
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        let was_connected = {
            let mut state = self.state.lock();
            let was_connected = *state != ConnectionState::Disconnected;
            *state = ConnectionState::Disconnected;
            was_connected
        };
        if was_connected {
            let _ = self.events.send(TransportEvent::Disconnected {
                reason: Some("client initiated".to_string()),
            });
        }
    }
}

/// Credential source with a scripted result and an optional gate
pub struct FakeCredentials {
    result: Mutex<ClientResult<ConnectionDetails>>,
    gate: Option<Arc<Notify>>,
    pub requests: Mutex<Vec<CredentialRequest>>,
}

impl FakeCredentials {
    pub fn ok(server_url: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Ok(details(server_url))),
            gate: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: SessionError) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Err(error)),
            gate: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Fetches block until the returned `Notify` is signalled
    pub fn gated(result: ClientResult<ConnectionDetails>) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let credentials = Arc::new(Self {
            result: Mutex::new(result),
            gate: Some(gate.clone()),
            requests: Mutex::new(Vec::new()),
        });
        (credentials, gate)
    }

    pub fn set_result(&self, result: ClientResult<ConnectionDetails>) {
        *self.result.lock() = result;
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl CredentialSource for FakeCredentials {
    async fn fetch(&self, request: &CredentialRequest) -> ClientResult<ConnectionDetails> {
        self.requests.lock().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.result.lock().clone()
    }
}

/// Handler keeping every alert it receives
#[derive(Default)]
pub struct RecordingHandler {
    pub alerts: Mutex<Vec<Alert>>,
    pub disconnects: AtomicUsize,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }
}

#[async_trait]
impl SessionEventHandler for RecordingHandler {
    async fn on_alert(&self, alert: Alert) {
        self.alerts.lock().push(alert);
    }

    async fn on_disconnected(&self, _reason: Option<String>) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Yield until `condition` holds, failing the test after one second
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within one second");
}
