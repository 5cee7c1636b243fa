//! Session lifecycle controller
//!
//! The controller owns one transport handle for its whole life and drives it
//! through any number of connect/disconnect cycles.
//!
//! # State Machine
//!
//! ```text
//!            start()                       transport connected
//!  ┌──────┐ ────────► ┌────────────┐ ─────────────────────► ┌───────────┐
//!  │ Idle │           │ Activating │                        │ Connected │
//!  └──────┘ ◄──────── └────────────┘ ◄───────────────────── └───────────┘
//!      ▲     end() /          Disconnected notification / end()    │
//!      └───────────────────────────────────────────────────────────┘
//! ```
//!
//! `is_session_active` turns true synchronously inside `start()`, before any
//! network or device work begins, and turns false on `end()` or when the
//! transport reports a disconnection. A failed start leaves it true unless
//! [`SessionOptions::reset_active_on_failure`] is set.
//!
//! # Teardown
//!
//! [`SessionController::shutdown`] (or dropping the controller) removes the
//! lifecycle listener and disconnects the transport, exactly once. Start
//! attempts still in flight run to completion, but their results are
//! discarded: no alert, no state change. Once `shutdown` returns, nothing
//! further is published on the controller's behalf.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{RwLock as SettleGate, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::config::{AppConfig, SessionOptions};
use crate::credentials::{CredentialRequest, CredentialSource};
use crate::error::SessionError;
use crate::events::{
    Alert, CONNECT_ERROR_TITLE, EventEmitter, EventSubscription, MEDIA_DEVICES_ERROR_TITLE,
    SessionEvent, SessionEventHandler,
};
use crate::transport::{
    ConnectOptions, ConnectionState, MicrophoneOptions, ParticipantMetadata, Transport, TransportEvent,
};

/// How a start attempt settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Microphone enabled and transport connected
    Connected,
    /// One of the branches failed; an alert was emitted
    Failed(SessionError),
    /// The controller was torn down before the attempt settled
    Discarded,
    /// The transport was not at rest, nothing was attempted
    Skipped,
}

/// Handle on a start attempt
///
/// Dropping it does not cancel the attempt.
#[derive(Debug)]
pub enum StartHandle {
    Ready(StartOutcome),
    Running(JoinHandle<StartOutcome>),
}

impl StartHandle {
    pub fn is_finished(&self) -> bool {
        match self {
            StartHandle::Ready(_) => true,
            StartHandle::Running(task) => task.is_finished(),
        }
    }

    /// Wait for the attempt to settle
    pub async fn wait(self) -> StartOutcome {
        match self {
            StartHandle::Ready(outcome) => outcome,
            StartHandle::Running(task) => match task.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => StartOutcome::Discarded,
                Err(e) => StartOutcome::Failed(SessionError::internal(format!("start task panicked: {e}"))),
            },
        }
    }
}

/// Background task aborted when the guard is dropped
#[derive(Debug)]
pub(crate) struct ScopedTask(JoinHandle<()>);

impl ScopedTask {
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

type ActiveObserver = Box<dyn Fn(bool) + Send + Sync>;

/// The `is_session_active` flag and everything mirroring it
///
/// Observers run inside the watch write, in the same order as the flag
/// changes.
struct ActiveFlag {
    tx: watch::Sender<bool>,
    observers: RwLock<Vec<ActiveObserver>>,
}

impl ActiveFlag {
    fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            tx,
            observers: RwLock::new(Vec::new()),
        }
    }

    fn get(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Register `observer`, calling it once with the current value
    fn observe(&self, observer: ActiveObserver) {
        let mut observers = self.observers.write();
        observer(self.get());
        observers.push(observer);
    }

    fn set(&self, value: bool) {
        let observers = self.observers.read();
        let changed = self.tx.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            for observer in observers.iter() {
                observer(value);
            }
            true
        });
        if changed {
            debug!(active = value, "Session active flag changed");
        }
    }
}

/// Teardown state shared with start attempts and the lifecycle listener
///
/// Anything that mutates state or publishes events on the controller's
/// behalf holds a read guard on `gate` and checks `torn_down` under it.
/// Teardown flips the flag under the write guard.
struct Teardown {
    torn_down: AtomicBool,
    gate: SettleGate<()>,
}

impl Teardown {
    fn new() -> Self {
        Self {
            torn_down: AtomicBool::new(false),
            gate: SettleGate::new(()),
        }
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

/// Drives a single transport through repeated session cycles
pub struct SessionController {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialSource>,
    options: SessionOptions,
    active: Arc<ActiveFlag>,
    teardown: Arc<Teardown>,
    emitter: Arc<EventEmitter>,
    lifecycle: Mutex<Option<ScopedTask>>,
}

impl SessionController {
    /// Create a controller and bind the transport's lifecycle notifications
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialSource>,
        options: SessionOptions,
    ) -> Self {
        let active = Arc::new(ActiveFlag::new());
        let teardown = Arc::new(Teardown::new());
        let emitter = Arc::new(EventEmitter::new());

        // Subscribe before spawning so nothing emitted from here on is missed.
        let notifications = transport.subscribe();
        let listener = ScopedTask::spawn(run_lifecycle_listener(
            notifications,
            active.clone(),
            teardown.clone(),
            emitter.clone(),
        ));

        debug!(state = ?transport.state(), "Session controller created");

        Self {
            transport,
            credentials,
            options,
            active,
            teardown,
            emitter,
            lifecycle: Mutex::new(Some(listener)),
        }
    }

    /// Begin a session for `player_name`
    ///
    /// The active flag is set before this returns. Microphone start-up and the
    /// credential fetch + connect chain then run concurrently in a spawned
    /// task; the returned handle resolves once both have settled.
    pub fn start(&self, config: &AppConfig, player_name: &str) -> StartHandle {
        if self.is_torn_down() {
            warn!("start() called on a torn down session controller");
            return StartHandle::Ready(StartOutcome::Discarded);
        }

        let state = self.transport.state();
        if !state.is_at_rest() {
            debug!(?state, "Transport busy, ignoring start()");
            return StartHandle::Ready(StartOutcome::Skipped);
        }

        let player_name = self.options.player_name(player_name);
        self.active.set(true);
        info!(
            player_name = %player_name,
            agent_name = ?config.agent_name,
            pre_connect_buffer = config.is_pre_connect_buffer_enabled,
            "Starting session"
        );

        let attempt = StartAttempt {
            transport: self.transport.clone(),
            credentials: self.credentials.clone(),
            request: CredentialRequest::from_config(config),
            microphone: MicrophoneOptions {
                pre_connect_buffer: config.is_pre_connect_buffer_enabled,
            },
            metadata: ParticipantMetadata::new(player_name).to_json(),
            reset_active_on_failure: self.options.reset_active_on_failure,
            active: self.active.clone(),
            teardown: self.teardown.clone(),
            emitter: self.emitter.clone(),
        };

        StartHandle::Running(tokio::spawn(attempt.run()))
    }

    /// Leave the active state; the transport is not touched
    pub fn end(&self) {
        info!("Ending session");
        self.active.set(false);
    }

    /// Remove the lifecycle listener and disconnect the transport
    ///
    /// Runs once; later calls return immediately. A start attempt or
    /// notification already reporting its result finishes publishing first.
    pub async fn shutdown(&self) {
        {
            let _settled = self.teardown.gate.write().await;
            if self.teardown.torn_down.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        info!("Tearing down session controller");
        drop(self.lifecycle.lock().take());
        self.transport.disconnect().await;
    }

    pub fn is_session_active(&self) -> bool {
        self.active.get()
    }

    /// Observe the active flag
    pub fn subscribe_active(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    pub fn is_torn_down(&self) -> bool {
        self.teardown.is_torn_down()
    }

    /// Mirror the active flag into `observer`
    ///
    /// The observer is called with the current value right away, then
    /// synchronously with every change.
    pub(crate) fn observe_active<F>(&self, observer: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.active.observe(Box::new(observer));
    }

    pub fn transport_state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Raw session event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.emitter.subscribe_events()
    }

    /// Register a handler for every session event, returning its subscription id
    pub fn add_event_handler(&self, handler: Arc<dyn SessionEventHandler>) -> uuid::Uuid {
        self.emitter.subscribe(EventSubscription::all_events(handler))
    }

    pub fn subscribe(&self, subscription: EventSubscription) -> uuid::Uuid {
        self.emitter.subscribe(subscription)
    }

    pub fn remove_event_handler(&self, subscription_id: uuid::Uuid) -> bool {
        self.emitter.unsubscribe(subscription_id)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        // Cannot wait on the gate here; an attempt already past its check
        // finishes reporting.
        if self.teardown.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        drop(self.lifecycle.get_mut().take());

        let transport = self.transport.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Session controller dropped, disconnecting transport");
                handle.spawn(async move { transport.disconnect().await });
            }
            Err(_) => warn!("Session controller dropped outside a runtime, transport left connected"),
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("active", &self.is_session_active())
            .field("torn_down", &self.is_torn_down())
            .field("options", &self.options)
            .finish()
    }
}

/// Everything a spawned start attempt needs, detached from the controller
struct StartAttempt {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialSource>,
    request: CredentialRequest,
    microphone: MicrophoneOptions,
    metadata: String,
    reset_active_on_failure: bool,
    active: Arc<ActiveFlag>,
    teardown: Arc<Teardown>,
    emitter: Arc<EventEmitter>,
}

impl StartAttempt {
    async fn run(self) -> StartOutcome {
        let microphone = async {
            self.transport
                .set_microphone_enabled(true, self.microphone)
                .await
                .map_err(|e| SessionError::media_acquisition(e.to_string()))
        };

        let connection = async {
            let details = self.credentials.fetch(&self.request).await?;
            let options = ConnectOptions {
                metadata: self.metadata.clone(),
            };
            self.transport
                .connect(&details.server_url, &details.participant_token, options)
                .await
                .map_err(|e| SessionError::transport_connect(e.to_string()))?;
            Ok::<_, SessionError>(details.server_url)
        };

        // Neither branch cancels the other.
        let (microphone, connection) = tokio::join!(microphone, connection);

        let (outcome, delivery) = {
            // Mutations and the event publish happen under the gate; handler
            // deliveries are awaited after it is released.
            let _settling = self.teardown.gate.read().await;
            if self.teardown.is_torn_down() {
                debug!("Start attempt settled after teardown, discarding result");
                return StartOutcome::Discarded;
            }

            match microphone.and(connection) {
                Ok(server_url) => {
                    info!(server_url = %server_url, "Session connected");
                    let delivery = self.emitter.dispatch(SessionEvent::Connected {
                        server_url,
                        timestamp: Utc::now(),
                    });
                    (StartOutcome::Connected, delivery)
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        category = err.category(),
                        "Failed to start session"
                    );
                    if self.reset_active_on_failure {
                        self.active.set(false);
                    }
                    let delivery = self
                        .emitter
                        .dispatch(SessionEvent::Alert(Alert::new(CONNECT_ERROR_TITLE, err.describe())));
                    (StartOutcome::Failed(err), delivery)
                }
            }
        };

        delivery.finished().await;
        outcome
    }
}

async fn run_lifecycle_listener(
    mut notifications: broadcast::Receiver<TransportEvent>,
    active: Arc<ActiveFlag>,
    teardown: Arc<Teardown>,
    emitter: Arc<EventEmitter>,
) {
    loop {
        let event = match notifications.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Lifecycle listener lagged behind transport notifications");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Transport notification channel closed");
                break;
            }
        };

        let _settling = teardown.gate.read().await;
        if teardown.is_torn_down() {
            break;
        }

        // Handlers are not awaited so a slow one cannot hold up the next
        // notification.
        match event {
            TransportEvent::Disconnected { reason } => {
                info!(reason = ?reason, "Transport disconnected");
                active.set(false);
                emitter.dispatch(SessionEvent::Disconnected {
                    reason,
                    timestamp: Utc::now(),
                });
            }
            TransportEvent::MediaDevicesError(error) => {
                warn!(name = %error.name, message = %error.message, "Media devices error");
                emitter.dispatch(SessionEvent::Alert(Alert::new(
                    MEDIA_DEVICES_ERROR_TITLE,
                    error.to_string(),
                )));
                emitter.dispatch(SessionEvent::MediaDevicesError {
                    error,
                    timestamp: Utc::now(),
                });
            }
            TransportEvent::ConnectionStateChanged(state) => {
                debug!(?state, "Transport connection state changed");
            }
        }
    }
}
