//! Event handling for client-core operations
//!
//! Session events are what the presentation layer reacts to: the session
//! connected, the transport went away, a device failed, or something needs
//! to be shown to the user as an alert.
//!
//! # Event Types
//!
//! - **Connected** - a `start` finished and the transport is up
//! - **Disconnected** - the transport reported the connection gone
//! - **MediaDevicesError** - a local capture device failed
//! - **Alert** - a title/description pair meant for a toast or banner
//!
//! Events reach consumers two ways: as a `tokio::sync::broadcast` stream
//! from [`EventEmitter::subscribe_events`], or through
//! [`SessionEventHandler`] implementations registered with an
//! [`EventSubscription`].
//!
//! # Usage Examples
//!
//! ```rust
//! use voxa_client_core::events::{Alert, SessionEventHandler};
//! use async_trait::async_trait;
//!
//! struct ToastHandler;
//!
//! #[async_trait]
//! impl SessionEventHandler for ToastHandler {
//!     async fn on_alert(&self, alert: Alert) {
//!         println!("{}: {}", alert.title, alert.description);
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::transport::TransportError;

/// Title of the alert raised when a `start` fails
pub const CONNECT_ERROR_TITLE: &str = "There was an error connecting to the agent";

/// Title of the alert raised on a media device failure
pub const MEDIA_DEVICES_ERROR_TITLE: &str = "Encountered an error with your media devices";

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A user-facing, non-blocking notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Event priority levels for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    Low,
    Normal,
    High,
    Critical,
}

/// Discriminant of [`SessionEvent`], used by filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    Connected,
    Disconnected,
    MediaDevicesError,
    Alert,
}

/// Events published by a session controller
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A `start` completed and the transport connected
    Connected {
        server_url: String,
        timestamp: DateTime<Utc>,
    },
    /// The transport reported a disconnection
    Disconnected {
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// A local capture device failed
    MediaDevicesError {
        error: TransportError,
        timestamp: DateTime<Utc>,
    },
    /// Something to show the user
    Alert(Alert),
}

impl SessionEvent {
    pub fn kind(&self) -> SessionEventKind {
        match self {
            SessionEvent::Connected { .. } => SessionEventKind::Connected,
            SessionEvent::Disconnected { .. } => SessionEventKind::Disconnected,
            SessionEvent::MediaDevicesError { .. } => SessionEventKind::MediaDevicesError,
            SessionEvent::Alert(_) => SessionEventKind::Alert,
        }
    }

    pub fn priority(&self) -> EventPriority {
        match self {
            SessionEvent::Connected { .. } => EventPriority::Normal,
            SessionEvent::Disconnected { .. } => EventPriority::High,
            SessionEvent::MediaDevicesError { .. } => EventPriority::High,
            SessionEvent::Alert(_) => EventPriority::Critical,
        }
    }

    /// Check if this event passes the given filter
    pub fn passes_filter(&self, filter: &EventFilter) -> bool {
        if let Some(min_priority) = filter.min_priority {
            if self.priority() < min_priority {
                return false;
            }
        }

        if let Some(kinds) = &filter.kinds {
            if !kinds.contains(&self.kind()) {
                return false;
            }
        }

        true
    }
}

/// Event filtering options for selective subscription
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only receive these kinds of events (None = all kinds)
    pub kinds: Option<HashSet<SessionEventKind>>,
    /// Minimum event priority level (None = all priorities)
    pub min_priority: Option<EventPriority>,
}

/// Handler for session events
///
/// Every callback has an empty default; implement the ones you need.
/// [`on_session_event`](SessionEventHandler::on_session_event) is the
/// dispatch point and can be overridden to see every event raw.
#[async_trait]
pub trait SessionEventHandler: Send + Sync {
    async fn on_alert(&self, _alert: Alert) {}

    async fn on_connected(&self, _server_url: String) {}

    async fn on_disconnected(&self, _reason: Option<String>) {}

    async fn on_media_devices_error(&self, _error: TransportError) {}

    async fn on_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Connected { server_url, .. } => self.on_connected(server_url).await,
            SessionEvent::Disconnected { reason, .. } => self.on_disconnected(reason).await,
            SessionEvent::MediaDevicesError { error, .. } => self.on_media_devices_error(error).await,
            SessionEvent::Alert(alert) => self.on_alert(alert).await,
        }
    }
}

/// A handler together with the filter deciding what it receives
#[derive(Clone)]
pub struct EventSubscription {
    handler: Arc<dyn SessionEventHandler>,
    filter: EventFilter,
    id: uuid::Uuid,
}

impl EventSubscription {
    pub fn new(handler: Arc<dyn SessionEventHandler>, filter: EventFilter) -> Self {
        Self {
            handler,
            filter,
            id: uuid::Uuid::new_v4(),
        }
    }

    /// Subscription receiving every event
    pub fn all_events(handler: Arc<dyn SessionEventHandler>) -> Self {
        Self::new(handler, EventFilter::default())
    }

    /// Subscription receiving alerts only
    pub fn alerts(handler: Arc<dyn SessionEventHandler>) -> Self {
        Self::new(
            handler,
            EventFilter {
                kinds: Some(HashSet::from([SessionEventKind::Alert])),
                min_priority: None,
            },
        )
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn should_receive(&self, event: &SessionEvent) -> bool {
        event.passes_filter(&self.filter)
    }

    pub async fn deliver_event(&self, event: SessionEvent) {
        if self.should_receive(&event) {
            self.handler.on_session_event(event).await;
        }
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Fan-out of session events to subscriptions and broadcast receivers
pub struct EventEmitter {
    subscriptions: RwLock<Vec<EventSubscription>>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl EventEmitter {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            subscriptions: RwLock::new(Vec::new()),
            event_tx,
        }
    }

    /// Register a subscription, returning its id for [`unsubscribe`](Self::unsubscribe)
    pub fn subscribe(&self, subscription: EventSubscription) -> uuid::Uuid {
        let id = subscription.id();
        self.subscriptions.write().push(subscription);
        id
    }

    /// Remove a subscription; `false` if it was not registered
    pub fn unsubscribe(&self, subscription_id: uuid::Uuid) -> bool {
        let mut subscriptions = self.subscriptions.write();
        if let Some(pos) = subscriptions.iter().position(|s| s.id() == subscription_id) {
            subscriptions.remove(pos);
            true
        } else {
            false
        }
    }

    /// Raw event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Emit an event to all matching subscriptions
    ///
    /// Handlers run in parallel; this returns once every delivery finished.
    pub async fn emit(&self, event: SessionEvent) {
        self.dispatch(event).finished().await;
    }

    /// Publish an event without waiting for handlers
    ///
    /// The broadcast send happens before this returns; handler deliveries
    /// are spawned and tracked by the returned [`Delivery`].
    pub fn dispatch(&self, event: SessionEvent) -> Delivery {
        // No receivers is fine.
        let _ = self.event_tx.send(event.clone());

        let subscriptions = self.subscriptions.read().clone();
        let tasks = subscriptions
            .into_iter()
            .map(|subscription| {
                let event = event.clone();
                tokio::spawn(async move {
                    subscription.deliver_event(event).await;
                })
            })
            .collect();

        Delivery { tasks }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}

/// Handler deliveries of one dispatched event
///
/// Dropping it detaches the deliveries; they still run.
#[derive(Debug)]
pub struct Delivery {
    tasks: Vec<JoinHandle<()>>,
}

impl Delivery {
    /// Wait until every handler has returned
    pub async fn finished(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!("Error delivering session event: {}", e);
            }
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
