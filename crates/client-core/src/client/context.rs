//! Session context shared with the presentation layer
//!
//! A [`SessionContext`] is created when a UI tree mounts and lives until it
//! unmounts. It bundles the immutable [`AppConfig`], the controller, and the
//! display name typed in before a session starts, and publishes a
//! [`SessionContextValue`] snapshot that consumers can watch.
//!
//! ```text
//! mount ──► SessionContext ──► start() / end() / set_display_name()
//!                │
//!                └─► subscribe() ─► SessionContextValue { configuration, is_session_active, display_name }
//!
//! unmount ──► controller teardown (once)
//! ```
//!
//! The context is passed around explicitly as `Arc<SessionContext>`; there
//! is no global instance.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::client::config::{AppConfig, SessionOptions};
use crate::client::controller::{SessionController, StartHandle};
use crate::credentials::CredentialSource;
use crate::events::{SessionEvent, SessionEventHandler};
use crate::transport::Transport;

/// Snapshot published to consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContextValue {
    pub configuration: Arc<AppConfig>,
    pub is_session_active: bool,
    pub display_name: String,
}

/// Per-tree holder of the session controller and its inputs
pub struct SessionContext {
    config: Arc<AppConfig>,
    controller: SessionController,
    display_name: RwLock<String>,
    published: Arc<watch::Sender<SessionContextValue>>,
}

impl SessionContext {
    /// Mount a context: create the controller and start publishing
    ///
    /// The published value follows the controller's active flag
    /// synchronously, so a read right after `start()` already sees `true`.
    /// Must be called from within a Tokio runtime.
    pub fn mount(
        config: AppConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialSource>,
        options: SessionOptions,
    ) -> Arc<Self> {
        let config = Arc::new(config);
        let controller = SessionController::new(transport, credentials, options);

        let (published, _) = watch::channel(SessionContextValue {
            configuration: config.clone(),
            is_session_active: controller.is_session_active(),
            display_name: String::new(),
        });
        let published = Arc::new(published);

        let mirror = published.clone();
        controller.observe_active(move |is_active| {
            mirror.send_if_modified(|value| {
                if value.is_session_active == is_active {
                    false
                } else {
                    value.is_session_active = is_active;
                    true
                }
            });
        });

        info!(agent_name = ?config.agent_name, "Session context mounted");

        Arc::new(Self {
            config,
            controller,
            display_name: RwLock::new(String::new()),
            published,
        })
    }

    pub fn configuration(&self) -> &Arc<AppConfig> {
        &self.config
    }

    pub fn is_session_active(&self) -> bool {
        self.controller.is_session_active()
    }

    pub fn display_name(&self) -> String {
        self.display_name.read().clone()
    }

    /// Replace the display name used by the next `start`
    pub fn set_display_name(&self, name: impl Into<String>) {
        let name = name.into();
        *self.display_name.write() = name.clone();
        self.published.send_if_modified(|value| {
            if value.display_name == name {
                false
            } else {
                value.display_name = name;
                true
            }
        });
    }

    /// Current snapshot, computed fresh
    pub fn value(&self) -> SessionContextValue {
        SessionContextValue {
            configuration: self.config.clone(),
            is_session_active: self.is_session_active(),
            display_name: self.display_name(),
        }
    }

    /// Watch the published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionContextValue> {
        self.published.subscribe()
    }

    /// Start a session with the current configuration and display name
    pub fn start(&self) -> StartHandle {
        let display_name = self.display_name();
        self.controller.start(&self.config, &display_name)
    }

    pub fn end(&self) {
        self.controller.end();
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.controller.subscribe_events()
    }

    pub fn add_event_handler(&self, handler: Arc<dyn SessionEventHandler>) -> uuid::Uuid {
        self.controller.add_event_handler(handler)
    }

    /// Tear the context down
    ///
    /// Shuts the controller down. The teardown runs once no matter how
    /// often this is called; dropping the last reference performs the same
    /// teardown.
    pub async fn unmount(&self) {
        self.controller.shutdown().await;
        debug!("Session context unmounted");
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("config", &self.config)
            .field("display_name", &*self.display_name.read())
            .field("controller", &self.controller)
            .finish()
    }
}
