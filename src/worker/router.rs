// Event dispatch and worker lifecycle

use super::manager::{CacheManager, FetchResponse, InstallOutcome, WorkerSettings};
use super::messages::{ClientMessage, MessageOutcome};
use super::notifications::{self, ClickOutcome, NotificationClick};
use crate::cache::CacheStorage;
use crate::config::AppConfig;
use crate::error::{Result, WorkerError};
use crate::host::{Host, Notification};
use crate::metrics;
use crate::network::{FetchRequest, Network};
use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Background sync tag under which the app queues training data.
pub const SYNC_TRAINING_DATA: &str = "sync-training-data";

/// Lifecycle states of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install or activation failed; this version will never control clients.
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Events delivered by the host.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(FetchRequest),
    Sync { tag: String },
    Push { payload: Option<Bytes> },
    NotificationClick(NotificationClick),
    Message(Value),
}

impl WorkerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerEvent::Install => "install",
            WorkerEvent::Activate => "activate",
            WorkerEvent::Fetch(_) => "fetch",
            WorkerEvent::Sync { .. } => "sync",
            WorkerEvent::Push { .. } => "push",
            WorkerEvent::NotificationClick(_) => "notificationclick",
            WorkerEvent::Message(_) => "message",
        }
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Installed(InstallOutcome),
    Activated { deleted: Vec<String> },
    Fetch(FetchResponse),
    Synced { tag: String, handled: bool },
    NotificationShown(Notification),
    NotificationClicked(ClickOutcome),
    Message(MessageOutcome),
}

/// The worker as seen by its host: one entry point per event type, plus the
/// lifecycle state that gates fetch interception.
pub struct ServiceWorker {
    manager: Arc<CacheManager>,
    notifications: crate::config::NotificationConfig,
    state: RwLock<WorkerState>,
}

impl ServiceWorker {
    pub fn new(manager: Arc<CacheManager>, notifications: crate::config::NotificationConfig) -> Self {
        Self {
            manager,
            notifications,
            state: RwLock::new(WorkerState::Parsed),
        }
    }

    /// Build a worker from configuration and host capabilities.
    pub fn from_config(
        config: &AppConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        host: Arc<dyn Host>,
    ) -> Result<Self> {
        let settings = WorkerSettings::from_config(&config.worker)?;
        let manager = CacheManager::new(settings, storage, network, host);
        Ok(Self::new(Arc::new(manager), config.notifications.clone()))
    }

    pub fn manager(&self) -> &Arc<CacheManager> {
        &self.manager
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    fn set_state(&self, state: WorkerState) {
        let mut current = self.state.write();
        if *current != state {
            debug!("Worker state {} -> {}", *current, state);
            *current = state;
        }
    }

    /// Run install then activate, as a freshly registered version does.
    pub async fn start(&self) -> Result<()> {
        self.dispatch(WorkerEvent::Install).await?;
        self.dispatch(WorkerEvent::Activate).await?;
        Ok(())
    }

    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome> {
        debug!("Dispatching {} event", event.name());
        match event {
            WorkerEvent::Install => self.on_install().await.map(EventOutcome::Installed),
            WorkerEvent::Activate => self
                .on_activate()
                .await
                .map(|deleted| EventOutcome::Activated { deleted }),
            WorkerEvent::Fetch(request) => self.on_fetch(&request).await.map(EventOutcome::Fetch),
            WorkerEvent::Sync { tag } => Ok(self.on_sync(tag)),
            WorkerEvent::Push { payload } => notifications::handle_push(
                self.manager.host().as_ref(),
                &self.notifications,
                payload.as_deref(),
            )
            .await
            .map(EventOutcome::NotificationShown),
            WorkerEvent::NotificationClick(click) => {
                let root = self.manager.resolve("/")?;
                notifications::handle_click(self.manager.host().as_ref(), &self.notifications, &click, &root)
                    .await
                    .map(EventOutcome::NotificationClicked)
            }
            WorkerEvent::Message(value) => self.on_message(value).await.map(EventOutcome::Message),
        }
    }

    async fn on_install(&self) -> Result<InstallOutcome> {
        self.set_state(WorkerState::Installing);
        match self.manager.install().await {
            Ok(outcome) => {
                self.set_state(WorkerState::Installed);
                Ok(outcome)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn on_activate(&self) -> Result<Vec<String>> {
        let state = self.state();
        if !matches!(state, WorkerState::Installed | WorkerState::Activated) {
            return Err(WorkerError::InvalidRequest(format!(
                "cannot activate a worker in state {}",
                state
            )));
        }

        self.set_state(WorkerState::Activating);
        match self.manager.activate().await {
            Ok(deleted) => {
                self.set_state(WorkerState::Activated);
                Ok(deleted)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn on_fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        if !self.state().can_intercept_fetch() {
            debug!("Worker is {}, not intercepting {}", self.state(), request.method);
            return Ok(FetchResponse::Passthrough);
        }
        self.manager.handle_fetch(request).await
    }

    fn on_sync(&self, tag: String) -> EventOutcome {
        info!("Background sync: {}", tag);
        if tag == SYNC_TRAINING_DATA {
            // Training data is reconciled by the app itself once it is back online
            metrics::record_lifecycle("sync", "success");
            EventOutcome::Synced { tag, handled: true }
        } else {
            metrics::record_lifecycle("sync", "ignored");
            EventOutcome::Synced { tag, handled: false }
        }
    }

    async fn on_message(&self, value: Value) -> Result<MessageOutcome> {
        let message = ClientMessage::from_value(value)?;
        info!("Message received: {}", message.kind());
        metrics::record_client_message(message.kind());

        match message {
            ClientMessage::SkipWaiting => {
                self.manager.host().skip_waiting().await?;
                Ok(MessageOutcome::SkippedWaiting)
            }
            ClientMessage::CacheUrls { urls } => {
                let entries = self.manager.cache_urls(&urls).await?;
                Ok(MessageOutcome::Cached { entries })
            }
            ClientMessage::Unknown => {
                warn!("Ignoring message of unknown type");
                Ok(MessageOutcome::Ignored)
            }
        }
    }
}
