//! Host runtime capabilities the worker depends on.
//!
//! The worker never talks to a browser directly. Lifecycle signals,
//! notification display and window management go through [`Host`], so the
//! caching policy runs unchanged under any embedding. [`LocalHost`] is the
//! implementation used by the bundled proxy server.

use crate::config::HostConfig;
use crate::error::{Result, WorkerError};
use crate::utils::logging::redact_url;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

/// A button on a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A system notification as requested by the worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
}

#[async_trait]
pub trait Host: Send + Sync {
    /// Activate the waiting version without waiting for old clients to close.
    async fn skip_waiting(&self) -> Result<()>;

    /// Take control of already-open clients.
    async fn claim_clients(&self) -> Result<()>;

    async fn show_notification(&self, notification: &Notification) -> Result<()>;

    async fn close_notification(&self, tag: &str) -> Result<()>;

    /// Open a client window at `url`, or focus one already showing it.
    async fn open_window(&self, url: &Url) -> Result<()>;
}

/// Everything the host has been asked to do so far.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostSnapshot {
    pub skip_waiting_requested: bool,
    pub clients_claimed: bool,
    pub notifications: Vec<Notification>,
    pub windows: Vec<String>,
}

/// Host used by the standalone proxy.
///
/// Lifecycle signals are recorded. Notifications are kept in memory, keyed by
/// tag, and logged. Windows are recorded and, when enabled, opened in the
/// system browser.
pub struct LocalHost {
    launch_browser: bool,
    state: RwLock<HostSnapshot>,
}

impl LocalHost {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            launch_browser: config.launch_browser,
            state: RwLock::new(HostSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> HostSnapshot {
        self.state.read().clone()
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new(&HostConfig::default())
    }
}

#[async_trait]
impl Host for LocalHost {
    async fn skip_waiting(&self) -> Result<()> {
        debug!("Host: skip waiting requested");
        self.state.write().skip_waiting_requested = true;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<()> {
        debug!("Host: claiming clients");
        self.state.write().clients_claimed = true;
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<()> {
        info!(
            "Notification [{}] {}: {}",
            notification.tag, notification.title, notification.body
        );
        let mut state = self.state.write();
        // Same tag replaces the previous notification
        state.notifications.retain(|n| n.tag != notification.tag);
        state.notifications.push(notification.clone());
        Ok(())
    }

    async fn close_notification(&self, tag: &str) -> Result<()> {
        debug!("Closing notification [{}]", tag);
        self.state.write().notifications.retain(|n| n.tag != tag);
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<()> {
        {
            let mut state = self.state.write();
            if state.windows.iter().any(|w| w == url.as_str()) {
                debug!("Focusing existing window {}", redact_url(url));
                return Ok(());
            }
            state.windows.push(url.to_string());
        }

        info!("Opening window {}", redact_url(url));
        if self.launch_browser {
            open::that(url.as_str())
                .map_err(|e| WorkerError::Host(format!("failed to open {}: {}", redact_url(url), e)))?;
        }
        Ok(())
    }
}
