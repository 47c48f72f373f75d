// Push and notification-click handling

use crate::config::NotificationConfig;
use crate::error::Result;
use crate::host::{Host, Notification, NotificationAction};
use crate::metrics;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

/// Action that opens the app from a notification.
pub const START_ACTION: &str = "start";

/// A click on a shown notification. `action` is `None` when the body of the
/// notification was clicked rather than one of its buttons.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotificationClick {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// The app root was opened or focused.
    OpenedApp(Url),
    /// The notification was closed and nothing else happened.
    Closed,
}

/// Build the notification shown for a push message. The payload, decoded as
/// (lossy) UTF-8, becomes the body; without one the configured reminder is used.
pub fn build_push_notification(config: &NotificationConfig, payload: Option<&[u8]>) -> Notification {
    let body = match payload {
        Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        None => config.default_body.clone(),
    };

    Notification {
        title: config.title.clone(),
        body,
        icon: config.icon.clone(),
        badge: config.badge.clone(),
        vibrate: config.vibrate.clone(),
        tag: config.tag.clone(),
        require_interaction: config.require_interaction,
        actions: config
            .actions
            .iter()
            .map(|a| NotificationAction {
                action: a.action.clone(),
                title: a.title.clone(),
            })
            .collect(),
    }
}

pub async fn handle_push(
    host: &dyn Host,
    config: &NotificationConfig,
    payload: Option<&[u8]>,
) -> Result<Notification> {
    info!("Push received ({} byte payload)", payload.map_or(0, |p| p.len()));
    let notification = build_push_notification(config, payload);
    host.show_notification(&notification).await?;
    metrics::record_notification("shown");
    Ok(notification)
}

/// Close the clicked notification; on the `start` action, open the app root.
pub async fn handle_click(
    host: &dyn Host,
    config: &NotificationConfig,
    click: &NotificationClick,
    app_root: &Url,
) -> Result<ClickOutcome> {
    info!("Notification clicked: {:?}", click.action);
    metrics::record_notification("clicked");

    let tag = click.tag.as_deref().unwrap_or(&config.tag);
    host.close_notification(tag).await?;

    if click.action.as_deref() == Some(START_ACTION) {
        host.open_window(app_root).await?;
        metrics::record_notification("window_opened");
        return Ok(ClickOutcome::OpenedApp(app_root.clone()));
    }

    debug!("No follow-up for notification action {:?}", click.action);
    Ok(ClickOutcome::Closed)
}
