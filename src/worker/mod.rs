//! The offline worker.
//!
//! - `manager`: the caching policy (install, activate, fetch strategies).
//! - `router`: event dispatch and lifecycle state.
//! - `notifications`: push and notification-click handling.
//! - `messages`: messages posted by controlled pages.

pub mod manager;
pub mod messages;
pub mod notifications;
pub mod router;

pub use manager::{
    host_matches, CacheManager, FetchResponse, InstallOutcome, ResponseSource, WorkerSettings,
    OFFLINE_PAGE,
};
pub use messages::{ClientMessage, MessageOutcome};
pub use notifications::{ClickOutcome, NotificationClick};
pub use router::{EventOutcome, ServiceWorker, WorkerEvent, WorkerState, SYNC_TRAINING_DATA};
