//! Desktop notifications.

use async_trait::async_trait;
use notify_rust::Notification;
use tracing::{debug, warn};

const APP_NAME: &str = "Reel to Tube";

/// Fire-and-forget user notifications; delivery is not guaranteed.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show_notification(&self, title: &str, message: &str);
}

/// `Notifier` backed by notify-rust.
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn show_notification(&self, title: &str, message: &str) {
        debug!("Notification: {} - {}", title, message);

        if let Err(e) = Notification::new()
            .summary(title)
            .body(message)
            .appname(APP_NAME)
            .show()
        {
            warn!("Failed to show notification '{}': {}", title, e);
        }
    }
}
