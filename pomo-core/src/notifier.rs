use crate::error::{Error, Result};
use std::path::PathBuf;

/// Shows short messages to the user when a break starts and when the
/// session completes.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Desktop notification through the platform's notification service
#[derive(Debug, Clone, Default)]
pub struct DesktopNotifier {
    icon: Option<PathBuf>,
}

impl DesktopNotifier {
    pub fn new(icon: Option<PathBuf>) -> Self {
        Self { icon }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        let mut notification = notify_rust::Notification::new();
        notification.summary(title).body(body).appname("pomo");
        if let Some(icon) = &self.icon {
            notification.icon(&icon.to_string_lossy());
        }
        notification
            .show()
            .map(|_| ())
            .map_err(|e| Error::Notify(e.to_string()))
    }
}

/// For headless sessions and when notifications are turned off
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _title: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}
