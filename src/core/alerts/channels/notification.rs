// Desktop notification channel.
//
// Only used while the admin window is out of sight, and never asks for
// permission on its own: that happens from an operator gesture.

use std::sync::Arc;

use log::{debug, warn};

use super::{runtime_handle, AlertChannel, ChannelError};
use crate::core::alerts::model::{AlertChannelKind, AlertEvent, NOTIFICATION_TITLE};
use crate::core::host::HostSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// Not asked yet
    Default,
    Granted,
    Denied,
}

pub trait Notifier: Send {
    fn permission(&self) -> NotificationPermission;
    fn request_permission(&mut self) -> NotificationPermission;
    fn show(&mut self, title: &str, body: &str) -> Result<(), ChannelError>;
}

pub struct SystemNotification {
    notifier: Option<Box<dyn Notifier>>,
    host: Arc<dyn HostSurface>,
}

impl SystemNotification {
    pub fn new(notifier: Option<Box<dyn Notifier>>, host: Arc<dyn HostSurface>) -> Self {
        Self { notifier, host }
    }

    /// Ask for permission once; an answered prompt is not repeated.
    /// Call this only from an explicit operator action.
    pub fn request_permission(&mut self) -> Option<NotificationPermission> {
        let notifier = self.notifier.as_mut()?;
        let permission = match notifier.permission() {
            NotificationPermission::Default => notifier.request_permission(),
            answered => answered,
        };
        debug!("Notification permission: {:?}", permission);
        Some(permission)
    }
}

impl AlertChannel for SystemNotification {
    fn kind(&self) -> AlertChannelKind {
        AlertChannelKind::SystemNotification
    }

    fn fire(&mut self, alert: &AlertEvent) -> Result<(), ChannelError> {
        if self.host.is_visible() {
            return Err(ChannelError::HostVisible);
        }
        let notifier = self
            .notifier
            .as_mut()
            .ok_or(ChannelError::Unavailable("desktop notifications"))?;
        if notifier.permission() != NotificationPermission::Granted {
            return Err(ChannelError::PermissionNotGranted);
        }
        notifier.show(NOTIFICATION_TITLE, &alert.message())
    }
}

/// freedesktop/macOS/Windows notifications through notify-rust.
///
/// These platforms have no per-app prompt, so a request is granted as soon
/// as the operator makes it.
pub struct DesktopNotifier {
    app_name: String,
    permission: NotificationPermission,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            permission: NotificationPermission::Default,
        }
    }
}

impl Notifier for DesktopNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&mut self) -> NotificationPermission {
        self.permission = NotificationPermission::Granted;
        self.permission
    }

    fn show(&mut self, title: &str, body: &str) -> Result<(), ChannelError> {
        let handle = runtime_handle()?;
        let mut notification = notify_rust::Notification::new();
        notification
            .summary(title)
            .body(body)
            .appname(&self.app_name)
            .timeout(notify_rust::Timeout::Milliseconds(5000));

        // Delivery goes over the session bus and blocks until the daemon answers
        handle.spawn_blocking(move || {
            if let Err(e) = notification.show() {
                warn!("Desktop notification not delivered: {}", e);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{MemoryHost, RecordingNotifier};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_shows_when_hidden_and_granted() {
        let host = MemoryHost::new("Admin");
        let notifier = RecordingNotifier::new(NotificationPermission::Granted);
        let mut channel = SystemNotification::new(Some(Box::new(notifier.clone())), host);

        channel.fire(&AlertEvent::new(2, 1)).unwrap();
        let shown = notifier.shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, "Yeni Kayıt!");
        assert_eq!(shown[0].1, "Yeni kayıt geldi (Sipariş: 2 • Rezervasyon: 1)");
    }

    #[test]
    fn test_skipped_while_visible() {
        let host = MemoryHost::new("Admin");
        host.set_visible(true);
        let notifier = RecordingNotifier::new(NotificationPermission::Granted);
        let mut channel = SystemNotification::new(Some(Box::new(notifier.clone())), host);

        assert_eq!(channel.fire(&AlertEvent::new(1, 0)), Err(ChannelError::HostVisible));
        assert!(notifier.shown.lock().unwrap().is_empty());
    }

    #[test]
    fn test_never_prompts_from_an_alert() {
        let host = MemoryHost::new("Admin");
        let notifier = RecordingNotifier::new(NotificationPermission::Default);
        let mut channel = SystemNotification::new(Some(Box::new(notifier.clone())), host);

        assert_eq!(
            channel.fire(&AlertEvent::new(1, 0)),
            Err(ChannelError::PermissionNotGranted)
        );
        assert_eq!(notifier.requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_request_only_asks_once() {
        let host = MemoryHost::new("Admin");
        let mut notifier = RecordingNotifier::new(NotificationPermission::Default);
        notifier.grant_on_request = false;
        let mut channel = SystemNotification::new(Some(Box::new(notifier.clone())), host);

        assert_eq!(channel.request_permission(), Some(NotificationPermission::Denied));
        assert_eq!(channel.request_permission(), Some(NotificationPermission::Denied));
        assert_eq!(notifier.requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_desktop_delivery_needs_a_runtime() {
        let mut notifier = DesktopNotifier::new("admin-notifier");
        assert_eq!(notifier.permission(), NotificationPermission::Default);
        assert_eq!(notifier.request_permission(), NotificationPermission::Granted);
        // Outside a runtime there is nowhere to hand the blocking call to
        assert_eq!(
            notifier.show("Yeni Kayıt!", "body"),
            Err(ChannelError::Unavailable("async runtime"))
        );
    }

    #[test]
    fn test_missing_notifier_is_unavailable() {
        let host = MemoryHost::new("Admin");
        let mut channel = SystemNotification::new(None, host);
        assert_eq!(channel.request_permission(), None);
        assert_eq!(
            channel.fire(&AlertEvent::new(1, 0)),
            Err(ChannelError::Unavailable("desktop notifications"))
        );
    }
}
