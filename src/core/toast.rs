//! Single-slot toast: the newest message replaces the previous one and
//! clears itself after its display window.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Display window for alert toasts
pub const DEFAULT_TOAST_WINDOW: Duration = Duration::from_millis(3500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastMessage {
    pub kind: ToastKind,
    pub text: String,
    /// Sequence number, so an expiry only clears the message it was set for
    pub id: u64,
}

pub struct ToastPresenter {
    tx: Arc<watch::Sender<Option<ToastMessage>>>,
    window: Duration,
    next_id: u64,
    expiry: Option<CancellationToken>,
}

impl ToastPresenter {
    pub fn new(window: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            window,
            next_id: 0,
            expiry: None,
        }
    }

    pub fn show(&mut self, kind: ToastKind, text: impl Into<String>) {
        self.show_for(kind, text, self.window);
    }

    fn show_for(&mut self, kind: ToastKind, text: impl Into<String>, window: Duration) {
        self.cancel_expiry();

        self.next_id += 1;
        let id = self.next_id;
        self.tx.send_replace(Some(ToastMessage {
            kind,
            text: text.into(),
            id,
        }));

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime to expire toast {}, it stays until replaced", id);
            return;
        };

        let token = CancellationToken::new();
        self.expiry = Some(token.clone());
        let tx = self.tx.clone();
        handle.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(window) => {
                    tx.send_if_modified(|current| {
                        if current.as_ref().map(|m| m.id) == Some(id) {
                            *current = None;
                            true
                        } else {
                            false
                        }
                    });
                }
            }
        });
    }

    /// Drop the visible message and any pending expiry.
    pub fn clear(&mut self) {
        self.cancel_expiry();
        self.tx.send_replace(None);
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<ToastMessage> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ToastMessage>> {
        self.tx.subscribe()
    }

    fn cancel_expiry(&mut self) {
        if let Some(token) = self.expiry.take() {
            token.cancel();
        }
    }
}

impl Default for ToastPresenter {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_WINDOW)
    }
}
