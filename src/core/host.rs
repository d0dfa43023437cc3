//! The window the admin screen lives in: its title and whether the
//! operator can currently see it.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

pub trait HostSurface: Send + Sync {
    fn title(&self) -> String;
    fn set_title(&self, title: &str);
    /// True while the window is shown and focused
    fn is_visible(&self) -> bool;
}

/// Terminal host: the title is pushed with the OSC 0 escape sequence.
///
/// A terminal cannot report focus, so visibility is whatever the owner says
/// it is. A background watcher leaves it at `false`.
pub struct TerminalHost {
    title: Mutex<String>,
    visible: AtomicBool,
}

impl TerminalHost {
    pub fn new(title: impl Into<String>) -> Self {
        let host = Self {
            title: Mutex::new(title.into()),
            visible: AtomicBool::new(false),
        };
        host.write_title(&host.title());
        host
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }

    fn write_title(&self, title: &str) {
        let mut out = io::stdout().lock();
        // Not a tty or closed stdout: the title simply does not show
        let _ = write!(out, "\x1b]0;{}\x07", title);
        let _ = out.flush();
    }
}

impl HostSurface for TerminalHost {
    fn title(&self) -> String {
        self.title
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_title(&self, title: &str) {
        *self.title.lock().unwrap_or_else(PoisonError::into_inner) = title.to_string();
        self.write_title(title);
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }
}
