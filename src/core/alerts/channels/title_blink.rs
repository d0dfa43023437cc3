// Title blink channel: swaps the window title with an alert label on a timer.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{runtime_handle, AlertChannel, ChannelError};
use crate::core::alerts::model::{AlertChannelKind, AlertEvent, BlinkSettings};
use crate::core::host::HostSurface;

#[derive(Debug, Default)]
struct BlinkSession {
    original_title: Option<String>,
    active: bool,
    /// Bumped on every start so a superseded timer never touches the title
    generation: u64,
}

pub struct TitleBlink {
    host: Arc<dyn HostSurface>,
    settings: BlinkSettings,
    session: Arc<Mutex<BlinkSession>>,
    cancel: Option<CancellationToken>,
}

impl TitleBlink {
    pub fn new(host: Arc<dyn HostSurface>, settings: BlinkSettings) -> Self {
        Self {
            host,
            settings,
            session: Arc::new(Mutex::new(BlinkSession::default())),
            cancel: None,
        }
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
    }

    /// Start a blink session, replacing any session already running.
    pub fn start(&mut self) -> Result<(), ChannelError> {
        let handle = runtime_handle()?;

        if let Some(previous) = self.cancel.take() {
            previous.cancel();
        }

        let generation = {
            let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
            // While blinking the host title may be the label, keep the real one
            if !session.active || session.original_title.is_none() {
                session.original_title = Some(self.host.title());
            }
            session.active = true;
            session.generation += 1;
            session.generation
        };

        let token = CancellationToken::new();
        self.cancel = Some(token.clone());

        let host = self.host.clone();
        let session = self.session.clone();
        let label = self.settings.label.clone();
        let period = Duration::from_millis(self.settings.period_ms.max(1));
        let deadline = Instant::now() + Duration::from_secs(self.settings.duration_seconds);

        handle.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut showing_label = false;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = time::sleep_until(deadline) => {
                        restore(&*host, &session, generation);
                        return;
                    }
                    _ = ticker.tick() => {
                        showing_label = !showing_label;
                        let session = session.lock().unwrap_or_else(PoisonError::into_inner);
                        if !session.active || session.generation != generation {
                            return;
                        }
                        match (&session.original_title, showing_label) {
                            (_, true) => host.set_title(&label),
                            (Some(original), false) => host.set_title(original),
                            (None, false) => {}
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// Stop blinking and put the original title back right away.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.active {
            session.active = false;
            if let Some(original) = &session.original_title {
                self.host.set_title(original);
            }
        }
    }
}

fn restore(host: &dyn HostSurface, session: &Mutex<BlinkSession>, generation: u64) {
    let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
    if session.active && session.generation == generation {
        session.active = false;
        if let Some(original) = &session.original_title {
            host.set_title(original);
        }
    }
}

impl AlertChannel for TitleBlink {
    fn kind(&self) -> AlertChannelKind {
        AlertChannelKind::TitleBlink
    }

    fn fire(&mut self, _alert: &AlertEvent) -> Result<(), ChannelError> {
        self.start()
    }
}

impl Drop for TitleBlink {
    fn drop(&mut self) {
        self.stop();
    }
}
