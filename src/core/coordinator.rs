use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::alerts::engine::AlertEngine;
use super::feed::FeedSource;
use super::toast::ToastMessage;
use super::watcher::{FeedWatcher, TickMode, TickOutcome};

/// Operator actions forwarded to the running loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    /// Poll right now and report failures
    Refresh,
    TestAlarm,
    ToggleSound,
}

/// Owns the feed watcher and the alert engine and drives both from one task,
/// so ticks never overlap.
pub struct Coordinator {
    watcher: FeedWatcher,
    engine: AlertEngine,
    period: Duration,
}

impl Coordinator {
    pub fn new(source: Arc<dyn FeedSource>, engine: AlertEngine, period: Duration) -> Self {
        Self {
            watcher: FeedWatcher::new(source),
            engine,
            period: period.max(Duration::from_secs(1)),
        }
    }

    /// Start the loop on the current runtime: one explicit poll right away,
    /// then a background poll every period.
    pub fn spawn(self) -> CoordinatorHandle {
        let (tx, rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let toasts = self.engine.toast().subscribe();
        let task = tokio::spawn(self.run(rx, cancel.clone()));
        CoordinatorHandle {
            tx,
            cancel,
            toasts,
            task,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<LoopCommand>, cancel: CancellationToken) {
        info!("Watching for new records every {:?}", self.period);

        if self.tick_unless_cancelled(TickMode::Explicit, &cancel).await.is_some() {
            let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let keep_going = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => false,
                    command = rx.recv() => match command {
                        Some(command) => self.handle(command, &cancel).await,
                        None => false,
                    },
                    _ = ticker.tick() => {
                        self.tick_unless_cancelled(TickMode::Background, &cancel).await.is_some()
                    }
                };
                if !keep_going {
                    break;
                }
            }
        }

        self.engine.teardown();
        let state = self.watcher.state();
        if state.is_baseline() {
            info!("Watcher stopped before any successful poll");
        } else {
            let (orders, reservations) = state.marks();
            info!(
                "Watcher stopped at order #{} and reservation #{}",
                orders, reservations
            );
        }
    }

    /// Returns false when the loop should stop.
    async fn handle(&mut self, command: LoopCommand, cancel: &CancellationToken) -> bool {
        debug!("Loop command: {:?}", command);
        match command {
            LoopCommand::Refresh => {
                return self.tick_unless_cancelled(TickMode::Explicit, cancel).await.is_some();
            }
            LoopCommand::TestAlarm => {
                if let Err(e) = self.engine.test_alarm() {
                    warn!("Test alarm could not play: {}", e);
                }
            }
            LoopCommand::ToggleSound => {
                self.engine.toggle_sound();
            }
        }
        true
    }

    /// A poll still in flight when teardown starts is dropped, so its result
    /// never reaches the engine.
    async fn tick_unless_cancelled(
        &mut self,
        mode: TickMode,
        cancel: &CancellationToken,
    ) -> Option<TickOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = self.watcher.tick(mode, &mut self.engine) => Some(outcome),
        }
    }
}

pub struct CoordinatorHandle {
    tx: mpsc::Sender<LoopCommand>,
    cancel: CancellationToken,
    toasts: watch::Receiver<Option<ToastMessage>>,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    pub async fn send(&self, command: LoopCommand) {
        if self.tx.send(command).await.is_err() {
            debug!("Watcher already stopped, dropping {:?}", command);
        }
    }

    /// Receiver following the toast slot of the running engine.
    pub fn toasts(&self) -> watch::Receiver<Option<ToastMessage>> {
        self.toasts.clone()
    }

    /// Stop the loop, wait for teardown to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Watcher task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alerts::engine::AlertEngineConfig;
    use crate::core::host::HostSurface;
    use crate::core::model::Feed;
    use crate::core::preference::{MemoryKeyValueStore, SoundPreference};
    use crate::core::testing::{MemoryHost, RecordingAudio, ScriptedFeed};
    use crate::core::toast::ToastKind;
    use std::sync::atomic::Ordering;

    const TITLE: &str = "Admin Panel";

    struct Rig {
        feed: Arc<ScriptedFeed>,
        host: Arc<MemoryHost>,
        audio: RecordingAudio,
        preference: SoundPreference,
    }

    fn rig() -> Rig {
        Rig {
            feed: ScriptedFeed::new(),
            host: MemoryHost::new(TITLE),
            audio: RecordingAudio::default(),
            preference: SoundPreference::new(Arc::new(MemoryKeyValueStore::default())),
        }
    }

    fn start(rig: &Rig) -> CoordinatorHandle {
        let engine = AlertEngine::new(
            AlertEngineConfig::default_enabled(),
            rig.host.clone(),
            rig.preference.clone(),
        )
        .with_audio(Box::new(rig.audio.clone()));
        Coordinator::new(rig.feed.clone(), engine, Duration::from_secs(8)).spawn()
    }

    #[tokio::test(start_paused = true)]
    async fn test_baseline_then_alert_on_next_interval() {
        let rig = rig();
        rig.feed.set(Feed::Orders, &[1, 2]);
        let handle = start(&rig);

        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(rig.feed.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(rig.audio.play_count(), 0);
        assert!(handle.toasts().borrow().is_none());

        rig.feed.set(Feed::Orders, &[1, 2, 3]);
        time::sleep(Duration::from_secs(8)).await;

        assert_eq!(rig.feed.fetches.load(Ordering::SeqCst), 4);
        assert_eq!(rig.audio.play_count(), 1);
        let toast = handle.toasts().borrow().clone().unwrap();
        assert_eq!(toast.kind, ToastKind::Success);
        assert_eq!(toast.text, "Yeni kayıt geldi (Sipariş: 1)");

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_failure_stays_quiet() {
        let rig = rig();
        let handle = start(&rig);
        time::sleep(Duration::from_millis(10)).await;

        rig.feed.fail(Feed::Orders);
        time::sleep(Duration::from_secs(8)).await;

        // The failing poll did run
        assert!(rig.feed.fetches.load(Ordering::SeqCst) > 2);
        assert!(handle.toasts().borrow().is_none());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_shows_error() {
        let rig = rig();
        let handle = start(&rig);
        time::sleep(Duration::from_millis(10)).await;

        rig.feed.fail(Feed::Reservations);
        handle.send(LoopCommand::Refresh).await;
        time::sleep(Duration::from_millis(10)).await;

        let toast = handle.toasts().borrow().clone().unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.text, "Bildirim kontrolü başarısız");
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_reach_engine() {
        let rig = rig();
        let handle = start(&rig);
        time::sleep(Duration::from_millis(10)).await;

        handle.send(LoopCommand::ToggleSound).await;
        time::sleep(Duration::from_millis(10)).await;
        assert!(!rig.preference.is_armed());

        // The test alarm plays even while the sound preference is off
        handle.send(LoopCommand::TestAlarm).await;
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(rig.audio.play_count(), 1);
        assert_eq!(
            handle.toasts().borrow().clone().unwrap().text,
            "Test sesi çalındı"
        );

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_blink_restores_title() {
        let rig = rig();
        let handle = start(&rig);
        time::sleep(Duration::from_millis(10)).await;

        rig.feed.set(Feed::Reservations, &[1]);
        time::sleep(Duration::from_secs(10)).await;
        assert_ne!(rig.host.history.lock().unwrap().len(), 0);

        handle.shutdown().await;
        assert_eq!(rig.host.title(), TITLE);
        assert!(rig.audio.closed.load(Ordering::SeqCst));

        // Nothing changes the title once the loop is gone
        let writes = rig.host.history.lock().unwrap().len();
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(rig.host.history.lock().unwrap().len(), writes);
        assert_eq!(rig.feed.fetches.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drops_poll_in_flight() {
        let rig = rig();
        let handle = start(&rig);
        time::sleep(Duration::from_millis(10)).await;

        // The next interval poll sees a new order but hangs for a minute
        rig.feed.set(Feed::Orders, &[1]);
        rig.feed.respond_after(Duration::from_secs(60));
        time::sleep(Duration::from_secs(9)).await;
        assert_eq!(rig.feed.fetches.load(Ordering::SeqCst), 4);

        let started = Instant::now();
        handle.shutdown().await;
        assert!(started.elapsed() < Duration::from_secs(1));

        // Long after the response would have landed: nothing reached the engine
        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(rig.audio.play_count(), 0);
        assert!(rig.host.history.lock().unwrap().is_empty());
        assert_eq!(rig.host.title(), TITLE);
        assert_eq!(rig.feed.fetches.load(Ordering::SeqCst), 4);
    }
}
