// In-memory stand-ins for the platform pieces, shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::alerts::channels::haptic::Vibrator;
use super::alerts::channels::notification::{NotificationPermission, Notifier};
use super::alerts::channels::tone::{AudioDevice, AudioState, Beep, ToneOutput};
use super::alerts::channels::ChannelError;
use super::feed::{FeedError, FeedSource};
use super::host::HostSurface;
use super::model::{Feed, WatchedList};

/// Host whose title and visibility live in memory; remembers every title set.
pub struct MemoryHost {
    title: Mutex<String>,
    visible: AtomicBool,
    pub history: Mutex<Vec<String>>,
}

impl MemoryHost {
    pub fn new(title: &str) -> Arc<Self> {
        Arc::new(Self {
            title: Mutex::new(title.to_string()),
            visible: AtomicBool::new(false),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }
}

impl HostSurface for MemoryHost {
    fn title(&self) -> String {
        self.title.lock().unwrap().clone()
    }

    fn set_title(&self, title: &str) {
        *self.title.lock().unwrap() = title.to_string();
        self.history.lock().unwrap().push(title.to_string());
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

/// Audio device recording every beep sequence it is asked to play.
#[derive(Clone, Default)]
pub struct RecordingAudio {
    pub played: Arc<Mutex<Vec<Vec<Beep>>>>,
    pub opened: Arc<AtomicUsize>,
    pub resumed: Arc<AtomicUsize>,
    pub closed: Arc<AtomicBool>,
    pub start_suspended: bool,
    pub resume_fails: bool,
}

impl RecordingAudio {
    pub fn play_count(&self) -> usize {
        self.played.lock().unwrap().len()
    }
}

struct RecordingOutput {
    audio: RecordingAudio,
    state: AudioState,
}

impl AudioDevice for RecordingAudio {
    fn open(&mut self) -> Result<Box<dyn ToneOutput>, ChannelError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let state = if self.start_suspended {
            AudioState::Suspended
        } else {
            AudioState::Running
        };
        Ok(Box::new(RecordingOutput {
            audio: self.clone(),
            state,
        }))
    }
}

impl ToneOutput for RecordingOutput {
    fn state(&self) -> AudioState {
        self.state
    }

    fn resume(&mut self) -> Result<(), ChannelError> {
        self.audio.resumed.fetch_add(1, Ordering::SeqCst);
        if self.audio.resume_fails {
            return Err(ChannelError::Platform("resume refused".to_string()));
        }
        self.state = AudioState::Running;
        Ok(())
    }

    fn play(&mut self, beeps: &[Beep]) -> Result<(), ChannelError> {
        self.audio.played.lock().unwrap().push(beeps.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.audio.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct RecordingVibrator {
    pub patterns: Arc<Mutex<Vec<Vec<u64>>>>,
    pub fails: bool,
}

impl Vibrator for RecordingVibrator {
    fn vibrate(&mut self, pattern: &[u64]) -> Result<(), ChannelError> {
        if self.fails {
            return Err(ChannelError::Platform("motor busy".to_string()));
        }
        self.patterns.lock().unwrap().push(pattern.to_vec());
        Ok(())
    }
}

#[derive(Clone)]
pub struct RecordingNotifier {
    pub permission: Arc<Mutex<NotificationPermission>>,
    /// What the operator answers when asked
    pub grant_on_request: bool,
    pub requests: Arc<AtomicUsize>,
    pub shown: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self {
            permission: Arc::new(Mutex::new(permission)),
            grant_on_request: true,
            requests: Arc::new(AtomicUsize::new(0)),
            shown: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> NotificationPermission {
        *self.permission.lock().unwrap()
    }

    fn request_permission(&mut self) -> NotificationPermission {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let answer = if self.grant_on_request {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        };
        *self.permission.lock().unwrap() = answer;
        answer
    }

    fn show(&mut self, title: &str, body: &str) -> Result<(), ChannelError> {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// Feed source serving whatever lists the test put in, or failing on demand.
#[derive(Default)]
pub struct ScriptedFeed {
    lists: Mutex<HashMap<Feed, Vec<u64>>>,
    failing: Mutex<Vec<Feed>>,
    latency: Mutex<Option<Duration>>,
    pub fetches: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, feed: Feed, ids: &[u64]) {
        self.lists.lock().unwrap().insert(feed, ids.to_vec());
    }

    pub fn fail(&self, feed: Feed) {
        self.failing.lock().unwrap().push(feed);
    }

    pub fn recover(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Every later fetch answers only after `latency` has passed.
    pub fn respond_after(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    async fn fetch(&self, feed: Feed) -> Result<WatchedList, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.lock().unwrap().contains(&feed) {
            return Err(FeedError::Status { feed, status: 503 });
        }
        let ids = self
            .lists
            .lock()
            .unwrap()
            .get(&feed)
            .cloned()
            .unwrap_or_default();
        Ok(WatchedList::from_ids(&ids))
    }
}
