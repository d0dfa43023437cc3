// Alert model types for configuration and events.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Title of the desktop notification raised for new records
pub const NOTIFICATION_TITLE: &str = "Yeni Kayıt!";
/// Toast shown when an explicit refresh fails
pub const POLL_FAILED_TEXT: &str = "Bildirim kontrolü başarısız";
/// Toast shown after the operator plays the test alarm
pub const TEST_ALARM_TEXT: &str = "Test sesi çalındı";

/// The independent channels an alert is escalated through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertChannelKind {
    /// Square-wave beep sequence on the default audio output
    Tone,
    /// Window title alternating with an alert label
    TitleBlink,
    /// Vibration pattern on devices that have a motor
    Haptic,
    /// Desktop notification while the admin window is in the background
    SystemNotification,
}

impl AlertChannelKind {
    /// Get the display name for this channel
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Tone => "Tone",
            Self::TitleBlink => "Title Blink",
            Self::Haptic => "Haptic",
            Self::SystemNotification => "System Notification",
        }
    }

    /// Get a description of what this channel does
    pub fn description(&self) -> &'static str {
        match self {
            Self::Tone => "Play six alternating beeps when the sound preference is on",
            Self::TitleBlink => "Blink the window title for ten seconds",
            Self::Haptic => "Pulse the vibration motor if the device has one",
            Self::SystemNotification => "Show a desktop notification while the window is hidden",
        }
    }

    /// Get all available channel kinds
    pub fn all() -> &'static [AlertChannelKind] {
        &[
            Self::Tone,
            Self::TitleBlink,
            Self::Haptic,
            Self::SystemNotification,
        ]
    }
}

/// Per-channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub enabled: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Shape of the alarm beep sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneSettings {
    #[serde(default = "default_beeps")]
    pub beeps: u32,
    /// Pitch of even beeps
    #[serde(default = "default_base_frequency")]
    pub base_frequency_hz: f32,
    /// Added to the base pitch on odd beeps
    #[serde(default = "default_alternate_step")]
    pub alternate_step_hz: f32,
    #[serde(default = "default_beep_ms")]
    pub beep_ms: u64,
    #[serde(default = "default_gap_ms")]
    pub gap_ms: u64,
    #[serde(default = "default_gain")]
    pub gain: f32,
}

fn default_beeps() -> u32 {
    6
}

fn default_base_frequency() -> f32 {
    880.0
}

fn default_alternate_step() -> f32 {
    220.0
}

fn default_beep_ms() -> u64 {
    120
}

fn default_gap_ms() -> u64 {
    80
}

fn default_gain() -> f32 {
    0.35
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            beeps: default_beeps(),
            base_frequency_hz: default_base_frequency(),
            alternate_step_hz: default_alternate_step(),
            beep_ms: default_beep_ms(),
            gap_ms: default_gap_ms(),
            gain: default_gain(),
        }
    }
}

/// Title blink timing and label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlinkSettings {
    #[serde(default = "default_blink_period")]
    pub period_ms: u64,
    /// The original title comes back after this long even without a stop
    #[serde(default = "default_blink_duration")]
    pub duration_seconds: u64,
    #[serde(default = "default_blink_label")]
    pub label: String,
}

fn default_blink_period() -> u64 {
    700
}

fn default_blink_duration() -> u64 {
    10
}

fn default_blink_label() -> String {
    "🔔 YENİ SİPARİŞ/REZERVASYON!".to_string()
}

impl Default for BlinkSettings {
    fn default() -> Self {
        Self {
            period_ms: default_blink_period(),
            duration_seconds: default_blink_duration(),
            label: default_blink_label(),
        }
    }
}

/// On/off vibration pattern in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapticSettings {
    pub pattern_ms: Vec<u64>,
}

impl Default for HapticSettings {
    fn default() -> Self {
        Self {
            pattern_ms: vec![200, 100, 200, 100, 400],
        }
    }
}

/// New records seen by one poll tick. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub new_orders: u64,
    pub new_reservations: u64,
    pub observed_at: DateTime<Local>,
}

impl AlertEvent {
    pub fn new(new_orders: u64, new_reservations: u64) -> Self {
        Self {
            new_orders,
            new_reservations,
            observed_at: Local::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new_orders == 0 && self.new_reservations == 0
    }

    /// Counts joined for display, zero parts left out: "Sipariş: 2 • Rezervasyon: 1"
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.new_orders > 0 {
            parts.push(format!("Sipariş: {}", self.new_orders));
        }
        if self.new_reservations > 0 {
            parts.push(format!("Rezervasyon: {}", self.new_reservations));
        }
        parts.join(" • ")
    }

    /// Text shared by the toast and the desktop notification body
    pub fn message(&self) -> String {
        format!("Yeni kayıt geldi ({})", self.summary())
    }

    /// Summary prefixed with the local time the poll saw the records
    pub fn stamped_summary(&self) -> String {
        format!("[{}] {}", self.observed_at.format("%H:%M:%S"), self.summary())
    }
}
