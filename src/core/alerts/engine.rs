// Alert engine - fans a new-records event out to every alert channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::channels::haptic::{HapticPulse, Vibrator};
use super::channels::notification::{Notifier, SystemNotification};
use super::channels::title_blink::TitleBlink;
use super::channels::tone::{AudioDevice, ToneSequence};
use super::channels::{AlertChannel, ChannelError};
use super::model::{
    AlertChannelKind, AlertEvent, BlinkSettings, ChannelConfig, HapticSettings, ToneSettings,
    POLL_FAILED_TEXT, TEST_ALARM_TEXT,
};
use crate::core::host::HostSurface;
use crate::core::preference::SoundPreference;
use crate::core::toast::{ToastKind, ToastPresenter};

/// Alert engine configuration - persisted in settings.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEngineConfig {
    /// Per-channel configuration
    #[serde(default)]
    pub channels: HashMap<AlertChannelKind, ChannelConfig>,
    #[serde(default)]
    pub tone: ToneSettings,
    #[serde(default)]
    pub blink: BlinkSettings,
    #[serde(default)]
    pub haptic: HapticSettings,
    #[serde(default = "default_toast_ms")]
    pub toast_ms: u64,
}

fn default_toast_ms() -> u64 {
    3500
}

impl Default for AlertEngineConfig {
    fn default() -> Self {
        Self::default_enabled()
    }
}

impl AlertEngineConfig {
    /// Create config with all channels enabled at default settings
    pub fn default_enabled() -> Self {
        let mut channels = HashMap::new();
        for kind in AlertChannelKind::all() {
            channels.insert(*kind, ChannelConfig::default());
        }
        Self {
            channels,
            tone: ToneSettings::default(),
            blink: BlinkSettings::default(),
            haptic: HapticSettings::default(),
            toast_ms: default_toast_ms(),
        }
    }

    /// Channels missing from the config count as enabled
    pub fn is_enabled(&self, kind: AlertChannelKind) -> bool {
        self.channels.get(&kind).map(|c| c.enabled).unwrap_or(true)
    }

    pub fn toast_window(&self) -> Duration {
        if self.toast_ms == 0 {
            Duration::from_millis(default_toast_ms())
        } else {
            Duration::from_millis(self.toast_ms)
        }
    }
}

/// What each channel did with one alert.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<(AlertChannelKind, Result<(), ChannelError>)>,
}

impl DispatchReport {
    #[cfg(test)]
    pub fn fired(&self, kind: AlertChannelKind) -> bool {
        self.outcomes
            .iter()
            .any(|(k, result)| *k == kind && result.is_ok())
    }

    /// Names of the channels that went off, in dispatch order
    pub fn fired_names(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|(_, result)| result.is_ok())
            .map(|(kind, _)| kind.display_name())
            .collect()
    }

    #[cfg(test)]
    pub fn outcome(&self, kind: AlertChannelKind) -> Option<&Result<(), ChannelError>> {
        self.outcomes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, result)| result)
    }
}

/// Alert engine state
pub struct AlertEngine {
    config: AlertEngineConfig,
    host: Arc<dyn HostSurface>,
    tone: ToneSequence,
    blink: TitleBlink,
    haptic: HapticPulse,
    notification: SystemNotification,
    toast: ToastPresenter,
}

impl AlertEngine {
    /// Engine with no audio, vibration or notification backend; attach them
    /// with the `with_*` builders.
    pub fn new(
        config: AlertEngineConfig,
        host: Arc<dyn HostSurface>,
        preference: SoundPreference,
    ) -> Self {
        Self {
            tone: ToneSequence::new(None, preference, config.tone.clone()),
            blink: TitleBlink::new(host.clone(), config.blink.clone()),
            haptic: HapticPulse::new(None, config.haptic.pattern_ms.clone()),
            notification: SystemNotification::new(None, host.clone()),
            toast: ToastPresenter::new(config.toast_window()),
            host,
            config,
        }
    }

    pub fn with_audio(mut self, device: Box<dyn AudioDevice>) -> Self {
        self.tone = ToneSequence::new(
            Some(device),
            self.tone.preference().clone(),
            self.config.tone.clone(),
        );
        self
    }

    pub fn with_vibrator(mut self, vibrator: Box<dyn Vibrator>) -> Self {
        self.haptic = HapticPulse::new(Some(vibrator), self.config.haptic.pattern_ms.clone());
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notification = SystemNotification::new(Some(notifier), self.host.clone());
        self
    }

    pub fn toast(&self) -> &ToastPresenter {
        &self.toast
    }

    pub fn preference(&self) -> &SoundPreference {
        self.tone.preference()
    }

    #[cfg(test)]
    pub fn is_blinking(&self) -> bool {
        self.blink.is_active()
    }

    /// Show the alert toast, then give every enabled channel its go.
    /// A failing channel never keeps the others from running.
    pub fn raise_alert(&mut self, alert: &AlertEvent) -> DispatchReport {
        if alert.is_empty() {
            debug!("Nothing new, no alert raised");
            return DispatchReport::default();
        }
        info!("New records {}", alert.stamped_summary());
        self.toast.show(ToastKind::Success, alert.message());

        let config = &self.config;
        let channels: [&mut dyn AlertChannel; 4] = [
            &mut self.tone,
            &mut self.blink,
            &mut self.haptic,
            &mut self.notification,
        ];

        let mut report = DispatchReport::default();
        for channel in channels {
            let kind = channel.kind();
            if !config.is_enabled(kind) {
                continue;
            }
            let result = channel.fire(alert);
            match &result {
                Ok(()) => debug!("{} fired", kind.display_name()),
                Err(e) => debug!("{} skipped: {}", kind.display_name(), e),
            }
            report.outcomes.push((kind, result));
        }
        report
    }

    /// Surface a failed explicit refresh to the operator.
    pub fn report_poll_failure(&mut self) {
        self.toast.show(ToastKind::Error, POLL_FAILED_TEXT);
    }

    /// Operator gesture: play the alarm whatever the preference says.
    pub fn test_alarm(&mut self) -> Result<(), ChannelError> {
        self.tone.prime();
        self.notification.request_permission();
        let result = self.tone.play();
        if let Err(e) = &result {
            debug!("Test alarm not audible: {}", e);
        }
        self.toast.show(ToastKind::Success, TEST_ALARM_TEXT);
        result
    }

    /// Operator gesture: flip and persist the sound preference.
    /// Returns the new value.
    pub fn toggle_sound(&mut self) -> bool {
        self.tone.prime();
        self.notification.request_permission();
        let armed = !self.tone.preference().is_armed();
        self.tone.preference().set_armed(armed);
        info!("Alarm sound {}", if armed { "on" } else { "off" });
        armed
    }

    /// Release everything the engine holds on the host: title back,
    /// audio closed, toast and its timer gone.
    pub fn teardown(&mut self) {
        self.blink.stop();
        self.tone.release();
        self.toast.clear();
    }
}
