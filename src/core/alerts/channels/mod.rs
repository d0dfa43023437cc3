// Alert channels. Each one is best-effort: a channel that cannot run reports
// why through ChannelError and the engine moves on to the next.

pub mod haptic;
pub mod notification;
pub mod title_blink;
pub mod tone;

use thiserror::Error;

use super::model::{AlertChannelKind, AlertEvent};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("{0} is not available on this host")]
    Unavailable(&'static str),

    #[error("notification permission has not been granted")]
    PermissionNotGranted,

    #[error("admin window is visible")]
    HostVisible,

    #[error("sound preference is off")]
    Disarmed,

    #[error("channel was released")]
    Released,

    #[error("platform call failed: {0}")]
    Platform(String),
}

/// One way of telling the operator that new records arrived.
pub trait AlertChannel: Send {
    fn kind(&self) -> AlertChannelKind;

    fn fire(&mut self, alert: &AlertEvent) -> Result<(), ChannelError>;
}

/// Channel timers and blocking platform calls need a tokio runtime to run on.
pub(crate) fn runtime_handle() -> Result<tokio::runtime::Handle, ChannelError> {
    tokio::runtime::Handle::try_current().map_err(|_| ChannelError::Unavailable("async runtime"))
}
