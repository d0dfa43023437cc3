// Alert system: turns new-record counts into operator alerts.
//
// - model.rs: alert event, channel kinds and their tunables
// - triggers.rs: how many records lie above a high-water mark
// - engine.rs: fans one alert out to every enabled channel
// - channels/: tone, title blink, haptic pulse, system notification

pub mod channels;
pub mod engine;
pub mod model;
pub mod triggers;
