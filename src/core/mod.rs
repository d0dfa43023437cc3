pub mod alerts;
pub mod config;
pub mod coordinator;
pub mod feed;
pub mod host;
pub mod model;
pub mod preference;
pub mod state;
pub mod toast;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;
