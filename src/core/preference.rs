//! Durable "sound on" preference.
//!
//! The flag lives in a small key-value store so the watcher does not care
//! whether it ends up in a JSON file, memory, or somewhere else.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use log::warn;

/// Key under which the tone preference is stored
pub const SOUND_PREFERENCE_KEY: &str = "adminSoundEnabled";

/// Minimal string key-value persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

/// Stores all keys in one JSON object on disk.
pub struct FileKeyValueStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> io::Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A corrupt file is replaced rather than blocking every future write
        let mut values = self.read_all().unwrap_or_default();
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&values)?;
        fs::write(&self.path, content)
    }
}

/// Volatile store, used when no config directory is available and in tests.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Whether the tone channel is armed. Shared between the tone channel
/// (reader) and the toggle gesture (writer).
#[derive(Clone)]
pub struct SoundPreference {
    store: Arc<dyn KeyValueStore>,
}

impl SoundPreference {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Only an explicit "0" disarms; missing, unreadable or unknown values arm.
    pub fn is_armed(&self) -> bool {
        match self.store.get(SOUND_PREFERENCE_KEY) {
            Ok(Some(value)) => value != "0",
            Ok(None) => true,
            Err(e) => {
                warn!("Failed to read sound preference, assuming on: {}", e);
                true
            }
        }
    }

    pub fn set_armed(&self, armed: bool) {
        let value = if armed { "1" } else { "0" };
        if let Err(e) = self.store.set(SOUND_PREFERENCE_KEY, value) {
            warn!("Failed to persist sound preference: {}", e);
        }
    }
}
