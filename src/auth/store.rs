//! Persisted credential storage
//!
//! The [`TokenStore`] is the only place credentials live. It sits on top of a
//! plain string key-value backend; reads never fail and a missing or corrupt
//! entry reads as empty.

use crate::auth::models::{CredentialPair, Role};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const ACCESS_KEY: &str = "access";
pub const REFRESH_KEY: &str = "refresh";
pub const EMAIL_KEY: &str = "email";
pub const ROLE_KEY: &str = "role";

const SESSION_FILENAME: &str = "session.json";

/// Synchronous string key-value persistence
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);

    /// Replace several entries in one write
    fn set_many(&self, entries: &[(&str, &str)]) {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    /// Remove several entries in one write
    fn remove_many(&self, keys: &[&str]) {
        for key in keys {
            self.remove(key);
        }
    }
}

/// In-process storage, lost when the process exits
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// A JSON object on disk holding every entry
///
/// Each write rewrites the whole file. An unreadable or corrupt file reads as
/// empty; write failures are logged and otherwise ignored.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Session file in the platform data directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("edu", "RainSafe", "rainsafe")
            .map(|dirs| dirs.data_dir().join(SESSION_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> BTreeMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt session file {}: {}", self.path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Cannot read session file {}: {}", self.path.display(), e);
                BTreeMap::new()
            }
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content)
    }

    fn modify(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) {
        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut entries = self.load();
        apply(&mut entries);
        if let Err(e) = self.persist(&entries) {
            warn!("Failed to write session file {}: {}", self.path.display(), e);
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &str) {
        self.set_many(&[(key, value)]);
    }

    fn remove(&self, key: &str) {
        self.remove_many(&[key]);
    }

    fn set_many(&self, new_entries: &[(&str, &str)]) {
        self.modify(|entries| {
            for (key, value) in new_entries {
                entries.insert(key.to_string(), value.to_string());
            }
        });
    }

    fn remove_many(&self, keys: &[&str]) {
        self.modify(|entries| {
            for key in keys {
                entries.remove(*key);
            }
        });
    }
}

/// Owner of the persisted credential pair
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Token store backed by process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Persist both tokens
    pub fn save(&self, pair: &CredentialPair) {
        self.backend.set_many(&[
            (ACCESS_KEY, pair.access_token.as_str()),
            (REFRESH_KEY, pair.refresh_token.as_str()),
        ]);
        debug!("Saved credential pair");
    }

    /// Keep display copies of the profile so it can be shown without decoding
    pub fn save_profile(&self, email: &str, role: &str) {
        self.backend.set_many(&[(EMAIL_KEY, email), (ROLE_KEY, role)]);
    }

    /// Stored credential pair. Both tokens must be present and non-empty.
    pub fn read(&self) -> Option<CredentialPair> {
        let access_token = self.access_token()?;
        let refresh_token = self.refresh_token()?;
        Some(CredentialPair {
            access_token,
            refresh_token,
        })
    }

    pub fn access_token(&self) -> Option<String> {
        self.non_empty(ACCESS_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.non_empty(REFRESH_KEY)
    }

    /// Display copy of the email, written at login
    pub fn stored_email(&self) -> Option<String> {
        self.non_empty(EMAIL_KEY)
    }

    /// Display copy of the role, written at login
    pub fn stored_role(&self) -> Option<Role> {
        self.non_empty(ROLE_KEY)?.parse().ok()
    }

    /// Forget the credentials and the profile copies
    pub fn clear(&self) {
        self.backend
            .remove_many(&[ACCESS_KEY, REFRESH_KEY, EMAIL_KEY, ROLE_KEY]);
        debug!("Cleared credential pair");
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.backend.get(key).filter(|value| !value.is_empty())
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
