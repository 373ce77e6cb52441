//! Client-local key-value storage and the credential slot built on it.
//!
//! [`KeyValueStore`] is the injectable seam: the gate never touches ambient
//! global storage. [`MemoryStore`] backs tests and short-lived clients,
//! [`FileStore`] keeps a flat JSON object on disk for `gatectl`.
//!
//! [`CredentialSlot`] is the single overwritten slot holding the session
//! credential under two fixed keys. Readers tolerate it being cleared
//! between (or during) their reads.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::warn;

use super::credential::{ACCESS_TOKEN_KEY, Credential, EXPIRES_IN_KEY};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(String),

    #[error("malformed store: {0}")]
    Malformed(String),
}

/// Minimal client-local storage: string keys to string values.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn clear(&self, key: &str) -> Result<(), StoreError>;
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

// ── FileStore ─────────────────────────────────────────────────────────────────

/// Flat JSON object on disk. A missing file reads as empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serialises read-modify-write cycles within this process.
    lock: RwLock<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: RwLock::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StoreError::Io(format!("cannot read {}: {e}", self.path.display())));
            }
        };
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&data)
            .map_err(|e| StoreError::Malformed(format!("{}: {e}", self.path.display())))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::Io(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let data = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Malformed(format!("serialise store: {e}")))?;
        fs::write(&self.path, data)
            .map_err(|e| StoreError::Io(format!("cannot write {}: {e}", self.path.display())))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        if !self.path.exists() {
            return Ok(());
        }
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            // A corrupt store has nothing worth keeping.
            Err(StoreError::Malformed(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        entries.remove(key);
        self.write_all(&entries)
    }
}

// ── CredentialSlot ────────────────────────────────────────────────────────────

/// The one place a session credential lives on the client.
#[derive(Clone)]
pub struct CredentialSlot {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialSlot {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current credential, if a token is stored.
    ///
    /// Store failures read as "no credential"; a missing or unparsable expiry
    /// hint reads as `0`.
    pub fn load(&self) -> Option<Credential> {
        let token = match self.store.get(ACCESS_TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => return None,
            Err(e) => {
                warn!(error = %e, "credential store read failed");
                return None;
            }
        };
        let expires_in = self
            .store
            .get(EXPIRES_IN_KEY)
            .ok()
            .flatten()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        Some(Credential::new(token, expires_in))
    }

    pub fn is_present(&self) -> bool {
        self.load().is_some()
    }

    /// Overwrite the slot.
    pub fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        self.store.set(ACCESS_TOKEN_KEY, credential.token())?;
        self.store.set(EXPIRES_IN_KEY, &credential.expires_in().to_string())
    }

    /// Remove both keys. Attempts both even if the first fails.
    pub fn purge(&self) -> Result<(), StoreError> {
        let token = self.store.clear(ACCESS_TOKEN_KEY);
        let expiry = self.store.clear(EXPIRES_IN_KEY);
        token.and(expiry)
    }
}
