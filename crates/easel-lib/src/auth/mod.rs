//! Bearer credential storage
//!
//! The credential is written by the login flow and read by the notification
//! gateway. It is kept under two keys: `access_token` (current) and `token`
//! (legacy). Both are written together and removed together so that older
//! readers and the gateway never disagree about whether a session exists.

use anyhow::{Context, Result};
use directories::BaseDirs;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key used by current clients
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Key written by older login flows
pub const LEGACY_TOKEN_KEY: &str = "token";

const CREDENTIAL_FILE: &str = "credentials.json";

/// Opaque bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

// Never print the token itself
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "Credential({}...)", prefix)
    }
}

/// Process-wide credential storage.
///
/// `get` is a plain read: an absent credential is the anonymous state, not an
/// error. Only the gateway (on auth failure) and the login/logout flow call
/// the mutating methods.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Credential>;
    fn set(&self, credential: Credential) -> Result<()>;
    /// Remove the credential under both keys.
    fn clear(&self) -> Result<()>;
    /// Remove the credential only if it is still `credential`. Returns
    /// whether anything was removed; a newer login is left untouched.
    fn clear_if_current(&self, credential: &Credential) -> Result<bool>;
}

type KeyMap = BTreeMap<String, String>;

fn resolve(map: &KeyMap) -> Option<Credential> {
    map.get(ACCESS_TOKEN_KEY)
        .or_else(|| map.get(LEGACY_TOKEN_KEY))
        .filter(|t| !t.is_empty())
        .map(|t| Credential::new(t.clone()))
}

fn store_both(map: &mut KeyMap, credential: &Credential) {
    map.insert(ACCESS_TOKEN_KEY.to_string(), credential.secret().to_string());
    map.insert(LEGACY_TOKEN_KEY.to_string(), credential.secret().to_string());
}

fn remove_both(map: &mut KeyMap) {
    map.remove(ACCESS_TOKEN_KEY);
    map.remove(LEGACY_TOKEN_KEY);
}

/// In-memory store, used by tests and by embedders that manage persistence
/// themselves.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<KeyMap>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(token: &str) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            store_both(&mut entries, &Credential::new(token));
        }
        store
    }

    /// Seed a single raw key, e.g. a value left behind by an older client.
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.entries.lock().ok().and_then(|entries| resolve(&entries))
    }

    fn set(&self, credential: Credential) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("credential store lock poisoned"))?;
        store_both(&mut entries, &credential);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("credential store lock poisoned"))?;
        remove_both(&mut entries);
        Ok(())
    }

    fn clear_if_current(&self, credential: &Credential) -> Result<bool> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("credential store lock poisoned"))?;
        if resolve(&entries).as_ref() != Some(credential) {
            return Ok(false);
        }
        remove_both(&mut entries);
        Ok(true)
    }
}

/// Credential store persisted as a small JSON object on disk.
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store located in the default application config directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(default_credential_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> KeyMap {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return KeyMap::new(),
            Err(e) => {
                log::warn!("[auth] Failed to read credential file {:?}: {}", self.path, e);
                return KeyMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                log::warn!("[auth] Ignoring malformed credential file {:?}: {}", self.path, e);
                KeyMap::new()
            }
        }
    }

    fn write_map(&self, map: &KeyMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create credential directory")?;
        }
        let content = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, content).context("Failed to write credential file")?;
        Ok(())
    }

    fn update(&self, updater: impl FnOnce(&mut KeyMap)) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("credential file lock poisoned"))?;
        let mut map = self.read_map();
        updater(&mut map);
        self.write_map(&map)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credential> {
        resolve(&self.read_map())
    }

    fn set(&self, credential: Credential) -> Result<()> {
        self.update(|map| store_both(map, &credential))?;
        log::info!("[auth] Stored credential");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(remove_both)?;
        log::info!("[auth] Cleared stored credential");
        Ok(())
    }

    fn clear_if_current(&self, credential: &Credential) -> Result<bool> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("credential file lock poisoned"))?;
        let mut map = self.read_map();
        if resolve(&map).as_ref() != Some(credential) {
            return Ok(false);
        }
        remove_both(&mut map);
        self.write_map(&map)?;
        log::info!("[auth] Cleared stored credential");
        Ok(true)
    }
}

/// Application config directory (~/.config/.Easel or %APPDATA%/.Easel)
pub fn app_config_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("Failed to determine user's config directory"))?;

    Ok(base_dirs.config_dir().join(".Easel"))
}

pub fn default_credential_path() -> Result<PathBuf> {
    Ok(app_config_dir()?.join(CREDENTIAL_FILE))
}
