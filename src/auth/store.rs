use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::credential::Credential;
use super::error::AuthError;

/// Key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "spotifyAccessToken";
/// Key holding the access token expiry, as epoch milliseconds.
pub const EXPIRES_AT_KEY: &str = "spotifyAccessTokenExpiresAt";
/// Key holding a not-yet-exchanged authorization code.
pub const AUTHORIZATION_CODE_KEY: &str = "spotifyCode";

/// Key/value storage for the durable session surface.
///
/// Only the three keys above are ever written. The provided methods layer the
/// credential and authorization-code views on top of `get`/`set`/`remove`.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AuthError>;
    fn remove(&self, key: &str) -> Result<(), AuthError>;

    /// Load the stored credential. A token without a readable expiry counts
    /// as absent.
    fn load_credential(&self) -> Result<Option<Credential>, AuthError> {
        let Some(access_token) = self.get(ACCESS_TOKEN_KEY)? else {
            return Ok(None);
        };
        let expires_at = self
            .get(EXPIRES_AT_KEY)?
            .as_deref()
            .and_then(Credential::parse_expires_at);
        match expires_at {
            Some(expires_at) => Ok(Some(Credential::new(access_token, expires_at))),
            None => {
                tracing::warn!("stored access token has no readable expiry, ignoring it");
                Ok(None)
            }
        }
    }

    fn save_credential(&self, credential: &Credential) -> Result<(), AuthError> {
        self.set(ACCESS_TOKEN_KEY, &credential.access_token)?;
        self.set(EXPIRES_AT_KEY, &credential.expires_at_millis().to_string())
    }

    fn clear_credential(&self) -> Result<(), AuthError> {
        self.remove(ACCESS_TOKEN_KEY)?;
        self.remove(EXPIRES_AT_KEY)
    }

    fn authorization_code(&self) -> Result<Option<String>, AuthError> {
        self.get(AUTHORIZATION_CODE_KEY)
    }

    fn save_authorization_code(&self, code: &str) -> Result<(), AuthError> {
        self.set(AUTHORIZATION_CODE_KEY, code)
    }

    fn clear_authorization_code(&self) -> Result<(), AuthError> {
        self.remove(AUTHORIZATION_CODE_KEY)
    }
}

/// Configuration for file-backed credential storage.
#[derive(Debug, Clone)]
pub struct CredentialStoreConfig {
    pub base_dir: PathBuf,
}

impl CredentialStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_songscan_dir()
    }
}

/// File-backed store keeping all keys in one TOML file.
///
/// # Example
/// ```no_run
/// use songscan::auth::{Credential, CredentialStore, FileCredentialStore};
/// use chrono::{Duration, Utc};
///
/// let store = FileCredentialStore::new_default();
/// store.save_credential(&Credential::new("access", Utc::now() + Duration::hours(1)))?;
/// # Ok::<(), songscan::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    base_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(config: CredentialStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_songscan_dir(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.base_dir.join("storage.toml")
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, AuthError> {
        let raw = match fs::read_to_string(self.path()) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let file: StorageFile = toml::from_str(&raw)?;
        Ok(file.entries)
    }

    fn write_entries(&self, entries: BTreeMap<String, String>) -> Result<(), AuthError> {
        let path = self.path();
        Self::ensure_parent(&path)?;
        let file = StorageFile {
            version: 1,
            entries,
            saved_at: Utc::now(),
        };
        fs::write(&path, toml::to_string(&file)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn ensure_parent(path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(entries)
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_entries(entries)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StorageFile {
    version: u32,
    entries: BTreeMap<String, String>,
    saved_at: DateTime<Utc>,
}

/// Process-local store, for embedding shells that persist elsewhere and for
/// tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: &Credential) -> Self {
        let store = Self::new();
        // A fresh map cannot fail to accept writes.
        let _ = store.save_credential(credential);
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AuthError::Io("credential store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.entries
            .lock()
            .map_err(|_| AuthError::Io("credential store lock poisoned".into()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.entries
            .lock()
            .map_err(|_| AuthError::Io("credential store lock poisoned".into()))?
            .remove(key);
        Ok(())
    }
}

fn default_songscan_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".songscan"))
        .unwrap_or_else(|| PathBuf::from(".songscan"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileCredentialStore) {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(CredentialStoreConfig::new(dir.path().to_path_buf()));
        (dir, store)
    }

    #[test]
    fn credential_round_trip_works() {
        let (_dir, store) = temp_store();
        let credential = Credential::new("access", Utc::now() + Duration::minutes(30));
        store.save_credential(&credential).unwrap();

        let loaded = store.load_credential().unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(
            loaded.expires_at.timestamp_millis(),
            credential.expires_at.timestamp_millis()
        );
    }

    #[test]
    fn clear_removes_credential_but_keeps_code() {
        let (_dir, store) = temp_store();
        store
            .save_credential(&Credential::new("access", Utc::now()))
            .unwrap();
        store.save_authorization_code("code-1").unwrap();

        store.clear_credential().unwrap();

        assert!(store.load_credential().unwrap().is_none());
        assert_eq!(store.authorization_code().unwrap().as_deref(), Some("code-1"));
    }

    #[test]
    fn only_the_three_session_keys_are_written() {
        let (_dir, store) = temp_store();
        store
            .save_credential(&Credential::new("access", Utc::now()))
            .unwrap();
        store.save_authorization_code("code").unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let file: StorageFile = toml::from_str(&raw).unwrap();
        let keys: Vec<&str> = file.entries.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![ACCESS_TOKEN_KEY, EXPIRES_AT_KEY, AUTHORIZATION_CODE_KEY]);
    }

    #[test]
    fn token_without_expiry_loads_as_absent() {
        let store = MemoryCredentialStore::new();
        store.set(ACCESS_TOKEN_KEY, "orphan").unwrap();
        assert!(store.load_credential().unwrap().is_none());

        store.set(EXPIRES_AT_KEY, "not-a-number").unwrap();
        assert!(store.load_credential().unwrap().is_none());
    }

    #[test]
    fn removing_missing_key_is_ok() {
        let (_dir, store) = temp_store();
        store.remove(AUTHORIZATION_CODE_KEY).unwrap();
        assert!(!store.path().exists());
    }
}
