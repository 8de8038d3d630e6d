//! Credential storage for the bearer token.
//!
//! The resource client reads the token from a [`CredentialStore`] on every
//! request, so signing in or out takes effect immediately without
//! rebuilding any client.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, warn};

/// Key under which the bearer token is stored.
pub const TOKEN_KEY: &str = "token";

/// Errors from a persistent credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Reading or writing the backing file failed.
    #[error("Credential file I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a JSON object of strings.
    #[error("Credential file {path} is malformed: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A key-value store holding credentials.
pub trait CredentialStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<SecretString>;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns an error if a persistent store fails to write.
    fn set(&self, key: &str, value: SecretString) -> Result<(), CredentialError>;

    /// Delete a value. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a persistent store fails to write.
    fn remove(&self, key: &str) -> Result<(), CredentialError>;

    /// The bearer token, if one is stored and non-empty.
    fn token(&self) -> Option<SecretString> {
        self.get(TOKEN_KEY)
            .filter(|token| !token.expose_secret().trim().is_empty())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Credentials held in memory for the lifetime of the session.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: RwLock<BTreeMap<String, SecretString>>,
}

impl MemoryCredentialStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with a bearer token.
    #[must_use]
    pub fn with_token(token: SecretString) -> Self {
        let store = Self::new();
        store
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TOKEN_KEY.to_string(), token);
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<SecretString> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: SecretString) -> Result<(), CredentialError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CredentialError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// Credentials persisted as a flat JSON object on disk.
///
/// Values are cached in memory after load; every write rewrites the file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileCredentialStore {
    /// Open the store at `path`. A missing file is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| CredentialError::Format {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Credential file not found, starting empty");
                BTreeMap::new()
            }
            Err(source) => return Err(CredentialError::Io { path, source }),
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), CredentialError> {
        let json = serde_json::to_string_pretty(values).map_err(|source| CredentialError::Format {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "Failed to persist credentials");
            CredentialError::Io {
                path: self.path.clone(),
                source,
            }
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Option<SecretString> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|v| SecretString::from(v.clone()))
    }

    fn set(&self, key: &str, value: SecretString) -> Result<(), CredentialError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.expose_secret().to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<(), CredentialError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryCredentialStore::new();
        assert!(store.token().is_none());

        store.set(TOKEN_KEY, SecretString::from("abc")).unwrap();
        assert_eq!(store.token().unwrap().expose_secret(), "abc");

        store.remove(TOKEN_KEY).unwrap();
        assert!(store.token().is_none());
        store.remove(TOKEN_KEY).unwrap();
    }

    #[test]
    fn test_blank_token_is_treated_as_absent() {
        let store = MemoryCredentialStore::with_token(SecretString::from("  "));
        assert!(store.get(TOKEN_KEY).is_some());
        assert!(store.token().is_none());
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::open(&path).unwrap();
        store.set(TOKEN_KEY, SecretString::from("persisted")).unwrap();
        drop(store);

        let reopened = FileCredentialStore::open(&path).unwrap();
        assert_eq!(reopened.token().unwrap().expose_secret(), "persisted");

        reopened.remove(TOKEN_KEY).unwrap();
        let reopened = FileCredentialStore::open(&path).unwrap();
        assert!(reopened.token().is_none());
    }

    #[test]
    fn test_file_store_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = FileCredentialStore::open(&path).unwrap_err();
        assert!(matches!(err, CredentialError::Format { .. }));
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.token().is_none());
    }
}
