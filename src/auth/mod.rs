//! Bearer-token authentication.
//!
//! The token lives in a persisted auth blob. Every outbound request reads
//! the blob again, so a login or logout in one handle is seen by all others.

mod store;

pub use store::*;

use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::User;

/// Response fields that may carry the token, in lookup order.
pub const TOKEN_FIELDS: [&str; 5] = ["token", "accessToken", "access_token", "authToken", "jwt"];

/// Durable storage for the persisted auth blob.
pub trait AuthStorage: Send + Sync {
    fn load(&self) -> io::Result<Option<String>>;
    fn save(&self, blob: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// Auth blob stored in a JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl AuthStorage for FileStorage {
    fn load(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, blob: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, blob)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process storage, for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blob: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }
}

impl AuthStorage for MemoryStorage {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.blob.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, blob: &str) -> io::Result<()> {
        *self.blob.lock().unwrap_or_else(PoisonError::into_inner) = Some(blob.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.blob.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Shape written to storage.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistedAuth {
    pub state: PersistedState,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistedState {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl PersistedAuth {
    pub fn new(token: Option<String>, user: Option<User>) -> Self {
        Self {
            state: PersistedState { token, user },
            version: 0,
        }
    }
}

/// Token from a persisted blob. Accepts `{"state":{"token":..}}` and
/// `{"token":..}`; anything malformed yields `None`.
pub fn token_from_blob(raw: &str) -> Option<String> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Ignoring malformed auth blob: {}", e);
            return None;
        }
    };

    let nested = value
        .get("state")
        .and_then(|state| state.get("token"))
        .and_then(Value::as_str);
    let direct = value.get("token").and_then(Value::as_str);

    nested
        .or(direct)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Current token in storage. Read failures count as "no token".
pub fn read_token(storage: &dyn AuthStorage) -> Option<String> {
    match storage.load() {
        Ok(Some(raw)) => token_from_blob(&raw),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!("Could not read auth storage: {}", e);
            None
        }
    }
}

/// Token from a login or register response body.
pub fn extract_token(body: &Value) -> Option<String> {
    TOKEN_FIELDS
        .iter()
        .filter_map(|field| body.get(*field).and_then(Value::as_str))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}
