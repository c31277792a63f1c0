//! Local persistence port - key/value storage
//!
//! Mirrors what a browser gives a web client: string keys, string values.
//! `LocalStore` adds JSON parsing on top and never lets a corrupted or
//! unreadable entry escape as an error.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::result::{Error, Result};

/// Raw key/value storage backend
pub trait StorageBackend: Send + Sync {
    /// Read the raw value stored under `key`
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` (no-op if absent)
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// JSON view over a storage backend
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn StorageBackend>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Read and parse `key`, returning `fallback` when missing, corrupt or unreadable
    pub fn read<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.backend.get_item(key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or(fallback),
            Ok(None) => fallback,
            Err(_e) => {
                #[cfg(debug_assertions)]
                eprintln!("[roadside] storage read of '{}' failed: {}", key, _e);
                fallback
            }
        }
    }

    /// Read `key` if present and parseable
    pub fn read_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read(key, None)
    }

    /// Serialize and write `value` under `key`; failures are swallowed
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result: Result<()> = serde_json::to_string(value)
            .map_err(Error::from)
            .and_then(|raw| self.backend.set_item(key, &raw));
        if let Err(_e) = result {
            #[cfg(debug_assertions)]
            eprintln!("[roadside] storage write of '{}' failed: {}", key, _e);
        }
    }

    /// Remove `key`; failures are swallowed
    pub fn remove(&self, key: &str) {
        if let Err(_e) = self.backend.remove_item(key) {
            #[cfg(debug_assertions)]
            eprintln!("[roadside] storage remove of '{}' failed: {}", key, _e);
        }
    }

    /// Whether a value exists under `key`
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.backend.get_item(key), Ok(Some(_)))
    }
}

/// Storage keys (one unified scheme for every flow)
pub mod keys {
    /// Mock-mode session pointer
    pub const SESSION: &str = "rsa.session";
    /// Mock-mode user records
    pub const USERS: &str = "rsa.users";
    /// Request list
    pub const REQUESTS: &str = "rsa.requests";
    /// Set once demo data has been written
    pub const SEEDED: &str = "rsa.seeded";
    /// Fee schedule
    pub const FEES: &str = "rsa.fees";
    /// Hosted-mode session tokens
    pub const HOSTED_SESSION: &str = "rsa.hosted_session";
    /// Older page-local request list, folded into `REQUESTS` on first access
    pub const LEGACY_SIMPLE_REQUESTS: &str = "rsa.simple_requests";
}
