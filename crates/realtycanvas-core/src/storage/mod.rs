//! Key-value persistence for settings, templates and projects.

mod autosave;
mod file;
mod memory;
mod project;

pub use autosave::{AutoSaveManager, DEFAULT_AUTOSAVE_INTERVAL};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use project::{PROJECT_KEY, ProjectData, ProjectState, load_project, save_project};

use crate::settings::{SETTINGS_KEY, Settings};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async storage operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// A string key-value store.
///
/// Values are JSON documents; callers go through [`save_json`] / [`load_json`].
pub trait Storage: Send + Sync {
    /// Store a value, replacing any previous one.
    fn save(&self, key: &str, value: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a value.
    fn load(&self, key: &str) -> BoxFuture<'_, StorageResult<String>>;

    /// Delete a value. Missing keys are not an error.
    fn delete(&self, key: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all keys.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a key exists.
    fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Serialize `value` and store it under `key`.
pub async fn save_json<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) -> StorageResult<()> {
    let json = serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    storage.save(key, &json).await
}

/// Load and deserialize the value under `key`.
pub async fn load_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> StorageResult<T> {
    let json = storage.load(key).await?;
    serde_json::from_str(&json).map_err(|e| StorageError::Serialization(format!("{key}: {e}")))
}

/// Stored settings, or the defaults when none are stored or they fail to parse.
pub async fn load_settings(storage: &dyn Storage) -> Settings {
    match load_json::<Settings>(storage, SETTINGS_KEY).await {
        Ok(settings) => settings,
        Err(StorageError::NotFound(_)) => Settings::default(),
        Err(e) => {
            log::warn!("Failed to load settings: {}", e);
            Settings::default()
        }
    }
}

pub async fn save_settings(storage: &dyn Storage, settings: &Settings) -> StorageResult<()> {
    save_json(storage, SETTINGS_KEY, settings).await
}
