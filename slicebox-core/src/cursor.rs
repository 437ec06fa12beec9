//! Persistent key/value store for listing cursors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CursorResult<T> = Result<T, CursorError>;

#[async_trait]
pub trait CursorStore: Send + Sync {
    /// `None` means no cursor was stored: start from the beginning.
    async fn get(&self, key: &str) -> CursorResult<Option<String>>;

    /// Stores `value`, or removes the key when `value` is `None`.
    async fn set(&self, key: &str, value: Option<&str>) -> CursorResult<()>;
}

/// One JSON object on disk. Every access holds the same lock, so a
/// read-modify-write never interleaves with another.
#[derive(Debug)]
pub struct JsonFileCursorStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable content is an empty store.
    async fn load(&self) -> Map<String, Value> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "cursor file unreadable, treating as empty");
                return Map::new();
            }
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "cursor file is not a JSON object, treating as empty");
                Map::new()
            }
        }
    }

    async fn store(&self, data: &Map<String, Value>) -> CursorResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| CursorError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec(data)?)
            .await
            .map_err(|source| CursorError::Io {
                path: staging.clone(),
                source,
            })?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|source| CursorError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl CursorStore for JsonFileCursorStore {
    async fn get(&self, key: &str) -> CursorResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let data = self.load().await;
        Ok(data.get(key).and_then(Value::as_str).map(str::to_string))
    }

    async fn set(&self, key: &str, value: Option<&str>) -> CursorResult<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await;
        match value {
            Some(value) => {
                data.insert(key.to_string(), Value::from(value));
            }
            None => {
                data.remove(key);
            }
        }
        self.store(&data).await
    }
}

#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn get(&self, key: &str) -> CursorResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Option<&str>) -> CursorResult<()> {
        let mut entries = self.entries.lock().await;
        match value {
            Some(value) => {
                entries.insert(key.to_string(), value.to_string());
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(())
    }
}
