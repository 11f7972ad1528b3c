//! URL stores of the bundled service.
//!
//! Two backends ship: `memory`, which forgets everything on exit, and
//! `file`, which keeps URLs in a JSON document on disk.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::config::defaults::{FILE_BACKEND, MEMORY_BACKEND};

use super::ServiceError;
use super::types::{Backend, BackendConfig};

/// Current store file format version.
const STORE_FILE_VERSION: u32 = 1;

/// A URL waiting to be redeemed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUrl {
    /// lnurl tag, e.g. `withdrawRequest`
    pub tag: String,
    /// Tag-specific parameters
    pub params: Map<String, Value>,
    /// Remaining uses; `None` is unlimited
    pub remaining_uses: Option<u64>,
}

/// A store opened from the `store` configuration group.
#[derive(Debug, Clone)]
pub enum UrlStore {
    /// Non-durable, in-process store
    Memory(MemoryStore),
    /// JSON document on disk
    File(FileStore),
}

impl UrlStore {
    /// Opens the store selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::UnsupportedBackend`] for backends this service
    /// cannot open, and [`ServiceError::InvalidOptions`] if the `file` backend
    /// has no `path`.
    pub fn open(config: &BackendConfig) -> Result<Self, ServiceError> {
        match &config.backend {
            Backend::Name(name) if name == MEMORY_BACKEND => Ok(Self::Memory(MemoryStore::new())),
            Backend::Name(name) if name == FILE_BACKEND => {
                let path = config
                    .config
                    .get("path")
                    .and_then(Value::as_str)
                    .filter(|path| !path.is_empty())
                    .ok_or_else(|| {
                        ServiceError::InvalidOptions(
                            "store.config.path is required by the file store backend".to_string(),
                        )
                    })?;
                Ok(Self::File(FileStore::new(path)))
            }
            other => Err(ServiceError::UnsupportedBackend {
                group: "store",
                backend: other.to_string(),
            }),
        }
    }

    /// Stores `url` under `hash`.
    ///
    /// # Errors
    ///
    /// Returns an error if `hash` is already taken or the store cannot be written.
    pub async fn create(&self, hash: String, url: StoredUrl) -> Result<(), ServiceError> {
        match self {
            Self::Memory(store) => store.create(hash, url).await,
            Self::File(store) => store.create(hash, url).await,
        }
    }

    /// Returns the URL stored under `hash`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn fetch(&self, hash: &str) -> Result<Option<StoredUrl>, ServiceError> {
        match self {
            Self::Memory(store) => Ok(store.fetch(hash).await),
            Self::File(store) => store.fetch(hash).await,
        }
    }

    /// Number of stored URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn len(&self) -> Result<usize, ServiceError> {
        match self {
            Self::Memory(store) => Ok(store.len().await),
            Self::File(store) => store.len().await,
        }
    }
}

/// Non-durable store keyed by secret hash.
///
/// Clones share the same contents. Everything is lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    urls: Arc<Mutex<HashMap<String, StoredUrl>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `url` under `hash`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] if `hash` is already taken.
    pub async fn create(&self, hash: String, url: StoredUrl) -> Result<(), ServiceError> {
        let mut urls = self.urls.lock().await;
        insert_new(&mut urls, hash, url)
    }

    /// Returns the URL stored under `hash`.
    pub async fn fetch(&self, hash: &str) -> Option<StoredUrl> {
        self.urls.lock().await.get(hash).cloned()
    }

    /// Number of stored URLs.
    pub async fn len(&self) -> usize {
        self.urls.lock().await.len()
    }
}

/// On-disk store file format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    urls: HashMap<String, StoredUrl>,
}

/// Durable store keeping every URL in one JSON file.
///
/// Each write reloads the file, adds the URL and replaces the file through
/// `{path}.tmp` and a rename. A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Creates a store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::default(),
        }
    }

    /// Returns the path to the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stores `url` under `hash` and writes the file.
    ///
    /// # Errors
    ///
    /// Returns an error if `hash` is already taken or the file cannot be
    /// read or written.
    pub async fn create(&self, hash: String, url: StoredUrl) -> Result<(), ServiceError> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();

        blocking(move || {
            let mut file = load_blocking(&path)?;
            insert_new(&mut file.urls, hash, url)?;
            file.version = STORE_FILE_VERSION;
            save_blocking(&path, &file)
        })
        .await?;

        tracing::debug!("Stored new URL in {}", self.path.display());
        Ok(())
    }

    /// Returns the URL stored under `hash`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn fetch(&self, hash: &str) -> Result<Option<StoredUrl>, ServiceError> {
        let mut file = self.load().await?;
        Ok(file.urls.remove(hash))
    }

    /// Number of stored URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn len(&self) -> Result<usize, ServiceError> {
        Ok(self.load().await?.urls.len())
    }

    async fn load(&self) -> Result<StoreFile, ServiceError> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        blocking(move || load_blocking(&path)).await
    }
}

fn insert_new(
    urls: &mut HashMap<String, StoredUrl>,
    hash: String,
    url: StoredUrl,
) -> Result<(), ServiceError> {
    if urls.contains_key(&hash) {
        return Err(ServiceError::Store(format!("duplicate hash '{hash}'")));
    }
    urls.insert(hash, url);
    Ok(())
}

async fn blocking<T, F>(task: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ServiceError::Store(format!("store task failed: {e}")))?
}

fn load_blocking(path: &Path) -> Result<StoreFile, ServiceError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreFile::default()),
        Err(source) => {
            return Err(ServiceError::StoreFile {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let file: StoreFile =
        serde_json::from_str(&content).map_err(|source| ServiceError::StoreFormat {
            path: path.to_path_buf(),
            source,
        })?;
    if file.version != STORE_FILE_VERSION {
        return Err(ServiceError::Store(format!(
            "incompatible store file version in '{}': expected {STORE_FILE_VERSION}, got {}",
            path.display(),
            file.version
        )));
    }
    Ok(file)
}

fn save_blocking(path: &Path, file: &StoreFile) -> Result<(), ServiceError> {
    let io_error = |source| ServiceError::StoreFile {
        path: path.to_path_buf(),
        source,
    };
    let content = serde_json::to_string_pretty(file).map_err(|source| ServiceError::StoreFormat {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    // state.json -> state.json.tmp, not state.tmp
    let temp_path = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&temp_path, content).map_err(io_error)?;
    std::fs::rename(&temp_path, path).map_err(io_error)
}
