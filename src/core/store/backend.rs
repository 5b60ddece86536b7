//! Key-value backends for the session store.
//!
//! Two backends exist behind one trait: an in-memory backend (moka) for
//! single-instance deployments and tests, and a filesystem backend that lets
//! several process instances share call state through a mounted volume. Both
//! enforce TTL expiry on read.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use moka::future::{Cache as MokaCache, CacheBuilder as MokaCacheBuilder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use xxhash_rust::xxh3::xxh3_128;

use super::records::unix_now;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error during filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored entry could not be decoded.
    #[error("corrupt store entry: {0}")]
    Corrupt(String),

    /// Invalid configuration provided.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

/// Trait defining the interface for store backends.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Stores a value with an optional TTL.
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Retrieves a value by key. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Deletes a value by key.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Returns the backend type as a string identifier.
    fn backend_type(&self) -> &str;
}

struct MemoryEntry {
    data: Bytes,
    expires_at: Option<Instant>,
}

/// Memory-based store backend using Moka.
pub struct MemoryStoreBackend {
    cache: MokaCache<String, Arc<MemoryEntry>>,
}

impl MemoryStoreBackend {
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: MokaCacheBuilder::new(max_entries).build(),
        }
    }
}

#[async_trait]
impl StoreBackend for MemoryStoreBackend {
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError> {
        let entry = Arc::new(MemoryEntry {
            data: value,
            expires_at: ttl.map(|d| Instant::now() + d),
        });
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        match self.cache.get(key).await {
            Some(entry) => {
                if let Some(expires_at) = entry.expires_at {
                    if Instant::now() > expires_at {
                        self.cache.invalidate(key).await;
                        return Ok(None);
                    }
                }
                Ok(Some(entry.data.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    fn backend_type(&self) -> &str {
        "memory"
    }
}

/// On-disk envelope for one entry.
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    created_at: u64,
    expires_at: Option<u64>,
    /// Base64-encoded payload.
    data: String,
}

/// Filesystem-based store backend.
///
/// One file per key, named by the xxh3 hash of the key with a two-character
/// fan-out directory. Writes go through a temp file and rename so concurrent
/// readers never observe a partial entry.
pub struct FilesystemStoreBackend {
    base_path: PathBuf,
}

impl FilesystemStoreBackend {
    pub async fn new(base_path: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let hash = format!("{:032x}", xxh3_128(key.as_bytes()));
        let dir = &hash[0..2];
        self.base_path.join(dir).join(hash)
    }
}

#[async_trait]
impl StoreBackend for FilesystemStoreBackend {
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError> {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let now = unix_now();
        let entry = StoredEntry {
            created_at: now,
            expires_at: ttl.map(|d| now + d.as_secs()),
            data: BASE64.encode(&value),
        };
        let encoded = serde_json::to_vec(&entry)?;

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&encoded).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let path = self.entry_path(key);
        let raw = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: StoredEntry = serde_json::from_slice(&raw)?;

        if let Some(expires_at) = entry.expires_at {
            if unix_now() > expires_at {
                let _ = fs::remove_file(&path).await;
                return Ok(None);
            }
        }

        let data = BASE64
            .decode(entry.data.as_bytes())
            .map_err(|e| StoreError::Corrupt(format!("{key}: {e}")))?;
        Ok(Some(Bytes::from(data)))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key);
        let _ = fs::remove_file(&path).await;
        Ok(())
    }

    fn backend_type(&self) -> &str {
        "filesystem"
    }
}

/// Store backend configuration.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Memory { max_entries: u64 },
    Filesystem { path: PathBuf },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory {
            max_entries: 100_000,
        }
    }
}

impl StoreConfig {
    pub async fn build(self) -> Result<Arc<dyn StoreBackend>, StoreError> {
        match self {
            StoreConfig::Memory { max_entries } => {
                if max_entries == 0 {
                    return Err(StoreError::InvalidConfig(
                        "max_entries must be positive".to_string(),
                    ));
                }
                Ok(Arc::new(MemoryStoreBackend::new(max_entries)))
            }
            StoreConfig::Filesystem { path } => {
                let backend = FilesystemStoreBackend::new(path.clone()).await?;
                warn!("using filesystem store at {:?}", path);
                Ok(Arc::new(backend))
            }
        }
    }
}
