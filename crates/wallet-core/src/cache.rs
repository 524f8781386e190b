//! Remembered provider selection.
//!
//! Connect clears the entry before it starts and writes the chosen catalog
//! key once the session is established; teardown clears it again. The cache
//! is informational: failures are logged by the caller and never abort a
//! connect or a disconnect.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum CacheError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Serialization error: {0}")]
	Serialization(String),
}

/// Storage for the last successfully connected provider key.
#[async_trait]
pub trait ProviderCache: Send + Sync {
	async fn get(&self) -> Result<Option<String>, CacheError>;

	async fn set(&self, key: &str) -> Result<(), CacheError>;

	async fn clear(&self) -> Result<(), CacheError>;
}

/// Process-local cache.
#[derive(Default)]
pub struct MemoryProviderCache {
	entry: RwLock<Option<String>>,
}

impl MemoryProviderCache {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl ProviderCache for MemoryProviderCache {
	async fn get(&self) -> Result<Option<String>, CacheError> {
		Ok(self.entry.read().await.clone())
	}

	async fn set(&self, key: &str) -> Result<(), CacheError> {
		*self.entry.write().await = Some(key.to_string());
		Ok(())
	}

	async fn clear(&self) -> Result<(), CacheError> {
		self.entry.write().await.take();
		Ok(())
	}
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedSelection {
	provider: String,
}

/// Cache persisted as a small JSON document, e.g. `{"provider":"walletconnect"}`.
pub struct FileProviderCache {
	path: PathBuf,
}

impl FileProviderCache {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

#[async_trait]
impl ProviderCache for FileProviderCache {
	async fn get(&self) -> Result<Option<String>, CacheError> {
		let data = match fs::read(&self.path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		let cached: CachedSelection = serde_json::from_slice(&data)
			.map_err(|e| CacheError::Serialization(e.to_string()))?;
		Ok(Some(cached.provider))
	}

	async fn set(&self, key: &str) -> Result<(), CacheError> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent).await?;
			}
		}
		let data = serde_json::to_vec(&CachedSelection {
			provider: key.to_string(),
		})
		.map_err(|e| CacheError::Serialization(e.to_string()))?;

		// Write then rename so readers never see a partial document.
		let temp_path = self.path.with_extension("tmp");
		fs::write(&temp_path, data).await?;
		fs::rename(&temp_path, &self.path).await?;
		Ok(())
	}

	async fn clear(&self) -> Result<(), CacheError> {
		match fs::remove_file(&self.path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}
