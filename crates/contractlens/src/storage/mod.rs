//! Where uploaded contract documents live.
//!
//! Documents are addressed by a storage key of the form
//! `project_{id}/{uuid}{ext}`; the key is what the database records as the
//! contract's file location.

pub mod local;
pub mod remote;

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::config::{Config, StorageConfig};
use crate::error::StorageError;

pub use local::LocalStore;
pub use remote::RemoteStore;

pub trait DocumentStore: Send + Sync {
    /// Saves `content` under a fresh key for `project_id` and returns the key.
    fn store(
        &self,
        project_id: i64,
        file_name: &str,
        content: &[u8],
    ) -> Result<String, StorageError>;

    /// Makes the document available as a local file for extraction.
    fn fetch(&self, location: &str) -> Result<FetchedDocument, StorageError>;

    fn exists(&self, location: &str) -> Result<bool, StorageError>;

    fn delete(&self, location: &str) -> Result<(), StorageError>;
}

/// A document readable on the local filesystem. Downloaded copies are
/// removed when this value is dropped.
#[derive(Debug)]
pub enum FetchedDocument {
    InPlace(PathBuf),
    Downloaded(NamedTempFile),
}

impl FetchedDocument {
    pub fn in_place(path: PathBuf) -> Self {
        Self::InPlace(path)
    }

    pub fn downloaded(file: NamedTempFile) -> Self {
        Self::Downloaded(file)
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::InPlace(path) => path,
            Self::Downloaded(file) => file.path(),
        }
    }
}

/// Builds a new storage key, keeping the upload's lower-cased extension.
pub fn object_key(project_id: i64, file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("project_{}/{}{}", project_id, uuid::Uuid::new_v4(), extension)
}

/// Rejects keys that could escape the store root.
pub fn validate_location(location: &str) -> Result<(), StorageError> {
    let path = Path::new(location);
    let is_safe = !location.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

    if is_safe {
        Ok(())
    } else {
        Err(StorageError::InvalidLocation(location.to_string()))
    }
}

/// Builds the configured document store.
pub fn from_config(config: &Config) -> Result<Arc<dyn DocumentStore>, StorageError> {
    match &config.storage {
        StorageConfig::Local => Ok(Arc::new(LocalStore::new(&config.upload_directory))),
        StorageConfig::Remote {
            base_url,
            timeout_secs,
        } => Ok(Arc::new(RemoteStore::new(base_url, *timeout_secs)?)),
    }
}
