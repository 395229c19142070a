use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::storage::{object_key, validate_location, DocumentStore, FetchedDocument};

/// Documents stored as files under the upload directory.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, location: &str) -> Result<PathBuf, StorageError> {
        validate_location(location)?;
        Ok(self.root.join(location))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

impl DocumentStore for LocalStore {
    fn store(
        &self,
        project_id: i64,
        file_name: &str,
        content: &[u8],
    ) -> Result<String, StorageError> {
        let key = object_key(project_id, file_name);
        let file_path = self.resolve(&key)?;

        if let Some(parent) = file_path.parent() {
            self.ensure_directory(parent)?;
        }

        std::fs::write(&file_path, content).map_err(|e| StorageError::WriteFile {
            path: file_path.clone(),
            source: e,
        })?;

        log::debug!("Stored {} bytes as {}", content.len(), key);
        Ok(key)
    }

    fn fetch(&self, location: &str) -> Result<FetchedDocument, StorageError> {
        let path = self.resolve(location)?;
        if !path.is_file() {
            return Err(StorageError::NotFound(location.to_string()));
        }
        Ok(FetchedDocument::in_place(path))
    }

    fn exists(&self, location: &str) -> Result<bool, StorageError> {
        Ok(self.resolve(location)?.is_file())
    }

    fn delete(&self, location: &str) -> Result<(), StorageError> {
        let path = self.resolve(location)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(location.to_string()))
            }
            Err(e) => Err(StorageError::RemoveFile { path, source: e }),
        }
    }
}
