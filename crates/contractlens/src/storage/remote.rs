use std::io::Write;
use std::path::Path;
use std::time::Duration;

use reqwest::StatusCode;

use crate::error::StorageError;
use crate::sanitize::redact_url;
use crate::storage::{object_key, validate_location, DocumentStore, FetchedDocument};

/// HTTP object store: documents live at `{base_url}/{key}` and are managed
/// with PUT, GET, HEAD and DELETE.
pub struct RemoteStore {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl RemoteStore {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, StorageError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StorageError::Remote(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url_for(&self, location: &str) -> Result<String, StorageError> {
        validate_location(location)?;
        Ok(format!("{}/{}", self.base_url, location))
    }

    fn request_error(&self, action: &str, location: &str, err: reqwest::Error) -> StorageError {
        StorageError::Remote(format!(
            "{} {} at {} failed: {}",
            action,
            location,
            redact_url(&self.base_url),
            err.without_url()
        ))
    }

    fn status_error(action: &str, location: &str, status: StatusCode) -> StorageError {
        StorageError::Remote(format!("{} {} returned status {}", action, location, status))
    }
}

/// Writes a download to a temp file that keeps the key's extension so format
/// dispatch still works. The file is removed on drop, also after a failed write.
fn write_download(location: &str, bytes: &[u8]) -> Result<FetchedDocument, StorageError> {
    let extension = Path::new(location)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let mut file = tempfile::Builder::new()
        .prefix("contractlens_download_")
        .suffix(&extension)
        .tempfile()
        .map_err(|e| StorageError::WriteFile {
            path: std::env::temp_dir(),
            source: e,
        })?;

    file.write_all(bytes).map_err(|e| StorageError::WriteFile {
        path: file.path().to_path_buf(),
        source: e,
    })?;

    Ok(FetchedDocument::downloaded(file))
}

impl DocumentStore for RemoteStore {
    fn store(
        &self,
        project_id: i64,
        file_name: &str,
        content: &[u8],
    ) -> Result<String, StorageError> {
        let key = object_key(project_id, file_name);
        let url = self.url_for(&key)?;

        let response = self
            .client
            .put(&url)
            .body(content.to_vec())
            .send()
            .map_err(|e| self.request_error("PUT", &key, e))?;

        if !response.status().is_success() {
            return Err(Self::status_error("PUT", &key, response.status()));
        }

        log::debug!("Uploaded {} bytes as {}", content.len(), key);
        Ok(key)
    }

    fn fetch(&self, location: &str) -> Result<FetchedDocument, StorageError> {
        let url = self.url_for(location)?;

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.request_error("GET", location, e))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(StorageError::NotFound(location.to_string())),
            status => return Err(Self::status_error("GET", location, status)),
        }

        let bytes = response
            .bytes()
            .map_err(|e| self.request_error("GET", location, e))?;

        write_download(location, &bytes)
    }

    fn exists(&self, location: &str) -> Result<bool, StorageError> {
        let url = self.url_for(location)?;

        let response = self
            .client
            .head(&url)
            .send()
            .map_err(|e| self.request_error("HEAD", location, e))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Self::status_error("HEAD", location, status)),
        }
    }

    fn delete(&self, location: &str) -> Result<(), StorageError> {
        let url = self.url_for(location)?;

        let response = self
            .client
            .delete(&url)
            .send()
            .map_err(|e| self.request_error("DELETE", location, e))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(location.to_string())),
            status => Err(Self::status_error("DELETE", location, status)),
        }
    }
}
