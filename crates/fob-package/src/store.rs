//! Durable storage for published bundles.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::naming::camel_case_to_dash_case;
use crate::workspace::validate_file_name;

/// Extension every published artifact id ends with.
pub const PACKAGE_EXTENSION: &str = "js";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("upload request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("storage returned {status} for {key}: {body}")]
    Status {
        key: String,
        status: u16,
        body: String,
    },

    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Stores raw bytes under a key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
}

/// A bundle that has been uploaded and can be fetched by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPackage {
    pub id: String,
    pub url: String,
}

/// Fresh artifact id: `{dash-cased entry}_{uuid}.js`.
pub fn package_id(entry: &str) -> String {
    format!(
        "{}_{}.{}",
        camel_case_to_dash_case(entry),
        uuid::Uuid::new_v4(),
        PACKAGE_EXTENSION
    )
}

/// Public URL of an artifact: the base followed by the id.
pub fn package_url(base: &str, id: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), id)
}

/// Writes artifacts into a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    dir: PathBuf,
}

impl LocalObjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        // Keys are flat file names; anything else could land outside `dir`.
        if validate_file_name(key).is_err() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.dir.join(key);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }
}

/// Uploads artifacts with `PUT {endpoint}/{key}`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, bearer_token)
    }

    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        bearer_token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bearer_token,
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put(self.object_url(key))
            .header(reqwest::header::CONTENT_TYPE, "application/javascript")
            .body(bytes);

        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                key: key.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_package_id_shape() {
        let id = package_id("landingPage");
        let token = id
            .strip_prefix("landing-page_")
            .and_then(|rest| rest.strip_suffix(".js"))
            .expect("id should be {entry}_{token}.js");
        assert!(uuid::Uuid::parse_str(token).is_ok());
    }

    #[test]
    fn test_package_ids_are_unique() {
        assert_ne!(package_id("home"), package_id("home"));
    }

    #[test]
    fn test_package_url() {
        assert_eq!(
            package_url("https://cdn.example.com/", "home_1.js"),
            "https://cdn.example.com/home_1.js"
        );
        assert_eq!(
            package_url("https://cdn.example.com/packages", "home_1.js"),
            "https://cdn.example.com/packages/home_1.js"
        );
    }

    #[test]
    fn test_http_object_url() {
        let store = HttpObjectStore::new("https://storage.example.com/bucket/", None);
        assert_eq!(
            store.object_url("home_1.js"),
            "https://storage.example.com/bucket/home_1.js"
        );
    }

    #[tokio::test]
    async fn test_local_store_writes_bytes() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path().join("packages"));

        store.put("home_1.js", b"export {}".to_vec()).await.unwrap();

        let written = std::fs::read(temp.path().join("packages/home_1.js")).unwrap();
        assert_eq!(written, b"export {}");
    }

    #[tokio::test]
    async fn test_local_store_rejects_nested_keys() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path().join("packages"));

        for key in ["../escaped.js", "nested/home.js", "/abs.js"] {
            let err = store.put(key, b"x".to_vec()).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey(_)), "{key:?}");
        }
        assert!(!temp.path().join("escaped.js").exists());
    }
}
