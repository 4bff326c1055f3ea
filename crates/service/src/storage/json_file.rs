use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use super::BlobStore;
use crate::errors::ServiceError;

/// On-disk envelope around the blob, tagged with a key and schema version.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    key: String,
    data: Value,
}

/// JSON file-backed blob store.
///
/// Writes a versioned envelope to `file_path`, going through a temporary
/// sibling file so a failed write never clobbers the previous blob.
#[derive(Clone, Debug)]
pub struct JsonFileBlobStore {
    file_path: PathBuf,
    key: String,
    version: u32,
}

impl JsonFileBlobStore {
    pub fn new<P: Into<PathBuf>>(path: P, key: impl Into<String>, version: u32) -> Self {
        Self { file_path: path.into(), key: key.into(), version }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.file_path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.file_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }
}

#[async_trait]
impl BlobStore for JsonFileBlobStore {
    async fn load(&self) -> Result<Option<Value>, ServiceError> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.file_path.display(), "no stored blob yet");
                return Ok(None);
            }
            Err(e) => return Err(ServiceError::Storage(e.to_string())),
        };
        let envelope: Envelope = serde_json::from_slice(&bytes).map_err(|e| {
            ServiceError::Storage(format!("corrupt blob at {}: {e}", self.file_path.display()))
        })?;
        if envelope.version != self.version {
            warn!(
                path = %self.file_path.display(),
                stored = envelope.version,
                expected = self.version,
                "stored blob version differs; reading as-is"
            );
        }
        if envelope.key != self.key {
            warn!(path = %self.file_path.display(), stored = %envelope.key, expected = %self.key, "stored blob key differs");
        }
        Ok(Some(envelope.data))
    }

    async fn save(&self, data: &Value) -> Result<(), ServiceError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ServiceError::Storage(e.to_string()))?;
        }
        let envelope = Envelope { version: self.version, key: self.key.clone(), data: data.clone() };
        let bytes = serde_json::to_vec_pretty(&envelope).map_err(|e| ServiceError::Storage(e.to_string()))?;
        let tmp = self.tmp_path();
        fs::write(&tmp, bytes).await.map_err(|e| ServiceError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.file_path).await.map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn tmp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("json_blob_store_{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn missing_file_loads_none() -> Result<(), anyhow::Error> {
        let store = JsonFileBlobStore::new(tmp_dir().join("blob.json"), "k", 1);
        assert!(store.load().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn save_then_reload_persists() -> Result<(), anyhow::Error> {
        let dir = tmp_dir();
        let path = dir.join("nested").join("blob.json");
        let store = JsonFileBlobStore::new(&path, "energy_graph_scheduler", 1);

        let blob = json!({"sections_by_entity": {"lamp": []}, "settings_by_entity": {}});
        store.save(&blob).await?;
        assert!(!store.tmp_path().exists());

        let reloaded = JsonFileBlobStore::new(&path, "energy_graph_scheduler", 1);
        assert_eq!(reloaded.load().await?, Some(blob));

        // envelope carries version and key
        let raw: Value = serde_json::from_slice(&fs::read(&path).await?)?;
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["key"], "energy_graph_scheduler");

        let _ = fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn other_version_is_still_read() -> Result<(), anyhow::Error> {
        let dir = tmp_dir();
        let path = dir.join("blob.json");
        JsonFileBlobStore::new(&path, "k", 7).save(&json!({"a": 1})).await?;
        let store = JsonFileBlobStore::new(&path, "k", 1);
        assert_eq!(store.load().await?, Some(json!({"a": 1})));
        let _ = fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() -> Result<(), anyhow::Error> {
        let dir = tmp_dir();
        fs::create_dir_all(&dir).await?;
        let path = dir.join("blob.json");
        fs::write(&path, b"{not json").await?;
        let store = JsonFileBlobStore::new(&path, "k", 1);
        assert!(matches!(store.load().await, Err(ServiceError::Storage(_))));
        let _ = fs::remove_dir_all(&dir).await;
        Ok(())
    }
}
