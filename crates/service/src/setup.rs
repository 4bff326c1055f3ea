//! One-time setup of the single config entry.
//!
//! The entry carries no configuration of its own (everything lives in the
//! schedule blob); it only records that the store has been set up. The marker
//! is persisted so a second setup attempt is refused across restarts too.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::info;
use uuid::Uuid;

pub const ENTRY_TITLE: &str = "Energy Graph Scheduler";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Created interactively by a user.
    User,
    /// Created automatically from static configuration at startup.
    Import,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConfigEntry {
    pub entry_id: Uuid,
    pub title: String,
    pub source: EntrySource,
    pub data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("single_instance_allowed")]
    SingleInstanceAllowed,
    #[error("setup storage error: {0}")]
    Storage(String),
}

pub struct SetupFlow {
    marker_path: PathBuf,
    entry: Mutex<Option<ConfigEntry>>,
}

impl SetupFlow {
    /// Read an existing marker, if any. An unreadable marker counts as
    /// missing.
    pub async fn load<P: Into<PathBuf>>(marker_path: P) -> Self {
        let marker_path = marker_path.into();
        let entry = match fs::read(&marker_path).await {
            Ok(bytes) => serde_json::from_slice::<ConfigEntry>(&bytes).ok(),
            Err(_) => None,
        };
        Self { marker_path, entry: Mutex::new(entry) }
    }

    pub async fn current(&self) -> Option<ConfigEntry> {
        self.entry.lock().await.clone()
    }

    /// Create the entry with empty data. Refused once an entry exists.
    pub async fn create_entry(&self, source: EntrySource) -> Result<ConfigEntry, SetupError> {
        let mut slot = self.entry.lock().await;
        if slot.is_some() {
            return Err(SetupError::SingleInstanceAllowed);
        }

        let entry = ConfigEntry {
            entry_id: Uuid::new_v4(),
            title: ENTRY_TITLE.to_string(),
            source,
            data: serde_json::Map::new(),
        };
        if let Some(parent) = self.marker_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| SetupError::Storage(e.to_string()))?;
        }
        let bytes = serde_json::to_vec_pretty(&entry).map_err(|e| SetupError::Storage(e.to_string()))?;
        fs::write(&self.marker_path, bytes).await.map_err(|e| SetupError::Storage(e.to_string()))?;

        info!(entry_id = %entry.entry_id, ?source, "config entry created");
        *slot = Some(entry.clone());
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> PathBuf {
        std::env::temp_dir().join(format!("setup_{}", Uuid::new_v4())).join("entry.json")
    }

    #[tokio::test]
    async fn second_entry_is_refused() -> Result<(), anyhow::Error> {
        let path = marker();
        let flow = SetupFlow::load(&path).await;
        assert!(flow.current().await.is_none());

        let entry = flow.create_entry(EntrySource::User).await?;
        assert_eq!(entry.title, ENTRY_TITLE);
        assert!(entry.data.is_empty());

        let again = flow.create_entry(EntrySource::Import).await;
        assert!(matches!(again, Err(SetupError::SingleInstanceAllowed)));
        assert_eq!(flow.current().await, Some(entry));
        Ok(())
    }

    #[tokio::test]
    async fn refusal_survives_reload() -> Result<(), anyhow::Error> {
        let path = marker();
        SetupFlow::load(&path).await.create_entry(EntrySource::Import).await?;

        let reloaded = SetupFlow::load(&path).await;
        assert_eq!(reloaded.current().await.map(|e| e.source), Some(EntrySource::Import));
        let err = reloaded.create_entry(EntrySource::User).await.unwrap_err();
        assert_eq!(err.to_string(), "single_instance_allowed");

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir).await;
        }
        Ok(())
    }
}
