use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use models::schedule::{normalize_sections, normalize_settings, Section, Settings, SettingsView};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::blob::StoreBlob;
use crate::errors::ServiceError;
use crate::metrics::{SAVE_FAILURES_TOTAL, WRITES_TOTAL};
use crate::notify::{NotificationBus, RecordKind};
use crate::storage::BlobStore;

type Backend = Box<dyn BlobStore>;

/// Sections and settings for every entity, mirrored to a blob backend.
///
/// Writes land in memory first and are visible to readers immediately; the
/// blob save happens afterwards and is the only await point of a write.
/// Saves are serialized and each one snapshots the full current state, so
/// the last save to finish always carries every applied write.
pub struct ScheduleStore {
    sections_by_entity: DashMap<String, Vec<Section>>,
    settings_by_entity: DashMap<String, Settings>,
    backend: ArcSwapOption<Backend>,
    save_lock: Mutex<()>,
    bus: NotificationBus,
}

impl Default for ScheduleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleStore {
    /// An empty store with no backend attached; writes fail with `NotReady`
    /// until [`ScheduleStore::start`] runs.
    pub fn new() -> Self {
        Self {
            sections_by_entity: DashMap::new(),
            settings_by_entity: DashMap::new(),
            backend: ArcSwapOption::empty(),
            save_lock: Mutex::new(()),
            bus: NotificationBus::new(),
        }
    }

    /// Load the blob from `backend` and attach it for future saves.
    ///
    /// A failed or missing load leaves the store empty but ready.
    pub async fn start<B: BlobStore + 'static>(&self, backend: B) {
        let blob = match backend.load().await {
            Ok(Some(raw)) => StoreBlob::from_loaded(&raw),
            Ok(None) => StoreBlob::default(),
            Err(e) => {
                warn!(error = %e, "failed loading store; starting empty");
                StoreBlob::default()
            }
        };

        self.sections_by_entity.clear();
        self.settings_by_entity.clear();
        for (entity_id, sections) in blob.sections_by_entity {
            self.sections_by_entity.insert(entity_id, sections);
        }
        for (entity_id, settings) in blob.settings_by_entity {
            self.settings_by_entity.insert(entity_id, settings);
        }
        self.backend.store(Some(Arc::new(Box::new(backend) as Backend)));
        info!(
            sections = self.sections_by_entity.len(),
            settings = self.settings_by_entity.len(),
            "schedule store started"
        );
    }

    /// Detach the backend and drop in-memory state. Durable storage is left
    /// untouched.
    pub fn stop(&self) {
        self.backend.store(None);
        self.sections_by_entity.clear();
        self.settings_by_entity.clear();
        info!("schedule store stopped");
    }

    pub fn is_ready(&self) -> bool {
        self.backend.load().is_some()
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn get_sections(&self, entity_id: &str) -> Vec<Section> {
        self.sections_by_entity
            .get(entity_id)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }

    pub fn get_settings(&self, entity_id: &str) -> SettingsView {
        match self.settings_by_entity.get(entity_id) {
            Some(settings) => SettingsView { settings: *settings, exists: true },
            None => SettingsView::missing(),
        }
    }

    /// Normalize and store `raw` as the entity's sections, then persist both
    /// mappings. On `SaveFailed` the new value stays in memory and no
    /// notification is sent.
    pub async fn set_sections(&self, entity_id: &str, raw: &Value) -> Result<Vec<Section>, ServiceError> {
        let backend = self.writable(entity_id)?;
        let sections = normalize_sections(raw);
        self.sections_by_entity.insert(entity_id.to_string(), sections.clone());
        WRITES_TOTAL.with_label_values(&[RecordKind::Sections.as_str()]).inc();
        debug!(entity_id, count = sections.len(), "sections updated in memory");

        self.persist(backend.as_ref()).await?;
        self.bus.publish(entity_id, RecordKind::Sections);
        Ok(sections)
    }

    /// Same contract as [`ScheduleStore::set_sections`], for settings.
    pub async fn set_settings(&self, entity_id: &str, raw: &Value) -> Result<Settings, ServiceError> {
        let backend = self.writable(entity_id)?;
        let settings = normalize_settings(raw);
        self.settings_by_entity.insert(entity_id.to_string(), settings);
        WRITES_TOTAL.with_label_values(&[RecordKind::Settings.as_str()]).inc();
        debug!(entity_id, interval_minutes = settings.interval_minutes, "settings updated in memory");

        self.persist(backend.as_ref()).await?;
        self.bus.publish(entity_id, RecordKind::Settings);
        Ok(settings)
    }

    /// Both mappings as they are right now.
    pub fn snapshot(&self) -> StoreBlob {
        StoreBlob {
            sections_by_entity: self
                .sections_by_entity
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            settings_by_entity: self
                .settings_by_entity
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
        }
    }

    fn writable(&self, entity_id: &str) -> Result<Arc<Backend>, ServiceError> {
        if entity_id.trim().is_empty() {
            return Err(ServiceError::InvalidEntityId);
        }
        self.backend.load_full().ok_or(ServiceError::NotReady)
    }

    async fn persist(&self, backend: &Backend) -> Result<(), ServiceError> {
        let _guard = self.save_lock.lock().await;
        let blob = serde_json::to_value(self.snapshot()).map_err(|e| ServiceError::SaveFailed(e.to_string()))?;
        backend.save(&blob).await.map_err(|e| {
            SAVE_FAILURES_TOTAL.inc();
            let reason = match e {
                ServiceError::Storage(reason) | ServiceError::SaveFailed(reason) => reason,
                other => other.to_string(),
            };
            warn!(error = %reason, "failed saving store");
            ServiceError::SaveFailed(reason)
        })
    }
}
