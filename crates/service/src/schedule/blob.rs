use std::collections::BTreeMap;

use models::schedule::{normalize_sections, normalize_settings, Section, Settings};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shape of the persisted document. Both mappings are always written
/// together.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreBlob {
    pub sections_by_entity: BTreeMap<String, Vec<Section>>,
    pub settings_by_entity: BTreeMap<String, Settings>,
}

impl StoreBlob {
    /// Rebuild a blob from whatever the backend handed back. Unknown shapes
    /// read as empty; each record goes through the normalizers, so a blob
    /// edited by hand cannot smuggle in out-of-range values.
    pub fn from_loaded(raw: &Value) -> Self {
        let mut blob = Self::default();
        if let Some(map) = raw.get("sections_by_entity").and_then(Value::as_object) {
            for (entity_id, sections) in map {
                let entity_id = entity_id.trim();
                if entity_id.is_empty() {
                    continue;
                }
                blob.sections_by_entity.insert(entity_id.to_string(), normalize_sections(sections));
            }
        }
        if let Some(map) = raw.get("settings_by_entity").and_then(Value::as_object) {
            for (entity_id, settings) in map {
                let entity_id = entity_id.trim();
                if entity_id.is_empty() {
                    continue;
                }
                blob.settings_by_entity.insert(entity_id.to_string(), normalize_settings(settings));
            }
        }
        blob
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loads_and_normalizes_records() {
        let raw = json!({
            "sections_by_entity": {
                "lamp": [{"name": "Morning", "hours": 40}, {"name": "Morning", "hours": 2}],
                "": [{"name": "ghost", "hours": 1}],
                "fan": "garbage"
            },
            "settings_by_entity": {
                "lamp": {"interval_minutes": 15},
                "fan": null
            }
        });
        let blob = StoreBlob::from_loaded(&raw);
        assert_eq!(blob.sections_by_entity["lamp"], vec![Section { name: "Morning".into(), hours: 24 }]);
        assert!(blob.sections_by_entity["fan"].is_empty());
        assert!(!blob.sections_by_entity.contains_key(""));
        assert_eq!(blob.settings_by_entity["lamp"].interval_minutes, 15);
        // a present-but-null entry still counts as existing, with defaults
        assert_eq!(blob.settings_by_entity["fan"], Settings::default());
    }

    #[test]
    fn non_object_blob_is_empty() {
        assert_eq!(StoreBlob::from_loaded(&json!([1, 2, 3])), StoreBlob::default());
        assert_eq!(StoreBlob::from_loaded(&json!({"sections_by_entity": []})), StoreBlob::default());
    }
}
