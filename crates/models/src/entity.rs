use serde_json::Value;

use crate::errors::ModelError;

/// Extract and trim an entity identifier from an untrusted request field.
/// Missing, non-string and blank values are rejected.
pub fn validate_entity_id(raw: Option<&Value>) -> Result<String, ModelError> {
    match raw {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ModelError::InvalidEntityId),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_id_is_trimmed() {
        assert_eq!(validate_entity_id(Some(&json!("  lamp "))), Ok("lamp".to_string()));
    }

    #[test]
    fn entity_id_rejects_blank_and_non_strings() {
        for raw in [json!(""), json!("   "), json!(5), json!(null), json!(["lamp"])] {
            assert_eq!(validate_entity_id(Some(&raw)), Err(ModelError::InvalidEntityId));
        }
        assert_eq!(validate_entity_id(None), Err(ModelError::InvalidEntityId));
    }
}
