use models::errors::ModelError;
use serde::Serialize;
use service::ServiceError;
use thiserror::Error;

pub const INVALID_FORMAT: &str = "invalid_format";
pub const UNKNOWN_COMMAND: &str = "unknown_command";
pub const ID_REUSE: &str = "id_reuse";
pub const NOT_FOUND: &str = "not_found";

/// Error body sent to clients in a failed result: a stable `code` plus a
/// human-readable `message`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ProtocolError {
    pub code: String,
    pub message: String,
}

impl ProtocolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::new(INVALID_FORMAT, message)
    }

    pub fn unknown_command(kind: &str) -> Self {
        Self::new(UNKNOWN_COMMAND, format!("unknown command: {kind}"))
    }

    pub fn id_reuse() -> Self {
        Self::new(ID_REUSE, "subscription id already in use")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(NOT_FOUND, message)
    }
}

impl From<ServiceError> for ProtocolError {
    fn from(e: ServiceError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

impl From<ModelError> for ProtocolError {
    fn from(e: ModelError) -> Self {
        ServiceError::from(e).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_keep_code_and_message() {
        let e = ProtocolError::from(ServiceError::InvalidEntityId);
        assert_eq!(e, ProtocolError::new("invalid_entity_id", "entity_id is required"));
        let e = ProtocolError::from(ServiceError::NotReady);
        assert_eq!(e.message, "store not initialized");
        let e = ProtocolError::from(ServiceError::SaveFailed("disk full".into()));
        assert_eq!((e.code.as_str(), e.message.as_str()), ("save_failed", "disk full"));
    }
}
