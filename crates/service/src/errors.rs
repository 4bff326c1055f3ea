use models::errors::ModelError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("entity_id is required")]
    InvalidEntityId,
    #[error("store not initialized")]
    NotReady,
    #[error("{0}")]
    SaveFailed(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Stable code sent to clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEntityId => "invalid_entity_id",
            Self::NotReady => "not_ready",
            Self::SaveFailed(_) => "save_failed",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::InvalidEntityId => Self::InvalidEntityId,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ServiceError::InvalidEntityId.code(), "invalid_entity_id");
        assert_eq!(ServiceError::NotReady.code(), "not_ready");
        assert_eq!(ServiceError::SaveFailed("disk full".into()).code(), "save_failed");
        assert_eq!(ServiceError::SaveFailed("disk full".into()).to_string(), "disk full");
        assert_eq!(ServiceError::from(ModelError::InvalidEntityId), ServiceError::InvalidEntityId);
    }
}
