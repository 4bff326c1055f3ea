use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("entity_id is required")]
    InvalidEntityId,
}
