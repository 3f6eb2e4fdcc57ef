use thiserror::Error;

use models::errors::ModelError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid group: {0}")]
    InvalidGroup(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("corrupt catalog: {0}")]
    CorruptCatalog(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    pub fn tier_not_found(name: &str) -> Self {
        Self::NotFound(format!("tier '{}' not found", name))
    }

    pub fn tier_exists(name: &str) -> Self {
        Self::AlreadyExists(format!("tier '{}' already exists", name))
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 1001,
            ServiceError::InvalidGroup(_) => 1002,
            ServiceError::AlreadyExists(_) => 1003,
            ServiceError::NotFound(_) => 1004,
            ServiceError::Conflict(_) => 1101,
            ServiceError::CorruptCatalog(_) => 1201,
            ServiceError::Storage(_) => 1202,
        }
    }

    /// Caller-side input problems; checked before any storage access.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, ServiceError::Validation(_) | ServiceError::InvalidGroup(_))
    }

    /// Only write races are worth another read-modify-write cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidGroup(msg) => ServiceError::InvalidGroup(msg),
            ModelError::InvalidName(msg) => ServiceError::Validation(msg),
            ModelError::DuplicateTier(name) => ServiceError::tier_exists(&name),
            ModelError::Document(msg) => ServiceError::CorruptCatalog(msg),
        }
    }
}
