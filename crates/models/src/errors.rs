use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid group name: {0}")]
    InvalidGroup(String),
    #[error("invalid tier name: {0}")]
    InvalidName(String),
    #[error("duplicate tier name: {0}")]
    DuplicateTier(String),
    #[error("malformed tier document: {0}")]
    Document(String),
}
