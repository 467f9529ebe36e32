use thiserror::Error;

use tillpoint_db::repositories::RepositoryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] tillpoint_core::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Domain(tillpoint_core::Error::not_found(message))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Domain(tillpoint_core::Error::validation(message))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Domain(tillpoint_core::Error::forbidden(message))
    }
}
