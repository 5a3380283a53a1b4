use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Local snapshot unavailable: {0}")]
    Snapshot(#[from] sqlx::Error),

    #[error("Local snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        StoreError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
