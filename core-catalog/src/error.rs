use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Storage error: {0}")]
    Storage(#[from] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored record under '{key}' is unreadable: {message}")]
    CorruptRecord { key: String, message: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },
}

impl CatalogError {
    /// Returns `true` when the underlying storage may accept a retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Storage(e) if e.is_transient())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
