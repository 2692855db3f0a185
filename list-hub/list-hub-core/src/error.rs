//! Error taxonomy shared by storage, the folder service and the HTTP layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    /// Blank names, malformed bulk-save payloads.
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    /// Deleting the last remaining folder.
    #[error("{0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for HubError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for HubError {
    fn from(value: serde_json::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl HubError {
    pub fn folder_not_found() -> Self {
        Self::NotFound("Folder not found".to_string())
    }

    pub fn item_not_found() -> Self {
        Self::NotFound("Item not found".to_string())
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
