//! Error types for the document store and remote mirror.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by store operations and explicit remote actions
#[derive(Debug, Error)]
pub enum StoreError {
    /// A remote operation was attempted without a signed-in user
    #[error("Not signed in to the remote mirror")]
    NotAuthenticated,

    /// Transport failure or an error reported by the remote service
    #[error("Remote mirror unavailable: {0}")]
    RemoteUnavailable(String),

    /// Remote settings are missing or incomplete
    #[error("Invalid remote configuration: {0}")]
    InvalidConfig(String),

    /// The local cache could not be written
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No document with this id exists in the collection
    #[error("Document not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::RemoteUnavailable(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
