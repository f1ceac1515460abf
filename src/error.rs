use std::io;
use std::result::Result as StdResult;

use thiserror::Error;

/// Errors surfaced by the reconciler, query layer, and importer
#[derive(Error, Debug)]
pub enum Error {
    /// The store cannot be reached; every operation fails closed.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A change would leave a dangling reference or a duplicate name.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Provider(err.to_string())
    }
}

pub type Result<T> = StdResult<T, Error>;
