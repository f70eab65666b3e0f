//! Error types for all docledger store operations.

use std::io;
use thiserror::Error;

/// Top-level error type for store operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupted snapshot: {0}")]
    Corrupted(String),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document must be a JSON object")]
    NotAnObject,
}

pub type Result<T> = std::result::Result<T, Error>;
