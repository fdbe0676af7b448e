//! Error types for steward-core

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during steward-core operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Empty digest")]
    EmptyDigest,

    #[error("Digest mismatch for {path}: expected {expected}")]
    DigestMismatch { expected: String, path: PathBuf },

    #[error("Blob '{id}' not found under {root}")]
    BlobNotFound { id: String, root: PathBuf },

    #[error("Blob id '{0}' is not a valid object name")]
    InvalidBlobId(String),

    #[error("Decompression destination {0} does not exist")]
    MissingDestination(PathBuf),
}
