//! steward-core: fundamental types for the steward agent
//!
//! This crate provides the pieces shared by the appliers:
//! - `Job` / `Package` / `Source`: the desired-state model handed down
//!   by the director
//! - `Digest` / `MultiDigest`: content digests with legacy bare-SHA1
//!   support
//! - `Blobstore`: fetch-by-id with digest verification
//! - `Compressor`: tarball extraction
//!
//! The reconciliation engine itself lives in `steward-lib`.

pub mod blobstore;
pub mod compressor;
pub mod digest;
pub mod error;
pub mod models;

pub use error::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
