//! steward-platform: host capabilities for the steward agent
//!
//! Everything here touches the machine directly: the agent base
//! directory layout, external process execution, ownership fixing, and
//! filtered tree copies. The reconciliation core consumes these through
//! narrow seams so tests can substitute recording fakes.

pub mod copier;
pub mod error;
pub mod paths;
pub mod permissions;
pub mod runner;

pub use error::Error;

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, Error>;
