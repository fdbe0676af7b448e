//! Job supervision contract.
//!
//! Process supervision itself lives outside the agent core; the job
//! applier only registers config files with whatever backend the host
//! build wires in.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SupervisorError {
  #[error("supervisor rejected job {name}: {message}")]
  Rejected { name: String, message: String },

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

pub trait JobSupervisor: Send + Sync {
  /// Register one supervision unit named `name` at `index`, configured
  /// by the file at `config_path`.
  fn add_job(&self, name: &str, index: usize, config_path: &Path) -> Result<(), SupervisorError>;
}

/// Discards registrations. Stands in until a supervision backend is
/// wired into the host build.
#[derive(Debug, Default)]
pub struct NullJobSupervisor;

impl NullJobSupervisor {
  pub fn new() -> Self {
    Self
  }
}

impl JobSupervisor for NullJobSupervisor {
  fn add_job(&self, name: &str, index: usize, config_path: &Path) -> Result<(), SupervisorError> {
    debug!(job = name, index, config = %config_path.display(), "discarding supervision unit");
    Ok(())
  }
}
