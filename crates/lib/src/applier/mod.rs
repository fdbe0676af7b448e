//! Top-level reconciliation facade.
//!
//! One `apply` pass reconciles the host against the desired job list:
//! every job is applied in declared order, then whatever fell out of
//! the set is garbage-collected. Supervision registration is a separate
//! pass driven by the same list.

use steward_core::models::Job;
use tracing::info;

use crate::jobs::{JobApplier, JobError};

pub struct Applier {
  jobs: JobApplier,
}

impl Applier {
  pub fn new(jobs: JobApplier) -> Self {
    Self { jobs }
  }

  /// Reconcile the host to the desired job set.
  pub fn apply(&self, desired: &[Job]) -> Result<(), JobError> {
    info!(jobs = desired.len(), "reconciling desired jobs");

    for job in desired {
      self.jobs.apply(job)?;
    }
    self.jobs.keep_only(desired)?;

    Ok(())
  }

  /// Register supervision units for the desired jobs, each at its
  /// position in the list. Jobs are configured in reverse declaration
  /// order.
  pub fn configure_jobs(&self, desired: &[Job]) -> Result<(), JobError> {
    for (index, job) in desired.iter().enumerate().rev() {
      self.jobs.configure(job, index)?;
    }
    Ok(())
  }
}
