//! Implementation of the `steward apply` command.
//!
//! Loads a desired apply spec and reconciles the local bundle store
//! against it: jobs are installed and enabled, their packages fanned
//! out, stale bundles garbage-collected, and supervision units
//! registered.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use steward_core::blobstore::{Blobstore, HttpBlobstore, LocalBlobstore};
use steward_core::compressor::TarballCompressor;
use steward_core::models::ApplySpec;
use steward_lib::applier::Applier;
use steward_lib::bundles::BundleCollection;
use steward_lib::jobs::JobApplier;
use steward_lib::packages::{BundlePackageApplier, SharedPackageApplierProvider};
use steward_lib::supervisor::NullJobSupervisor;
use steward_platform::paths::DirProvider;
use steward_platform::permissions;
use steward_platform::runner::SystemCommandRunner;

use crate::output;

/// Execute the apply command.
pub fn cmd_apply(spec_path: &Path, base: Option<&Path>, blobstore_url: Option<&str>) -> Result<()> {
  let dirs = match base {
    Some(base) => DirProvider::new(base),
    None => DirProvider::from_env(),
  };

  let raw = fs::read_to_string(spec_path)
    .with_context(|| format!("Reading apply spec {}", spec_path.display()))?;
  let spec: ApplySpec = serde_json::from_str(&raw)
    .with_context(|| format!("Parsing apply spec {}", spec_path.display()))?;

  info!(jobs = spec.jobs.len(), base = %dirs.base_dir().display(), "starting apply");

  let runner = Arc::new(SystemCommandRunner::new());
  let blobstore: Arc<dyn Blobstore> = match blobstore_url {
    Some(url) => Arc::new(HttpBlobstore::new(url, dirs.tmp_dir())),
    None => Arc::new(LocalBlobstore::new(dirs.blobs_dir(), dirs.tmp_dir())),
  };
  let compressor = Arc::new(TarballCompressor::new());

  let package_applier = Arc::new(BundlePackageApplier::new(
    BundleCollection::packages(&dirs),
    dirs.tmp_dir(),
    blobstore.clone(),
    compressor.clone(),
  ));

  let fixer_runner = runner.clone();
  let job_applier = JobApplier::new(
    dirs.clone(),
    BundleCollection::jobs(&dirs),
    Arc::new(NullJobSupervisor::new()),
    Arc::new(SharedPackageApplierProvider::new(package_applier)),
    blobstore,
    compressor,
    runner,
    Box::new(move |path, user, group| {
      permissions::fix_owner(fixer_runner.as_ref(), path, user, group)
    }),
  );

  let applier = Applier::new(job_applier);
  applier.apply(&spec.jobs).context("Apply failed")?;
  applier
    .configure_jobs(&spec.jobs)
    .context("Configuring jobs failed")?;

  let packages: usize = spec.jobs.iter().map(|j| j.packages.len()).sum();

  println!();
  output::print_success("Apply complete!");
  output::print_stat("Jobs", spec.jobs.len());
  output::print_stat("Packages", packages);
  output::print_stat("Base", dirs.base_dir().display());

  Ok(())
}
