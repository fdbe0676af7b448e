//! Package reconciliation.
//!
//! Packages are shared between jobs, so garbage collection only
//! disables bundles that fell out of the desired set; the content stays
//! installed for whatever else still references it. Full removal is the
//! province of a higher-level sweep.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use steward_core::blobstore::{Blobstore, FetchedBlob};
use steward_core::compressor::Compressor;
use steward_core::models::Package;

use crate::bundles::{Bundle, BundleCollection, BundleError};

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("Allocating temp directory: {0}")]
  TempDir(#[source] std::io::Error),

  #[error("Fetching blob: {0}")]
  Fetch(#[source] steward_core::Error),

  #[error("Decompressing blob: {0}")]
  Decompress(#[source] steward_core::Error),

  #[error(transparent)]
  Bundle(#[from] BundleError),
}

/// Reconciles the package bundles referenced by jobs.
pub trait PackageApplier: Send + Sync {
  /// Ensure the package is installed, without enabling it.
  fn prepare(&self, package: &Package) -> Result<(), PackageError>;

  /// Ensure the package is installed and enabled.
  fn apply(&self, package: &Package) -> Result<(), PackageError>;

  /// Disable every installed package outside `packages`. Content stays
  /// on disk.
  fn keep_only(&self, packages: &[Package]) -> Result<(), PackageError>;
}

/// Hands out the package applier used for a job's package fan-out.
pub trait PackageApplierProvider: Send + Sync {
  fn applier_for(&self, job_name: &str) -> Arc<dyn PackageApplier>;
}

/// Default provider: one shared applier for every job.
pub struct SharedPackageApplierProvider {
  applier: Arc<dyn PackageApplier>,
}

impl SharedPackageApplierProvider {
  pub fn new(applier: Arc<dyn PackageApplier>) -> Self {
    Self { applier }
  }
}

impl PackageApplierProvider for SharedPackageApplierProvider {
  fn applier_for(&self, _job_name: &str) -> Arc<dyn PackageApplier> {
    self.applier.clone()
  }
}

/// Package applier backed by the bundle store.
pub struct BundlePackageApplier {
  bundles: BundleCollection,
  tmp_root: PathBuf,
  blobstore: Arc<dyn Blobstore>,
  compressor: Arc<dyn Compressor>,
}

impl BundlePackageApplier {
  pub fn new(
    bundles: BundleCollection,
    tmp_root: impl Into<PathBuf>,
    blobstore: Arc<dyn Blobstore>,
    compressor: Arc<dyn Compressor>,
  ) -> Self {
    Self {
      bundles,
      tmp_root: tmp_root.into(),
      blobstore,
      compressor,
    }
  }

  fn install(&self, package: &Package, bundle: &Bundle) -> Result<(), PackageError> {
    if bundle.is_installed() {
      debug!(package = %package.name, version = %package.version, "package already installed");
      return Ok(());
    }

    fs::create_dir_all(&self.tmp_root).map_err(PackageError::TempDir)?;
    let workspace = tempfile::Builder::new()
      .prefix("steward-package-")
      .tempdir_in(&self.tmp_root)
      .map_err(PackageError::TempDir)?;

    // Guard releases the blob file on every exit path.
    let blob = FetchedBlob::fetch(
      self.blobstore.as_ref(),
      &package.source.blobstore_id,
      &package.source.sha1,
    )
    .map_err(PackageError::Fetch)?;

    self
      .compressor
      .decompress_file_to_dir(blob.path(), workspace.path())
      .map_err(PackageError::Decompress)?;

    // Package archives install whole: the extracted workspace becomes
    // the bundle content.
    bundle.install(workspace.path())?;

    info!(package = %package.name, version = %package.version, "installed package");
    Ok(())
  }
}

impl PackageApplier for BundlePackageApplier {
  fn prepare(&self, package: &Package) -> Result<(), PackageError> {
    let bundle = self.bundles.get(package)?;
    self.install(package, &bundle)
  }

  fn apply(&self, package: &Package) -> Result<(), PackageError> {
    let bundle = self.bundles.get(package)?;
    self.install(package, &bundle)?;
    bundle.enable()?;
    Ok(())
  }

  fn keep_only(&self, packages: &[Package]) -> Result<(), PackageError> {
    for bundle in self.bundles.list()? {
      let mut keep = false;
      for package in packages {
        let candidate = self.bundles.get(package)?;
        if candidate.install_path() == bundle.install_path() {
          keep = true;
          break;
        }
      }
      if keep {
        continue;
      }

      bundle.disable()?;
      debug!(package = %bundle.name(), version = %bundle.version(), "disabled stale package");
    }
    Ok(())
  }
}
