//! Test doubles for the reconciliation engine.
//!
//! The appliers take their host capabilities through narrow seams;
//! these fakes record every call so tests can assert ordering and
//! arguments while the bundle store runs against a real temp tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use steward_core::blobstore::Blobstore;
use steward_core::compressor::Compressor;
use steward_core::digest::MultiDigest;
use steward_core::models::Package;
use steward_platform::runner::{CommandOutput, CommandRunner};

use crate::packages::{PackageApplier, PackageApplierProvider, PackageError};
use crate::supervisor::{JobSupervisor, SupervisorError};

/// Blobstore that materializes a small file per `get` and records ids.
pub(crate) struct FakeBlobstore {
  dir: PathBuf,
  counter: AtomicUsize,
  fail_next: AtomicBool,
  fetched: Mutex<Vec<String>>,
  cleaned: Mutex<Vec<PathBuf>>,
}

impl FakeBlobstore {
  pub(crate) fn new(dir: PathBuf) -> Self {
    Self {
      dir,
      counter: AtomicUsize::new(0),
      fail_next: AtomicBool::new(false),
      fetched: Mutex::new(Vec::new()),
      cleaned: Mutex::new(Vec::new()),
    }
  }

  pub(crate) fn fail_next_get(&self) {
    self.fail_next.store(true, Ordering::SeqCst);
  }

  pub(crate) fn fetched(&self) -> Vec<String> {
    self.fetched.lock().unwrap().clone()
  }

  pub(crate) fn cleaned(&self) -> Vec<PathBuf> {
    self.cleaned.lock().unwrap().clone()
  }
}

impl Blobstore for FakeBlobstore {
  fn get(&self, blobstore_id: &str, _digest: &MultiDigest) -> steward_core::Result<PathBuf> {
    if self.fail_next.swap(false, Ordering::SeqCst) {
      return Err(steward_core::Error::BlobNotFound {
        id: blobstore_id.to_string(),
        root: self.dir.clone(),
      });
    }

    fs::create_dir_all(&self.dir)?;
    let n = self.counter.fetch_add(1, Ordering::SeqCst);
    let path = self.dir.join(format!("blob-{}", n));
    fs::write(&path, blobstore_id)?;
    self.fetched.lock().unwrap().push(blobstore_id.to_string());
    Ok(path)
  }

  fn clean_up(&self, path: &Path) -> steward_core::Result<()> {
    self.cleaned.lock().unwrap().push(path.to_path_buf());
    match fs::remove_file(path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(steward_core::Error::Io(e)),
    }
  }
}

/// Compressor that records calls and plants the requested directories
/// under the destination instead of extracting anything.
#[derive(Default)]
pub(crate) struct FakeCompressor {
  populate: Vec<String>,
  fail_next: AtomicBool,
  calls: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl FakeCompressor {
  pub(crate) fn populating(paths: &[&str]) -> Self {
    Self {
      populate: paths.iter().map(|p| p.to_string()).collect(),
      ..Self::default()
    }
  }

  pub(crate) fn fail_next_decompress(&self) {
    self.fail_next.store(true, Ordering::SeqCst);
  }

  pub(crate) fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
    self.calls.lock().unwrap().clone()
  }
}

impl Compressor for FakeCompressor {
  fn decompress_file_to_dir(&self, tarball: &Path, dest: &Path) -> steward_core::Result<()> {
    self
      .calls
      .lock()
      .unwrap()
      .push((tarball.to_path_buf(), dest.to_path_buf()));

    if self.fail_next.swap(false, Ordering::SeqCst) {
      return Err(steward_core::Error::Io(io::Error::other(
        "fake decompress failure",
      )));
    }

    for relative in &self.populate {
      fs::create_dir_all(dest.join(relative))?;
    }
    Ok(())
  }
}

/// Supervisor that records registrations.
#[derive(Default)]
pub(crate) struct FakeSupervisor {
  added: Mutex<Vec<(String, usize, PathBuf)>>,
}

impl FakeSupervisor {
  pub(crate) fn added(&self) -> Vec<(String, usize, PathBuf)> {
    self.added.lock().unwrap().clone()
  }
}

impl JobSupervisor for FakeSupervisor {
  fn add_job(&self, name: &str, index: usize, config_path: &Path) -> Result<(), SupervisorError> {
    self
      .added
      .lock()
      .unwrap()
      .push((name.to_string(), index, config_path.to_path_buf()));
    Ok(())
  }
}

/// Package applier that records the fan-out without touching disk.
#[derive(Default)]
pub(crate) struct RecordingPackageApplier {
  fail_next_apply: AtomicBool,
  actions: Mutex<Vec<String>>,
  applied: Mutex<Vec<Package>>,
  kept: Mutex<Vec<Package>>,
}

impl RecordingPackageApplier {
  pub(crate) fn fail_next_apply(&self) {
    self.fail_next_apply.store(true, Ordering::SeqCst);
  }

  pub(crate) fn actions(&self) -> Vec<String> {
    self.actions.lock().unwrap().clone()
  }

  pub(crate) fn applied(&self) -> Vec<Package> {
    self.applied.lock().unwrap().clone()
  }

  pub(crate) fn kept(&self) -> Vec<Package> {
    self.kept.lock().unwrap().clone()
  }
}

impl PackageApplier for RecordingPackageApplier {
  fn prepare(&self, package: &Package) -> Result<(), PackageError> {
    self.actions.lock().unwrap().push("prepare".to_string());
    self.applied.lock().unwrap().push(package.clone());
    Ok(())
  }

  fn apply(&self, package: &Package) -> Result<(), PackageError> {
    self.actions.lock().unwrap().push("apply".to_string());
    if self.fail_next_apply.swap(false, Ordering::SeqCst) {
      return Err(PackageError::TempDir(io::Error::other(
        "fake package apply failure",
      )));
    }
    self.applied.lock().unwrap().push(package.clone());
    Ok(())
  }

  fn keep_only(&self, packages: &[Package]) -> Result<(), PackageError> {
    self.actions.lock().unwrap().push("keep_only".to_string());
    self.kept.lock().unwrap().extend(packages.iter().cloned());
    Ok(())
  }
}

/// Provider that records which job asked and hands back one applier.
pub(crate) struct RecordingProvider {
  applier: Arc<RecordingPackageApplier>,
  requested: Mutex<Vec<String>>,
}

impl RecordingProvider {
  pub(crate) fn new(applier: Arc<RecordingPackageApplier>) -> Self {
    Self {
      applier,
      requested: Mutex::new(Vec::new()),
    }
  }

  pub(crate) fn requested(&self) -> Vec<String> {
    self.requested.lock().unwrap().clone()
  }
}

impl PackageApplierProvider for RecordingProvider {
  fn applier_for(&self, job_name: &str) -> Arc<dyn PackageApplier> {
    self.requested.lock().unwrap().push(job_name.to_string());
    self.applier.clone()
  }
}

/// Command runner that records argv and always succeeds.
#[derive(Default)]
pub(crate) struct FakeCommandRunner {
  commands: Mutex<Vec<Vec<String>>>,
}

impl FakeCommandRunner {
  pub(crate) fn commands(&self) -> Vec<Vec<String>> {
    self.commands.lock().unwrap().clone()
  }
}

impl CommandRunner for FakeCommandRunner {
  fn run(&self, program: &str, args: &[&str]) -> steward_platform::Result<CommandOutput> {
    let mut command = vec![program.to_string()];
    command.extend(args.iter().map(|a| a.to_string()));
    self.commands.lock().unwrap().push(command);
    Ok(CommandOutput::default())
  }
}
