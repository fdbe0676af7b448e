//! Rendered job reconciliation.
//!
//! Jobs arrive as rendered archives in the blobstore. Applying a job
//! installs and enables its bundle, fans out to its packages in
//! declared order, and provisions its work directories; `keep_only`
//! garbage-collects bundles that fell out of the desired set. Every
//! step is idempotent so the director can re-issue the same manifest
//! until it converges.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use steward_core::blobstore::{Blobstore, FetchedBlob};
use steward_core::compressor::Compressor;
use steward_core::models::Job;
use steward_platform::paths::DirProvider;
use steward_platform::permissions;
use steward_platform::runner::CommandRunner;

use crate::bundles::{Bundle, BundleCollection, BundleError};
use crate::packages::{PackageApplierProvider, PackageError};
use crate::supervisor::{JobSupervisor, SupervisorError};

/// Applies owner/group to an installed job subtree.
pub type PermissionsFixer =
  Box<dyn Fn(&Path, &str, &str) -> steward_platform::Result<()> + Send + Sync>;

const JOB_OWNER_USER: &str = "root";
const JOB_OWNER_GROUP: &str = "vcap";
const JOB_DIR_MODE: u32 = 0o770;

/// Primary supervisor config inside an installed job.
const PRIMARY_CONFIG: &str = "monit";

/// Extension of secondary supervisor configs next to the primary.
const SECONDARY_CONFIG_EXT: &str = "monit";

#[derive(Debug, Error)]
pub enum JobError {
  #[error("Getting job bundle: {0}")]
  GetBundle(#[source] BundleError),

  #[error("Listing job bundles: {0}")]
  List(#[source] BundleError),

  #[error("Allocating temp directory: {0}")]
  TempDir(#[source] io::Error),

  #[error("Fetching blob: {0}")]
  Fetch(#[source] steward_core::Error),

  #[error("Decompressing blob: {0}")]
  Decompress(#[source] steward_core::Error),

  #[error("Installing job: {0}")]
  Install(#[source] BundleError),

  #[error("Fixing permissions: {0}")]
  Permissions(#[source] steward_platform::Error),

  #[error("Enabling job: {0}")]
  Enable(#[source] BundleError),

  #[error("Disabling job: {0}")]
  Disable(#[source] BundleError),

  #[error("Uninstalling job: {0}")]
  Uninstall(#[source] BundleError),

  #[error("Applying package {name}: {source}")]
  Package {
    name: String,
    #[source]
    source: PackageError,
  },

  #[error("Keeping only needed packages: {0}")]
  KeepOnlyPackages(#[source] PackageError),

  #[error("Creating directories for job: {0}")]
  CreateDirs(#[source] steward_platform::Error),

  #[error("Finding supervisor configs: {0}")]
  FindConfigs(#[source] io::Error),

  #[error("Registering job with supervisor: {0}")]
  Supervise(#[source] SupervisorError),
}

/// Reconciles rendered jobs against the bundle store.
pub struct JobApplier {
  dirs: DirProvider,
  bundles: BundleCollection,
  supervisor: Arc<dyn JobSupervisor>,
  package_appliers: Arc<dyn PackageApplierProvider>,
  blobstore: Arc<dyn Blobstore>,
  compressor: Arc<dyn Compressor>,
  runner: Arc<dyn CommandRunner>,
  fix_permissions: PermissionsFixer,
}

impl JobApplier {
  pub fn new(
    dirs: DirProvider,
    bundles: BundleCollection,
    supervisor: Arc<dyn JobSupervisor>,
    package_appliers: Arc<dyn PackageApplierProvider>,
    blobstore: Arc<dyn Blobstore>,
    compressor: Arc<dyn Compressor>,
    runner: Arc<dyn CommandRunner>,
    fix_permissions: PermissionsFixer,
  ) -> Self {
    Self {
      dirs,
      bundles,
      supervisor,
      package_appliers,
      blobstore,
      compressor,
      runner,
      fix_permissions,
    }
  }

  /// Ensure the job's rendered archive is installed, without enabling
  /// it. An already-installed job is left untouched: no fetch, no
  /// extraction.
  pub fn prepare(&self, job: &Job) -> Result<(), JobError> {
    let bundle = self.bundles.get(job).map_err(JobError::GetBundle)?;
    self.install(job, &bundle)?;
    Ok(())
  }

  /// Install, enable, fan out to the job's packages, and provision its
  /// work directories.
  pub fn apply(&self, job: &Job) -> Result<(), JobError> {
    let bundle = self.bundles.get(job).map_err(JobError::GetBundle)?;
    self.install(job, &bundle)?;
    bundle.enable().map_err(JobError::Enable)?;
    self.apply_packages(job)?;
    self.create_job_dirs(job)?;
    info!(job = %job.name, version = %job.version, "applied job");
    Ok(())
  }

  /// Register the job's supervision units.
  ///
  /// The primary config is `<install>/monit`; every `<stem>.monit`
  /// next to it registers a `<job>_<stem>` sub-job at the same index,
  /// in lexical order. All configs are optional.
  pub fn configure(&self, job: &Job, index: usize) -> Result<(), JobError> {
    let bundle = self.bundles.get(job).map_err(JobError::GetBundle)?;
    let install_path = bundle.install_path();

    let primary = install_path.join(PRIMARY_CONFIG);
    if primary.is_file() {
      self
        .supervisor
        .add_job(&job.name, index, &primary)
        .map_err(JobError::Supervise)?;
    }

    for config in secondary_configs(install_path).map_err(JobError::FindConfigs)? {
      let stem = config
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
      let name = format!("{}_{}", job.name, stem);
      self
        .supervisor
        .add_job(&name, index, &config)
        .map_err(JobError::Supervise)?;
    }

    Ok(())
  }

  /// Disable and uninstall every installed job outside `jobs`.
  pub fn keep_only(&self, jobs: &[Job]) -> Result<(), JobError> {
    let installed = self.bundles.list().map_err(JobError::List)?;

    for bundle in installed {
      let mut keep = false;
      for job in jobs {
        let candidate = self.bundles.get(job).map_err(JobError::GetBundle)?;
        if candidate.install_path() == bundle.install_path() {
          keep = true;
          break;
        }
      }
      if keep {
        continue;
      }

      bundle.disable().map_err(JobError::Disable)?;
      bundle.uninstall().map_err(JobError::Uninstall)?;
      info!(job = %bundle.name(), version = %bundle.version(), "removed stale job");
    }

    Ok(())
  }

  fn install(&self, job: &Job, bundle: &Bundle) -> Result<(), JobError> {
    if bundle.is_installed() {
      debug!(job = %job.name, version = %job.version, "job already installed");
      return Ok(());
    }

    let tmp_root = self.dirs.tmp_dir();
    fs::create_dir_all(&tmp_root).map_err(JobError::TempDir)?;
    // Dropping the workspace removes the extracted tree on every exit
    // path; the guard does the same for the fetched blob file.
    let workspace = tempfile::Builder::new()
      .prefix("steward-job-")
      .tempdir_in(&tmp_root)
      .map_err(JobError::TempDir)?;

    let blob = FetchedBlob::fetch(
      self.blobstore.as_ref(),
      &job.source.blobstore_id,
      &job.source.sha1,
    )
    .map_err(JobError::Fetch)?;

    self
      .compressor
      .decompress_file_to_dir(blob.path(), workspace.path())
      .map_err(JobError::Decompress)?;

    let source = workspace.path().join(&job.source.path_in_archive);
    let install_path = bundle.install(&source).map_err(JobError::Install)?;

    (self.fix_permissions)(&install_path, JOB_OWNER_USER, JOB_OWNER_GROUP)
      .map_err(JobError::Permissions)?;

    info!(job = %job.name, version = %job.version, "installed job");
    Ok(())
  }

  fn apply_packages(&self, job: &Job) -> Result<(), JobError> {
    let applier = self.package_appliers.applier_for(&job.name);

    for package in &job.packages {
      applier.apply(package).map_err(|source| JobError::Package {
        name: package.name.clone(),
        source,
      })?;
    }
    applier
      .keep_only(&job.packages)
      .map_err(JobError::KeepOnlyPackages)?;

    Ok(())
  }

  fn create_job_dirs(&self, job: &Job) -> Result<(), JobError> {
    let dirs = [
      self.dirs.job_log_dir(&job.name),
      self.dirs.job_run_dir(&job.name),
      self.dirs.job_data_dir(&job.name),
    ];

    for dir in dirs {
      permissions::create_dir_owned(
        self.runner.as_ref(),
        &dir,
        JOB_DIR_MODE,
        JOB_OWNER_USER,
        JOB_OWNER_GROUP,
      )
      .map_err(JobError::CreateDirs)?;
    }

    Ok(())
  }
}

/// `<stem>.monit` files next to the primary config, in lexical order.
fn secondary_configs(install_path: &Path) -> io::Result<Vec<PathBuf>> {
  let mut configs = Vec::new();

  let entries = match fs::read_dir(install_path) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(configs),
    Err(e) => return Err(e),
  };

  for entry in entries {
    let path = entry?.path();
    if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(SECONDARY_CONFIG_EXT) {
      configs.push(path);
    }
  }

  configs.sort();
  Ok(configs)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::{
    FakeBlobstore, FakeCommandRunner, FakeCompressor, FakeSupervisor, RecordingPackageApplier,
    RecordingProvider,
  };
  use std::sync::Mutex;
  use steward_core::digest::{Algorithm, Digest, MultiDigest};
  use steward_core::models::{Package, Source};
  use tempfile::TempDir;

  struct Harness {
    temp: TempDir,
    dirs: DirProvider,
    blobstore: Arc<FakeBlobstore>,
    compressor: Arc<FakeCompressor>,
    supervisor: Arc<FakeSupervisor>,
    packages: Arc<RecordingPackageApplier>,
    provider: Arc<RecordingProvider>,
    runner: Arc<FakeCommandRunner>,
    fixed: Arc<Mutex<Vec<(PathBuf, String, String)>>>,
    applier: JobApplier,
  }

  impl Harness {
    fn new() -> Self {
      Self::with_compressor(FakeCompressor::populating(&["pkg/web"]))
    }

    fn with_compressor(compressor: FakeCompressor) -> Self {
      let temp = TempDir::new().unwrap();
      let dirs = DirProvider::new(temp.path());
      let blobstore = Arc::new(FakeBlobstore::new(temp.path().join("blobcache")));
      let compressor = Arc::new(compressor);
      let supervisor = Arc::new(FakeSupervisor::default());
      let packages = Arc::new(RecordingPackageApplier::default());
      let provider = Arc::new(RecordingProvider::new(packages.clone()));
      let runner = Arc::new(FakeCommandRunner::default());
      let fixed = Arc::new(Mutex::new(Vec::new()));

      let fixer_log = fixed.clone();
      let applier = JobApplier::new(
        dirs.clone(),
        BundleCollection::jobs(&dirs),
        supervisor.clone(),
        provider.clone(),
        blobstore.clone(),
        compressor.clone(),
        runner.clone(),
        Box::new(move |path, user, group| {
          fixer_log
            .lock()
            .unwrap()
            .push((path.to_path_buf(), user.to_string(), group.to_string()));
          Ok(())
        }),
      );

      Self {
        temp,
        dirs,
        blobstore,
        compressor,
        supervisor,
        packages,
        provider,
        runner,
        fixed,
        applier,
      }
    }

    fn bundle(&self, job: &Job) -> Bundle {
      self.applier.bundles.get(job).unwrap()
    }

    fn tmp_entries(&self) -> Vec<PathBuf> {
      match fs::read_dir(self.dirs.tmp_dir()) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
      }
    }
  }

  fn source(id: &str) -> Source {
    Source {
      blobstore_id: id.to_string(),
      sha1: MultiDigest::from(Digest::new(Algorithm::Sha1, "fakesha")),
      path_in_archive: "pkg/web".to_string(),
    }
  }

  fn web_job() -> Job {
    Job {
      name: "web".to_string(),
      version: "1".to_string(),
      source: source("blob-web"),
      packages: vec![Package {
        name: "ruby".to_string(),
        version: "2".to_string(),
        source: Source {
          blobstore_id: "blob-ruby".to_string(),
          sha1: MultiDigest::from(Digest::new(Algorithm::Sha1, "rubysha")),
          path_in_archive: String::new(),
        },
      }],
    }
  }

  fn job(name: &str, version: &str) -> Job {
    Job {
      name: name.to_string(),
      version: version.to_string(),
      source: source(&format!("blob-{}", name)),
      packages: Vec::new(),
    }
  }

  #[test]
  fn apply_installs_enables_and_provisions_a_new_job() {
    let harness = Harness::new();
    let job = web_job();

    harness.applier.apply(&job).unwrap();

    // fetched and released exactly one blob
    assert_eq!(harness.blobstore.fetched(), vec!["blob-web"]);
    assert_eq!(harness.blobstore.cleaned().len(), 1);

    // extracted into a workspace under the agent tmp dir
    let calls = harness.compressor.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].1.starts_with(harness.dirs.tmp_dir()));

    // installed from the archive subtree and enabled
    let bundle = harness.bundle(&job);
    assert!(bundle.is_installed());
    assert!(bundle.is_enabled());
    assert_eq!(
      fs::read_link(harness.dirs.jobs_dir().join("web")).unwrap(),
      bundle.install_path().to_path_buf()
    );

    // ownership fixed on the install path
    assert_eq!(
      harness.fixed.lock().unwrap().clone(),
      vec![(
        bundle.install_path().to_path_buf(),
        "root".to_string(),
        "vcap".to_string()
      )]
    );

    // packages applied in order, then trimmed to the declared set
    assert_eq!(harness.provider.requested(), vec!["web"]);
    assert_eq!(harness.packages.actions(), vec!["apply", "keep_only"]);
    assert_eq!(harness.packages.applied(), job.packages);
    assert_eq!(harness.packages.kept(), job.packages);

    // work directories provisioned 0770 root:vcap
    for dir in [
      harness.dirs.job_log_dir("web"),
      harness.dirs.job_run_dir("web"),
      harness.dirs.job_data_dir("web"),
    ] {
      assert!(dir.is_dir());
      #[cfg(unix)]
      {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o770, "mode of {}", dir.display());
      }
    }
    let chowns: Vec<Vec<String>> = harness.runner.commands();
    assert_eq!(chowns.len(), 3);
    assert!(chowns.iter().all(|c| c[0] == "chown" && c[1] == "root:vcap"));

    // nothing left in the scratch space
    assert!(harness.tmp_entries().is_empty());
  }

  #[test]
  fn reapplying_skips_the_fetch_but_still_reconciles() {
    let harness = Harness::new();
    let job = web_job();

    harness.applier.apply(&job).unwrap();
    harness.applier.apply(&job).unwrap();

    // no second download or extraction
    assert_eq!(harness.blobstore.fetched().len(), 1);
    assert_eq!(harness.compressor.calls().len(), 1);

    // still enabled, packages reconciled on both passes
    assert!(harness.bundle(&job).is_enabled());
    assert_eq!(
      harness.packages.actions(),
      vec!["apply", "keep_only", "apply", "keep_only"]
    );
  }

  #[test]
  fn prepare_installs_without_enabling() {
    let harness = Harness::new();
    let job = web_job();

    harness.applier.prepare(&job).unwrap();

    let bundle = harness.bundle(&job);
    assert!(bundle.is_installed());
    assert!(!bundle.is_enabled());
    assert!(harness.packages.actions().is_empty());
    assert!(!harness.dirs.job_log_dir("web").exists());
  }

  #[test]
  fn prepare_of_an_installed_job_does_nothing() {
    let harness = Harness::new();
    let job = web_job();
    fs::create_dir_all(harness.bundle(&job).install_path()).unwrap();

    harness.applier.prepare(&job).unwrap();

    assert!(harness.blobstore.fetched().is_empty());
    assert!(harness.compressor.calls().is_empty());
    assert!(harness.fixed.lock().unwrap().is_empty());
  }

  #[test]
  fn failed_extraction_unwinds_the_workspace_and_blob() {
    let harness = Harness::new();
    harness.compressor.fail_next_decompress();

    let result = harness.applier.apply(&web_job());
    assert!(matches!(result, Err(JobError::Decompress(_))));

    // blob released, workspace removed, nothing installed
    assert_eq!(harness.blobstore.cleaned().len(), 1);
    assert!(harness.tmp_entries().is_empty());
    assert!(!harness.bundle(&web_job()).is_installed());
  }

  #[test]
  fn failed_fetch_surfaces_with_context() {
    let harness = Harness::new();
    harness.blobstore.fail_next_get();

    let result = harness.applier.apply(&web_job());
    match result {
      Err(error @ JobError::Fetch(_)) => {
        assert!(error.to_string().starts_with("Fetching blob"));
      }
      other => panic!("expected Fetch error, got {:?}", other.err()),
    }
    assert!(harness.tmp_entries().is_empty());
  }

  #[test]
  fn missing_archive_subtree_fails_the_install() {
    // The compressor plants nothing, so the declared path_in_archive
    // does not exist in the workspace.
    let harness = Harness::with_compressor(FakeCompressor::default());

    let result = harness.applier.apply(&web_job());
    match result {
      Err(error @ JobError::Install(_)) => {
        assert!(error.to_string().starts_with("Installing job"));
      }
      other => panic!("expected Install error, got {:?}", other.err()),
    }
    assert!(harness.tmp_entries().is_empty());
  }

  #[test]
  fn failed_package_apply_aborts_the_job() {
    let harness = Harness::new();
    harness.packages.fail_next_apply();

    let result = harness.applier.apply(&web_job());
    assert!(matches!(result, Err(JobError::Package { .. })));

    // directories are provisioned after packages, so none exist yet
    assert!(!harness.dirs.job_log_dir("web").exists());
  }

  #[test]
  fn configure_registers_primary_and_secondary_configs() {
    let harness = Harness::new();
    let job = web_job();

    let install_path = harness.bundle(&job).install_path().to_path_buf();
    fs::create_dir_all(&install_path).unwrap();
    fs::write(install_path.join("monit"), "check process web").unwrap();
    fs::write(install_path.join("worker.monit"), "check process worker").unwrap();
    fs::write(install_path.join("alerts.monit"), "check process alerts").unwrap();
    fs::write(install_path.join("README"), "not a config").unwrap();

    harness.applier.configure(&job, 2).unwrap();

    assert_eq!(
      harness.supervisor.added(),
      vec![
        ("web".to_string(), 2, install_path.join("monit")),
        ("web_alerts".to_string(), 2, install_path.join("alerts.monit")),
        ("web_worker".to_string(), 2, install_path.join("worker.monit")),
      ]
    );
  }

  #[test]
  fn configure_without_configs_registers_nothing() {
    let harness = Harness::new();

    harness.applier.configure(&web_job(), 0).unwrap();

    assert!(harness.supervisor.added().is_empty());
  }

  #[test]
  fn keep_only_disables_and_uninstalls_the_rest() {
    let harness = Harness::new();
    let jobs: Vec<Job> = (1..=4).map(|n| job(&format!("job{}", n), "1")).collect();

    for job in &jobs {
      let source = harness.temp.path().join("src").join(&job.name);
      fs::create_dir_all(&source).unwrap();
      let bundle = harness.bundle(job);
      bundle.install(&source).unwrap();
      bundle.enable().unwrap();
    }

    harness
      .applier
      .keep_only(&[jobs[3].clone(), jobs[1].clone()])
      .unwrap();

    // job1 and job3 are fully removed
    for stale in [&jobs[0], &jobs[2]] {
      let bundle = harness.bundle(stale);
      assert!(!bundle.is_installed(), "{} still installed", stale.name);
      assert!(!bundle.is_enabled());
    }
    // job2 and job4 are untouched
    for kept in [&jobs[1], &jobs[3]] {
      let bundle = harness.bundle(kept);
      assert!(bundle.is_installed());
      assert!(bundle.is_enabled());
    }
  }

  #[test]
  fn keep_only_with_nothing_installed_is_a_noop() {
    let harness = Harness::new();
    harness.applier.keep_only(&[]).unwrap();
  }
}
