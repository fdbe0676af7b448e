//! Directory layout for the agent base directory
//!
//! All agent state lives under one base directory:
//!
//! ```text
//! <base>/
//! ├── jobs/<name>               # symlink to the enabled job version
//! ├── packages/<name>           # symlink to the enabled package version
//! └── data/
//!     ├── jobs/<name>/<version>/
//!     ├── packages/<name>/<version>/
//!     ├── blobs/                # local blobstore objects
//!     ├── tmp/                  # scratch space, same filesystem as data
//!     ├── sys/log/<job>/
//!     ├── sys/run/<job>/
//!     └── <job>/                # per-job writable data
//! ```

use std::path::{Path, PathBuf};

/// Base directory used when `STEWARD_BASE_DIR` is not set.
pub const DEFAULT_BASE_DIR: &str = "/var/vcap";

/// Resolves well-known paths under the agent base directory.
#[derive(Debug, Clone)]
pub struct DirProvider {
    base: PathBuf,
}

impl DirProvider {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Resolve the base from `STEWARD_BASE_DIR`, falling back to the
    /// default.
    pub fn from_env() -> Self {
        match std::env::var("STEWARD_BASE_DIR") {
            Ok(base) => Self::new(base),
            Err(_) => Self::new(DEFAULT_BASE_DIR),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    /// Scratch space. Lives under `data` so renames into the bundle
    /// roots never cross filesystems.
    pub fn tmp_dir(&self) -> PathBuf {
        self.data_dir().join("tmp")
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir().join("blobs")
    }

    /// Install root for job bundles.
    pub fn jobs_data_dir(&self) -> PathBuf {
        self.data_dir().join("jobs")
    }

    /// Install root for package bundles.
    pub fn packages_data_dir(&self) -> PathBuf {
        self.data_dir().join("packages")
    }

    /// Enable root for job bundles (current-version symlinks).
    pub fn jobs_dir(&self) -> PathBuf {
        self.base.join("jobs")
    }

    /// Enable root for package bundles.
    pub fn packages_dir(&self) -> PathBuf {
        self.base.join("packages")
    }

    pub fn job_log_dir(&self, job_name: &str) -> PathBuf {
        self.data_dir().join("sys").join("log").join(job_name)
    }

    pub fn job_run_dir(&self, job_name: &str) -> PathBuf {
        self.data_dir().join("sys").join("run").join(job_name)
    }

    pub fn job_data_dir(&self, job_name: &str) -> PathBuf {
        self.data_dir().join(job_name)
    }
}
