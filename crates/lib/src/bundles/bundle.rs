use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BundleError {
  #[error("bundle name and version must be non-empty")]
  MissingIdentity,

  #[error("bundle {name}/{version} is not installed")]
  NotInstalled { name: String, version: String },

  #[error("bundle {name}/{version} is still enabled; disable it before uninstalling")]
  StillEnabled { name: String, version: String },

  #[error("installing bundle {name}/{version}: {source}")]
  Install {
    name: String,
    version: String,
    #[source]
    source: io::Error,
  },

  #[error("enabling bundle {name}/{version}: {source}")]
  Enable {
    name: String,
    version: String,
    #[source]
    source: io::Error,
  },

  #[error("disabling bundle {name}/{version}: {source}")]
  Disable {
    name: String,
    version: String,
    #[source]
    source: io::Error,
  },

  #[error("uninstalling bundle {name}/{version}: {source}")]
  Uninstall {
    name: String,
    version: String,
    #[source]
    source: io::Error,
  },

  #[error("listing bundles under {path}: {source}")]
  List {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// The on-disk materialization of one `(name, version)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
  name: String,
  version: String,
  install_path: PathBuf,
  enable_path: PathBuf,
}

impl Bundle {
  pub(crate) fn new(
    name: impl Into<String>,
    version: impl Into<String>,
    install_path: PathBuf,
    enable_path: PathBuf,
  ) -> Self {
    Self {
      name: name.into(),
      version: version.into(),
      install_path,
      enable_path,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  /// Where the bundle's content lives once installed. Stable across
  /// re-enables of the same version.
  pub fn install_path(&self) -> &Path {
    &self.install_path
  }

  /// Well-known path that points at the enabled version.
  pub fn enable_path(&self) -> &Path {
    &self.enable_path
  }

  pub fn is_installed(&self) -> bool {
    self.install_path.is_dir()
  }

  /// True when the enable symlink currently points at this bundle.
  pub fn is_enabled(&self) -> bool {
    self.enabled_target().as_deref() == Some(self.install_path.as_path())
  }

  fn enabled_target(&self) -> Option<PathBuf> {
    fs::read_link(&self.enable_path).ok()
  }

  /// Move `source` into the canonical install location.
  ///
  /// Installing an already-installed bundle is a no-op: the existing
  /// content wins and `source` is left untouched.
  pub fn install(&self, source: &Path) -> Result<PathBuf, BundleError> {
    if self.is_installed() {
      debug!(name = %self.name, version = %self.version, "bundle already installed");
      return Ok(self.install_path.clone());
    }

    let install = |source: io::Error| BundleError::Install {
      name: self.name.clone(),
      version: self.version.clone(),
      source,
    };

    if let Some(parent) = self.install_path.parent() {
      fs::create_dir_all(parent).map_err(install)?;
    }
    fs::rename(source, &self.install_path).map_err(install)?;

    debug!(name = %self.name, version = %self.version, path = %self.install_path.display(), "installed bundle");
    Ok(self.install_path.clone())
  }

  /// Atomically repoint the enable symlink at this bundle. Re-enabling
  /// the already-enabled version is a no-op.
  pub fn enable(&self) -> Result<PathBuf, BundleError> {
    if !self.is_installed() {
      return Err(BundleError::NotInstalled {
        name: self.name.clone(),
        version: self.version.clone(),
      });
    }

    if self.is_enabled() {
      return Ok(self.enable_path.clone());
    }

    let enable = |source: io::Error| BundleError::Enable {
      name: self.name.clone(),
      version: self.version.clone(),
      source,
    };

    if let Some(parent) = self.enable_path.parent() {
      fs::create_dir_all(parent).map_err(enable)?;
    }

    // The link is staged next to its final name and renamed over it,
    // so the enable path always resolves to a complete version.
    let staged = self.enable_path.with_file_name(format!("{}.new", self.name));
    match fs::remove_file(&staged) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => return Err(enable(e)),
    }

    #[cfg(unix)]
    std::os::unix::fs::symlink(&self.install_path, &staged).map_err(enable)?;
    #[cfg(windows)]
    std::os::windows::fs::symlink_dir(&self.install_path, &staged).map_err(enable)?;

    fs::rename(&staged, &self.enable_path).map_err(enable)?;

    debug!(name = %self.name, version = %self.version, "enabled bundle");
    Ok(self.enable_path.clone())
  }

  /// Remove the enable symlink if it points at this bundle; silent
  /// no-op when it is absent or another version is enabled.
  pub fn disable(&self) -> Result<(), BundleError> {
    match fs::read_link(&self.enable_path) {
      Ok(target) if target == self.install_path => {
        fs::remove_file(&self.enable_path).map_err(|source| BundleError::Disable {
          name: self.name.clone(),
          version: self.version.clone(),
          source,
        })?;
        debug!(name = %self.name, version = %self.version, "disabled bundle");
        Ok(())
      }
      Ok(_) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(source) => Err(BundleError::Disable {
        name: self.name.clone(),
        version: self.version.clone(),
        source,
      }),
    }
  }

  /// Delete the installed content. The bundle must be disabled first.
  pub fn uninstall(&self) -> Result<(), BundleError> {
    if self.is_enabled() {
      return Err(BundleError::StillEnabled {
        name: self.name.clone(),
        version: self.version.clone(),
      });
    }
    if !self.is_installed() {
      return Err(BundleError::NotInstalled {
        name: self.name.clone(),
        version: self.version.clone(),
      });
    }

    fs::remove_dir_all(&self.install_path).map_err(|source| BundleError::Uninstall {
      name: self.name.clone(),
      version: self.version.clone(),
      source,
    })?;

    // Prune the name directory once its last version is gone.
    if let Some(parent) = self.install_path.parent() {
      let _ = fs::remove_dir(parent);
    }

    debug!(name = %self.name, version = %self.version, "uninstalled bundle");
    Ok(())
  }
}
