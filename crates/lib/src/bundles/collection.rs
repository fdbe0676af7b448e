use std::fs;
use std::path::{Path, PathBuf};

use steward_core::models::BundleDefinition;
use steward_platform::paths::DirProvider;

use super::{Bundle, BundleError};

/// A collection of bundles of one kind, e.g. jobs or packages.
#[derive(Debug, Clone)]
pub struct BundleCollection {
  install_root: PathBuf,
  enable_root: PathBuf,
}

impl BundleCollection {
  pub fn new(install_root: impl Into<PathBuf>, enable_root: impl Into<PathBuf>) -> Self {
    Self {
      install_root: install_root.into(),
      enable_root: enable_root.into(),
    }
  }

  /// The job bundle collection under the agent base directory.
  pub fn jobs(dirs: &DirProvider) -> Self {
    Self::new(dirs.jobs_data_dir(), dirs.jobs_dir())
  }

  /// The package bundle collection under the agent base directory.
  pub fn packages(dirs: &DirProvider) -> Self {
    Self::new(dirs.packages_data_dir(), dirs.packages_dir())
  }

  /// The bundle for one definition. Purely computed; the bundle may or
  /// may not be installed.
  pub fn get(&self, definition: &dyn BundleDefinition) -> Result<Bundle, BundleError> {
    let name = definition.bundle_name();
    let version = definition.bundle_version();
    if name.is_empty() || version.is_empty() {
      return Err(BundleError::MissingIdentity);
    }

    Ok(Bundle::new(
      name,
      version,
      self.install_root.join(name).join(version),
      self.enable_root.join(name),
    ))
  }

  /// Every installed bundle, in lexical name/version order.
  pub fn list(&self) -> Result<Vec<Bundle>, BundleError> {
    let mut bundles = Vec::new();
    if !self.install_root.is_dir() {
      return Ok(bundles);
    }

    for name_entry in sorted_dirs(&self.install_root)? {
      let Some(name) = name_entry.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
        continue;
      };
      for version_entry in sorted_dirs(&name_entry)? {
        let Some(version) = version_entry
          .file_name()
          .and_then(|v| v.to_str())
          .map(str::to_string)
        else {
          continue;
        };
        bundles.push(Bundle::new(
          name.clone(),
          version,
          version_entry,
          self.enable_root.join(&name),
        ));
      }
    }

    Ok(bundles)
  }
}

fn sorted_dirs(root: &Path) -> Result<Vec<PathBuf>, BundleError> {
  let list = |source: std::io::Error| BundleError::List {
    path: root.to_path_buf(),
    source,
  };

  let mut dirs = Vec::new();
  for entry in fs::read_dir(root).map_err(list)? {
    let entry = entry.map_err(list)?;
    let path = entry.path();
    if path.is_dir() {
      dirs.push(path);
    }
  }
  dirs.sort();
  Ok(dirs)
}
