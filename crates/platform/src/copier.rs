//! Filtered copy of a directory tree into a temp location
//!
//! Used to stage a subset of a tree (log bundles, support archives) for
//! packaging. Filters are glob patterns evaluated against paths
//! relative to the source root, so they cannot reach outside it.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::{Error, Result};

/// Copy the files under `src` matching `filters` into a fresh temp
/// directory beneath `tmp_root`, preserving relative paths. Files are
/// visited in lexical order; the returned directory has mode `0755`
/// and is released with [`clean_up`].
pub fn filtered_copy_to_temp(tmp_root: &Path, src: &Path, filters: &[&str]) -> Result<PathBuf> {
    let globs = build_globset(filters)?;

    fs::create_dir_all(tmp_root)?;
    let dest = tempfile::Builder::new()
        .prefix("steward-copy-")
        .tempdir_in(tmp_root)?
        .keep();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o755))?;
    }

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        // Paths are matched relative to the source root; an entry
        // outside it can never appear here.
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        if !globs.is_match(relative) {
            continue;
        }

        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
    }

    debug!(src = %src.display(), dest = %dest.display(), "copied filtered tree");
    Ok(dest)
}

/// Remove a directory produced by [`filtered_copy_to_temp`]. Missing
/// directories are fine.
pub fn clean_up(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}

fn build_globset(filters: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in filters {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| Error::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| Error::InvalidPattern {
        pattern: filters.join(","),
        source,
    })
}
