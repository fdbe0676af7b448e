//! Ownership and mode fixing for provisioned trees

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::runner::CommandRunner;
use crate::Result;

/// Recursively apply `user:group` ownership to a subtree.
pub fn fix_owner(
    runner: &dyn CommandRunner,
    path: &Path,
    user: &str,
    group: &str,
) -> Result<()> {
    let owner = format!("{}:{}", user, group);
    runner.run("chown", &["-R", &owner, &path.to_string_lossy()])?;
    debug!(path = %path.display(), %owner, "fixed ownership");
    Ok(())
}

/// Create a directory (and any missing parents) with `mode`, owned by
/// `user:group`. Mode and ownership are applied to the directory
/// itself, not its parents.
pub fn create_dir_owned(
    runner: &dyn CommandRunner,
    path: &Path,
    mode: u32,
    user: &str,
    group: &str,
) -> Result<()> {
    fs::create_dir_all(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    let owner = format!("{}:{}", user, group);
    runner.run("chown", &[&owner, &path.to_string_lossy()])?;
    Ok(())
}
