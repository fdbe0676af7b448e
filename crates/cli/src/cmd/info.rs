//! Implementation of the `steward info` command.

use anyhow::Result;

use steward_platform::paths::DirProvider;

use crate::output;

pub fn cmd_info() -> Result<()> {
  let dirs = DirProvider::from_env();

  println!("Directory layout");
  println!();
  output::print_stat("Base", dirs.base_dir().display());
  output::print_stat("Jobs", dirs.jobs_dir().display());
  output::print_stat("Jobs data", dirs.jobs_data_dir().display());
  output::print_stat("Packages", dirs.packages_dir().display());
  output::print_stat("Packages data", dirs.packages_data_dir().display());
  output::print_stat("Blobs", dirs.blobs_dir().display());
  output::print_stat("Tmp", dirs.tmp_dir().display());

  Ok(())
}
