//! External process execution

use std::process::Command;

use tracing::debug;

use crate::{Error, Result};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, capturing output. A non-zero exit
    /// status is an error carrying the command's stderr.
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs commands on the host with `std::process`.
#[derive(Debug, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!(command = program, ?args, "running command");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| Error::CommandSpawn {
                command: program.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: format!("{} {}", program, args.join(" ")),
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}
