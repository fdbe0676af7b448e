//! steward: control-plane agent for a managed VM
//!
//! Provides the `steward` command with subcommands:
//! - `steward apply <spec.json>` - reconcile jobs and packages against
//!   a desired specification
//! - `steward networks <settings.json>` - plan interface configurations
//! - `steward info` - show the resolved directory layout

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod cmd;
mod output;

#[derive(Parser)]
#[command(name = "steward")]
#[command(author, version, about = "Reconciles a VM against its desired specification")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a desired job specification
    Apply {
        /// Path to the desired apply spec (JSON)
        spec: PathBuf,

        /// Base directory for agent state (default: STEWARD_BASE_DIR
        /// or /var/vcap)
        #[arg(long)]
        base: Option<PathBuf>,

        /// Fetch blobs from this HTTP endpoint instead of the local
        /// blobs directory
        #[arg(long)]
        blobstore_url: Option<String>,
    },

    /// Plan network interface configurations
    Networks {
        /// Path to the network settings (JSON, name to network)
        settings: PathBuf,

        /// JSON file mapping MAC addresses to device names; defaults
        /// to enumerating /sys/class/net
        #[arg(long)]
        nics: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: output::OutputFormat,
    },

    /// Show the resolved directory layout
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Apply {
            spec,
            base,
            blobstore_url,
        } => cmd::apply::cmd_apply(&spec, base.as_deref(), blobstore_url.as_deref()),
        Commands::Networks {
            settings,
            nics,
            format,
        } => cmd::networks::cmd_networks(&settings, nics.as_deref(), format),
        Commands::Info => cmd::info::cmd_info(),
    }
}
