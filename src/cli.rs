use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::Variant;
use crate::workdir::DEFAULT_WORK_DIR;

/// archcuda - install a matching CUDA, cuDNN and GCC set on Arch Linux
#[derive(Parser, Debug)]
#[command(name = "archcuda")]
#[command(about = "Installs a matching CUDA, cuDNN and GCC package set on Arch Linux")]
#[command(version)]
pub struct Cli {
    /// Package set to install (skips the interactive prompt)
    #[arg(long, value_name = "recent|compatible")]
    pub variant: Option<Variant>,

    /// Read the package manifest from this file instead of the built-in one
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Directory archives are downloaded to. Removed afterwards when the
    /// installer created it; an existing directory only gets a scratch child.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,

    /// Skip `pacman -Syu` of the shared dependencies
    #[arg(long)]
    pub skip_deps: bool,

    /// Install without asking for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Dry-run mode: print pacman and curl commands instead of running them.
    ///
    /// Installed-package queries and link probes still run so the preview
    /// shows what would actually be downloaded.
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print both package sets and exit
    Show,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
