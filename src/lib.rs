//! archcuda Library
//!
//! Core of the CUDA toolchain installer for Arch Linux: manifest loading,
//! package fetching and the install pipeline.

pub mod cli;
pub mod command_runner;
pub mod error;
pub mod fetcher;
pub mod install_state;
pub mod installer;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod process_guard;
pub mod sanity;
pub mod selector;
#[cfg(any(test, feature = "__test_support"))]
pub mod test_support;
pub mod types;
pub mod verify;
pub mod workdir;

// Re-export main types for convenience
pub use command_runner::{CommandRunner, SystemRunner};
pub use error::{CudaInstallError, Result};
pub use fetcher::{FetchOutcome, PackageFetcher};
pub use install_state::{InstallProgress, InstallStage, InstallTransitionError};
pub use installer::{InstallReport, Installer, update_dependencies};
pub use manifest::{InstallerVariant, Manifest, PackageDescriptor};
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use types::{PackageGroup, Variant};
pub use workdir::TempWorkDir;
