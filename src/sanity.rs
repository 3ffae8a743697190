//! Pre-flight sanity checks for the runtime environment
//!
//! Verifies that every program the installer shells out to is on PATH before
//! anything touches the system. A missing `curl` discovered halfway through
//! would leave pacman's sync done but nothing installed.

use crate::process_guard::CommandProcessGroup;
use std::process::Command;

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty()
    }
}

/// Programs the install pipeline invokes
const REQUIRED_BINARIES: &[&str] = &[
    "bash",   // Dependency update command line
    "sudo",   // pacman -Syu / -U
    "pacman", // Package queries and installs
    "curl",   // HEAD probe and download
];

/// Check if a binary is available in PATH
fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .in_new_process_group()
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Perform all sanity checks and return the result
pub fn verify_environment() -> SanityCheckResult {
    verify_binaries(REQUIRED_BINARIES)
}

fn verify_binaries(binaries: &[&str]) -> SanityCheckResult {
    let missing_binaries = binaries
        .iter()
        .filter(|binary| !binary_exists(binary))
        .map(|binary| (*binary).to_string())
        .collect();

    SanityCheckResult { missing_binaries }
}

/// Human-readable explanation of a failed check
pub fn describe_failure(result: &SanityCheckResult) -> String {
    format!(
        "Missing required programs: {}",
        result.missing_binaries.join(", ")
    )
}

/// Verify the environment, logging the outcome
pub fn run_preflight_checks() -> SanityCheckResult {
    tracing::debug!("Running pre-flight sanity checks...");

    let result = verify_environment();
    if result.is_ok() {
        tracing::info!("Pre-flight checks passed");
    } else {
        tracing::error!("Pre-flight checks failed: missing {:?}", result.missing_binaries);
    }
    result
}
