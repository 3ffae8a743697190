//! Error handling module for archcuda
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every stage of the install pipeline reports failures through these types so
//! `main` can log them and exit with a single, consistent code.

use thiserror::Error;

/// Main error type for archcuda
#[derive(Error, Debug)]
pub enum CudaInstallError {
    /// IO errors (work directory, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The package manifest could not be parsed
    #[error("Failed to parse package manifest: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The package manifest parsed but holds unusable values
    #[error("Configuration error: {0}")]
    Config(String),

    /// `pacman -Syu` for the shared dependencies failed
    #[error("Dependency update failed: {0}")]
    DependencyUpdate(String),

    /// HEAD probe did not confirm the download link
    #[error("no output from curl: {link} did not report {expected}")]
    Probe { link: String, expected: String },

    /// An external command could not be spawned or exited non-zero
    #[error("Command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    /// `pacman -U` for one of the install groups failed
    #[error("Installation of {group} failed: {reason}")]
    Install { group: String, reason: String },

    /// The operator did not pick a valid variant in time
    #[error("Too many invalid choices ({tries} attempts)")]
    TooManyTries { tries: usize },

    /// Install stage machine transition errors
    #[error("Install transition error: {0}")]
    Transition(String),
}

/// Result type alias for archcuda operations
pub type Result<T> = std::result::Result<T, CudaInstallError>;

// Convenient error constructors
impl CudaInstallError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a dependency update error
    pub fn dependency_update(msg: impl Into<String>) -> Self {
        Self::DependencyUpdate(msg.into())
    }

    /// Create a probe error for a link that did not answer as expected
    pub fn probe(link: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::Probe {
            link: link.into(),
            expected: expected.into(),
        }
    }

    /// Create a command error
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create an install error for a package group
    pub fn install(group: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Install {
            group: group.into(),
            reason: reason.into(),
        }
    }
}
