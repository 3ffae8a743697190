//! Install State Machine
//!
//! Tracks how far an install attempt got. Transitions are validated so the
//! installer cannot record a stage it never reached.
//!
//! # Stage Flow
//!
//! ```text
//! Created
//!     ↓
//! DirReady
//!     ↓
//! Downloaded
//!     ↓
//! CompilerInstalled
//!     ↓
//! ToolkitInstalled
//!
//! (Any non-terminal stage can transition to Failed)
//! ```

use std::fmt;
use thiserror::Error;

/// Install stages in sequential order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstallStage {
    /// Installer constructed, nothing done yet
    Created = 0,
    /// Download directory exists
    DirReady = 1,
    /// All four packages fetched (downloaded or already installed)
    Downloaded = 2,
    /// `gcc` and `gcc-libs` installed
    CompilerInstalled = 3,
    /// `cuda` and `cudnn` installed (terminal success)
    ToolkitInstalled = 4,
    /// Install failed (terminal)
    Failed = 255,
}

impl InstallStage {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Returns true for `ToolkitInstalled` and `Failed`
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ToolkitInstalled | Self::Failed)
    }

    /// Returns the next stage, or None at a terminal stage
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::DirReady),
            Self::DirReady => Some(Self::Downloaded),
            Self::Downloaded => Some(Self::CompilerInstalled),
            Self::CompilerInstalled => Some(Self::ToolkitInstalled),
            Self::ToolkitInstalled | Self::Failed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Created => "Not started",
            Self::DirReady => "Download directory ready",
            Self::Downloaded => "Packages downloaded",
            Self::CompilerInstalled => "Compiler installed",
            Self::ToolkitInstalled => "Toolkit installed",
            Self::Failed => "Installation failed",
        }
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during stage transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallTransitionError {
    #[error("Cannot skip from {from} to {to}")]
    SkippedStage { from: InstallStage, to: InstallStage },

    #[error("Cannot go backwards from {from} to {to}")]
    BackwardTransition { from: InstallStage, to: InstallStage },

    #[error("Cannot transition from terminal stage {from}")]
    FromTerminalState { from: InstallStage },

    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: InstallStage },
}

/// Current stage of one install attempt
#[derive(Debug, Clone)]
pub struct InstallProgress {
    current: InstallStage,
    failed_at: Option<InstallStage>,
    history: Vec<InstallStage>,
}

impl Default for InstallProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallProgress {
    pub fn new() -> Self {
        Self {
            current: InstallStage::Created,
            failed_at: None,
            history: vec![InstallStage::Created],
        }
    }

    #[inline]
    pub fn current_stage(&self) -> InstallStage {
        self.current
    }

    /// Stage that was active when `fail` was called
    #[inline]
    pub fn failed_at(&self) -> Option<InstallStage> {
        self.failed_at
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current == InstallStage::ToolkitInstalled
    }

    /// Every stage entered so far, oldest first
    pub fn history(&self) -> &[InstallStage] {
        &self.history
    }

    /// Move to `target`, which must be the immediate next stage.
    pub fn transition_to(
        &mut self,
        target: InstallStage,
    ) -> Result<InstallStage, InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }
        if target == self.current {
            return Err(InstallTransitionError::AlreadyAtStage { stage: target });
        }
        if target != InstallStage::Failed && target.order() < self.current.order() {
            return Err(InstallTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }
        if self.current.next() != Some(target) {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        tracing::debug!("Install stage: {} -> {}", self.current, target);
        self.current = target;
        self.history.push(target);
        Ok(target)
    }

    /// Mark the attempt as failed at the current stage.
    pub fn fail(&mut self) -> Result<(), InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }

        tracing::debug!("Install failed at stage: {}", self.current);
        self.failed_at = Some(self.current);
        self.current = InstallStage::Failed;
        self.history.push(InstallStage::Failed);
        Ok(())
    }
}

impl From<InstallTransitionError> for crate::error::CudaInstallError {
    fn from(err: InstallTransitionError) -> Self {
        crate::error::CudaInstallError::Transition(err.to_string())
    }
}
