//! Temporary download directory.
//!
//! Package archives are downloaded into a scratch directory that must be gone
//! once the install attempt is over, whether it succeeded or not.
//! [`TempWorkDir`] owns that directory and removes it on drop; it is also
//! registered with the process guard so an interrupt removes it too.
//!
//! Only directories the installer created, or the fixed default location, are
//! ever removed. An existing directory given on the command line gets a
//! unique `archcuda-*` child instead, and only that child is removed.

use crate::error::Result;
use crate::process_guard::ChildRegistry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default location for downloaded archives
pub const DEFAULT_WORK_DIR: &str = "/tmp/cuda_installer";

/// Prefix of the scratch child created inside an existing directory
const CHILD_PREFIX: &str = "archcuda-";

/// Create `dir` and every missing ancestor. Succeeds if it already exists.
pub fn mkdir_p(dir: &Path) -> io::Result<()> {
    info!("Creating {}...", dir.display());
    fs::create_dir_all(dir)
}

/// Remove `path` and everything beneath it.
///
/// Fails with `NotFound` if `path` does not exist.
pub fn rmdir_rf(path: &Path) -> io::Result<()> {
    info!("Removing {}...", path.display());

    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Scratch directory removed when dropped
#[derive(Debug)]
pub struct TempWorkDir {
    path: PathBuf,
}

impl TempWorkDir {
    /// Pick the scratch directory for `requested`.
    ///
    /// The default location and paths that do not exist yet are used as is.
    /// Any other existing path belongs to the operator, so a fresh child is
    /// created inside it.
    pub fn acquire(requested: impl Into<PathBuf>) -> Result<Self> {
        let requested = requested.into();
        if requested == Path::new(DEFAULT_WORK_DIR) || !requested.exists() {
            Self::create(requested)
        } else {
            Self::create_in(&requested)
        }
    }

    /// Create the directory (idempotent) and take ownership of its removal
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        mkdir_p(&path)?;
        Ok(Self::owned(path))
    }

    /// Create a uniquely named child of `parent` and own only that child
    pub fn create_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(CHILD_PREFIX)
            .tempdir_in(parent)?;
        let path = dir.keep();
        info!("Using {} inside existing {}", path.display(), parent.display());
        Ok(Self::owned(path))
    }

    fn owned(path: PathBuf) -> Self {
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register_dir(&path);
        }
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a downloaded archive named `file_name` is stored
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }
}

impl Drop for TempWorkDir {
    fn drop(&mut self) {
        match rmdir_rf(&self.path) {
            Ok(()) => debug!("Removed work directory {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove {}: {} (remove it manually)",
                self.path.display(),
                e
            ),
        }

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister_dir(&self.path);
        }
    }
}
