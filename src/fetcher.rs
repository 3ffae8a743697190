//! Per-package fetch: skip what is installed, probe, download.

use crate::command_runner::CommandRunner;
use crate::error::{CudaInstallError, Result};
use crate::manifest::PackageDescriptor;
use crate::verify::{HTTP_OK_MARKER, contains_marker};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What `fetch` did for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// `pacman -Q` already reports the wanted version; nothing downloaded
    AlreadyInstalled,
    /// Archive downloaded to this path
    Downloaded(PathBuf),
}

impl FetchOutcome {
    /// Path to hand to `pacman -U`, if anything was downloaded
    pub fn archive(&self) -> Option<&Path> {
        match self {
            Self::AlreadyInstalled => None,
            Self::Downloaded(path) => Some(path.as_path()),
        }
    }
}

/// Fetches package archives into a download directory
pub struct PackageFetcher<'a, R: CommandRunner> {
    runner: &'a R,
    download_dir: &'a Path,
}

impl<'a, R: CommandRunner> PackageFetcher<'a, R> {
    pub fn new(runner: &'a R, download_dir: &'a Path) -> Self {
        Self {
            runner,
            download_dir,
        }
    }

    /// Make `pkg` available for installation.
    ///
    /// Returns `AlreadyInstalled` without touching the network when pacman
    /// reports the wanted version. Otherwise the link must answer a HEAD
    /// probe with `HTTP/2 200` before the archive is downloaded.
    pub fn fetch(&self, pkg: &PackageDescriptor) -> Result<FetchOutcome> {
        if self.is_installed(pkg) {
            info!("{} already installed", pkg.installed_marker());
            return Ok(FetchOutcome::AlreadyInstalled);
        }

        self.probe(pkg)?;

        let target = self.download_dir.join(&pkg.name);
        let target_str = target.to_string_lossy();
        info!("Downloading {}...", pkg.name);
        self.runner
            .run("curl", &["--fail", "-o", &target_str, &pkg.link])?;

        Ok(FetchOutcome::Downloaded(target))
    }

    /// A failing query means pacman has no record of the package, which is
    /// the normal case on a fresh system
    fn is_installed(&self, pkg: &PackageDescriptor) -> bool {
        let base_name = pkg.base_name();
        info!("Checking if {} is installed...", base_name);

        match self.runner.query("pacman", &["-Q", base_name]) {
            Ok(output) => contains_marker(&output, &pkg.installed_marker()),
            Err(e) => {
                debug!("{} not installed: {}", base_name, e);
                false
            }
        }
    }

    fn probe(&self, pkg: &PackageDescriptor) -> Result<()> {
        let headers = self
            .runner
            .query("curl", &["-I", &pkg.link])
            .map_err(|e| {
                debug!("Probe of {} failed: {}", pkg.link, e);
                CudaInstallError::probe(&pkg.link, HTTP_OK_MARKER)
            })?;

        if contains_marker(&headers, HTTP_OK_MARKER) {
            Ok(())
        } else {
            Err(CudaInstallError::probe(&pkg.link, HTTP_OK_MARKER))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeRunner;

    fn gcc12() -> PackageDescriptor {
        PackageDescriptor {
            version: 12.0,
            name: "gcc12-12.0-x86_64.pkg.tar.zst".to_string(),
            link: "https://example/gcc12.pkg".to_string(),
        }
    }

    #[test]
    fn test_installed_package_short_circuits() {
        let runner = FakeRunner::new().respond("pacman -Q gcc12", Ok("gcc12 12.0-1\n"));
        let dir = Path::new("/tmp/cuda_installer");

        let outcome = PackageFetcher::new(&runner, dir).fetch(&gcc12()).unwrap();

        assert_eq!(outcome, FetchOutcome::AlreadyInstalled);
        assert_eq!(runner.calls_matching("curl"), 0, "no probe or download expected");
    }

    #[test]
    fn test_other_version_installed_downloads() {
        let runner = FakeRunner::new()
            .respond("pacman -Q gcc12", Ok("gcc12 11.3.0-1\n"))
            .respond("curl -I https://example/gcc12.pkg", Ok("HTTP/2 200 \r\n"));
        let dir = Path::new("/tmp/cuda_installer");

        let outcome = PackageFetcher::new(&runner, dir).fetch(&gcc12()).unwrap();

        assert_eq!(
            outcome,
            FetchOutcome::Downloaded(dir.join("gcc12-12.0-x86_64.pkg.tar.zst"))
        );
        assert!(runner.was_run(
            "curl --fail -o /tmp/cuda_installer/gcc12-12.0-x86_64.pkg.tar.zst https://example/gcc12.pkg"
        ));
    }

    #[test]
    fn test_query_failure_means_not_installed() {
        let runner = FakeRunner::new()
            .respond("pacman -Q gcc12", Err("error: package 'gcc12' was not found"))
            .respond("curl -I https://example/gcc12.pkg", Ok("HTTP/2 200 \r\n"));

        let outcome = PackageFetcher::new(&runner, Path::new("/w")).fetch(&gcc12()).unwrap();
        assert!(matches!(outcome, FetchOutcome::Downloaded(_)));
    }

    #[test]
    fn test_probe_without_http_200_fails() {
        let runner = FakeRunner::new()
            .respond("curl -I https://example/gcc12.pkg", Ok("HTTP/2 404 \r\n"));

        let err = PackageFetcher::new(&runner, Path::new("/w"))
            .fetch(&gcc12())
            .unwrap_err();

        assert!(err.to_string().starts_with("no output from curl"));
        assert_eq!(runner.calls_matching("curl --fail"), 0, "must not download");
    }

    #[test]
    fn test_probe_command_failure_is_probe_error() {
        let runner = FakeRunner::new()
            .respond("curl -I https://example/gcc12.pkg", Err("Could not resolve host"));

        let err = PackageFetcher::new(&runner, Path::new("/w"))
            .fetch(&gcc12())
            .unwrap_err();
        assert!(matches!(err, CudaInstallError::Probe { .. }));
    }

    #[test]
    fn test_download_failure_propagates() {
        let runner = FakeRunner::new()
            .respond("curl -I https://example/gcc12.pkg", Ok("HTTP/2 200 \r\n"))
            .fail_run("curl --fail");

        let err = PackageFetcher::new(&runner, Path::new("/w"))
            .fetch(&gcc12())
            .unwrap_err();
        assert!(matches!(err, CudaInstallError::Command { .. }));
    }

    #[test]
    fn test_outcome_archive() {
        assert_eq!(FetchOutcome::AlreadyInstalled.archive(), None);
        let outcome = FetchOutcome::Downloaded(PathBuf::from("/w/cuda.pkg"));
        assert_eq!(outcome.archive(), Some(Path::new("/w/cuda.pkg")));
    }
}
