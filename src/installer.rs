//! Installer module
//!
//! Sequences one install attempt: download directory, parallel fetch of the
//! four packages, then one `pacman -U` per package group. The download
//! directory is removed on every exit path.

use crate::command_runner::CommandRunner;
use crate::error::{CudaInstallError, Result};
use crate::fetcher::{FetchOutcome, PackageFetcher};
use crate::install_state::{InstallProgress, InstallStage};
use crate::manifest::{InstallerVariant, Manifest, PackageDescriptor};
use crate::orchestrator;
use crate::types::PackageGroup;
use crate::workdir::TempWorkDir;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{error, info};

/// Update the system and install the shared dependencies.
///
/// Runs through a shell so the operator can answer pacman's prompts.
pub fn update_dependencies<R: CommandRunner>(runner: &R, manifest: &Manifest) -> Result<()> {
    println!("Updating system dependencies...");

    let command_line = format!("sudo pacman -Syu {}", manifest.deps.trim());
    runner
        .run_shell(&command_line)
        .map_err(|e| CudaInstallError::dependency_update(e.to_string()))?;

    info!("Dependencies up to date: {}", manifest.deps.trim());
    Ok(())
}

/// What an install attempt did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Groups handed to `pacman -U`
    pub installed_groups: Vec<PackageGroup>,
    /// Groups whose packages were all installed already
    pub skipped_groups: Vec<PackageGroup>,
    /// Archive names that did not need downloading
    pub already_installed: Vec<String>,
    /// Stages entered, oldest first
    pub stages: Vec<InstallStage>,
}

/// Installs one package set
pub struct Installer<'a, R: CommandRunner> {
    runner: &'a R,
    work_dir: PathBuf,
}

impl<'a, R: CommandRunner> Installer<'a, R> {
    pub fn new(runner: &'a R, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Download and install every package of `variant`.
    pub fn install(&self, variant: &InstallerVariant) -> Result<InstallReport> {
        println!("Installing ...");
        let mut progress = InstallProgress::new();

        match self.run_stages(variant, &mut progress) {
            Ok(mut report) => {
                report.stages = progress.history().to_vec();
                Ok(report)
            }
            Err(e) => {
                error!("Install aborted after stage \"{}\": {}", progress.current_stage(), e);
                // fail() only errors on a terminal stage, which run_stages never leaves us in
                let _ = progress.fail();
                Err(e)
            }
        }
    }

    fn run_stages(
        &self,
        variant: &InstallerVariant,
        progress: &mut InstallProgress,
    ) -> Result<InstallReport> {
        // Dropped on every return below, removing the directory
        let work = TempWorkDir::acquire(&self.work_dir)?;
        progress.transition_to(InstallStage::DirReady)?;

        let packages = variant.packages();
        let fetcher = PackageFetcher::new(self.runner, work.path());
        let outcomes = orchestrator::fetch_all(&packages, |pkg| fetcher.fetch(pkg))?;
        progress.transition_to(InstallStage::Downloaded)?;

        let fetched: Vec<(&PackageDescriptor, FetchOutcome)> =
            packages.into_iter().zip(outcomes).collect();

        let mut report = InstallReport {
            already_installed: fetched
                .iter()
                .filter(|(_, outcome)| *outcome == FetchOutcome::AlreadyInstalled)
                .map(|(pkg, _)| pkg.name.clone())
                .collect(),
            ..InstallReport::default()
        };

        for group in PackageGroup::iter() {
            let members = variant.group(group);
            let archives: Vec<&Path> = fetched
                .iter()
                .filter(|(pkg, _)| members.iter().any(|m| std::ptr::eq(*m, *pkg)))
                .filter_map(|(_, outcome)| outcome.archive())
                .collect();

            if self.install_group(group, &archives)? {
                report.installed_groups.push(group);
            } else {
                report.skipped_groups.push(group);
            }

            progress.transition_to(match group {
                PackageGroup::Compiler => InstallStage::CompilerInstalled,
                PackageGroup::Toolkit => InstallStage::ToolkitInstalled,
            })?;
        }

        Ok(report)
    }

    /// Returns false when there was nothing to install
    fn install_group(&self, group: PackageGroup, archives: &[&Path]) -> Result<bool> {
        if archives.is_empty() {
            info!("All {} packages already installed, skipping pacman -U", group);
            return Ok(false);
        }

        let paths: Vec<String> = archives
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let mut args: Vec<&str> = vec!["pacman", "-U"];
        args.extend(paths.iter().map(String::as_str));

        self.runner
            .run("sudo", &args)
            .map_err(|e| CudaInstallError::install(group.to_string(), e.to_string()))?;

        info!("Installed {} packages: {}", group, paths.join(" "));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeRunner;

    #[test]
    fn test_update_dependencies_command_line() {
        let manifest = Manifest::embedded().unwrap();
        let runner = FakeRunner::new();

        update_dependencies(&runner, &manifest).unwrap();

        assert_eq!(
            runner.calls(),
            vec![format!("sudo pacman -Syu {}", manifest.deps)]
        );
    }

    #[test]
    fn test_update_dependencies_failure() {
        let manifest = Manifest::embedded().unwrap();
        let runner = FakeRunner::new().fail_run("sudo pacman -Syu");

        let err = update_dependencies(&runner, &manifest).unwrap_err();
        assert!(matches!(err, CudaInstallError::DependencyUpdate(_)));
    }

    #[test]
    fn test_install_group_skips_empty() {
        let runner = FakeRunner::new();
        let installer = Installer::new(&runner, "/unused");

        assert!(!installer.install_group(PackageGroup::Toolkit, &[]).unwrap());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_install_group_passes_all_archives() {
        let runner = FakeRunner::new();
        let installer = Installer::new(&runner, "/unused");
        let archives = [Path::new("/w/cuda.pkg"), Path::new("/w/cudnn.pkg")];

        assert!(installer.install_group(PackageGroup::Toolkit, &archives).unwrap());
        assert!(runner.was_run("sudo pacman -U /w/cuda.pkg /w/cudnn.pkg"));
    }
}
