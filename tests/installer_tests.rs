//! Tests for the install pipeline
//!
//! These tests verify:
//! - Already-installed packages short-circuit without downloads
//! - Probe failures abort before anything is installed
//! - Install groups map to the right pacman invocations
//! - The download directory is removed on every exit path, and only the
//!   directory the installer owns

use archcuda::install_state::InstallStage;
use archcuda::installer::Installer;
use archcuda::manifest::{InstallerVariant, Manifest};
use archcuda::test_support::FakeRunner;
use archcuda::types::PackageGroup;
use archcuda::{CudaInstallError, FetchOutcome, PackageFetcher};
use std::path::Path;

const MANIFEST: &str = r#"{
    "deps": "python python-pip",
    "recent": {
        "support": ["TensorFlow 2.15", "PyTorch 2.1"],
        "gcc": {"version": 12.0, "name": "gcc12-12.0-x86_64.pkg.tar.zst", "link": "https://example/gcc12.pkg"},
        "gcc-libs": {"version": 12.0, "name": "gcc12-libs-12.0-x86_64.pkg.tar.zst", "link": "https://example/gcc12-libs.pkg"},
        "cuda": {"version": 12.2, "name": "cuda-12.2.2-1-x86_64.pkg.tar.zst", "link": "https://example/cuda.pkg"},
        "cudnn": {"version": 8.9, "name": "cudnn-8.9.4.25-1-x86_64.pkg.tar.zst", "link": "https://example/cudnn.pkg"}
    },
    "compatible": {
        "support": ["TensorFlow 2.12"],
        "gcc": {"version": 11.3, "name": "gcc11-11.3.0-5-x86_64.pkg.tar.zst", "link": "https://example/gcc11.pkg"},
        "gcc-libs": {"version": 11.3, "name": "gcc11-libs-11.3.0-5-x86_64.pkg.tar.zst", "link": "https://example/gcc11-libs.pkg"},
        "cuda": {"version": 11.8, "name": "cuda-11.8.0-1-x86_64.pkg.tar.zst", "link": "https://example/cuda11.pkg"},
        "cudnn": {"version": 8.6, "name": "cudnn-8.6.0.163-2-x86_64.pkg.tar.zst", "link": "https://example/cudnn86.pkg"}
    }
}"#;

fn recent() -> InstallerVariant {
    Manifest::from_json(MANIFEST).expect("test manifest should parse").recent
}

/// Runner where every link answers the probe and nothing is installed
fn all_links_ok(variant: &InstallerVariant) -> FakeRunner {
    variant.packages().iter().fold(FakeRunner::new(), |runner, pkg| {
        runner.respond(&format!("curl -I {}", pkg.link), Ok("HTTP/2 200 \r\n"))
    })
}

// =============================================================================
// Manifest Scenario Tests
// =============================================================================

#[test]
fn test_installed_gcc12_short_circuits_without_download() {
    let manifest = Manifest::from_json(MANIFEST).unwrap();
    let runner = FakeRunner::new().respond("pacman -Q gcc12", Ok("gcc12 12.0-1"));

    let outcome = PackageFetcher::new(&runner, Path::new("/tmp/cuda_installer"))
        .fetch(&manifest.recent.gcc)
        .unwrap();

    assert_eq!(outcome, FetchOutcome::AlreadyInstalled);
    assert_eq!(runner.calls(), vec!["pacman -Q gcc12".to_string()]);
}

// =============================================================================
// Full Pipeline Tests
// =============================================================================

#[test]
fn test_install_downloads_and_installs_both_groups() {
    let tmp = tempfile::tempdir().unwrap();
    let work = tmp.path().join("cuda_installer");
    let variant = recent();
    let runner = all_links_ok(&variant);

    let report = Installer::new(&runner, &work).install(&variant).unwrap();

    assert_eq!(
        report.installed_groups,
        vec![PackageGroup::Compiler, PackageGroup::Toolkit]
    );
    assert!(report.skipped_groups.is_empty());
    assert_eq!(report.stages.last(), Some(&InstallStage::ToolkitInstalled));

    let w = work.display();
    assert!(runner.was_run(&format!(
        "sudo pacman -U {w}/gcc12-12.0-x86_64.pkg.tar.zst {w}/gcc12-libs-12.0-x86_64.pkg.tar.zst"
    )));
    assert!(runner.was_run(&format!(
        "sudo pacman -U {w}/cuda-12.2.2-1-x86_64.pkg.tar.zst {w}/cudnn-8.9.4.25-1-x86_64.pkg.tar.zst"
    )));
    assert_eq!(runner.calls_matching("curl --fail -o"), 4);
    assert!(!work.exists(), "work directory must be removed after success");
}

#[test]
fn test_compiler_install_runs_before_toolkit() {
    let tmp = tempfile::tempdir().unwrap();
    let variant = recent();
    let runner = all_links_ok(&variant);

    Installer::new(&runner, tmp.path().join("w")).install(&variant).unwrap();

    let installs: Vec<String> = runner
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("sudo pacman -U"))
        .collect();
    assert_eq!(installs.len(), 2);
    assert!(installs[0].contains("gcc12"));
    assert!(installs[1].contains("cuda"));
}

#[test]
fn test_installed_compiler_group_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let variant = recent();
    // gcc-libs archives share the gcc12 base name, so both count as installed
    let runner = all_links_ok(&variant).respond("pacman -Q gcc12", Ok("gcc12 12.0.1-1\n"));

    let report = Installer::new(&runner, tmp.path().join("w"))
        .install(&variant)
        .unwrap();

    assert_eq!(report.skipped_groups, vec![PackageGroup::Compiler]);
    assert_eq!(report.installed_groups, vec![PackageGroup::Toolkit]);
    assert_eq!(report.already_installed.len(), 2);
    assert_eq!(runner.calls_matching("sudo pacman -U"), 1);
    assert_eq!(runner.calls_matching("curl --fail -o"), 2);
}

// =============================================================================
// Failure Path Tests
// =============================================================================

#[test]
fn test_probe_failure_aborts_before_install_and_cleans_up() {
    let tmp = tempfile::tempdir().unwrap();
    let work = tmp.path().join("w");
    let variant = recent();
    let runner = all_links_ok(&variant).respond("curl -I https://example/cuda.pkg", Ok("HTTP/2 404 \r\n"));

    let err = Installer::new(&runner, &work).install(&variant).unwrap_err();

    assert!(err.to_string().starts_with("no output from curl"));
    assert_eq!(runner.calls_matching("sudo pacman -U"), 0);
    // the other three downloads still ran to completion
    assert_eq!(runner.calls_matching("curl --fail -o"), 3);
    assert!(!work.exists(), "work directory must be removed after failure");
}

#[test]
fn test_compiler_install_failure_stops_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let work = tmp.path().join("w");
    let variant = recent();
    let runner = all_links_ok(&variant).fail_run("sudo pacman -U");

    let err = Installer::new(&runner, &work).install(&variant).unwrap_err();

    match err {
        CudaInstallError::Install { group, .. } => assert_eq!(group, "compiler"),
        other => panic!("expected install error, got {other:?}"),
    }
    assert_eq!(runner.calls_matching("sudo pacman -U"), 1, "toolkit must not be attempted");
    assert!(!work.exists());
}

#[test]
fn test_download_failure_propagates() {
    let tmp = tempfile::tempdir().unwrap();
    let variant = recent();
    let runner = all_links_ok(&variant).fail_run("curl --fail -o");

    let err = Installer::new(&runner, tmp.path().join("w"))
        .install(&variant)
        .unwrap_err();

    assert!(matches!(err, CudaInstallError::Command { .. }));
    assert_eq!(runner.calls_matching("sudo pacman -U"), 0);
}

// =============================================================================
// Work Directory Ownership Tests
// =============================================================================

#[test]
fn test_existing_user_dir_keeps_its_files() {
    let tmp = tempfile::tempdir().unwrap();
    let downloads = tmp.path().join("Downloads");
    std::fs::create_dir_all(downloads.join("projects")).unwrap();
    std::fs::write(downloads.join("projects/thesis.tex"), b"draft").unwrap();
    let variant = recent();
    let runner = all_links_ok(&variant);

    Installer::new(&runner, &downloads).install(&variant).unwrap();

    assert!(downloads.join("projects/thesis.tex").exists());
    let entries: Vec<_> = std::fs::read_dir(&downloads)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("projects")]);

    // archives went to a scratch child, not next to the operator's files
    let child_prefix = format!("curl --fail -o {}/archcuda-", downloads.display());
    assert_eq!(runner.calls_matching(&child_prefix), 4);
}

#[test]
fn test_existing_user_dir_survives_failed_install() {
    let tmp = tempfile::tempdir().unwrap();
    let downloads = tmp.path().join("Downloads");
    std::fs::create_dir_all(&downloads).unwrap();
    std::fs::write(downloads.join("notes.txt"), b"keep").unwrap();
    let variant = recent();
    let runner = all_links_ok(&variant).fail_run("sudo pacman -U");

    assert!(Installer::new(&runner, &downloads).install(&variant).is_err());

    assert!(downloads.join("notes.txt").exists());
    assert_eq!(std::fs::read_dir(&downloads).unwrap().count(), 1);
}
