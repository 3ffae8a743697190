//! Package manifest loading.
//!
//! The manifest describes the shared dependencies plus two alternative package
//! sets. It is embedded into the binary at build time and can be replaced with
//! a file on disk for testing or for newer package builds.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{CudaInstallError, Result};
use crate::types::{PackageGroup, Variant};

/// Manifest bundled with the binary
const EMBEDDED_MANIFEST: &str = include_str!("../data/packages.json");

/// One installable package archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Version the installed-package query must report (major.minor)
    pub version: f32,
    /// Archive file name, also used as the download target
    pub name: String,
    /// HTTP(S) download URL
    pub link: String,
}

impl PackageDescriptor {
    /// Name pacman reports for the installed package.
    ///
    /// Archive names carry version suffixes (`gcc12-12.3.0-6-x86_64...`), so
    /// everything from the first hyphen on is dropped.
    pub fn base_name(&self) -> &str {
        self.name.split('-').next().unwrap_or(&self.name)
    }

    /// Substring `pacman -Q` output must contain for the package to count as installed
    pub fn installed_marker(&self) -> String {
        format!("{} {:.1}", self.base_name(), self.version)
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CudaInstallError::config(format!("{field} has an empty name")));
        }
        if self.name.contains('/') || matches!(self.name.as_str(), "." | "..") {
            return Err(CudaInstallError::config(format!(
                "{field} name must be a file name, got {}",
                self.name
            )));
        }
        if !(self.link.starts_with("https://") || self.link.starts_with("http://")) {
            return Err(CudaInstallError::config(format!(
                "{field} link must be an http(s) URL, got {:?}",
                self.link
            )));
        }
        if !self.version.is_finite() || self.version <= 0.0 {
            return Err(CudaInstallError::config(format!(
                "{field} has an invalid version {}",
                self.version
            )));
        }
        Ok(())
    }
}

/// A complete package set: the compiler the toolkit was built against plus the toolkit itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallerVariant {
    /// Framework releases this set is known to work with
    pub support: Vec<String>,
    pub gcc: PackageDescriptor,
    #[serde(rename = "gcc-libs")]
    pub gcc_libs: PackageDescriptor,
    pub cuda: PackageDescriptor,
    pub cudnn: PackageDescriptor,
}

impl InstallerVariant {
    /// All four packages in download order
    pub fn packages(&self) -> [&PackageDescriptor; 4] {
        [&self.gcc, &self.gcc_libs, &self.cuda, &self.cudnn]
    }

    /// Packages installed together in one pacman invocation
    pub fn group(&self, group: PackageGroup) -> [&PackageDescriptor; 2] {
        match group {
            PackageGroup::Compiler => [&self.gcc, &self.gcc_libs],
            PackageGroup::Toolkit => [&self.cuda, &self.cudnn],
        }
    }

    /// Base names suitable for pacman's `IgnorePkg`
    pub fn ignore_list(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(4);
        for pkg in self.packages() {
            // base_name() folds gcc-libs into the compiler; pacman needs the full name
            let name = package_name(&pkg.name);
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    fn validate(&self, variant: Variant) -> Result<()> {
        self.gcc.validate(&format!("{variant}.gcc"))?;
        self.gcc_libs.validate(&format!("{variant}.gcc-libs"))?;
        self.cuda.validate(&format!("{variant}.cuda"))?;
        self.cudnn.validate(&format!("{variant}.cudnn"))?;

        let names = self.packages().map(|p| p.name.as_str());
        for (i, name) in names.iter().enumerate() {
            if names[i + 1..].contains(name) {
                return Err(CudaInstallError::config(format!(
                    "{variant} lists {name} more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Strip `-<version>-<arch>.pkg.tar.*` from an archive name
fn package_name(archive: &str) -> &str {
    archive
        .char_indices()
        .find(|&(i, c)| {
            c == '-'
                && archive[i + 1..]
                    .chars()
                    .next()
                    .is_some_and(|next| next.is_ascii_digit())
        })
        .map(|(i, _)| &archive[..i])
        .unwrap_or(archive)
}

/// Everything the installer needs to know, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Space-separated packages passed to `pacman -Syu`
    pub deps: String,
    pub recent: InstallerVariant,
    pub compatible: InstallerVariant,
}

impl Manifest {
    /// Parse and validate the manifest compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_MANIFEST)
    }

    /// Parse and validate a manifest from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read manifest from {:?}", path.as_ref()))?;

        Self::from_json(&content)
            .with_context(|| format!("Invalid manifest in {:?}", path.as_ref()))
    }

    /// Look up the package set for a variant
    pub fn variant(&self, variant: Variant) -> &InstallerVariant {
        match variant {
            Variant::Recent => &self.recent,
            Variant::Compatible => &self.compatible,
        }
    }

    /// Validate the manifest
    pub fn validate(&self) -> Result<()> {
        if self.deps.trim().is_empty() {
            return Err(CudaInstallError::config("deps must name at least one package"));
        }
        // deps is handed to a shell, keep it to plain package names
        if let Some(bad) = self
            .deps
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '+')))
        {
            return Err(CudaInstallError::config(format!(
                "deps contains invalid character {bad:?}"
            )));
        }

        self.recent.validate(Variant::Recent)?;
        self.compatible.validate(Variant::Compatible)?;
        Ok(())
    }
}
