//! Type-safe selection types for archcuda
//!
//! The installer only ever chooses between two package sets and installs them
//! in two groups, so both choices are modeled as enums instead of indices.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Which package set from the manifest to install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Newest toolkit the manifest knows about
    #[default]
    Recent,
    /// Older toolkit supported by more framework releases
    Compatible,
}

impl Variant {
    /// Position of this variant in the interactive prompt
    pub const fn index(self) -> usize {
        match self {
            Self::Recent => 0,
            Self::Compatible => 1,
        }
    }

    /// Map a prompt index back to a variant
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Recent),
            1 => Some(Self::Compatible),
            _ => None,
        }
    }

    /// Capitalized label used in prompts and summaries
    pub const fn label(self) -> &'static str {
        match self {
            Self::Recent => "Recent",
            Self::Compatible => "Compatible",
        }
    }
}

/// Packages that are handed to a single `pacman -U` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum PackageGroup {
    /// `gcc` and `gcc-libs`
    Compiler,
    /// `cuda` and `cudnn`
    Toolkit,
}
