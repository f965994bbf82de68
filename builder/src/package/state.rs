//! Packaging run stages.
//!
//! A run moves `Idle → ManifestBuilt → Verified → Staged → Archived → Done`.
//! Any error ends the run; errors carry the stage that was being entered.

use std::fmt;

/// A stage of a packaging run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PackagingStage {
    /// Nothing has been done yet; the stamp check runs here.
    Idle,
    /// The wanted-file manifest has been built.
    ManifestBuilt,
    /// Every literal rule exists under the toolchain root.
    Verified,
    /// Wanted files are copied, stripped, and aliased in the staging tree.
    Staged,
    /// The archive has been written and closed.
    Archived,
    /// The staging tree has been removed.
    Done,
}

impl PackagingStage {
    /// Return the stage that follows this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::ManifestBuilt),
            Self::ManifestBuilt => Some(Self::Verified),
            Self::Verified => Some(Self::Staged),
            Self::Staged => Some(Self::Archived),
            Self::Archived => Some(Self::Done),
            Self::Done => None,
        }
    }
}

impl fmt::Display for PackagingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "stamp check",
            Self::ManifestBuilt => "manifest construction",
            Self::Verified => "verification",
            Self::Staged => "staging",
            Self::Archived => "archiving",
            Self::Done => "cleanup",
        };
        f.write_str(label)
    }
}
