//! Error types for toolchain packaging.
//!
//! Covers manifest rule validation, completeness verification, stamp
//! checks, and I/O failures raised while staging or archiving.

use super::state::PackagingStage;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors arising from packaging a built toolchain.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// A wanted-file rule would escape the toolchain root or is malformed.
    #[error("invalid wanted-file rule \"{rule}\": {reason}")]
    InvalidRule {
        /// The rejected rule after placeholder substitution.
        rule: String,
        /// Description of the violated constraint.
        reason: String,
    },

    /// A package version string does not have the `llvmorg-<major>-…` shape.
    #[error("invalid package version \"{value}\": {reason}")]
    InvalidPackageVersion {
        /// The rejected version string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// One or more literal wanted files are absent from the toolchain root.
    #[error("{} wanted file(s) missing from the toolchain: {}", .missing.len(), .missing.join(", "))]
    ManifestVerification {
        /// Every missing relative path, in manifest order.
        missing: Vec<String>,
    },

    /// The on-disk build stamp disagrees with the expected package version.
    #[error(
        "build stamp at {path} is {} but the expected package version is {expected}",
        .actual.as_deref().map_or_else(|| "missing".to_owned(), |s| format!("\"{s}\""))
    )]
    StampMismatch {
        /// Path of the stamp file that was read.
        path: Utf8PathBuf,
        /// The package version the caller expects.
        expected: String,
        /// The recorded stamp, or `None` when the file was absent.
        actual: Option<String>,
    },

    /// A path under the toolchain root is not valid UTF-8.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(std::path::PathBuf),

    /// Traversing the toolchain root failed.
    #[error("failed to walk the toolchain root during {stage}")]
    Walk {
        /// Stage at which the traversal failed.
        stage: PackagingStage,
        /// The underlying traversal error.
        #[source]
        source: walkdir::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error during {stage}: {source}")]
    Io {
        /// Stage at which the operation failed.
        stage: PackagingStage,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl PackagingError {
    /// Wrap an I/O error with the stage at which it occurred.
    pub(crate) fn io(stage: PackagingStage) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_error_lists_every_missing_path() {
        let err = PackagingError::ManifestVerification {
            missing: vec!["bin/lld".to_owned(), "bin/llvm-ar".to_owned()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 wanted file(s)"));
        assert!(msg.contains("bin/lld"));
        assert!(msg.contains("bin/llvm-ar"));
    }

    #[test]
    fn stamp_mismatch_reports_missing_stamp() {
        let err = PackagingError::StampMismatch {
            path: Utf8PathBuf::from("/tc/cr_build_revision"),
            expected: "llvmorg-19-init-1234-gabcdef12-1".to_owned(),
            actual: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("missing"));
        assert!(msg.contains("llvmorg-19-init-1234-gabcdef12-1"));
    }

    #[test]
    fn io_error_names_the_stage() {
        let err = PackagingError::io(PackagingStage::Archived)(std::io::Error::other("disk full"));
        let msg = err.to_string();
        assert!(msg.contains("archiving"));
        assert!(msg.contains("disk full"));
    }
}
