//! Error types for the chromium toolchain builder.
//!
//! Every variant is fatal: the binary prints the message and exits with
//! status 1. Packaging failures keep their own [`PackagingError`] type and
//! convert into [`ToolchainError::Packaging`].

use crate::package::PackagingError;
use camino::{Utf8Path, Utf8PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can occur while syncing, building, or packaging the toolchain.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// The dependency manifest could not be read or carries no clang pin.
    #[error("failed to parse dependency manifest {path}: {reason}")]
    ManifestParse {
        /// Path of the manifest, or `<text>` when parsing in-memory input.
        path: Utf8PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// No installation directory exists at any known location.
    #[error("no clang installation found; searched: {}", format_paths(.searched))]
    ToolchainNotFound {
        /// Candidate directories in search order.
        searched: Vec<Utf8PathBuf>,
    },

    /// A mandatory executable is absent from the located installation.
    #[error("required executable {tool} not found at {path}")]
    MissingExecutable {
        /// Name of the missing tool.
        tool: String,
        /// Path where the tool was expected.
        path: Utf8PathBuf,
    },

    /// A located tool failed its `--version` smoke test.
    #[error("toolchain smoke test failed for {path}: {message}")]
    SmokeTest {
        /// Tool that was run.
        path: Utf8PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The packaging run failed.
    #[error(transparent)]
    Packaging(#[from] PackagingError),

    /// The bootstrap installation used after a failed build carries no
    /// matching build stamp.
    #[error(
        "bootstrap installation at {root} cannot be packaged: {source}; \
         pass --no-stamp-check to package it anyway"
    )]
    BootstrapStamp {
        /// Root of the bootstrap installation.
        root: Utf8PathBuf,
        /// The underlying stamp mismatch.
        source: PackagingError,
    },

    /// The external build step exited unsuccessfully.
    #[error("clang build script failed: {status}")]
    ExternalBuild {
        /// Exit status of the build script.
        status: ExitStatus,
    },

    /// The checkout does not contain the clang build script.
    #[error("clang build script not found at {path}; is this a chromium checkout?")]
    BuildScriptMissing {
        /// Expected location of `build.py`.
        path: Utf8PathBuf,
    },

    /// A git operation failed or timed out.
    #[error("git {operation} failed: {message}")]
    Git {
        /// The git operation that failed (clone, fetch, etc.).
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// No package version was given and the pinned revision carries none.
    #[error(
        "package version unknown: the dependency manifest pins only hash {hash}; \
         pass --package-version"
    )]
    PackageVersionUnknown {
        /// The pinned hash that was found.
        hash: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration {path}: {reason}")]
    Config {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_paths(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(Utf8PathBuf::as_path)
        .map(Utf8Path::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for builder operations.
pub type Result<T> = std::result::Result<T, ToolchainError>;
