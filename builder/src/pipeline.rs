//! End-to-end orchestration: sync, revision, build, locate, package.
//!
//! Steps run strictly in sequence and the first error ends the run. The one
//! tolerated failure is the external build: when it fails but a bootstrap
//! installation exists, packaging proceeds from the bootstrap compiler.

use crate::command::CommandRunner;
use crate::error::{Result, ToolchainError};
use crate::git::SourceSync;
use crate::invoker::{BuildConfig, BuildInvoker, BuildStatus};
use crate::package::{
    HostPlatform, PackageOutput, PackageRequest, PackageVersion, PackagingError, StampCheck,
    package_toolchain,
};
use crate::revision::{PinnedRevision, read_revision};
use crate::toolchain::{LocatedToolchain, ToolchainKind, locate_verified, smoke_test};
use camino::{Utf8Path, Utf8PathBuf};
use std::time::{Duration, Instant};

/// Which steps a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Sync, build, locate and (optionally) package.
    Full,
    /// Locate and package an existing installation; no sync, no build.
    PackageOnly,
}

/// Fully resolved options for a pipeline run.
///
/// Every path is explicit; nothing depends on the process working
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Steps to perform.
    pub mode: RunMode,
    /// Chromium ref to sync.
    pub reference: String,
    /// Build configuration, including the checkout root.
    pub build: BuildConfig,
    /// Directory receiving the archive.
    pub output_dir: Utf8PathBuf,
    /// Whether to package after locating the toolchain.
    pub package: bool,
    /// Explicit package version, overriding the pinned one.
    pub package_version: Option<String>,
    /// Host the toolchain is built for.
    pub host: HostPlatform,
    /// Whether the build stamp is checked.
    pub stamp: StampCheck,
    /// Strip tool, or `None` to keep binaries unstripped.
    pub strip_tool: Option<String>,
    /// xz preset.
    pub compression: u32,
    /// Whether to run `clang --version` after locating the toolchain.
    pub smoke_test: bool,
}

impl PipelineOptions {
    /// Return the chromium checkout root.
    #[must_use]
    pub fn checkout(&self) -> &Utf8Path {
        &self.build.checkout
    }
}

/// External collaborators of the pipeline.
pub struct Collaborators<'a> {
    /// Source checkout synchroniser.
    pub sync: &'a dyn SourceSync,
    /// Runner for the build script, strip and the smoke test.
    pub runner: &'a dyn CommandRunner,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Pinned revision, when the dependency manifest was read.
    pub revision: Option<PinnedRevision>,
    /// Package version used for the stamp check and archive name.
    pub package_version: Option<PackageVersion>,
    /// Outcome of the build step.
    pub build: BuildStatus,
    /// Located installation.
    pub toolchain: LocatedToolchain,
    /// First line of `clang --version`, when the smoke test ran.
    pub compiler_version: Option<String>,
    /// Packaging result, when packaging ran.
    pub package: Option<PackageOutput>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Sync the checkout and return the pinned clang revision.
///
/// # Errors
///
/// Returns [`ToolchainError::Git`] if the sync fails and
/// [`ToolchainError::ManifestParse`] if no revision is pinned.
pub fn query_revision(options: &PipelineOptions, sync: &dyn SourceSync) -> Result<PinnedRevision> {
    sync.sync(options.checkout(), &options.reference)?;
    read_revision(options.checkout())
}

/// Run the pipeline described by `options`.
///
/// # Errors
///
/// Returns the error of the first failing step. A failed build is an error
/// ([`ToolchainError::ExternalBuild`]) unless a bootstrap installation is
/// found.
pub fn run(options: &PipelineOptions, collaborators: &Collaborators<'_>) -> Result<BuildReport> {
    let started = Instant::now();
    let checkout = options.checkout();

    if options.mode == RunMode::Full {
        collaborators.sync.sync(checkout, &options.reference)?;
    }

    let revision = load_revision(options)?;
    let package_version = if options.package {
        Some(resolve_package_version(
            options.package_version.as_deref(),
            revision.as_ref(),
        )?)
    } else {
        None
    };

    let invoker = BuildInvoker::new(options.build.clone(), collaborators.runner);
    let build = match options.mode {
        RunMode::Full => invoker.invoke()?,
        RunMode::PackageOnly => invoker.skip(),
    };

    let toolchain = locate_after_build(checkout, options.host, build)?;

    let compiler_version = if options.smoke_test {
        Some(smoke_test(&toolchain, options.host, collaborators.runner)?)
    } else {
        None
    };

    let package = match package_version.clone() {
        Some(version) => {
            let request = PackageRequest {
                stamp: options.stamp,
                strip_tool: options.strip_tool.clone(),
                compression: options.compression,
                ..PackageRequest::new(
                    toolchain.root().to_owned(),
                    options.output_dir.clone(),
                    version,
                    options.host,
                )
            };
            Some(package_located(&request, &toolchain, collaborators.runner)?)
        }
        None => None,
    };

    Ok(BuildReport {
        revision,
        package_version,
        build,
        toolchain,
        compiler_version,
        package,
        elapsed: started.elapsed(),
    })
}

/// Package `toolchain`, pointing at `--no-stamp-check` when a bootstrap
/// installation lacks the build stamp.
fn package_located(
    request: &PackageRequest,
    toolchain: &LocatedToolchain,
    runner: &dyn CommandRunner,
) -> Result<PackageOutput> {
    package_toolchain(request, runner).map_err(|err| match err {
        PackagingError::StampMismatch { .. } if toolchain.kind() == ToolchainKind::Bootstrap => {
            ToolchainError::BootstrapStamp {
                root: toolchain.root().to_owned(),
                source: err,
            }
        }
        other => other.into(),
    })
}

/// Read the pin, unless a package-only run has an explicit version.
fn load_revision(options: &PipelineOptions) -> Result<Option<PinnedRevision>> {
    if options.mode == RunMode::PackageOnly && options.package_version.is_some() {
        return Ok(None);
    }
    read_revision(options.checkout()).map(Some)
}

/// Pick the package version: explicit override first, then the pin.
///
/// # Errors
///
/// Returns [`ToolchainError::PackageVersionUnknown`] if neither source
/// supplies a full version, or [`ToolchainError::Packaging`] if the
/// override is malformed.
pub fn resolve_package_version(
    explicit: Option<&str>,
    revision: Option<&PinnedRevision>,
) -> Result<PackageVersion> {
    if let Some(value) = explicit {
        return Ok(PackageVersion::try_from(value)?);
    }
    match revision {
        Some(revision) => match revision.package() {
            Some(package) => Ok(package.package_version()?),
            None => Err(ToolchainError::PackageVersionUnknown {
                hash: revision.hash().to_owned(),
            }),
        },
        None => Err(ToolchainError::PackageVersionUnknown {
            hash: "<not read>".to_owned(),
        }),
    }
}

/// Locate the installation, tolerating a failed build only when the
/// bootstrap compiler is present.
fn locate_after_build(
    checkout: &Utf8Path,
    host: HostPlatform,
    build: BuildStatus,
) -> Result<LocatedToolchain> {
    let BuildStatus::Failed(status) = build else {
        return locate_verified(checkout, host);
    };

    match locate_verified(checkout, host) {
        Ok(toolchain) if toolchain.kind() == ToolchainKind::Bootstrap => {
            log::warn!(
                "Clang build failed ({status}) but the bootstrap compiler at {} is usable; continuing",
                toolchain.root()
            );
            Ok(toolchain)
        }
        _ => Err(ToolchainError::ExternalBuild { status }),
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
