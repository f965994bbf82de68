//! The packaging run: stamp check through archive creation.
//!
//! [`package_toolchain`] drives the stages in [`PackagingStage`] order,
//! logging each transition. Any failure aborts the run; the staging tree
//! is left behind for inspection and no archive exists at the deliverable
//! path.

use super::archive::{MAX_COMPRESSION, compute_sha256, create_archive, partial_path};
use super::error::PackagingError;
use super::host::HostPlatform;
use super::layout::create_aliases;
use super::rules::WantedFileManifest;
use super::stage::{StageParams, Stripper, stage_wanted_files};
use super::state::PackagingStage;
use super::verify::{StampCheck, check_stamp, verify_manifest};
use super::version::PackageVersion;
use crate::command::CommandRunner;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;

/// Input parameters for [`package_toolchain`].
#[derive(Debug, Clone)]
pub struct PackageRequest {
    /// Installation directory produced by the clang build.
    pub toolchain_root: Utf8PathBuf,
    /// Directory receiving the staging tree and the archive.
    pub output_dir: Utf8PathBuf,
    /// Expected package version.
    pub version: PackageVersion,
    /// Host the toolchain was built for.
    pub host: HostPlatform,
    /// Whether the build stamp is checked.
    pub stamp: StampCheck,
    /// Strip tool to run on staged binaries, or `None` to skip stripping.
    pub strip_tool: Option<String>,
    /// xz preset used for compression.
    pub compression: u32,
}

impl PackageRequest {
    /// Create a request with the stamp check enabled, `strip` stripping
    /// and maximum compression.
    #[must_use]
    pub fn new(
        toolchain_root: impl Into<Utf8PathBuf>,
        output_dir: impl Into<Utf8PathBuf>,
        version: PackageVersion,
        host: HostPlatform,
    ) -> Self {
        Self {
            toolchain_root: toolchain_root.into(),
            output_dir: output_dir.into(),
            version,
            host,
            stamp: StampCheck::Require,
            strip_tool: Some("strip".to_owned()),
            compression: MAX_COMPRESSION,
        }
    }

    /// Path of the staging tree, `<output-dir>/<package-name>`.
    #[must_use]
    pub fn staging_dir(&self) -> Utf8PathBuf {
        self.output_dir.join(self.version.package_name())
    }

    /// Path of the deliverable archive.
    #[must_use]
    pub fn archive_path(&self) -> Utf8PathBuf {
        self.output_dir.join(self.version.archive_filename())
    }
}

/// Result of a successful packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutput {
    /// Path to the created `.tar.xz` archive.
    pub archive_path: Utf8PathBuf,
    /// Archive members in archive order.
    pub members: Vec<String>,
    /// Lowercase hex SHA-256 of the archive.
    pub sha256: String,
}

/// Package the toolchain described by `request`.
///
/// # Errors
///
/// Returns [`PackagingError::StampMismatch`] before any file work when the
/// build stamp disagrees, [`PackagingError::ManifestVerification`] when
/// literal wanted files are missing, [`PackagingError::InvalidRule`] for a
/// malformed rule, and [`PackagingError::Io`] or [`PackagingError::Walk`]
/// for filesystem failures.
pub fn package_toolchain(
    request: &PackageRequest,
    runner: &dyn CommandRunner,
) -> Result<PackageOutput, PackagingError> {
    let root = request.toolchain_root.as_path();
    let mut stage = PackagingStage::Idle;
    log::info!("Packaging {} from {root}", request.version.package_name());

    remove_previous_archive(&request.archive_path())?;
    check_stamp(root, &request.version, request.stamp)?;

    let manifest = WantedFileManifest::for_host(request.host, request.version.release())?;
    stage = advance(stage, &format!("{} rules for {}", manifest.rules().len(), request.host));

    verify_manifest(root, &manifest)?;
    stage = advance(stage, "all required files present");

    let staging_dir = request.staging_dir();
    prepare_staging_dir(&staging_dir)?;
    let stripper = request
        .strip_tool
        .as_deref()
        .map(|tool| Stripper::new(runner, tool));
    let staged = stage_wanted_files(&StageParams {
        toolchain_root: root,
        staging_dir: &staging_dir,
        manifest: &manifest,
        host: request.host,
        stripper: stripper.as_ref(),
    })?;
    let aliases = create_aliases(&staging_dir, request.host, request.version.release())?;
    stage = advance(
        stage,
        &format!("{} files and {} aliases in {staging_dir}", staged.len(), aliases.len()),
    );

    let archive_path = request.archive_path();
    let members = create_archive(&staging_dir, &archive_path, request.compression)?;
    stage = advance(stage, &format!("{} members in {archive_path}", members.len()));

    fs::remove_dir_all(&staging_dir).map_err(PackagingError::io(PackagingStage::Done))?;
    let sha256 = compute_sha256(&archive_path)?;
    advance(stage, &format!("sha256 {sha256}"));

    Ok(PackageOutput {
        archive_path,
        members,
        sha256,
    })
}

fn advance(stage: PackagingStage, detail: &str) -> PackagingStage {
    let next = stage.next().unwrap_or(stage);
    log::info!("{next}: {detail}");
    next
}

/// Remove an archive (and its `.partial` sibling) left by an earlier run.
fn remove_previous_archive(archive_path: &Utf8Path) -> Result<(), PackagingError> {
    for path in [archive_path.to_owned(), partial_path(archive_path)] {
        match fs::remove_file(&path) {
            Ok(()) => log::debug!("removed previous archive {path}"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(PackagingError::io(PackagingStage::Idle)(e)),
        }
    }
    Ok(())
}

/// Remove any stale staging tree and create an empty one.
fn prepare_staging_dir(staging_dir: &Utf8Path) -> Result<(), PackagingError> {
    let io_err = PackagingError::io(PackagingStage::Verified);
    match fs::remove_dir_all(staging_dir) {
        Ok(()) => log::debug!("removed stale staging tree {staging_dir}"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(e)),
    }
    fs::create_dir_all(staging_dir).map_err(PackagingError::io(PackagingStage::Verified))
}

#[cfg(test)]
#[path = "packaging_tests.rs"]
mod tests;
