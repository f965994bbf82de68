//! Pre-staging checks: build stamp and wanted-file completeness.

use super::error::PackagingError;
use super::rules::WantedFileManifest;
use super::stage::join_posix;
use super::state::PackagingStage;
use super::version::PackageVersion;
use camino::Utf8Path;
use std::fs;
use std::io;

/// Name of the stamp file the clang build script writes into its output.
pub const STAMP_FILE_NAME: &str = "cr_build_revision";

/// Whether the build stamp is compared with the expected version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StampCheck {
    /// `<toolchain-root>/cr_build_revision` must equal the package version.
    #[default]
    Require,
    /// Skip the comparison.
    Skip,
}

/// Compare the recorded build stamp with `expected`.
///
/// Trailing whitespace in the stamp file is ignored. An absent stamp file
/// counts as a mismatch.
///
/// # Errors
///
/// Returns [`PackagingError::StampMismatch`] on disagreement and
/// [`PackagingError::Io`] if the stamp exists but cannot be read.
pub fn check_stamp(
    toolchain_root: &Utf8Path,
    expected: &PackageVersion,
    check: StampCheck,
) -> Result<(), PackagingError> {
    if check == StampCheck::Skip {
        log::warn!("build stamp check disabled");
        return Ok(());
    }

    let path = toolchain_root.join(STAMP_FILE_NAME);
    let actual = match fs::read_to_string(&path) {
        Ok(contents) => Some(contents.trim_end().to_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(PackagingError::io(PackagingStage::Idle)(e)),
    };

    if actual.as_deref() == Some(expected.as_str()) {
        return Ok(());
    }
    Err(PackagingError::StampMismatch {
        path,
        expected: expected.as_str().to_owned(),
        actual,
    })
}

/// Check that every literal rule is a file under `toolchain_root`.
///
/// A directory at a literal path counts as a miss. All misses are collected before failing; glob rules are not checked.
///
/// # Errors
///
/// Returns [`PackagingError::ManifestVerification`] listing every missing
/// literal path.
pub fn verify_manifest(
    toolchain_root: &Utf8Path,
    manifest: &WantedFileManifest,
) -> Result<(), PackagingError> {
    let missing: Vec<String> = manifest
        .literals()
        .filter(|relative| {
            let path = join_posix(toolchain_root, relative);
            let present = path.is_file();
            if !present {
                log::error!("wanted file \"{relative}\" but it did not exist");
            }
            !present
        })
        .map(str::to_owned)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PackagingError::ManifestVerification { missing })
    }
}
