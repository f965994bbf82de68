//! Pinned clang revision extraction from the chromium `DEPS` manifest.
//!
//! Chromium pins its prebuilt clang with a package identifier of the form
//! `clang-llvmorg-<major>-init-<count>-<hash>-<build>`. The primary rule
//! captures every component; the fallback accepts the identifier without a
//! build number and recovers only the hash.

use crate::error::{Result, ToolchainError};
use crate::package::{PackageVersion, PackagingError};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Name of the dependency manifest at the checkout root.
pub const DEPS_FILE_NAME: &str = "DEPS";

static PRIMARY: LazyLock<Regex> =
    LazyLock::new(|| compile(r"clang-llvmorg-(\d+)-init-(\d+)-([a-zA-Z0-9]{8,})-(\d+)"));

static FALLBACK: LazyLock<Regex> =
    LazyLock::new(|| compile(r"clang-llvmorg-\d+-init-\d+-([a-zA-Z0-9]{8,})"));

#[expect(
    clippy::expect_used,
    reason = "patterns are string literals exercised by the unit tests"
)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("revision pattern is valid")
}

/// Full clang package identifier recovered by the primary rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClangPackage {
    /// LLVM major version.
    pub major: u32,
    /// Commits since the release branch point.
    pub init_count: u32,
    /// Commit hash (alphanumeric, at least 8 characters).
    pub hash: String,
    /// Chromium package build number.
    pub build: u32,
}

impl ClangPackage {
    /// Render the package version, `llvmorg-<major>-init-<count>-<hash>-<build>`.
    #[must_use]
    pub fn version_string(&self) -> String {
        format!(
            "llvmorg-{}-init-{}-{}-{}",
            self.major, self.init_count, self.hash, self.build
        )
    }

    /// Convert into a validated [`PackageVersion`].
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::InvalidPackageVersion`] if the rendered
    /// version is rejected.
    pub fn package_version(&self) -> std::result::Result<PackageVersion, PackagingError> {
        PackageVersion::try_from(self.version_string())
    }
}

/// The clang revision pinned by a chromium checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedRevision {
    hash: String,
    package: Option<ClangPackage>,
}

impl PinnedRevision {
    /// Return the pinned commit hash.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Return the full package identifier when the primary rule matched.
    #[must_use]
    pub fn package(&self) -> Option<&ClangPackage> {
        self.package.as_ref()
    }

    /// Return true when only the fallback rule matched.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.package.is_none()
    }
}

impl fmt::Display for PinnedRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

/// Extract the pinned revision from manifest text.
///
/// # Errors
///
/// Returns [`ToolchainError::ManifestParse`] if neither rule matches.
///
/// # Examples
///
/// ```
/// use chromium_toolchain_builder::revision::extract_revision;
///
/// let text = "'clang-llvmorg-19-init-1234-abcdef1234567890-1'";
/// let revision = extract_revision(text).unwrap();
/// assert_eq!(revision.hash(), "abcdef1234567890");
/// ```
pub fn extract_revision(text: &str) -> Result<PinnedRevision> {
    if let Some(captures) = PRIMARY.captures(text) {
        let number = |index: usize| -> Option<u32> { captures.get(index)?.as_str().parse().ok() };
        let hash = captures[3].to_owned();
        if let (Some(major), Some(init_count), Some(build)) = (number(1), number(2), number(4)) {
            return Ok(PinnedRevision {
                package: Some(ClangPackage {
                    major,
                    init_count,
                    hash: hash.clone(),
                    build,
                }),
                hash,
            });
        }
        // Components too large for u32 still pin a usable hash.
        return Ok(PinnedRevision {
            hash,
            package: None,
        });
    }

    if let Some(captures) = FALLBACK.captures(text) {
        return Ok(PinnedRevision {
            hash: captures[1].to_owned(),
            package: None,
        });
    }

    Err(ToolchainError::ManifestParse {
        path: Utf8PathBuf::from("<text>"),
        reason: "no clang-llvmorg package identifier found".to_owned(),
    })
}

/// Read `<checkout>/DEPS` and extract the pinned revision.
///
/// # Errors
///
/// Returns [`ToolchainError::ManifestParse`] naming the manifest path if the
/// file is absent, unreadable, or carries no clang pin.
pub fn read_revision(checkout: &Utf8Path) -> Result<PinnedRevision> {
    let path = checkout.join(DEPS_FILE_NAME);
    log::info!("Extracting LLVM revision from {path}");
    let text = std::fs::read_to_string(&path).map_err(|e| ToolchainError::ManifestParse {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let revision = extract_revision(&text).map_err(|err| match err {
        ToolchainError::ManifestParse { reason, .. } => ToolchainError::ManifestParse {
            path: path.clone(),
            reason,
        },
        other => other,
    })?;
    if revision.is_fallback() {
        log::info!("Found LLVM revision (fallback): {revision}");
    } else {
        log::info!("Found LLVM revision: {revision}");
    }
    Ok(revision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    const DEPS_SNIPPET: &str = r#"
  'src/third_party/llvm-build/Release+Asserts': {
    'dep_type': 'gcs',
    'objects': [
      {
        'object_name': 'Linux_x64/clang-llvmorg-19-init-1234-abcdef1234567890-1.tar.xz',
      },
    ],
  },
"#;

    #[test]
    fn primary_rule_captures_every_component() {
        let revision = extract_revision(DEPS_SNIPPET).expect("revision");
        assert_eq!(revision.hash(), "abcdef1234567890");
        assert_eq!(
            revision.package(),
            Some(&ClangPackage {
                major: 19,
                init_count: 1234,
                hash: "abcdef1234567890".to_owned(),
                build: 1,
            })
        );
    }

    #[test]
    fn package_version_round_trips_through_identifier() {
        let revision = extract_revision(DEPS_SNIPPET).expect("revision");
        let version = revision
            .package()
            .expect("primary match")
            .package_version()
            .expect("valid version");
        assert_eq!(version.as_str(), "llvmorg-19-init-1234-abcdef1234567890-1");
        assert_eq!(version.release(), "19");
    }

    #[test]
    fn fallback_rule_accepts_missing_build_number() {
        let revision =
            extract_revision("clang-llvmorg-20-init-77-g1a2b3c4d5e.tar.xz").expect("revision");
        assert_eq!(revision.hash(), "g1a2b3c4d5e");
        assert!(revision.is_fallback());
    }

    #[rstest]
    #[case::empty("")]
    #[case::short_hash("clang-llvmorg-19-init-1234-abc-1")]
    #[case::no_init("clang-llvmorg-19-abcdef1234567890-1")]
    #[case::wrong_prefix("gcc-llvmorg-19-init-1234-abcdef1234567890-1")]
    fn rejects_text_without_a_pin(#[case] text: &str) {
        let err = extract_revision(text).expect_err("no pin");
        assert!(matches!(err, ToolchainError::ManifestParse { .. }));
    }

    #[test]
    fn read_revision_names_missing_manifest() {
        let temp = TempDir::new().expect("temp dir");
        let checkout = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf8");
        let err = read_revision(&checkout).expect_err("missing DEPS");
        match err {
            ToolchainError::ManifestParse { path, .. } => assert_eq!(path, checkout.join("DEPS")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn read_revision_parses_checkout_manifest() {
        let temp = TempDir::new().expect("temp dir");
        let checkout = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf8");
        std::fs::write(checkout.join(DEPS_FILE_NAME), DEPS_SNIPPET).expect("write DEPS");
        let revision = read_revision(&checkout).expect("revision");
        assert_eq!(revision.to_string(), "abcdef1234567890");
    }
}
