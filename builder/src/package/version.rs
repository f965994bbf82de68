//! Package version newtype for archive naming and stamp checks.
//!
//! A package version has the shape `llvmorg-<major>-<rest>`, for example
//! `llvmorg-19-init-1234-gabcdef12-1`. The major component is the release
//! version substituted for `$V` in wanted-file rules.

use super::error::PackagingError;
use std::fmt;

/// Prefix every clang package version starts with.
const VERSION_PREFIX: &str = "llvmorg-";

/// Prefix of the package (and archive) name.
const PACKAGE_PREFIX: &str = "clang-";

/// A validated clang package version.
///
/// # Examples
///
/// ```
/// use chromium_toolchain_builder::package::version::PackageVersion;
///
/// let version = PackageVersion::try_from("llvmorg-19-init-1234-gabcdef12-1").unwrap();
/// assert_eq!(version.release(), "19");
/// assert_eq!(version.archive_filename(), "clang-llvmorg-19-init-1234-gabcdef12-1.tar.xz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageVersion {
    full: String,
    release: String,
}

impl PackageVersion {
    /// Return the full version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// Return the release (major) version used for `$V` substitution.
    #[must_use]
    pub fn release(&self) -> &str {
        &self.release
    }

    /// Return the package name, `clang-<version>`.
    #[must_use]
    pub fn package_name(&self) -> String {
        format!("{PACKAGE_PREFIX}{}", self.full)
    }

    /// Return the archive filename, `clang-<version>.tar.xz`.
    #[must_use]
    pub fn archive_filename(&self) -> String {
        format!("{}.tar.xz", self.package_name())
    }
}

impl TryFrom<&str> for PackageVersion {
    type Error = PackagingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let release = parse_release(value)?;
        Ok(Self {
            full: value.to_owned(),
            release,
        })
    }
}

impl TryFrom<String> for PackageVersion {
    type Error = PackagingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let release = parse_release(&value)?;
        Ok(Self {
            full: value,
            release,
        })
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full)
    }
}

fn invalid(value: &str, reason: impl Into<String>) -> PackagingError {
    PackagingError::InvalidPackageVersion {
        value: value.to_owned(),
        reason: reason.into(),
    }
}

/// Validate `value` and extract its major component.
fn parse_release(value: &str) -> Result<String, PackagingError> {
    if let Some(bad) = value
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '\\'))
    {
        return Err(invalid(value, format!("unexpected character '{bad}'")));
    }
    let rest = value
        .strip_prefix(VERSION_PREFIX)
        .ok_or_else(|| invalid(value, format!("must start with \"{VERSION_PREFIX}\"")))?;
    let major = rest.split('-').next().unwrap_or_default();
    if major.is_empty() || !major.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(value, "major version must be numeric"));
    }
    Ok(major.to_owned())
}
