//! Locating and validating the clang installation produced by the build.
//!
//! The chromium clang build leaves its output at one of two places under
//! `third_party`. The bootstrap installation is preferred: it exists even
//! when the final build stage failed.

use crate::command::{CommandRunner, Invocation, stderr_message};
use crate::error::{Result, ToolchainError};
use crate::package::HostPlatform;
use crate::package::stage::join_posix;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// Bootstrap installation directory relative to the checkout.
pub const BOOTSTRAP_INSTALL_DIR: &str = "third_party/llvm-bootstrap-install";

/// Final release build directory relative to the checkout.
pub const RELEASE_BUILD_DIR: &str = "third_party/llvm-build/Release+Asserts";

/// Executables every usable installation provides.
pub const MANDATORY_TOOLS: &[&str] = &["clang", "clang++", "lld"];

/// Which known location an installation was found at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainKind {
    /// `third_party/llvm-bootstrap-install`.
    Bootstrap,
    /// `third_party/llvm-build/Release+Asserts`.
    Release,
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bootstrap => "bootstrap",
            Self::Release => "release",
        })
    }
}

/// A located clang installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedToolchain {
    root: Utf8PathBuf,
    kind: ToolchainKind,
}

impl LocatedToolchain {
    /// Describe an installation at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, kind: ToolchainKind) -> Self {
        Self {
            root: root.into(),
            kind,
        }
    }

    /// Return the installation root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Return which candidate location matched.
    #[must_use]
    pub fn kind(&self) -> ToolchainKind {
        self.kind
    }

    /// Return the `bin/` directory.
    #[must_use]
    pub fn bin_dir(&self) -> Utf8PathBuf {
        self.root.join("bin")
    }

    /// Return the path of `tool` in `bin/` with the host executable suffix.
    #[must_use]
    pub fn tool_path(&self, tool: &str, host: HostPlatform) -> Utf8PathBuf {
        self.bin_dir().join(format!("{tool}{}", host.exe_suffix()))
    }
}

/// Return the candidate installation directories in priority order.
#[must_use]
pub fn candidates(checkout: &Utf8Path) -> [(ToolchainKind, Utf8PathBuf); 2] {
    [
        (ToolchainKind::Bootstrap, join_posix(checkout, BOOTSTRAP_INSTALL_DIR)),
        (ToolchainKind::Release, join_posix(checkout, RELEASE_BUILD_DIR)),
    ]
}

/// Find the first candidate directory that contains `bin/`.
///
/// # Errors
///
/// Returns [`ToolchainError::ToolchainNotFound`] listing every candidate
/// when none exists.
pub fn locate(checkout: &Utf8Path) -> Result<LocatedToolchain> {
    let candidates = candidates(checkout);
    for (kind, root) in &candidates {
        if root.join("bin").is_dir() {
            log::info!("Found {kind} toolchain installation at {root}");
            return Ok(LocatedToolchain {
                root: root.clone(),
                kind: *kind,
            });
        }
        log::debug!("no installation at {root}");
    }
    Err(ToolchainError::ToolchainNotFound {
        searched: candidates.into_iter().map(|(_, root)| root).collect(),
    })
}

/// Check that every mandatory executable is a regular file.
///
/// # Errors
///
/// Returns [`ToolchainError::MissingExecutable`] naming the first missing
/// tool.
pub fn verify_executables(toolchain: &LocatedToolchain, host: HostPlatform) -> Result<()> {
    for tool in MANDATORY_TOOLS {
        let path = toolchain.tool_path(tool, host);
        if !path.is_file() {
            return Err(ToolchainError::MissingExecutable {
                tool: (*tool).to_owned(),
                path,
            });
        }
        log::debug!("found {path}");
    }
    Ok(())
}

/// Locate the installation and verify its mandatory executables.
///
/// # Errors
///
/// Propagates errors from [`locate`] and [`verify_executables`].
pub fn locate_verified(checkout: &Utf8Path, host: HostPlatform) -> Result<LocatedToolchain> {
    let toolchain = locate(checkout)?;
    verify_executables(&toolchain, host)?;
    Ok(toolchain)
}

/// Run `clang --version` and `lld --version`, returning the first line of
/// the compiler's output.
///
/// # Errors
///
/// Returns [`ToolchainError::SmokeTest`] if either tool cannot be run or
/// exits unsuccessfully.
pub fn smoke_test(
    toolchain: &LocatedToolchain,
    host: HostPlatform,
    runner: &dyn CommandRunner,
) -> Result<String> {
    let version = tool_version(toolchain, "clang", host, runner)?;
    log::info!("Toolchain test: {version}");
    let linker = tool_version(toolchain, "lld", host, runner)?;
    log::info!("Linker test: {linker}");
    Ok(version)
}

fn tool_version(
    toolchain: &LocatedToolchain,
    tool: &str,
    host: HostPlatform,
    runner: &dyn CommandRunner,
) -> Result<String> {
    let path = toolchain.tool_path(tool, host);
    let invocation = Invocation::new(path.as_str())
        .arg("--version")
        .current_dir(toolchain.root());
    let output = runner
        .output(&invocation)
        .map_err(|e| ToolchainError::SmokeTest {
            path: path.clone(),
            message: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(ToolchainError::SmokeTest {
            path,
            message: stderr_message(&output),
        });
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_owned())
}
