//! Host platform description used to pick platform-specific wanted files.
//!
//! The packager never inspects the running process directly; callers pass a
//! [`HostPlatform`] so that tests can exercise every platform's rule set
//! from a single machine.

use std::fmt;

/// Operating system family of the packaging host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    /// Linux, including ChromeOS build hosts.
    Linux,
    /// macOS.
    MacOs,
    /// Windows.
    Windows,
}

/// CPU architecture of the packaging host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostArch {
    /// 64-bit ARM (`aarch64`).
    Aarch64,
    /// 64-bit x86 (`x86_64`).
    X86_64,
}

impl HostArch {
    /// Architecture component used in target triples.
    #[must_use]
    pub const fn triple_component(self) -> &'static str {
        match self {
            Self::Aarch64 => "aarch64",
            Self::X86_64 => "x86_64",
        }
    }
}

/// The host a toolchain was built on and is being packaged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    /// Operating system family.
    pub os: HostOs,
    /// CPU architecture.
    pub arch: HostArch,
}

impl HostPlatform {
    /// Construct a platform from its parts.
    #[must_use]
    pub const fn new(os: HostOs, arch: HostArch) -> Self {
        Self { os, arch }
    }

    /// Describe the platform this binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        let os = if cfg!(target_os = "windows") {
            HostOs::Windows
        } else if cfg!(target_os = "macos") {
            HostOs::MacOs
        } else {
            HostOs::Linux
        };
        let arch = if cfg!(target_arch = "x86_64") {
            HostArch::X86_64
        } else {
            HostArch::Aarch64
        };
        Self { os, arch }
    }

    /// Return true on Linux hosts.
    #[must_use]
    pub const fn is_linux(self) -> bool {
        matches!(self.os, HostOs::Linux)
    }

    /// Return true on Windows hosts.
    #[must_use]
    pub const fn is_windows(self) -> bool {
        matches!(self.os, HostOs::Windows)
    }

    /// Executable suffix for this host (`.exe` on Windows, empty elsewhere).
    #[must_use]
    pub const fn exe_suffix(self) -> &'static str {
        if self.is_windows() { ".exe" } else { "" }
    }

    /// The vendor-neutral Linux triple for this host's architecture.
    #[must_use]
    pub fn linux_triple(self) -> String {
        format!("{}-unknown-linux-gnu", self.arch.triple_component())
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let os = match self.os {
            HostOs::Linux => "linux",
            HostOs::MacOs => "macos",
            HostOs::Windows => "windows",
        };
        write!(f, "{os}-{}", self.arch.triple_component())
    }
}
