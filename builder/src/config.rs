//! Optional TOML configuration and option resolution.
//!
//! Settings come from three layers: built-in defaults, an optional
//! configuration file, and command-line flags. Each layer overrides the one
//! before it.
//!
//! ```toml
//! [source]
//! remote = "https://chromium.googlesource.com/chromium/src.git"
//! checkout_dir = "/work/chromium"
//! git_timeout_secs = 7200
//!
//! [build]
//! ccache_dir = "/cache/ccache"
//! host_cc = "/usr/bin/clang"
//! host_cxx = "/usr/bin/clang++"
//! assertions = true
//!
//! [package]
//! output_dir = "/work/dist"
//! strip = true
//! strip_tool = "strip"
//! ```

use crate::cli::Cli;
use crate::error::{Result, ToolchainError};
use crate::git::{CHROMIUM_REMOTE, GIT_TIMEOUT, GitSourceSync};
use crate::invoker::BuildConfig;
use crate::package::archive::MAX_COMPRESSION;
use crate::package::{HostPlatform, StampCheck};
use crate::pipeline::{PipelineOptions, RunMode};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;

/// Contents of the configuration file.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Source checkout settings.
    pub source: SourceConfig,
    /// External build settings.
    pub build: BuildSection,
    /// Packaging settings.
    pub package: PackageSection,
}

/// `[source]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Git remote cloned for a fresh checkout.
    pub remote: String,
    /// Checkout directory.
    pub checkout_dir: Option<Utf8PathBuf>,
    /// Timeout for a single git operation, in seconds.
    pub git_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            remote: CHROMIUM_REMOTE.to_owned(),
            checkout_dir: None,
            git_timeout_secs: GIT_TIMEOUT.as_secs(),
        }
    }
}

/// `[build]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
    /// ccache directory; defaults to `$CCACHE_DIR` or `~/.ccache`.
    pub ccache_dir: Option<Utf8PathBuf>,
    /// Host C compiler for the bootstrap stage.
    pub host_cc: Option<String>,
    /// Host C++ compiler for the bootstrap stage.
    pub host_cxx: Option<String>,
    /// Build with LLVM assertions.
    pub assertions: bool,
    /// Python interpreter running the build script.
    pub python: String,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            ccache_dir: None,
            host_cc: None,
            host_cxx: None,
            assertions: true,
            python: "python3".to_owned(),
        }
    }
}

/// `[package]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSection {
    /// Directory receiving the archive.
    pub output_dir: Option<Utf8PathBuf>,
    /// Strip staged binaries.
    pub strip: bool,
    /// Strip executable.
    pub strip_tool: String,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            output_dir: None,
            strip: true,
            strip_tool: "strip".to_owned(),
        }
    }
}

impl Config {
    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::Config`] naming `path` on syntax errors,
    /// type mismatches, or unknown keys.
    pub fn parse(source: &str, path: &Utf8Path) -> Result<Self> {
        toml::from_str(source).map_err(|e| ToolchainError::Config {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Load the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::Config`] if the file cannot be read or
    /// parsed.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| ToolchainError::Config {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        let config = Self::parse(&source, path)?;
        log::debug!("loaded configuration from {path}");
        Ok(config)
    }
}

impl SourceConfig {
    /// Build the git syncer described by this table.
    #[must_use]
    pub fn source_sync(&self) -> GitSourceSync {
        GitSourceSync::new(self.remote.clone())
            .with_timeout(Duration::from_secs(self.git_timeout_secs.max(1)))
    }
}

/// Process environment consulted for defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Directory relative defaults and relative paths resolve against.
    pub base_dir: Utf8PathBuf,
    /// Value of `CCACHE_DIR`, if set.
    pub ccache_dir: Option<Utf8PathBuf>,
    /// The user's home directory, if known.
    pub home_dir: Option<Utf8PathBuf>,
    /// Available parallelism.
    pub cpus: usize,
    /// Host platform.
    pub host: HostPlatform,
}

impl Environment {
    /// Capture the environment of the running process.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::Io`] if the working directory cannot be
    /// determined or is not valid UTF-8.
    pub fn capture() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let base_dir = Utf8PathBuf::try_from(cwd).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("current directory is not valid UTF-8: {e}"),
            )
        })?;
        let ccache_dir = std::env::var("CCACHE_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(Utf8PathBuf::from);
        let home_dir = directories_next::BaseDirs::new()
            .and_then(|dirs| Utf8PathBuf::try_from(dirs.home_dir().to_path_buf()).ok());
        let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Ok(Self {
            base_dir,
            ccache_dir,
            home_dir,
            cpus,
            host: HostPlatform::current(),
        })
    }

    fn absolute(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.base_dir.join(path)
        }
    }

    fn default_ccache_dir(&self) -> Utf8PathBuf {
        self.ccache_dir.clone().unwrap_or_else(|| {
            self.home_dir
                .as_ref()
                .unwrap_or(&self.base_dir)
                .join(".ccache")
        })
    }
}

/// Combine flags, file settings, and environment into pipeline options.
#[must_use]
pub fn resolve_options(cli: &Cli, config: &Config, env: &Environment) -> PipelineOptions {
    let checkout = cli
        .checkout_dir
        .as_ref()
        .or(config.source.checkout_dir.as_ref())
        .map_or_else(|| env.base_dir.join("chromium"), |dir| env.absolute(dir));
    let output_dir = cli
        .output_dir
        .as_ref()
        .or(config.package.output_dir.as_ref())
        .map_or_else(|| env.base_dir.join("dist"), |dir| env.absolute(dir));
    let ccache_dir = config
        .build
        .ccache_dir
        .as_ref()
        .map_or_else(|| env.default_ccache_dir(), |dir| env.absolute(dir));
    let strip = config.package.strip && !cli.no_strip;

    PipelineOptions {
        mode: if cli.package_only {
            RunMode::PackageOnly
        } else {
            RunMode::Full
        },
        reference: cli.chromium_ref.clone(),
        build: BuildConfig {
            checkout,
            python: config.build.python.clone(),
            ccache_dir,
            host_cc: config.build.host_cc.clone(),
            host_cxx: config.build.host_cxx.clone(),
            assertions: config.build.assertions,
            jobs: cli.jobs.unwrap_or(env.cpus).max(1),
        },
        output_dir,
        package: !cli.no_package,
        package_version: cli.package_version.clone(),
        host: env.host,
        stamp: if cli.no_stamp_check {
            StampCheck::Skip
        } else {
            StampCheck::Require
        },
        strip_tool: strip.then(|| config.package.strip_tool.clone()),
        compression: MAX_COMPRESSION,
        smoke_test: !cli.no_smoke_test,
    }
}
