//! CLI argument definitions for the chromium toolchain builder.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::Utf8PathBuf;
use clap::Parser;
use log::LevelFilter;

/// Build and package the clang toolchain pinned by a chromium checkout.
#[derive(Parser, Debug, Clone)]
#[command(name = "chromium-toolchain")]
#[command(about)]
#[command(long_about = concat!(
    "Build and package the clang toolchain pinned by a chromium checkout.\n\n",
    "The chromium source is cloned or updated, the pinned clang revision is read ",
    "from DEPS, tools/clang/scripts/build.py is run, and the resulting ",
    "installation is packaged into clang-<package-version>.tar.xz.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build and package from chromium main:\n",
    "    $ chromium-toolchain\n\n",
    "  Print the pinned clang revision of a chromium release:\n",
    "    $ chromium-toolchain --version 126.0.6478.0 --get-llvm-revision\n\n",
    "  Re-package an existing build without stripping:\n",
    "    $ chromium-toolchain --package-only --no-strip",
))]
pub struct Cli {
    /// Chromium ref (branch, tag, or commit) to sync.
    #[arg(long = "version", value_name = "REF", default_value = crate::git::DEFAULT_REF)]
    pub chromium_ref: String,

    /// Print the pinned clang revision to stdout and exit.
    #[arg(long)]
    pub get_llvm_revision: bool,

    /// Skip sync and build; package an existing installation.
    #[arg(long, conflicts_with_all = ["no_package", "get_llvm_revision"])]
    pub package_only: bool,

    /// Build without packaging.
    #[arg(long)]
    pub no_package: bool,

    /// Chromium checkout directory [default: ./chromium].
    #[arg(long, value_name = "DIR")]
    pub checkout_dir: Option<Utf8PathBuf>,

    /// Directory receiving the archive [default: ./dist].
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Package version, overriding the one pinned in DEPS.
    #[arg(long, value_name = "VERSION")]
    pub package_version: Option<String>,

    /// Parallelism hint for the build [default: available CPUs].
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Keep staged binaries unstripped.
    #[arg(long)]
    pub no_strip: bool,

    /// Package even when the build stamp does not match.
    #[arg(long)]
    pub no_stamp_check: bool,

    /// Skip the `clang --version` check.
    #[arg(long)]
    pub no_smoke_test: bool,

    /// Configuration file (TOML).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Return the log level selected by `-v`/`-q`.
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
