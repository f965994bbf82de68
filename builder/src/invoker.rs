//! Running chromium's clang build script.
//!
//! The build is a black box: [`BuildInvoker::invoke`] runs
//! `tools/clang/scripts/build.py` and reports only its exit status.
//! [`BuildInvoker::skip`] yields the same [`BuildStatus`] type for runs
//! that re-package an existing installation.

use crate::command::{CommandRunner, Invocation};
use crate::error::{Result, ToolchainError};
use camino::{Utf8Path, Utf8PathBuf};
use std::process::ExitStatus;

/// Directory holding the clang build scripts, relative to the checkout.
pub const SCRIPTS_DIR: [&str; 3] = ["tools", "clang", "scripts"];

/// Name of the build script.
pub const BUILD_SCRIPT: &str = "build.py";

/// Build-script flags passed on every run.
const BASE_FLAGS: &[&str] = &["--without-android", "--without-fuchsia", "--with-ccache"];

/// Configuration for the external build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Chromium checkout root.
    pub checkout: Utf8PathBuf,
    /// Python interpreter used to run the build script.
    pub python: String,
    /// Compiler cache directory exported as `CCACHE_DIR`.
    pub ccache_dir: Utf8PathBuf,
    /// Host C compiler used for the bootstrap stage.
    pub host_cc: Option<String>,
    /// Host C++ compiler used for the bootstrap stage.
    pub host_cxx: Option<String>,
    /// Whether to build with assertions enabled.
    pub assertions: bool,
    /// Parallelism hint exported as `CMAKE_BUILD_PARALLEL_LEVEL`.
    pub jobs: usize,
}

/// Outcome of the build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// The build script exited successfully.
    Succeeded,
    /// The build script exited unsuccessfully.
    Failed(ExitStatus),
    /// The build was not run.
    Skipped,
}

/// Runs (or skips) the external clang build.
pub struct BuildInvoker<'a> {
    config: BuildConfig,
    runner: &'a dyn CommandRunner,
}

impl<'a> BuildInvoker<'a> {
    /// Create an invoker for `config` that spawns commands through `runner`.
    #[must_use]
    pub fn new(config: BuildConfig, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Return the directory the build script runs in.
    #[must_use]
    pub fn scripts_dir(&self) -> Utf8PathBuf {
        scripts_dir(&self.config.checkout)
    }

    /// Check that the checkout carries the clang build script.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::BuildScriptMissing`] if `build.py` is absent.
    pub fn verify_structure(&self) -> Result<Utf8PathBuf> {
        let script = self.scripts_dir().join(BUILD_SCRIPT);
        if script.is_file() {
            log::info!("Chromium directory structure verified");
            Ok(script)
        } else {
            Err(ToolchainError::BuildScriptMissing { path: script })
        }
    }

    /// Describe the build-script invocation.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        let config = &self.config;
        let mut invocation = Invocation::new(&config.python)
            .arg(BUILD_SCRIPT)
            .args(BASE_FLAGS.iter().copied());
        if let Some(cc) = &config.host_cc {
            invocation = invocation.arg("--host-cc").arg(cc);
        }
        if let Some(cxx) = &config.host_cxx {
            invocation = invocation.arg("--host-cxx").arg(cxx);
        }
        if !config.assertions {
            invocation = invocation.arg("--disable-asserts");
        }
        invocation
            .current_dir(&self.scripts_dir())
            .env("CCACHE_DIR", config.ccache_dir.as_str())
            .env("CMAKE_BUILD_PARALLEL_LEVEL", config.jobs.to_string())
    }

    /// Run the build script to completion.
    ///
    /// An unsuccessful exit is reported as [`BuildStatus::Failed`] rather
    /// than an error so the caller can decide whether a partial build is
    /// usable.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::BuildScriptMissing`] if the checkout has no
    /// build script, or [`ToolchainError::Io`] if the ccache directory
    /// cannot be created or the interpreter cannot be spawned.
    pub fn invoke(&self) -> Result<BuildStatus> {
        self.verify_structure()?;
        std::fs::create_dir_all(&self.config.ccache_dir)?;
        log::info!("Ccache directory: {}", self.config.ccache_dir);
        log::info!("Using {} parallel jobs", self.config.jobs);

        let status = self.runner.status(&self.invocation())?;
        if status.success() {
            log::info!("Clang build completed");
            Ok(BuildStatus::Succeeded)
        } else {
            log::warn!("Clang build script exited with {status}");
            Ok(BuildStatus::Failed(status))
        }
    }

    /// Skip the build.
    #[must_use]
    pub fn skip(&self) -> BuildStatus {
        log::info!("Skipping clang build");
        BuildStatus::Skipped
    }
}

fn scripts_dir(checkout: &Utf8Path) -> Utf8PathBuf {
    SCRIPTS_DIR
        .iter()
        .fold(checkout.to_owned(), |acc, part| acc.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockCommandRunner;
    use crate::command::test_support::exit_status;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    struct Checkout {
        _temp: TempDir,
        config: BuildConfig,
    }

    #[fixture]
    fn checkout() -> Checkout {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf8");
        let config = BuildConfig {
            checkout: root.join("chromium"),
            python: "python3".to_owned(),
            ccache_dir: root.join("ccache"),
            host_cc: None,
            host_cxx: None,
            assertions: true,
            jobs: 8,
        };
        Checkout { _temp: temp, config }
    }

    fn add_build_script(config: &BuildConfig) {
        let dir = scripts_dir(&config.checkout);
        fs::create_dir_all(&dir).expect("mkdir scripts");
        fs::write(dir.join(BUILD_SCRIPT), b"").expect("write build.py");
    }

    #[rstest]
    fn invocation_uses_fixed_flags_and_environment(checkout: Checkout) {
        let runner = MockCommandRunner::new();
        let invoker = BuildInvoker::new(checkout.config.clone(), &runner);
        let invocation = invoker.invocation();

        assert_eq!(
            invocation.display(),
            "python3 build.py --without-android --without-fuchsia --with-ccache"
        );
        assert_eq!(invocation.current_dir, Some(invoker.scripts_dir()));
        assert!(
            invocation
                .env
                .contains(&("CMAKE_BUILD_PARALLEL_LEVEL".to_owned(), "8".to_owned()))
        );
        assert!(
            invocation
                .env
                .contains(&("CCACHE_DIR".to_owned(), checkout.config.ccache_dir.to_string()))
        );
    }

    #[rstest]
    fn optional_flags_follow_configuration(checkout: Checkout) {
        let runner = MockCommandRunner::new();
        let config = BuildConfig {
            host_cc: Some("/usr/bin/clang".to_owned()),
            host_cxx: Some("/usr/bin/clang++".to_owned()),
            assertions: false,
            ..checkout.config
        };
        let invocation = BuildInvoker::new(config, &runner).invocation();
        assert_eq!(
            invocation.args[4..],
            [
                "--host-cc",
                "/usr/bin/clang",
                "--host-cxx",
                "/usr/bin/clang++",
                "--disable-asserts"
            ]
        );
    }

    #[rstest]
    fn missing_build_script_is_reported(checkout: Checkout) {
        let runner = MockCommandRunner::new();
        let err = BuildInvoker::new(checkout.config, &runner)
            .invoke()
            .expect_err("no build script");
        assert!(matches!(err, ToolchainError::BuildScriptMissing { .. }));
    }

    #[rstest]
    #[case::success(0, BuildStatus::Succeeded)]
    #[case::failure(1, BuildStatus::Failed(exit_status(1)))]
    fn invoke_reports_exit_status(
        checkout: Checkout,
        #[case] code: i32,
        #[case] expected: BuildStatus,
    ) {
        add_build_script(&checkout.config);
        let mut runner = MockCommandRunner::new();
        runner
            .expect_status()
            .times(1)
            .returning(move |_| Ok(exit_status(code)));

        let status = BuildInvoker::new(checkout.config.clone(), &runner)
            .invoke()
            .expect("build ran");

        assert_eq!(status, expected);
        assert!(checkout.config.ccache_dir.is_dir());
    }

    #[rstest]
    fn skip_runs_nothing(checkout: Checkout) {
        let runner = MockCommandRunner::new();
        let status = BuildInvoker::new(checkout.config, &runner).skip();
        assert_eq!(status, BuildStatus::Skipped);
    }
}
