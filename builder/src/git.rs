//! Git operations for cloning and updating the chromium checkout.
//!
//! A missing checkout is cloned (shallow for `main`, full for any other
//! ref so the ref can be checked out); an existing checkout is fetched,
//! checked out at the ref and pulled. Every git call has a timeout.

use crate::error::{Result, ToolchainError};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Upstream chromium repository.
pub const CHROMIUM_REMOTE: &str = "https://chromium.googlesource.com/chromium/src.git";

/// Ref synced when none is given.
pub const DEFAULT_REF: &str = "main";

/// Default timeout for a single git operation (2 hours).
pub const GIT_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Brings a source checkout to a given ref.
#[cfg_attr(test, mockall::automock)]
pub trait SourceSync {
    /// Clone or update `checkout` so that it is at `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::Git`] if any git operation fails or times
    /// out.
    fn sync(&self, checkout: &Utf8Path, reference: &str) -> Result<()>;
}

/// One git command in a sync plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    /// Short operation name used in errors (clone, fetch, ...).
    pub operation: &'static str,
    /// Arguments after `git`.
    pub args: Vec<String>,
    /// Working directory, or `None` for a clone.
    pub working_dir: Option<Utf8PathBuf>,
}

impl GitCommand {
    fn new(operation: &'static str, args: &[&str], working_dir: Option<&Utf8Path>) -> Self {
        Self {
            operation,
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            working_dir: working_dir.map(Utf8Path::to_owned),
        }
    }
}

/// Compute the git commands that bring `checkout` to `reference`.
#[must_use]
pub fn sync_plan(
    remote: &str,
    checkout: &Utf8Path,
    reference: &str,
    checkout_exists: bool,
) -> Vec<GitCommand> {
    if checkout_exists {
        return vec![
            GitCommand::new("fetch", &["fetch", "origin"], Some(checkout)),
            GitCommand::new("checkout", &["checkout", reference], Some(checkout)),
            GitCommand::new("pull", &["pull", "origin", reference], Some(checkout)),
        ];
    }
    if reference == DEFAULT_REF {
        return vec![GitCommand::new(
            "clone",
            &["clone", "--depth", "1", remote, checkout.as_str()],
            None,
        )];
    }
    vec![
        GitCommand::new("clone", &["clone", remote, checkout.as_str()], None),
        GitCommand::new("checkout", &["checkout", reference], Some(checkout)),
    ]
}

/// Syncs a checkout with the `git` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSourceSync {
    remote: String,
    timeout: Duration,
}

impl Default for GitSourceSync {
    fn default() -> Self {
        Self::new(CHROMIUM_REMOTE)
    }
}

impl GitSourceSync {
    /// Create a syncer for `remote` with the default timeout.
    #[must_use]
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            timeout: GIT_TIMEOUT,
        }
    }

    /// Override the per-operation timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl SourceSync for GitSourceSync {
    fn sync(&self, checkout: &Utf8Path, reference: &str) -> Result<()> {
        let exists = checkout.exists();
        if exists {
            log::info!("Updating chromium checkout at {checkout} to {reference}");
        } else {
            log::info!("Cloning chromium ({reference}) into {checkout}");
            if let Some(parent) = checkout.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        for command in sync_plan(&self.remote, checkout, reference, exists) {
            let output = run_git_with_timeout("git", &command, self.timeout)?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(ToolchainError::Git {
                    operation: command.operation,
                    message: stderr.trim().to_owned(),
                });
            }
        }
        Ok(())
    }
}

/// Runs a git command with a timeout.
///
/// Both pipes are drained on helper threads while waiting so that verbose
/// git output cannot fill a pipe and stall the child. Returns the command
/// output if it completes within the timeout, or an error if the command
/// times out or fails to start.
fn run_git_with_timeout(program: &str, command: &GitCommand, timeout: Duration) -> Result<Output> {
    log::debug!("running git {}", command.args.join(" "));
    let mut cmd = Command::new(program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = &command.working_dir {
        cmd.current_dir(dir.as_std_path());
    }

    let mut child = cmd.spawn()?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    if let Some(status) = child.wait_timeout(timeout)? {
        Ok(Output {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    } else {
        let _ = child.kill();
        let _ = child.wait();
        Err(ToolchainError::Git {
            operation: command.operation,
            message: format!("operation timed out after {} seconds", timeout.as_secs()),
        })
    }
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buffer) {
            log::debug!("failed to read git output: {e}");
        }
        buffer
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
