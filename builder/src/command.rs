//! External command execution.
//!
//! Every subprocess the builder spawns (git, the clang build script, strip,
//! the toolchain smoke test) goes through [`CommandRunner`] so that callers
//! can substitute a stub in tests.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use std::process::{Command, ExitStatus, Output};

/// A fully described subprocess invocation.
///
/// The working directory is always explicit; nothing relies on the
/// current directory of the builder process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory for the child process.
    pub current_dir: Option<Utf8PathBuf>,
    /// Extra environment variables for the child process.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Create an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: &Utf8Path) -> Self {
        self.current_dir = Some(dir.to_owned());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Render the invocation for log messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build the corresponding [`Command`].
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir.as_std_path());
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Run the command to completion, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while spawning or waiting on the child.
    fn output(&self, invocation: &Invocation) -> io::Result<Output>;

    /// Run the command to completion with inherited stdio.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while spawning or waiting on the child.
    fn status(&self, invocation: &Invocation) -> io::Result<ExitStatus>;
}

/// Runs commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn output(&self, invocation: &Invocation) -> io::Result<Output> {
        log::debug!("running (captured): {}", invocation.display());
        invocation.to_command().output()
    }

    fn status(&self, invocation: &Invocation) -> io::Result<ExitStatus> {
        log::info!("Running: {}", invocation.display());
        invocation.to_command().status()
    }
}

/// Return the trimmed stderr of `output`, or a placeholder when empty.
#[must_use]
pub fn stderr_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "unknown error".to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers for building fake process results.

    use std::process::{ExitStatus, Output};

    /// Creates an `ExitStatus` from an exit code (Unix implementation).
    #[cfg(unix)]
    pub(crate) fn exit_status(code: i32) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;

        ExitStatus::from_raw(code << 8)
    }

    /// Creates an `ExitStatus` from an exit code (Windows implementation).
    #[cfg(windows)]
    pub(crate) fn exit_status(code: i32) -> ExitStatus {
        use std::os::windows::process::ExitStatusExt;

        ExitStatus::from_raw(code as u32)
    }

    /// Creates a command `Output` with the given code and stdout.
    pub(crate) fn output_with(code: i32, stdout: &str) -> Output {
        Output {
            status: exit_status(code),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }
}
