//! Chromium clang toolchain builder CLI entrypoint.
//!
//! This binary syncs chromium, builds the clang toolchain it pins, and
//! packages the installation. With `--get-llvm-revision` it only prints the
//! pinned revision.

use chromium_toolchain_builder::cli::Cli;
use chromium_toolchain_builder::command::SystemCommandRunner;
use chromium_toolchain_builder::config::{Config, Environment, resolve_options};
use chromium_toolchain_builder::error::Result;
use chromium_toolchain_builder::logging;
use chromium_toolchain_builder::output::{summary, write_stderr_line};
use chromium_toolchain_builder::pipeline::{self, Collaborators};
use clap::Parser;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level());
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let env = Environment::capture()?;
    let options = resolve_options(cli, &config, &env);
    let sync = config.source.source_sync();

    if cli.get_llvm_revision {
        let revision = pipeline::query_revision(&options, &sync)?;
        writeln!(stdout, "{}", revision.hash())?;
        return Ok(());
    }

    let runner = SystemCommandRunner;
    let report = pipeline::run(
        &options,
        &Collaborators {
            sync: &sync,
            runner: &runner,
        },
    )?;
    write_stderr_line(stderr, summary(&report));
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format_args!("error: {err}"));
            1
        }
    }
}
