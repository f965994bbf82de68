//! End-of-run summary and stderr helpers for the CLI.

use crate::invoker::BuildStatus;
use crate::pipeline::BuildReport;
use std::fmt::Write as _;
use std::io::Write;
use std::time::Duration;

/// Write `message` and a newline to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Render the summary of a finished run.
#[must_use]
pub fn summary(report: &BuildReport) -> String {
    let mut text = String::from("Build summary:\n");
    let mut line = |label: &str, value: &dyn std::fmt::Display| {
        let _ = writeln!(text, "  {label:<15} {value}");
    };

    if let Some(revision) = &report.revision {
        line("Clang revision:", revision);
    }
    if let Some(version) = &report.package_version {
        line("Package:", &version.package_name());
    }
    line("Build:", &build_label(report.build));
    line("Toolchain:", &report.toolchain.root());
    if let Some(version) = &report.compiler_version {
        line("Compiler:", version);
    }
    if let Some(package) = &report.package {
        line("Archive:", &package.archive_path);
        line("SHA-256:", &package.sha256);
        line("Members:", &package.members.len());
    }
    line("Elapsed:", &format_elapsed(report.elapsed));
    text
}

fn build_label(status: BuildStatus) -> String {
    match status {
        BuildStatus::Succeeded => "succeeded".to_owned(),
        BuildStatus::Failed(exit) => format!("failed ({exit}); bootstrap compiler used"),
        BuildStatus::Skipped => "skipped".to_owned(),
    }
}

/// Format a duration as `Xh MMm SSs`, dropping leading zero units.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use chromium_toolchain_builder::output::format_elapsed;
///
/// assert_eq!(format_elapsed(Duration::from_secs(3_725)), "1h 02m 05s");
/// ```
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, minutes, seconds) = (total / 3_600, (total % 3_600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::test_support::exit_status;
    use crate::package::{PackageOutput, PackageVersion};
    use crate::revision::extract_revision;
    use crate::toolchain::{LocatedToolchain, ToolchainKind};
    use camino::Utf8PathBuf;
    use rstest::rstest;

    fn report() -> BuildReport {
        let version =
            PackageVersion::try_from("llvmorg-19-init-1234-abcdef1234567890-1").expect("version");
        BuildReport {
            revision: Some(
                extract_revision("'clang-llvmorg-19-init-1234-abcdef1234567890-1.tar.xz'")
                    .expect("revision"),
            ),
            package: Some(PackageOutput {
                archive_path: Utf8PathBuf::from(format!("/dist/{}", version.archive_filename())),
                members: vec!["bin/clang".to_owned(), "bin/lld".to_owned()],
                sha256: "ab".repeat(32),
            }),
            package_version: Some(version),
            build: BuildStatus::Succeeded,
            toolchain: LocatedToolchain::new(
                Utf8PathBuf::from("/src/third_party/llvm-build/Release+Asserts"),
                ToolchainKind::Release,
            ),
            compiler_version: None,
            elapsed: Duration::from_secs(95),
        }
    }

    #[test]
    fn summary_lists_archive_details() {
        let text = summary(&report());
        assert!(text.contains("abcdef1234567890"), "{text}");
        assert!(text.contains("/src/third_party/llvm-build/Release+Asserts"));
        assert!(text.contains("/dist/clang-llvmorg-19-init-1234-abcdef1234567890-1.tar.xz"));
        assert!(text.contains(&"ab".repeat(32)));
        assert!(
            text.lines()
                .any(|l| l.trim_start().starts_with("Members:") && l.ends_with(" 2")),
            "{text}"
        );
        assert!(text.contains("1m 35s"));
    }

    #[test]
    fn summary_marks_bootstrap_recovery() {
        let report = BuildReport {
            build: BuildStatus::Failed(exit_status(1)),
            package: None,
            ..report()
        };
        let text = summary(&report);
        assert!(text.contains("bootstrap compiler used"), "{text}");
        assert!(!text.contains("Archive:"));
    }

    #[rstest]
    #[case::seconds(7, "7s")]
    #[case::minutes(600, "10m 00s")]
    #[case::hours(7_384, "2h 03m 04s")]
    fn elapsed_drops_leading_zero_units(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_elapsed(Duration::from_secs(secs)), expected);
    }

    #[test]
    fn stderr_lines_end_with_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "done");
        assert_eq!(buffer, b"done\n");
    }
}
