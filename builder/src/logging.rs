//! Timestamped stderr logger.
//!
//! Records are written as `YYYY-MM-DD hh:mm:ss - LEVEL - message`, one per
//! line, with UTC timestamps.

use log::{LevelFilter, Metadata, Record};
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

static LOGGER: StderrLogger = StderrLogger;

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(now_epoch_secs(), record);
        let mut stderr = std::io::stderr().lock();
        if writeln!(stderr, "{line}").is_err() {
            // Nowhere left to report the failure.
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the stderr logger with `max_level`.
///
/// Calling this more than once keeps the first logger and only updates the
/// level.
pub fn init(max_level: LevelFilter) {
    if log::set_logger(&LOGGER).is_err() {
        log::debug!("logger already installed");
    }
    log::set_max_level(max_level);
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

fn format_record(epoch_secs: u64, record: &Record<'_>) -> String {
    format!(
        "{} - {} - {}",
        format_timestamp(epoch_secs),
        record.level(),
        record.args()
    )
}

/// Format a Unix timestamp as `YYYY-MM-DD hh:mm:ss`.
fn format_timestamp(epoch_secs: u64) -> String {
    let (year, month, day) = civil_from_epoch(epoch_secs);
    let day_secs = epoch_secs % 86_400;
    let hour = day_secs / 3_600;
    let minute = (day_secs % 3_600) / 60;
    let second = day_secs % 60;
    format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
}

/// Convert a Unix timestamp to `(year, month, day)` using Howard Hinnant's
/// `civil_from_days` algorithm.
#[expect(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "day counts fit in i64 and post-epoch years are positive"
)]
fn civil_from_epoch(epoch_secs: u64) -> (u32, u32, u32) {
    let z = (epoch_secs / 86_400) as i64 + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097) as u64;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = (yoe as i64) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y as u32, m as u32, d as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use rstest::rstest;

    #[rstest]
    #[case::epoch(0, "1970-01-01 00:00:00")]
    #[case::leap_day(951_782_400, "2000-02-29 00:00:00")]
    #[case::end_of_year(1_735_689_599, "2024-12-31 23:59:59")]
    #[case::afternoon(1_760_450_400, "2025-10-14 14:00:00")]
    fn timestamps_use_calendar_dates(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_timestamp(secs), expected);
    }

    #[test]
    fn records_carry_timestamp_and_level() {
        let line = format_record(
            0,
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("packaging {}", "clang"))
                .build(),
        );
        assert_eq!(
            line,
            "1970-01-01 00:00:00 - WARN - packaging clang"
        );
    }
}
