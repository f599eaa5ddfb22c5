//! Chrome debug log polling and histogram scraping
//!
//! After the browser closes, the probe waits for chrome_debug.log to become
//! readable and extracts the whiteout-duration average / standard deviation
//! from the dumped histogram block. Values pass through as decimal text;
//! the probe never parses them numerically.

use std::path::Path;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

/// Histogram block the timings are scraped from
pub const HISTOGRAM_MARKER: &str = "Histogram: MPArch.RWHH_WhiteoutDuration";

const AVERAGE_MARKER: &str = "average = ";
const STD_DEV_MARKER: &str = "standard deviation = ";

/// Value reported when a field is missing from the log
const DEFAULT_VALUE: &str = "0.0";

/// Log scraping errors
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Log file {path} not readable after {waited_ms}ms")]
    PollTimedOut { path: String, waited_ms: u64 },
}

/// Scraped tab-switch timings, as decimal text
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TabSwitchTimings {
    pub average: String,
    pub std_dev: String,
}

impl Default for TabSwitchTimings {
    fn default() -> Self {
        Self {
            average: DEFAULT_VALUE.to_string(),
            std_dev: DEFAULT_VALUE.to_string(),
        }
    }
}

impl TabSwitchTimings {
    /// The machine-readable result line consumed by the page cycler
    /// graphing tools. Format: `__tsw_timings = [512.00,419.17]`, no space
    /// after the comma.
    pub fn report_line(&self) -> String {
        format!("__tsw_timings = [{},{}]", self.average, self.std_dev)
    }
}

/// Calculate a retry delay with exponential backoff and +/-20% jitter
fn backoff_with_jitter(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let base_delay = base_ms * 2u64.pow(attempt.saturating_sub(1).min(5));
    let capped_delay = base_delay.min(max_ms);

    let jitter_range = capped_delay / 5;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range * 2) as i64 - jitter_range as i64
    } else {
        0
    };

    Duration::from_millis((capped_delay as i64 + jitter).max(0) as u64)
}

/// Read the debug log, retrying until it exists and is readable.
///
/// The browser flushes the log on close, but the flush lands at its own
/// pace, so the poll has no attempt cap. Each failed attempt sleeps with
/// backoff rather than spinning. `timeout_ms` bounds the whole poll when
/// non-zero; 0 waits forever.
pub async fn poll_log(
    path: &Path,
    base_delay_ms: u64,
    max_delay_ms: u64,
    timeout_ms: u64,
) -> Result<String, ScrapeError> {
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                if attempt > 0 {
                    debug!(
                        "Log {} became readable after {} attempt(s)",
                        path.display(),
                        attempt + 1
                    );
                }
                return Ok(contents);
            }
            Err(e) => {
                attempt = attempt.saturating_add(1);

                if timeout_ms > 0 && started.elapsed() >= Duration::from_millis(timeout_ms) {
                    return Err(ScrapeError::PollTimedOut {
                        path: path.display().to_string(),
                        waited_ms: started.elapsed().as_millis() as u64,
                    });
                }

                let delay = backoff_with_jitter(attempt, base_delay_ms, max_delay_ms);
                debug!(
                    "Log {} not readable yet ({}), retrying in {}ms",
                    path.display(),
                    e,
                    delay.as_millis()
                );
                sleep(delay).await;
            }
        }
    }
}

/// Extract the field between `marker` and the next `terminator`.
///
/// Returns the field and the remainder of the haystack after it, or None
/// when either the marker or the terminator is missing.
fn field_after<'a>(haystack: &'a str, marker: &str, terminator: char) -> Option<(&'a str, &'a str)> {
    let start = haystack.find(marker)? + marker.len();
    let rest = &haystack[start..];
    let end = rest.find(terminator)?;
    Some((&rest[..end], &rest[end..]))
}

/// Scrape the average and standard deviation from dumped histogram text.
///
/// Fields default to "0.0": when the histogram block is absent, and per
/// field when its marker or terminator is missing after the block was
/// found. The standard deviation is searched from the end of the average
/// field, matching the order the histogram is printed in.
pub fn scrape_timings(contents: &str) -> TabSwitchTimings {
    let mut timings = TabSwitchTimings::default();

    let Some(pos) = contents.find(HISTOGRAM_MARKER) else {
        return timings;
    };

    let mut tail = &contents[pos + HISTOGRAM_MARKER.len()..];

    if let Some((value, rest)) = field_after(tail, AVERAGE_MARKER, ',') {
        timings.average = value.to_string();
        tail = rest;
    }

    if let Some((value, _)) = field_after(tail, STD_DEV_MARKER, ' ') {
        timings.std_dev = value.to_string();
    }

    timings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_LOG: &str = "\
[1234:5678:0101/120000:INFO:histograms] Histogram: MPArch.RWHH_WhiteoutDuration \
recorded 30 samples, average = 512.00, standard deviation = 419.17 (flags = 0x1)\n";

    #[test]
    fn test_scrape_well_formed_histogram() {
        let timings = scrape_timings(SAMPLE_LOG);
        assert_eq!(timings.average, "512.00");
        assert_eq!(timings.std_dev, "419.17");
        assert_eq!(timings.report_line(), "__tsw_timings = [512.00,419.17]");
    }

    #[test]
    fn test_scrape_missing_histogram_yields_defaults() {
        let timings = scrape_timings("no histograms were dumped\n");
        assert_eq!(timings.average, "0.0");
        assert_eq!(timings.std_dev, "0.0");
        assert_eq!(timings.report_line(), "__tsw_timings = [0.0,0.0]");
    }

    #[test]
    fn test_scrape_missing_average_falls_back() {
        let log = "Histogram: MPArch.RWHH_WhiteoutDuration recorded 0 samples\n";
        let timings = scrape_timings(log);
        assert_eq!(timings.average, "0.0");
        assert_eq!(timings.std_dev, "0.0");
    }

    #[test]
    fn test_scrape_truncated_average_falls_back() {
        // Marker present but no terminating comma
        let log = "Histogram: MPArch.RWHH_WhiteoutDuration average = 512.00";
        let timings = scrape_timings(log);
        assert_eq!(timings.average, "0.0");
        assert_eq!(timings.std_dev, "0.0");
    }

    #[test]
    fn test_scrape_missing_std_dev_keeps_average() {
        let log = "Histogram: MPArch.RWHH_WhiteoutDuration average = 512.00, samples = 30\n";
        let timings = scrape_timings(log);
        assert_eq!(timings.average, "512.00");
        assert_eq!(timings.std_dev, "0.0");
    }

    #[test]
    fn test_scrape_is_idempotent() {
        assert_eq!(scrape_timings(SAMPLE_LOG), scrape_timings(SAMPLE_LOG));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let d1 = backoff_with_jitter(1, 100, 10_000);
        let d6 = backoff_with_jitter(6, 100, 10_000);
        // Attempt 1 is 100ms +/- 20%, attempt 6 caps at 100 * 2^5 = 3200ms
        assert!(d1.as_millis() >= 80 && d1.as_millis() <= 120);
        assert!(d6.as_millis() >= 2560 && d6.as_millis() <= 3840);
    }

    #[tokio::test]
    async fn test_poll_log_returns_contents_once_file_appears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chrome_debug.log");

        let write_path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let mut file = std::fs::File::create(&write_path).unwrap();
            file.write_all(SAMPLE_LOG.as_bytes()).unwrap();
        });

        let contents = poll_log(&path, 10, 50, 0).await.unwrap();
        assert!(contents.contains(HISTOGRAM_MARKER));
    }

    #[tokio::test]
    async fn test_poll_log_honors_outer_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never_written.log");

        let err = poll_log(&path, 10, 50, 200).await.unwrap_err();
        assert!(matches!(err, ScrapeError::PollTimedOut { .. }));
    }
}
