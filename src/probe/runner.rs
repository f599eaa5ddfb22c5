//! The tab-switching sweep
//!
//! Opens the fixture tabs, waits for the count to settle, activates each new
//! tab in ascending order with a confirmation wait between switches, closes
//! the browser, then scrapes the timings from the flushed debug log.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::tabset::{TabSet, TabSetError, TAB_SWITCHING_SITES};
use crate::browser::{BrowserError, TabController};
use crate::config::ProbeConfig;
use crate::paths::{self, PathError};
use crate::scrape::{self, ScrapeError, TabSwitchTimings};

/// Probe-level errors. All of these abort the run.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Tab set error: {0}")]
    TabSet(#[from] TabSetError),

    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Expected {expected} tabs after opening, found {actual}")]
    TabCountMismatch { expected: usize, actual: usize },
}

/// The tab-switching performance probe
pub struct TabSwitchProbe {
    config: ProbeConfig,
    tabset: TabSet,
    log_file: PathBuf,
}

impl TabSwitchProbe {
    /// Build the probe: resolve the fixture prefix, construct the tab set,
    /// and locate the debug log. Path resolution failure is fatal.
    pub fn new(config: ProbeConfig) -> Result<Self, ProbeError> {
        let prefix = paths::data_prefix(config.data_dir.as_deref().map(Path::new))?;
        let tabset = TabSet::from_sites(&prefix, &TAB_SWITCHING_SITES)?;
        let log_file = paths::chrome_log_file(&config.chrome_log_dir());

        info!(
            "Probe fixtures under {}, debug log at {}",
            prefix.display(),
            log_file.display()
        );

        Ok(Self {
            config,
            tabset,
            log_file,
        })
    }

    /// The tab targets this probe opens
    pub fn tabset(&self) -> &TabSet {
        &self.tabset
    }

    /// Open one tab per target, in list order. Returns the number of tabs
    /// requested. Does not wait for loads.
    pub async fn open_tabs<C: TabController + ?Sized>(
        &self,
        controller: &C,
    ) -> Result<usize, ProbeError> {
        let mut opened = 0;
        for entry in self.tabset.iter() {
            debug!("Opening tab for {}", entry.site());
            controller.open_tab(entry.url().as_str()).await?;
            opened += 1;
        }
        Ok(opened)
    }

    /// Drive the full switching sequence against the given controller
    pub async fn run_sequence<C: TabController + ?Sized>(
        &self,
        controller: &C,
    ) -> Result<(), ProbeError> {
        let timeout = Duration::from_millis(self.config.tab_wait_timeout_ms);

        let initial_tab_count = controller.tab_count().await?;
        debug!("Initial tab count: {}", initial_tab_count);

        let new_tab_count = self.open_tabs(controller).await?;
        let expected = initial_tab_count + new_tab_count;

        // Tab creation is asynchronous relative to the open requests
        let final_tab_count = controller.wait_for_tab_count(expected, timeout).await?;
        if final_tab_count != expected {
            return Err(ProbeError::TabCountMismatch {
                expected,
                actual: final_tab_count,
            });
        }

        info!(
            "Opened {} tabs ({} total), starting activation sweep",
            new_tab_count, final_tab_count
        );

        // Linear one-directional sweep over the new tabs. The whiteout
        // histogram is recorded under exactly this switching pattern, so
        // each activation must be confirmed before the next one is issued.
        for sweep in 0..self.config.iterations.max(1) {
            debug!("Activation sweep {}", sweep + 1);
            controller.activate_tab(0).await?;
            for index in initial_tab_count..final_tab_count {
                controller.activate_tab(index).await?;
                controller.wait_for_tab_active(index, timeout).await?;
            }
        }

        // Closing flushes the histogram dump. A failed close report may
        // still have flushed, so keep going and attempt the scrape.
        if let Err(e) = controller.close().await {
            warn!("Browser close failed, attempting log scrape anyway: {}", e);
        }

        Ok(())
    }

    /// Wait for the debug log to appear and scrape the timings from it
    pub async fn collect_timings(&self) -> Result<TabSwitchTimings, ProbeError> {
        let contents = scrape::poll_log(
            &self.log_file,
            self.config.poll_base_delay_ms,
            self.config.poll_max_delay_ms,
            self.config.log_poll_timeout_ms,
        )
        .await?;

        let timings = scrape::scrape_timings(&contents);
        info!(
            "Whiteout duration: average = {}, standard deviation = {}",
            timings.average, timings.std_dev
        );
        Ok(timings)
    }

    /// Run the whole probe: the switching sequence, then the log scrape
    pub async fn run<C: TabController + ?Sized>(
        &self,
        controller: &C,
    ) -> Result<TabSwitchTimings, ProbeError> {
        self.run_sequence(controller).await?;
        self.collect_timings().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const SAMPLE_LOG: &str = "Histogram: MPArch.RWHH_WhiteoutDuration recorded 30 samples, \
average = 512.00, standard deviation = 419.17 (flags = 0x1)\n";

    /// Scripted controller that records every call in order
    #[derive(Default)]
    struct MockController {
        ops: Mutex<Vec<String>>,
        initial_tabs: usize,
        /// Count reported once the wait settles; None echoes the expectation
        settle_count: Option<usize>,
        fail_close: bool,
    }

    impl MockController {
        fn new(initial_tabs: usize) -> Self {
            Self {
                initial_tabs,
                ..Default::default()
            }
        }

        fn record(&self, op: String) {
            self.ops.lock().unwrap().push(op);
        }

        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }

        fn opened(&self) -> usize {
            self.ops()
                .iter()
                .filter(|op| op.starts_with("open "))
                .count()
        }
    }

    #[async_trait]
    impl TabController for MockController {
        async fn tab_count(&self) -> Result<usize, BrowserError> {
            Ok(self.initial_tabs + self.opened())
        }

        async fn open_tab(&self, url: &str) -> Result<(), BrowserError> {
            self.record(format!("open {}", url));
            Ok(())
        }

        async fn wait_for_tab_count(
            &self,
            expected: usize,
            _timeout: Duration,
        ) -> Result<usize, BrowserError> {
            self.record(format!("wait_count {}", expected));
            Ok(self.settle_count.unwrap_or(expected))
        }

        async fn activate_tab(&self, index: usize) -> Result<(), BrowserError> {
            self.record(format!("activate {}", index));
            Ok(())
        }

        async fn wait_for_tab_active(
            &self,
            index: usize,
            _timeout: Duration,
        ) -> Result<(), BrowserError> {
            self.record(format!("wait_active {}", index));
            Ok(())
        }

        async fn close(&self) -> Result<(), BrowserError> {
            self.record("close".to_string());
            if self.fail_close {
                Err(BrowserError::CloseFailed("no close notification".into()))
            } else {
                Ok(())
            }
        }
    }

    fn probe_in(dir: &tempfile::TempDir, config: ProbeConfig) -> TabSwitchProbe {
        let config = config
            .data_dir(Some(dir.path().join("data").to_string_lossy().to_string()))
            .log_dir(Some(dir.path().to_string_lossy().to_string()));
        TabSwitchProbe::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_open_tabs_requests_one_per_site_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let probe = probe_in(&dir, ProbeConfig::default());
        let controller = MockController::new(1);

        let opened = probe.open_tabs(&controller).await.unwrap();
        assert_eq!(opened, TAB_SWITCHING_SITES.len());

        let ops = controller.ops();
        assert_eq!(ops.len(), TAB_SWITCHING_SITES.len());
        for (op, site) in ops.iter().zip(TAB_SWITCHING_SITES.iter()) {
            assert!(op.starts_with("open file://"), "unexpected op: {}", op);
            assert!(
                op.ends_with(&format!("/{}/index.html", site)),
                "op {} does not match site {}",
                op,
                site
            );
        }
    }

    #[tokio::test]
    async fn test_sequence_activates_in_ascending_order() {
        let dir = tempfile::tempdir().unwrap();
        let probe = probe_in(&dir, ProbeConfig::default());
        let controller = MockController::new(1);

        probe.run_sequence(&controller).await.unwrap();

        let ops = controller.ops();
        let n = TAB_SWITCHING_SITES.len();

        let mut expected: Vec<String> = Vec::new();
        expected.push(format!("wait_count {}", 1 + n));
        expected.push("activate 0".to_string());
        for index in 1..=n {
            expected.push(format!("activate {}", index));
            expected.push(format!("wait_active {}", index));
        }
        expected.push("close".to_string());

        // Everything after the open requests must match exactly
        assert_eq!(&ops[n..], expected.as_slice());
    }

    #[tokio::test]
    async fn test_tab_count_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let probe = probe_in(&dir, ProbeConfig::default());
        let mut controller = MockController::new(1);
        controller.settle_count = Some(TAB_SWITCHING_SITES.len() + 2);

        let err = probe.run_sequence(&controller).await.unwrap_err();
        assert!(matches!(
            err,
            ProbeError::TabCountMismatch {
                expected: 11,
                actual: 12
            }
        ));

        // The sweep must not start after a count mismatch
        assert!(!controller.ops().iter().any(|op| op.starts_with("activate")));
    }

    #[tokio::test]
    async fn test_close_failure_is_non_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let probe = probe_in(&dir, ProbeConfig::default());
        let mut controller = MockController::new(1);
        controller.fail_close = true;

        probe.run_sequence(&controller).await.unwrap();
        assert!(controller.ops().contains(&"close".to_string()));
    }

    #[tokio::test]
    async fn test_iterations_repeat_the_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let probe = probe_in(&dir, ProbeConfig::default().iterations(2));
        let controller = MockController::new(1);

        probe.run_sequence(&controller).await.unwrap();

        let ops = controller.ops();
        let first_activations = ops.iter().filter(|op| *op == "activate 0").count();
        let last_waits = ops
            .iter()
            .filter(|op| *op == &format!("wait_active {}", TAB_SWITCHING_SITES.len()))
            .count();
        assert_eq!(first_activations, 2);
        assert_eq!(last_waits, 2);
    }

    #[tokio::test]
    async fn test_run_scrapes_flushed_log() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chrome_debug.log"), SAMPLE_LOG).unwrap();

        let probe = probe_in(&dir, ProbeConfig::default());
        let controller = MockController::new(1);

        let timings = probe.run(&controller).await.unwrap();
        assert_eq!(timings.average, "512.00");
        assert_eq!(timings.std_dev, "419.17");
        assert_eq!(timings.report_line(), "__tsw_timings = [512.00,419.17]");
    }
}
