//! Tab-switching latency probe
//!
//! Drives a Chrome/Chromium instance over the DevTools Protocol: opens a
//! fixed set of local pages in new tabs, sweeps activation across them, then
//! scrapes the whiteout-duration histogram from the browser's debug log and
//! reports the average / standard deviation pair for the page cycler graphs.

pub mod browser;
pub mod config;
pub mod paths;
pub mod probe;
pub mod scrape;

use std::path::PathBuf;

/// Get log directory for the probe's own tracing output.
///
/// Distinct from the Chrome debug log the probe scrapes, which lives in the
/// browser profile directory.
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tabswitch-probe").join("logs"))
}

/// Initialize logging (console plus rolling file when a log dir is available)
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "tabswitch-probe.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}
