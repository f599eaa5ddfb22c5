//! Tab-switching latency probe - entry point
//!
//! Opens the captured-site fixtures in new tabs, sweeps activation across
//! them, and prints the scraped whiteout-duration timings on stdout for the
//! page cycler graphing tools.
//!
//! Configuration comes from `TSW_*` environment variables and an optional
//! JSON file (`TSW_CONFIG`); see `config.rs` for the full list.

use tracing::info;

use tabswitch_probe::browser::BrowserSession;
use tabswitch_probe::config::ProbeConfig;
use tabswitch_probe::probe::TabSwitchProbe;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = tabswitch_probe::init_logging();

    info!("Starting tab-switching latency probe");
    if let Some(dir) = tabswitch_probe::log_dir() {
        info!("Log files saved to: {}", dir.display());
    }

    let config = ProbeConfig::load();
    let probe = TabSwitchProbe::new(config.clone())?;

    let session = BrowserSession::new(config.session_config()).await?;
    let timings = probe.run(&session).await?;

    // Machine-readable result line; the format is a consumed contract and
    // must stay byte-exact.
    println!("{}", timings.report_line());

    Ok(())
}
