//! Tab control capability
//!
//! The probe drives the browser through this trait only: tab count, tab
//! open, bounded waits, activation by ordinal index, and close. The live
//! implementation is [`super::BrowserSession`]; tests drive the probe with a
//! scripted stand-in.

use std::time::Duration;

use async_trait::async_trait;

use super::BrowserError;

/// Tab-level browser control.
///
/// Tab indices are stable and contiguous from 0 to `tab_count() - 1` for the
/// duration of a probe run; no other actor opens or closes tabs while the
/// probe is driving.
#[async_trait]
pub trait TabController: Send + Sync {
    /// Current number of open tabs
    async fn tab_count(&self) -> Result<usize, BrowserError>;

    /// Open a new tab navigated to the given URL. Does not wait for the
    /// page to finish loading.
    async fn open_tab(&self, url: &str) -> Result<(), BrowserError>;

    /// Block until the tab count reaches `expected`, returning the count.
    /// Tab creation is asynchronous relative to `open_tab`, so callers must
    /// wait before addressing tabs by index.
    async fn wait_for_tab_count(
        &self,
        expected: usize,
        timeout: Duration,
    ) -> Result<usize, BrowserError>;

    /// Request activation of the tab at `index`
    async fn activate_tab(&self, index: usize) -> Result<(), BrowserError>;

    /// Block until the tab at `index` reports itself active
    async fn wait_for_tab_active(
        &self,
        index: usize,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    /// Close the browser. Closing flushes the histogram dump to the debug
    /// log, so callers scrape only after this returns.
    async fn close(&self) -> Result<(), BrowserError>;
}
