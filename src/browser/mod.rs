//! Browser automation module
//!
//! Launches and controls a single Chrome/Chromium instance over the
//! DevTools Protocol for the tab-switching sweep.

mod controller;
mod errors;
mod session;

pub use controller::TabController;
pub use errors::BrowserError;
pub use session::{BrowserSession, BrowserSessionConfig};
