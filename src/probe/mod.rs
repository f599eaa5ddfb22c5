//! Tab-switching performance probe
//!
//! Orchestrates the fixed browser sequence and the debug-log scrape that
//! produces the reported timing pair.

mod runner;
mod tabset;

pub use runner::{ProbeError, TabSwitchProbe};
pub use tabset::{TabEntry, TabSet, TabSetError, TAB_SWITCHING_SITES};
