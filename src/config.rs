//! Probe configuration
//!
//! Loaded from an optional JSON file (`TSW_CONFIG`) with environment
//! variable overrides, so the probe can run unattended on test machines.
//!
//! Environment variables:
//! - `TSW_CONFIG` - path to a JSON config file
//! - `TSW_CHROME_PATH` - Chrome/Chromium executable
//! - `TSW_HEADLESS` - "1"/"true" to run headless
//! - `TSW_DATA_DIR` - fixture tree override (default: exe-relative)
//! - `TSW_LOG_DIR` - Chrome debug log directory override
//! - `TSW_USER_DATA_DIR` - browser profile directory
//! - `TSW_ITERATIONS` - number of activation sweeps per run
//! - `TSW_TAB_WAIT_TIMEOUT_MS` - tab count / activation wait bound
//! - `TSW_LOG_POLL_TIMEOUT_MS` - outer bound on the log poll (0 = unbounded)

use std::path::PathBuf;

use tracing::{info, warn};

use crate::browser::BrowserSessionConfig;

/// Probe configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeConfig {
    /// Path to Chrome/Chromium executable (auto-detected when unset)
    pub chrome_path: Option<String>,
    /// Run the browser headless. The measured sweep wants a visible window,
    /// so this defaults to false.
    #[serde(default)]
    pub headless: bool,
    /// Browser profile directory; also where Chrome writes chrome_debug.log
    pub user_data_dir: Option<String>,
    /// Fixture tree override (default: exe-relative data/tab_switching)
    pub data_dir: Option<String>,
    /// Chrome debug log directory override (default: the profile directory)
    pub log_dir: Option<String>,

    /// Bound on the tab-count and tab-activation waits, in milliseconds
    #[serde(default = "default_tab_wait_timeout_ms")]
    pub tab_wait_timeout_ms: u64,

    /// Base delay between log poll attempts
    #[serde(default = "default_poll_base_delay_ms")]
    pub poll_base_delay_ms: u64,
    /// Cap on the backed-off poll delay
    #[serde(default = "default_poll_max_delay_ms")]
    pub poll_max_delay_ms: u64,
    /// Outer bound on the whole log poll; 0 = wait forever
    #[serde(default)]
    pub log_poll_timeout_ms: u64,

    /// Number of activation sweeps per run
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Window width
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

fn default_tab_wait_timeout_ms() -> u64 {
    10_000
}

fn default_poll_base_delay_ms() -> u64 {
    100
}

fn default_poll_max_delay_ms() -> u64 {
    2_000
}

fn default_iterations() -> u32 {
    1
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: false,
            user_data_dir: None,
            data_dir: None,
            log_dir: None,
            tab_wait_timeout_ms: default_tab_wait_timeout_ms(),
            poll_base_delay_ms: default_poll_base_delay_ms(),
            poll_max_delay_ms: default_poll_max_delay_ms(),
            log_poll_timeout_ms: 0,
            iterations: default_iterations(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl ProbeConfig {
    /// Load config: JSON file when `TSW_CONFIG` points at one, then
    /// environment overrides on top.
    pub fn load() -> Self {
        let mut config = match std::env::var("TSW_CONFIG") {
            Ok(path) => Self::load_from_file(&path),
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load config from a JSON file, falling back to defaults on any error
    pub fn load_from_file(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!("Loaded config from {}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Apply `TSW_*` overrides from the given lookup (the environment in
    /// production, a map in tests)
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(path) = get("TSW_CHROME_PATH") {
            self.chrome_path = Some(path);
        }
        if let Some(headless) = get("TSW_HEADLESS") {
            self.headless = matches!(headless.as_str(), "1" | "true" | "yes");
        }
        if let Some(dir) = get("TSW_USER_DATA_DIR") {
            self.user_data_dir = Some(dir);
        }
        if let Some(dir) = get("TSW_DATA_DIR") {
            self.data_dir = Some(dir);
        }
        if let Some(dir) = get("TSW_LOG_DIR") {
            self.log_dir = Some(dir);
        }
        if let Some(iterations) = get("TSW_ITERATIONS").and_then(|v| v.parse().ok()) {
            self.iterations = iterations;
        }
        if let Some(ms) = get("TSW_TAB_WAIT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.tab_wait_timeout_ms = ms;
        }
        if let Some(ms) = get("TSW_LOG_POLL_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.log_poll_timeout_ms = ms;
        }
    }

    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set Chrome path
    pub fn chrome_path(mut self, path: Option<String>) -> Self {
        self.chrome_path = path;
        self
    }

    /// Set the fixture tree override
    pub fn data_dir(mut self, dir: Option<String>) -> Self {
        self.data_dir = dir;
        self
    }

    /// Set the Chrome debug log directory override
    pub fn log_dir(mut self, dir: Option<String>) -> Self {
        self.log_dir = dir;
        self
    }

    /// Set the browser profile directory
    pub fn user_data_dir(mut self, dir: Option<String>) -> Self {
        self.user_data_dir = dir;
        self
    }

    /// Set the number of activation sweeps
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// The browser profile directory, materialized.
    ///
    /// Defaults under the system temp dir so repeated runs reuse one
    /// predictable location. The Chrome debug log lands here unless
    /// `log_dir` overrides it.
    pub fn profile_dir(&self) -> PathBuf {
        match &self.user_data_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join("tabswitch-probe").join("profile"),
        }
    }

    /// Directory the Chrome debug log is read from
    pub fn chrome_log_dir(&self) -> PathBuf {
        match &self.log_dir {
            Some(dir) => PathBuf::from(dir),
            None => self.profile_dir(),
        }
    }

    /// Build the browser session config for this probe run
    pub fn session_config(&self) -> BrowserSessionConfig {
        BrowserSessionConfig {
            chrome_path: self.chrome_path.clone(),
            headless: self.headless,
            user_data_dir: Some(self.profile_dir().to_string_lossy().to_string()),
            window_width: self.window_width,
            window_height: self.window_height,
            enable_logging: true,
        }
    }
}
