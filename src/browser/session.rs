//! Browser session management
//!
//! Handles launching and controlling the Chrome instance the probe drives.
//! The session keeps its tab handles in creation order so tabs can be
//! addressed by ordinal index during the activation sweep.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{BrowserError, TabController};

/// Global counter for sequential session naming (Probe-1, Probe-2, ...)
static SESSION_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Interval between checks inside the bounded wait loops
const WAIT_POLL_INTERVAL_MS: u64 = 50;

/// Find Chrome/Chromium executable on the system
fn find_chrome() -> Option<std::path::PathBuf> {
    let candidates: Vec<std::path::PathBuf> = if cfg!(target_os = "windows") {
        let mut paths = vec![
            std::path::PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            std::path::PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ];
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            paths.push(std::path::PathBuf::from(format!(
                r"{}\Google\Chrome\Application\chrome.exe",
                local
            )));
        }
        paths
    } else if cfg!(target_os = "macos") {
        vec![
            std::path::PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            std::path::PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    } else {
        vec![
            std::path::PathBuf::from("/usr/bin/google-chrome"),
            std::path::PathBuf::from("/usr/bin/google-chrome-stable"),
            std::path::PathBuf::from("/usr/bin/chromium"),
            std::path::PathBuf::from("/usr/bin/chromium-browser"),
        ]
    };

    candidates.into_iter().find(|p| p.exists())
}

/// Configuration for a browser session
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSessionConfig {
    /// Path to Chrome/Chromium executable
    pub chrome_path: Option<String>,
    /// Run in headless mode
    pub headless: bool,
    /// User data directory; chrome_debug.log is written here
    pub user_data_dir: Option<String>,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
    /// Launch with --enable-logging --dump-histograms-on-exit. The
    /// whiteout-duration histogram only reaches the debug log with these.
    pub enable_logging: bool,
}

impl Default for BrowserSessionConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: false,
            user_data_dir: None,
            window_width: 1920,
            window_height: 1080,
            enable_logging: true,
        }
    }
}

impl BrowserSessionConfig {
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

    /// Set user data directory
    pub fn user_data_dir(mut self, dir: Option<String>) -> Self {
        self.user_data_dir = dir;
        self
    }
}

/// A browser session driving one Chrome instance
pub struct BrowserSession {
    /// Unique session ID (display name, e.g. "Probe-1")
    pub id: String,
    /// The browser instance
    browser: Arc<RwLock<Option<Browser>>>,
    /// Tab handles in creation order; index N here is tab index N
    tabs: Arc<RwLock<Vec<Page>>>,
    /// Whether the session is alive (cleared when the CDP handler ends)
    alive: Arc<AtomicBool>,
}

impl BrowserSession {
    /// Launch a new browser session with the given config
    pub async fn new(config: BrowserSessionConfig) -> Result<Self, BrowserError> {
        let session_id = format!("Probe-{}", SESSION_COUNTER.fetch_add(1, Ordering::Relaxed));

        info!(
            "Launching browser session {} (headless: {})",
            session_id, config.headless
        );

        if config.chrome_path.is_none() && find_chrome().is_none() {
            return Err(BrowserError::LaunchFailed(
                "Chrome/Chromium not found. Install Chrome or set TSW_CHROME_PATH.".to_string(),
            ));
        }

        let mut builder = BrowserConfig::builder();

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        } else if let Some(chrome_path) = find_chrome() {
            info!("Auto-detected Chrome at: {}", chrome_path.display());
            builder = builder.chrome_executable(chrome_path);
        }

        if let Some(ref dir) = config.user_data_dir {
            let _ = std::fs::create_dir_all(dir);
            builder = builder.user_data_dir(dir);
        }

        if config.enable_logging {
            builder = builder.arg("--enable-logging").arg("--dump-histograms-on-exit");
        }

        builder = builder
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            // Required when running as root (e.g. in Docker or on a CI box)
            .arg("--no-sandbox")
            .window_size(config.window_width, config.window_height);

        let browser_config = builder.build().map_err(BrowserError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        // Drive the CDP event stream; when it ends, Chrome has disconnected
        let session_id_clone = session_id.clone();
        let alive_flag = Arc::new(AtomicBool::new(true));
        let alive_for_handler = alive_flag.clone();
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Session {} browser event: {:?}", session_id_clone, event);
            }
            warn!(
                "Session {} Chrome disconnected (event handler ended)",
                session_id_clone
            );
            alive_for_handler.store(false, Ordering::Relaxed);
        });

        // Chrome opens with a blank tab; seed the ordered tab list with it
        let initial_pages = browser
            .pages()
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let tabs = if initial_pages.is_empty() {
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
            vec![page]
        } else {
            initial_pages
        };

        info!(
            "Browser session {} created ({} initial tab(s))",
            session_id,
            tabs.len()
        );

        Ok(Self {
            id: session_id,
            browser: Arc::new(RwLock::new(Some(browser))),
            tabs: Arc::new(RwLock::new(tabs)),
            alive: alive_flag,
        })
    }

    /// Check if the session is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Handle for the tab at `index`
    async fn tab(&self, index: usize) -> Result<Page, BrowserError> {
        let tabs = self.tabs.read().await;
        tabs.get(index)
            .cloned()
            .ok_or(BrowserError::TabNotFound(index))
    }

    /// Count of page targets as reported by the browser
    async fn page_count(&self) -> Result<usize, BrowserError> {
        let browser = self.browser.read().await;
        let browser = browser
            .as_ref()
            .ok_or_else(|| BrowserError::ConnectionLost("Browser already closed".into()))?;

        let pages = browser
            .pages()
            .await
            .map_err(|e| BrowserError::ConnectionLost(e.to_string()))?;

        Ok(pages.len())
    }
}

#[async_trait]
impl TabController for BrowserSession {
    async fn tab_count(&self) -> Result<usize, BrowserError> {
        self.page_count().await
    }

    async fn open_tab(&self, url: &str) -> Result<(), BrowserError> {
        let page = {
            let browser = self.browser.read().await;
            let browser = browser
                .as_ref()
                .ok_or_else(|| BrowserError::ConnectionLost("Browser already closed".into()))?;

            debug!("Session {} opening tab: {}", self.id, url);
            browser
                .new_page(url)
                .await
                .map_err(|e| BrowserError::TabOpenFailed(e.to_string()))?
        };

        self.tabs.write().await.push(page);
        Ok(())
    }

    async fn wait_for_tab_count(
        &self,
        expected: usize,
        timeout: Duration,
    ) -> Result<usize, BrowserError> {
        tokio::time::timeout(timeout, async {
            loop {
                if !self.is_alive() {
                    return Err(BrowserError::ConnectionLost(
                        "Chrome exited while waiting for tabs".into(),
                    ));
                }
                let count = self.page_count().await?;
                if count >= expected {
                    return Ok(count);
                }
                sleep(Duration::from_millis(WAIT_POLL_INTERVAL_MS)).await;
            }
        })
        .await
        .map_err(|_| {
            BrowserError::Timeout(format!(
                "Tab count did not reach {} within {}ms",
                expected,
                timeout.as_millis()
            ))
        })?
    }

    async fn activate_tab(&self, index: usize) -> Result<(), BrowserError> {
        let page = self.tab(index).await?;

        debug!("Session {} activating tab {}", self.id, index);
        page.bring_to_front()
            .await
            .map_err(|e| BrowserError::ActivationFailed(e.to_string()))?;

        Ok(())
    }

    async fn wait_for_tab_active(
        &self,
        index: usize,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let page = self.tab(index).await?;

        tokio::time::timeout(timeout, async {
            loop {
                if !self.is_alive() {
                    return Err(BrowserError::ConnectionLost(
                        "Chrome exited while waiting for activation".into(),
                    ));
                }
                let state: String = page
                    .evaluate("document.visibilityState")
                    .await
                    .map_err(|e| BrowserError::ActivationFailed(e.to_string()))?
                    .into_value()
                    .map_err(|e| BrowserError::ActivationFailed(e.to_string()))?;

                if state == "visible" {
                    return Ok(());
                }
                sleep(Duration::from_millis(WAIT_POLL_INTERVAL_MS)).await;
            }
        })
        .await
        .map_err(|_| {
            BrowserError::Timeout(format!(
                "Tab {} did not become active within {}ms",
                index,
                timeout.as_millis()
            ))
        })?
    }

    async fn close(&self) -> Result<(), BrowserError> {
        // Mark as not alive first to stop the wait loops
        self.alive.store(false, Ordering::Relaxed);

        let close_result = {
            let mut browser = self.browser.write().await;
            match browser.take() {
                Some(mut b) => {
                    // Graceful close triggers the histogram dump; the grace
                    // period lets it reach the debug log before the hard kill.
                    let result = b
                        .close()
                        .await
                        .map(|_| ())
                        .map_err(|e| BrowserError::CloseFailed(e.to_string()));
                    sleep(Duration::from_millis(500)).await;
                    let _ = b.kill().await;
                    result
                }
                None => Ok(()),
            }
        };

        self.tabs.write().await.clear();

        close_result?;
        info!("Browser session {} closed", self.id);
        Ok(())
    }
}
