//! Browser session driver.
//!
//! Owns one Chrome instance (launched locally or reached over CDP) and hands
//! out pages. Search pages share the default context for the life of a site
//! visit; detail pages each get a throwaway browser context so cookies and
//! storage never leak between postings or back into the search page.

mod config;
#[cfg(feature = "browser")]
mod stealth;

pub use config::BrowserEngineConfig;

/// CDP messages chromiumoxide cannot decode. Chrome emits events newer than
/// the bundled protocol definitions; the connection itself is still healthy.
const UNDECODABLE_EVENT_MARKERS: &[&str] = &[
    "data did not match any variant of untagged enum Message",
    "Failed to deserialize WS response",
];

/// Whether a handler error only means an event could not be decoded.
pub fn is_undecodable_event(message: &str) -> bool {
    UNDECODABLE_EVENT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

#[cfg(feature = "browser")]
pub use driver::{goto, wait_for_selector, BrowserSession, IsolatedPage};

#[cfg(feature = "browser")]
mod driver {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
    use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
    use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
    use chromiumoxide::cdp::browser_protocol::target::{
        CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
    };
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;
    use tracing::{debug, error, info, trace, warn};

    use super::stealth::STEALTH_SCRIPTS;
    use super::BrowserEngineConfig;
    use crate::error::ScoutError;

    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &[&str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    const CHROME_COMMANDS: &[&str] = &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ];

    fn find_chrome() -> Result<PathBuf, ScoutError> {
        if let Some(path) = CHROME_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
        {
            info!("Found Chrome at: {}", path.display());
            return Ok(path);
        }
        if let Some(path) = CHROME_COMMANDS.iter().find_map(|cmd| which::which(cmd).ok()) {
            info!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
        Err(ScoutError::BrowserLaunch(
            "Chrome/Chromium not found; install it or set BROWSER_URL to a running instance"
                .to_string(),
        ))
    }

    fn launch_err(e: impl std::fmt::Display) -> ScoutError {
        ScoutError::BrowserLaunch(e.to_string())
    }

    fn browser_err(e: impl std::fmt::Display) -> ScoutError {
        ScoutError::Browser(e.to_string())
    }

    /// A running browser plus the task pumping its CDP events.
    pub struct BrowserSession {
        browser: Arc<Mutex<Browser>>,
        handler: JoinHandle<()>,
        config: BrowserEngineConfig,
    }

    impl BrowserSession {
        /// Launch a local browser, or connect to `remote_url` when configured.
        pub async fn launch(config: &BrowserEngineConfig) -> Result<Self, ScoutError> {
            let (browser, mut handler) = match config.remote_url {
                Some(ref remote) => {
                    let ws_url = resolve_ws_url(remote).await?;
                    info!("Connecting to remote browser at {}", ws_url);
                    Browser::connect(ws_url).await.map_err(launch_err)?
                }
                None => {
                    info!("Launching browser (headless={})", config.headless);
                    Browser::launch(build_launch_config(config)?)
                        .await
                        .map_err(launch_err)?
                }
            };

            // Keep pumping after errors: dropping the handler would strand
            // every pending CDP response.
            let handler = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if let Err(e) = h {
                        let message = e.to_string();
                        if super::is_undecodable_event(&message) {
                            trace!("Skipped undecodable CDP event: {}", message);
                        } else {
                            error!("Browser handler error: {:?}", e);
                        }
                    }
                }
                debug!("Browser handler finished");
            });

            Ok(Self {
                browser: Arc::new(Mutex::new(browser)),
                handler,
                config: config.clone(),
            })
        }

        /// Open a page in the default context.
        pub async fn new_page(&self) -> Result<Page, ScoutError> {
            let page = {
                let browser = self.browser.lock().await;
                browser.new_page("about:blank").await.map_err(browser_err)?
            };
            self.prepare(&page).await?;
            Ok(page)
        }

        /// Open a page in a fresh browser context.
        pub async fn open_isolated(&self) -> Result<IsolatedPage, ScoutError> {
            let (page, context_id) = {
                let browser = self.browser.lock().await;
                let context_id = browser
                    .execute(CreateBrowserContextParams::default())
                    .await
                    .map_err(browser_err)?
                    .result
                    .browser_context_id;
                let params = CreateTargetParams::builder()
                    .url("about:blank")
                    .browser_context_id(context_id.clone())
                    .build()
                    .map_err(browser_err)?;
                let page = browser.new_page(params).await.map_err(browser_err)?;
                (page, context_id)
            };
            self.prepare(&page).await?;

            Ok(IsolatedPage {
                page,
                context_id,
                browser: Arc::clone(&self.browser),
            })
        }

        async fn prepare(&self, page: &Page) -> Result<(), ScoutError> {
            page.execute(SetUserAgentOverrideParams::new(self.config.user_agent.clone()))
                .await
                .map_err(browser_err)?;
            if self.config.stealth {
                for script in STEALTH_SCRIPTS {
                    if let Err(e) = page
                        .execute(AddScriptToEvaluateOnNewDocumentParams::new(*script))
                        .await
                    {
                        debug!("Stealth script registration skipped: {}", e);
                    }
                }
            }
            Ok(())
        }

        /// Close the browser and stop the event pump.
        pub async fn close(self) {
            let mut browser = self.browser.lock().await;
            if self.config.remote_url.is_none() {
                if let Err(e) = browser.close().await {
                    warn!("Browser did not close cleanly: {}", e);
                }
                let _ = browser.wait().await;
            }
            self.handler.abort();
            info!("Browser session closed");
        }
    }

    fn build_launch_config(config: &BrowserEngineConfig) -> Result<BrowserConfig, ScoutError> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(find_chrome()?)
            .request_timeout(Duration::from_secs(config.request_timeout));

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--window-size=1366,900");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        builder.build().map_err(launch_err)
    }

    /// Resolve a DevTools HTTP or WebSocket URL to the browser WebSocket URL.
    async fn resolve_ws_url(remote: &str) -> Result<String, ScoutError> {
        let http_url = remote
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::get(&version_url)
            .await
            .map_err(launch_err)?
            .json()
            .await
            .map_err(launch_err)?;

        resp.get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| launch_err("no webSocketDebuggerUrl in /json/version response"))
    }

    /// A page living in its own browser context.
    pub struct IsolatedPage {
        page: Page,
        context_id: BrowserContextId,
        browser: Arc<Mutex<Browser>>,
    }

    impl IsolatedPage {
        pub fn page(&self) -> &Page {
            &self.page
        }

        /// Close the page and dispose its context.
        pub async fn close(self) {
            if let Err(e) = self.page.close().await {
                debug!("Page close failed: {}", e);
            }
            let browser = self.browser.lock().await;
            if let Err(e) = browser
                .execute(DisposeBrowserContextParams::new(self.context_id))
                .await
            {
                debug!("Browser context disposal failed: {}", e);
            }
        }
    }

    /// Navigate and wait for the load, bounded by `timeout`.
    pub async fn goto(page: &Page, url: &str, timeout: Duration) -> Result<(), ScoutError> {
        debug!("Navigating to {}", url);
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScoutError::navigation(url, e)),
            Err(_) => Err(ScoutError::navigation(
                url,
                format!("timed out after {}s", timeout.as_secs()),
            )),
        }
    }

    /// Wait for `selector` to appear. Returns false on timeout.
    pub async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> bool {
        let poll = async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        };
        match tokio::time::timeout(timeout, poll).await {
            Ok(()) => true,
            Err(_) => {
                debug!("Selector {} not found within {:?}", selector, timeout);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undecodable_events_are_recognized() {
        assert!(is_undecodable_event(
            "Serde(Error(\"data did not match any variant of untagged enum Message\", line: 0, column: 0))"
        ));
        assert!(is_undecodable_event("Failed to deserialize WS response: eof"));
        assert!(!is_undecodable_event("Ws(ConnectionClosed)"));
    }
}
