//! Browser engine configuration.

use serde::{Deserialize, Serialize};

/// Browser engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false for debugging or if headless detection is an issue.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Upper bound for a single CDP request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// User agent presented to career sites.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Apply stealth evasion scripts to every page.
    #[serde(default = "default_stealth")]
    pub stealth: bool,
}

fn default_headless() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    120
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_stealth() -> bool {
    true
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            chrome_args: Vec::new(),
            remote_url: None,
            stealth: default_stealth(),
        }
    }
}

impl BrowserEngineConfig {
    /// Apply environment variable overrides.
    ///
    /// - `BROWSER_URL`: remote DevTools endpoint
    /// - `BROWSER_HEADLESS`: "false" to show the window
    /// - `BROWSER_PROXY`: proxy server URL
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("BROWSER_URL") {
            if !val.trim().is_empty() {
                self.remote_url = Some(val);
            }
        }
        if let Ok(val) = std::env::var("BROWSER_HEADLESS") {
            self.headless = !(val.eq_ignore_ascii_case("false") || val == "0");
        }
        if let Ok(val) = std::env::var("BROWSER_PROXY") {
            if !val.trim().is_empty() {
                self.proxy = Some(val);
            }
        }
        self
    }
}
