//! Detail-page fetching.
//!
//! Every posting is loaded in its own browser context and checked for a bot
//! challenge before anything is extracted.

mod challenge;
mod content;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScoutError;

pub use challenge::detect_challenge;
pub use content::{extract_content, visible_text, PageContent, PageMetadata};
#[cfg(feature = "browser")]
pub use detail::DetailFetcher;

/// Fetches one posting page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Load `url` and return its content. `anchor_text` is the title of last
    /// resort.
    async fn fetch(&self, url: &str, anchor_text: &str) -> Result<PageContent, ScoutError>;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub navigation_timeout: Duration,
    /// Element whose presence means the posting has rendered.
    pub content_selector: Option<String>,
    pub selector_timeout: Duration,
    /// Extra wait after the content is ready.
    pub settle: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(60),
            content_selector: Some(r#"[data-automation-id="jobPostingDescription"]"#.to_string()),
            selector_timeout: Duration::from_secs(10),
            settle: Duration::from_millis(2500),
        }
    }
}

#[cfg(feature = "browser")]
mod detail {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tracing::{debug, warn};

    use super::{detect_challenge, extract_content, FetchConfig, PageContent, PageFetcher};
    use crate::browser::{goto, wait_for_selector, BrowserSession, IsolatedPage};
    use crate::error::ScoutError;

    const BODY_TEXT_SCRIPT: &str =
        "(() => (document.title || '') + '\\n' + (document.body ? document.body.innerText : ''))()";

    fn browser_err(e: impl std::fmt::Display) -> ScoutError {
        ScoutError::Browser(e.to_string())
    }

    /// Fetches postings through isolated contexts of a shared browser.
    pub struct DetailFetcher {
        session: Arc<BrowserSession>,
        config: FetchConfig,
    }

    impl DetailFetcher {
        pub fn new(session: Arc<BrowserSession>, config: FetchConfig) -> Self {
            Self { session, config }
        }

        async fn load(
            &self,
            isolated: &IsolatedPage,
            url: &str,
            anchor_text: &str,
        ) -> Result<PageContent, ScoutError> {
            let page = isolated.page();
            goto(page, url, self.config.navigation_timeout).await?;

            if let Some(ref selector) = self.config.content_selector {
                if !wait_for_selector(page, selector, self.config.selector_timeout).await {
                    debug!("Content selector missing on {}, continuing", url);
                }
            }
            tokio::time::sleep(self.config.settle).await;

            let body_text: String = page
                .evaluate(BODY_TEXT_SCRIPT)
                .await
                .map_err(browser_err)?
                .into_value()
                .map_err(browser_err)?;
            if let Some(phrase) = detect_challenge(&body_text) {
                warn!("Anti-bot challenge on {} ('{}')", url, phrase);
                return Err(ScoutError::AntiBotChallenge {
                    url: url.to_string(),
                });
            }

            let html = page.content().await.map_err(browser_err)?;
            let final_url = page
                .url()
                .await
                .map_err(browser_err)?
                .unwrap_or_else(|| url.to_string());
            Ok(extract_content(&html, url, &final_url, anchor_text))
        }
    }

    #[async_trait]
    impl PageFetcher for DetailFetcher {
        async fn fetch(&self, url: &str, anchor_text: &str) -> Result<PageContent, ScoutError> {
            let isolated = self.session.open_isolated().await?;
            let result = self.load(&isolated, url, anchor_text).await;
            isolated.close().await;
            result
        }
    }
}
