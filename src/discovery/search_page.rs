//! Browser-backed search session.

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::Page;
use tracing::{debug, info, warn};

use super::links::{candidate_links, CandidateLink};
use super::strategies::{
    activate_script, first_match, mark_selector, ElementProbe, Matcher, NEXT_STRATEGIES,
    SEARCH_INPUT_STRATEGIES, SORT_STRATEGIES,
};
use super::{SearchNavigator, SearchSession, SearchTimings};
use crate::browser::{goto, BrowserSession};
use crate::error::ScoutError;
use crate::sites::Site;

fn browser_err(e: impl std::fmt::Display) -> ScoutError {
    ScoutError::Browser(e.to_string())
}

#[async_trait]
impl ElementProbe for Page {
    async fn probe(&self, matcher: &Matcher, mark: &str) -> Result<bool, ScoutError> {
        self.evaluate(matcher.probe_script(mark))
            .await
            .map_err(browser_err)?
            .into_value::<bool>()
            .map_err(browser_err)
    }
}

async fn activate(page: &Page, mark: &str) -> Result<bool, ScoutError> {
    page.evaluate(activate_script(mark))
        .await
        .map_err(browser_err)?
        .into_value::<bool>()
        .map_err(browser_err)
}

/// Opens search pages in the shared browser session.
pub struct BrowserSearchNavigator {
    session: Arc<BrowserSession>,
    timings: SearchTimings,
}

impl BrowserSearchNavigator {
    pub fn new(session: Arc<BrowserSession>, timings: SearchTimings) -> Self {
        Self { session, timings }
    }
}

#[async_trait]
impl SearchNavigator for BrowserSearchNavigator {
    async fn open(
        &self,
        site: &Site,
        term: &str,
    ) -> Result<Option<Box<dyn SearchSession>>, ScoutError> {
        let page = self.session.new_page().await?;
        let mut search = BrowserSearchPage {
            page,
            site: site.clone(),
            timings: self.timings.clone(),
            page_index: 1,
        };

        match search.submit(term).await {
            Ok(true) => Ok(Some(Box::new(search))),
            Ok(false) => {
                search.close().await;
                Ok(None)
            }
            Err(e) => {
                search.close().await;
                Err(e)
            }
        }
    }
}

struct BrowserSearchPage {
    page: Page,
    site: Site,
    timings: SearchTimings,
    page_index: usize,
}

impl BrowserSearchPage {
    /// Load the search page and run the query. False if no input was found.
    async fn submit(&mut self, term: &str) -> Result<bool, ScoutError> {
        goto(&self.page, &self.site.url, self.timings.navigation_timeout).await?;
        tokio::time::sleep(self.timings.settle).await;

        let Some(strategy) = first_match(&self.page, SEARCH_INPUT_STRATEGIES, "search").await
        else {
            warn!("No search input found on {}", self.site.url);
            return Ok(false);
        };
        info!(
            "Searching '{}' on {} via {}",
            term, self.site.company, strategy.name
        );

        let input = self
            .page
            .find_element(mark_selector("search"))
            .await
            .map_err(browser_err)?;
        input
            .click()
            .await
            .map_err(browser_err)?
            .type_str(term)
            .await
            .map_err(browser_err)?
            .press_key("Enter")
            .await
            .map_err(browser_err)?;
        tokio::time::sleep(self.timings.post_search).await;

        if self.timings.sort_by_recent {
            self.sort_by_recent().await;
        }
        Ok(true)
    }

    /// Best effort; a missing or broken sort control leaves default ordering.
    async fn sort_by_recent(&self) {
        let Some(strategy) = first_match(&self.page, SORT_STRATEGIES, "sort").await else {
            debug!("No sort control on {}", self.site.url);
            return;
        };
        match activate(&self.page, "sort").await {
            Ok(true) => {
                debug!("Sorted by recency via {}", strategy.name);
                tokio::time::sleep(self.timings.sort_settle).await;
            }
            Ok(false) => debug!("Sort control vanished before activation"),
            Err(e) => debug!("Sort control failed: {}", e),
        }
    }
}

#[async_trait]
impl SearchSession for BrowserSearchPage {
    async fn candidates(&mut self) -> Result<Vec<CandidateLink>, ScoutError> {
        let html = self.page.content().await.map_err(browser_err)?;
        let current = self
            .page
            .url()
            .await
            .map_err(browser_err)?
            .unwrap_or_else(|| self.site.url.clone());
        let links = candidate_links(&html, &current, &self.site.url);
        debug!(
            "Page {} of {}: {} candidate links",
            self.page_index,
            self.site.company,
            links.len()
        );
        Ok(links)
    }

    async fn next_page(&mut self) -> Result<bool, ScoutError> {
        if first_match(&self.page, NEXT_STRATEGIES, "next").await.is_none() {
            return Ok(false);
        }
        if !activate(&self.page, "next").await? {
            return Ok(false);
        }

        // Client-rendered listings often swap results without navigating.
        if tokio::time::timeout(self.timings.next_timeout, self.page.wait_for_navigation())
            .await
            .is_err()
        {
            debug!("No navigation after Next on {}", self.site.url);
        }
        tokio::time::sleep(self.timings.next_settle).await;
        self.page_index += 1;
        Ok(true)
    }

    async fn close(&mut self) {
        if let Err(e) = self.page.clone().close().await {
            debug!("Search page close failed: {}", e);
        }
    }
}
