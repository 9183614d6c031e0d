//! Link discovery on career-site search pages.
//!
//! A [`SearchNavigator`] opens a site's search page and submits the term; the
//! resulting [`SearchSession`] yields filtered candidate links page by page.
//! The browser-backed implementation lives in `search_page`; the pipeline
//! only sees the traits.

pub mod links;
#[cfg(feature = "browser")]
mod search_page;
pub mod strategies;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScoutError;
use crate::sites::Site;

pub use links::{candidate_links, extract_anchors, CandidateLink, LinkFilter, RawAnchor};
#[cfg(feature = "browser")]
pub use search_page::BrowserSearchNavigator;
pub use strategies::{
    first_match, ElementProbe, Matcher, Strategy, NEXT_STRATEGIES, SEARCH_INPUT_STRATEGIES,
    SORT_STRATEGIES,
};

/// Waits applied while driving a search page.
#[derive(Debug, Clone)]
pub struct SearchTimings {
    pub navigation_timeout: Duration,
    /// After the search page loads.
    pub settle: Duration,
    /// After the term is submitted.
    pub post_search: Duration,
    /// After the sort control is activated.
    pub sort_settle: Duration,
    /// Bound on waiting for navigation after "Next".
    pub next_timeout: Duration,
    /// After moving to the next page.
    pub next_settle: Duration,
    /// Try to sort results by recency.
    pub sort_by_recent: bool,
}

impl Default for SearchTimings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(90),
            settle: Duration::from_millis(4000),
            post_search: Duration::from_millis(5000),
            sort_settle: Duration::from_millis(3000),
            next_timeout: Duration::from_secs(60),
            next_settle: Duration::from_millis(3000),
            sort_by_recent: true,
        }
    }
}

/// Opens search sessions for sites.
#[async_trait]
pub trait SearchNavigator: Send + Sync {
    /// Load the site's search page and submit `term`.
    ///
    /// Returns `Ok(None)` when no search input could be located.
    async fn open(
        &self,
        site: &Site,
        term: &str,
    ) -> Result<Option<Box<dyn SearchSession>>, ScoutError>;
}

/// A live, paginated result listing.
#[async_trait]
pub trait SearchSession: Send {
    /// Candidate links on the current result page, in page order.
    async fn candidates(&mut self) -> Result<Vec<CandidateLink>, ScoutError>;

    /// Advance to the next result page. Returns false when there is none.
    async fn next_page(&mut self) -> Result<bool, ScoutError>;

    /// Release the underlying page.
    async fn close(&mut self);
}
