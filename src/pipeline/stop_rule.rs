//! Per-site traversal state and the consecutive-duplicate stop rule.
//!
//! Results are assumed to be ordered newest first, so a run of postings we
//! already know means the rest of the listing is old.

use std::fmt;

use crate::discovery::CandidateLink;

pub const DEFAULT_DUPLICATE_THRESHOLD: usize = 5;
pub const DEFAULT_MAX_PAGES: usize = 50;

/// Why traversal of a site ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The consecutive-duplicate counter reached the threshold.
    DuplicateRun,
    PageLimit,
    NoNextControl,
    NoSearchInput,
    /// The next page showed the same candidates as the last one.
    NoProgress,
    Failed(String),
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRun => write!(f, "duplicate run"),
            Self::PageLimit => write!(f, "page limit"),
            Self::NoNextControl => write!(f, "end of results"),
            Self::NoSearchInput => write!(f, "no search input"),
            Self::NoProgress => write!(f, "no progress"),
            Self::Failed(e) => write!(f, "failed: {e}"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Ephemeral state for one visit to one site.
#[derive(Debug)]
pub struct SiteTraversal {
    page_index: usize,
    consecutive_duplicates: usize,
    threshold: usize,
    max_pages: usize,
    stopped: Option<StopReason>,
    last_page: Option<Vec<String>>,
}

impl SiteTraversal {
    pub fn new(threshold: usize, max_pages: usize) -> Self {
        Self {
            page_index: 1,
            consecutive_duplicates: 0,
            threshold: threshold.max(1),
            max_pages: max_pages.max(1),
            stopped: None,
            last_page: None,
        }
    }

    /// 1-based index of the current result page.
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn consecutive_duplicates(&self) -> usize {
        self.consecutive_duplicates
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stopped.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }

    /// Record the first reason only.
    pub fn stop(&mut self, reason: StopReason) {
        if self.stopped.is_none() {
            self.stopped = Some(reason);
        }
    }

    /// Count a known URL. Returns true once the threshold is reached.
    pub fn record_duplicate(&mut self) -> bool {
        self.consecutive_duplicates += 1;
        if self.consecutive_duplicates >= self.threshold {
            self.stop(StopReason::DuplicateRun);
        }
        self.is_stopped()
    }

    /// A new URL resets the run.
    pub fn record_new(&mut self) {
        self.consecutive_duplicates = 0;
    }

    /// Whether another page may be visited. Records `PageLimit` if not.
    pub fn can_advance(&mut self) -> bool {
        if self.page_index >= self.max_pages {
            self.stop(StopReason::PageLimit);
            return false;
        }
        !self.is_stopped()
    }

    pub fn advance_page(&mut self) {
        self.page_index += 1;
    }

    /// Remember this page's candidates and report whether they repeat the
    /// previous page's. An empty page never counts as a repeat.
    pub fn is_repeat(&mut self, candidates: &[CandidateLink]) -> bool {
        let urls: Vec<String> = candidates.iter().map(|c| c.url.clone()).collect();
        let repeat = !urls.is_empty() && self.last_page.as_ref() == Some(&urls);
        self.last_page = Some(urls);
        repeat
    }
}
