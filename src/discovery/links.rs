//! Candidate link extraction and filtering.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::sites::strip_query;

/// Shortest anchor text worth considering.
const MIN_ANCHOR_TEXT_LEN: usize = 5;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// URL shapes used by common applicant tracking systems for posting pages.
static JOB_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)/jobs?/|_jr\d|_jr-|jobid=|job_id=|jobs/details|opportunityid|requisition|reqid=",
    )
    .expect("valid regex")
});

static JOB_TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(manager|engineer|analyst|director|lead|specialist|associate|vice president|avp|svp|vp|officer|consultant|designer|developer|architect)\b",
    )
    .expect("valid regex")
});

/// Site chrome and legal links that happen to match the URL heuristics.
static EXCLUDED_TEXT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)skip to (main )?content|cookie|privacy|terms|accessibility|\bsign ?in\b|\blog ?in\b|sign ?up|forgot|saved jobs|create (a )?profile|join now|user agreement",
    )
    .expect("valid regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// An anchor as rendered, with its href resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnchor {
    pub href: String,
    pub text: String,
}

/// A link suspected of pointing at a job-detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub url: String,
    pub anchor_text: String,
}

/// Pull every usable anchor out of rendered HTML.
///
/// Relative hrefs are resolved against `page_url`. Fragment-only links,
/// `mailto:`, `tel:` and `javascript:` targets and anchors with too little
/// text are dropped.
pub fn extract_anchors(html: &str, page_url: &str) -> Vec<RawAnchor> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim();
            if href.is_empty() || href.starts_with('#') {
                return None;
            }
            let lowered = href.to_ascii_lowercase();
            if ["mailto:", "tel:", "javascript:"]
                .iter()
                .any(|scheme| lowered.starts_with(scheme))
            {
                return None;
            }

            let raw_text: String = el.text().collect::<Vec<_>>().join(" ");
            let text = WHITESPACE.replace_all(raw_text.trim(), " ").to_string();
            if text.chars().count() <= MIN_ANCHOR_TEXT_LEN {
                return None;
            }

            let mut resolved = match base {
                Some(ref b) => b.join(href).ok()?,
                None => Url::parse(href).ok()?,
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                return None;
            }
            resolved.set_fragment(None);

            Some(RawAnchor {
                href: resolved.to_string(),
                text,
            })
        })
        .collect()
}

/// Decides which anchors on a search page are job postings.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    base_url: String,
}

impl LinkFilter {
    pub fn new(search_url: &str) -> Self {
        Self {
            base_url: normalize(search_url),
        }
    }

    pub fn is_candidate(&self, anchor: &RawAnchor) -> bool {
        if EXCLUDED_TEXT_PATTERN.is_match(&anchor.text) {
            return false;
        }
        if normalize(&anchor.href) == self.base_url {
            return false;
        }
        JOB_URL_PATTERN.is_match(&anchor.href) || JOB_TITLE_PATTERN.is_match(&anchor.text)
    }

    /// Filter anchors into candidates, first occurrence of each URL wins.
    pub fn candidates(&self, anchors: Vec<RawAnchor>) -> Vec<CandidateLink> {
        let mut seen = HashSet::new();
        anchors
            .into_iter()
            .filter(|a| self.is_candidate(a))
            .filter(|a| seen.insert(a.href.clone()))
            .map(|a| CandidateLink {
                url: a.href,
                anchor_text: a.text,
            })
            .collect()
    }
}

fn normalize(url: &str) -> String {
    strip_query(url).trim_end_matches('/').to_string()
}

/// Extract and filter in one step.
pub fn candidate_links(html: &str, page_url: &str, search_url: &str) -> Vec<CandidateLink> {
    LinkFilter::new(search_url).candidates(extract_anchors(html, page_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_URL: &str = "https://acme.wd5.myworkdayjobs.com/en-US/External?q=data";

    const RESULTS_PAGE: &str = r##"
        <html><body>
          <a href="#main">Skip to main content</a>
          <nav>
            <a href="/en-US/External">Search for Jobs</a>
            <a href="/en-US/External/login">Sign In to your account</a>
            <a href="/privacy">Privacy Policy</a>
            <a href="mailto:talent@acme.com">Email the recruiters</a>
            <a href="tel:+15551234">Call us anytime</a>
          </nav>
          <ul>
            <li><a href="/en-US/External/job/Austin-TX/Data-Engineer_JR-1001">
                  Senior   Data
                  Engineer
                </a></li>
            <li><a href="/en-US/External/job/Remote/Analytics-Lead_JR-1002#apply">Analytics Lead</a></li>
            <li><a href="https://careers.other.com/opening?jobId=77">Platform role, remote</a></li>
            <li><a href="/teams/engineering">Meet our Engineering Manager team</a></li>
            <li><a href="/en-US/External/job/Austin-TX/Data-Engineer_JR-1001">Senior Data Engineer</a></li>
            <li><a href="/benefits">Benefits</a></li>
            <li><a href="/en-US/External/job/Pune/Intern_JR-1003">Jobs</a></li>
            <li><a href="/life">Life at Acme and our culture</a></li>
          </ul>
        </body></html>
    "##;

    #[test]
    fn test_extract_anchors_resolves_and_cleans() {
        let anchors = extract_anchors(RESULTS_PAGE, SEARCH_URL);
        let first_job = anchors
            .iter()
            .find(|a| a.href.ends_with("Data-Engineer_JR-1001"))
            .unwrap();
        assert_eq!(
            first_job.href,
            "https://acme.wd5.myworkdayjobs.com/en-US/External/job/Austin-TX/Data-Engineer_JR-1001"
        );
        assert_eq!(first_job.text, "Senior Data Engineer");

        assert!(anchors.iter().all(|a| !a.href.starts_with("mailto:")));
        assert!(anchors.iter().all(|a| !a.href.starts_with("tel:")));
        assert!(anchors.iter().all(|a| !a.href.contains('#')));
        // Text must be longer than five characters.
        assert!(anchors.iter().all(|a| a.text != "Jobs"));
        assert!(anchors.iter().any(|a| a.text == "Benefits"));
    }

    #[test]
    fn test_candidates_filtered_in_order() {
        let links = candidate_links(RESULTS_PAGE, SEARCH_URL, SEARCH_URL);
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://acme.wd5.myworkdayjobs.com/en-US/External/job/Austin-TX/Data-Engineer_JR-1001",
                "https://acme.wd5.myworkdayjobs.com/en-US/External/job/Remote/Analytics-Lead_JR-1002",
                "https://careers.other.com/opening?jobId=77",
                "https://acme.wd5.myworkdayjobs.com/teams/engineering",
            ]
        );
        assert_eq!(links[1].anchor_text, "Analytics Lead");
    }

    #[test]
    fn test_exclusions_win_over_url_patterns() {
        let filter = LinkFilter::new(SEARCH_URL);
        let anchor = RawAnchor {
            href: "https://acme.com/jobs/saved".into(),
            text: "Saved Jobs (3)".into(),
        };
        assert!(!filter.is_candidate(&anchor));

        let anchor = RawAnchor {
            href: "https://acme.com/jobs/cookies".into(),
            text: "Cookie preferences".into(),
        };
        assert!(!filter.is_candidate(&anchor));
    }

    #[test]
    fn test_base_url_rejected() {
        let filter = LinkFilter::new("https://acme.com/jobs/search?q=x");
        let anchor = RawAnchor {
            href: "https://acme.com/jobs/search/".into(),
            text: "Engineer openings".into(),
        };
        assert!(!filter.is_candidate(&anchor));
    }

    #[test]
    fn test_title_vocabulary_is_word_bounded() {
        let filter = LinkFilter::new(SEARCH_URL);
        let hit = RawAnchor {
            href: "https://acme.com/x/123".into(),
            text: "Solutions Architect".into(),
        };
        let miss = RawAnchor {
            href: "https://acme.com/x/124".into(),
            text: "Leadership principles".into(),
        };
        assert!(filter.is_candidate(&hit));
        assert!(!filter.is_candidate(&miss));
    }
}
