//! Ordered element-matching strategies for career-site search pages.
//!
//! Each list is tried top to bottom and the first strategy that finds a
//! visible, enabled element wins. The lists are plain data so new portal
//! layouts only need a new entry.

use async_trait::async_trait;
use tracing::debug;

use crate::error::ScoutError;

/// How to find an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// First visible element matching a CSS selector.
    Css(&'static str),
    /// First visible element matching `selector` whose text contains `text`
    /// (case-insensitive).
    Text {
        selector: &'static str,
        text: &'static str,
    },
}

/// A named matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub matcher: Matcher,
}

const fn css(name: &'static str, selector: &'static str) -> Strategy {
    Strategy {
        name,
        matcher: Matcher::Css(selector),
    }
}

const fn text(name: &'static str, selector: &'static str, text: &'static str) -> Strategy {
    Strategy {
        name,
        matcher: Matcher::Text { selector, text },
    }
}

/// Keyword inputs, most specific first.
pub const SEARCH_INPUT_STRATEGIES: &[Strategy] = &[
    css("search-type-input", r#"input[type="search"]"#),
    css("placeholder-search", r#"input[placeholder*="search" i]"#),
    css("placeholder-keyword", r#"input[placeholder*="keyword" i]"#),
    css("aria-label-search", r#"input[aria-label*="search" i]"#),
    css("generic-text-input", r#"input[type="text"]"#),
];

/// "Sort by most recent" controls.
pub const SORT_STRATEGIES: &[Strategy] = &[
    text("button-date", "button", "date"),
    text("button-recent", "button", "recent"),
    text("button-newest", "button", "newest"),
    text("select-option-date", "select option", "date"),
    css("aria-label-sort", r#"[aria-label*="sort" i]"#),
];

/// Pagination controls.
pub const NEXT_STRATEGIES: &[Strategy] = &[
    text("link-next", "a", "next"),
    text("button-next", "button", "next"),
    css("aria-label-next", r#"[aria-label*="next" i]"#),
];

/// Attribute used to tag the element a probe found.
pub const MARK_ATTRIBUTE: &str = "data-jobscout-mark";

impl Matcher {
    /// Script that tags the first matching element with [`MARK_ATTRIBUTE`]
    /// set to `mark` and evaluates to whether one was found.
    pub fn probe_script(&self, mark: &str) -> String {
        let (selector, needle) = match self {
            Matcher::Css(selector) => (*selector, None),
            Matcher::Text { selector, text } => (*selector, Some(text.to_lowercase())),
        };
        let selector = js_string(selector);
        let needle = needle.as_deref().map(js_string).unwrap_or_else(|| "null".to_string());
        let mark = js_string(mark);
        let attr = js_string(MARK_ATTRIBUTE);

        format!(
            r#"(() => {{
    const attr = {attr};
    document.querySelectorAll('[' + attr + ']').forEach(e => e.removeAttribute(attr));
    const needle = {needle};
    const visible = e => e.tagName === 'OPTION' || !!(e.offsetWidth || e.offsetHeight || e.getClientRects().length);
    const enabled = e => !e.disabled && e.getAttribute('aria-disabled') !== 'true';
    const text = e => ((e.innerText || e.textContent || '') + ' ' + (e.getAttribute('aria-label') || '')).toLowerCase();
    let found = null;
    try {{
        found = Array.from(document.querySelectorAll({selector}))
            .find(e => visible(e) && enabled(e) && (needle === null || text(e).includes(needle)));
    }} catch (err) {{
        return false;
    }}
    if (!found) return false;
    found.setAttribute(attr, {mark});
    return true;
}})()"#
        )
    }
}

/// Script that activates the element tagged with `mark`: selects it if it is
/// an `<option>`, clicks it otherwise.
pub fn activate_script(mark: &str) -> String {
    let selector = js_string(&mark_selector(mark));
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return false;
    if (el.tagName === 'OPTION') {{
        el.selected = true;
        el.parentElement && el.parentElement.dispatchEvent(new Event('change', {{ bubbles: true }}));
    }} else {{
        el.click();
    }}
    return true;
}})()"#
    )
}

/// CSS selector for the element tagged with `mark`.
pub fn mark_selector(mark: &str) -> String {
    format!(r#"[{MARK_ATTRIBUTE}="{mark}"]"#)
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Something that can test a matcher against a live page.
#[async_trait]
pub trait ElementProbe: Send + Sync {
    /// Tag the first element matching `matcher` with `mark`.
    async fn probe(&self, matcher: &Matcher, mark: &str) -> Result<bool, ScoutError>;
}

/// Evaluate strategies in order and return the first that matches.
///
/// Probe errors count as "no match" so one broken selector cannot hide the
/// rest of the list.
pub async fn first_match<'s, P: ElementProbe + ?Sized>(
    probe: &P,
    strategies: &'s [Strategy],
    mark: &str,
) -> Option<&'s Strategy> {
    for strategy in strategies {
        match probe.probe(&strategy.matcher, mark).await {
            Ok(true) => {
                debug!("Strategy '{}' matched", strategy.name);
                return Some(strategy);
            }
            Ok(false) => {}
            Err(e) => debug!("Strategy '{}' failed: {}", strategy.name, e),
        }
    }
    None
}
