//! Extract posting content from rendered detail-page HTML.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;

/// Longest title kept, in characters.
const MAX_TITLE_CHARS: usize = 200;

/// A container must yield more than this many characters to be used.
const MIN_DESCRIPTION_CHARS: usize = 200;

/// Description containers, most specific first.
const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"[data-automation-id="jobPostingDescription"]"#,
    "main",
    "article",
    r#"[role="main"]"#,
    "body",
];

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));

/// Structured fields some portals expose outside the description body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub location: Option<String>,
    pub time_type: Option<String>,
    pub posted_on: Option<String>,
}

impl PageMetadata {
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.time_type.is_none() && self.posted_on.is_none()
    }

    /// One line per present field, for appending to model input.
    pub fn as_lines(&self) -> String {
        let mut out = String::new();
        for (label, value) in [
            ("Location", &self.location),
            ("Time type", &self.time_type),
            ("Posted", &self.posted_on),
        ] {
            if let Some(v) = value {
                out.push_str(label);
                out.push_str(": ");
                out.push_str(v);
                out.push('\n');
            }
        }
        out
    }
}

/// What a detail fetch captured.
#[derive(Debug, Clone, Serialize)]
pub struct PageContent {
    pub url: String,
    pub final_url: String,
    pub title: String,
    pub text: String,
    #[serde(skip)]
    pub html: String,
    pub metadata: PageMetadata,
}

impl PageContent {
    /// Text handed to the model: metadata lines followed by the description.
    pub fn model_input(&self) -> String {
        if self.metadata.is_empty() {
            self.text.clone()
        } else {
            format!("{}\n{}", self.metadata.as_lines(), self.text)
        }
    }
}

/// Build [`PageContent`] from rendered HTML.
pub fn extract_content(
    html: &str,
    url: &str,
    final_url: &str,
    anchor_text: &str,
) -> PageContent {
    let document = Html::parse_document(html);

    let title = first_text(&document, "h1")
        .or_else(|| first_text(&document, "title"))
        .unwrap_or_else(|| anchor_text.trim().to_string());

    PageContent {
        url: url.to_string(),
        final_url: final_url.to_string(),
        title: truncate_chars(&title, MAX_TITLE_CHARS),
        text: description_text(&document),
        html: html.to_string(),
        metadata: PageMetadata {
            location: automation_field(&document, "locations"),
            time_type: automation_field(&document, "time"),
            posted_on: automation_field(&document, "postedOn"),
        },
    }
}

fn description_text(document: &Html) -> String {
    let mut fallback = String::new();
    for selector in DESCRIPTION_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        if let Some(el) = document.select(&sel).next() {
            let text = visible_text(el);
            if text.chars().count() > MIN_DESCRIPTION_CHARS {
                return text;
            }
            if text.len() > fallback.len() {
                fallback = text;
            }
        }
    }
    fallback
}

/// Text of an element, skipping script-like children and keeping block breaks.
pub fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(root, &mut out);
    let collapsed = WHITESPACE_RUN.replace_all(&out, " ");
    let lines: Vec<&str> = collapsed.lines().map(str::trim).collect();
    BLANK_LINES
        .replace_all(lines.join("\n").trim(), "\n\n")
        .to_string()
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) => {
                if SKIPPED_ELEMENTS.contains(&e.name()) {
                    continue;
                }
                let block = matches!(
                    e.name(),
                    "p" | "div" | "li" | "br" | "h1" | "h2" | "h3" | "h4" | "section" | "ul" | "tr"
                );
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|t| !t.is_empty())
}

/// Workday renders labelled fields as `<dl data-automation-id="..."><dt>Label</dt><dd>value</dd>`.
fn automation_field(document: &Html, id: &str) -> Option<String> {
    let sel = Selector::parse(&format!(r#"[data-automation-id="{id}"]"#)).ok()?;
    let el = document.select(&sel).next()?;
    let dd = Selector::parse("dd").ok()?;
    let text = match el.select(&dd).next() {
        Some(value) => value.text().collect::<Vec<_>>().join(" "),
        None => el.text().collect::<Vec<_>>().join(" "),
    };
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
