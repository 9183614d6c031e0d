//! Anti-bot challenge detection.

use std::sync::LazyLock;

use regex::Regex;

static CHALLENGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:re)?captcha|verify (that )?you are (a )?human|are you a robot")
        .expect("valid regex")
});

/// Returns the matched phrase if the page text looks like a bot challenge.
pub fn detect_challenge(text: &str) -> Option<&str> {
    CHALLENGE_PATTERN.find(text).map(|m| m.as_str())
}
