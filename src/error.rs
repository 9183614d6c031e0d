//! Error taxonomy for the discovery and enrichment pipeline.
//!
//! Item-level errors (navigation, anti-bot, extraction) are caught by the
//! orchestrator and recorded. Configuration and browser launch failures are
//! fatal at startup.

use thiserror::Error;

use crate::enrichment::ExtractionError;
use crate::geocode::GeocodeError;
use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("anti-bot challenge detected at {url}")]
    AntiBotChallenge { url: String },

    #[error("extraction failed: {0}")]
    ExtractionFailed(#[from] ExtractionError),

    #[error("language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("geocode lookup failed: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Coarse classification used in reports and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Navigation,
    AntiBot,
    Extraction,
    Geocode,
    Configuration,
    BrowserLaunch,
    Browser,
    Database,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::AntiBot => "anti_bot",
            Self::Extraction => "extraction",
            Self::Geocode => "geocode",
            Self::Configuration => "configuration",
            Self::BrowserLaunch => "browser_launch",
            Self::Browser => "browser",
            Self::Database => "database",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ScoutError {
    pub fn navigation(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Navigation { .. } => ErrorKind::Navigation,
            Self::AntiBotChallenge { .. } => ErrorKind::AntiBot,
            // A model that cannot be reached yields no structured output either.
            Self::ExtractionFailed(_) | Self::Llm(_) => ErrorKind::Extraction,
            Self::Geocode(_) => ErrorKind::Geocode,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::BrowserLaunch(_) => ErrorKind::BrowserLaunch,
            Self::Browser(_) => ErrorKind::Browser,
            Self::Database(_) => ErrorKind::Database,
        }
    }

    /// Whether this error should stop the process instead of a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::BrowserLaunch(_)
        )
    }

    pub fn is_anti_bot(&self) -> bool {
        matches!(self, Self::AntiBotChallenge { .. })
    }
}
