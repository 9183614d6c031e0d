//! Configuration for jobscout.
//!
//! Settings come from an optional TOML file (`--config`, else `./jobscout.toml`)
//! with environment variables layered on top. Every section has working
//! defaults, so no file is required.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::browser::BrowserEngineConfig;
use crate::discovery::SearchTimings;
use crate::error::ScoutError;
use crate::fetch::FetchConfig;
use crate::geocode::GeocodeConfig;
use crate::llm::LlmConfig;
use crate::pipeline::{DiscoverySettings, DEFAULT_BATCH_SIZE, DEFAULT_DUPLICATE_THRESHOLD, DEFAULT_MAX_PAGES};
use crate::repository::{DieselJobRepository, SqlitePool};

/// Config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "jobscout.toml";
pub const DATABASE_FILENAME: &str = "jobs.db";
pub const SITES_FILENAME: &str = "sites.txt";
pub const DEFAULT_SEARCH_TERM: &str = "data engineer";

/// Pipeline tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Consecutive known postings that end a site visit.
    pub duplicate_threshold: usize,
    /// Concurrent jobs per enrichment batch.
    pub batch_size: usize,
    /// Result pages visited per site.
    pub max_pages: usize,
    pub courtesy_delay_ms: u64,
    pub cooldown_ms: u64,
    pub site_delay_ms: u64,
    pub cycle_interval_secs: u64,
    pub search_settle_ms: u64,
    pub post_search_ms: u64,
    pub sort_settle_ms: u64,
    pub sort_by_recent: bool,
    pub detail_settle_ms: u64,
    pub search_timeout_secs: u64,
    pub detail_timeout_secs: u64,
    pub selector_timeout_secs: u64,
    /// Element that marks a rendered posting body.
    pub content_selector: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            batch_size: DEFAULT_BATCH_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            courtesy_delay_ms: 2000,
            cooldown_ms: 3000,
            site_delay_ms: 3000,
            cycle_interval_secs: 600,
            search_settle_ms: 4000,
            post_search_ms: 5000,
            sort_settle_ms: 3000,
            sort_by_recent: true,
            detail_settle_ms: 2500,
            search_timeout_secs: 90,
            detail_timeout_secs: 60,
            selector_timeout_secs: 10,
            content_selector: Some(r#"[data-automation-id="jobPostingDescription"]"#.to_string()),
        }
    }
}

impl PipelineConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn search_timings(&self) -> SearchTimings {
        SearchTimings {
            navigation_timeout: Duration::from_secs(self.search_timeout_secs),
            settle: Duration::from_millis(self.search_settle_ms),
            post_search: Duration::from_millis(self.post_search_ms),
            sort_settle: Duration::from_millis(self.sort_settle_ms),
            next_timeout: Duration::from_secs(self.detail_timeout_secs),
            next_settle: Duration::from_millis(self.sort_settle_ms),
            sort_by_recent: self.sort_by_recent,
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            navigation_timeout: Duration::from_secs(self.detail_timeout_secs),
            content_selector: self.content_selector.clone().filter(|s| !s.trim().is_empty()),
            selector_timeout: Duration::from_secs(self.selector_timeout_secs),
            settle: Duration::from_millis(self.detail_settle_ms),
        }
    }

    pub fn discovery_settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            duplicate_threshold: self.duplicate_threshold,
            max_pages: self.max_pages,
            courtesy_delay: Duration::from_millis(self.courtesy_delay_ms),
            cooldown: self.cooldown(),
            site_delay: Duration::from_millis(self.site_delay_ms),
        }
    }
}

/// On-disk shape of `jobscout.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub data_dir: Option<String>,
    pub database: Option<String>,
    pub sites_file: Option<String>,
    pub search_term: Option<String>,
    pub llm: LlmConfig,
    pub geocode: GeocodeConfig,
    pub browser: BrowserEngineConfig,
    pub pipeline: PipelineConfig,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self, ScoutError> {
        toml::from_str(text).map_err(|e| ScoutError::Configuration(format!("invalid config: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, ScoutError> {
        let text = fs::read_to_string(path).map_err(|e| {
            ScoutError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub database: PathBuf,
    pub sites_file: PathBuf,
    pub search_term: String,
    pub llm: LlmConfig,
    pub geocode: GeocodeConfig,
    pub browser: BrowserEngineConfig,
    pub pipeline: PipelineConfig,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobscout")
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_data_dir(default_data_dir())
    }
}

impl Settings {
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            database: data_dir.join(DATABASE_FILENAME),
            sites_file: data_dir.join(SITES_FILENAME),
            data_dir,
            search_term: DEFAULT_SEARCH_TERM.to_string(),
            llm: LlmConfig::default(),
            geocode: GeocodeConfig::default(),
            browser: BrowserEngineConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }

    /// Build settings from a parsed file. Relative paths resolve against
    /// `base_dir` (the file's directory).
    pub fn from_file(file: ConfigFile, base_dir: &Path) -> Self {
        let data_dir = file
            .data_dir
            .as_deref()
            .map(|p| resolve_path(p, base_dir))
            .unwrap_or_else(default_data_dir);
        let mut settings = Self::with_data_dir(data_dir);

        if let Some(ref db) = file.database {
            settings.database = resolve_path(db, &settings.data_dir);
        }
        if let Some(ref sites) = file.sites_file {
            settings.sites_file = resolve_path(sites, base_dir);
        }
        if let Some(term) = file.search_term.filter(|t| !t.trim().is_empty()) {
            settings.search_term = term;
        }
        settings.llm = file.llm;
        settings.geocode = file.geocode;
        settings.browser = file.browser;
        settings.pipeline = file.pipeline;
        settings
    }

    /// Load from `path`, else `./jobscout.toml` when present, else defaults;
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ScoutError> {
        let settings = match path {
            Some(p) => {
                let file = ConfigFile::load(p)?;
                Self::from_file(file, p.parent().unwrap_or(Path::new(".")))
            }
            None => {
                let local = Path::new(CONFIG_FILENAME);
                if local.is_file() {
                    debug!("Using {}", local.display());
                    Self::from_file(ConfigFile::load(local)?, Path::new("."))
                } else {
                    Self::default()
                }
            }
        };
        Ok(settings.with_env_overrides())
    }

    /// - `JOBSCOUT_DATA_DIR`, `JOBSCOUT_DATABASE`, `JOBSCOUT_SITES_FILE`,
    ///   `JOBSCOUT_SEARCH_TERM`
    /// - plus each section's own variables
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("JOBSCOUT_DATA_DIR") {
            if !val.trim().is_empty() {
                let data_dir = PathBuf::from(val);
                if self.database == self.data_dir.join(DATABASE_FILENAME) {
                    self.database = data_dir.join(DATABASE_FILENAME);
                }
                if self.sites_file == self.data_dir.join(SITES_FILENAME) {
                    self.sites_file = data_dir.join(SITES_FILENAME);
                }
                self.data_dir = data_dir;
            }
        }
        if let Ok(val) = std::env::var("JOBSCOUT_DATABASE") {
            if !val.trim().is_empty() {
                self.database = PathBuf::from(val);
            }
        }
        if let Ok(val) = std::env::var("JOBSCOUT_SITES_FILE") {
            if !val.trim().is_empty() {
                self.sites_file = PathBuf::from(val);
            }
        }
        if let Ok(val) = std::env::var("JOBSCOUT_SEARCH_TERM") {
            if !val.trim().is_empty() {
                self.search_term = val;
            }
        }
        self.llm = self.llm.with_env_overrides();
        self.geocode = self.geocode.with_env_overrides();
        self.browser = self.browser.with_env_overrides();
        self
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })?;
        if let Some(parent) = self.database.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn repository(&self) -> DieselJobRepository {
        DieselJobRepository::new(SqlitePool::from_path(&self.database))
    }
}

fn resolve_path(path: &str, base_dir: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    };
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}
