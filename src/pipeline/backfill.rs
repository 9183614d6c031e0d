//! Re-validation of stored locations.
//!
//! Postings stored while the geocoder was unreachable or unkeyed keep the
//! model's location text with an empty country code. This pass splits that
//! text again (through the model when the parts were not stored), runs the
//! geocode cascade and writes back every location that now validates.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::scheduler::{is_shutdown, sleep_or_shutdown};
use crate::enrichment::parse_location_split;
use crate::error::ScoutError;
use crate::geocode::{normalize_location, Geocoder, LocationParts, NormalizedLocation};
use crate::llm::{CompletionModel, LOCATION_SPLIT_PROMPT};
use crate::models::JobPosting;
use crate::repository::DieselJobRepository;

/// Outcome counts of one backfill pass.
#[derive(Debug, Clone, Default)]
pub struct BackfillReport {
    pub checked: usize,
    /// Rows rewritten with a validated location.
    pub resolved: usize,
    /// Rows the geocoder still could not match; left untouched.
    pub unresolved: usize,
    /// Rows whose location could not be split.
    pub failed: usize,
    pub elapsed: Duration,
}

pub struct LocationBackfill {
    model: Arc<dyn CompletionModel>,
    geocoder: Arc<dyn Geocoder>,
    repo: DieselJobRepository,
    delay: Duration,
}

impl LocationBackfill {
    /// `delay` separates geocoder queries and consecutive rows.
    pub fn new(
        model: Arc<dyn CompletionModel>,
        geocoder: Arc<dyn Geocoder>,
        repo: DieselJobRepository,
        delay: Duration,
    ) -> Self {
        Self {
            model,
            geocoder,
            repo,
            delay,
        }
    }

    pub async fn run(
        &self,
        limit: Option<i64>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<BackfillReport, ScoutError> {
        let started = Instant::now();
        let mut report = BackfillReport::default();
        let jobs = self.repo.unvalidated_locations(limit).await?;
        info!("{} posting(s) with an unvalidated location", jobs.len());

        for (index, job) in jobs.iter().enumerate() {
            if is_shutdown(&shutdown) {
                break;
            }
            report.checked += 1;

            match self.resolve(job).await {
                Ok(location) if location.is_validated() => {
                    self.repo.update_location(&job.id, &location).await?;
                    info!(
                        "{}: {} ({})",
                        job.title, location.display, location.country_code
                    );
                    report.resolved += 1;
                }
                Ok(_) => {
                    debug!("{}: still no geocode match", job.url);
                    report.unresolved += 1;
                }
                Err(e) => {
                    warn!("{}: could not split location: {}", job.url, e);
                    report.failed += 1;
                }
            }

            if index + 1 < jobs.len() && !sleep_or_shutdown(self.delay, &mut shutdown).await {
                break;
            }
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }

    async fn resolve(&self, job: &JobPosting) -> Result<NormalizedLocation, ScoutError> {
        let parts = match stored_parts(job) {
            Some(parts) => parts,
            None => {
                let raw = clean_stored_location(job.location.as_deref().unwrap_or_default());
                let prompt = LOCATION_SPLIT_PROMPT.replace("{location}", raw);
                let response = self.model.complete(&prompt).await?;
                parse_location_split(&response)?
            }
        };
        Ok(normalize_location(self.geocoder.as_ref(), &parts, self.delay).await)
    }
}

/// Parts already on the row, when a city was stored.
fn stored_parts(job: &JobPosting) -> Option<LocationParts> {
    let city = job.city.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
    Some(LocationParts {
        city: city.to_string(),
        region: job.region.clone().unwrap_or_default(),
        country: job.country.clone().unwrap_or_default(),
        raw: String::new(),
    })
}

/// Drop the "locations" label career pages put in front of the value.
pub fn clean_stored_location(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.get(..9) {
        Some(label) if label.eq_ignore_ascii_case("locations") => trimmed[9..].trim(),
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::{Address, GeocodeError};
    use crate::llm::LlmError;
    use crate::repository::SqlitePool;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Splits "City, Country" on the comma.
    struct CommaSplitter {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionModel for CommaSplitter {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let location = prompt
                .lines()
                .find_map(|l| l.strip_prefix("Location: \""))
                .and_then(|l| l.strip_suffix('"'))
                .unwrap_or_default();
            let mut parts = location.split(',').map(str::trim);
            let city = parts.next().unwrap_or_default();
            let country = parts.last().unwrap_or_default();
            Ok(format!(
                r#"{{"city": "{city}", "state": "", "country": "{country}"}}"#
            ))
        }
    }

    struct Table(HashMap<&'static str, Address>);

    #[async_trait]
    impl Geocoder for Table {
        async fn search(&self, query: &str) -> Result<Option<Address>, GeocodeError> {
            Ok(self.0.get(query).cloned())
        }
    }

    fn pune() -> Address {
        Address {
            city: "Pune".into(),
            region: "Maharashtra".into(),
            country: "India".into(),
            country_code: "IN".into(),
        }
    }

    async fn setup() -> (DieselJobRepository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let repo = DieselJobRepository::new(SqlitePool::from_path(&dir.path().join("jobs.db")));
        repo.init_schema().await.unwrap();
        (repo, dir)
    }

    #[test]
    fn test_clean_stored_location() {
        assert_eq!(clean_stored_location("locations\nPune, India"), "Pune, India");
        assert_eq!(clean_stored_location("  Locations Austin "), "Austin");
        assert_eq!(clean_stored_location("Pune"), "Pune");
        assert_eq!(clean_stored_location("Lyon"), "Lyon");
    }

    #[tokio::test]
    async fn test_backfill_validates_stored_locations() {
        let (repo, _dir) = setup().await;

        let mut from_text = JobPosting::discovered("https://example.com/job/1", "Analyst", "example");
        from_text.location = Some("locations\nPune, India".into());
        from_text.country_code = Some(String::new());

        let mut from_parts = JobPosting::discovered("https://example.com/job/2", "Engineer", "example");
        from_parts.location = Some("Pune, Maharashtra, India".into());
        from_parts.city = Some("Pune".into());
        from_parts.region = Some("Maharashtra".into());
        from_parts.country = Some("India".into());

        let mut unknown = JobPosting::discovered("https://example.com/job/3", "Manager", "example");
        unknown.location = Some("Atlantis, Ocean".into());

        for job in [&from_text, &from_parts, &unknown] {
            repo.insert(job).await.unwrap();
        }

        let model = Arc::new(CommaSplitter {
            prompts: Mutex::new(Vec::new()),
        });
        let geocoder = Arc::new(Table(HashMap::from([
            ("Pune, India", pune()),
            ("Pune, Maharashtra, India", pune()),
        ])));
        let backfill = LocationBackfill::new(model.clone(), geocoder, repo.clone(), Duration::ZERO);
        let (_tx, rx) = crate::pipeline::shutdown_channel();

        let report = backfill.run(None, rx).await.unwrap();
        assert_eq!(report.checked, 3);
        assert_eq!(report.resolved, 2);
        assert_eq!(report.unresolved, 1);
        assert_eq!(report.failed, 0);

        // Stored parts skip the model.
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts.iter().any(|p| p.contains("Location: \"Pune, India\"")));
        drop(prompts);

        let stored = repo.get(&from_text.id).await.unwrap().unwrap();
        assert_eq!(stored.location.as_deref(), Some("Pune, Maharashtra, India"));
        assert_eq!(stored.country_code.as_deref(), Some("IN"));

        let untouched = repo.get(&unknown.id).await.unwrap().unwrap();
        assert_eq!(untouched.location.as_deref(), Some("Atlantis, Ocean"));
        assert!(untouched.country_code.is_none());

        let remaining = repo.unvalidated_locations(None).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }
}
