//! End-to-end pipeline behavior against a real SQLite database.
//!
//! The browser-facing stages and the model are replaced by scripted fakes;
//! everything from the duplicate check down to the stored rows is real.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use jobscout::discovery::{CandidateLink, SearchNavigator, SearchSession};
use jobscout::enrichment::Enricher;
use jobscout::error::ScoutError;
use jobscout::fetch::{PageContent, PageFetcher, PageMetadata};
use jobscout::geocode::{Address, GeocodeError, Geocoder};
use jobscout::llm::{CompletionModel, LlmConfig, LlmError};
use jobscout::models::{JobPosting, JobStatus};
use jobscout::pipeline::{
    shutdown_channel, BatchRunner, DiscoveryPipeline, DiscoverySettings, EnrichmentProcessor,
    StopReason,
};
use jobscout::repository::{DieselJobRepository, InsertOutcome, SqlitePool};
use jobscout::sites::SiteRegistry;

const SITE: &str = "https://acme.wd5.myworkdayjobs.com/en-US/External";

fn url(slug: &str) -> String {
    format!("{SITE}/job/{slug}")
}

// --- fakes -----------------------------------------------------------------

struct ScriptedNavigator {
    pages: Vec<Vec<&'static str>>,
    next_calls: Arc<AtomicUsize>,
}

struct ScriptedSession {
    pages: Vec<Vec<&'static str>>,
    index: usize,
    next_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SearchNavigator for ScriptedNavigator {
    async fn open(
        &self,
        _site: &jobscout::sites::Site,
        _term: &str,
    ) -> Result<Option<Box<dyn SearchSession>>, ScoutError> {
        Ok(Some(Box::new(ScriptedSession {
            pages: self.pages.clone(),
            index: 0,
            next_calls: self.next_calls.clone(),
        })))
    }
}

#[async_trait]
impl SearchSession for ScriptedSession {
    async fn candidates(&mut self) -> Result<Vec<CandidateLink>, ScoutError> {
        Ok(self.pages[self.index]
            .iter()
            .map(|slug| CandidateLink {
                url: url(slug),
                anchor_text: format!("Data Engineer {slug}"),
            })
            .collect())
    }

    async fn next_page(&mut self) -> Result<bool, ScoutError> {
        self.next_calls.fetch_add(1, Ordering::SeqCst);
        if self.index + 1 < self.pages.len() {
            self.index += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn close(&mut self) {}
}

#[derive(Default)]
struct RecordingFetcher {
    fetched: Mutex<Vec<String>>,
    unreachable: HashSet<String>,
    challenged: HashSet<String>,
}

#[async_trait]
impl PageFetcher for RecordingFetcher {
    async fn fetch(&self, url: &str, anchor_text: &str) -> Result<PageContent, ScoutError> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.unreachable.contains(url) {
            return Err(ScoutError::navigation(url, "timed out after 60s"));
        }
        if self.challenged.contains(url) {
            return Err(ScoutError::AntiBotChallenge {
                url: url.to_string(),
            });
        }
        Ok(PageContent {
            url: url.to_string(),
            final_url: url.to_string(),
            title: anchor_text.to_string(),
            text: format!("Posting body for {url}"),
            html: String::new(),
            metadata: PageMetadata::default(),
        })
    }
}

/// Answers with a valid object unless the content mentions BROKEN.
struct JsonModel;

#[async_trait]
impl CompletionModel for JsonModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if prompt.contains("BROKEN") {
            return Ok("Sorry, I could not find a job posting here.".to_string());
        }
        Ok(r#"Here you go:
        {"actual_job_title": "Data Engineer", "location_city": "Pune",
         "location_state": "Maharashtra", "location_country": "India",
         "mandatory_skills": ["SQL", "Python"], "preferred_skills": "Airflow, dbt",
         "work_type": "hybrid"}"#
            .to_string())
    }
}

struct NoMatches;

#[async_trait]
impl Geocoder for NoMatches {
    async fn search(&self, _query: &str) -> Result<Option<Address>, GeocodeError> {
        Ok(None)
    }
}

// --- helpers ---------------------------------------------------------------

async fn setup_repo() -> (DieselJobRepository, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let repo = DieselJobRepository::new(SqlitePool::from_path(&dir.path().join("jobs.db")));
    repo.init_schema().await.unwrap();
    (repo, dir)
}

fn enricher() -> Enricher {
    Enricher::new(
        Arc::new(JsonModel),
        LlmConfig::default(),
        Arc::new(NoMatches),
        Duration::ZERO,
    )
}

fn quick_settings() -> DiscoverySettings {
    DiscoverySettings {
        courtesy_delay: Duration::ZERO,
        cooldown: Duration::ZERO,
        site_delay: Duration::ZERO,
        ..Default::default()
    }
}

async fn seed_known(repo: &DieselJobRepository, slugs: &[&str]) {
    for slug in slugs {
        let job = JobPosting::discovered(&url(slug), "Known posting", "acme");
        assert_eq!(repo.insert(&job).await.unwrap(), InsertOutcome::Inserted);
    }
}

fn pipeline(
    repo: &DieselJobRepository,
    pages: Vec<Vec<&'static str>>,
    fetcher: Arc<RecordingFetcher>,
) -> (DiscoveryPipeline, Arc<AtomicUsize>) {
    let next_calls = Arc::new(AtomicUsize::new(0));
    let navigator = Arc::new(ScriptedNavigator {
        pages,
        next_calls: next_calls.clone(),
    });
    let pipeline = DiscoveryPipeline::new(navigator, fetcher, enricher(), repo.clone(), quick_settings());
    (pipeline, next_calls)
}

fn registry() -> SiteRegistry {
    SiteRegistry::parse(SITE).unwrap()
}

// --- sequential mode -------------------------------------------------------

#[tokio::test]
async fn short_duplicate_run_does_not_halt_traversal() {
    let (repo, _dir) = setup_repo().await;
    seed_known(&repo, &["C", "D"]).await;

    let fetcher = Arc::new(RecordingFetcher::default());
    let (pipeline, _) = pipeline(
        &repo,
        vec![vec!["A", "B", "C", "D", "E", "F", "G", "H"]],
        fetcher.clone(),
    );
    let (_tx, rx) = shutdown_channel();
    let report = pipeline.run_cycle(&registry(), "data engineer", rx).await;

    let fetched = fetcher.fetched.lock().unwrap().clone();
    let expected: Vec<String> = ["A", "B", "E", "F", "G", "H"].iter().map(|s| url(s)).collect();
    assert_eq!(fetched, expected);

    let site = &report.sites[0];
    assert_eq!(site.new_jobs, 6);
    assert_eq!(site.duplicates, 2);
    assert_eq!(site.stop_reason, StopReason::NoNextControl);
    assert_eq!(repo.count().await.unwrap(), 8);

    let stored = repo.get_by_url(&url("A")).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Enriched);
    assert_eq!(stored.mandatory_skills, vec!["SQL", "Python"]);
    assert_eq!(stored.preferred_skills, vec!["Airflow", "dbt"]);
    assert_eq!(stored.location.as_deref(), Some("Pune, Maharashtra, India"));
    assert_eq!(stored.country_code.as_deref(), Some(""));
}

#[tokio::test]
async fn five_consecutive_duplicates_halt_before_next_page() {
    let (repo, _dir) = setup_repo().await;
    seed_known(&repo, &["K1", "K2", "K3", "K4", "K5"]).await;

    let fetcher = Arc::new(RecordingFetcher::default());
    let (pipeline, next_calls) = pipeline(
        &repo,
        vec![vec!["K1", "K2", "K3", "K4", "K5", "N1"], vec!["N2"]],
        fetcher.clone(),
    );
    let (_tx, rx) = shutdown_channel();
    let report = pipeline.run_cycle(&registry(), "data engineer", rx).await;

    let site = &report.sites[0];
    assert_eq!(site.stop_reason, StopReason::DuplicateRun);
    assert_eq!(site.pages, 1);
    assert_eq!(site.new_jobs, 0);
    assert!(fetcher.fetched.lock().unwrap().is_empty());
    assert_eq!(next_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn duplicate_run_spans_pages() {
    let (repo, _dir) = setup_repo().await;
    seed_known(&repo, &["K1", "K2", "K3", "K4", "K5"]).await;

    let fetcher = Arc::new(RecordingFetcher::default());
    let (pipeline, _) = pipeline(
        &repo,
        vec![vec!["N1", "K1", "K2", "K3"], vec!["K4", "K5", "N2"]],
        fetcher.clone(),
    );
    let (_tx, rx) = shutdown_channel();
    let report = pipeline.run_cycle(&registry(), "data engineer", rx).await;

    let site = &report.sites[0];
    assert_eq!(site.stop_reason, StopReason::DuplicateRun);
    assert_eq!(site.pages, 2);
    assert_eq!(*fetcher.fetched.lock().unwrap(), vec![url("N1")]);
}

#[tokio::test]
async fn failed_items_do_not_stop_the_site() {
    let (repo, _dir) = setup_repo().await;
    let fetcher = Arc::new(RecordingFetcher {
        unreachable: [url("A")].into_iter().collect(),
        challenged: [url("B")].into_iter().collect(),
        ..Default::default()
    });
    let (pipeline, _) = pipeline(&repo, vec![vec!["A", "B", "BROKEN", "D"]], fetcher.clone());
    let (_tx, rx) = shutdown_channel();
    let report = pipeline.run_cycle(&registry(), "data engineer", rx).await;

    let site = &report.sites[0];
    assert_eq!(site.failures, 1);
    assert_eq!(site.anti_bot, 1);
    assert_eq!(site.new_jobs, 2);
    assert_eq!(site.unenriched, 1);

    // Unparseable model output keeps the posting at discovered.
    let broken = repo.get_by_url(&url("BROKEN")).await.unwrap().unwrap();
    assert_eq!(broken.status, JobStatus::Discovered);
    assert_eq!(broken.title, "Data Engineer BROKEN");
    assert!(broken.enriched_at.is_none());

    let fine = repo.get_by_url(&url("D")).await.unwrap().unwrap();
    assert_eq!(fine.status, JobStatus::Enriched);
    assert!(repo.get_by_url(&url("A")).await.unwrap().is_none());
}

#[tokio::test]
async fn page_limit_bounds_traversal() {
    let (repo, _dir) = setup_repo().await;
    let fetcher = Arc::new(RecordingFetcher::default());
    let next_calls = Arc::new(AtomicUsize::new(0));
    let navigator = Arc::new(ScriptedNavigator {
        pages: vec![vec!["P1"], vec!["P2"], vec!["P3"]],
        next_calls: next_calls.clone(),
    });
    let settings = DiscoverySettings {
        max_pages: 2,
        ..quick_settings()
    };
    let pipeline = DiscoveryPipeline::new(navigator, fetcher.clone(), enricher(), repo.clone(), settings);
    let (_tx, rx) = shutdown_channel();
    let report = pipeline.run_cycle(&registry(), "data engineer", rx).await;

    assert_eq!(report.sites[0].stop_reason, StopReason::PageLimit);
    assert_eq!(report.sites[0].pages, 2);
    assert_eq!(fetcher.fetched.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn rerunning_a_cycle_is_idempotent() {
    let (repo, _dir) = setup_repo().await;
    let fetcher = Arc::new(RecordingFetcher::default());
    let (pipeline, _) = pipeline(&repo, vec![vec!["A", "B", "C"]], fetcher.clone());
    let (_tx, rx) = shutdown_channel();

    pipeline.run_cycle(&registry(), "data engineer", rx.clone()).await;
    let second = pipeline.run_cycle(&registry(), "data engineer", rx).await;

    assert_eq!(second.new_jobs(), 0);
    assert_eq!(second.sites[0].duplicates, 3);
    assert_eq!(repo.count().await.unwrap(), 3);
    assert_eq!(fetcher.fetched.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn shutdown_stops_before_any_site() {
    let (repo, _dir) = setup_repo().await;
    let fetcher = Arc::new(RecordingFetcher::default());
    let (pipeline, _) = pipeline(&repo, vec![vec!["A"]], fetcher.clone());
    let (tx, rx) = shutdown_channel();
    tx.send(true).unwrap();

    let report = pipeline.run_cycle(&registry(), "data engineer", rx).await;
    assert!(report.sites.is_empty());
    assert!(fetcher.fetched.lock().unwrap().is_empty());
}

// --- batch mode ------------------------------------------------------------

#[tokio::test]
async fn batch_of_five_with_two_failures() {
    let (repo, _dir) = setup_repo().await;
    let slugs = ["J1", "J2", "J3", "J4", "J5"];
    seed_known(&repo, &slugs).await;

    let fetcher = Arc::new(RecordingFetcher {
        unreachable: [url("J2")].into_iter().collect(),
        challenged: [url("J4")].into_iter().collect(),
        ..Default::default()
    });
    let processor = EnrichmentProcessor::new(fetcher, enricher(), repo.clone());
    let mut pending = repo.pending_enrichment(None).await.unwrap();
    pending.sort_by(|a, b| a.url.cmp(&b.url));

    let report = BatchRunner::new(5).run(&processor, &pending).await;

    assert_eq!(report.scraped, 3);
    assert_eq!(report.failed, 2);
    assert_eq!(report.scraped + report.failed, 5);
    let order: Vec<&str> = report.details.iter().map(|d| d.url.as_str()).collect();
    let expected: Vec<String> = slugs.iter().map(|s| url(s)).collect();
    assert_eq!(order, expected);

    let counts = repo.count_by_status().await.unwrap();
    assert_eq!(
        counts,
        vec![(JobStatus::Discovered, 2), (JobStatus::Enriched, 3)]
    );
}

// --- persistence -----------------------------------------------------------

#[tokio::test]
async fn concurrent_inserts_keep_one_row() {
    let (repo, _dir) = setup_repo().await;
    let target = url("RACE");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            let target = target.clone();
            tokio::spawn(async move {
                let job = JobPosting::discovered(&target, "Data Engineer", "acme");
                repo.insert(&job).await
            })
        })
        .collect();

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() == InsertOutcome::Inserted {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn skill_lists_round_trip_in_order() {
    let (repo, _dir) = setup_repo().await;
    let mut job = JobPosting::discovered(&url("SKILLS"), "Data Engineer", "acme");
    job.mandatory_skills = vec!["SQL".to_string(), "Python".to_string()];
    repo.insert(&job).await.unwrap();

    let loaded = repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(loaded.mandatory_skills, vec!["SQL", "Python"]);
    assert!(loaded.preferred_skills.is_empty());
}
