//! Sequential discovery: one site at a time, one page at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::scheduler::{is_shutdown, sleep_or_shutdown};
use super::stop_rule::{SiteTraversal, StopReason, DEFAULT_DUPLICATE_THRESHOLD, DEFAULT_MAX_PAGES};
use super::DuplicateOracle;
use crate::discovery::{CandidateLink, SearchNavigator, SearchSession};
use crate::enrichment::Enricher;
use crate::error::ScoutError;
use crate::fetch::PageFetcher;
use crate::models::{JobPosting, JobStatus};
use crate::repository::{DieselJobRepository, InsertOutcome};
use crate::sites::{Site, SiteRegistry};

/// Knobs for a discovery cycle.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub duplicate_threshold: usize,
    pub max_pages: usize,
    /// Pause between detail-page visits.
    pub courtesy_delay: Duration,
    /// Pause after an anti-bot challenge.
    pub cooldown: Duration,
    /// Pause between sites.
    pub site_delay: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            max_pages: DEFAULT_MAX_PAGES,
            courtesy_delay: Duration::from_millis(2000),
            cooldown: Duration::from_millis(3000),
            site_delay: Duration::from_millis(3000),
        }
    }
}

/// Outcome of visiting one site.
#[derive(Debug, Clone)]
pub struct SiteReport {
    pub site: String,
    pub pages: usize,
    /// Postings persisted this visit, enriched or not.
    pub new_jobs: usize,
    /// Of `new_jobs`, those stored at `discovered` because enrichment failed.
    pub unenriched: usize,
    pub duplicates: usize,
    pub failures: usize,
    pub anti_bot: usize,
    pub stop_reason: StopReason,
}

impl SiteReport {
    fn new(site: &Site) -> Self {
        Self {
            site: site.url.clone(),
            pages: 0,
            new_jobs: 0,
            unenriched: 0,
            duplicates: 0,
            failures: 0,
            anti_bot: 0,
            stop_reason: StopReason::NoNextControl,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub sites: Vec<SiteReport>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn new_jobs(&self) -> usize {
        self.sites.iter().map(|s| s.new_jobs).sum()
    }

    pub fn failures(&self) -> usize {
        self.sites.iter().map(|s| s.failures + s.anti_bot).sum()
    }
}

/// How a surviving candidate ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateOutcome {
    Stored(JobStatus),
    AlreadyKnown,
}

/// Drives discovery → fetch → enrich → persist across the registry.
pub struct DiscoveryPipeline {
    navigator: Arc<dyn SearchNavigator>,
    fetcher: Arc<dyn PageFetcher>,
    enricher: Enricher,
    repo: DieselJobRepository,
    oracle: Arc<dyn DuplicateOracle>,
    settings: DiscoverySettings,
}

impl DiscoveryPipeline {
    pub fn new(
        navigator: Arc<dyn SearchNavigator>,
        fetcher: Arc<dyn PageFetcher>,
        enricher: Enricher,
        repo: DieselJobRepository,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            navigator,
            fetcher,
            enricher,
            oracle: Arc::new(repo.clone()),
            repo,
            settings,
        }
    }

    /// Use a different duplicate oracle than the repository.
    pub fn with_oracle(mut self, oracle: Arc<dyn DuplicateOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Visit every site in registry order. A failing site never ends the cycle.
    pub async fn run_cycle(
        &self,
        registry: &SiteRegistry,
        term: &str,
        mut shutdown: watch::Receiver<bool>,
    ) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();

        for (index, site) in registry.sites().iter().enumerate() {
            if is_shutdown(&shutdown) {
                break;
            }
            info!(
                "[{}/{}] {} ({})",
                index + 1,
                registry.len(),
                site.company,
                site.url
            );
            let site_report = self.run_site(site, term, &shutdown).await;
            info!(
                "{}: {} new, {} duplicate(s), {} failed, {} challenge(s) over {} page(s); stopped: {}",
                site.company,
                site_report.new_jobs,
                site_report.duplicates,
                site_report.failures,
                site_report.anti_bot,
                site_report.pages,
                site_report.stop_reason
            );
            report.sites.push(site_report);

            if index + 1 < registry.len()
                && !sleep_or_shutdown(self.settings.site_delay, &mut shutdown).await
            {
                break;
            }
        }

        report.elapsed = started.elapsed();
        report
    }

    /// Traverse one site until a stop condition.
    pub async fn run_site(
        &self,
        site: &Site,
        term: &str,
        shutdown: &watch::Receiver<bool>,
    ) -> SiteReport {
        let mut report = SiteReport::new(site);

        let mut session = match self.navigator.open(site, term).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                report.stop_reason = StopReason::NoSearchInput;
                return report;
            }
            Err(e) => {
                warn!("Could not open search for {}: {}", site.url, e);
                report.stop_reason = StopReason::Failed(e.to_string());
                return report;
            }
        };

        let mut traversal = SiteTraversal::new(
            self.settings.duplicate_threshold,
            self.settings.max_pages,
        );
        self.traverse(session.as_mut(), site, &mut traversal, &mut report, shutdown)
            .await;
        session.close().await;

        report.pages = traversal.page_index();
        report.stop_reason = traversal
            .stop_reason()
            .cloned()
            .unwrap_or(StopReason::NoNextControl);
        report
    }

    async fn traverse(
        &self,
        session: &mut dyn SearchSession,
        site: &Site,
        traversal: &mut SiteTraversal,
        report: &mut SiteReport,
        shutdown: &watch::Receiver<bool>,
    ) {
        let mut shutdown = shutdown.clone();
        loop {
            let candidates = match session.candidates().await {
                Ok(c) => c,
                Err(e) => {
                    warn!("Reading results on {} failed: {}", site.url, e);
                    traversal.stop(StopReason::Failed(e.to_string()));
                    return;
                }
            };
            if traversal.is_repeat(&candidates) {
                traversal.stop(StopReason::NoProgress);
                return;
            }

            for candidate in &candidates {
                if is_shutdown(&shutdown) {
                    traversal.stop(StopReason::Shutdown);
                    return;
                }
                match self.oracle.exists(&candidate.url).await {
                    Ok(true) => {
                        report.duplicates += 1;
                        debug!(
                            "Known: {} ({} in a row)",
                            candidate.url,
                            traversal.consecutive_duplicates() + 1
                        );
                        if traversal.record_duplicate() {
                            info!(
                                "{} consecutive known postings on {}, moving on",
                                traversal.consecutive_duplicates(),
                                site.company
                            );
                            return;
                        }
                        continue;
                    }
                    Ok(false) => traversal.record_new(),
                    Err(e) => {
                        warn!("Duplicate check failed for {}: {}", candidate.url, e);
                        report.failures += 1;
                        continue;
                    }
                }

                match self.process_candidate(site, candidate).await {
                    Ok(CandidateOutcome::Stored(status)) => {
                        report.new_jobs += 1;
                        if status == JobStatus::Discovered {
                            report.unenriched += 1;
                        }
                    }
                    Ok(CandidateOutcome::AlreadyKnown) => report.duplicates += 1,
                    Err(e) if e.is_anti_bot() => {
                        report.anti_bot += 1;
                        sleep_or_shutdown(self.settings.cooldown, &mut shutdown).await;
                    }
                    Err(e) => {
                        warn!("Skipping {}: {}", candidate.url, e);
                        report.failures += 1;
                    }
                }
                sleep_or_shutdown(self.settings.courtesy_delay, &mut shutdown).await;
            }

            if !traversal.can_advance() {
                return;
            }
            match session.next_page().await {
                Ok(true) => traversal.advance_page(),
                Ok(false) => {
                    traversal.stop(StopReason::NoNextControl);
                    return;
                }
                Err(e) => {
                    debug!("Next page failed on {}: {}", site.url, e);
                    traversal.stop(StopReason::NoNextControl);
                    return;
                }
            }
        }
    }

    /// Fetch, enrich and store one new candidate.
    ///
    /// When the model cannot produce a title and location the posting is
    /// still stored, at `discovered`, so batch enrichment can retry it.
    async fn process_candidate(
        &self,
        site: &Site,
        candidate: &CandidateLink,
    ) -> Result<CandidateOutcome, ScoutError> {
        let page = self
            .fetcher
            .fetch(&candidate.url, &candidate.anchor_text)
            .await?;

        let mut job = JobPosting::discovered(&candidate.url, &page.title, &site.company)
            .with_source(&site.url)
            .with_description(page.text.clone());

        match self
            .enricher
            .enrich(&page.model_input(), &page.title, &site.company)
            .await
        {
            Ok(enriched) => job.apply_enrichment(&enriched),
            Err(e) => warn!(
                "Enrichment failed for {} ({}), storing as discovered",
                candidate.url,
                e.kind()
            ),
        }

        match self.repo.insert(&job).await? {
            InsertOutcome::Inserted => {
                info!("Stored '{}' [{}]", job.title, job.status);
                Ok(CandidateOutcome::Stored(job.status))
            }
            InsertOutcome::AlreadyKnown => Ok(CandidateOutcome::AlreadyKnown),
        }
    }
}
