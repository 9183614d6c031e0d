//! Bounded-concurrency batch enrichment.
//!
//! Jobs are split into batches of at most `batch_size`. Every item in a batch
//! runs concurrently and the batch waits for all of them to settle; one
//! failing item never cancels its siblings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::events::PipelineEvent;
use super::scheduler::{is_shutdown, sleep_or_shutdown};
use crate::enrichment::Enricher;
use crate::error::{ErrorKind, ScoutError};
use crate::fetch::PageFetcher;
use crate::models::{JobPosting, JobStatus};
use crate::repository::DieselJobRepository;

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// What a successfully processed item ended up as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSuccess {
    pub title: String,
    pub location: String,
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Scraped(ItemSuccess),
    Failed { kind: ErrorKind, error: String },
}

/// Per-item accounting, reported in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDetail {
    pub job_id: String,
    pub url: String,
    pub outcome: ItemOutcome,
}

impl ItemDetail {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Scraped(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub scraped: usize,
    pub failed: usize,
    pub details: Vec<ItemDetail>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.scraped + self.failed
    }

    pub fn average_secs_per_job(&self) -> f64 {
        average(self.elapsed, self.total())
    }

    fn absorb(&mut self, details: Vec<ItemDetail>) {
        for detail in details {
            if detail.is_success() {
                self.scraped += 1;
            } else {
                self.failed += 1;
            }
            self.details.push(detail);
        }
    }
}

fn average(elapsed: Duration, items: usize) -> f64 {
    if items == 0 {
        0.0
    } else {
        elapsed.as_secs_f64() / items as f64
    }
}

/// Work done for one job.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: &JobPosting) -> Result<ItemSuccess, ScoutError>;
}

/// Fetch the posting page, enrich it, store the result.
pub struct EnrichmentProcessor {
    fetcher: Arc<dyn PageFetcher>,
    enricher: Enricher,
    repo: DieselJobRepository,
}

impl EnrichmentProcessor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, enricher: Enricher, repo: DieselJobRepository) -> Self {
        Self {
            fetcher,
            enricher,
            repo,
        }
    }
}

#[async_trait]
impl JobProcessor for EnrichmentProcessor {
    async fn process(&self, job: &JobPosting) -> Result<ItemSuccess, ScoutError> {
        let page = self.fetcher.fetch(&job.url, &job.title).await?;
        let title = if page.title.trim().is_empty() {
            job.title.as_str()
        } else {
            page.title.as_str()
        };
        let enriched = self
            .enricher
            .enrich(&page.model_input(), title, &job.company)
            .await?;

        let updated = self
            .repo
            .apply_enrichment(&job.id, &enriched)
            .await?
            .ok_or(ScoutError::Database(diesel::result::Error::NotFound))?;

        Ok(ItemSuccess {
            title: updated.title,
            location: updated.location.unwrap_or_default(),
            status: updated.status,
        })
    }
}

/// Runs jobs through a [`JobProcessor`] in concurrent batches.
pub struct BatchRunner {
    batch_size: usize,
    cooldown: Duration,
    events: Option<mpsc::Sender<PipelineEvent>>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl BatchRunner {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            cooldown: Duration::ZERO,
            events: None,
            shutdown: None,
        }
    }

    /// Pause after any batch that hit an anti-bot challenge.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_events(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Stop between batches once shutdown is signalled.
    pub fn with_shutdown(mut self, rx: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(rx);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn emit(&self, event: PipelineEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event).await;
        }
    }

    fn shutting_down(&self) -> bool {
        self.shutdown.as_ref().is_some_and(is_shutdown)
    }

    pub async fn run<P>(&self, processor: &P, jobs: &[JobPosting]) -> BatchReport
    where
        P: JobProcessor + ?Sized,
    {
        let started = Instant::now();
        let mut report = BatchReport::default();
        let batches = jobs.len().div_ceil(self.batch_size);

        for (index, chunk) in jobs.chunks(self.batch_size).enumerate() {
            if self.shutting_down() {
                info!("Shutdown requested, skipping remaining batches");
                break;
            }
            let batch = index + 1;
            info!("Batch {}/{}: {} job(s)", batch, batches, chunk.len());
            self.emit(PipelineEvent::BatchStarted {
                batch,
                batches,
                size: chunk.len(),
            })
            .await;

            let batch_started = Instant::now();
            let details = join_all(chunk.iter().map(|job| self.run_item(processor, job))).await;
            let batch_elapsed = batch_started.elapsed();

            let scraped = details.iter().filter(|d| d.is_success()).count();
            let failed = details.len() - scraped;
            let hit_challenge = details.iter().any(|d| {
                matches!(
                    d.outcome,
                    ItemOutcome::Failed {
                        kind: ErrorKind::AntiBot,
                        ..
                    }
                )
            });
            report.absorb(details);

            info!(
                "Batch {}/{} done: {} scraped, {} failed in {:.1}s ({:.1}s/job)",
                batch,
                batches,
                scraped,
                failed,
                batch_elapsed.as_secs_f64(),
                average(batch_elapsed, scraped + failed)
            );
            self.emit(PipelineEvent::BatchCompleted {
                batch,
                scraped,
                failed,
                elapsed_secs: batch_elapsed.as_secs_f64(),
                average_secs_per_job: average(batch_elapsed, scraped + failed),
            })
            .await;

            if hit_challenge && !self.cooldown.is_zero() && batch < batches {
                warn!("Anti-bot challenge in batch {}, cooling down", batch);
                match self.shutdown.clone() {
                    Some(mut rx) => {
                        sleep_or_shutdown(self.cooldown, &mut rx).await;
                    }
                    None => tokio::time::sleep(self.cooldown).await,
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            "Enrichment run: {} scraped, {} failed in {:.1}s ({:.1}s/job)",
            report.scraped,
            report.failed,
            report.elapsed.as_secs_f64(),
            report.average_secs_per_job()
        );
        self.emit(PipelineEvent::RunCompleted {
            scraped: report.scraped,
            failed: report.failed,
            elapsed_secs: report.elapsed.as_secs_f64(),
            average_secs_per_job: report.average_secs_per_job(),
        })
        .await;
        report
    }

    async fn run_item<P>(&self, processor: &P, job: &JobPosting) -> ItemDetail
    where
        P: JobProcessor + ?Sized,
    {
        debug!("Processing {} ({})", job.id, job.url);
        let outcome = match processor.process(job).await {
            Ok(success) => {
                self.emit(PipelineEvent::ItemCompleted {
                    job_id: job.id.clone(),
                    title: success.title.clone(),
                    location: success.location.clone(),
                })
                .await;
                ItemOutcome::Scraped(success)
            }
            Err(e) => {
                warn!("Job {} failed: {}", job.url, e);
                self.emit(PipelineEvent::ItemFailed {
                    job_id: job.id.clone(),
                    url: job.url.clone(),
                    kind: e.kind(),
                    error: e.to_string(),
                })
                .await;
                ItemOutcome::Failed {
                    kind: e.kind(),
                    error: e.to_string(),
                }
            }
        };
        ItemDetail {
            job_id: job.id.clone(),
            url: job.url.clone(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::ExtractionError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the listed URLs; tracks peak concurrency.
    struct ScriptedProcessor {
        failing: HashSet<String>,
        anti_bot: HashSet<String>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedProcessor {
        fn new(failing: &[&str], anti_bot: &[&str]) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                anti_bot: anti_bot.iter().map(|s| s.to_string()).collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl JobProcessor for ScriptedProcessor {
        async fn process(&self, job: &JobPosting) -> Result<ItemSuccess, ScoutError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            // Later items finish first.
            let delay = 50 - (job.title.len() as u64 % 50);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.anti_bot.contains(&job.url) {
                return Err(ScoutError::AntiBotChallenge {
                    url: job.url.clone(),
                });
            }
            if self.failing.contains(&job.url) {
                return Err(ExtractionError::MissingField("location").into());
            }
            Ok(ItemSuccess {
                title: job.title.clone(),
                location: "Pune, Maharashtra, India".into(),
                status: JobStatus::Enriched,
            })
        }
    }

    fn jobs(n: usize) -> Vec<JobPosting> {
        (0..n)
            .map(|i| {
                JobPosting::discovered(
                    &format!("https://acme.com/job/{i}"),
                    &format!("Engineer {}", "I".repeat(i)),
                    "acme",
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_partial_failures_are_isolated() {
        let jobs = jobs(5);
        let processor = ScriptedProcessor::new(&[&jobs[1].url, &jobs[3].url], &[]);
        let report = BatchRunner::new(5).run(&processor, &jobs).await;

        assert_eq!(report.scraped, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.total(), 5);
        assert_eq!(processor.peak.load(Ordering::SeqCst), 5);

        let order: Vec<&str> = report.details.iter().map(|d| d.url.as_str()).collect();
        let expected: Vec<&str> = jobs.iter().map(|j| j.url.as_str()).collect();
        assert_eq!(order, expected);
        assert!(matches!(
            report.details[1].outcome,
            ItemOutcome::Failed {
                kind: ErrorKind::Extraction,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_batches_are_bounded() {
        let jobs = jobs(12);
        let processor = ScriptedProcessor::new(&[], &[]);
        let (tx, mut rx) = mpsc::channel(64);
        let report = BatchRunner::new(5)
            .with_events(tx)
            .run(&processor, &jobs)
            .await;

        assert_eq!(report.scraped, 12);
        assert!(processor.peak.load(Ordering::SeqCst) <= 5);

        let mut started = Vec::new();
        let mut completed_items = 0;
        let mut finished = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                PipelineEvent::BatchStarted { size, .. } => started.push(size),
                PipelineEvent::ItemCompleted { .. } => completed_items += 1,
                PipelineEvent::RunCompleted { scraped, failed, .. } => {
                    assert_eq!((scraped, failed), (12, 0));
                    finished = true;
                }
                _ => {}
            }
        }
        assert_eq!(started, vec![5, 5, 2]);
        assert_eq!(completed_items, 12);
        assert!(finished);
    }

    #[tokio::test]
    async fn test_shutdown_between_batches() {
        let jobs = jobs(10);
        let processor = ScriptedProcessor::new(&[], &[]);
        let (tx, rx) = watch::channel(true);
        let report = BatchRunner::new(5)
            .with_shutdown(rx)
            .run(&processor, &jobs)
            .await;
        drop(tx);
        assert_eq!(report.total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_after_challenge() {
        let jobs = jobs(6);
        let processor = ScriptedProcessor::new(&[], &[&jobs[0].url]);
        let started = tokio::time::Instant::now();
        let report = BatchRunner::new(5)
            .with_cooldown(Duration::from_secs(30))
            .run(&processor, &jobs)
            .await;
        assert_eq!(report.failed, 1);
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[test]
    fn test_average() {
        let report = BatchReport {
            scraped: 3,
            failed: 1,
            details: Vec::new(),
            elapsed: Duration::from_secs(10),
        };
        assert!((report.average_secs_per_job() - 2.5).abs() < f64::EPSILON);
        assert_eq!(BatchReport::default().average_secs_per_job(), 0.0);
    }
}
