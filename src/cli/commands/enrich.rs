//! Batch enrichment of stored postings.

use console::style;

use crate::config::Settings;

#[cfg(feature = "browser")]
pub async fn cmd_enrich(settings: &Settings, limit: usize, once: bool) -> anyhow::Result<()> {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use crate::browser::BrowserSession;
    use crate::cli::progress::EnrichProgress;
    use crate::fetch::DetailFetcher;
    use crate::pipeline::{is_shutdown, BatchRunner, EnrichmentProcessor, Scheduler};

    use super::helpers::{build_enricher, open_repository, shutdown_on_ctrl_c};

    let repo = open_repository(settings).await?;
    let enricher = build_enricher(settings).await;
    let session = Arc::new(BrowserSession::launch(&settings.browser).await?);
    let fetcher = Arc::new(DetailFetcher::new(
        session.clone(),
        settings.pipeline.fetch_config(),
    ));
    let processor = EnrichmentProcessor::new(fetcher, enricher, repo.clone());

    let shutdown = shutdown_on_ctrl_c();
    let mut scheduler =
        Scheduler::new(settings.pipeline.cycle_interval(), shutdown.clone()).once(once);
    let limit = (limit > 0).then_some(limit as i64);

    scheduler
        .run(|cycle| {
            let repo = &repo;
            let processor = &processor;
            let shutdown = shutdown.clone();
            async move {
                let pending = match repo.pending_enrichment(limit).await {
                    Ok(jobs) => jobs,
                    Err(e) => {
                        tracing::error!("Could not load pending postings: {}", e);
                        return;
                    }
                };
                if pending.is_empty() {
                    println!("{} Cycle {}: nothing to enrich", style("✓").green(), cycle);
                    return;
                }
                if is_shutdown(&shutdown) {
                    return;
                }

                println!(
                    "{} Cycle {}: enriching {} posting(s), {} at a time",
                    style("→").cyan(),
                    cycle,
                    pending.len(),
                    settings.pipeline.batch_size
                );
                let (tx, rx) = mpsc::channel(64);
                let progress = EnrichProgress::new(pending.len() as u64).spawn(rx);
                let runner = BatchRunner::new(settings.pipeline.batch_size)
                    .with_cooldown(settings.pipeline.cooldown())
                    .with_events(tx)
                    .with_shutdown(shutdown);
                let report = runner.run(processor, &pending).await;
                drop(runner);
                let _ = progress.await;

                println!(
                    "{} {} scraped, {} failed in {:.1}s ({:.1}s/job)",
                    style("✓").green(),
                    report.scraped,
                    report.failed,
                    report.elapsed.as_secs_f64(),
                    report.average_secs_per_job()
                );
            }
        })
        .await;

    drop(processor);
    match Arc::try_unwrap(session) {
        Ok(session) => session.close().await,
        Err(_) => tracing::warn!("Browser session still in use at exit"),
    }
    Ok(())
}

#[cfg(not(feature = "browser"))]
pub async fn cmd_enrich(_settings: &Settings, _limit: usize, _once: bool) -> anyhow::Result<()> {
    println!(
        "{} Enrichment fetches pages with a browser; rebuild with --features browser",
        style("✗").red()
    );
    anyhow::bail!("browser support not compiled in")
}
