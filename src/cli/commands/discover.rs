//! Discovery command: sequential site traversal on a schedule.

use console::style;

use crate::config::Settings;

#[cfg(feature = "browser")]
pub async fn cmd_discover(settings: &Settings, term: &str, once: bool) -> anyhow::Result<()> {
    use std::sync::Arc;

    use crate::browser::BrowserSession;
    use crate::discovery::BrowserSearchNavigator;
    use crate::fetch::DetailFetcher;
    use crate::pipeline::{DiscoveryPipeline, Scheduler};
    use crate::sites::SiteRegistry;

    use super::helpers::{build_enricher, open_repository, shutdown_on_ctrl_c};

    let registry = SiteRegistry::load_non_empty(&settings.sites_file)?;
    let repo = open_repository(settings).await?;
    let enricher = build_enricher(settings).await;

    println!(
        "{} Searching {} site(s) for '{}'",
        style("→").cyan(),
        registry.len(),
        term
    );

    let session = Arc::new(BrowserSession::launch(&settings.browser).await?);
    let navigator = Arc::new(BrowserSearchNavigator::new(
        session.clone(),
        settings.pipeline.search_timings(),
    ));
    let fetcher = Arc::new(DetailFetcher::new(
        session.clone(),
        settings.pipeline.fetch_config(),
    ));
    let pipeline = DiscoveryPipeline::new(
        navigator,
        fetcher,
        enricher,
        repo,
        settings.pipeline.discovery_settings(),
    );

    let shutdown = shutdown_on_ctrl_c();
    let mut scheduler =
        Scheduler::new(settings.pipeline.cycle_interval(), shutdown.clone()).once(once);

    scheduler
        .run(|cycle| {
            let pipeline = &pipeline;
            let registry = &registry;
            let shutdown = shutdown.clone();
            async move {
                let report = pipeline.run_cycle(registry, term, shutdown).await;
                println!(
                    "{} Cycle {}: {} new posting(s), {} failure(s) across {} site(s) in {:.0}s",
                    style("✓").green(),
                    cycle,
                    report.new_jobs(),
                    report.failures(),
                    report.sites.len(),
                    report.elapsed.as_secs_f64()
                );
                for site in &report.sites {
                    println!(
                        "    {:<40} {} new ({} unenriched), {} known, stopped: {}",
                        site.site,
                        site.new_jobs,
                        site.unenriched,
                        site.duplicates,
                        style(&site.stop_reason).dim()
                    );
                }
            }
        })
        .await;

    // Drop every holder of the session before closing it.
    drop(pipeline);
    match Arc::try_unwrap(session) {
        Ok(session) => session.close().await,
        Err(_) => tracing::warn!("Browser session still in use at exit"),
    }
    Ok(())
}

#[cfg(not(feature = "browser"))]
pub async fn cmd_discover(_settings: &Settings, _term: &str, _once: bool) -> anyhow::Result<()> {
    println!(
        "{} Discovery needs the 'browser' feature; rebuild with --features browser",
        style("✗").red()
    );
    anyhow::bail!("browser support not compiled in")
}
