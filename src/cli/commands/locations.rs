//! Location backfill command.

use anyhow::bail;
use console::style;

use super::helpers::{build_geocoder, build_model, open_repository, shutdown_on_ctrl_c};
use crate::config::Settings;
use crate::pipeline::LocationBackfill;

pub async fn cmd_locations(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    if settings.geocode.api_keys.is_empty() {
        bail!("no LocationIQ key configured; set LOCATIONIQ_API_KEYS or [geocode] api_keys");
    }
    let repo = open_repository(settings).await?;
    let backfill = LocationBackfill::new(
        build_model(settings).await,
        build_geocoder(settings),
        repo,
        settings.geocode.delay(),
    );

    let limit = (limit > 0).then_some(limit as i64);
    let report = backfill.run(limit, shutdown_on_ctrl_c()).await?;

    println!(
        "{} Checked {} posting(s) in {:.1}s: {} validated, {} unmatched, {} unreadable",
        style("✓").green(),
        report.checked,
        report.elapsed.as_secs_f64(),
        style(report.resolved).green(),
        style(report.unresolved).yellow(),
        style(report.failed).red()
    );
    Ok(())
}
