//! Shared helper functions for CLI commands.

use std::sync::Arc;

use anyhow::Context;
use console::style;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Settings;
use crate::enrichment::Enricher;
use crate::geocode::LocationIqClient;
use crate::llm::LlmClient;
use crate::repository::DieselJobRepository;

/// Open the database, creating the schema if needed.
pub async fn open_repository(settings: &Settings) -> anyhow::Result<DieselJobRepository> {
    settings
        .ensure_directories()
        .context("failed to create data directory")?;
    let repo = settings.repository();
    repo.init_schema()
        .await
        .with_context(|| format!("failed to open {}", settings.database.display()))?;
    Ok(repo)
}

/// Model client, warning when the service cannot be reached.
pub async fn build_model(settings: &Settings) -> Arc<LlmClient> {
    let llm = LlmClient::new(settings.llm.clone());
    if !llm.is_available().await {
        println!(
            "{} Model service at {} is not reachable; postings will stay at discovered",
            style("!").yellow(),
            settings.llm.endpoint
        );
    }
    Arc::new(llm)
}

/// Geocoder, warning when no API key is configured.
pub fn build_geocoder(settings: &Settings) -> Arc<LocationIqClient> {
    if settings.geocode.api_keys.is_empty() {
        warn!("No LocationIQ keys configured, locations will not be validated");
    }
    Arc::new(LocationIqClient::from_config(&settings.geocode))
}

/// Build the enrichment stage from settings.
pub async fn build_enricher(settings: &Settings) -> Enricher {
    Enricher::new(
        build_model(settings).await,
        settings.llm.clone(),
        build_geocoder(settings),
        settings.geocode.delay(),
    )
}

/// Shutdown channel flipped by Ctrl-C.
pub fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = crate::pipeline::shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing current work");
            println!(
                "\n{} Stopping after the current item (Ctrl-C again to force)",
                style("!").yellow()
            );
            let _ = tx.send(true);
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });
    rx
}
