//! Pipeline orchestration.
//!
//! Two modes share the same stages:
//! - [`DiscoveryPipeline`] walks each site's results, stopping on a run of
//!   known postings, and stores what it finds.
//! - [`BatchRunner`] enriches postings already stored at `discovered`, a
//!   bounded number at a time.
//!
//! [`Scheduler`] repeats either mode until shutdown. [`LocationBackfill`]
//! re-validates locations stored while geocoding was unavailable.

mod backfill;
mod batch;
mod events;
mod scheduler;
mod sequential;
mod stop_rule;

use async_trait::async_trait;

use crate::error::ScoutError;

pub use backfill::{clean_stored_location, BackfillReport, LocationBackfill};
pub use batch::{
    BatchReport, BatchRunner, EnrichmentProcessor, ItemDetail, ItemOutcome, ItemSuccess,
    JobProcessor, DEFAULT_BATCH_SIZE,
};
pub use events::PipelineEvent;
pub use scheduler::{is_shutdown, shutdown_channel, sleep_or_shutdown, Scheduler};
pub use sequential::{CycleReport, DiscoveryPipeline, DiscoverySettings, SiteReport};
pub use stop_rule::{SiteTraversal, StopReason, DEFAULT_DUPLICATE_THRESHOLD, DEFAULT_MAX_PAGES};

/// Answers whether a posting URL is already stored.
#[async_trait]
pub trait DuplicateOracle: Send + Sync {
    async fn exists(&self, url: &str) -> Result<bool, ScoutError>;
}
