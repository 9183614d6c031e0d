//! Progress display for batch enrichment, driven by pipeline events.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::pipeline::PipelineEvent;

/// A progress bar over one enrichment run.
pub struct EnrichProgress {
    bar: ProgressBar,
}

impl EnrichProgress {
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        bar.set_message("Enriching");
        Self { bar }
    }

    pub fn handle(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::BatchStarted {
                batch,
                batches,
                size,
            } => {
                self.bar
                    .set_message(format!("Batch {batch}/{batches} ({size} jobs)"));
            }
            PipelineEvent::ItemCompleted {
                title, location, ..
            } => {
                self.bar.inc(1);
                self.bar.println(format!(
                    "  {} {} {}",
                    style("✓").green(),
                    title,
                    style(format!("[{location}]")).dim()
                ));
            }
            PipelineEvent::ItemFailed {
                url, kind, error, ..
            } => {
                self.bar.inc(1);
                self.bar.println(format!(
                    "  {} {} {}: {}",
                    style("✗").red(),
                    url,
                    style(kind).yellow(),
                    style(error).dim()
                ));
            }
            PipelineEvent::BatchCompleted {
                batch,
                scraped,
                failed,
                elapsed_secs,
                average_secs_per_job,
            } => {
                self.bar.println(format!(
                    "  {} batch {}: {} scraped, {} failed in {:.1}s ({:.1}s/job)",
                    style("→").cyan(),
                    batch,
                    scraped,
                    failed,
                    elapsed_secs,
                    average_secs_per_job
                ));
            }
            PipelineEvent::RunCompleted { .. } => self.bar.finish_and_clear(),
        }
    }

    /// Consume events until the sender side closes.
    pub fn spawn(self, mut rx: mpsc::Receiver<PipelineEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.handle(event);
            }
            if !self.bar.is_finished() {
                self.bar.finish_and_clear();
            }
        })
    }
}
