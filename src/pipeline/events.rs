//! Progress events emitted by the batch runner.

use crate::error::ErrorKind;

/// Events sent over the runner's channel as work settles.
///
/// Item events arrive in completion order; reports keep input order.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    BatchStarted {
        batch: usize,
        batches: usize,
        size: usize,
    },
    ItemCompleted {
        job_id: String,
        title: String,
        location: String,
    },
    ItemFailed {
        job_id: String,
        url: String,
        kind: ErrorKind,
        error: String,
    },
    BatchCompleted {
        batch: usize,
        scraped: usize,
        failed: usize,
        elapsed_secs: f64,
        average_secs_per_job: f64,
    },
    RunCompleted {
        scraped: usize,
        failed: usize,
        elapsed_secs: f64,
        average_secs_per_job: f64,
    },
}
