//! Data models for jobscout.

mod job;

pub use job::{JobPosting, JobStatus, WorkArrangement, NOT_SPECIFIED};
