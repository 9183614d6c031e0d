//! jobscout - job posting discovery and enrichment.
//!
//! Walks career-site search pages with a headless browser, fetches each new
//! posting, extracts structured fields with a local language model, validates
//! the location through a geocoder and stores the result in SQLite.

pub mod browser;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod enrichment;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod repository;
pub mod schema;
pub mod sites;

pub use error::{ErrorKind, ScoutError};
