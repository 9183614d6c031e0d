//! Language model integration.
//!
//! Talks to a local Ollama instance to extract structured posting fields.

mod client;
mod config;
mod prompts;

pub use client::{render_extraction_prompt, truncate_content, CompletionModel, LlmClient, LlmError};
pub use config::LlmConfig;
pub use prompts::{DEFAULT_EXTRACTION_PROMPT, LOCATION_SPLIT_PROMPT};
