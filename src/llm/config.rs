//! LLM client configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::prompts::DEFAULT_EXTRACTION_PROMPT;

/// Configuration for LLM client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether enrichment through the model is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Ollama API endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model to use for extraction
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Custom extraction prompt (uses {title}, {company} and {content} placeholders)
    #[serde(default)]
    pub extraction_prompt: Option<String>,
    /// Maximum characters of page content to send to the model
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.1
}

fn default_top_p() -> f32 {
    0.9
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_content_chars() -> usize {
    6000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
            extraction_prompt: None,
            max_content_chars: default_max_content_chars(),
        }
    }
}

impl LlmConfig {
    /// Apply `LLM_*` environment overrides. Unparseable numbers are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("LLM_ENABLED") {
            self.enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }
        if let Ok(val) = std::env::var("LLM_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = std::env::var("LLM_MODEL") {
            self.model = val;
        }
        override_parsed("LLM_MAX_TOKENS", &mut self.max_tokens);
        override_parsed("LLM_TEMPERATURE", &mut self.temperature);
        override_parsed("LLM_TIMEOUT_SECS", &mut self.timeout_secs);
        override_parsed("LLM_MAX_CONTENT_CHARS", &mut self.max_content_chars);
        self
    }

    /// The configured extraction prompt, or the built-in one.
    pub fn extraction_prompt(&self) -> &str {
        self.extraction_prompt
            .as_deref()
            .unwrap_or(DEFAULT_EXTRACTION_PROMPT)
    }
}

fn override_parsed<T: FromStr>(var: &str, slot: &mut T) {
    if let Some(parsed) = std::env::var(var).ok().and_then(|v| v.trim().parse().ok()) {
        *slot = parsed;
    }
}
