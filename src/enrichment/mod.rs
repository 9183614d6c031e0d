//! Enrichment: model extraction followed by location normalization.

mod parse;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

pub use parse::{parse_enrichment, parse_location_split, EnrichmentResult, ExtractionError};

use crate::error::ScoutError;
use crate::geocode::{normalize_location, Geocoder, NormalizedLocation};
use crate::llm::{render_extraction_prompt, CompletionModel, LlmConfig};

/// Model output merged with its normalized location.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPosting {
    pub result: EnrichmentResult,
    pub location: NormalizedLocation,
}

/// Turns raw page content into an [`EnrichedPosting`].
#[derive(Clone)]
pub struct Enricher {
    model: Arc<dyn CompletionModel>,
    config: LlmConfig,
    geocoder: Arc<dyn Geocoder>,
    geocode_delay: Duration,
}

impl Enricher {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        config: LlmConfig,
        geocoder: Arc<dyn Geocoder>,
        geocode_delay: Duration,
    ) -> Self {
        Self {
            model,
            config,
            geocoder,
            geocode_delay,
        }
    }

    /// Extract structured fields from `content`.
    ///
    /// Fails with `ExtractionFailed` when the model output has no usable
    /// object or lacks a title or location. Geocoding problems never fail.
    pub async fn enrich(
        &self,
        content: &str,
        title: &str,
        company: &str,
    ) -> Result<EnrichedPosting, ScoutError> {
        let prompt = render_extraction_prompt(&self.config, content, title, company);
        debug!("Requesting extraction for '{}' ({} prompt chars)", title, prompt.len());

        let response = self.model.complete(&prompt).await?;
        let result = parse_enrichment(&response)?;

        let parts = result.location_parts();
        let location = normalize_location(self.geocoder.as_ref(), &parts, self.geocode_delay).await;
        info!(
            "Enriched '{}' at {}{}",
            result.title,
            location.display,
            if location.is_validated() {
                format!(" ({})", location.country_code)
            } else {
                String::new()
            }
        );

        Ok(EnrichedPosting { result, location })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::{Address, GeocodeError};
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedModel {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionModel for CannedModel {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .map_err(|_| LlmError::Connection("refused".into()))
        }
    }

    struct NoMatches;

    #[async_trait]
    impl Geocoder for NoMatches {
        async fn search(&self, _query: &str) -> Result<Option<Address>, GeocodeError> {
            Ok(None)
        }
    }

    fn enricher(reply: Result<String, ()>) -> (Enricher, Arc<CannedModel>) {
        let model = Arc::new(CannedModel {
            reply,
            prompts: Mutex::new(Vec::new()),
        });
        let enricher = Enricher::new(
            model.clone(),
            LlmConfig::default(),
            Arc::new(NoMatches),
            Duration::ZERO,
        );
        (enricher, model)
    }

    #[tokio::test]
    async fn test_enrich_falls_back_to_model_location() {
        let (enricher, model) = enricher(Ok(
            r#"{"actual_job_title":"Data Engineer","location_city":"Pune","location_state":"Maharashtra","location_country":"India"}"#
                .to_string(),
        ));

        let enriched = enricher
            .enrich("We are hiring a data engineer in Pune", "Careers", "acme")
            .await
            .unwrap();
        assert_eq!(enriched.result.title, "Data Engineer");
        assert_eq!(enriched.location.display, "Pune, Maharashtra, India");
        assert_eq!(enriched.location.country_code, "");

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Company: acme"));
    }

    #[tokio::test]
    async fn test_enrich_reports_extraction_failure() {
        let (enricher, _) = enricher(Ok("Sorry, I can't help with that.".to_string()));
        let err = enricher.enrich("...", "Careers", "acme").await.unwrap_err();
        assert!(matches!(err, ScoutError::ExtractionFailed(ExtractionError::NoJson)));
    }

    #[tokio::test]
    async fn test_enrich_surfaces_model_errors() {
        let (enricher, _) = enricher(Err(()));
        let err = enricher.enrich("...", "Careers", "acme").await.unwrap_err();
        assert!(matches!(err, ScoutError::Llm(LlmError::Connection(_))));
    }
}
