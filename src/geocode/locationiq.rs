//! LocationIQ forward geocoding client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Address, GeocodeError, Geocoder, KeyPool};

/// Geocoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeConfig {
    /// LocationIQ base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API keys used in rotation
    #[serde(default)]
    pub api_keys: Vec<String>,
    /// Delay between cascading lookups in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://us1.locationiq.com".to_string()
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_keys: Vec::new(),
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GeocodeConfig {
    /// Apply environment variable overrides.
    ///
    /// - `LOCATIONIQ_API_KEYS`: comma-separated keys (or `LOCATIONIQ_API_KEY` for one)
    /// - `LOCATIONIQ_ENDPOINT`: base URL
    /// - `GEOCODE_DELAY_MS`: delay between cascade attempts
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("LOCATIONIQ_API_KEYS") {
            self.api_keys = val
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        } else if let Ok(val) = std::env::var("LOCATIONIQ_API_KEY") {
            self.api_keys = vec![val.trim().to_string()];
        }
        if let Ok(val) = std::env::var("LOCATIONIQ_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = std::env::var("GEOCODE_DELAY_MS") {
            if let Ok(n) = val.parse() {
                self.delay_ms = n;
            }
        }
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    address: Option<PlaceAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

impl From<PlaceAddress> for Address {
    fn from(a: PlaceAddress) -> Self {
        Address {
            city: a.city.or(a.town).or(a.village).unwrap_or_default(),
            region: a.state.unwrap_or_default(),
            country: a.country.unwrap_or_default(),
            country_code: a.country_code.unwrap_or_default().to_uppercase(),
        }
    }
}

/// LocationIQ `/v1/search` client.
pub struct LocationIqClient {
    endpoint: String,
    keys: Arc<KeyPool>,
    client: Client,
}

impl LocationIqClient {
    pub fn new(config: &GeocodeConfig, keys: Arc<KeyPool>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            keys,
            client,
        }
    }

    pub fn from_config(config: &GeocodeConfig) -> Self {
        Self::new(config, Arc::new(KeyPool::new(config.api_keys.clone())))
    }
}

#[async_trait]
impl Geocoder for LocationIqClient {
    fn is_enabled(&self) -> bool {
        !self.keys.is_empty()
    }

    async fn search(&self, query: &str) -> Result<Option<Address>, GeocodeError> {
        let key = self.keys.next_key().ok_or(GeocodeError::NoApiKey)?;
        let url = format!("{}/v1/search", self.endpoint);

        debug!("Geocoding '{}'", query);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("key", key),
                ("q", query),
                ("format", "json"),
                ("addressdetails", "1"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        match resp.status() {
            // "Unable to geocode"
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::TOO_MANY_REQUESTS => return Err(GeocodeError::RateLimited),
            s if !s.is_success() => return Err(GeocodeError::Http(s.as_u16())),
            _ => {}
        }

        let places: Vec<Place> = resp
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        Ok(places
            .into_iter()
            .next()
            .and_then(|p| p.address)
            .map(Address::from))
    }
}
