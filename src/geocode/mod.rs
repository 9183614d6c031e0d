//! Location normalization through forward geocoding.
//!
//! The model produces free-text location parts. These are validated against a
//! geocoding service with progressively looser queries; the first hit wins.
//! When nothing matches, the model's text is kept with an empty country code.

mod key_pool;
mod locationiq;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

pub use key_pool::KeyPool;
pub use locationiq::{GeocodeConfig, LocationIqClient};

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no geocoding API key configured")]
    NoApiKey,
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP {0}")]
    Http(u16),
    #[error("rate limited")]
    RateLimited,
    #[error("unexpected response: {0}")]
    Parse(String),
}

/// A single address candidate from the geocoding service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub city: String,
    pub region: String,
    pub country: String,
    pub country_code: String,
}

/// Forward geocoding backend.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Whether lookups can be attempted at all.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Resolve a free-text query to the best address, if any.
    async fn search(&self, query: &str) -> Result<Option<Address>, GeocodeError>;
}

/// Location parts as produced by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationParts {
    pub city: String,
    pub region: String,
    pub country: String,
    /// Free-text location when the model did not split it.
    pub raw: String,
}

impl LocationParts {
    /// The unvalidated location text.
    pub fn display(&self) -> String {
        let joined = join_parts(&[&self.city, &self.region, &self.country]);
        if joined.is_empty() {
            self.raw.trim().to_string()
        } else {
            joined
        }
    }
}

/// Final location stored on a posting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedLocation {
    pub display: String,
    pub city: String,
    pub region: String,
    pub country: String,
    /// Empty when the location could not be validated.
    pub country_code: String,
}

impl NormalizedLocation {
    /// Keep the model's text as-is, without a country code.
    pub fn unvalidated(parts: &LocationParts) -> Self {
        Self {
            display: parts.display(),
            city: parts.city.trim().to_string(),
            region: parts.region.trim().to_string(),
            country: parts.country.trim().to_string(),
            country_code: String::new(),
        }
    }

    fn from_address(address: Address, parts: &LocationParts) -> Self {
        let pick = |found: String, fallback: &str| {
            if found.trim().is_empty() {
                fallback.trim().to_string()
            } else {
                found
            }
        };
        let city = pick(address.city, &parts.city);
        let region = pick(address.region, &parts.region);
        let country = pick(address.country, &parts.country);
        Self {
            display: join_parts(&[&city, &region, &country]),
            city,
            region,
            country,
            country_code: address.country_code,
        }
    }

    pub fn is_validated(&self) -> bool {
        !self.country_code.is_empty()
    }
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Queries to try, most specific first: city+region+country, city+country, city.
///
/// Empty when no city is known. Queries that collapse to the same text are
/// issued once.
pub fn cascade_queries(parts: &LocationParts) -> Vec<String> {
    if parts.city.trim().is_empty() {
        return Vec::new();
    }
    let candidates = [
        join_parts(&[&parts.city, &parts.region, &parts.country]),
        join_parts(&[&parts.city, &parts.country]),
        join_parts(&[&parts.city]),
    ];

    let mut queries: Vec<String> = Vec::with_capacity(candidates.len());
    for q in candidates {
        if !queries.contains(&q) {
            queries.push(q);
        }
    }
    queries
}

/// Resolve model-produced location parts to a canonical location.
///
/// Lookup failures are never fatal: every error is logged and the next query
/// is tried. `delay` separates consecutive lookups.
pub async fn normalize_location(
    geocoder: &dyn Geocoder,
    parts: &LocationParts,
    delay: Duration,
) -> NormalizedLocation {
    if !geocoder.is_enabled() {
        return NormalizedLocation::unvalidated(parts);
    }

    for (attempt, query) in cascade_queries(parts).iter().enumerate() {
        if attempt > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match geocoder.search(query).await {
            Ok(Some(address)) => {
                debug!("Geocoded '{}' -> {:?}", query, address);
                return NormalizedLocation::from_address(address, parts);
            }
            Ok(None) => debug!("No geocode match for '{}'", query),
            Err(e) => warn!("Geocode lookup for '{}' failed: {}", query, e),
        }
    }

    NormalizedLocation::unvalidated(parts)
}
