//! Parsing of model output into an [`EnrichmentResult`].
//!
//! The response is parsed as JSON first. If that fails, the text between the
//! first `{` and the last `}` is parsed instead, which handles markdown fences
//! and chatter around the object. Field values are read leniently: numbers
//! may arrive as strings, skill lists as comma-separated text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::geocode::LocationParts;
use crate::models::{WorkArrangement, NOT_SPECIFIED};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("response contains no JSON object")]
    NoJson,
    #[error("invalid JSON: {0}")]
    Invalid(String),
    #[error("required field missing: {0}")]
    MissingField(&'static str),
}

/// Structured fields extracted from one posting page.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentResult {
    pub title: String,
    pub city: String,
    pub region: String,
    pub country: String,
    /// Unsplit location text, when the model returned one.
    pub location: String,
    pub description: String,
    pub summary: String,
    pub mandatory_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub work_type: WorkArrangement,
    pub salary: String,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: String,
    pub job_type: String,
    pub experience_level: String,
    pub posted_date: String,
    pub requires_citizenship: bool,
    pub no_visa_sponsorship: bool,
}

impl Default for EnrichmentResult {
    fn default() -> Self {
        Self {
            title: String::new(),
            city: String::new(),
            region: String::new(),
            country: String::new(),
            location: String::new(),
            description: String::new(),
            summary: NOT_SPECIFIED.to_string(),
            mandatory_skills: Vec::new(),
            preferred_skills: Vec::new(),
            work_type: WorkArrangement::Unknown,
            salary: NOT_SPECIFIED.to_string(),
            salary_min: None,
            salary_max: None,
            salary_currency: String::new(),
            job_type: NOT_SPECIFIED.to_string(),
            experience_level: NOT_SPECIFIED.to_string(),
            posted_date: NOT_SPECIFIED.to_string(),
            requires_citizenship: false,
            no_visa_sponsorship: false,
        }
    }
}

impl EnrichmentResult {
    pub fn location_parts(&self) -> LocationParts {
        LocationParts {
            city: self.city.clone(),
            region: self.region.clone(),
            country: self.country.clone(),
            raw: self.location.clone(),
        }
    }

    pub fn has_location(&self) -> bool {
        !self.location_parts().display().is_empty()
    }

    fn from_object(obj: &Map<String, Value>) -> Result<Self, ExtractionError> {
        let mut result = EnrichmentResult {
            title: text_field(obj, &["actual_job_title", "job_title", "title"]).unwrap_or_default(),
            city: text_field(obj, &["location_city", "city"]).unwrap_or_default(),
            region: text_field(obj, &["location_state", "location_region", "state", "region"])
                .unwrap_or_default(),
            country: text_field(obj, &["location_country", "country"]).unwrap_or_default(),
            location: text_field(obj, &["location"]).unwrap_or_default(),
            description: text_field(obj, &["description"]).unwrap_or_default(),
            mandatory_skills: list_field(obj, &["mandatory_skills", "required_skills"]),
            preferred_skills: list_field(obj, &["preferred_skills", "nice_to_have_skills"]),
            salary_min: int_field(obj, &["salary_min"], Bound::Lower),
            salary_max: int_field(obj, &["salary_max"], Bound::Upper),
            salary_currency: text_field(obj, &["salary_currency", "currency"]).unwrap_or_default(),
            requires_citizenship: bool_field(obj, &["requires_citizenship"]),
            no_visa_sponsorship: bool_field(obj, &["no_visa_sponsorship"]),
            ..EnrichmentResult::default()
        };

        if let Some(summary) = text_field(obj, &["summary"]) {
            result.summary = summary;
        }
        if let Some(work) = text_field(obj, &["work_type", "remote_option", "work_arrangement"]) {
            result.work_type = WorkArrangement::parse_loose(&work);
        }
        if let Some(salary) = text_field(obj, &["salary"]) {
            result.salary = salary;
        }
        if let Some(job_type) = text_field(obj, &["job_type", "employment_type"]) {
            result.job_type = job_type;
        }
        if let Some(level) = text_field(obj, &["experience_level", "seniority"]) {
            result.experience_level = level;
        }
        if let Some(posted) = text_field(obj, &["posted_date", "date_posted"]) {
            result.posted_date = posted;
        }

        if result.title.is_empty() {
            return Err(ExtractionError::MissingField("title"));
        }
        if !result.has_location() {
            return Err(ExtractionError::MissingField("location"));
        }
        Ok(result)
    }
}

/// Parse and validate a raw model response.
pub fn parse_enrichment(response: &str) -> Result<EnrichmentResult, ExtractionError> {
    let obj = parse_json_object(response)?;
    EnrichmentResult::from_object(&obj)
}

/// Parse a model reply that splits a stored location into parts.
///
/// Fails with `MissingField("location")` when no part is usable.
pub fn parse_location_split(response: &str) -> Result<LocationParts, ExtractionError> {
    let obj = parse_json_object(response)?;
    let parts = LocationParts {
        city: text_field(&obj, &["city", "location_city"]).unwrap_or_default(),
        region: text_field(&obj, &["state", "region", "location_state"]).unwrap_or_default(),
        country: text_field(&obj, &["country", "location_country"]).unwrap_or_default(),
        raw: String::new(),
    };
    if parts.display().is_empty() {
        return Err(ExtractionError::MissingField("location"));
    }
    Ok(parts)
}

/// Strict parse first, then brace isolation.
fn parse_json_object(response: &str) -> Result<Map<String, Value>, ExtractionError> {
    let trimmed = response.trim();
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(obj);
    }

    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(ExtractionError::NoJson);
    };
    if end <= start {
        return Err(ExtractionError::NoJson);
    }

    debug!("Strict parse failed, isolating braces {}..={}", start, end);
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(_) => Err(ExtractionError::NoJson),
        Err(e) => Err(ExtractionError::Invalid(e.to_string())),
    }
}

/// Values models emit when they mean "unknown".
fn is_placeholder(s: &str) -> bool {
    matches!(
        s.to_lowercase().as_str(),
        "" | "null" | "none" | "n/a" | "na" | "unknown" | "not specified" | "not mentioned"
    )
}

/// First alias carrying a usable value. Nulls, empty arrays and placeholder
/// strings fall through to the next alias.
fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| match v {
        Value::Null => false,
        Value::String(s) => !is_placeholder(s.trim()),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    })
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let value = first(obj, keys)?;
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    if is_placeholder(&text) {
        None
    } else {
        Some(text)
    }
}

fn list_field(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let items: Vec<String> = match first(obj, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s.split([',', ';']).map(|p| p.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    items.into_iter().filter(|s| !is_placeholder(s)).collect()
}

/// Which end of a range like "120,000 - 150,000" a field wants.
#[derive(Clone, Copy)]
enum Bound {
    Lower,
    Upper,
}

fn int_field(obj: &Map<String, Value>, keys: &[&str], bound: Bound) -> Option<i64> {
    match first(obj, keys)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let amounts = parse_amounts(s);
            match bound {
                Bound::Lower => amounts.first().copied(),
                Bound::Upper => amounts.last().copied(),
            }
        }
        _ => None,
    }
}

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d,]*(?:\.\d+)?)\s*([kK])?").expect("valid regex")
});

/// Every amount in strings like "120,000", "$95k-$120k" or "85000.00".
fn parse_amounts(s: &str) -> Vec<i64> {
    AMOUNT
        .captures_iter(s)
        .filter_map(|caps| {
            let value: f64 = caps[1].replace(',', "").parse().ok()?;
            let multiplier = if caps.get(2).is_some() { 1000.0 } else { 1.0 };
            Some((value * multiplier).round() as i64)
        })
        .collect()
}

fn bool_field(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    match first(obj, keys) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}
