//! Job posting model and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enrichment::EnrichedPosting;

/// Sentinel stored for optional text fields the model could not determine.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Lifecycle status of a posting.
///
/// Variants are declared in lifecycle order; a posting only ever moves to a
/// strictly later status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Discovered,
    Enriched,
    Scraped,
    Interested,
    Applied,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        Self::Discovered,
        Self::Enriched,
        Self::Scraped,
        Self::Interested,
        Self::Applied,
        Self::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Enriched => "enriched",
            Self::Scraped => "scraped",
            Self::Interested => "interested",
            Self::Applied => "applied",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "discovered" => Some(Self::Discovered),
            "enriched" => Some(Self::Enriched),
            "scraped" => Some(Self::Scraped),
            "interested" => Some(Self::Interested),
            "applied" => Some(Self::Applied),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Whether a transition from `self` to `next` moves forward.
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        next > *self
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkArrangement {
    Remote,
    Hybrid,
    Onsite,
    #[default]
    Unknown,
}

impl WorkArrangement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Hybrid => "hybrid",
            Self::Onsite => "onsite",
            Self::Unknown => "unknown",
        }
    }

    /// Lenient parse of free text such as "Fully remote" or "On-site".
    pub fn parse_loose(s: &str) -> Self {
        let lower = s.to_lowercase();
        if lower.contains("hybrid") {
            Self::Hybrid
        } else if lower.contains("remote") {
            Self::Remote
        } else if lower.contains("onsite")
            || lower.contains("on-site")
            || lower.contains("on site")
            || lower.contains("in office")
            || lower.contains("in-office")
        {
            Self::Onsite
        } else {
            Self::Unknown
        }
    }
}

/// A job posting, keyed by URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub url: String,
    pub title: String,
    pub company: String,
    /// Site the posting was discovered on.
    pub source: Option<String>,
    pub description: Option<String>,
    pub status: JobStatus,
    /// Display location, either geocoded or as the model produced it.
    pub location: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    /// ISO country code. Empty when the location was never validated.
    pub country_code: Option<String>,
    pub work_type: WorkArrangement,
    pub salary: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub summary: Option<String>,
    pub mandatory_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub posted_date: Option<String>,
    pub requires_citizenship: bool,
    pub no_visa_sponsorship: bool,
    pub created_at: DateTime<Utc>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub enriched_at: Option<DateTime<Utc>>,
}

impl JobPosting {
    /// Create a freshly discovered posting with only page-level data.
    pub fn discovered(url: &str, title: &str, company: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            title: title.to_string(),
            company: company.to_string(),
            source: None,
            description: None,
            status: JobStatus::Discovered,
            location: None,
            city: None,
            region: None,
            country: None,
            country_code: None,
            work_type: WorkArrangement::Unknown,
            salary: None,
            salary_min: None,
            salary_max: None,
            salary_currency: None,
            job_type: None,
            experience_level: None,
            summary: None,
            mandatory_skills: Vec::new(),
            preferred_skills: Vec::new(),
            posted_date: None,
            requires_citizenship: false,
            no_visa_sponsorship: false,
            created_at: Utc::now(),
            scraped_at: None,
            enriched_at: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.trim().is_empty() {
            self.description = Some(description);
        }
        self
    }

    /// Merge enrichment output into this posting.
    ///
    /// Status moves to `Enriched` only when both title and location are
    /// non-empty; otherwise the posting keeps its current status.
    pub fn apply_enrichment(&mut self, enriched: &EnrichedPosting) {
        let result = &enriched.result;

        if !result.title.trim().is_empty() {
            self.title = result.title.clone();
        }
        if !result.description.trim().is_empty() && result.description != NOT_SPECIFIED {
            self.description = Some(result.description.clone());
        }

        let location = &enriched.location;
        self.location = non_empty(&location.display);
        self.city = non_empty(&location.city);
        self.region = non_empty(&location.region);
        self.country = non_empty(&location.country);
        self.country_code = Some(location.country_code.clone());

        self.work_type = result.work_type;
        self.salary = Some(result.salary.clone());
        self.salary_min = result.salary_min;
        self.salary_max = result.salary_max;
        self.salary_currency = non_empty(&result.salary_currency);
        self.job_type = Some(result.job_type.clone());
        self.experience_level = Some(result.experience_level.clone());
        self.summary = Some(result.summary.clone());
        self.mandatory_skills = result.mandatory_skills.clone();
        self.preferred_skills = result.preferred_skills.clone();
        self.posted_date = Some(result.posted_date.clone());
        self.requires_citizenship = result.requires_citizenship;
        self.no_visa_sponsorship = result.no_visa_sponsorship;

        let now = Utc::now();
        self.scraped_at = Some(now);
        if self.is_enrichable() && self.status.can_advance_to(JobStatus::Enriched) {
            self.status = JobStatus::Enriched;
            self.enriched_at = Some(now);
        }
    }

    /// Whether the posting carries the minimum fields for `Enriched`.
    pub fn is_enrichable(&self) -> bool {
        !self.title.trim().is_empty()
            && self
                .location
                .as_deref()
                .is_some_and(|l| !l.trim().is_empty())
    }

    /// Human-readable salary line.
    pub fn salary_display(&self) -> String {
        match (self.salary_min, self.salary_max) {
            (Some(min), Some(max)) => format!(
                "{min}-{max}{}",
                self.salary_currency
                    .as_deref()
                    .map(|c| format!(" {c}"))
                    .unwrap_or_default()
            ),
            _ => self
                .salary
                .clone()
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::EnrichmentResult;
    use crate::geocode::NormalizedLocation;

    fn enriched(title: &str, city: &str, display: &str) -> EnrichedPosting {
        let mut result = EnrichmentResult::default();
        result.title = title.to_string();
        result.city = city.to_string();
        result.mandatory_skills = vec!["SQL".into(), "Python".into()];
        EnrichedPosting {
            result,
            location: NormalizedLocation {
                display: display.to_string(),
                city: city.to_string(),
                region: String::new(),
                country: String::new(),
                country_code: String::new(),
            },
        }
    }

    #[test]
    fn test_status_ordering() {
        assert!(JobStatus::Discovered.can_advance_to(JobStatus::Enriched));
        assert!(JobStatus::Discovered.can_advance_to(JobStatus::Applied));
        assert!(JobStatus::Applied.can_advance_to(JobStatus::Rejected));
        assert!(!JobStatus::Enriched.can_advance_to(JobStatus::Discovered));
        assert!(!JobStatus::Interested.can_advance_to(JobStatus::Interested));
        assert!(!JobStatus::Rejected.can_advance_to(JobStatus::Applied));
    }

    #[test]
    fn test_status_round_trip() {
        for status in JobStatus::ALL {
            assert_eq!(JobStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::from_str(" Applied "), Some(JobStatus::Applied));
        assert_eq!(JobStatus::from_str("archived"), None);
    }

    #[test]
    fn test_work_arrangement_loose() {
        assert_eq!(WorkArrangement::parse_loose("Fully Remote"), WorkArrangement::Remote);
        assert_eq!(WorkArrangement::parse_loose("Hybrid (remote 2 days)"), WorkArrangement::Hybrid);
        assert_eq!(WorkArrangement::parse_loose("On-site"), WorkArrangement::Onsite);
        assert_eq!(WorkArrangement::parse_loose("Not specified"), WorkArrangement::Unknown);
    }

    #[test]
    fn test_enrichment_promotes_with_title_and_location() {
        let mut job = JobPosting::discovered("https://example.com/job/1", "Engineer", "example");
        job.apply_enrichment(&enriched("Data Engineer", "Pune", "Pune, India"));

        assert_eq!(job.status, JobStatus::Enriched);
        assert_eq!(job.title, "Data Engineer");
        assert_eq!(job.location.as_deref(), Some("Pune, India"));
        assert_eq!(job.country_code.as_deref(), Some(""));
        assert_eq!(job.mandatory_skills, vec!["SQL", "Python"]);
        assert!(job.enriched_at.is_some());
    }

    #[test]
    fn test_enrichment_without_location_stays_discovered() {
        let mut job = JobPosting::discovered("https://example.com/job/2", "Analyst", "example");
        job.apply_enrichment(&enriched("Analyst", "", ""));

        assert_eq!(job.status, JobStatus::Discovered);
        assert!(job.enriched_at.is_none());
    }

    #[test]
    fn test_enrichment_never_regresses_status() {
        let mut job = JobPosting::discovered("https://example.com/job/3", "Lead", "example");
        job.status = JobStatus::Applied;
        job.apply_enrichment(&enriched("Lead", "Austin", "Austin, US"));
        assert_eq!(job.status, JobStatus::Applied);
    }

    #[test]
    fn test_salary_display() {
        let mut job = JobPosting::discovered("https://example.com/job/4", "Dev", "example");
        assert_eq!(job.salary_display(), NOT_SPECIFIED);
        job.salary_min = Some(90000);
        job.salary_max = Some(120000);
        job.salary_currency = Some("USD".into());
        assert_eq!(job.salary_display(), "90000-120000 USD");
    }
}
