//! Diesel-based job repository.
//!
//! The `url` column is unique: inserting a URL that already exists is
//! reported as [`InsertOutcome::AlreadyKnown`] rather than as an error, which
//! absorbs races between concurrent writers.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::models::{EnrichmentChanges, JobRecord, LocationChanges, NewJob};
use super::pool::{DbError, SqlitePool};
use super::util::{decode_list, encode_list};
use super::{migrations, parse_datetime, parse_datetime_opt};
use crate::enrichment::EnrichedPosting;
use crate::error::ScoutError;
use crate::geocode::NormalizedLocation;
use crate::models::{JobPosting, JobStatus, WorkArrangement};
use crate::pipeline::DuplicateOracle;
use crate::schema::jobs;
use crate::with_conn;

/// Result of inserting a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same URL exists already.
    AlreadyKnown,
}

/// Result of an external status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Updated { from: JobStatus, to: JobStatus },
    NotFound,
    /// The requested status is not later than the current one.
    Rejected { from: JobStatus, to: JobStatus },
}

/// Filters for listing postings.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    /// Case-insensitive substring of the location.
    pub location: Option<String>,
    pub source: Option<String>,
    pub limit: Option<i64>,
}

/// Convert a database record to a domain model.
impl TryFrom<JobRecord> for JobPosting {
    type Error = diesel::result::Error;

    fn try_from(record: JobRecord) -> Result<Self, Self::Error> {
        let status = JobStatus::from_str(&record.status).ok_or_else(|| {
            diesel::result::Error::DeserializationError(
                format!("unknown job status '{}'", record.status).into(),
            )
        })?;

        Ok(JobPosting {
            id: record.id,
            url: record.url,
            title: record.title,
            company: record.company,
            source: record.source,
            description: record.description,
            status,
            location: record.location,
            city: record.city,
            region: record.region,
            country: record.country,
            country_code: record.country_code,
            work_type: WorkArrangement::parse_loose(&record.work_type),
            salary: record.salary,
            salary_min: record.salary_min,
            salary_max: record.salary_max,
            salary_currency: record.salary_currency,
            job_type: record.job_type,
            experience_level: record.experience_level,
            summary: record.summary,
            mandatory_skills: decode_list(&record.mandatory_skills),
            preferred_skills: decode_list(&record.preferred_skills),
            posted_date: record.posted_date,
            requires_citizenship: record.requires_citizenship,
            no_visa_sponsorship: record.no_visa_sponsorship,
            created_at: parse_datetime(&record.created_at),
            scraped_at: parse_datetime_opt(record.scraped_at),
            enriched_at: parse_datetime_opt(record.enriched_at),
        })
    }
}

/// Diesel-based job repository with compile-time query checking.
#[derive(Debug, Clone)]
pub struct DieselJobRepository {
    pool: SqlitePool,
}

impl DieselJobRepository {
    /// Create a new Diesel job repository with an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables if needed.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        migrations::init_schema(&self.pool).await
    }

    /// Check if a posting with this URL is already stored.
    pub async fn exists(&self, url: &str) -> Result<bool, DbError> {
        use diesel::dsl::count_star;
        with_conn!(self.pool, conn, {
            let count: i64 = jobs::table
                .filter(jobs::url.eq(url))
                .select(count_star())
                .first(&mut conn)
                .await?;
            Ok(count > 0)
        })
    }

    /// Insert a posting. A URL that is already stored is a soft success.
    pub async fn insert(&self, job: &JobPosting) -> Result<InsertOutcome, DbError> {
        let mandatory = encode_list(&job.mandatory_skills);
        let preferred = encode_list(&job.preferred_skills);
        let new_job = NewJob {
            id: &job.id,
            title: &job.title,
            company: &job.company,
            url: &job.url,
            source: job.source.as_deref(),
            description: job.description.as_deref(),
            status: job.status.as_str(),
            location: job.location.as_deref(),
            city: job.city.as_deref(),
            region: job.region.as_deref(),
            country: job.country.as_deref(),
            country_code: job.country_code.as_deref(),
            work_type: job.work_type.as_str(),
            salary: job.salary.as_deref(),
            salary_min: job.salary_min,
            salary_max: job.salary_max,
            salary_currency: job.salary_currency.as_deref(),
            job_type: job.job_type.as_deref(),
            experience_level: job.experience_level.as_deref(),
            summary: job.summary.as_deref(),
            mandatory_skills: mandatory,
            preferred_skills: preferred,
            posted_date: job.posted_date.as_deref(),
            requires_citizenship: job.requires_citizenship,
            no_visa_sponsorship: job.no_visa_sponsorship,
            created_at: job.created_at.to_rfc3339(),
            scraped_at: job.scraped_at.map(|dt| dt.to_rfc3339()),
            enriched_at: job.enriched_at.map(|dt| dt.to_rfc3339()),
        };

        with_conn!(self.pool, conn, {
            let rows = diesel::insert_into(jobs::table)
                .values(&new_job)
                .on_conflict(jobs::url)
                .do_nothing()
                .execute(&mut conn)
                .await?;
            if rows == 0 {
                debug!("Already known: {}", job.url);
                Ok(InsertOutcome::AlreadyKnown)
            } else {
                Ok(InsertOutcome::Inserted)
            }
        })
    }

    /// Get a posting by ID.
    pub async fn get(&self, id: &str) -> Result<Option<JobPosting>, DbError> {
        with_conn!(self.pool, conn, {
            jobs::table
                .find(id)
                .first::<JobRecord>(&mut conn)
                .await
                .optional()
                .and_then(|opt| opt.map(JobPosting::try_from).transpose())
        })
    }

    /// Get a posting by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<JobPosting>, DbError> {
        with_conn!(self.pool, conn, {
            jobs::table
                .filter(jobs::url.eq(url))
                .first::<JobRecord>(&mut conn)
                .await
                .optional()
                .and_then(|opt| opt.map(JobPosting::try_from).transpose())
        })
    }

    /// List postings, newest first.
    pub async fn list(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, DbError> {
        let mut query = jobs::table.into_boxed();
        if let Some(status) = filter.status {
            query = query.filter(jobs::status.eq(status.as_str()));
        }
        if let Some(ref location) = filter.location {
            query = query.filter(jobs::location.like(format!("%{location}%")));
        }
        if let Some(ref source) = filter.source {
            query = query.filter(jobs::source.eq(source.clone()));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        with_conn!(self.pool, conn, {
            query
                .order(jobs::created_at.desc())
                .load::<JobRecord>(&mut conn)
                .await
                .and_then(|records| records.into_iter().map(JobPosting::try_from).collect())
        })
    }

    /// Postings still waiting for enrichment, oldest first.
    pub async fn pending_enrichment(&self, limit: Option<i64>) -> Result<Vec<JobPosting>, DbError> {
        let mut query = jobs::table
            .filter(jobs::status.eq(JobStatus::Discovered.as_str()))
            .order(jobs::created_at.asc())
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        with_conn!(self.pool, conn, {
            query
                .load::<JobRecord>(&mut conn)
                .await
                .and_then(|records| records.into_iter().map(JobPosting::try_from).collect())
        })
    }

    /// Merge enrichment output into a stored posting.
    ///
    /// Returns the updated posting, or `None` when the ID is unknown.
    pub async fn apply_enrichment(
        &self,
        id: &str,
        enriched: &EnrichedPosting,
    ) -> Result<Option<JobPosting>, DbError> {
        let Some(mut job) = self.get(id).await? else {
            return Ok(None);
        };
        job.apply_enrichment(enriched);

        let mandatory = encode_list(&job.mandatory_skills);
        let preferred = encode_list(&job.preferred_skills);
        let changes = EnrichmentChanges {
            title: &job.title,
            description: job.description.as_deref(),
            status: job.status.as_str(),
            location: job.location.as_deref(),
            city: job.city.as_deref(),
            region: job.region.as_deref(),
            country: job.country.as_deref(),
            country_code: job.country_code.as_deref(),
            work_type: job.work_type.as_str(),
            salary: job.salary.as_deref(),
            salary_min: job.salary_min,
            salary_max: job.salary_max,
            salary_currency: job.salary_currency.as_deref(),
            job_type: job.job_type.as_deref(),
            experience_level: job.experience_level.as_deref(),
            summary: job.summary.as_deref(),
            mandatory_skills: mandatory,
            preferred_skills: preferred,
            posted_date: job.posted_date.as_deref(),
            requires_citizenship: job.requires_citizenship,
            no_visa_sponsorship: job.no_visa_sponsorship,
            scraped_at: job.scraped_at.map(|dt| dt.to_rfc3339()),
            enriched_at: job.enriched_at.map(|dt| dt.to_rfc3339()),
        };

        with_conn!(self.pool, conn, {
            diesel::update(jobs::table.find(id))
                .set(&changes)
                .execute(&mut conn)
                .await
        })?;

        Ok(Some(job))
    }

    /// Postings with a stored location that was never validated, oldest first.
    pub async fn unvalidated_locations(&self, limit: Option<i64>) -> Result<Vec<JobPosting>, DbError> {
        let mut query = jobs::table
            .filter(jobs::country_code.is_null().or(jobs::country_code.eq("")))
            .filter(jobs::location.is_not_null())
            .filter(jobs::location.ne(""))
            .order(jobs::created_at.asc())
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        with_conn!(self.pool, conn, {
            query
                .load::<JobRecord>(&mut conn)
                .await
                .and_then(|records| records.into_iter().map(JobPosting::try_from).collect())
        })
    }

    /// Replace the location columns of a posting. Returns false for an unknown ID.
    pub async fn update_location(&self, id: &str, location: &NormalizedLocation) -> Result<bool, DbError> {
        let changes = LocationChanges {
            location: &location.display,
            city: &location.city,
            region: &location.region,
            country: &location.country,
            country_code: &location.country_code,
        };
        let rows = with_conn!(self.pool, conn, {
            diesel::update(jobs::table.find(id))
                .set(&changes)
                .execute(&mut conn)
                .await
        })?;
        Ok(rows > 0)
    }

    /// Apply an external status change. Status only moves forward.
    pub async fn update_status(&self, id: &str, status: JobStatus) -> Result<StatusUpdate, DbError> {
        let current = with_conn!(self.pool, conn, {
            jobs::table
                .find(id)
                .select(jobs::status)
                .first::<String>(&mut conn)
                .await
                .optional()
        })?;

        let Some(current) = current else {
            return Ok(StatusUpdate::NotFound);
        };
        let from = JobStatus::from_str(&current).ok_or_else(|| {
            diesel::result::Error::DeserializationError(
                format!("unknown job status '{current}'").into(),
            )
        })?;

        if !from.can_advance_to(status) {
            return Ok(StatusUpdate::Rejected { from, to: status });
        }

        // Compare-and-set so a concurrent change cannot be overwritten backwards.
        let rows = with_conn!(self.pool, conn, {
            diesel::update(
                jobs::table
                    .find(id)
                    .filter(jobs::status.eq(from.as_str())),
            )
            .set(jobs::status.eq(status.as_str()))
            .execute(&mut conn)
            .await
        })?;

        if rows == 0 {
            return Ok(StatusUpdate::Rejected { from, to: status });
        }
        Ok(StatusUpdate::Updated { from, to: status })
    }

    /// Count postings per status.
    pub async fn count_by_status(&self) -> Result<Vec<(JobStatus, i64)>, DbError> {
        use diesel::dsl::count_star;
        let rows: Vec<(String, i64)> = with_conn!(self.pool, conn, {
            jobs::table
                .group_by(jobs::status)
                .select((jobs::status, count_star()))
                .load::<(String, i64)>(&mut conn)
                .await
        })?;

        let mut counts: Vec<(JobStatus, i64)> = rows
            .into_iter()
            .filter_map(|(status, count)| JobStatus::from_str(&status).map(|s| (s, count)))
            .collect();
        counts.sort_by_key(|(status, _)| *status);
        Ok(counts)
    }

    /// Total number of stored postings.
    pub async fn count(&self) -> Result<i64, DbError> {
        use diesel::dsl::count_star;
        with_conn!(self.pool, conn, {
            jobs::table.select(count_star()).first(&mut conn).await
        })
    }
}

#[async_trait]
impl DuplicateOracle for DieselJobRepository {
    async fn exists(&self, url: &str) -> Result<bool, ScoutError> {
        Ok(DieselJobRepository::exists(self, url).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::EnrichmentResult;
    use tempfile::tempdir;

    async fn setup_test_db() -> (DieselJobRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let repo = DieselJobRepository::new(SqlitePool::from_path(&db_path));
        repo.init_schema().await.unwrap();
        (repo, dir)
    }

    fn enriched(title: &str, display: &str) -> EnrichedPosting {
        EnrichedPosting {
            result: EnrichmentResult {
                title: title.to_string(),
                city: "Pune".into(),
                country: "India".into(),
                mandatory_skills: vec!["Spark".into(), "Scala".into()],
                ..EnrichmentResult::default()
            },
            location: NormalizedLocation {
                display: display.to_string(),
                city: "Pune".into(),
                region: "Maharashtra".into(),
                country: "India".into(),
                country_code: "IN".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_job_crud() {
        let (repo, _dir) = setup_test_db().await;

        let mut job = JobPosting::discovered("https://acme.wd1.example.com/job/123", "Data Engineer", "acme")
            .with_source("https://acme.wd1.example.com/careers");
        job.mandatory_skills = vec!["SQL".into(), "Python".into()];

        assert_eq!(repo.insert(&job).await.unwrap(), InsertOutcome::Inserted);
        assert!(repo.exists(&job.url).await.unwrap());
        assert!(!repo.exists("https://acme.wd1.example.com/job/999").await.unwrap());

        let loaded = repo.get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.url, job.url);
        assert_eq!(loaded.status, JobStatus::Discovered);
        assert_eq!(loaded.mandatory_skills, vec!["SQL", "Python"]);

        let by_url = repo.get_by_url(&job.url).await.unwrap().unwrap();
        assert_eq!(by_url.id, job.id);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_soft() {
        let (repo, _dir) = setup_test_db().await;

        let first = JobPosting::discovered("https://example.com/job/1", "Engineer", "example");
        let second = JobPosting::discovered("https://example.com/job/1", "Engineer II", "example");

        assert_eq!(repo.insert(&first).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(repo.insert(&second).await.unwrap(), InsertOutcome::AlreadyKnown);
        assert_eq!(repo.count().await.unwrap(), 1);

        let stored = repo.get_by_url("https://example.com/job/1").await.unwrap().unwrap();
        assert_eq!(stored.title, "Engineer");
    }

    #[tokio::test]
    async fn test_apply_enrichment_promotes_status() {
        let (repo, _dir) = setup_test_db().await;
        let job = JobPosting::discovered("https://example.com/job/7", "Engineer", "example");
        repo.insert(&job).await.unwrap();

        let updated = repo
            .apply_enrichment(&job.id, &enriched("Senior Data Engineer", "Pune, Maharashtra, India"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, JobStatus::Enriched);

        let stored = repo.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Enriched);
        assert_eq!(stored.title, "Senior Data Engineer");
        assert_eq!(stored.country_code.as_deref(), Some("IN"));
        assert_eq!(stored.mandatory_skills, vec!["Spark", "Scala"]);
        assert!(stored.enriched_at.is_some());

        assert!(repo.pending_enrichment(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_enrichment_without_location_keeps_discovered() {
        let (repo, _dir) = setup_test_db().await;
        let job = JobPosting::discovered("https://example.com/job/8", "Engineer", "example");
        repo.insert(&job).await.unwrap();

        repo.apply_enrichment(&job.id, &enriched("Engineer", "")).await.unwrap();

        let stored = repo.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Discovered);
        assert_eq!(repo.pending_enrichment(Some(10)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_status_forward_only() {
        let (repo, _dir) = setup_test_db().await;
        let job = JobPosting::discovered("https://example.com/job/9", "Analyst", "example");
        repo.insert(&job).await.unwrap();

        assert_eq!(
            repo.update_status(&job.id, JobStatus::Interested).await.unwrap(),
            StatusUpdate::Updated {
                from: JobStatus::Discovered,
                to: JobStatus::Interested
            }
        );
        assert_eq!(
            repo.update_status(&job.id, JobStatus::Enriched).await.unwrap(),
            StatusUpdate::Rejected {
                from: JobStatus::Interested,
                to: JobStatus::Enriched
            }
        );
        assert_eq!(
            repo.update_status("missing", JobStatus::Applied).await.unwrap(),
            StatusUpdate::NotFound
        );
    }

    #[tokio::test]
    async fn test_list_filters_and_counts() {
        let (repo, _dir) = setup_test_db().await;

        let mut remote = JobPosting::discovered("https://example.com/job/a", "Engineer", "example");
        remote.location = Some("Austin, Texas, United States".into());
        let mut other = JobPosting::discovered("https://example.com/job/b", "Manager", "example");
        other.location = Some("Pune, India".into());
        other.status = JobStatus::Enriched;
        repo.insert(&remote).await.unwrap();
        repo.insert(&other).await.unwrap();

        let enriched = repo
            .list(&JobFilter {
                status: Some(JobStatus::Enriched),
                ..JobFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].title, "Manager");

        let austin = repo
            .list(&JobFilter {
                location: Some("austin".into()),
                ..JobFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(austin.len(), 1);

        let counts = repo.count_by_status().await.unwrap();
        assert_eq!(
            counts,
            vec![(JobStatus::Discovered, 1), (JobStatus::Enriched, 1)]
        );
    }

    #[tokio::test]
    async fn test_list_filters_by_source() {
        let (repo, _dir) = setup_test_db().await;
        let acme = JobPosting::discovered("https://acme.example.com/job/1", "Engineer", "acme")
            .with_source("https://acme.example.com/careers");
        let globex = JobPosting::discovered("https://globex.example.com/job/1", "Engineer", "globex")
            .with_source("https://globex.example.com/careers");
        repo.insert(&acme).await.unwrap();
        repo.insert(&globex).await.unwrap();

        let found = repo
            .list(&JobFilter {
                source: Some("https://globex.example.com/careers".into()),
                ..JobFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].company, "globex");
    }

    #[tokio::test]
    async fn test_unvalidated_locations_and_update() {
        let (repo, _dir) = setup_test_db().await;

        let mut raw = JobPosting::discovered("https://example.com/job/raw", "Engineer", "example");
        raw.location = Some("Pune, India".into());
        let mut blank_code = JobPosting::discovered("https://example.com/job/blank", "Engineer", "example");
        blank_code.location = Some("Austin".into());
        blank_code.country_code = Some(String::new());
        let mut validated = JobPosting::discovered("https://example.com/job/ok", "Engineer", "example");
        validated.location = Some("London, England, United Kingdom".into());
        validated.country_code = Some("GB".into());
        let unlocated = JobPosting::discovered("https://example.com/job/none", "Engineer", "example");
        for job in [&raw, &blank_code, &validated, &unlocated] {
            repo.insert(job).await.unwrap();
        }

        let pending = repo.unvalidated_locations(None).await.unwrap();
        let mut urls: Vec<&str> = pending.iter().map(|j| j.url.as_str()).collect();
        urls.sort();
        assert_eq!(urls, vec!["https://example.com/job/blank", "https://example.com/job/raw"]);

        let location = NormalizedLocation {
            display: "Pune, Maharashtra, India".into(),
            city: "Pune".into(),
            region: "Maharashtra".into(),
            country: "India".into(),
            country_code: "IN".into(),
        };
        assert!(repo.update_location(&raw.id, &location).await.unwrap());
        assert!(!repo.update_location("missing", &location).await.unwrap());

        let stored = repo.get(&raw.id).await.unwrap().unwrap();
        assert_eq!(stored.location.as_deref(), Some("Pune, Maharashtra, India"));
        assert_eq!(stored.country_code.as_deref(), Some("IN"));
        assert_eq!(repo.unvalidated_locations(None).await.unwrap().len(), 1);
    }
}
