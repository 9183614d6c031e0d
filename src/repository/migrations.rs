//! Schema setup for the jobs store.
//!
//! Statements are idempotent so `init_schema` can run on every start.

use diesel_async::SimpleAsyncConnection;
use tracing::debug;

use super::pool::{DbError, SqlitePool};

const JOBS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    company TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    source TEXT,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'discovered',
    location TEXT,
    city TEXT,
    region TEXT,
    country TEXT,
    country_code TEXT,
    work_type TEXT NOT NULL DEFAULT 'unknown',
    salary TEXT,
    salary_min INTEGER,
    salary_max INTEGER,
    salary_currency TEXT,
    job_type TEXT,
    experience_level TEXT,
    summary TEXT,
    mandatory_skills TEXT NOT NULL DEFAULT '[]',
    preferred_skills TEXT NOT NULL DEFAULT '[]',
    posted_date TEXT,
    requires_citizenship INTEGER NOT NULL DEFAULT 0,
    no_visa_sponsorship INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    scraped_at TEXT,
    enriched_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
"#;

/// Create tables and indexes if they do not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), DbError> {
    let mut conn = pool.get().await?;
    conn.batch_execute("PRAGMA journal_mode = WAL;").await?;
    conn.batch_execute(JOBS_SCHEMA).await?;
    debug!("Schema ready at {}", pool.database_url());
    Ok(())
}
