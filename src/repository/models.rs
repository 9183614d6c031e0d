//! Diesel row types for the jobs table.

use diesel::prelude::*;

use crate::schema;

/// Job record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub url: String,
    pub source: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub location: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub work_type: String,
    pub salary: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub summary: Option<String>,
    pub mandatory_skills: String,
    pub preferred_skills: String,
    pub posted_date: Option<String>,
    pub requires_citizenship: bool,
    pub no_visa_sponsorship: bool,
    pub created_at: String,
    pub scraped_at: Option<String>,
    pub enriched_at: Option<String>,
}

/// New job for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::jobs)]
pub struct NewJob<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub company: &'a str,
    pub url: &'a str,
    pub source: Option<&'a str>,
    pub description: Option<&'a str>,
    pub status: &'a str,
    pub location: Option<&'a str>,
    pub city: Option<&'a str>,
    pub region: Option<&'a str>,
    pub country: Option<&'a str>,
    pub country_code: Option<&'a str>,
    pub work_type: &'a str,
    pub salary: Option<&'a str>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: Option<&'a str>,
    pub job_type: Option<&'a str>,
    pub experience_level: Option<&'a str>,
    pub summary: Option<&'a str>,
    pub mandatory_skills: String,
    pub preferred_skills: String,
    pub posted_date: Option<&'a str>,
    pub requires_citizenship: bool,
    pub no_visa_sponsorship: bool,
    pub created_at: String,
    pub scraped_at: Option<String>,
    pub enriched_at: Option<String>,
}

/// Columns rewritten when enrichment lands on an existing row.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = schema::jobs)]
#[diesel(treat_none_as_null = true)]
pub struct EnrichmentChanges<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: &'a str,
    pub location: Option<&'a str>,
    pub city: Option<&'a str>,
    pub region: Option<&'a str>,
    pub country: Option<&'a str>,
    pub country_code: Option<&'a str>,
    pub work_type: &'a str,
    pub salary: Option<&'a str>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: Option<&'a str>,
    pub job_type: Option<&'a str>,
    pub experience_level: Option<&'a str>,
    pub summary: Option<&'a str>,
    pub mandatory_skills: String,
    pub preferred_skills: String,
    pub posted_date: Option<&'a str>,
    pub requires_citizenship: bool,
    pub no_visa_sponsorship: bool,
    pub scraped_at: Option<String>,
    pub enriched_at: Option<String>,
}

/// Columns rewritten when a stored location is re-validated.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = schema::jobs)]
pub struct LocationChanges<'a> {
    pub location: &'a str,
    pub city: &'a str,
    pub region: &'a str,
    pub country: &'a str,
    pub country_code: &'a str,
}
