//! Posting inspection and status commands.

use anyhow::bail;
use console::style;

use super::helpers::open_repository;
use crate::config::Settings;
use crate::models::{JobPosting, JobStatus, NOT_SPECIFIED};
use crate::repository::{JobFilter, StatusUpdate};

fn parse_status(s: &str) -> anyhow::Result<JobStatus> {
    match JobStatus::from_str(s) {
        Some(status) => Ok(status),
        None => {
            let valid: Vec<&str> = JobStatus::ALL.iter().map(|s| s.as_str()).collect();
            bail!("unknown status '{}' (expected one of: {})", s, valid.join(", "))
        }
    }
}

fn status_style(status: JobStatus) -> console::StyledObject<&'static str> {
    let s = style(status.as_str());
    match status {
        JobStatus::Discovered => s.dim(),
        JobStatus::Enriched | JobStatus::Scraped => s.cyan(),
        JobStatus::Interested => s.yellow(),
        JobStatus::Applied => s.green(),
        JobStatus::Rejected => s.red(),
    }
}

pub async fn cmd_jobs_list(
    settings: &Settings,
    status: Option<&str>,
    location: Option<String>,
    source: Option<String>,
    limit: i64,
    json: bool,
) -> anyhow::Result<()> {
    let repo = open_repository(settings).await?;
    let filter = JobFilter {
        status: status.map(parse_status).transpose()?,
        location,
        source,
        limit: Some(limit),
    };
    let jobs = repo.list(&filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }
    if jobs.is_empty() {
        println!("{} No postings found", style("!").yellow());
        return Ok(());
    }

    for job in &jobs {
        println!(
            "{:<11} {}  {} {}",
            status_style(job.status),
            style(&job.id[..8.min(job.id.len())]).dim(),
            style(&job.title).bold(),
            style(format!(
                "@ {} - {}",
                job.company,
                job.location.as_deref().unwrap_or(NOT_SPECIFIED)
            ))
            .dim()
        );
    }
    println!("\n{} posting(s)", jobs.len());
    Ok(())
}

fn print_job(job: &JobPosting) {
    let or_unset = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_SPECIFIED.to_string());

    println!("{}", style(&job.title).bold());
    println!("{}", "-".repeat(40));
    println!("  ID:          {}", job.id);
    println!("  Company:     {}", job.company);
    println!("  URL:         {}", job.url);
    println!("  Status:      {}", status_style(job.status));
    println!(
        "  Location:    {}{}",
        or_unset(&job.location),
        job.country_code
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| format!(" ({c})"))
            .unwrap_or_default()
    );
    println!("  Work type:   {}", job.work_type.as_str());
    println!("  Salary:      {}", job.salary_display());
    println!("  Job type:    {}", or_unset(&job.job_type));
    println!("  Level:       {}", or_unset(&job.experience_level));
    println!("  Posted:      {}", or_unset(&job.posted_date));
    if job.requires_citizenship {
        println!("  {}", style("Requires citizenship").yellow());
    }
    if job.no_visa_sponsorship {
        println!("  {}", style("No visa sponsorship").yellow());
    }
    if !job.mandatory_skills.is_empty() {
        println!("  Must have:   {}", job.mandatory_skills.join(", "));
    }
    if !job.preferred_skills.is_empty() {
        println!("  Nice to have: {}", job.preferred_skills.join(", "));
    }
    if let Some(ref summary) = job.summary {
        println!("\n  {}", summary);
    }
    println!(
        "\n  {}",
        style(format!(
            "created {}{}",
            job.created_at.format("%Y-%m-%d %H:%M"),
            job.enriched_at
                .map(|t| format!(", enriched {}", t.format("%Y-%m-%d %H:%M")))
                .unwrap_or_default()
        ))
        .dim()
    );
}

pub async fn cmd_jobs_show(settings: &Settings, id: &str) -> anyhow::Result<()> {
    let repo = open_repository(settings).await?;
    match repo.get(id).await? {
        Some(job) => {
            print_job(&job);
            Ok(())
        }
        None => bail!("no posting with id {}", id),
    }
}

pub async fn cmd_jobs_set_status(settings: &Settings, id: &str, status: &str) -> anyhow::Result<()> {
    let status = parse_status(status)?;
    let repo = open_repository(settings).await?;
    match repo.update_status(id, status).await? {
        StatusUpdate::Updated { from, to } => {
            println!(
                "{} {} → {}",
                style("✓").green(),
                status_style(from),
                status_style(to)
            );
            Ok(())
        }
        StatusUpdate::NotFound => bail!("no posting with id {}", id),
        StatusUpdate::Rejected { from, to } => bail!(
            "cannot move a posting from {} back to {}; status only moves forward",
            from,
            to
        ),
    }
}
