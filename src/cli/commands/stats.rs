//! Status counts.

use console::style;

use super::helpers::open_repository;
use crate::config::Settings;
use crate::models::JobStatus;

pub async fn cmd_stats(settings: &Settings) -> anyhow::Result<()> {
    let repo = open_repository(settings).await?;
    let counts = repo.count_by_status().await?;
    let total: i64 = counts.iter().map(|(_, n)| n).sum();

    println!("\n{}", style("Postings").bold());
    println!("{}", "-".repeat(30));
    for status in JobStatus::ALL {
        let n = counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        println!("  {:<12} {:>8}", status.as_str(), n);
    }
    println!("{}", "-".repeat(30));
    println!("  {:<12} {:>8}", style("total").bold(), total);
    Ok(())
}
