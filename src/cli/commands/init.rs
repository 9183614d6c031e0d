//! Initialize command.

use console::style;

use super::helpers::open_repository;
use crate::config::Settings;

const SITES_TEMPLATE: &str = "\
# One career-site search page per line. Blank lines and # comments are ignored.
# https://acme.wd5.myworkdayjobs.com/en-US/External
";

/// Initialize the data directory, database and an empty sites file.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    open_repository(settings).await?;
    println!(
        "{} Database ready at {}",
        style("✓").green(),
        settings.database.display()
    );

    if settings.sites_file.exists() {
        println!(
            "  Sites file: {}",
            style(settings.sites_file.display()).dim()
        );
    } else {
        if let Some(parent) = settings.sites_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&settings.sites_file, SITES_TEMPLATE)?;
        println!(
            "{} Created {}, add career-site URLs to get started",
            style("✓").green(),
            settings.sites_file.display()
        );
    }

    println!(
        "{} Initialized jobscout in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    Ok(())
}
