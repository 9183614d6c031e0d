//! Site listing command.

use std::path::PathBuf;

use console::style;

use crate::config::Settings;
use crate::sites::SiteRegistry;

pub async fn cmd_sites(settings: &Settings, file: Option<PathBuf>) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(|| settings.sites_file.clone());
    let registry = SiteRegistry::load(&path)?;

    if registry.is_empty() {
        println!(
            "{} No sites configured in {}",
            style("!").yellow(),
            path.display()
        );
        return Ok(());
    }

    println!(
        "{}",
        style(format!("{} site(s) in {}", registry.len(), path.display())).bold()
    );
    for (i, site) in registry.sites().iter().enumerate() {
        println!(
            "  {:>3}. {:<20} {}",
            i + 1,
            style(&site.company).cyan(),
            site.url
        );
    }
    Ok(())
}
