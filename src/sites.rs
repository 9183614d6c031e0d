//! Site registry: the ordered list of career-site search pages to visit.
//!
//! The file holds one URL per line. Blank lines and `#` comments are ignored.

use std::path::Path;

use tracing::debug;
use url::Url;

use crate::error::ScoutError;

/// Host labels that never name the employer.
const GENERIC_HOST_LABELS: &[&str] = &["www", "careers", "career", "jobs", "apply"];

/// A configured career site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    /// The search page URL as configured.
    pub url: String,
    /// The URL without query or fragment, used to reject self-links.
    pub base_url: String,
    /// Employer name derived from the host.
    pub company: String,
}

impl Site {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let parsed = Url::parse(raw).map_err(|e| format!("invalid URL '{raw}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("unsupported scheme in '{raw}'"));
        }
        let Some(host) = parsed.host_str() else {
            return Err(format!("URL '{raw}' has no host"));
        };
        Ok(Self {
            url: raw.to_string(),
            base_url: strip_query(raw),
            company: company_from_host(host),
        })
    }
}

/// Ordered, de-duplicated list of sites.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: Vec<Site>,
}

impl SiteRegistry {
    /// Load from a file. A missing or unreadable file is a configuration error.
    pub fn load(path: &Path) -> Result<Self, ScoutError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ScoutError::Configuration(format!("cannot read sites file {}: {e}", path.display()))
        })?;
        let registry = Self::parse(&text)?;
        debug!("Loaded {} sites from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn parse(text: &str) -> Result<Self, ScoutError> {
        let mut sites: Vec<Site> = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let site = Site::parse(line)
                .map_err(|e| ScoutError::Configuration(format!("line {}: {e}", idx + 1)))?;
            if !sites.iter().any(|s| s.url == site.url) {
                sites.push(site);
            }
        }
        Ok(Self { sites })
    }

    /// Like [`load`](Self::load), but an empty list is also an error.
    pub fn load_non_empty(path: &Path) -> Result<Self, ScoutError> {
        let registry = Self::load(path)?;
        if registry.is_empty() {
            return Err(ScoutError::Configuration(format!(
                "no sites configured in {}",
                path.display()
            )));
        }
        Ok(registry)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// Drop query string and fragment.
pub fn strip_query(url: &str) -> String {
    url.split(['?', '#']).next().unwrap_or(url).to_string()
}

/// First meaningful host label, e.g. `acme` for `acme.wd5.myworkdayjobs.com`.
pub fn company_from_host(host: &str) -> String {
    host.split('.')
        .find(|label| !GENERIC_HOST_LABELS.contains(label))
        .unwrap_or(host)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let registry = SiteRegistry::parse(
            "# banks\n\nhttps://bbva.wd3.myworkdayjobs.com/en-US/BBVA?q=x\n   \n  https://careers.example.com/search  \n",
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        let first = &registry.sites()[0];
        assert_eq!(first.company, "bbva");
        assert_eq!(first.base_url, "https://bbva.wd3.myworkdayjobs.com/en-US/BBVA");
        assert_eq!(registry.sites()[1].company, "example");
    }

    #[test]
    fn test_parse_dedupes_in_order() {
        let registry =
            SiteRegistry::parse("https://a.example.com\nhttps://b.example.com\nhttps://a.example.com\n")
                .unwrap();
        let urls: Vec<&str> = registry.sites().iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example.com", "https://b.example.com"]);
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        let err = SiteRegistry::parse("https://ok.example.com\nnot a url\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(SiteRegistry::parse("ftp://files.example.com").is_err());
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = SiteRegistry::load(Path::new("/definitely/not/here/sites.txt")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_load_non_empty() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# nothing yet").unwrap();
        assert!(SiteRegistry::load_non_empty(file.path()).is_err());

        writeln!(file, "https://jobs.example.org/search").unwrap();
        let registry = SiteRegistry::load_non_empty(file.path()).unwrap();
        assert_eq!(registry.sites()[0].company, "example");
    }

    #[test]
    fn test_company_from_host_skips_generic_labels() {
        assert_eq!(company_from_host("www.acme.com"), "acme");
        assert_eq!(company_from_host("acme.wd5.myworkdayjobs.com"), "acme");
    }
}
