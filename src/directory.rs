use scraper::Html;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::client::PageSource;
use crate::config::HarvestConfig;
use crate::error::{Result, ScrapeError};
use crate::layout::directory_links;
use crate::model::School;
use crate::utils::with_retry;

/// Fetches the team listing for the configured sport and division. Any
/// failure is reported as [`ScrapeError::Directory`] and ends the run.
pub async fn resolve_schools(source: &dyn PageSource, config: &HarvestConfig) -> Result<Vec<School>> {
    let url = config.directory_url();
    let html = with_retry("team listing", config.retry_backoff, || source.get(&url))
        .await
        .map_err(|e| ScrapeError::Directory(format!("{}: {}", url, e)))?;

    let schools = parse_directory(&html).map_err(|e| ScrapeError::Directory(e.to_string()))?;
    info!(count = schools.len(), "resolved schools");
    Ok(schools)
}

/// Parses the team listing into schools, first occurrence of a name wins.
pub fn parse_directory(html: &str) -> Result<Vec<School>> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut schools = Vec::new();

    for (name, href) in directory_links(&document)? {
        // href looks like /team/{id}/{seq}
        let Some(id) = href.split('/').nth(2).filter(|s| !s.is_empty()) else {
            warn!(href = %href, "team link without an id");
            continue;
        };
        if name.is_empty() || !seen.insert(name.clone()) {
            continue;
        }
        schools.push(School::new(id, name));
    }

    if schools.is_empty() {
        return Err(ScrapeError::layout("school link", 0, 0));
    }
    Ok(schools)
}

/// Keeps only the named schools, preserving directory order.
pub fn filter_schools(schools: Vec<School>, names: &[String]) -> Vec<School> {
    if names.is_empty() {
        return schools;
    }
    schools
        .into_iter()
        .filter(|s| names.iter().any(|n| n.eq_ignore_ascii_case(&s.name)))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
