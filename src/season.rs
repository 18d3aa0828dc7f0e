use scraper::Html;
use tracing::{debug, info, warn};

use crate::client::PageSource;
use crate::config::HarvestConfig;
use crate::error::Result;
use crate::layout::season_links;
use crate::model::{School, Season};
use crate::utils::with_retry;

/// Lists the seasons a school has published stats for, newest first as the
/// site orders them. Excluded labels and repeated labels are dropped.
pub async fn enumerate_seasons(
    source: &dyn PageSource,
    config: &HarvestConfig,
    school: &School,
) -> Result<Vec<Season>> {
    let url = config.landing_url(&school.id);
    let html = with_retry("landing page", config.retry_backoff, || source.get(&url)).await?;
    let seasons = parse_seasons(&html, config)?;
    info!(school = %school.name, count = seasons.len(), "enumerated seasons");
    Ok(seasons)
}

pub fn parse_seasons(html: &str, config: &HarvestConfig) -> Result<Vec<Season>> {
    let document = Html::parse_document(html);
    let mut seasons: Vec<Season> = Vec::new();

    for (label, token) in season_links(&document)? {
        if label.is_empty() {
            continue;
        }
        if let Some(kept) = seasons.iter().find(|s| s.label == label) {
            if kept.token != token {
                warn!(season = %label, kept = %kept.token, dropped = %token, "repeated season label, link dropped");
            }
            continue;
        }
        if config.is_excluded(&label) {
            debug!(season = %label, "season excluded");
            continue;
        }
        seasons.push(Season { label, token });
    }

    Ok(seasons)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const LANDING: &str = r#"<html><body>
        <a href="/team/746/stats?year_stat_category=nav">Team Stats</a>
        <a href="/team/746/stats?year_stat_category=nav2">Game By Game</a>
        <ul>
          <li><a href="/team/746/stats?year_stat_category=12">2011-12</a></li>
          <li><a href="/team/746/stats?year_stat_category=11">2010-11</a></li>
          <li><a href="/team/746/stats?year_stat_category=10">2009-10</a></li>
        </ul></body></html>"#;

    #[test]
    fn test_parse_seasons_applies_exclusions() {
        let seasons = parse_seasons(LANDING, &HarvestConfig::default()).unwrap();
        let labels: Vec<_> = seasons.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["2011-12", "2009-10"]);
        assert_eq!(seasons[0].token, "/team/746/stats?year_stat_category=12");
    }

    #[test]
    fn test_parse_seasons_exclusions_are_configurable() {
        let config = HarvestConfig {
            excluded_seasons: Vec::new(),
            ..HarvestConfig::default()
        };
        assert_eq!(parse_seasons(LANDING, &config).unwrap().len(), 3);
    }

    #[test]
    fn test_parse_seasons_repeated_label_keeps_first_link() {
        let html = r#"<a href="?year_stat_category=a">x</a><a href="?year_stat_category=b">y</a>
            <a href="/team/746/stats?year_stat_category=15">2015-16</a>
            <a href="/team/746/stats?year_stat_category=99">2015-16</a>"#;
        let seasons = parse_seasons(html, &HarvestConfig::default()).unwrap();
        assert_eq!(seasons.len(), 1);
        assert_eq!(seasons[0].token, "/team/746/stats?year_stat_category=15");
    }

    #[test]
    fn test_parse_seasons_only_boilerplate_is_empty() {
        let html = r#"<a href="?year_stat_category=a">x</a><a href="?year_stat_category=b">y</a>"#;
        assert!(parse_seasons(html, &HarvestConfig::default()).unwrap().is_empty());
    }
}
