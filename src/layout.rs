//! Positional lookups into stats.ncaa.org pages.
//!
//! The site offers no ids or classes on the elements we need, so they are
//! addressed by position. Every position lives here; a layout change on the
//! site should only ever require an edit in this file.

use scraper::{Html, Selector};

use crate::error::{Result, ScrapeError};
use crate::table::{parse_table, StatTable};
use crate::utils::element_text;

/// Leading `/team/` anchors on the team listing that are site navigation.
pub const SKIPPED_DIRECTORY_ANCHORS: usize = 2;

/// Leading season-category anchors on a team landing page that are not seasons.
pub const SKIPPED_LANDING_ANCHORS: usize = 2;

/// The situational split dropdown is the third `select` on a category page.
pub const VARIANT_SELECT_INDEX: usize = 2;

/// The stats grid is the third `table` on a category page or POST response.
pub const RESULT_TABLE_INDEX: usize = 2;

pub const PITCHING_LINK_INDEX: usize = 0;
pub const FIELDING_LINK_INDEX: usize = 1;

/// Form field carrying the chosen situational split.
pub const VARIANT_FORM_FIELD: &str = "available_stat_id";

const TEAM_ANCHOR: &str = r#"a[href*="/team/"]"#;
const SEASON_ANCHOR: &str = r#"a[href*="year_stat_category"]"#;
const CATEGORY_ANCHOR: &str = r#"a[href*="year_stat_category_id"]"#;

/// `(display name, href)` for every school on the team listing.
pub fn directory_links(document: &Html) -> Result<Vec<(String, String)>> {
    let selector = Selector::parse(TEAM_ANCHOR).unwrap();
    let anchors: Vec<_> = document.select(&selector).collect();
    if anchors.len() <= SKIPPED_DIRECTORY_ANCHORS {
        return Err(ScrapeError::layout("team anchor", SKIPPED_DIRECTORY_ANCHORS, anchors.len()));
    }

    Ok(anchors
        .into_iter()
        .skip(SKIPPED_DIRECTORY_ANCHORS)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            Some((element_text(a), href.to_string()))
        })
        .collect())
}

/// `(season label, navigation token)` in page order.
pub fn season_links(document: &Html) -> Result<Vec<(String, String)>> {
    let selector = Selector::parse(SEASON_ANCHOR).unwrap();
    let anchors: Vec<_> = document.select(&selector).collect();
    if anchors.len() < SKIPPED_LANDING_ANCHORS {
        return Err(ScrapeError::layout("season anchor", SKIPPED_LANDING_ANCHORS, anchors.len()));
    }

    Ok(anchors
        .into_iter()
        .skip(SKIPPED_LANDING_ANCHORS)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            Some((element_text(a), href.to_string()))
        })
        .collect())
}

/// `(label, selector value)` pairs from the situational split dropdown.
pub fn variant_options(document: &Html) -> Result<Vec<(String, String)>> {
    let select_selector = Selector::parse("select").unwrap();
    let option_selector = Selector::parse("option").unwrap();

    let selects: Vec<_> = document.select(&select_selector).collect();
    let dropdown = selects
        .get(VARIANT_SELECT_INDEX)
        .ok_or_else(|| ScrapeError::layout("select", VARIANT_SELECT_INDEX, selects.len()))?;

    Ok(dropdown
        .select(&option_selector)
        .map(|option| {
            let label = element_text(option);
            // An option without a value attribute submits its text
            let value = option
                .value()
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| label.clone());
            (label, value)
        })
        .collect())
}

/// Navigation tokens for the pitching and fielding pages of a season.
pub fn category_links(document: &Html) -> Result<(String, String)> {
    let selector = Selector::parse(CATEGORY_ANCHOR).unwrap();
    let hrefs: Vec<&str> = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .collect();

    let pitching = hrefs
        .get(PITCHING_LINK_INDEX)
        .ok_or_else(|| ScrapeError::layout("category link", PITCHING_LINK_INDEX, hrefs.len()))?;
    let fielding = hrefs
        .get(FIELDING_LINK_INDEX)
        .ok_or_else(|| ScrapeError::layout("category link", FIELDING_LINK_INDEX, hrefs.len()))?;

    Ok((pitching.to_string(), fielding.to_string()))
}

/// Parses the stats grid of a category page or filtered response.
pub fn result_table(html: &str) -> Result<StatTable> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("table").unwrap();
    let tables: Vec<_> = document.select(&selector).collect();
    let table = tables
        .get(RESULT_TABLE_INDEX)
        .ok_or_else(|| ScrapeError::layout("table", RESULT_TABLE_INDEX, tables.len()))?;
    parse_table(*table)
}

// ============================================================================
// TESTS
// ============================================================================
