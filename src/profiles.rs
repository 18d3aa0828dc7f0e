//! School profiles from the paginated ncaa.com schools index.
//!
//! Each school's detail page is scraped into a [`ProfileRecord`] whose result
//! is either the populated profile or the reason it could not be read.

use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::client::PageSource;
use crate::error::{Result, ScrapeError};
use crate::utils::{absolute_url, element_text, with_retry};

pub const SCHOOLS_SITE_URL: &str = "https://www.ncaa.com";
pub const INDEX_PAGES: u32 = 24;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolProfile {
    pub division: Option<String>,
    pub name: String,
    pub city: String,
    pub state: String,
    pub conference: String,
    pub team_name: String,
}

/// Why a school's profile could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileAbsence {
    #[error("page unavailable: {0}")]
    Unavailable(String),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("malformed location: {0}")]
    MalformedLocation(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub nickname: String,
    pub href: String,
    pub result: std::result::Result<SchoolProfile, ProfileAbsence>,
}

// ============================================================================
// SCRAPING
// ============================================================================

pub fn index_url(page: u32) -> String {
    format!("{}/schools-index/{}", SCHOOLS_SITE_URL, page)
}

/// Everything read from the schools index.
#[derive(Debug, Default)]
pub struct ProfileScrape {
    pub records: Vec<ProfileRecord>,
    /// Index pages that could not be read, with the reason.
    pub failed_pages: Vec<(u32, String)>,
}

/// Walks `pages` index pages and reads every listed school's profile. A page
/// that still fails after one retry is recorded and the walk continues.
pub async fn scrape_profiles(
    source: &dyn PageSource,
    pages: u32,
    concurrency: usize,
    backoff: Duration,
) -> ProfileScrape {
    let mut scrape = ProfileScrape::default();

    for page in 0..pages {
        let url = index_url(page);
        let links = match with_retry("schools index", backoff, || source.get(&url)).await {
            Ok(html) => parse_index_page(&html),
            Err(e) => Err(e),
        };
        let links = match links {
            Ok(links) => links,
            Err(e) => {
                warn!(page, error = %e, "index page skipped");
                scrape.failed_pages.push((page, e.to_string()));
                continue;
            }
        };

        let page_records: Vec<ProfileRecord> = stream::iter(links)
            .map(|(nickname, href)| async move {
                let url = absolute_url(SCHOOLS_SITE_URL, &href);
                let result = match with_retry("school profile", backoff, || source.get(&url)).await {
                    Ok(html) => parse_profile(&html),
                    Err(e) => Err(ProfileAbsence::Unavailable(e.to_string())),
                };
                if let Err(reason) = &result {
                    warn!(school = %nickname, %reason, "profile absent");
                }
                ProfileRecord { nickname, href, result }
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        info!(page, schools = page_records.len(), "scraped index page");
        scrape.records.extend(page_records);
    }

    scrape
}

/// `(nickname, href)` for each school linked from an index page's table.
///
/// Each school is linked twice per row (name, then logo); every other link is kept.
pub fn parse_index_page(html: &str) -> Result<Vec<(String, String)>> {
    let document = Html::parse_document(html);
    let tbody_selector = Selector::parse("tbody").unwrap();
    let link_selector = Selector::parse(r#"a[href*="/schools/"]"#).unwrap();

    let tbody = document
        .select(&tbody_selector)
        .next()
        .ok_or_else(|| ScrapeError::layout("tbody", 0, 0))?;

    Ok(tbody
        .select(&link_selector)
        .step_by(2)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            Some((element_text(a), href.to_string()))
        })
        .collect())
}

pub fn parse_profile(html: &str) -> std::result::Result<SchoolProfile, ProfileAbsence> {
    let document = Html::parse_document(html);
    let location_selector = Selector::parse(r#"div[class*="division-location"]"#).unwrap();
    let name_selector = Selector::parse("h1.school-name").unwrap();
    let group_selector = Selector::parse(r#"div[class*="dl-group"]"#).unwrap();
    let dd_selector = Selector::parse("dd").unwrap();

    let location = document
        .select(&location_selector)
        .next()
        .map(element_text)
        .ok_or(ProfileAbsence::Missing("division/location"))?;
    let (division, city, state) = parse_location(&location)?;

    let name = document
        .select(&name_selector)
        .next()
        .map(element_text)
        .ok_or(ProfileAbsence::Missing("school name"))?;

    let groups: Vec<_> = document.select(&group_selector).collect();
    let definition = |i: usize, what: &'static str| {
        groups
            .get(i)
            .and_then(|g| g.select(&dd_selector).next())
            .map(element_text)
            .ok_or(ProfileAbsence::Missing(what))
    };
    let conference = definition(0, "conference")?;
    let team_name = definition(1, "team name")?;

    Ok(SchoolProfile {
        division,
        name,
        city,
        state,
        conference,
        team_name,
    })
}

/// Splits "Division I - Boston, MA" (division optional) into its parts.
pub fn parse_location(
    text: &str,
) -> std::result::Result<(Option<String>, String, String), ProfileAbsence> {
    let (division, place) = match text.split_once(" - ") {
        Some((division, place)) => (Some(division.trim().to_string()), place.trim()),
        None => (None, text.trim()),
    };

    let (city, state) = place
        .rsplit_once(", ")
        .ok_or_else(|| ProfileAbsence::MalformedLocation(text.to_string()))?;

    Ok((division, city.trim().to_string(), state.trim().to_string()))
}

// ============================================================================
// TESTS
// ============================================================================
