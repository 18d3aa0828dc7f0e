//! Fetches every category table of one (school, season).
//!
//! Hitting and pitching each open a fresh session and POST one request per
//! situational split discovered in the page's dropdown. Fielding is a single
//! table read straight from its page.

use scraper::Html;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate_category, aggregate_season, Frame};
use crate::client::{FormSession, PageSource};
use crate::config::HarvestConfig;
use crate::error::Result;
use crate::gaps::{Gap, GapLog};
use crate::layout::{self, VARIANT_FORM_FIELD};
use crate::model::{LabelPath, School, Season, SituationalVariant, StatCategory, FIELDING_SITUATION};
use crate::table::StatTable;
use crate::utils::{absolute_url, with_retry};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Everything fetched for one season, tagged by category and situation.
#[derive(Debug, Default)]
pub struct SeasonHarvest {
    pub frame: Frame,
    pub gaps: GapLog,
}

/// What a category page offers, extracted before any further request.
struct CategoryPage {
    variants: Result<Vec<SituationalVariant>>,
    links: Result<(String, String)>,
}

impl CategoryPage {
    fn parse(html: &str) -> CategoryPage {
        let document = Html::parse_document(html);
        CategoryPage {
            variants: layout::variant_options(&document).map(dedupe_variants),
            links: layout::category_links(&document),
        }
    }
}

/// Drops blank labels and keeps the first option for a repeated label.
fn dedupe_variants(options: Vec<(String, String)>) -> Vec<SituationalVariant> {
    let mut variants: Vec<SituationalVariant> = Vec::new();
    for (label, value) in options {
        if label.is_empty() {
            continue;
        }
        if let Some(kept) = variants.iter().find(|v| v.label == label) {
            if kept.value != value {
                warn!(situation = %label, kept = %kept.value, dropped = %value, "repeated split label, option dropped");
            }
            continue;
        }
        variants.push(SituationalVariant::new(label, value));
    }
    variants
}

/// Labels shared by every table fetched for a season.
struct SeasonScope<'a> {
    school: &'a School,
    season: &'a Season,
}

impl SeasonScope<'_> {
    fn path(&self, category: StatCategory, situation: &str) -> LabelPath {
        LabelPath::new(&self.school.name, &self.season.label, category, situation)
    }

    fn category_gap(&self, category: StatCategory, reason: impl std::fmt::Display) -> Gap {
        warn!(school = %self.school.name, season = %self.season.label, %category, %reason, "category skipped");
        Gap::category(&self.school.name, &self.season.label, category, reason)
    }

    fn variant_gap(&self, path: &LabelPath, reason: impl std::fmt::Display) -> Gap {
        warn!(path = %path, %reason, "variant skipped");
        Gap::variant(path, reason)
    }
}

// ============================================================================
// SEASON FETCHING
// ============================================================================

/// Fetches hitting, pitching and fielding for one season.
///
/// Only a failure to load the season's base (hitting) page is returned as an
/// error; every narrower failure becomes a gap in the harvest.
pub async fn fetch_season(
    source: &dyn PageSource,
    config: &HarvestConfig,
    school: &School,
    season: &Season,
) -> Result<SeasonHarvest> {
    let scope = SeasonScope { school, season };
    let mut gaps = GapLog::new();
    let mut categories: Vec<(StatCategory, Frame)> = Vec::new();

    let hitting_url = absolute_url(&config.base_url, &season.token);
    let html = with_retry("season page", config.retry_backoff, || source.get(&hitting_url)).await?;
    let page = CategoryPage::parse(&html);

    let hitting = fetch_variant_tables(
        source,
        config.retry_backoff,
        &scope,
        StatCategory::Hitting,
        &hitting_url,
        page.variants,
        &mut gaps,
    )
    .await;
    categories.push((StatCategory::Hitting, aggregate_category(hitting)));

    match page.links {
        Ok((pitching_token, fielding_token)) => {
            let pitching_url = absolute_url(&config.base_url, &pitching_token);
            match with_retry("pitching page", config.retry_backoff, || source.get(&pitching_url)).await {
                Ok(html) => {
                    let variants = CategoryPage::parse(&html).variants;
                    let pitching = fetch_variant_tables(
                        source,
                        config.retry_backoff,
                        &scope,
                        StatCategory::Pitching,
                        &pitching_url,
                        variants,
                        &mut gaps,
                    )
                    .await;
                    categories.push((StatCategory::Pitching, aggregate_category(pitching)));
                }
                Err(e) => gaps.record(scope.category_gap(StatCategory::Pitching, e)),
            }

            let fielding_url = absolute_url(&config.base_url, &fielding_token);
            let path = scope.path(StatCategory::Fielding, FIELDING_SITUATION);
            match fetch_fielding(source, config.retry_backoff, &fielding_url).await {
                Ok(table) => categories.push((
                    StatCategory::Fielding,
                    aggregate_category(vec![(FIELDING_SITUATION.to_string(), table)]),
                )),
                Err(e) => gaps.record(scope.variant_gap(&path, e)),
            }
        }
        Err(e) => {
            gaps.record(scope.category_gap(StatCategory::Pitching, &e));
            gaps.record(scope.category_gap(StatCategory::Fielding, &e));
        }
    }

    let frame = aggregate_season(categories);

    // Some listed seasons have no backing data; the site still serves the
    // tables, just with no rows.
    if !frame.is_empty() && frame.row_count() == 0 {
        warn!(school = %school.name, season = %season.label, "season returned no rows");
        gaps.record(Gap::season(&school.name, &season.label, "season returned no data rows"));
        return Ok(SeasonHarvest { frame: Frame::empty(), gaps });
    }

    info!(
        school = %school.name,
        season = %season.label,
        tables = frame.segments().len(),
        rows = frame.row_count(),
        gaps = gaps.len(),
        "season fetched"
    );
    Ok(SeasonHarvest { frame, gaps })
}

/// POSTs each variant on one fresh session and parses the result tables.
async fn fetch_variant_tables(
    source: &dyn PageSource,
    backoff: Duration,
    scope: &SeasonScope<'_>,
    category: StatCategory,
    url: &str,
    variants: Result<Vec<SituationalVariant>>,
    gaps: &mut GapLog,
) -> Vec<(String, StatTable)> {
    let variants = match variants {
        Ok(v) if v.is_empty() => {
            gaps.record(scope.category_gap(category, "no situational variants offered"));
            return Vec::new();
        }
        Ok(v) => v,
        Err(e) => {
            gaps.record(scope.category_gap(category, e));
            return Vec::new();
        }
    };

    // A session carries server-side state for one category only
    let mut session = match source.open_session().await {
        Ok(s) => s,
        Err(e) => {
            gaps.record(scope.category_gap(category, e));
            return Vec::new();
        }
    };

    let mut tables = Vec::with_capacity(variants.len());
    for variant in variants {
        let path = scope.path(category, &variant.label);
        let form = [(VARIANT_FORM_FIELD, variant.value.as_str())];

        let body = match post_with_retry(session.as_mut(), url, &form, backoff).await {
            Ok(body) => body,
            Err(e) => {
                gaps.record(scope.variant_gap(&path, e));
                continue;
            }
        };

        match layout::result_table(&body) {
            Ok(table) => {
                debug!(path = %path, rows = table.row_count(), "variant table parsed");
                tables.push((variant.label, table));
            }
            Err(e) => gaps.record(scope.variant_gap(&path, e)),
        }
    }
    tables
}

async fn fetch_fielding(source: &dyn PageSource, backoff: Duration, url: &str) -> Result<StatTable> {
    let html = with_retry("fielding page", backoff, || source.get(url)).await?;
    layout::result_table(&html)
}

/// One retry for transport errors, same as [`with_retry`], on a borrowed session.
async fn post_with_retry(
    session: &mut dyn FormSession,
    url: &str,
    form: &[(&str, &str)],
    backoff: Duration,
) -> Result<String> {
    match session.post_form(url, form).await {
        Err(e) if e.is_retryable() => {
            warn!(url, error = %e, "retrying variant request");
            tokio::time::sleep(backoff).await;
            session.post_form(url, form).await
        }
        other => other,
    }
}

// ============================================================================
// TESTS
// ============================================================================
