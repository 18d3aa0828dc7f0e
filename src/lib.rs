pub mod aggregate;
pub mod category;
pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod gaps;
pub mod harvest;
pub mod layout;
pub mod model;
pub mod profiles;
pub mod season;
pub mod sink;
pub mod table;
pub mod utils;

use std::future::Future;
use std::sync::Arc;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================
pub use aggregate::{aggregate_category, aggregate_master, aggregate_school, aggregate_season, Frame, MasterRow, MasterTable, SourcedTable};
pub use category::{fetch_season, SeasonHarvest};
pub use client::{FormSession, HttpSource, PageSource};
pub use config::HarvestConfig;
pub use directory::{filter_schools, parse_directory, resolve_schools};
pub use error::{Result, ScrapeError};
pub use gaps::{Gap, GapLog, GapTier};
pub use harvest::{harvest, HarvestReport, RunOutcome};
pub use model::{LabelPath, Level, School, Season, SituationalVariant, StatCategory};
pub use profiles::{scrape_profiles, ProfileAbsence, ProfileRecord, ProfileScrape, SchoolProfile};
pub use season::enumerate_seasons;
pub use sink::{open_sink, CsvSink, SqliteSink, TableSink};
pub use table::StatTable;

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// Resolves the school directory over HTTP and harvests the selected schools
/// (all of them when `school_names` is empty).
///
/// Only a directory failure is returned as an error; everything narrower is
/// recorded in the report's gap log.
pub async fn run<C>(config: &HarvestConfig, school_names: &[String], cancel: C) -> Result<HarvestReport>
where
    C: Future<Output = ()>,
{
    let source = Arc::new(HttpSource::new(config)?);
    let schools = resolve_schools(source.as_ref(), config).await?;
    let schools = filter_schools(schools, school_names);

    Ok(harvest(source, config, schools, cancel).await)
}
