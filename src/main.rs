use clap::{Parser, Subcommand};
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ncaa_baseball_stats::config::DEFAULT_EXCLUDED_SEASONS;
use ncaa_baseball_stats::profiles::INDEX_PAGES;
use ncaa_baseball_stats::sink::{write_profiles_csv, DEFAULT_BATCH_SIZE};
use ncaa_baseball_stats::{open_sink, run, scrape_profiles, HarvestConfig, HttpSource, RunOutcome};

#[derive(Parser, Debug)]
#[command(name = "ncaa_baseball_stats", about = "Harvest NCAA Division I baseball team stats")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Seasons fetched concurrently (1-9)
    #[arg(short, long, default_value_t = 4)]
    concurrency: usize,

    /// Stop the run after this many seconds, keeping what was fetched
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Season label to skip; repeatable (default: 2010-11)
    #[arg(long = "exclude-season")]
    exclude_season: Vec<String>,

    /// Only harvest these schools; repeatable
    #[arg(long)]
    school: Vec<String>,

    /// CSV directory, or a .db/.sqlite file for SQLite output
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Rows appended per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest team stats (the default)
    Stats,
    /// Scrape school profiles from the ncaa.com schools index
    Profiles {
        #[arg(long, default_value_t = INDEX_PAGES)]
        pages: u32,

        #[arg(long, default_value = "schools.csv")]
        out: PathBuf,
    },
}

const EXIT_DIRECTORY_FAILED: u8 = 1;
const EXIT_ABORTED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ncaa_baseball_stats=info")),
        )
        .init();

    let args = Args::parse();

    let excluded_seasons = if args.exclude_season.is_empty() {
        DEFAULT_EXCLUDED_SEASONS.iter().map(|s| s.to_string()).collect()
    } else {
        args.exclude_season.clone()
    };
    let config = HarvestConfig {
        concurrency: args.concurrency,
        excluded_seasons,
        run_timeout: args.timeout_secs.map(Duration::from_secs),
        ..HarvestConfig::default()
    };

    match &args.command {
        Some(Command::Profiles { pages, out }) => {
            let source = HttpSource::new(&config)?;
            let scrape = scrape_profiles(&source, *pages, config.session_limit(), config.retry_backoff).await;
            write_profiles_csv(File::create(out)?, &scrape.records)?;
            let absent = scrape.records.iter().filter(|r| r.result.is_err()).count();
            info!(
                file = %out.display(),
                schools = scrape.records.len(),
                absent,
                failed_pages = scrape.failed_pages.len(),
                "profiles written"
            );
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Stats) | None => harvest_stats(&args, &config).await,
    }
}

async fn harvest_stats(args: &Args, config: &HarvestConfig) -> Result<ExitCode, Box<dyn Error>> {
    let cancel = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    let report = match run(config, &args.school, cancel).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "run aborted");
            return Ok(ExitCode::from(EXIT_DIRECTORY_FAILED));
        }
    };

    let mut sink = open_sink(&args.output, args.batch_size)?;
    sink.write_report(&report)?;

    println!(
        "{} tables, {} rows, {} gaps; {}/{} schools completed in {}s",
        report.master.table_count(),
        report.master.row_count(),
        report.gaps.len(),
        report.schools_completed,
        report.schools_total,
        (report.finished_at - report.started_at).num_seconds(),
    );

    match report.outcome() {
        RunOutcome::Completed => Ok(ExitCode::SUCCESS),
        RunOutcome::Aborted => Ok(ExitCode::from(EXIT_ABORTED)),
    }
}
