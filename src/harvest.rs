//! Runs the whole harvest: schools and seasons fan out across tasks bounded
//! by a semaphore, results fan back in to a single collector task.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::aggregate::{aggregate_master, aggregate_school, Frame, MasterTable};
use crate::category::{fetch_season, SeasonHarvest};
use crate::client::PageSource;
use crate::config::HarvestConfig;
use crate::gaps::{Gap, GapLog};
use crate::model::{School, Season};
use crate::season::enumerate_seasons;

const CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Whether any school made it all the way through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// At least one school finished; gaps may have been recorded.
    Completed,
    /// The run stopped before any school finished.
    Aborted,
}

#[derive(Debug)]
pub struct HarvestReport {
    pub master: MasterTable,
    pub gaps: GapLog,
    pub schools_total: usize,
    pub schools_completed: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl HarvestReport {
    pub fn outcome(&self) -> RunOutcome {
        if self.schools_completed > 0 || (self.schools_total == 0 && !self.cancelled) {
            RunOutcome::Completed
        } else {
            RunOutcome::Aborted
        }
    }
}

enum HarvestEvent {
    Season {
        school: usize,
        ordinal: usize,
        label: String,
        harvest: SeasonHarvest,
    },
    Gap(Gap),
    SchoolDone(usize),
}

#[derive(Default)]
struct Collected {
    seasons: Vec<Vec<(usize, String, Frame)>>,
    gaps: GapLog,
    completed: Vec<bool>,
}

// ============================================================================
// RUN
// ============================================================================

/// Harvests every school until done, until `cancel` resolves, or until the
/// configured run timeout elapses. Whatever was fetched before a stop is
/// still aggregated into the report.
pub async fn harvest<C>(
    source: Arc<dyn PageSource>,
    config: &HarvestConfig,
    schools: Vec<School>,
    cancel: C,
) -> HarvestReport
where
    C: Future<Output = ()>,
{
    let started_at = Utc::now();
    let limit = Arc::new(Semaphore::new(config.session_limit()));
    // Schools in flight; a queued school starts only when one finishes
    let open_schools = Arc::new(Semaphore::new(config.session_limit()));
    let shared = Arc::new(config.clone());
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let collector = tokio::spawn(collect(rx, schools.len()));

    info!(schools = schools.len(), sessions = config.session_limit(), "harvest started");

    let mut tasks = JoinSet::new();
    for (index, school) in schools.iter().cloned().enumerate() {
        tasks.spawn(harvest_school(
            source.clone(),
            shared.clone(),
            open_schools.clone(),
            limit.clone(),
            tx.clone(),
            index,
            school,
        ));
    }
    drop(tx);

    let run_timeout = config.run_timeout;
    let deadline = async move {
        match run_timeout {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending::<()>().await,
        }
    };

    let cancelled = tokio::select! {
        _ = join_all(&mut tasks) => false,
        _ = cancel => {
            warn!("harvest cancelled");
            true
        }
        _ = deadline => {
            warn!(timeout_secs = run_timeout.map(|d| d.as_secs()), "harvest timed out");
            true
        }
    };
    if cancelled {
        tasks.abort_all();
        join_all(&mut tasks).await;
    }

    let mut collected = match collector.await {
        Ok(collected) => collected,
        Err(e) => {
            error!(error = %e, "collector task failed");
            Collected::default()
        }
    };
    collected.seasons.resize_with(schools.len(), Vec::new);
    collected.completed.resize(schools.len(), false);

    for (school, done) in schools.iter().zip(&collected.completed) {
        if !done {
            collected.gaps.record(Gap::school(&school.name, "not completed before the run stopped"));
        }
    }
    let schools_completed = collected.completed.iter().filter(|d| **d).count();

    let master = aggregate_master(
        schools
            .iter()
            .zip(collected.seasons)
            .map(|(school, mut seasons)| {
                seasons.sort_by_key(|(ordinal, _, _)| *ordinal);
                let frames = seasons.into_iter().map(|(_, label, frame)| (label, frame)).collect();
                (school.name.clone(), aggregate_school(frames))
            })
            .collect(),
    );

    let report = HarvestReport {
        master,
        gaps: collected.gaps,
        schools_total: schools.len(),
        schools_completed,
        cancelled,
        started_at,
        finished_at: Utc::now(),
    };
    info!(
        tables = report.master.table_count(),
        rows = report.master.row_count(),
        gaps = report.gaps.len(),
        schools_completed = report.schools_completed,
        "harvest finished"
    );
    report
}

async fn join_all(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            if e.is_panic() {
                error!(error = %e, "harvest task panicked");
            }
        }
    }
}

async fn harvest_school(
    source: Arc<dyn PageSource>,
    config: Arc<HarvestConfig>,
    open_schools: Arc<Semaphore>,
    limit: Arc<Semaphore>,
    tx: mpsc::Sender<HarvestEvent>,
    index: usize,
    school: School,
) {
    let Ok(_school_slot) = open_schools.acquire().await else {
        return;
    };
    let seasons = {
        let Ok(_permit) = limit.acquire().await else {
            return;
        };
        enumerate_seasons(source.as_ref(), &config, &school).await
    };

    let seasons = match seasons {
        Ok(seasons) if seasons.is_empty() => {
            warn!(school = %school.name, "no seasons with published stats");
            let _ = tx.send(HarvestEvent::Gap(Gap::school(&school.name, "no seasons with published stats"))).await;
            let _ = tx.send(HarvestEvent::SchoolDone(index)).await;
            return;
        }
        Ok(seasons) => seasons,
        Err(e) => {
            warn!(school = %school.name, error = %e, "school skipped");
            let _ = tx.send(HarvestEvent::Gap(Gap::school(&school.name, e))).await;
            let _ = tx.send(HarvestEvent::SchoolDone(index)).await;
            return;
        }
    };

    let mut units = JoinSet::new();
    for (ordinal, season) in seasons.into_iter().enumerate() {
        units.spawn(harvest_season(
            source.clone(),
            config.clone(),
            limit.clone(),
            tx.clone(),
            (index, ordinal),
            school.clone(),
            season,
        ));
    }
    join_all(&mut units).await;

    let _ = tx.send(HarvestEvent::SchoolDone(index)).await;
}

async fn harvest_season(
    source: Arc<dyn PageSource>,
    config: Arc<HarvestConfig>,
    limit: Arc<Semaphore>,
    tx: mpsc::Sender<HarvestEvent>,
    (index, ordinal): (usize, usize),
    school: School,
    season: Season,
) {
    let Ok(_permit) = limit.acquire().await else {
        return;
    };

    let event = match fetch_season(source.as_ref(), &config, &school, &season).await {
        Ok(harvest) => HarvestEvent::Season {
            school: index,
            ordinal,
            label: season.label,
            harvest,
        },
        Err(e) => {
            warn!(school = %school.name, season = %season.label, error = %e, "season skipped");
            HarvestEvent::Gap(Gap::season(&school.name, &season.label, e))
        }
    };
    let _ = tx.send(event).await;
}

/// Single consumer of every producer's results.
async fn collect(mut rx: mpsc::Receiver<HarvestEvent>, school_count: usize) -> Collected {
    let mut collected = Collected {
        seasons: (0..school_count).map(|_| Vec::new()).collect(),
        gaps: GapLog::new(),
        completed: vec![false; school_count],
    };

    while let Some(event) = rx.recv().await {
        match event {
            HarvestEvent::Season {
                school,
                ordinal,
                label,
                harvest,
            } => {
                collected.gaps.extend(harvest.gaps);
                if let Some(seasons) = collected.seasons.get_mut(school) {
                    seasons.push((ordinal, label, harvest.frame));
                }
            }
            HarvestEvent::Gap(gap) => collected.gaps.record(gap),
            HarvestEvent::SchoolDone(school) => {
                if let Some(done) = collected.completed.get_mut(school) {
                    *done = true;
                }
            }
        }
    }

    collected
}
