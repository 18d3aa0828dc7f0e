use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::aggregate::{MasterRow, MasterTable};
use crate::error::Result;
use crate::gaps::GapLog;
use crate::harvest::HarvestReport;
use crate::model::{StatCategory, LABEL_COLUMNS};
use crate::profiles::ProfileRecord;

pub const DEFAULT_BATCH_SIZE: usize = 500;

const GAPS_CSV_FILE: &str = "gaps.csv";
const GAPS_TABLE: &str = "harvest_gaps";
const RUNS_TABLE: &str = "harvest_runs";

/// Receives a finished harvest.
pub trait TableSink {
    /// Appends every row of the master table; returns the number written.
    fn write_master(&mut self, master: &MasterTable) -> Result<usize>;

    fn write_gaps(&mut self, gaps: &GapLog) -> Result<()>;

    fn write_report(&mut self, report: &HarvestReport) -> Result<()> {
        self.write_master(&report.master)?;
        self.write_gaps(&report.gaps)
    }
}

/// Picks a sink from a destination: SQLite for `.db`/`.sqlite`/`.sqlite3`
/// files, otherwise a directory of CSV files.
pub fn open_sink(destination: &Path, batch_size: usize) -> Result<Box<dyn TableSink>> {
    let is_sqlite = matches!(
        destination.extension().and_then(|e| e.to_str()),
        Some("db" | "sqlite" | "sqlite3")
    );
    if is_sqlite {
        Ok(Box::new(SqliteSink::open(destination, batch_size)?))
    } else {
        Ok(Box::new(CsvSink::new(destination, batch_size)))
    }
}

/// Name a stat column is written under; stat columns never shadow label
/// columns, compared ignoring case.
pub fn output_column_name(column: &str) -> String {
    if LABEL_COLUMNS.iter().any(|label| label.eq_ignore_ascii_case(column)) {
        format!("stat_{}", column)
    } else {
        column.to_string()
    }
}

/// Label values followed by stat values aligned to `columns`.
fn aligned_record(row: &MasterRow, columns: &[String]) -> Vec<String> {
    let mut record = vec![
        row.path.school.clone(),
        row.path.season.clone(),
        row.path.category.as_str().to_string(),
        row.path.situation.clone(),
        row.ordinal.to_string(),
    ];
    record.extend(columns.iter().map(|c| {
        row.columns
            .iter()
            .position(|rc| rc == c)
            .and_then(|i| row.values.get(i))
            .cloned()
            .unwrap_or_default()
    }));
    record
}

// ============================================================================
// CSV OUTPUT
// ============================================================================

/// Writes `{category}.csv` files and `gaps.csv` into a directory.
pub struct CsvSink {
    dir: PathBuf,
    batch_size: usize,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>, batch_size: usize) -> CsvSink {
        CsvSink {
            dir: dir.into(),
            batch_size: batch_size.max(1),
        }
    }
}

impl TableSink for CsvSink {
    fn write_master(&mut self, master: &MasterTable) -> Result<usize> {
        fs::create_dir_all(&self.dir)?;
        let mut written = 0;
        for category in StatCategory::ALL {
            if !master.tables().iter().any(|t| t.path.category == category) {
                continue;
            }
            let path = self.dir.join(format!("{}.csv", category));
            let rows = write_category_csv(File::create(&path)?, master, category, self.batch_size)?;
            info!(file = %path.display(), rows, "category written");
            written += rows;
        }
        Ok(written)
    }

    fn write_gaps(&mut self, gaps: &GapLog) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(GAPS_CSV_FILE);
        write_gaps_csv(File::create(&path)?, gaps)?;
        info!(file = %path.display(), gaps = gaps.len(), "gap log written");
        Ok(())
    }
}

/// One category's rows under the label columns plus the union of its stat
/// columns. Flushes every `batch_size` rows.
pub fn write_category_csv<W: Write>(
    writer: W,
    master: &MasterTable,
    category: StatCategory,
    batch_size: usize,
) -> Result<usize> {
    let columns = master.category_columns(category);
    let mut writer = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = LABEL_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(columns.iter().map(|c| output_column_name(c)));
    writer.write_record(&header)?;

    let mut written = 0;
    for row in master.rows().filter(|r| r.path.category == category) {
        writer.write_record(aligned_record(&row, &columns))?;
        written += 1;
        if written % batch_size.max(1) == 0 {
            writer.flush()?;
        }
    }

    writer.flush()?;
    Ok(written)
}

pub fn write_gaps_csv<W: Write>(writer: W, gaps: &GapLog) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    if gaps.is_empty() {
        writer.write_record(["tier", "school", "season", "category", "situation", "reason"])?;
    }
    for gap in gaps.iter() {
        writer.serialize(gap)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_profiles_csv<W: Write>(writer: W, records: &[ProfileRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([
        "nickname", "href", "status", "division", "name", "city", "state", "conference", "team_name",
    ])?;

    for record in records {
        let row = match &record.result {
            Ok(p) => [
                record.nickname.clone(),
                record.href.clone(),
                "ok".to_string(),
                p.division.clone().unwrap_or_default(),
                p.name.clone(),
                p.city.clone(),
                p.state.clone(),
                p.conference.clone(),
                p.team_name.clone(),
            ],
            Err(absence) => [
                record.nickname.clone(),
                record.href.clone(),
                absence.to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ],
        };
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

// ============================================================================
// SQLITE OUTPUT
// ============================================================================

/// Appends to one table per category, growing columns as new stats appear.
pub struct SqliteSink {
    conn: Connection,
    batch_size: usize,
}

impl SqliteSink {
    pub fn open(path: &Path, batch_size: usize) -> Result<SqliteSink> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        SqliteSink::from_connection(Connection::open(path)?, batch_size)
    }

    pub fn from_connection(conn: Connection, batch_size: usize) -> Result<SqliteSink> {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {GAPS_TABLE} (
                tier TEXT NOT NULL,
                school TEXT NOT NULL,
                season TEXT NULL,
                category TEXT NULL,
                situation TEXT NULL,
                reason TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {RUNS_TABLE} (
                run_id INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                schools_total INTEGER NOT NULL,
                schools_completed INTEGER NOT NULL,
                cancelled INTEGER NOT NULL,
                tables_written INTEGER NOT NULL,
                rows_written INTEGER NOT NULL,
                gaps INTEGER NOT NULL
            );
            "#
        ))?;
        Ok(SqliteSink {
            conn,
            batch_size: batch_size.max(1),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the category table if needed and adds any missing columns.
    /// `columns` are SQL column names from [`sql_columns`].
    fn ensure_table(&self, category: StatCategory, columns: &[String]) -> Result<()> {
        let table = category.as_str();
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                school TEXT NOT NULL,
                season TEXT NOT NULL,
                category TEXT NOT NULL,
                situation TEXT NOT NULL,
                row_ordinal INTEGER NOT NULL
            );"
        ))?;

        let mut existing: HashSet<String> = {
            let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({table})"))?;
            let names = stmt.query_map([], |row| row.get::<_, String>(1).map(|n| n.to_lowercase()))?;
            names.collect::<rusqlite::Result<_>>()?
        };
        for name in columns {
            // SQLite identifiers are case-insensitive
            if existing.insert(name.to_lowercase()) {
                self.conn
                    .execute(&format!("ALTER TABLE {table} ADD COLUMN {} TEXT", quote_ident(name)), [])?;
            }
        }
        Ok(())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL column names for one table's stat columns, unique ignoring case.
/// A repeat gets a `_{k}` suffix.
fn sql_columns(columns: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    columns
        .iter()
        .map(|column| {
            let base = output_column_name(column);
            let mut name = base.clone();
            let mut k = 1;
            while !taken.insert(name.to_lowercase()) {
                k += 1;
                name = format!("{}_{}", base, k);
            }
            name
        })
        .collect()
}

fn insert_sql(category: StatCategory, columns: &[String]) -> String {
    let names: Vec<String> = LABEL_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(sql_columns(columns))
        .map(|c| quote_ident(&c))
        .collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        category.as_str(),
        names.join(", "),
        placeholders.join(", ")
    )
}

impl TableSink for SqliteSink {
    fn write_master(&mut self, master: &MasterTable) -> Result<usize> {
        let mut written = 0;

        for category in StatCategory::ALL {
            let rows: Vec<MasterRow> = master.rows().filter(|r| r.path.category == category).collect();
            if rows.is_empty() {
                continue;
            }
            let columns: Vec<String> = master
                .tables()
                .iter()
                .filter(|t| t.path.category == category)
                .flat_map(|t| sql_columns(&t.table.columns))
                .collect();
            self.ensure_table(category, &columns)?;

            for batch in rows.chunks(self.batch_size) {
                let tx = self.conn.transaction()?;
                for row in batch {
                    let mut stmt = tx.prepare_cached(&insert_sql(category, row.columns))?;
                    let mut values = vec![
                        Value::Text(row.path.school.clone()),
                        Value::Text(row.path.season.clone()),
                        Value::Text(category.as_str().to_string()),
                        Value::Text(row.path.situation.clone()),
                        Value::Integer(row.ordinal as i64),
                    ];
                    values.extend(row.values.iter().map(|v| Value::Text(v.clone())));
                    stmt.execute(params_from_iter(values))?;
                }
                tx.commit()?;
                written += batch.len();
            }
            info!(%category, rows = rows.len(), "category appended");
        }

        Ok(written)
    }

    fn write_gaps(&mut self, gaps: &GapLog) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {GAPS_TABLE} (tier, school, season, category, situation, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ))?;
            for gap in gaps.iter() {
                stmt.execute(params![
                    gap.tier.as_str(),
                    gap.school,
                    gap.season,
                    gap.category.map(|c| c.as_str()),
                    gap.situation,
                    gap.reason,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_report(&mut self, report: &HarvestReport) -> Result<()> {
        let rows = self.write_master(&report.master)?;
        self.write_gaps(&report.gaps)?;
        self.conn.execute(
            &format!(
                "INSERT INTO {RUNS_TABLE} (started_at, finished_at, schools_total, schools_completed,
                    cancelled, tables_written, rows_written, gaps)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                report.started_at.to_rfc3339(),
                report.finished_at.to_rfc3339(),
                report.schools_total as i64,
                report.schools_completed as i64,
                report.cancelled,
                report.master.table_count() as i64,
                rows as i64,
                report.gaps.len() as i64,
            ],
        )?;
        Ok(())
    }
}
