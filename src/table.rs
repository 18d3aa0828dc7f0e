use scraper::{ElementRef, Selector};
use std::collections::HashMap;

use crate::error::{Result, ScrapeError};
use crate::utils::element_text;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// The literal content of one fetched stats table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl StatTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> StatTable {
        StatTable { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// HTML TABLE PARSING
// ============================================================================

/// Parses a `<table>` element into a rectangular StatTable.
///
/// The first row supplies the header (`th` cells, or `td` when it has none).
/// Later rows with `td` cells become data rows, padded or truncated to the
/// header width.
pub fn parse_table(table: ElementRef) -> Result<StatTable> {
    let row_selector = Selector::parse("tr").unwrap();
    let th_selector = Selector::parse("th").unwrap();
    let td_selector = Selector::parse("td").unwrap();

    let mut rows = table.select(&row_selector);
    let header_row = rows.next().ok_or(ScrapeError::EmptyTable)?;

    let mut header: Vec<String> = header_row.select(&th_selector).map(element_text).collect();
    if header.is_empty() {
        header = header_row.select(&td_selector).map(element_text).collect();
    }
    if header.is_empty() {
        return Err(ScrapeError::EmptyTable);
    }
    let columns = normalize_columns(header);
    let width = columns.len();

    let mut data = Vec::new();
    for row in rows {
        let mut cells: Vec<String> = row.select(&td_selector).map(element_text).collect();
        if cells.is_empty() {
            continue;
        }
        cells.resize(width, String::new());
        data.push(cells);
    }

    Ok(StatTable::new(columns, data))
}

/// Names blank headers `column_{n}` and suffixes repeats so names are unique
fn normalize_columns(header: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = if name.is_empty() { format!("column_{}", i + 1) } else { name };
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{}_{}", base, count)
            }
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
