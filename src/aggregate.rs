//! Hierarchical fold of fetched StatTables into one labeled MasterTable.
//!
//! Tables are tagged bottom-up: situation labels when a category is
//! assembled, then category, season and finally school. Column sets are kept
//! per table; no alignment across tables is attempted.

use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::model::{LabelPath, Level, StatCategory};
use crate::table::StatTable;

// ============================================================================
// PARTIALLY LABELED FRAMES
// ============================================================================

/// A StatTable with the labels assigned to it so far, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub labels: Vec<String>,
    pub table: StatTable,
}

/// An ordered run of segments sharing the same label depth.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    segments: Vec<Segment>,
}

impl Frame {
    pub fn empty() -> Frame {
        Frame::default()
    }

    /// A single unlabeled table.
    pub fn leaf(table: StatTable) -> Frame {
        Frame {
            segments: vec![Segment { labels: Vec::new(), table }],
        }
    }

    /// Concatenates labeled frames, prefixing each segment with its part's
    /// label. A label seen earlier in `parts` is dropped, so paths stay unique.
    pub fn concat<I>(parts: I) -> Frame
    where
        I: IntoIterator<Item = (String, Frame)>,
    {
        let mut seen = HashSet::new();
        let mut segments = Vec::new();

        for (label, frame) in parts {
            if !seen.insert(label.clone()) {
                warn!(label = %label, "duplicate label while aggregating, keeping first");
                continue;
            }
            for mut segment in frame.segments {
                segment.labels.insert(0, label.clone());
                segments.push(segment);
            }
        }

        Frame { segments }
    }

    /// Inverse of [`Frame::concat`]: groups segments by their outermost label
    /// in first-seen order and strips that label.
    pub fn split_outer(self) -> Vec<(String, Frame)> {
        let mut groups: Vec<(String, Frame)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for mut segment in self.segments {
            if segment.labels.is_empty() {
                continue;
            }
            let label = segment.labels.remove(0);
            match index.get(&label) {
                Some(&i) => groups[i].1.segments.push(segment),
                None => {
                    index.insert(label.clone(), groups.len());
                    groups.push((label, Frame { segments: vec![segment] }));
                }
            }
        }

        groups
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.segments.iter().map(|s| s.table.row_count()).sum()
    }
}

// ============================================================================
// LEVEL FOLDS
// ============================================================================

/// Situational tables of one category, tagged by situation label.
pub fn aggregate_category(variants: Vec<(String, StatTable)>) -> Frame {
    Frame::concat(variants.into_iter().map(|(situation, table)| (situation, Frame::leaf(table))))
}

/// Category frames of one season, tagged by category.
pub fn aggregate_season(categories: Vec<(StatCategory, Frame)>) -> Frame {
    Frame::concat(categories.into_iter().map(|(c, frame)| (c.as_str().to_string(), frame)))
}

/// Season frames of one school, tagged by season label.
pub fn aggregate_school(seasons: Vec<(String, Frame)>) -> Frame {
    Frame::concat(seasons)
}

/// School frames tagged by school name, resolved into a MasterTable.
pub fn aggregate_master(schools: Vec<(String, Frame)>) -> MasterTable {
    MasterTable::from_frame(Frame::concat(schools))
}

// ============================================================================
// MASTER TABLE
// ============================================================================

/// One StatTable with its full provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedTable {
    pub path: LabelPath,
    pub table: StatTable,
}

/// A row of the MasterTable; `ordinal` is its index within its source table.
#[derive(Debug, Clone, Copy)]
pub struct MasterRow<'a> {
    pub path: &'a LabelPath,
    pub ordinal: usize,
    pub columns: &'a [String],
    pub values: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MasterTable {
    tables: Vec<SourcedTable>,
    /// Every path in `tables`.
    paths: HashSet<LabelPath>,
}

impl MasterTable {
    pub fn new() -> MasterTable {
        MasterTable::default()
    }

    /// Resolves a four-level frame (school, season, category, situation).
    /// Segments at any other depth or with an unknown category are dropped.
    pub fn from_frame(frame: Frame) -> MasterTable {
        let mut master = MasterTable::new();
        for segment in frame.segments {
            let path = match segment.labels.as_slice() {
                [school, season, category, situation] => match StatCategory::parse(category) {
                    Some(category) => LabelPath::new(school, season, category, situation),
                    None => {
                        warn!(category = %category, "unknown category label, segment dropped");
                        continue;
                    }
                },
                labels => {
                    warn!(depth = labels.len(), "segment is not fully labeled, dropped");
                    continue;
                }
            };
            master.push(path, segment.table);
        }
        master
    }

    /// Back to a four-level frame, for re-splitting with [`Frame::split_outer`].
    pub fn into_frame(self) -> Frame {
        Frame {
            segments: self
                .tables
                .into_iter()
                .map(|t| Segment {
                    labels: vec![
                        t.path.school,
                        t.path.season,
                        t.path.category.as_str().to_string(),
                        t.path.situation,
                    ],
                    table: t.table,
                })
                .collect(),
        }
    }

    /// Appends a table; returns false (and keeps the existing one) if its
    /// path is already present.
    pub fn push(&mut self, path: LabelPath, table: StatTable) -> bool {
        if !self.paths.insert(path.clone()) {
            warn!(path = %path, "duplicate label path, keeping first");
            return false;
        }
        self.tables.push(SourcedTable { path, table });
        true
    }

    /// Concatenates master tables in order, keeping the first table for any repeated path.
    pub fn concat<I>(parts: I) -> MasterTable
    where
        I: IntoIterator<Item = MasterTable>,
    {
        let mut master = MasterTable::new();
        for part in parts {
            for t in part.tables {
                master.push(t.path, t.table);
            }
        }
        master
    }

    /// Groups tables by their label at `level`, in first-seen order.
    pub fn split_by(&self, level: Level) -> Vec<(String, MasterTable)> {
        let mut groups: Vec<(String, MasterTable)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for t in &self.tables {
            let label = t.path.label(level);
            let i = *index.entry(label).or_insert_with(|| {
                groups.push((label.to_string(), MasterTable::new()));
                groups.len() - 1
            });
            groups[i].1.push(t.path.clone(), t.table.clone());
        }
        groups
    }

    pub fn tables(&self) -> &[SourcedTable] {
        &self.tables
    }

    pub fn rows(&self) -> impl Iterator<Item = MasterRow<'_>> {
        self.tables.iter().flat_map(|t| {
            t.table.rows.iter().enumerate().map(move |(ordinal, values)| MasterRow {
                path: &t.path,
                ordinal,
                columns: &t.table.columns,
                values,
            })
        })
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.table.row_count()).sum()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Stat columns of a category, in first-seen order across its tables.
    pub fn category_columns(&self, category: StatCategory) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for t in self.tables.iter().filter(|t| t.path.category == category) {
            for c in &t.table.columns {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }
        columns
    }
}
