use serde::Serialize;
use std::fmt;

/// A school as the stats site addresses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct School {
    pub id: String,
    pub name: String,
}

impl School {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> School {
        School { id: id.into(), name: name.into() }
    }
}

/// One season listed on a school's landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Season {
    pub label: String,
    /// Site-relative href of the season's hitting page.
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatCategory {
    Hitting,
    Pitching,
    Fielding,
}

impl StatCategory {
    pub const ALL: [StatCategory; 3] = [StatCategory::Hitting, StatCategory::Pitching, StatCategory::Fielding];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatCategory::Hitting => "hitting",
            StatCategory::Pitching => "pitching",
            StatCategory::Fielding => "fielding",
        }
    }

    pub fn parse(s: &str) -> Option<StatCategory> {
        StatCategory::ALL.into_iter().find(|c| c.as_str().eq_ignore_ascii_case(s))
    }

    /// Fielding pages have no split dropdown.
    pub fn has_variants(&self) -> bool {
        !matches!(self, StatCategory::Fielding)
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Situation label given to the single fielding table.
pub const FIELDING_SITUATION: &str = "Fielding";

/// A situational split offered by a category page's dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SituationalVariant {
    pub label: String,
    pub value: String,
}

impl SituationalVariant {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> SituationalVariant {
        SituationalVariant { label: label.into(), value: value.into() }
    }
}

/// Provenance of one StatTable: (school, season, category, situation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LabelPath {
    pub school: String,
    pub season: String,
    pub category: StatCategory,
    pub situation: String,
}

impl LabelPath {
    pub fn new(
        school: impl Into<String>,
        season: impl Into<String>,
        category: StatCategory,
        situation: impl Into<String>,
    ) -> LabelPath {
        LabelPath {
            school: school.into(),
            season: season.into(),
            category,
            situation: situation.into(),
        }
    }

    /// Label at the given level, as a string.
    pub fn label(&self, level: Level) -> &str {
        match level {
            Level::School => &self.school,
            Level::Season => &self.season,
            Level::Category => self.category.as_str(),
            Level::Situation => &self.situation,
        }
    }
}

impl fmt::Display for LabelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {} / {}", self.school, self.season, self.category, self.situation)
    }
}

/// Levels of the label path, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    School,
    Season,
    Category,
    Situation,
}

/// Label columns that lead every output row.
pub const LABEL_COLUMNS: [&str; 5] = ["school", "season", "category", "situation", "row_ordinal"];
