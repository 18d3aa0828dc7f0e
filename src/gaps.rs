use serde::Serialize;
use std::fmt;

use crate::model::{LabelPath, StatCategory};

/// How much of the tree a skip removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GapTier {
    School,
    Season,
    Category,
    Variant,
}

impl GapTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            GapTier::School => "school",
            GapTier::Season => "season",
            GapTier::Category => "category",
            GapTier::Variant => "variant",
        }
    }
}

/// A recorded absence of one or more StatTables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub tier: GapTier,
    pub school: String,
    pub season: Option<String>,
    pub category: Option<StatCategory>,
    pub situation: Option<String>,
    pub reason: String,
}

impl Gap {
    pub fn school(school: &str, reason: impl fmt::Display) -> Gap {
        Gap {
            tier: GapTier::School,
            school: school.to_string(),
            season: None,
            category: None,
            situation: None,
            reason: reason.to_string(),
        }
    }

    pub fn season(school: &str, season: &str, reason: impl fmt::Display) -> Gap {
        Gap {
            tier: GapTier::Season,
            season: Some(season.to_string()),
            ..Gap::school(school, reason)
        }
    }

    pub fn category(school: &str, season: &str, category: StatCategory, reason: impl fmt::Display) -> Gap {
        Gap {
            tier: GapTier::Category,
            category: Some(category),
            ..Gap::season(school, season, reason)
        }
    }

    pub fn variant(path: &LabelPath, reason: impl fmt::Display) -> Gap {
        Gap {
            tier: GapTier::Variant,
            situation: Some(path.situation.clone()),
            ..Gap::category(&path.school, &path.season, path.category, reason)
        }
    }

    /// True if this gap was recorded for exactly `path`.
    pub fn is_for(&self, path: &LabelPath) -> bool {
        self.tier == GapTier::Variant
            && self.school == path.school
            && self.season.as_deref() == Some(path.season.as_str())
            && self.category == Some(path.category)
            && self.situation.as_deref() == Some(path.situation.as_str())
    }
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.school)?;
        if let Some(season) = &self.season {
            write!(f, " / {}", season)?;
        }
        if let Some(category) = &self.category {
            write!(f, " / {}", category)?;
        }
        if let Some(situation) = &self.situation {
            write!(f, " / {}", situation)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Every skip made during a run, in the order it was recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapLog {
    gaps: Vec<Gap>,
}

impl GapLog {
    pub fn new() -> GapLog {
        GapLog::default()
    }

    pub fn record(&mut self, gap: Gap) {
        self.gaps.push(gap);
    }

    pub fn extend(&mut self, other: GapLog) {
        self.gaps.extend(other.gaps);
    }

    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Gap> {
        self.gaps.iter()
    }

    pub fn count_for(&self, path: &LabelPath) -> usize {
        self.gaps.iter().filter(|g| g.is_for(path)).count()
    }

    pub fn count_tier(&self, tier: GapTier) -> usize {
        self.gaps.iter().filter(|g| g.tier == tier).count()
    }
}
