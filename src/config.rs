use std::time::Duration;

pub const STATS_BASE_URL: &str = "https://stats.ncaa.org";
pub const SPORT_CODE: &str = "MBA";
pub const DIVISION: u8 = 1;

/// Stat sequence the team landing page is addressed by; any valid one lists the seasons.
pub const LANDING_STAT_SEQ: u32 = 16340;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Seasons the site lists but never backs with data.
pub const DEFAULT_EXCLUDED_SEASONS: &[&str] = &["2010-11"];

pub const MAX_CONCURRENT_SESSIONS: usize = 9;

// ============================================================================
// HARVEST CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub base_url: String,
    pub sport_code: String,
    pub division: u8,
    pub landing_stat_seq: u32,
    pub user_agent: String,
    pub request_timeout: Duration,
    /// Units (school, season) allowed in flight at once.
    pub concurrency: usize,
    pub retry_backoff: Duration,
    pub excluded_seasons: Vec<String>,
    pub run_timeout: Option<Duration>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        HarvestConfig {
            base_url: STATS_BASE_URL.to_string(),
            sport_code: SPORT_CODE.to_string(),
            division: DIVISION,
            landing_stat_seq: LANDING_STAT_SEQ,
            user_agent: USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            concurrency: 4,
            retry_backoff: Duration::from_secs(2),
            excluded_seasons: DEFAULT_EXCLUDED_SEASONS.iter().map(|s| s.to_string()).collect(),
            run_timeout: None,
        }
    }
}

impl HarvestConfig {
    /// Concurrency clamped to what the stats site tolerates.
    pub fn session_limit(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENT_SESSIONS)
    }

    pub fn is_excluded(&self, season_label: &str) -> bool {
        self.excluded_seasons.iter().any(|s| s == season_label)
    }

    pub fn directory_url(&self) -> String {
        format!(
            "{}/team/inst_team_list?sport_code={}&division={}",
            self.base_url, self.sport_code, self.division
        )
    }

    pub fn landing_url(&self, school_id: &str) -> String {
        format!("{}/team/{}/stats/{}", self.base_url, school_id, self.landing_stat_seq)
    }
}
