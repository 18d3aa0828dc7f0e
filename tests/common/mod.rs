#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ncaa_baseball_stats::{FormSession, HarvestConfig, PageSource, Result, ScrapeError};

pub const BASE: &str = "http://stats.test";

pub fn test_config() -> HarvestConfig {
    HarvestConfig {
        base_url: BASE.to_string(),
        concurrency: 2,
        retry_backoff: Duration::from_millis(1),
        ..HarvestConfig::default()
    }
}

// ============================================================================
// HTML FIXTURES
// ============================================================================

const FILLER_TABLE: &str = "<table><tr><td>nav</td></tr></table>";

pub fn landing_page(seasons: &[(&str, &str)]) -> String {
    let mut html = String::from(
        r#"<html><body>
        <a href="/team/0/stats?year_stat_category=chrome1">Team Stats</a>
        <a href="/team/0/stats?year_stat_category=chrome2">Game By Game</a>"#,
    );
    for (label, token) in seasons {
        html.push_str(&format!(r#"<a href="{}">{}</a>"#, token, label));
    }
    html.push_str("</body></html>");
    html
}

/// A category page with the split dropdown in third position and, when
/// given, the pitching and fielding links.
pub fn category_page(variants: &[(&str, &str)], links: Option<(&str, &str)>) -> String {
    let mut html = String::from(
        r#"<html><body><select><option>2015-16</option></select><select><option>MBA</option></select><select>"#,
    );
    for (label, value) in variants {
        html.push_str(&format!(r#"<option value="{}">{}</option>"#, value, label));
    }
    html.push_str("</select>");
    if let Some((pitching, fielding)) = links {
        html.push_str(&format!(
            r#"<a href="{}">Pitching</a><a href="{}">Fielding</a>"#,
            pitching, fielding
        ));
    }
    html.push_str(FILLER_TABLE);
    html.push_str(FILLER_TABLE);
    html.push_str("</body></html>");
    html
}

/// A page whose third table is the stats grid.
pub fn result_page(columns: &[&str], rows: &[&[&str]]) -> String {
    let mut html = format!("<html><body>{}{}<table><tr>", FILLER_TABLE, FILLER_TABLE);
    for c in columns {
        html.push_str(&format!("<th>{}</th>", c));
    }
    html.push_str("</tr>");
    for row in rows {
        html.push_str("<tr>");
        for cell in *row {
            html.push_str(&format!("<td>{}</td>", cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table></body></html>");
    html
}

pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

// ============================================================================
// MOCK SITE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub session: usize,
    pub url: String,
    pub value: String,
}

/// In-memory stats site. GETs are served from `pages`, POSTs from
/// `posts[(url, form value)]`; anything missing is a 404.
#[derive(Default)]
pub struct MockSite {
    pages: HashMap<String, String>,
    posts: Arc<HashMap<(String, String), String>>,
    transient_failures: Arc<Mutex<HashMap<String, usize>>>,
    sessions: AtomicUsize,
    post_log: Arc<Mutex<Vec<PostRecord>>>,
    get_log: Mutex<Vec<String>>,
}

impl MockSite {
    pub fn builder() -> MockSiteBuilder {
        MockSiteBuilder::default()
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn posts(&self) -> Vec<PostRecord> {
        self.post_log.lock().unwrap().clone()
    }

    /// Every GET in the order it was issued.
    pub fn gets(&self) -> Vec<String> {
        self.get_log.lock().unwrap().clone()
    }

    pub fn gets_of(&self, url: &str) -> usize {
        self.get_log.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

fn take_transient(failures: &Mutex<HashMap<String, usize>>, key: &str) -> bool {
    let mut failures = failures.lock().unwrap();
    match failures.get_mut(key) {
        Some(n) if *n > 0 => {
            *n -= 1;
            true
        }
        _ => false,
    }
}

#[async_trait]
impl PageSource for MockSite {
    async fn get(&self, url: &str) -> Result<String> {
        self.get_log.lock().unwrap().push(url.to_string());
        if take_transient(&self.transient_failures, url) {
            return Err(ScrapeError::Network("connection reset".to_string()));
        }
        self.pages.get(url).cloned().ok_or(ScrapeError::Status {
            status: 404,
            url: url.to_string(),
        })
    }

    async fn open_session(&self) -> Result<Box<dyn FormSession>> {
        let id = self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            id,
            posts: self.posts.clone(),
            transient_failures: self.transient_failures.clone(),
            log: self.post_log.clone(),
        }))
    }
}

struct MockSession {
    id: usize,
    posts: Arc<HashMap<(String, String), String>>,
    transient_failures: Arc<Mutex<HashMap<String, usize>>>,
    log: Arc<Mutex<Vec<PostRecord>>>,
}

#[async_trait]
impl FormSession for MockSession {
    async fn post_form(&mut self, url: &str, form: &[(&str, &str)]) -> Result<String> {
        let value = form.first().map(|(_, v)| v.to_string()).unwrap_or_default();
        self.log.lock().unwrap().push(PostRecord {
            session: self.id,
            url: url.to_string(),
            value: value.clone(),
        });
        if take_transient(&self.transient_failures, &format!("{}#{}", url, value)) {
            return Err(ScrapeError::Network("timed out".to_string()));
        }
        self.posts
            .get(&(url.to_string(), value))
            .cloned()
            .ok_or(ScrapeError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

#[derive(Default)]
pub struct MockSiteBuilder {
    pages: HashMap<String, String>,
    posts: HashMap<(String, String), String>,
    transient_failures: HashMap<String, usize>,
}

impl MockSiteBuilder {
    pub fn page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    pub fn post(mut self, url: impl Into<String>, value: &str, body: impl Into<String>) -> Self {
        self.posts.insert((url.into(), value.to_string()), body.into());
        self
    }

    /// The next `times` GETs of `url` fail with a network error.
    pub fn flaky_get(mut self, url: impl Into<String>, times: usize) -> Self {
        self.transient_failures.insert(url.into(), times);
        self
    }

    /// The next `times` POSTs of `value` to `url` fail with a network error.
    pub fn flaky_post(mut self, url: &str, value: &str, times: usize) -> Self {
        self.transient_failures.insert(format!("{}#{}", url, value), times);
        self
    }

    /// Adds one season with hitting, pitching and fielding pages. Hitting and
    /// pitching serve one row per split, tagged with the split's value.
    pub fn season(
        mut self,
        school_id: &str,
        token_key: &str,
        hitting: &[(&str, &str)],
        pitching: &[(&str, &str)],
    ) -> Self {
        let hitting_path = format!("/team/{}/stats?year_stat_category={}", school_id, token_key);
        let pitching_path = format!("/team/{}/stats?year_stat_category_id=p{}", school_id, token_key);
        let fielding_path = format!("/team/{}/stats?year_stat_category_id=f{}", school_id, token_key);

        self = self.page(
            url(&hitting_path),
            category_page(hitting, Some((pitching_path.as_str(), fielding_path.as_str()))),
        );
        for (_, value) in hitting {
            self = self.post(
                url(&hitting_path),
                value,
                result_page(&["Player", "AB", "H"], &[&["Smith", "10", *value], &["Jones", "8", "2"]]),
            );
        }

        self = self.page(url(&pitching_path), category_page(pitching, None));
        for (_, value) in pitching {
            self = self.post(
                url(&pitching_path),
                value,
                result_page(&["Player", "IP", "ERA"], &[&["Lefty", "20.1", *value]]),
            );
        }

        self.page(
            url(&fielding_path),
            result_page(&["Player", "PO", "E"], &[&["Smith", "40", "1"], &["Jones", "12", "0"]]),
        )
    }

    /// Landing page for a school listing `(label, token_key)` seasons.
    pub fn landing(self, school_id: &str, seasons: &[(&str, &str)]) -> Self {
        let tokens: Vec<(String, String)> = seasons
            .iter()
            .map(|(label, key)| {
                (
                    label.to_string(),
                    format!("/team/{}/stats?year_stat_category={}", school_id, key),
                )
            })
            .collect();
        let pairs: Vec<(&str, &str)> = tokens.iter().map(|(l, t)| (l.as_str(), t.as_str())).collect();
        let landing_url = test_config().landing_url(school_id);
        self.page(landing_url, landing_page(&pairs))
    }

    pub fn build(self) -> Arc<MockSite> {
        Arc::new(MockSite {
            pages: self.pages,
            posts: Arc::new(self.posts),
            transient_failures: Arc::new(Mutex::new(self.transient_failures)),
            ..MockSite::default()
        })
    }
}

pub fn hitting_url(school_id: &str, token_key: &str) -> String {
    url(&format!("/team/{}/stats?year_stat_category={}", school_id, token_key))
}

pub fn pitching_url(school_id: &str, token_key: &str) -> String {
    url(&format!("/team/{}/stats?year_stat_category_id=p{}", school_id, token_key))
}

pub fn fielding_url(school_id: &str, token_key: &str) -> String {
    url(&format!("/team/{}/stats?year_stat_category_id=f{}", school_id, token_key))
}
