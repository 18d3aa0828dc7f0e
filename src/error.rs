use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// A positional lookup found fewer elements than the site layout promises.
    #[error("Layout mismatch: wanted {element} #{index}, page has {found}")]
    LayoutMismatch {
        element: &'static str,
        index: usize,
        found: usize,
    },

    #[error("Table has no header cells")]
    EmptyTable,

    #[error("Directory unavailable: {0}")]
    Directory(String),

    #[error("Sink error: {0}")]
    Sink(String),
}

impl ScrapeError {
    /// Transport failures, 429 and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScrapeError::Network(_) => true,
            ScrapeError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn layout(element: &'static str, index: usize, found: usize) -> Self {
        ScrapeError::LayoutMismatch { element, index, found }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ScrapeError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => ScrapeError::Network(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ScrapeError {
    fn from(err: rusqlite::Error) -> Self {
        ScrapeError::Sink(err.to_string())
    }
}

impl From<csv::Error> for ScrapeError {
    fn from(err: csv::Error) -> Self {
        ScrapeError::Sink(err.to_string())
    }
}

impl From<std::io::Error> for ScrapeError {
    fn from(err: std::io::Error) -> Self {
        ScrapeError::Sink(err.to_string())
    }
}
