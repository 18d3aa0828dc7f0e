use scraper::ElementRef;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::Result;

/// Joins a site-relative href (e.g. `/team/746/stats?...`) onto the base URL
pub fn absolute_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{}{}", base, href)
    } else {
        format!("{}/{}", base, href)
    }
}

/// Collects an element's text with runs of whitespace collapsed to one space
pub fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `op`, retrying once after `backoff` if the first error is retryable.
pub async fn with_retry<T, F, Fut>(what: &str, backoff: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match op().await {
        Err(e) if e.is_retryable() => {
            warn!(request = what, error = %e, backoff_ms = backoff.as_millis() as u64, "retrying request");
            tokio::time::sleep(backoff).await;
            op().await
        }
        other => other,
    }
}
