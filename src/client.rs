use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::HarvestConfig;
use crate::error::Result;

// ============================================================================
// TRANSPORT SEAMS
// ============================================================================

/// Stateless page access plus a factory for stateful form sessions.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches a page outside of any session.
    async fn get(&self, url: &str) -> Result<String>;

    /// Opens a session with an empty cookie jar.
    async fn open_session(&self) -> Result<Box<dyn FormSession>>;
}

/// A cookie-carrying session. Requests are issued strictly one after another,
/// hence `&mut self`.
#[async_trait]
pub trait FormSession: Send {
    async fn post_form(&mut self, url: &str, form: &[(&str, &str)]) -> Result<String>;
}

// ============================================================================
// HTTP IMPLEMENTATION
// ============================================================================

pub struct HttpSource {
    client: Client,
    config: HarvestConfig,
}

impl HttpSource {
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        Ok(HttpSource {
            client: build_client(config, false)?,
            config: config.clone(),
        })
    }
}

fn build_client(config: &HarvestConfig, cookies: bool) -> Result<Client> {
    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout)
        .cookie_store(cookies)
        .build()?;
    Ok(client)
}

#[async_trait]
impl PageSource for HttpSource {
    async fn get(&self, url: &str) -> Result<String> {
        debug!(url, "GET");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    async fn open_session(&self) -> Result<Box<dyn FormSession>> {
        let client = build_client(&self.config, true)?;
        Ok(Box::new(HttpSession { client }))
    }
}

struct HttpSession {
    client: Client,
}

#[async_trait]
impl FormSession for HttpSession {
    async fn post_form(&mut self, url: &str, form: &[(&str, &str)]) -> Result<String> {
        debug!(url, ?form, "POST");
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
