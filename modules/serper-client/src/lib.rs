pub mod error;
pub mod types;

pub use error::{Result, SerperError};
pub use types::{OrganicResult, SearchRequest, SearchResponse};

use std::time::Duration;

const BASE_URL: &str = "https://google.serper.dev";

/// Request timeout. Serper usually answers in well under a second.
const TIMEOUT: Duration = Duration::from_secs(30);

pub struct SerperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerperClient {
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(SerperError::MissingApiKey);
        }
        let client = reqwest::Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at a different host (local stubs, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Run a Google web search and return the organic results, at most `num`.
    pub async fn search(&self, query: &str, num: u32) -> Result<Vec<OrganicResult>> {
        tracing::debug!(query, num, "Serper search");

        let body = SearchRequest {
            q: query.to_string(),
            num,
        };

        let url = format!("{}/search", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SerperError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let text = resp.text().await?;
        let data: SearchResponse = serde_json::from_str(&text)?;

        let mut results = data.organic;
        results.truncate(num as usize);
        tracing::debug!(query, count = results.len(), "Serper search complete");
        Ok(results)
    }
}
