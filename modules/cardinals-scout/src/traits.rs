// Trait abstractions for the harvest's external dependencies.
//
// WebSearcher: the search provider. Implementations may fail; harvesters
//   call through SearchAdapter, which turns every provider failure into
//   an empty result set.
//
// These let the harvesters run against MockSearcher in tests:
// no network, no API key.

use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use cardinals_common::SearchResult;
use serper_client::SerperClient;

// ---------------------------------------------------------------------------
// WebSearcher
// ---------------------------------------------------------------------------

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Run a web search, returning at most `limit` results.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchResult>>;

    fn name(&self) -> &str;
}

/// Serper (Google Search) backed searcher.
pub struct SerperSearcher {
    client: SerperClient,
}

impl SerperSearcher {
    pub fn new(api_key: &str) -> Result<Self> {
        Ok(Self {
            client: SerperClient::new(api_key.to_string())?,
        })
    }
}

#[async_trait]
impl WebSearcher for SerperSearcher {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchResult>> {
        let organic = self.client.search(query, limit).await?;
        Ok(organic
            .into_iter()
            .map(|r| SearchResult {
                title: r.title,
                link: r.link,
                snippet: r.snippet,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "serper"
    }
}

// ---------------------------------------------------------------------------
// SearchAdapter
// ---------------------------------------------------------------------------

/// Infallible view over a [`WebSearcher`]. Counts the queries it issues so
/// the cycle state can track provider usage.
pub struct SearchAdapter<'a> {
    searcher: &'a dyn WebSearcher,
    queries: AtomicU32,
}

impl<'a> SearchAdapter<'a> {
    pub fn new(searcher: &'a dyn WebSearcher) -> Self {
        Self {
            searcher,
            queries: AtomicU32::new(0),
        }
    }

    /// Search, degrading any provider error to an empty result set.
    pub async fn search(&self, query: &str, limit: u32) -> Vec<SearchResult> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        match self.searcher.search(query, limit).await {
            Ok(results) => {
                info!(
                    query,
                    provider = self.searcher.name(),
                    count = results.len(),
                    "Search complete"
                );
                results
            }
            Err(e) => {
                warn!(
                    query,
                    provider = self.searcher.name(),
                    error = %e,
                    "Search failed, treating as zero results"
                );
                Vec::new()
            }
        }
    }

    /// Queries issued through this adapter so far.
    pub fn queries_issued(&self) -> u32 {
        self.queries.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSearcher;

    #[tokio::test]
    async fn provider_error_becomes_empty_results() {
        let searcher = MockSearcher::new().failing("broken query");
        let adapter = SearchAdapter::new(&searcher);
        assert!(adapter.search("broken query", 8).await.is_empty());
        assert_eq!(adapter.queries_issued(), 1);
    }

    #[tokio::test]
    async fn results_pass_through_and_queries_are_counted() {
        let searcher = MockSearcher::new().on_search(
            "climate grant",
            vec![SearchResult::new("Climate grant", "https://a.org", "Funding")],
        );
        let adapter = SearchAdapter::new(&searcher);
        assert_eq!(adapter.search("climate grant", 8).await.len(), 1);
        assert!(adapter.search("unregistered", 8).await.is_empty());
        assert_eq!(adapter.queries_issued(), 2);
    }

    #[test]
    fn serper_searcher_requires_api_key() {
        assert!(SerperSearcher::new("").is_err());
    }
}
