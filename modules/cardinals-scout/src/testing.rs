// Test doubles for the harvest's trait seams.
//
// - MockSearcher (WebSearcher): HashMap-based query→results, with failing queries
// - RecordingTransport (DigestTransport): captures sent digests, optionally fails
//
// Plus helpers for building configs and search results.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use cardinals_common::{FileConfig, SearchResult};

use crate::notify::{DigestMessage, DigestTransport};
use crate::traits::WebSearcher;

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

/// HashMap-based searcher. Unregistered queries return no results;
/// queries registered with `.failing()` return `Err`.
/// Builder pattern: `.on_search()`, `.failing()`.
pub struct MockSearcher {
    searches: HashMap<String, Vec<SearchResult>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self {
            searches: HashMap::new(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_search(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.searches.insert(query.to_string(), results);
        self
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    /// Every `(query, limit)` pair seen, in call order.
    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockSearcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchResult>> {
        self.calls.lock().unwrap().push((query.to_string(), limit));
        if self.failing.contains(query) {
            bail!("MockSearcher: search failed for {query}");
        }
        let mut results = self.searches.get(query).cloned().unwrap_or_default();
        results.truncate(limit as usize);
        Ok(results)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// RecordingTransport
// ---------------------------------------------------------------------------

/// Transport that records every digest handed to it.
pub struct RecordingTransport {
    sent: Mutex<Vec<DigestMessage>>,
    fail: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Every send attempt is recorded, then rejected.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<DigestMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DigestTransport for RecordingTransport {
    async fn send(&self, message: &DigestMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail {
            bail!("RecordingTransport: configured to fail");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn result(title: &str, link: &str, snippet: &str) -> SearchResult {
    SearchResult::new(title, link, snippet)
}

/// Stock config with no politeness delay and a single keyword per
/// category, so tests can register exactly the queries they need.
pub fn test_config() -> FileConfig {
    let mut config = FileConfig::default();
    config.harvest.polite_delay_ms = 0;
    config.harvest.jitter_ms = 0;
    config.keywords.grants = vec!["resilience grant".to_string()];
    config.keywords.events = vec!["climate conference".to_string()];
    config.keywords.reports = vec!["sustainability report".to_string()];
    config.keywords.experts = vec!["climate director LinkedIn".to_string()];
    config
}
