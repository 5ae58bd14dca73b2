//! The persisted cycle record (`state.json`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use cardinals_common::CardinalsError;

use super::write_atomic;

pub const STATE_SCHEMA_VERSION: u32 = 1;
pub const STATE_FILE: &str = "state.json";

/// Singleton cycle record. Read at process start, written back after each
/// transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleState {
    pub schema_version: u32,
    pub queries_used_today: u32,
    pub last_reset_date: NaiveDate,
    pub last_email_sent: Option<NaiveDate>,
    pub last_scrape_date: Option<NaiveDate>,
    pub week_start_date: NaiveDate,
}

/// On-disk shape: every field optional so older or hand-edited files load.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredState {
    schema_version: Option<u32>,
    queries_used_today: Option<u32>,
    last_reset_date: Option<NaiveDate>,
    last_email_sent: Option<NaiveDate>,
    last_scrape_date: Option<NaiveDate>,
    week_start_date: Option<NaiveDate>,
}

impl CycleState {
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            queries_used_today: 0,
            last_reset_date: today,
            last_email_sent: None,
            last_scrape_date: None,
            week_start_date: today,
        }
    }

    fn from_stored(stored: StoredState, today: NaiveDate) -> Self {
        if let Some(version) = stored.schema_version {
            if version > STATE_SCHEMA_VERSION {
                warn!(version, "State file is from a newer schema, reading known fields");
            }
        }
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            queries_used_today: stored.queries_used_today.unwrap_or(0),
            last_reset_date: stored.last_reset_date.unwrap_or(today),
            last_email_sent: stored.last_email_sent,
            last_scrape_date: stored.last_scrape_date,
            week_start_date: stored.week_start_date.unwrap_or(today),
        }
    }

    pub fn already_harvested(&self, today: NaiveDate) -> bool {
        self.last_scrape_date == Some(today)
    }

    /// Add provider queries to today's counter, rolling it over on a new day.
    pub fn record_queries(&mut self, count: u32, today: NaiveDate) {
        if self.last_reset_date != today {
            self.queries_used_today = 0;
            self.last_reset_date = today;
        }
        self.queries_used_today = self.queries_used_today.saturating_add(count);
    }

    pub fn mark_harvested(&mut self, today: NaiveDate) {
        self.last_scrape_date = Some(today);
    }

    /// A digest went out: the next week starts tomorrow.
    pub fn mark_sent(&mut self, today: NaiveDate) {
        self.last_email_sent = Some(today);
        self.week_start_date = today.succ_opt().unwrap_or(today);
    }
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `state.json` inside the data dir.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable state yields a fresh record.
    pub fn load(&self, today: NaiveDate) -> CycleState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return CycleState::fresh(today),
        };
        match serde_json::from_str::<StoredState>(&raw) {
            Ok(stored) => CycleState::from_stored(stored, today),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt state file, starting fresh");
                CycleState::fresh(today)
            }
        }
    }

    pub fn save(&self, state: &CycleState) -> Result<()> {
        let json = serde_json::to_string_pretty(state).context("Failed to serialize state")?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| {
            anyhow::Error::from(CardinalsError::Persistence(format!(
                "state {}: {e:#}",
                self.path.display()
            )))
        })
    }
}
