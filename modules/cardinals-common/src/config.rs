use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::Deserialize;

use crate::error::CardinalsError;

/// TOML-backed configuration. Every section and field falls back to the stock
/// value, so an absent or partial file is valid. Secrets stay in env vars.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub harvest: HarvestConfig,
    pub keywords: KeywordsConfig,
    pub schedule: ScheduleConfig,
    pub output: OutputConfig,
    pub email: EmailConfig,
}

/// Knobs passed into the harvesters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Dates with an earlier year are stale and never reported as upcoming.
    pub min_year: i32,
    pub polite_delay_ms: u64,
    /// Upper bound of the random extra delay added after each query.
    pub jitter_ms: u64,
    pub max_rows_per_section: usize,
    pub max_results_per_keyword: usize,
    /// Results requested from the provider per section keyword.
    pub search_fetch_count: u32,
    /// Results requested from the provider per expert query.
    pub expert_fetch_count: u32,
    pub max_experts: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            min_year: 2026,
            polite_delay_ms: 250,
            jitter_ms: 150,
            max_rows_per_section: 40,
            max_results_per_keyword: 4,
            search_fetch_count: 8,
            expert_fetch_count: 12,
            max_experts: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeywordsConfig {
    pub grants: Vec<String>,
    pub events: Vec<String>,
    pub reports: Vec<String>,
    pub experts: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            grants: strings(&[
                "resilience grant",
                "sustainability grant",
                "climate adaptation grant",
                "climate resilience funding",
                "community resilience grant",
            ]),
            events: strings(&[
                "climate conference 2026",
                "sustainability summit 2026",
                "climate week 2026",
                "resilience symposium 2026",
                "environmental conference 2026 2027",
            ]),
            reports: strings(&[
                "sustainability report pdf",
                "ESG report pdf",
                "impact report pdf",
                "climate disclosure report",
            ]),
            experts: strings(&[
                "climate nonprofit executive director LinkedIn",
                "head of sustainability nonprofit LinkedIn",
                "climate resilience NGO director LinkedIn",
            ]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Weekday on which the digest goes out ("Monday", "mon", ...).
    pub send_weekday: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            send_weekday: "Monday".to_string(),
        }
    }
}

impl ScheduleConfig {
    pub fn weekday(&self) -> Result<Weekday, CardinalsError> {
        self.send_weekday.trim().parse::<Weekday>().map_err(|_| {
            CardinalsError::Config(format!("invalid send_weekday: {:?}", self.send_weekday))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub data_dir: PathBuf,
    /// HTML reports kept after a weekly reset (at least one is always kept).
    pub keep_recent_reports: usize,
    pub cleanup_old_reports: bool,
    /// Public URL the full reports are hosted under. Empty = local file links.
    pub report_base_url: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("weekly_data"),
            keep_recent_reports: 3,
            cleanup_old_reports: true,
            report_base_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Counts + top rows with a link to the full report, instead of every row.
    pub condensed: bool,
    pub subject_prefix: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            condensed: true,
            subject_prefix: "Climate Cardinals Newsletter".to_string(),
        }
    }
}

impl FileConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), CardinalsError> {
        self.schedule.weekday()?;
        if self.harvest.max_results_per_keyword == 0 {
            return Err(CardinalsError::Config(
                "max_results_per_keyword must be at least 1".to_string(),
            ));
        }
        if self.harvest.search_fetch_count == 0 || self.harvest.expert_fetch_count == 0 {
            return Err(CardinalsError::Config(
                "search fetch counts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `WEB_REPORT_BASE_URL` wins over the file value when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("WEB_REPORT_BASE_URL") {
            if !url.trim().is_empty() {
                self.output.report_base_url = url.trim().to_string();
            }
        }
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the stock configuration.
pub fn load_or_default(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No config file, using defaults");
        return Ok(FileConfig::default());
    }
    load_config(path)
}

/// Secrets and delivery addresses, loaded from the environment (and `.env`).
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub serper_api_key: Option<String>,
    pub resend_api_key: Option<String>,
    pub sender_email: Option<String>,
    pub recipient_emails: Vec<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            serper_api_key: non_empty_env("SERPER_API_KEY"),
            resend_api_key: non_empty_env("RESEND_API_KEY"),
            sender_email: non_empty_env("SENDER_EMAIL"),
            recipient_emails: parse_recipients(&env::var("RECIPIENT_EMAILS").unwrap_or_default()),
        }
    }

    /// Sender, credentials and at least one recipient are all present.
    pub fn email_configured(&self) -> bool {
        self.resend_api_key.is_some()
            && self.sender_email.is_some()
            && !self.recipient_emails.is_empty()
    }

    pub fn log_redacted(&self) {
        fn preview(val: &Option<String>) -> String {
            match val {
                Some(v) => {
                    let head: String = v.chars().take(4).collect();
                    format!("{head}...({} chars)", v.len())
                }
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Secrets loaded:");
        tracing::info!("  SERPER_API_KEY: {}", preview(&self.serper_api_key));
        tracing::info!("  RESEND_API_KEY: {}", preview(&self.resend_api_key));
        tracing::info!("  SENDER_EMAIL: {}", preview(&self.sender_email));
        tracing::info!("  RECIPIENT_EMAILS: {} configured", self.recipient_emails.len());
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a comma-separated recipient list, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
