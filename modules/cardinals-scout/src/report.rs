//! Full HTML report files in the data dir.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::digest::{render_report, Digest};

const REPORT_PREFIX: &str = "climate_cardinals_report_";
const REPORT_SUFFIX: &str = ".html";

pub fn report_file_name(today: NaiveDate) -> String {
    format!("{REPORT_PREFIX}{}{REPORT_SUFFIX}", today.format("%Y%m%d"))
}

fn is_report_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(REPORT_PREFIX) && n.ends_with(REPORT_SUFFIX))
}

/// Render and write today's report, replacing one from earlier the same day.
pub fn write_report(dir: &Path, digest: &Digest, today: NaiveDate) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(report_file_name(today));
    fs::write(&path, render_report(digest, today))
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    info!(path = %path.display(), rows = digest.counts().total(), "Full report written");
    Ok(path)
}

/// Public link for a written report: hosted under `base_url` when set,
/// otherwise a local `file://` URL.
pub fn report_url(base_url: &str, path: &Path) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !base.is_empty() {
        return format!("{base}/{file_name}");
    }

    warn!("No report base URL configured, linking to a local file");
    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let normalized = absolute.to_string_lossy().replace('\\', "/");
    format!("file:///{}", normalized.trim_start_matches('/'))
}

/// Delete all but the `keep` most recently modified reports (at least one
/// is always kept). Returns the paths removed, or that would be removed
/// when `dry_run` is set.
pub fn cleanup_old_reports(dir: &Path, keep: usize, dry_run: bool) -> Result<Vec<PathBuf>> {
    let keep = keep.max(1);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut reports: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if !is_report_file(&path) {
            continue;
        }
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        reports.push((modified, path));
    }

    // newest first; name breaks ties so the order is stable
    reports.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    if reports.len() <= keep {
        info!(reports = reports.len(), keep, "No old reports to clean up");
        return Ok(Vec::new());
    }

    let mut removed = Vec::new();
    for (_, path) in reports.into_iter().skip(keep) {
        if dry_run {
            info!(path = %path.display(), "Would delete old report");
            removed.push(path);
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Deleted old report");
                removed.push(path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete old report"),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "<html></html>").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
        path
    }

    #[test]
    fn file_name_uses_compact_date() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
        assert_eq!(report_file_name(day), "climate_cardinals_report_20260216.html");
    }

    #[test]
    fn write_report_creates_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let path = write_report(dir.path(), &Digest::default(), day).unwrap();
        assert!(path.ends_with("climate_cardinals_report_20261016.html"));
        assert!(fs::read_to_string(path).unwrap().starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn hosted_url_joins_base_and_file_name() {
        let path = Path::new("/data/climate_cardinals_report_20261016.html");
        assert_eq!(
            report_url("https://example.org/reports/", path),
            "https://example.org/reports/climate_cardinals_report_20261016.html"
        );
    }

    #[test]
    fn local_url_is_file_scheme() {
        let url = report_url("", Path::new("/tmp/climate_cardinals_report_20261016.html"));
        assert!(url.starts_with("file:///"));
        assert!(url.ends_with("climate_cardinals_report_20261016.html"));
    }

    #[test]
    fn cleanup_keeps_most_recent_and_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let newest = touch(dir.path(), "climate_cardinals_report_20261016.html", 10);
        let middle = touch(dir.path(), "climate_cardinals_report_20261009.html", 100);
        let oldest = touch(dir.path(), "climate_cardinals_report_20261002.html", 1000);
        let csv = touch(dir.path(), "grants.csv", 5000);

        let removed = cleanup_old_reports(dir.path(), 2, false).unwrap();
        assert_eq!(removed, vec![oldest.clone()]);
        assert!(newest.exists() && middle.exists() && csv.exists());
        assert!(!oldest.exists());
    }

    #[test]
    fn dry_run_deletes_nothing_and_keep_zero_keeps_one() {
        let dir = tempfile::tempdir().unwrap();
        let newest = touch(dir.path(), "climate_cardinals_report_20261016.html", 10);
        let older = touch(dir.path(), "climate_cardinals_report_20261009.html", 100);

        let would = cleanup_old_reports(dir.path(), 0, true).unwrap();
        assert_eq!(would, vec![older.clone()]);
        assert!(older.exists());

        let removed = cleanup_old_reports(dir.path(), 0, false).unwrap();
        assert_eq!(removed, vec![older]);
        assert!(newest.exists());
    }

    #[test]
    fn missing_dir_is_nothing_to_clean() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cleanup_old_reports(&dir.path().join("absent"), 3, false)
            .unwrap()
            .is_empty());
    }
}
