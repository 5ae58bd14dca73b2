//! Date and deadline extraction from search snippets.
//!
//! Snippets carry dates in mixed formats and often bury the real deadline
//! behind a phrase like "applications close". Extraction is staged by
//! confidence:
//!
//! 1. a deadline-signal phrase followed (same sentence, within
//!    [`SIGNAL_WINDOW_CHARS`]) by a date with year >= `min_year`;
//! 2. the first absolute date with year >= `min_year`, scanning
//!    month-first, then day-first, then numeric formats;
//! 3. for future-oriented text, rolling/continuous admission language;
//! 4. nothing.
//!
//! Internally everything is a [`DateExtraction`]; the stored sentinels
//! ([`NONE_FOUND`], [`ROLLING`]) only appear at the string boundary.

use std::sync::LazyLock;

use cardinals_common::{NONE_FOUND, ROLLING};
use chrono::{Local, NaiveDate};
use regex::{Captures, Regex};
use tracing::debug;

/// How far past a deadline phrase a date may start and still belong to it.
const SIGNAL_WINDOW_CHARS: usize = 48;

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December|\
Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sept|Sep|Oct|Nov|Dec";

/// "January 15, 2026", "Jan. 15 2026", "March 3rd, 2026"
static MONTH_DAY_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s*(20\d{{2}})\b"
    ))
    .unwrap()
});

/// "15 January 2026", "15 Jan. 2026"
static DAY_MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({MONTHS})\.?,?\s*(20\d{{2}})\b"
    ))
    .unwrap()
});

/// "2026-01-15", "2026/01/15"
static ISO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2})[/-](\d{1,2})[/-](\d{1,2})\b").unwrap());

/// "01/15/2026"
static SLASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(20\d{2})\b").unwrap());

/// "15-01-2026"
static DASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})-(\d{1,2})-(20\d{2})\b").unwrap());

static DEADLINE_SIGNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:deadline|due(?:\s+(?:by|on|date))?|submit\s+by|applications?\s+(?:are\s+)?(?:due|close[sd]?)|apply\s+by|(?:applications?\s+)?accept(?:ed|ing)\s+until|open\s+until|closes?|ends?)\b\s*[:\-]?\s*",
    )
    .unwrap()
});

static ROLLING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:rolling|ongoing|open\s+until|continuous)").unwrap());

static SENTENCE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;\n]|\.\s+[A-Z]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFamily {
    MonthDayYear,
    DayMonthYear,
    Numeric,
}

/// A date found in free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch {
    /// Exact substring of the input.
    pub text: String,
    pub family: DateFamily,
    pub year: i32,
    /// `None` when the parts don't form a calendar date (e.g. "February 30, 2026").
    pub date: Option<NaiveDate>,
    start: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateExtraction {
    Found(DateMatch),
    Rolling,
    NotFound,
}

impl DateExtraction {
    /// The persisted `Date Info` value.
    pub fn to_snippet(&self) -> String {
        match self {
            DateExtraction::Found(m) => m.text.clone(),
            DateExtraction::Rolling => ROLLING.to_string(),
            DateExtraction::NotFound => NONE_FOUND.to_string(),
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let n = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

fn capture_u32(caps: &Captures, i: usize) -> Option<u32> {
    caps.get(i)?.as_str().parse().ok()
}

fn build_match(
    caps: &Captures,
    family: DateFamily,
    year: i32,
    date: Option<NaiveDate>,
) -> Option<DateMatch> {
    let whole = caps.get(0)?;
    Some(DateMatch {
        text: whole.as_str().to_string(),
        family,
        year,
        date,
        start: whole.start(),
    })
}

fn month_first(caps: &Captures) -> Option<DateMatch> {
    let month = month_number(caps.get(1)?.as_str())?;
    let day = capture_u32(caps, 2)?;
    let year = capture_u32(caps, 3)? as i32;
    let date = NaiveDate::from_ymd_opt(year, month, day);
    build_match(caps, DateFamily::MonthDayYear, year, date)
}

fn day_first(caps: &Captures) -> Option<DateMatch> {
    let day = capture_u32(caps, 1)?;
    let month = month_number(caps.get(2)?.as_str())?;
    let year = capture_u32(caps, 3)? as i32;
    let date = NaiveDate::from_ymd_opt(year, month, day);
    build_match(caps, DateFamily::DayMonthYear, year, date)
}

/// Numeric dates must form a real calendar date in either the preferred or
/// the swapped day/month order, otherwise they're version numbers or noise.
fn numeric(caps: &Captures, year_idx: usize, first: usize, second: usize) -> Option<DateMatch> {
    let year = capture_u32(caps, year_idx)? as i32;
    let a = capture_u32(caps, first)?;
    let b = capture_u32(caps, second)?;
    let date = NaiveDate::from_ymd_opt(year, a, b).or_else(|| NaiveDate::from_ymd_opt(year, b, a))?;
    build_match(caps, DateFamily::Numeric, year, Some(date))
}

fn month_first_matches(text: &str) -> impl Iterator<Item = DateMatch> + '_ {
    MONTH_DAY_YEAR_RE
        .captures_iter(text)
        .filter_map(|c| month_first(&c))
}

fn day_first_matches(text: &str) -> impl Iterator<Item = DateMatch> + '_ {
    DAY_MONTH_YEAR_RE
        .captures_iter(text)
        .filter_map(|c| day_first(&c))
}

fn numeric_matches(text: &str) -> Vec<DateMatch> {
    let mut out: Vec<DateMatch> = ISO_RE
        .captures_iter(text)
        .filter_map(|c| numeric(&c, 1, 2, 3))
        .chain(SLASH_RE.captures_iter(text).filter_map(|c| numeric(&c, 3, 1, 2)))
        // DD-MM-YYYY: month is the second group
        .chain(DASH_RE.captures_iter(text).filter_map(|c| numeric(&c, 3, 2, 1)))
        .collect();
    out.sort_by_key(|m| m.start);
    out
}

/// Earliest-starting date of any family, regardless of year.
fn earliest_date(text: &str) -> Option<DateMatch> {
    month_first_matches(text)
        .chain(day_first_matches(text))
        .chain(numeric_matches(text))
        .min_by_key(|m| m.start)
}

/// Byte offset of the `n`th char, or the end of the string.
fn char_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

/// Stage 1: a date introduced by a deadline phrase.
fn find_deadline_date(text: &str, min_year: i32) -> Option<DateMatch> {
    for signal in DEADLINE_SIGNAL_RE.find_iter(text) {
        let rest = &text[signal.end()..];
        let mut window = &rest[..char_offset(rest, SIGNAL_WINDOW_CHARS)];
        if let Some(end) = SENTENCE_END_RE.find(window) {
            window = &window[..end.start()];
        }
        if let Some(m) = earliest_date(window) {
            if m.year >= min_year {
                debug!(
                    signal = signal.as_str().trim(),
                    date = %m.text,
                    family = ?m.family,
                    "Deadline phrase matched"
                );
                return Some(m);
            }
        }
    }
    None
}

/// Stage 2: the first absolute date that isn't stale.
fn find_absolute_date(text: &str, min_year: i32) -> Option<DateMatch> {
    month_first_matches(text)
        .find(|m| m.year >= min_year)
        .or_else(|| day_first_matches(text).find(|m| m.year >= min_year))
        .or_else(|| numeric_matches(text).into_iter().find(|m| m.year >= min_year))
}

/// True when `text` carries at least one date older than `min_year`.
pub fn has_stale_date(text: &str, min_year: i32) -> bool {
    month_first_matches(text)
        .chain(day_first_matches(text))
        .chain(numeric_matches(text))
        .any(|m| m.year < min_year)
}

/// Extract the most trustworthy date phrase from `text`. Dates with a year
/// below `min_year` are never returned.
pub fn extract_date(text: &str, future_oriented: bool, min_year: i32) -> DateExtraction {
    if text.trim().is_empty() {
        return DateExtraction::NotFound;
    }

    if let Some(m) = find_deadline_date(text, min_year) {
        return DateExtraction::Found(m);
    }

    if let Some(m) = find_absolute_date(text, min_year) {
        return DateExtraction::Found(m);
    }

    if future_oriented && ROLLING_RE.is_match(text) {
        return DateExtraction::Rolling;
    }

    DateExtraction::NotFound
}

/// String form of [`extract_date`]: the matched fragment verbatim, or a sentinel.
pub fn extract_date_snippet(text: &str, future_oriented: bool, min_year: i32) -> String {
    extract_date(text, future_oriented, min_year).to_snippet()
}

/// Parse the first recognisable date in `s`. Used on persisted `Date Info`
/// values, so it accepts every family and ignores the year floor.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    earliest_date(s)?.date
}

/// Human countdown for a date phrase relative to `today`. Unparsable input
/// comes back unchanged; far-future dates come back as the original phrase.
pub fn countdown_from(date_str: &str, today: NaiveDate) -> String {
    let trimmed = date_str.trim();
    if trimmed.is_empty() || trimmed == NONE_FOUND {
        return NONE_FOUND.to_string();
    }

    let lower = trimmed.to_lowercase();
    if lower.contains("rolling") || lower.contains("ongoing") {
        return "Rolling deadline".to_string();
    }

    let Some(deadline) = parse_date(trimmed) else {
        return date_str.to_string();
    };

    let days = (deadline - today).num_days();
    match days {
        d if d < 0 => "Deadline passed".to_string(),
        0 => "Due today".to_string(),
        1 => "Due tomorrow".to_string(),
        d if d < 7 => format!("Due in {d} days"),
        d if d < 30 => {
            let weeks = d / 7;
            format!("Due in {weeks} week{}", if weeks > 1 { "s" } else { "" })
        }
        d if d < 365 => {
            let months = d / 30;
            format!("Due in {months} month{}", if months > 1 { "s" } else { "" })
        }
        _ => date_str.to_string(),
    }
}

/// [`countdown_from`] relative to the local calendar date.
pub fn to_countdown(date_str: &str) -> String {
    countdown_from(date_str, Local::now().date_naive())
}
