//! Renders accumulated tables into the weekly email digest and the full
//! web report.
//!
//! Deadline countdowns are recomputed from `Date Info` at render time, so a
//! digest sent days after the harvest shows current values.

use std::fmt;

use chrono::{Datelike, NaiveDate};

use cardinals_common::{Category, CuratedItem, ExpertItem, UNSET};

use crate::dates::countdown_from;
use crate::store::AccumulationStore;
use crate::text::escape_html;

/// Rows shown per section in the condensed digest.
const CONDENSED_ROWS: usize = 3;
const MAX_ROLE_CHARS: usize = 80;

/// Everything accumulated for the current week.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digest {
    pub grants: Vec<CuratedItem>,
    pub events: Vec<CuratedItem>,
    pub reports: Vec<CuratedItem>,
    pub experts: Vec<ExpertItem>,
}

/// Row counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestCounts {
    pub grants: usize,
    pub events: usize,
    pub reports: usize,
    pub experts: usize,
}

impl HarvestCounts {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Grants => self.grants,
            Category::Events => self.events,
            Category::Reports => self.reports,
            Category::Experts => self.experts,
        }
    }

    pub fn set(&mut self, category: Category, count: usize) {
        match category {
            Category::Grants => self.grants = count,
            Category::Events => self.events = count,
            Category::Reports => self.reports = count,
            Category::Experts => self.experts = count,
        }
    }

    pub fn total(&self) -> usize {
        self.grants + self.events + self.reports + self.experts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestStyle {
    /// Every row of every category.
    Full,
    /// Counts plus the first few rows per section, linking to the full report.
    Condensed,
}

impl Digest {
    pub fn load(store: &AccumulationStore) -> Self {
        Self {
            grants: store.read_category(Category::Grants),
            events: store.read_category(Category::Events),
            reports: store.read_category(Category::Reports),
            experts: store.read_category(Category::Experts),
        }
    }

    pub fn counts(&self) -> HarvestCounts {
        HarvestCounts {
            grants: self.grants.len(),
            events: self.events.len(),
            reports: self.reports.len(),
            experts: self.experts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    fn curated(&self, category: Category) -> &[CuratedItem] {
        match category {
            Category::Grants => &self.grants,
            Category::Events => &self.events,
            _ => &self.reports,
        }
    }
}

fn anchor(category: Category) -> &'static str {
    match category {
        Category::Grants => "grants",
        Category::Events => "events",
        Category::Reports => "reports",
        Category::Experts => "experts",
    }
}

/// Deadline column as shown to readers.
fn display_deadline(category: Category, row: &CuratedItem, today: NaiveDate) -> String {
    if category.is_future_oriented() {
        countdown_from(&row.date_info, today)
    } else {
        row.deadline.clone()
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{head}...")
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn curated_section(
    f: &mut fmt::Formatter<'_>,
    category: Category,
    rows: &[CuratedItem],
    limit: Option<usize>,
    today: NaiveDate,
    report_link: Option<&str>,
) -> fmt::Result {
    let id = anchor(category);
    writeln!(
        f,
        r#"<section id="{id}"><h2>{} ({})</h2>"#,
        category.label(),
        rows.len()
    )?;

    if rows.is_empty() {
        return writeln!(
            f,
            r#"<p class="empty">No {} curated this week</p></section>"#,
            category.label().to_lowercase()
        );
    }

    let shown = limit.unwrap_or(rows.len()).min(rows.len());
    for row in &rows[..shown] {
        writeln!(f, r#"<div class="item">"#)?;
        writeln!(
            f,
            r#"<h3><a href="{}">{}</a></h3>"#,
            escape_html(&row.url),
            escape_html(&row.title)
        )?;
        writeln!(f, r#"<p class="org">{}</p>"#, escape_html(&row.organization))?;
        if !row.description.is_empty() {
            writeln!(f, "<p>{}</p>", escape_html(&row.description))?;
        }
        writeln!(
            f,
            r#"<p class="date">{} &middot; {}</p>"#,
            escape_html(&row.date_info),
            escape_html(&display_deadline(category, row, today))
        )?;
        writeln!(f, "</div>")?;
    }

    more_link(f, id, rows.len() - shown, report_link)?;
    writeln!(f, "</section>")
}

fn expert_section(
    f: &mut fmt::Formatter<'_>,
    rows: &[ExpertItem],
    limit: Option<usize>,
    report_link: Option<&str>,
) -> fmt::Result {
    let category = Category::Experts;
    let id = anchor(category);
    writeln!(
        f,
        r#"<section id="{id}"><h2>{} ({})</h2>"#,
        category.label(),
        rows.len()
    )?;

    if rows.is_empty() {
        return writeln!(f, r#"<p class="empty">No experts curated this week</p></section>"#);
    }

    let shown = limit.unwrap_or(rows.len()).min(rows.len());
    for row in &rows[..shown] {
        writeln!(f, r#"<div class="item">"#)?;
        writeln!(f, "<h3>{}</h3>", escape_html(&row.name))?;
        if row.role != UNSET && !row.role.is_empty() {
            writeln!(
                f,
                r#"<p class="role">{}</p>"#,
                escape_html(&truncate_chars(&row.role, MAX_ROLE_CHARS))
            )?;
        }
        if row.organization != UNSET && !row.organization.is_empty() {
            writeln!(f, r#"<p class="org">{}</p>"#, escape_html(&row.organization))?;
        }
        if !row.linkedin.is_empty() {
            writeln!(f, r#"<a href="{}">LinkedIn</a>"#, escape_html(&row.linkedin))?;
        }
        writeln!(f, "</div>")?;
    }

    more_link(f, id, rows.len() - shown, report_link)?;
    writeln!(f, "</section>")
}

fn more_link(
    f: &mut fmt::Formatter<'_>,
    id: &str,
    hidden: usize,
    report_link: Option<&str>,
) -> fmt::Result {
    if hidden == 0 {
        return Ok(());
    }
    match report_link {
        Some(link) => writeln!(
            f,
            r##"<p class="more"><a href="{}#{id}">View {hidden} more in the full report</a></p>"##,
            escape_html(link)
        ),
        None => writeln!(f, r#"<p class="more">{hidden} more in the full report</p>"#),
    }
}

fn sections(
    f: &mut fmt::Formatter<'_>,
    digest: &Digest,
    limit: Option<usize>,
    today: NaiveDate,
    link: Option<&str>,
) -> fmt::Result {
    expert_section(f, &digest.experts, limit, link)?;
    for category in [Category::Grants, Category::Events, Category::Reports] {
        curated_section(f, category, digest.curated(category), limit, today, link)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

struct DigestPage<'a> {
    digest: &'a Digest,
    style: DigestStyle,
    today: NaiveDate,
    report_link: Option<&'a str>,
}

impl fmt::Display for DigestPage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.digest.counts();
        writeln!(f, "<!DOCTYPE html>\n<html><body>")?;
        writeln!(
            f,
            "<h1>Climate Cardinals Newsletter</h1>\n<p>Week {} &middot; {}</p>",
            self.today.iso_week().week(),
            self.today.format("%B %d, %Y")
        )?;
        writeln!(
            f,
            r#"<table class="stats"><tr><td>{} experts</td><td>{} grants</td><td>{} events</td><td>{} reports</td></tr></table>"#,
            counts.experts, counts.grants, counts.events, counts.reports
        )?;

        match self.style {
            DigestStyle::Full => sections(f, self.digest, None, self.today, None)?,
            DigestStyle::Condensed => {
                sections(f, self.digest, Some(CONDENSED_ROWS), self.today, self.report_link)?;
                if let Some(link) = self.report_link {
                    writeln!(
                        f,
                        r#"<p class="cta"><a href="{}">Read the full report</a></p>"#,
                        escape_html(link)
                    )?;
                }
            }
        }

        writeln!(f, "</body></html>")
    }
}

struct ReportPage<'a> {
    digest: &'a Digest,
    today: NaiveDate,
}

impl fmt::Display for ReportPage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!("Climate Cardinals Weekly Report - {}", self.today.format("%B %d, %Y"));
        writeln!(
            f,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             <title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>"
        )?;

        let counts = self.digest.counts();
        writeln!(f, "<nav>")?;
        for category in [Category::Experts, Category::Grants, Category::Events, Category::Reports] {
            writeln!(
                f,
                r##"<a href="#{}">{} ({})</a>"##,
                anchor(category),
                category.label(),
                counts.get(category)
            )?;
        }
        writeln!(f, "</nav>")?;

        sections(f, self.digest, None, self.today, None)?;
        writeln!(f, "</body>\n</html>")
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Email body for the weekly send. `report_link` is where the full web
/// report lives; the condensed style links every section to it.
pub fn render_digest(
    digest: &Digest,
    style: DigestStyle,
    today: NaiveDate,
    report_link: Option<&str>,
) -> String {
    DigestPage {
        digest,
        style,
        today,
        report_link,
    }
    .to_string()
}

/// Standalone web page listing every accumulated row.
pub fn render_report(digest: &Digest, today: NaiveDate) -> String {
    ReportPage { digest, today }.to_string()
}

/// Email subject for a send on `today`.
pub fn digest_subject(prefix: &str, style: DigestStyle, today: NaiveDate) -> String {
    let date = today.format("%Y-%m-%d");
    match style {
        DigestStyle::Condensed => format!("{prefix} - Weekly Digest - {date}"),
        DigestStyle::Full => format!("{prefix} - {date}"),
    }
}
