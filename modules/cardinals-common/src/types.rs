use std::fmt;

use serde::{Deserialize, Serialize};

// --- Sentinels ---

/// Stored in `Date Info` / `Deadline` when no date could be extracted.
pub const NONE_FOUND: &str = "none found";

/// Stored in `Date Info` when a future-oriented snippet advertises rolling admission.
pub const ROLLING: &str = "Rolling / Ongoing";

/// Placeholder for an unparsed expert name, role or organization.
pub const UNSET: &str = "—";

// --- Search ---

/// One normalized search hit. Transient: produced per query, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(title: &str, link: &str, snippet: &str) -> Self {
        Self {
            title: title.to_string(),
            link: link.to_string(),
            snippet: snippet.to_string(),
        }
    }
}

// --- Category rows ---

/// A grant, event or report row. `url` is the dedup key within its table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedItem {
    #[serde(rename = "Title")]
    pub title: String,
    /// Host of `url` without `www.`; one per harvest pass.
    #[serde(rename = "Organization")]
    pub organization: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Date Info")]
    pub date_info: String,
    #[serde(rename = "Deadline")]
    pub deadline: String,
    #[serde(rename = "URL")]
    pub url: String,
}

/// A LinkedIn profile row. `linkedin` is the dedup key within the experts table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Role")]
    pub role: String,
    #[serde(rename = "Organization")]
    pub organization: String,
    #[serde(rename = "LinkedIn")]
    pub linkedin: String,
}

// --- Categories ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Grants,
    Events,
    Reports,
    Experts,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Grants,
        Category::Events,
        Category::Reports,
        Category::Experts,
    ];

    /// File name of the persisted table inside the data dir.
    pub fn file_name(self) -> &'static str {
        match self {
            Category::Grants => "grants.csv",
            Category::Events => "events.csv",
            Category::Reports => "csr_reports.csv",
            Category::Experts => "experts.csv",
        }
    }

    /// Human heading used in digests and console summaries.
    pub fn label(self) -> &'static str {
        match self {
            Category::Grants => "Grants",
            Category::Events => "Events",
            Category::Reports => "CSR Reports",
            Category::Experts => "Experts",
        }
    }

    /// Grants and events describe things that can expire; reports and experts don't.
    pub fn is_future_oriented(self) -> bool {
        matches!(self, Category::Grants | Category::Events)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Grants => "grants",
            Category::Events => "events",
            Category::Reports => "reports",
            Category::Experts => "experts",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_grants_and_events_are_future_oriented() {
        let future: Vec<_> = Category::ALL
            .iter()
            .filter(|c| c.is_future_oriented())
            .collect();
        assert_eq!(future, vec![&Category::Grants, &Category::Events]);
    }

    #[test]
    fn category_files_are_distinct() {
        let mut names: Vec<_> = Category::ALL.iter().map(|c| c.file_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
    }
}
