//! Expert profile harvest. Name and role come from the result title,
//! organization from the snippet.

use std::collections::HashSet;

use tracing::{debug, info};

use cardinals_common::{ExpertItem, HarvestConfig, SearchResult, UNSET};

use super::{HarvestBatch, Pacer};
use crate::text::clean_text;
use crate::traits::SearchAdapter;

const PROFILE_PATH: &str = "linkedin.com/in";
const JOB_BOARD_WORDS: &[&str] = &["jobs", "careers", "hiring"];

/// Outcome of splitting a profile title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRole {
    /// Title split once on a dash separator.
    Split { name: String, role: String },
    /// No separator; the whole title is the name.
    NameOnly(String),
}

impl NameRole {
    pub fn name(&self) -> &str {
        match self {
            NameRole::Split { name, .. } => name,
            NameRole::NameOnly(name) => name,
        }
    }

    pub fn role(&self) -> Option<&str> {
        match self {
            NameRole::Split { role, .. } => Some(role),
            NameRole::NameOnly(_) => None,
        }
    }
}

/// Split "Name – Role" on the first en/em dash, else the first " - ".
/// Later dashes stay inside the role ("C-Suite", "Director - EMEA").
pub fn parse_name_role(title: &str) -> NameRole {
    let title = title.trim();
    let title = title.strip_suffix("| LinkedIn").unwrap_or(title).trim_end();

    let split = title
        .find(['–', '—'])
        .map(|i| {
            let sep_len = title[i..].chars().next().map_or(1, char::len_utf8);
            (i, sep_len)
        })
        .or_else(|| title.find(" - ").map(|i| (i, 3)));

    match split {
        Some((i, sep_len)) => NameRole::Split {
            name: title[..i].trim().to_string(),
            role: title[i + sep_len..].trim().to_string(),
        },
        None => NameRole::NameOnly(title.to_string()),
    }
}

/// At least two words, capitalized, and not a job-board listing.
pub fn looks_like_person(name: &str) -> bool {
    let starts_upper = name.chars().next().is_some_and(char::is_uppercase);
    let lower = name.to_lowercase();
    name.split_whitespace().count() >= 2
        && starts_upper
        && !JOB_BOARD_WORDS.iter().any(|w| lower.contains(w))
}

/// Drop truncation artifacts: very short roles, or roles with no letters
/// after the first character ("—", "…", "3.").
pub fn clean_role(role: &str) -> Option<String> {
    let role = role.trim();
    let too_short = role.chars().count() <= 2;
    let has_letters = role.chars().skip(1).any(char::is_alphabetic);
    if too_short || !has_letters || role == UNSET {
        return None;
    }
    Some(role.to_string())
}

/// Text after the last " at " up to the next period.
pub fn parse_organization(snippet: &str) -> Option<String> {
    let (_, tail) = snippet.rsplit_once(" at ")?;
    let org = tail.split('.').next().unwrap_or_default().trim();
    (!org.is_empty()).then(|| org.to_string())
}

pub fn is_profile_url(url: &str) -> bool {
    url.contains(PROFILE_PATH)
}

/// Build an expert row from a profile hit, or `None` if the title isn't a person.
pub fn expert_from_result(result: &SearchResult) -> Option<ExpertItem> {
    let title = clean_text(&result.title);
    let snippet = clean_text(&result.snippet);

    let parsed = parse_name_role(&title);
    if !looks_like_person(parsed.name()) {
        return None;
    }

    Some(ExpertItem {
        name: parsed.name().to_string(),
        role: parsed
            .role()
            .and_then(clean_role)
            .unwrap_or_else(|| UNSET.to_string()),
        organization: parse_organization(&snippet).unwrap_or_else(|| UNSET.to_string()),
        linkedin: result.link.trim().to_string(),
    })
}

pub struct ExpertHarvester<'a> {
    adapter: &'a SearchAdapter<'a>,
    config: &'a HarvestConfig,
    pacer: Pacer,
}

impl<'a> ExpertHarvester<'a> {
    pub fn new(adapter: &'a SearchAdapter<'a>, config: &'a HarvestConfig) -> Self {
        Self {
            adapter,
            config,
            pacer: Pacer::from_config(config),
        }
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Run the expert queries, keeping profile URLs only, capped at `max_experts`.
    pub async fn harvest(&self, queries: &[String]) -> HarvestBatch<ExpertItem> {
        let queries_before = self.adapter.queries_issued();
        let max = self.config.max_experts;
        let mut rows: Vec<ExpertItem> = Vec::new();
        let mut seen_profiles: HashSet<String> = HashSet::new();

        for query in queries {
            if rows.len() >= max {
                break;
            }

            let results = self
                .adapter
                .search(query, self.config.expert_fetch_count)
                .await;
            for result in &results {
                if rows.len() >= max {
                    break;
                }
                let url = result.link.trim();
                if !is_profile_url(url) || !seen_profiles.insert(url.to_string()) {
                    continue;
                }
                match expert_from_result(result) {
                    Some(item) => rows.push(item),
                    None => debug!(url, title = result.title.as_str(), "Not a person"),
                }
            }

            info!(query = query.as_str(), total = rows.len(), "Expert query harvested");
            self.pacer.pause().await;
        }

        HarvestBatch {
            rows,
            queries: self.adapter.queries_issued() - queries_before,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{result, MockSearcher};

    #[test]
    fn splits_on_en_dash() {
        assert_eq!(
            parse_name_role("Jane Doe – Director of Sustainability"),
            NameRole::Split {
                name: "Jane Doe".to_string(),
                role: "Director of Sustainability".to_string(),
            }
        );
    }

    #[test]
    fn splits_once_and_keeps_hyphens_in_role() {
        let parsed = parse_name_role("Sam Lee - C-Suite Advisor - Climate Fund");
        assert_eq!(parsed.name(), "Sam Lee");
        assert_eq!(parsed.role(), Some("C-Suite Advisor - Climate Fund"));
    }

    #[test]
    fn dash_beats_spaced_hyphen() {
        let parsed = parse_name_role("Ana Ruiz - Lead — Net-Zero Programs");
        assert_eq!(parsed.name(), "Ana Ruiz - Lead");
        assert_eq!(parsed.role(), Some("Net-Zero Programs"));
    }

    #[test]
    fn no_separator_is_name_only() {
        assert_eq!(
            parse_name_role("Jane Doe | LinkedIn"),
            NameRole::NameOnly("Jane Doe".to_string())
        );
    }

    #[test]
    fn person_heuristic() {
        assert!(looks_like_person("Jane Doe"));
        assert!(!looks_like_person("jane doe"));
        assert!(!looks_like_person("Madonna"));
        assert!(!looks_like_person("Climate Jobs Board"));
        assert!(!looks_like_person("Green Careers Hub"));
        assert!(!looks_like_person(""));
    }

    #[test]
    fn role_cleanup() {
        assert_eq!(clean_role("CEO"), Some("CEO".to_string()));
        assert_eq!(clean_role("VP"), None);
        assert_eq!(clean_role("3..."), None);
        assert_eq!(clean_role(""), None);
        assert_eq!(clean_role("—"), None);
    }

    #[test]
    fn organization_after_last_at() {
        assert_eq!(
            parse_organization("Formerly at Acme. Director at Green Futures. Based in Oslo"),
            Some("Green Futures".to_string())
        );
        assert_eq!(parse_organization("Climate advocate."), None);
        assert_eq!(parse_organization("Works at ."), None);
    }

    #[test]
    fn expert_row_uses_unset_placeholders() {
        let item = expert_from_result(&result(
            "Jane Doe",
            "https://www.linkedin.com/in/janedoe",
            "Climate advocate.",
        ))
        .unwrap();
        assert_eq!(item.role, UNSET);
        assert_eq!(item.organization, UNSET);
    }

    async fn run(searcher: &MockSearcher, config: &HarvestConfig, queries: &[&str]) -> HarvestBatch<ExpertItem> {
        let adapter = SearchAdapter::new(searcher);
        let queries: Vec<String> = queries.iter().map(|q| q.to_string()).collect();
        ExpertHarvester::new(&adapter, config)
            .with_pacer(Pacer::none())
            .harvest(&queries)
            .await
    }

    #[tokio::test]
    async fn keeps_profiles_only_and_dedups_by_url() {
        let searcher = MockSearcher::new()
            .on_search(
                "q1",
                vec![
                    result(
                        "Jane Doe – Director of Sustainability",
                        "https://www.linkedin.com/in/janedoe",
                        "Director of Sustainability at Green Futures. 500+ connections",
                    ),
                    result("Jane Doe", "https://janedoe.com", "Personal site"),
                    result("Climate Jobs", "https://www.linkedin.com/in/jobs", "Hiring"),
                ],
            )
            .on_search(
                "q2",
                vec![result(
                    "Jane Doe – Director of Sustainability",
                    "https://www.linkedin.com/in/janedoe",
                    "Same profile",
                )],
            );
        let batch = run(&searcher, &HarvestConfig::default(), &["q1", "q2"]).await;
        assert_eq!(batch.rows.len(), 1);
        let jane = &batch.rows[0];
        assert_eq!(jane.name, "Jane Doe");
        assert_eq!(jane.role, "Director of Sustainability");
        assert_eq!(jane.organization, "Green Futures");
        assert_eq!(batch.queries, 2);
        assert_eq!(searcher.calls()[0].1, 12);
    }

    #[tokio::test]
    async fn caps_total_experts() {
        let hits: Vec<SearchResult> = (0..12)
            .map(|i| {
                result(
                    &format!("Person Number{i} - Climate Lead"),
                    &format!("https://linkedin.com/in/p{i}"),
                    "",
                )
            })
            .collect();
        let searcher = MockSearcher::new().on_search("q1", hits).on_search("q2", vec![]);
        let config = HarvestConfig {
            max_experts: 5,
            ..Default::default()
        };
        let batch = run(&searcher, &config, &["q1", "q2"]).await;
        assert_eq!(batch.rows.len(), 5);
        assert_eq!(searcher.call_count(), 1);
    }
}
