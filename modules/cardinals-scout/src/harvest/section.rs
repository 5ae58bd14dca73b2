//! Harvest for one topical category (grants, events, reports).

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info};

use cardinals_common::{Category, CuratedItem, FileConfig, HarvestConfig, SearchResult};

use super::{HarvestBatch, Pacer};
use crate::dates::{countdown_from, extract_date, has_stale_date, DateExtraction};
use crate::filter::is_relevant;
use crate::text::{clean_text, organization_domain};
use crate::traits::SearchAdapter;

/// Everything one section pass needs to know about its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPlan {
    pub keywords: Vec<String>,
    pub future_oriented: bool,
    pub max_rows: usize,
    pub max_per_keyword: usize,
    /// Results requested from the provider per keyword, before local caps.
    pub fetch_count: u32,
}

impl SectionPlan {
    pub fn for_category(category: Category, config: &FileConfig) -> Self {
        let keywords = match category {
            Category::Grants => &config.keywords.grants,
            Category::Events => &config.keywords.events,
            Category::Reports => &config.keywords.reports,
            Category::Experts => &config.keywords.experts,
        };
        Self {
            keywords: keywords.clone(),
            future_oriented: category.is_future_oriented(),
            max_rows: config.harvest.max_rows_per_section,
            max_per_keyword: config.harvest.max_results_per_keyword,
            fetch_count: config.harvest.search_fetch_count,
        }
    }
}

pub struct SectionHarvester<'a> {
    adapter: &'a SearchAdapter<'a>,
    config: &'a HarvestConfig,
    pacer: Pacer,
}

impl<'a> SectionHarvester<'a> {
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

    /// Run every keyword in `plan` until the section row cap is reached.
    /// At most one row per organization domain is accepted per pass.
    pub async fn harvest(&self, plan: &SectionPlan, today: NaiveDate) -> HarvestBatch<CuratedItem> {
        let queries_before = self.adapter.queries_issued();
        let mut rows: Vec<CuratedItem> = Vec::new();
        let mut seen_domains: HashSet<String> = HashSet::new();

        for keyword in &plan.keywords {
            if rows.len() >= plan.max_rows {
                break;
            }

            let results = self.adapter.search(keyword, plan.fetch_count).await;
            let mut accepted = 0usize;
            for result in &results {
                if rows.len() >= plan.max_rows || accepted >= plan.max_per_keyword {
                    break;
                }
                if let Some(item) =
                    self.curate(result, plan.future_oriented, today, &mut seen_domains)
                {
                    rows.push(item);
                    accepted += 1;
                }
            }

            info!(keyword = keyword.as_str(), accepted, total = rows.len(), "Keyword harvested");
            self.pacer.pause().await;
        }

        HarvestBatch {
            rows,
            queries: self.adapter.queries_issued() - queries_before,
        }
    }

    /// Turn one search hit into a row, or `None` if any gate rejects it.
    fn curate(
        &self,
        result: &SearchResult,
        future_oriented: bool,
        today: NaiveDate,
        seen_domains: &mut HashSet<String>,
    ) -> Option<CuratedItem> {
        let url = result.link.trim();
        if url.is_empty() {
            return None;
        }

        // Claimed before relevance: an off-topic page still uses up its domain.
        let domain = organization_domain(url);
        if !seen_domains.insert(domain.clone()) {
            debug!(url, domain = domain.as_str(), "Domain already harvested this pass");
            return None;
        }

        let title = clean_text(&result.title);
        let snippet = clean_text(&result.snippet);
        if !is_relevant(&title, &snippet, url) {
            debug!(url, "Not relevant");
            return None;
        }

        let text = format!("{title} {snippet}");
        let extraction = extract_date(&text, future_oriented, self.config.min_year);

        if future_oriented && self.is_expired(&extraction, &text, today) {
            debug!(url, "Dated in the past");
            return None;
        }

        let date_info = extraction.to_snippet();
        let deadline = if future_oriented {
            countdown_from(&date_info, today)
        } else {
            date_info.clone()
        };

        Some(CuratedItem {
            title,
            organization: domain,
            description: snippet,
            date_info,
            deadline,
            url: url.to_string(),
        })
    }

    /// Stale year or a parsed date before today. Rolling items always pass;
    /// undated items pass unless their only dates are stale.
    fn is_expired(&self, extraction: &DateExtraction, text: &str, today: NaiveDate) -> bool {
        match extraction {
            DateExtraction::Found(m) => {
                m.year < self.config.min_year || m.date.is_some_and(|d| d < today)
            }
            DateExtraction::Rolling => false,
            DateExtraction::NotFound => has_stale_date(text, self.config.min_year),
        }
    }
}
