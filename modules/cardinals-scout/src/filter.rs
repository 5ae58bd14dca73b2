//! Topical relevance filter for search results.
//!
//! A single lowercase substring pass: exclusions win over topical terms.

/// Sources that are never the primary page for a grant, event or report.
const EXCLUDED: &[&str] = &[
    "wikipedia.org",
    "grokipedia.com",
    "(book)",
    "book review",
    "amazon.com",
    "goodreads.com",
    "isbn",
];

/// Stem-level climate vocabulary. `resilien` covers resilience/resilient,
/// `sustain` covers sustainability/sustainable, and so on.
const TOPICAL_TERMS: &[&str] = &[
    "climate",
    "resilien",
    "adapt",
    "sustain",
    "environment",
    "decarbon",
    "net zero",
    "renewable",
    "flood",
    "heat",
    "wildfire",
    "community",
    "justice",
];

/// True when the result mentions climate vocabulary and none of the excluded sources.
pub fn is_relevant(title: &str, snippet: &str, url: &str) -> bool {
    let blob = format!("{title} {snippet} {url}").to_lowercase();

    if EXCLUDED.iter().any(|pattern| blob.contains(pattern)) {
        return false;
    }

    TOPICAL_TERMS.iter().any(|term| blob.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_topical_result() {
        assert!(is_relevant(
            "Community Resilience Grant 2026",
            "Funding for local adaptation projects",
            "https://fund.org/grant"
        ));
    }

    #[test]
    fn matches_stems_case_insensitively() {
        assert!(is_relevant("SUSTAINABLE Cities", "", "https://x.org"));
        assert!(is_relevant("Resilient Schools", "", "https://x.org"));
    }

    #[test]
    fn exclusion_beats_topical_terms() {
        for excluded in EXCLUDED {
            let title = format!("Climate resilience {excluded}");
            assert!(
                !is_relevant(&title, "climate adaptation sustainability", "https://x.org"),
                "{excluded} should exclude"
            );
        }
    }

    #[test]
    fn exclusion_applies_to_url() {
        assert!(!is_relevant(
            "Climate change",
            "Climate adaptation overview",
            "https://en.wikipedia.org/wiki/Climate_change"
        ));
    }

    #[test]
    fn off_topic_result_is_rejected() {
        assert!(!is_relevant("Best pizza in town", "Order online today", "https://pizza.com"));
    }

    #[test]
    fn empty_inputs_are_not_relevant() {
        assert!(!is_relevant("", "", ""));
    }
}
