use serde::{Deserialize, Serialize};

/// Request body for `POST /search`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub q: String,
    pub num: u32,
}

/// Top-level search response. Only the organic block is used; knowledge
/// graph, ads and "people also ask" are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
}

/// A single organic result. Serper omits fields freely, so all default to empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}
