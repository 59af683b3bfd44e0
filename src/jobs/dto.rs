use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub company_id: i64,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCompany {
    pub name: String,
}

/// How several conditions of a search combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Title OR description matches.
    #[default]
    Any,
    /// Title AND description match.
    All,
}

/// Query string of `GET /jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(default)]
    pub mode: SearchMode,
}

/// Acknowledgement of an application. Nothing is stored.
#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    pub job_id: i64,
    pub title: String,
    pub message: String,
}
