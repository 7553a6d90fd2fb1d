//! Core data models used throughout the search gateway.
//!
//! These types represent the documents written to the engine, the search
//! parameters accepted from callers, and the normalized results returned to
//! them. All wire names are camelCase to match the public JSON contract.

use serde::{Deserialize, Serialize};

/// Fields returned from the engine for each hit (the public projection set).
pub const SOURCE_FIELDS: [&str; 6] = ["id", "title", "tags", "category", "publishedAt", "views"];

/// Default number of hits per page when `pageSize` is not supplied.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 50;

/// An indexed document. Every upsert replaces the stored version in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Caller-assigned identifier, also used as the engine document id.
    pub id: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub category: String,
    /// ISO-8601 date or date-time, kept verbatim.
    pub published_at: String,
    pub views: u64,
    pub is_featured: bool,
}

/// Result ordering requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Descending engine relevance score.
    #[default]
    #[serde(alias = "_score")]
    Relevance,
    /// Descending `publishedAt`.
    Recent,
    /// Descending `views`.
    Views,
}

/// Structured search request. An absent field never filters or boosts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Free text, matched fuzzily across title, tags and body.
    #[serde(default)]
    pub q: Option<String>,
    /// Exact phrase, matched with a small slop across title and body.
    #[serde(default)]
    pub phrase: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<String>,
    /// `Some(false)` filters to non-featured documents; `None` does not filter.
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub sort: Option<SortMode>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// Highlighted fragments for the fields that matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<String>>,
}

/// A single search result in the public shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    /// Engine relevance score; `None` when the engine did not assign one.
    pub score: Option<f64>,
    pub title: String,
    pub tags: Vec<String>,
    pub category: String,
    pub published_at: String,
    pub views: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
}

/// Search results: exact match count plus the requested page of hits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<SearchHit>,
}
