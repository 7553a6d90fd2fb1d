//! Result projection.
//!
//! Maps a raw engine `_search` response into the public [`SearchResponse`].
//! Projection is all-or-nothing: a hit without its `_source` payload, a
//! source missing a public field, or a non-exact total fails the whole call.
//! Hit order is preserved exactly as the engine returned it.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::models::{Highlight, SearchHit, SearchResponse};

#[derive(Debug, Deserialize)]
struct RawResponse {
    hits: RawHits,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    total: RawTotal,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// `hits.total` is an object on current engines and a bare integer when the
/// cluster is configured for legacy totals.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Object { value: u64, relation: String },
    Count(u64),
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
    #[serde(default)]
    highlight: Option<Highlight>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSource {
    id: String,
    title: String,
    tags: Vec<String>,
    category: String,
    published_at: String,
    views: u64,
}

/// Project a raw engine response into the public result shape.
pub fn project(raw: Value) -> Result<SearchResponse> {
    let raw: RawResponse =
        serde_json::from_value(raw).context("Malformed engine response: missing hits")?;

    let total = match raw.hits.total {
        RawTotal::Count(n) => n,
        RawTotal::Object { value, relation } if relation == "eq" => value,
        RawTotal::Object { value, relation } => {
            bail!(
                "Engine returned an inexact total ({} {}); exact totals are required",
                relation,
                value
            )
        }
    };

    let hits = raw
        .hits
        .hits
        .into_iter()
        .enumerate()
        .map(|(i, hit)| project_hit(i, hit))
        .collect::<Result<Vec<_>>>()?;

    Ok(SearchResponse { total, hits })
}

fn project_hit(position: usize, hit: RawHit) -> Result<SearchHit> {
    let label = hit.id.as_deref().unwrap_or("<no id>").to_string();
    let source = hit
        .source
        .ok_or_else(|| anyhow!("Hit {} ({}) missing _source", position, label))?;
    let src: RawSource = serde_json::from_value(source)
        .with_context(|| format!("Hit {} ({}) has an incomplete _source", position, label))?;

    let highlight = hit
        .highlight
        .filter(|h| h.title.is_some() || h.body.is_some());

    Ok(SearchHit {
        id: src.id,
        score: hit.score,
        title: src.title,
        tags: src.tags,
        category: src.category,
        published_at: src.published_at,
        views: src.views,
        highlight,
    })
}
