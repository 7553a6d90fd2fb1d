//! Query compilation.
//!
//! Turns [`SearchParams`] into a [`CompiledQuery`]: a boolean query with a
//! scoring `should` group and a non-scoring `filter` group, plus sort and
//! pagination. Compilation is pure; [`CompiledQuery::to_body`] renders the
//! OpenSearch `_search` request body.
//!
//! # Clause rules
//!
//! | Parameter | Group | Clause |
//! |-----------|-------|--------|
//! | `q` | should | `multi_match` over `title^3`, `body`, `tags^2`, AUTO fuzziness, AND operator |
//! | `phrase` | should | `multi_match` type `phrase` over `title^2`, `body`, slop 2 |
//! | `tags` | filter | `terms` on `tags` (any of) |
//! | `category` | filter | `term` on `category` |
//! | `featured` | filter | `term` on `isFeatured` (explicit `false` included) |
//!
//! With no clauses at all the query matches every document.

use serde_json::{json, Value};

use crate::models::{SearchParams, SortMode, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, SOURCE_FIELDS};

/// Weighted fields for free-text matching.
pub const TEXT_FIELDS: [(&str, u32); 3] = [("title", 3), ("body", 1), ("tags", 2)];

/// Weighted fields for phrase matching.
pub const PHRASE_FIELDS: [(&str, u32); 2] = [("title", 2), ("body", 1)];

/// Positional tolerance for phrase matches.
pub const PHRASE_SLOP: u32 = 2;

/// Marker pair wrapped around highlighted terms.
pub const HIGHLIGHT_PRE: &str = "<mark>";
pub const HIGHLIGHT_POST: &str = "</mark>";

/// Fields the engine is asked to highlight.
pub const HIGHLIGHT_FIELDS: [&str; 2] = ["title", "body"];

/// Exact-match value for a `term` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TermValue {
    Str(String),
    Bool(bool),
}

/// A single condition inside a boolean query group.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Fuzzy multi-field match requiring every term.
    Text {
        query: String,
        fields: &'static [(&'static str, u32)],
    },
    /// Phrase match across fields with positional slop.
    Phrase {
        query: String,
        fields: &'static [(&'static str, u32)],
        slop: u32,
    },
    /// Field value must be one of `values`.
    Terms {
        field: &'static str,
        values: Vec<String>,
    },
    /// Field value must equal `value`.
    Term {
        field: &'static str,
        value: TermValue,
    },
}

impl Clause {
    /// Render the clause as engine query DSL.
    pub fn to_json(&self) -> Value {
        match self {
            Clause::Text { query, fields } => json!({
                "multi_match": {
                    "query": query,
                    "fields": boosted_fields(fields),
                    "fuzziness": "AUTO",
                    "operator": "and",
                }
            }),
            Clause::Phrase {
                query,
                fields,
                slop,
            } => json!({
                "multi_match": {
                    "query": query,
                    "type": "phrase",
                    "fields": boosted_fields(fields),
                    "slop": slop,
                }
            }),
            Clause::Terms { field, values } => json!({ "terms": { *field: values } }),
            Clause::Term { field, value } => {
                let value = match value {
                    TermValue::Str(s) => json!(s),
                    TermValue::Bool(b) => json!(b),
                };
                json!({ "term": { *field: value } })
            }
        }
    }
}

fn boosted_fields(fields: &[(&str, u32)]) -> Vec<String> {
    fields
        .iter()
        .map(|(name, boost)| {
            if *boost == 1 {
                name.to_string()
            } else {
                format!("{}^{}", name, boost)
            }
        })
        .collect()
}

/// Sort key for the compiled query. Exactly one key is ever active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Descending relevance score.
    Score,
    /// Descending `publishedAt`.
    PublishedAt,
    /// Descending `views`.
    Views,
}

impl SortKey {
    pub fn to_json(self) -> Value {
        match self {
            SortKey::Score => json!(["_score"]),
            SortKey::PublishedAt => json!([{ "publishedAt": "desc" }]),
            SortKey::Views => json!([{ "views": "desc" }]),
        }
    }
}

impl From<SortMode> for SortKey {
    fn from(mode: SortMode) -> Self {
        match mode {
            SortMode::Relevance => SortKey::Score,
            SortMode::Recent => SortKey::PublishedAt,
            SortMode::Views => SortKey::Views,
        }
    }
}

/// Engine-ready boolean query with sort and pagination window.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub should: Vec<Clause>,
    pub filter: Vec<Clause>,
    pub sort: SortKey,
    pub from: u64,
    pub size: u32,
}

impl CompiledQuery {
    /// True when no clause constrains the result set.
    pub fn matches_all(&self) -> bool {
        self.should.is_empty() && self.filter.is_empty()
    }

    /// Render the full `_search` request body.
    ///
    /// Always asks for an exact total, restricts `_source` to the public
    /// fields and requests `<mark>`-wrapped highlights for title and body.
    pub fn to_body(&self) -> Value {
        let query = if self.matches_all() {
            json!({ "match_all": {} })
        } else {
            json!({
                "bool": {
                    "should": self.should.iter().map(Clause::to_json).collect::<Vec<_>>(),
                    "filter": self.filter.iter().map(Clause::to_json).collect::<Vec<_>>(),
                }
            })
        };

        let highlight_fields: serde_json::Map<String, Value> = HIGHLIGHT_FIELDS
            .iter()
            .map(|f| (f.to_string(), json!({})))
            .collect();

        json!({
            "query": query,
            "sort": self.sort.to_json(),
            "from": self.from,
            "size": self.size,
            "track_total_hits": true,
            "_source": SOURCE_FIELDS,
            "highlight": {
                "pre_tags": [HIGHLIGHT_PRE],
                "post_tags": [HIGHLIGHT_POST],
                "fields": highlight_fields,
            },
        })
    }
}

/// Compile search parameters into an engine query.
///
/// Empty strings and empty tag lists count as absent. `pageSize` is clamped
/// to `[1, 50]`; `page` defaults to 1 and has no upper bound.
pub fn compile(params: &SearchParams) -> CompiledQuery {
    let mut should = Vec::new();
    let mut filter = Vec::new();

    if let Some(q) = non_empty(&params.q) {
        should.push(Clause::Text {
            query: q.to_string(),
            fields: &TEXT_FIELDS,
        });
    }

    if let Some(phrase) = non_empty(&params.phrase) {
        should.push(Clause::Phrase {
            query: phrase.to_string(),
            fields: &PHRASE_FIELDS,
            slop: PHRASE_SLOP,
        });
    }

    if let Some(tags) = params.tags.as_ref().filter(|t| !t.is_empty()) {
        filter.push(Clause::Terms {
            field: "tags",
            values: tags.clone(),
        });
    }

    if let Some(category) = non_empty(&params.category) {
        filter.push(Clause::Term {
            field: "category",
            value: TermValue::Str(category.to_string()),
        });
    }

    if let Some(featured) = params.featured {
        filter.push(Clause::Term {
            field: "isFeatured",
            value: TermValue::Bool(featured),
        });
    }

    let size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = params.page.unwrap_or(1).max(1);
    let from = u64::from(page - 1) * u64::from(size);

    CompiledQuery {
        should,
        filter,
        sort: params.sort.unwrap_or_default().into(),
        from,
        size,
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
