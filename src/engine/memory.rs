//! In-memory [`SearchEngine`] for tests and local development.
//!
//! Documents live in a `Vec` behind `std::sync::RwLock`, in insertion order
//! (which is the tie-break order for equal sort keys). Compiled queries are
//! evaluated structurally with the same bool semantics as the real engine,
//! and responses are returned in the engine's raw JSON shape so the projector
//! sees exactly what it would see in production. Writes are visible as soon
//! as the call returns.

use std::cmp::Ordering;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{json, Map, Value};

use super::SearchEngine;
use crate::models::Document;
use crate::query::{Clause, CompiledQuery, SortKey, TermValue, HIGHLIGHT_POST, HIGHLIGHT_PRE};

const INDEX_NAME: &str = "memory";

/// In-memory engine.
pub struct InMemoryEngine {
    docs: RwLock<Vec<Document>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory engine lock poisoned")
}

// ============ Text matching ============

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Edit distance allowed by AUTO fuzziness for a term of this length.
fn auto_fuzziness(term: &str) -> usize {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// How a query term is compared against a document token.
#[derive(Debug, Clone)]
struct TermMatcher {
    term: String,
    max_edits: usize,
}

impl TermMatcher {
    fn exact(term: &str) -> Self {
        Self {
            term: term.to_string(),
            max_edits: 0,
        }
    }

    fn fuzzy(term: &str) -> Self {
        Self {
            term: term.to_string(),
            max_edits: auto_fuzziness(term),
        }
    }

    fn matches(&self, token: &str) -> bool {
        if self.max_edits == 0 {
            return self.term == token;
        }
        let len_gap = self.term.chars().count().abs_diff(token.chars().count());
        len_gap <= self.max_edits && levenshtein(&self.term, token) <= self.max_edits
    }
}

fn field_text(doc: &Document, field: &str) -> String {
    match field {
        "title" => doc.title.clone(),
        "body" => doc.body.clone(),
        "tags" => doc.tags.join(" "),
        "category" => doc.category.clone(),
        _ => String::new(),
    }
}

/// Every matcher must hit some token of the field.
fn all_terms_present(tokens: &[String], matchers: &[TermMatcher]) -> bool {
    matchers
        .iter()
        .all(|m| tokens.iter().any(|t| m.matches(t)))
}

/// Sloppy phrase match: each term is placed at a distinct position, and the
/// spread of `position - term index` over all terms must not exceed `slop`.
/// An adjacent transposition costs 2.
fn phrase_present(tokens: &[String], terms: &[String], slop: u32) -> bool {
    if terms.is_empty() {
        return false;
    }
    let positions: Vec<Vec<usize>> = terms
        .iter()
        .map(|term| {
            tokens
                .iter()
                .enumerate()
                .filter(|(_, t)| *t == term)
                .map(|(i, _)| i)
                .collect()
        })
        .collect();
    let mut used = Vec::with_capacity(terms.len());
    place_terms(&positions, &mut used, slop as isize)
}

/// Depth-first placement of term `used.len()`, pruning once the offset spread
/// exceeds `slop`.
fn place_terms(positions: &[Vec<usize>], used: &mut Vec<usize>, slop: isize) -> bool {
    let idx = used.len();
    let Some(candidates) = positions.get(idx) else {
        return true;
    };
    for &pos in candidates {
        if used.contains(&pos) {
            continue;
        }
        used.push(pos);
        let offsets = used.iter().enumerate().map(|(i, &p)| p as isize - i as isize);
        let spread = offsets.clone().max().unwrap_or(0) - offsets.min().unwrap_or(0);
        if spread <= slop && place_terms(positions, used, slop) {
            return true;
        }
        used.pop();
    }
    false
}

/// Score contribution and highlight matchers of one `should` clause.
struct ShouldMatch {
    score: f64,
    matchers: Vec<TermMatcher>,
}

fn eval_should(doc: &Document, clause: &Clause) -> Option<ShouldMatch> {
    let (fields, matchers, phrase) = match clause {
        Clause::Text { query, fields } => {
            let matchers: Vec<TermMatcher> =
                tokenize(query).iter().map(|t| TermMatcher::fuzzy(t)).collect();
            (*fields, matchers, None)
        }
        Clause::Phrase {
            query,
            fields,
            slop,
        } => {
            let terms = tokenize(query);
            let matchers: Vec<TermMatcher> = terms.iter().map(|t| TermMatcher::exact(t)).collect();
            (*fields, matchers, Some((terms, *slop)))
        }
        Clause::Terms { .. } | Clause::Term { .. } => return None,
    };

    if matchers.is_empty() {
        return None;
    }

    // best_fields: the highest boost among matching fields wins.
    let best = fields
        .iter()
        .filter(|(field, _)| {
            let tokens = tokenize(&field_text(doc, field));
            match &phrase {
                Some((terms, slop)) => phrase_present(&tokens, terms, *slop),
                None => all_terms_present(&tokens, &matchers),
            }
        })
        .map(|(_, boost)| f64::from(*boost))
        .fold(None, |acc: Option<f64>, b| Some(acc.map_or(b, |a| a.max(b))))?;

    Some(ShouldMatch {
        score: best,
        matchers,
    })
}

fn eval_filter(doc: &Document, clause: &Clause) -> bool {
    match clause {
        Clause::Terms { field, values } => match *field {
            "tags" => doc.tags.iter().any(|t| values.contains(t)),
            other => values.contains(&field_text(doc, other)),
        },
        Clause::Term { field, value } => match (*field, value) {
            ("isFeatured", TermValue::Bool(b)) => doc.is_featured == *b,
            ("tags", TermValue::Str(s)) => doc.tags.contains(s),
            (other, TermValue::Str(s)) => field_text(doc, other) == *s,
            _ => false,
        },
        Clause::Text { .. } | Clause::Phrase { .. } => false,
    }
}

/// Wrap every token of `text` matched by `matchers` in the highlight markers.
fn highlight(text: &str, matchers: &[TermMatcher]) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let mut hit = false;

    let mut flush = |word: &mut String, out: &mut String| {
        if word.is_empty() {
            return;
        }
        let lower = word.to_lowercase();
        if matchers.iter().any(|m| m.matches(&lower)) {
            out.push_str(HIGHLIGHT_PRE);
            out.push_str(word);
            out.push_str(HIGHLIGHT_POST);
            hit = true;
        } else {
            out.push_str(word);
        }
        word.clear();
    };

    for c in text.chars() {
        if c.is_alphanumeric() {
            word.push(c);
        } else {
            flush(&mut word, &mut out);
            out.push(c);
        }
    }
    flush(&mut word, &mut out);

    hit.then_some(out)
}

fn published_ts(s: &str) -> i64 {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| {
                d.and_hms_opt(0, 0, 0)
                    .map(|dt| dt.and_utc().timestamp_millis())
                    .unwrap_or(i64::MIN)
            })
        })
        .unwrap_or(i64::MIN)
}

struct Scored<'a> {
    doc: &'a Document,
    score: f64,
    matchers: Vec<TermMatcher>,
}

fn evaluate<'a>(doc: &'a Document, query: &CompiledQuery) -> Option<Scored<'a>> {
    if !query.filter.iter().all(|c| eval_filter(doc, c)) {
        return None;
    }

    let matched: Vec<ShouldMatch> = query
        .should
        .iter()
        .filter_map(|c| eval_should(doc, c))
        .collect();

    // With no filter, at least one should clause has to match.
    if query.filter.is_empty() && !query.should.is_empty() && matched.is_empty() {
        return None;
    }

    let score = if query.matches_all() {
        1.0
    } else {
        matched.iter().map(|m| m.score).sum()
    };

    Some(Scored {
        doc,
        score,
        matchers: matched.into_iter().flat_map(|m| m.matchers).collect(),
    })
}

fn source_json(doc: &Document) -> Value {
    json!({
        "id": doc.id,
        "title": doc.title,
        "tags": doc.tags,
        "category": doc.category,
        "publishedAt": doc.published_at,
        "views": doc.views,
    })
}

#[async_trait]
impl SearchEngine for InMemoryEngine {
    fn name(&self) -> &str {
        "memory"
    }

    async fn search(&self, query: &CompiledQuery) -> Result<Value> {
        let docs = self.docs.read().map_err(poisoned)?;

        let mut scored: Vec<Scored> = docs.iter().filter_map(|d| evaluate(d, query)).collect();

        // sort_by is stable, so ties keep insertion order.
        match query.sort {
            SortKey::Score => scored.sort_by(|a, b| {
                b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
            }),
            SortKey::PublishedAt => scored.sort_by(|a, b| {
                published_ts(&b.doc.published_at).cmp(&published_ts(&a.doc.published_at))
            }),
            SortKey::Views => scored.sort_by(|a, b| b.doc.views.cmp(&a.doc.views)),
        }

        let total = scored.len();
        let max_score = match query.sort {
            SortKey::Score => scored.first().map(|s| json!(s.score)).unwrap_or(Value::Null),
            _ => Value::Null,
        };

        let from = usize::try_from(query.from).unwrap_or(usize::MAX);
        let hits: Vec<Value> = scored
            .iter()
            .skip(from)
            .take(query.size as usize)
            .map(|s| {
                let mut hit = Map::new();
                hit.insert("_index".into(), json!(INDEX_NAME));
                hit.insert("_id".into(), json!(s.doc.id));
                match query.sort {
                    SortKey::Score => {
                        hit.insert("_score".into(), json!(s.score));
                    }
                    SortKey::PublishedAt => {
                        hit.insert("_score".into(), Value::Null);
                        hit.insert("sort".into(), json!([published_ts(&s.doc.published_at)]));
                    }
                    SortKey::Views => {
                        hit.insert("_score".into(), Value::Null);
                        hit.insert("sort".into(), json!([s.doc.views]));
                    }
                }
                hit.insert("_source".into(), source_json(s.doc));

                let mut fragments = Map::new();
                if let Some(t) = highlight(&s.doc.title, &s.matchers) {
                    fragments.insert("title".into(), json!([t]));
                }
                if let Some(b) = highlight(&s.doc.body, &s.matchers) {
                    fragments.insert("body".into(), json!([b]));
                }
                if !fragments.is_empty() {
                    hit.insert("highlight".into(), Value::Object(fragments));
                }
                Value::Object(hit)
            })
            .collect();

        Ok(json!({
            "took": 0,
            "timed_out": false,
            "hits": {
                "total": { "value": total, "relation": "eq" },
                "max_score": max_score,
                "hits": hits,
            }
        }))
    }

    async fn index_document(&self, doc: &Document) -> Result<()> {
        let mut docs = self.docs.write().map_err(poisoned)?;
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        let mut docs = self.docs.write().map_err(poisoned)?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            bail!("document {} not found", id);
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.docs.write().map_err(poisoned)?.clear();
        Ok(())
    }

    async fn ensure_index(&self) -> Result<()> {
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
