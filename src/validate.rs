//! Field-level validation for inbound requests.
//!
//! Runs at the HTTP/CLI boundary, before anything is compiled or sent to the
//! engine. Deserialization already rejects wrong types, unknown sort modes and
//! negative numbers; the checks here cover ranges and non-empty strings.

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::{Document, SearchParams, MAX_PAGE_SIZE};

/// Check numeric bounds on search parameters.
///
/// `page` must be at least 1 and `pageSize` must lie in `[1, 50]`.
pub fn validate_search_params(params: &SearchParams) -> Result<()> {
    if params.page == Some(0) {
        bail!("page must not be less than 1");
    }
    match params.page_size {
        Some(0) => bail!("pageSize must not be less than 1"),
        Some(n) if n > MAX_PAGE_SIZE => {
            bail!("pageSize must not be greater than {}", MAX_PAGE_SIZE)
        }
        _ => {}
    }
    Ok(())
}

/// Check that a document is complete enough to index.
pub fn validate_document(doc: &Document) -> Result<()> {
    for (name, value) in [
        ("id", &doc.id),
        ("title", &doc.title),
        ("category", &doc.category),
        ("body", &doc.body),
    ] {
        if value.trim().is_empty() {
            bail!("{} should not be empty", name);
        }
    }
    if !is_iso_date(&doc.published_at) {
        bail!("publishedAt must be a valid ISO 8601 date string");
    }
    Ok(())
}

/// Check a document id taken from a request path.
pub fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("id should not be empty");
    }
    Ok(())
}

fn is_iso_date(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document {
            id: "d1".into(),
            title: "Rust in production".into(),
            body: "Ownership keeps services fast.".into(),
            tags: vec!["rust".into()],
            category: "engineering".into(),
            published_at: "2024-03-01T10:00:00Z".into(),
            views: 12,
            is_featured: false,
        }
    }

    #[test]
    fn test_default_params_are_valid() {
        assert!(validate_search_params(&SearchParams::default()).is_ok());
    }

    #[test]
    fn test_page_zero_rejected() {
        let params = SearchParams {
            page: Some(0),
            ..Default::default()
        };
        assert!(validate_search_params(&params).is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        for (size, ok) in [(0, false), (1, true), (50, true), (51, false)] {
            let params = SearchParams {
                page_size: Some(size),
                ..Default::default()
            };
            assert_eq!(
                validate_search_params(&params).is_ok(),
                ok,
                "pageSize {}",
                size
            );
        }
    }

    #[test]
    fn test_large_page_accepted() {
        let params = SearchParams {
            page: Some(10_000),
            ..Default::default()
        };
        assert!(validate_search_params(&params).is_ok());
    }

    #[test]
    fn test_valid_document() {
        assert!(validate_document(&doc()).is_ok());
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut d = doc();
        d.title = "  ".into();
        let err = validate_document(&d).unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_date_formats() {
        let mut d = doc();
        for date in ["2024-03-01", "2024-03-01T10:00:00", "2024-03-01T10:00:00.123+02:00"] {
            d.published_at = date.into();
            assert!(validate_document(&d).is_ok(), "{}", date);
        }
        d.published_at = "yesterday".into();
        assert!(validate_document(&d).is_err());
    }

    #[test]
    fn test_blank_id_rejected() {
        assert!(validate_id("").is_err());
        assert!(validate_id("abc").is_ok());
    }
}
