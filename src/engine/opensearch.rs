//! OpenSearch REST backend.
//!
//! One `reqwest::Client` is built at construction time with the configured
//! timeout, TLS policy and credentials, then reused for every call. Requests
//! are never retried here; a timeout or non-2xx status is returned as an
//! error carrying the status and response body.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | search | `POST /{index}/_search` |
//! | index | `PUT /{index}/_doc/{id}?refresh=wait_for` |
//! | delete | `DELETE /{index}/_doc/{id}?refresh=wait_for` |
//! | delete all | `POST /{index}/_delete_by_query?refresh=true` |
//! | ensure index | `HEAD /{index}`, then `PUT /{index}` with mappings |
//! | ping | `GET /` |

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};

use super::SearchEngine;
use crate::config::EngineConfig;
use crate::models::Document;
use crate::query::CompiledQuery;

/// Client for a single OpenSearch index (or alias).
pub struct OpenSearchEngine {
    client: reqwest::Client,
    base: Url,
    index: String,
    credentials: Option<(String, String)>,
}

impl OpenSearchEngine {
    /// Build the engine client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `engine.url` is not an absolute http(s) URL or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let base = Url::parse(&config.url)
            .with_context(|| format!("Invalid engine.url: {}", config.url))?;
        if base.cannot_be_a_base() {
            bail!("Invalid engine.url: {}", config.url);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        let credentials = match (&config.username, &config.password) {
            (Some(u), Some(p)) => Some((u.clone(), p.clone())),
            _ => None,
        };

        Ok(Self {
            client,
            base,
            index: config.index.clone(),
            credentials,
        })
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid engine.url: {}", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.credentials {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    /// Send a request and decode the JSON body, failing on non-2xx statuses.
    async fn send(&self, builder: RequestBuilder, op: &str) -> Result<Value> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("OpenSearch {} request failed", op))?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenSearch {} error {}: {}", op, status, body_text);
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("OpenSearch {} returned a non-JSON body", op))
    }
}

/// Field mappings applied when the index is created.
fn index_mappings() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "title": { "type": "text" },
                "body": { "type": "text" },
                "tags": { "type": "keyword" },
                "category": { "type": "keyword" },
                "publishedAt": { "type": "date" },
                "views": { "type": "long" },
                "isFeatured": { "type": "boolean" }
            }
        }
    })
}

#[async_trait]
impl SearchEngine for OpenSearchEngine {
    fn name(&self) -> &str {
        "opensearch"
    }

    async fn search(&self, query: &CompiledQuery) -> Result<Value> {
        let url = self.url(&[self.index.as_str(), "_search"])?;
        let body = query.to_body();
        tracing::debug!(index = %self.index, body = %body, "executing search");
        self.send(self.request(Method::POST, url).json(&body), "search")
            .await
    }

    async fn index_document(&self, doc: &Document) -> Result<()> {
        let mut url = self.url(&[self.index.as_str(), "_doc", doc.id.as_str()])?;
        url.query_pairs_mut().append_pair("refresh", "wait_for");
        self.send(self.request(Method::PUT, url).json(doc), "index")
            .await?;
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        let mut url = self.url(&[self.index.as_str(), "_doc", id])?;
        url.query_pairs_mut().append_pair("refresh", "wait_for");
        self.send(self.request(Method::DELETE, url), "delete")
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        let mut url = self.url(&[self.index.as_str(), "_delete_by_query"])?;
        url.query_pairs_mut().append_pair("refresh", "true");
        let body = json!({ "query": { "match_all": {} } });
        let result = self
            .send(self.request(Method::POST, url).json(&body), "delete_by_query")
            .await?;
        let deleted = result.get("deleted").and_then(Value::as_u64).unwrap_or(0);
        tracing::info!(index = %self.index, deleted, "deleted all documents");
        Ok(())
    }

    async fn ensure_index(&self) -> Result<()> {
        let url = self.url(&[self.index.as_str()])?;
        let response = self
            .request(Method::HEAD, url.clone())
            .send()
            .await
            .context("OpenSearch index check failed")?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(index = %self.index, "index already exists");
                return Ok(());
            }
            StatusCode::NOT_FOUND => {}
            status => bail!("OpenSearch index check error {}", status),
        }

        let response = self
            .request(Method::PUT, url)
            .json(&index_mappings())
            .send()
            .await
            .context("OpenSearch create index failed")?;
        let status = response.status();
        if status.is_success() {
            tracing::info!(index = %self.index, "created index");
            return Ok(());
        }

        let body_text = response.text().await.unwrap_or_default();
        if body_text.contains("resource_already_exists_exception") {
            return Ok(());
        }
        bail!("OpenSearch create index error {}: {}", status, body_text)
    }

    async fn ping(&self) -> Result<()> {
        let url = self.url(&[])?;
        let info = self.send(self.request(Method::GET, url), "ping").await?;
        let cluster = info.get("cluster_name").and_then(Value::as_str).unwrap_or("?");
        tracing::debug!(cluster, "engine reachable");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(url: &str) -> OpenSearchEngine {
        let config = EngineConfig {
            url: url.to_string(),
            index: "docs".to_string(),
            ..EngineConfig::default()
        };
        OpenSearchEngine::new(&config).unwrap()
    }

    #[test]
    fn test_url_joins_segments() {
        let e = engine("http://localhost:9200");
        let url = e.url(&["docs", "_search"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/docs/_search");
    }

    #[test]
    fn test_url_keeps_base_path() {
        let e = engine("https://proxy.example.com/opensearch/");
        let url = e.url(&["docs", "_doc", "a1"]).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/opensearch/docs/_doc/a1");
    }

    #[test]
    fn test_url_encodes_ids() {
        let e = engine("http://localhost:9200");
        let url = e.url(&["docs", "_doc", "a/b c?"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/docs/_doc/a%2Fb%20c%3F");
    }

    #[test]
    fn test_rejects_invalid_url() {
        let config = EngineConfig {
            url: "not a url".to_string(),
            ..EngineConfig::default()
        };
        assert!(OpenSearchEngine::new(&config).is_err());
    }

    /// Serve a minimal stand-in for the OpenSearch REST API on a free port.
    async fn stub_cluster() -> String {
        use axum::routing::{delete, get, post};

        let app = axum::Router::new()
            .route(
                "/",
                get(|| async { axum::Json(json!({ "cluster_name": "stub" })) }),
            )
            .route(
                "/docs/_delete_by_query",
                post(|| async { axum::Json(json!({ "deleted": 3 })) }),
            )
            .route(
                "/docs/_doc/{id}",
                delete(|| async {
                    (
                        axum::http::StatusCode::NOT_FOUND,
                        axum::Json(json!({ "result": "not_found" })),
                    )
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_ping_and_delete_all_against_stub() {
        let e = engine(&stub_cluster().await);
        e.ping().await.unwrap();
        e.delete_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let e = engine(&stub_cluster().await);
        let err = e.delete_document("missing").await.unwrap_err().to_string();
        assert!(err.contains("404"), "{}", err);
        assert!(err.contains("not_found"), "{}", err);
    }

    #[test]
    fn test_mappings_cover_filter_fields() {
        let m = index_mappings();
        let props = &m["mappings"]["properties"];
        assert_eq!(props["tags"]["type"], "keyword");
        assert_eq!(props["category"]["type"], "keyword");
        assert_eq!(props["isFeatured"]["type"], "boolean");
        assert_eq!(props["publishedAt"]["type"], "date");
    }
}
