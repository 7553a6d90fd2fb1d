//! Search engine abstraction.
//!
//! The [`SearchEngine`] trait is the whole contract this crate consumes from
//! the inverted-index backend: execute a compiled query and return the raw
//! response, write a document, and delete one or all documents. Writes and
//! deletes must not return before the change is visible to searches.
//!
//! Implementations:
//! - **[`OpenSearchEngine`]** talks to an OpenSearch cluster over its REST API.
//! - **[`InMemoryEngine`]** evaluates compiled queries over a `HashMap`; used
//!   for tests and local development.
//!
//! Implementations must be `Send + Sync`; one instance is built at startup and
//! shared by every request handler.

pub mod memory;
pub mod opensearch;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::models::Document;
use crate::query::CompiledQuery;

pub use memory::InMemoryEngine;
pub use opensearch::OpenSearchEngine;

/// Abstract search backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`search`](SearchEngine::search) | Execute a compiled query, return the raw response |
/// | [`index_document`](SearchEngine::index_document) | Full replace by id, visible on return |
/// | [`delete_document`](SearchEngine::delete_document) | Delete by id, visible on return |
/// | [`delete_all`](SearchEngine::delete_all) | Delete every document and refresh |
/// | [`ensure_index`](SearchEngine::ensure_index) | Create the index with mappings if missing |
/// | [`ping`](SearchEngine::ping) | Check that the backend answers |
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Short backend label for logs.
    fn name(&self) -> &str;

    /// Execute `query` and return the raw `_search` response JSON.
    async fn search(&self, query: &CompiledQuery) -> Result<Value>;

    /// Store `doc` under `doc.id`, replacing any previous version.
    async fn index_document(&self, doc: &Document) -> Result<()>;

    /// Delete the document with `id`. A missing id is an error.
    async fn delete_document(&self, id: &str) -> Result<()>;

    /// Delete every document in the index.
    async fn delete_all(&self) -> Result<()>;

    /// Create the index and its field mappings if they do not exist yet.
    async fn ensure_index(&self) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

/// Build the engine selected by `engine.backend`.
pub fn create_engine(config: &EngineConfig) -> Result<Arc<dyn SearchEngine>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryEngine::new())),
        "opensearch" => Ok(Arc::new(OpenSearchEngine::new(config)?)),
        other => anyhow::bail!("Unknown engine backend: {}", other),
    }
}

/// Run one engine call under a hard deadline. Nothing is retried.
pub async fn bounded<T, F>(limit: Duration, op: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => anyhow::bail!("engine {} timed out after {:?}", op, limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let value = bounded(Duration::from_secs(1), "ping", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let err = bounded(Duration::from_millis(10), "search", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_create_memory_engine() {
        let config = EngineConfig {
            backend: "memory".to_string(),
            ..EngineConfig::default()
        };
        assert_eq!(create_engine(&config).unwrap().name(), "memory");
    }
}
