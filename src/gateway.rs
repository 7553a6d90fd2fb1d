//! Document gateway.
//!
//! Validates mutations and forwards them to the engine. Every write and
//! delete waits until the change is visible to searches before returning, so
//! a caller may query immediately afterwards and see its own write. Nothing
//! is retried; concurrent upserts of one id resolve last-write-wins inside
//! the engine.

use std::sync::Arc;
use std::time::Duration;

use crate::engine::{bounded, SearchEngine};
use crate::error::{Operation, ServiceError};
use crate::models::Document;
use crate::validate::{validate_document, validate_id};

#[derive(Clone)]
pub struct DocumentGateway {
    engine: Arc<dyn SearchEngine>,
    timeout: Duration,
}

impl DocumentGateway {
    pub fn new(engine: Arc<dyn SearchEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    /// Replace the document stored under `doc.id` with `doc`.
    pub async fn upsert(&self, doc: &Document) -> Result<(), ServiceError> {
        validate_document(doc).map_err(ServiceError::invalid)?;
        bounded(self.timeout, "index", self.engine.index_document(doc))
            .await
            .map_err(|e| ServiceError::internal(Operation::Upsert, e))?;
        tracing::debug!(id = %doc.id, "document indexed");
        Ok(())
    }

    /// Delete one document. An id the engine does not know is reported as
    /// the same opaque failure as any other engine error.
    pub async fn remove(&self, id: &str) -> Result<(), ServiceError> {
        validate_id(id).map_err(ServiceError::invalid)?;
        bounded(self.timeout, "delete", self.engine.delete_document(id))
            .await
            .map_err(|e| ServiceError::internal(Operation::Remove, e))?;
        tracing::debug!(id = %id, "document removed");
        Ok(())
    }

    /// Delete every document and wait for the index to refresh.
    pub async fn remove_all(&self) -> Result<(), ServiceError> {
        bounded(self.timeout, "delete_all", self.engine.delete_all())
            .await
            .map_err(|e| ServiceError::internal(Operation::RemoveAll, e))?;
        tracing::warn!(engine = self.engine.name(), "all documents removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;

    fn doc(id: &str) -> Document {
        Document {
            id: id.to_string(),
            title: "Gateway test".to_string(),
            body: "Body text".to_string(),
            tags: vec!["t".to_string()],
            category: "misc".to_string(),
            published_at: "2024-05-05".to_string(),
            views: 1,
            is_featured: true,
        }
    }

    fn gateway() -> (Arc<InMemoryEngine>, DocumentGateway) {
        let engine = Arc::new(InMemoryEngine::new());
        let gw = DocumentGateway::new(engine.clone(), Duration::from_secs(1));
        (engine, gw)
    }

    #[tokio::test]
    async fn test_upsert_then_remove() {
        let (engine, gw) = gateway();
        gw.upsert(&doc("d1")).await.unwrap();
        gw.upsert(&doc("d1")).await.unwrap();
        assert_eq!(engine.len(), 1);
        gw.remove("d1").await.unwrap();
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_document_never_reaches_engine() {
        let (engine, gw) = gateway();
        let mut bad = doc("d1");
        bad.published_at = "not a date".to_string();
        let err = gw.upsert(&bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_is_internal() {
        let (_engine, gw) = gateway();
        let err = gw.remove("missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal(Operation::Remove)));
    }

    #[tokio::test]
    async fn test_remove_all() {
        let (engine, gw) = gateway();
        for id in ["a", "b", "c"] {
            gw.upsert(&doc(id)).await.unwrap();
        }
        gw.remove_all().await.unwrap();
        assert!(engine.is_empty());
    }
}
