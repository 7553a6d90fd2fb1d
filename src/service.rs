//! Search service façade.
//!
//! The single entry point used by the HTTP server and the CLI:
//!
//! ```text
//! SearchParams ─▶ validate ─▶ query::compile ─▶ engine.search ─▶ projector::project ─▶ SearchResponse
//! Document     ─▶ DocumentGateway ─▶ engine.index_document / delete_document / delete_all
//! ```
//!
//! Holds no mutable state; the engine client is shared read-only across all
//! concurrent requests for the lifetime of the process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::engine::{bounded, create_engine, SearchEngine};
use crate::error::{Operation, ServiceError};
use crate::gateway::DocumentGateway;
use crate::models::{Document, SearchParams, SearchResponse};
use crate::projector::project;
use crate::query::compile;
use crate::validate::validate_search_params;

#[derive(Clone)]
pub struct SearchService {
    engine: Arc<dyn SearchEngine>,
    gateway: DocumentGateway,
    timeout: Duration,
}

impl SearchService {
    pub fn new(engine: Arc<dyn SearchEngine>, timeout: Duration) -> Self {
        let gateway = DocumentGateway::new(engine.clone(), timeout);
        Self {
            engine,
            gateway,
            timeout,
        }
    }

    /// Build the engine described by `config` and wrap it in a service.
    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = create_engine(&config.engine)?;
        Ok(Self::new(engine, Duration::from_secs(config.engine.timeout_secs)))
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    /// Compile `params`, run the query and project the engine response.
    ///
    /// A malformed engine response fails the whole call; partial results are
    /// never returned.
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResponse, ServiceError> {
        validate_search_params(params).map_err(ServiceError::invalid)?;

        let query = compile(params);
        tracing::debug!(
            should = query.should.len(),
            filter = query.filter.len(),
            from = query.from,
            size = query.size,
            "compiled query"
        );

        let raw = bounded(self.timeout, "search", self.engine.search(&query))
            .await
            .map_err(|e| ServiceError::internal(Operation::Search, e))?;
        let response = project(raw).map_err(|e| ServiceError::internal(Operation::Search, e))?;

        tracing::debug!(total = response.total, returned = response.hits.len(), "search done");
        Ok(response)
    }

    pub async fn upsert(&self, doc: &Document) -> Result<(), ServiceError> {
        self.gateway.upsert(doc).await
    }

    pub async fn remove(&self, id: &str) -> Result<(), ServiceError> {
        self.gateway.remove(id).await
    }

    pub async fn remove_all(&self) -> Result<(), ServiceError> {
        self.gateway.remove_all().await
    }
}
