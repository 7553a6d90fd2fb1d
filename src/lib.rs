//! # doc-search
//!
//! An HTTP gateway for indexing, deleting, and querying documents in an
//! OpenSearch index.
//!
//! The interesting part is the query-compilation and result-projection
//! layer: a handful of loosely specified search parameters (free text, exact
//! phrase, tag/category/featured filters, sort mode, pagination) become a
//! structured boolean query, and the engine's raw response becomes a stable
//! client-facing shape.
//!
//! ## Architecture
//!
//! ```text
//!  HTTP / CLI ──▶ validate ──▶ SearchService ──▶ query::compile ──▶ SearchEngine
//!                                   │                                   │
//!                                   │            projector::project ◀───┘
//!                                   ▼
//!                            DocumentGateway ──▶ index / delete / delete-all
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Documents, search parameters, results |
//! | [`validate`] | Field-level request validation |
//! | [`query`] | Query compiler |
//! | [`projector`] | Result projector |
//! | [`engine`] | Engine trait, OpenSearch and in-memory backends |
//! | [`gateway`] | Document mutations |
//! | [`service`] | Service façade |
//! | [`error`] | Service-boundary error type |
//! | [`server`] | HTTP server |

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod models;
pub mod projector;
pub mod query;
pub mod server;
pub mod service;
pub mod validate;
