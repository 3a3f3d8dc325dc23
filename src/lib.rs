//! Fanout - a batch HTTP request gateway.
//!
//! Fanout accepts a single JSON envelope naming multiple HTTP sub-requests
//! and executes them on the caller's behalf: merging inherited, default and
//! forwarded headers, ordering execution along declared dependencies, and
//! returning one aggregated response keyed by the original request names.
//! It implements a **hexagonal architecture**: business logic lives in
//! `core`, interfaces (`ports`) separate it from the transport and server
//! `adapters`.
//!
//! # Features
//! - Envelope validation with configurable request-count and URL policy
//!   (`local_only`, `https_always`) checks
//! - Layered header resolution: inherit < defaults < forward < per-request
//! - Dependency-graph scheduling with cycle detection and group barriers
//! - Concurrency-bounded execution with per-request and batch-wide timeouts
//! - Partial-failure tolerance: one sub-request failing never aborts its
//!   siblings, and every envelope key appears in the output exactly once
//! - Structured tracing and multi-format configuration loading
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use fanout::{BatchGateway, HttpClientAdapter, config::GatewayConfig};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = Arc::new(GatewayConfig::default());
//! let client = Arc::new(HttpClientAdapter::new()?);
//! let gateway = Arc::new(BatchGateway::new(config, client));
//! let router = fanout::adapters::build_router(gateway);
//! // Serve `router` with axum, or call `BatchGateway::execute_batch` directly.
//! # Ok(()) }
//! ```
//!
//! # Error Handling
//! Pre-execution defects (envelope shape, unknown dependency, cycle) abort
//! the batch with a [`core::BatchError`] mapped to HTTP 400. Transport
//! failures and timeouts stay confined to their own key's result.
//!
//! # Concurrency
//! The gateway holds no mutable shared state beyond the per-batch
//! concurrency limiter; configuration is immutable after startup, so one
//! instance serves concurrent batches safely.
//!
//! # License
//! Licensed under Apache-2.0.
pub mod config;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

// These modules are implementation details and should not be directly used by users
pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::HttpClientAdapter,
    core::{BatchGateway, BatchResult, RawEnvelope},
    ports::http_client::HttpClient,
    utils::GracefulShutdown,
};
