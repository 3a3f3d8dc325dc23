//! Core batch gateway orchestration service.
//!
//! `BatchGateway` ties the pipeline together: envelope validation,
//! dependency graph construction, scheduled execution, and response
//! aggregation. It holds only immutable configuration plus the HTTP client
//! port, so one instance is safely shared across all concurrent batches.
//! This layer performs no I/O of its own beyond the client port, which
//! keeps it fast and easily testable in isolation.

use std::{sync::Arc, time::Duration};

use http::HeaderMap;

use crate::{
    config::GatewayConfig,
    core::{
        envelope::{EnvelopeValidator, RawEnvelope},
        error::BatchError,
        executor::{BatchExecutor, ExecutorSettings},
        graph::DependencyGraph,
        headers::HeaderPolicy,
        result::BatchResult,
    },
    ports::http_client::HttpClient,
};

/// Central orchestrator for batch execution. Construct once per process
/// with [`BatchGateway::new`]; cheap to share behind an `Arc`.
pub struct BatchGateway {
    config: Arc<GatewayConfig>,
    validator: EnvelopeValidator,
    executor: BatchExecutor,
}

impl BatchGateway {
    /// Create a new gateway from immutable configuration and a client port.
    pub fn new(config: Arc<GatewayConfig>, client: Arc<dyn HttpClient>) -> Self {
        let validator = EnvelopeValidator::new(
            config.max_requests,
            config.local_only,
            config.https_always,
        );
        let policy = Arc::new(HeaderPolicy {
            default_headers: config.default_headers.clone(),
            forward_headers: config.forward_headers.clone(),
            inherit_headers: config.inherit_headers,
        });
        let settings = ExecutorSettings {
            concurrency: config.concurrency,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            batch_timeout: config.batch_timeout_secs.map(Duration::from_secs),
        };
        let executor = BatchExecutor::new(client, policy, settings);

        Self {
            config,
            validator,
            executor,
        }
    }

    /// Access the gateway configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run one batch end to end.
    ///
    /// Validation and dependency errors abort before any sub-request is
    /// issued. Otherwise every envelope key comes back exactly once, either
    /// with its response or with an isolated per-key error.
    pub async fn execute_batch(
        &self,
        raw: &RawEnvelope,
        parent_headers: &HeaderMap,
    ) -> Result<BatchResult, BatchError> {
        let batch_id = uuid::Uuid::new_v4();
        tracing::info!(
            batch.id = %batch_id,
            batch.requests = raw.len(),
            "Executing batch"
        );

        let envelope = self.validator.validate(raw)?;
        let graph = DependencyGraph::build(&envelope)?;
        tracing::debug!(
            batch.id = %batch_id,
            batch.groups = graph.depth(),
            "Dependency graph built"
        );

        let results = self
            .executor
            .execute(&envelope, &graph, parent_headers)
            .await;
        let result = BatchResult::assemble(envelope.keys(), results);

        let failures = result.iter().filter(|(_, r)| !r.is_success()).count();
        tracing::info!(
            batch.id = %batch_id,
            batch.requests = result.len(),
            batch.failures = failures,
            "Batch complete"
        );
        Ok(result)
    }
}
