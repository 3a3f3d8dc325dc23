//! Dependency-ordered, concurrency-bounded batch execution.
//!
//! The executor walks the dependency groups in ascending depth order with a
//! barrier between groups: every request in group N reaches a terminal
//! state before anything in group N+1 is issued. Within a group, requests
//! run concurrently behind a counting semaphore. Failures never cross key
//! boundaries; a request whose dependency failed still executes, since a
//! dependency is an ordering hint, not data-passing.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::body::Body as AxumBody;
use futures_util::{StreamExt, stream::FuturesUnordered};
use http::{HeaderMap, HeaderValue, Method, header};
use http_body_util::BodyExt;
use hyper::Request;
use serde_json::Value;
use tokio::{
    sync::Semaphore,
    time::{Instant, timeout, timeout_at},
};

use crate::{
    core::{
        envelope::{BatchEnvelope, SubRequest},
        graph::DependencyGraph,
        headers::{HeaderPolicy, resolve_headers},
        result::{ExecutionResult, FailureKind},
    },
    ports::http_client::HttpClient,
};

/// Executor tuning knobs, fixed at gateway construction.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Maximum in-flight sub-requests within one batch.
    pub concurrency: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Optional batch-wide deadline.
    pub batch_timeout: Option<Duration>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            request_timeout: Duration::from_secs(30),
            batch_timeout: None,
        }
    }
}

/// Executes a validated batch against its dependency graph.
pub struct BatchExecutor {
    client: Arc<dyn HttpClient>,
    policy: Arc<HeaderPolicy>,
    settings: ExecutorSettings,
}

impl BatchExecutor {
    pub fn new(
        client: Arc<dyn HttpClient>,
        policy: Arc<HeaderPolicy>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            client,
            policy,
            settings,
        }
    }

    /// Execute every sub-request exactly once and return one result per key.
    ///
    /// `parent` carries the inbound batch call's own headers, consulted by
    /// the header resolver for inheritance and forwarding.
    pub async fn execute(
        &self,
        envelope: &BatchEnvelope,
        graph: &DependencyGraph,
        parent: &HeaderMap,
    ) -> HashMap<String, ExecutionResult> {
        let deadline = self.settings.batch_timeout.map(|t| Instant::now() + t);
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut results: HashMap<String, ExecutionResult> =
            HashMap::with_capacity(envelope.len());
        let mut expired = false;

        for group in graph.groups() {
            if !expired
                && let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                expired = true;
            }
            if expired {
                // Deadline already elapsed: abandon without issuing.
                record_batch_timeouts(group.iter().map(String::as_str), &mut results);
                continue;
            }

            let mut pending: Vec<&str> = group.iter().map(String::as_str).collect();
            let mut in_flight = FuturesUnordered::new();

            for key in group {
                let Some(request) = envelope.get(key) else {
                    // Graph keys come from the envelope; treat a mismatch as
                    // a per-key failure instead of panicking.
                    tracing::error!("Request '{}' missing from envelope during execution", key);
                    results.insert(
                        key.clone(),
                        ExecutionResult::failure(
                            FailureKind::Transport,
                            key,
                            "Request missing from envelope",
                        ),
                    );
                    pending.retain(|k| *k != key.as_str());
                    continue;
                };

                let headers = resolve_headers(&self.policy, parent, &request.headers);
                let client = Arc::clone(&self.client);
                let semaphore = Arc::clone(&semaphore);
                let request = request.clone();
                let request_timeout = self.settings.request_timeout;
                let key = key.clone();

                in_flight.push(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return (
                                key.clone(),
                                ExecutionResult::failure(
                                    FailureKind::Transport,
                                    &key,
                                    "Concurrency limiter closed",
                                ),
                            );
                        }
                    };
                    let outcome =
                        issue_sub_request(client, &key, &request, headers, request_timeout).await;
                    (key, outcome)
                });
            }

            // Group barrier: drain every in-flight request, or abandon the
            // stragglers once the batch deadline elapses.
            while !in_flight.is_empty() {
                let next = match deadline {
                    Some(deadline) => match timeout_at(deadline, in_flight.next()).await {
                        Ok(item) => item,
                        Err(_) => {
                            expired = true;
                            break;
                        }
                    },
                    None => in_flight.next().await,
                };
                match next {
                    Some((key, outcome)) => {
                        pending.retain(|k| *k != key.as_str());
                        results.insert(key, outcome);
                    }
                    None => break,
                }
            }

            if expired {
                // Dropping the stream cancels whatever is still in flight.
                drop(in_flight);
                record_batch_timeouts(pending.into_iter(), &mut results);
            }
        }

        results
    }
}

fn record_batch_timeouts<'a>(
    keys: impl Iterator<Item = &'a str>,
    results: &mut HashMap<String, ExecutionResult>,
) {
    for key in keys {
        tracing::warn!("Abandoning request '{}' after batch deadline", key);
        results.insert(
            key.to_string(),
            ExecutionResult::failure(
                FailureKind::BatchTimeout,
                key,
                "Batch deadline elapsed before request completed",
            ),
        );
    }
}

/// Issue one sub-request and fold any failure into its `ExecutionResult`.
async fn issue_sub_request(
    client: Arc<dyn HttpClient>,
    key: &str,
    request: &SubRequest,
    headers: HeaderMap,
    request_timeout: Duration,
) -> ExecutionResult {
    let req = match build_outgoing_request(request, headers) {
        Ok(req) => req,
        Err(message) => {
            return ExecutionResult::failure(FailureKind::Transport, key, message);
        }
    };

    tracing::debug!(
        request.key = %key,
        http.method = %request.method,
        http.url = %request.url,
        "Issuing sub-request"
    );

    match timeout(request_timeout, client.send_request(req)).await {
        Err(_) => ExecutionResult::failure(
            FailureKind::RequestTimeout,
            key,
            format!(
                "Request timed out after {} seconds",
                request_timeout.as_secs()
            ),
        ),
        Ok(Err(err)) => {
            tracing::warn!(request.key = %key, "Sub-request failed: {}", err);
            ExecutionResult::failure(FailureKind::Transport, key, err.to_string())
        }
        Ok(Ok(response)) => read_response(key, response).await,
    }
}

fn build_outgoing_request(
    request: &SubRequest,
    headers: HeaderMap,
) -> Result<Request<AxumBody>, String> {
    let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
        .map_err(|e| format!("Invalid method '{}': {e}", request.method))?;

    let body = match &request.body {
        Some(value) => {
            let bytes = serde_json::to_vec(value)
                .map_err(|e| format!("Failed to serialize request body: {e}"))?;
            AxumBody::from(bytes)
        }
        None => AxumBody::empty(),
    };

    let mut req = Request::builder()
        .method(method)
        .uri(request.url.as_str())
        .body(body)
        .map_err(|e| format!("Failed to build request: {e}"))?;

    *req.headers_mut() = headers;
    if request.body.is_some() && !req.headers().contains_key(header::CONTENT_TYPE) {
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }

    Ok(req)
}

/// Convert a transport response into a success result, reading the body
/// fully. JSON bodies are parsed; anything else is kept as a string.
async fn read_response(key: &str, response: hyper::Response<AxumBody>) -> ExecutionResult {
    let (parts, body) = response.into_parts();

    let status_code = parts.status.as_u16();
    let headers: HashMap<String, String> = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("json"));

    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return ExecutionResult::failure(
                FailureKind::Transport,
                key,
                format!("Failed to read response body: {err}"),
            );
        }
    };

    let body = if bytes.is_empty() {
        Value::Null
    } else if is_json {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    } else {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    };

    tracing::debug!(request.key = %key, http.status_code = status_code, "Sub-request completed");
    ExecutionResult::success(status_code, headers, body)
}
