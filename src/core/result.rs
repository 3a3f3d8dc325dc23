//! Per-request execution results and batch aggregation.
//!
//! Every key of the validated envelope maps to exactly one
//! [`ExecutionResult`], either the sub-request's response or an isolated
//! failure. The aggregated [`BatchResult`] serializes in the envelope's
//! insertion order so output is reproducible in tests and logs.

use std::collections::HashMap;

use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;

/// Failure class for one sub-request. These never abort the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection-level failure (refused, DNS, malformed response).
    Transport,
    /// The per-request timeout elapsed.
    RequestTimeout,
    /// The batch-wide deadline elapsed before this request completed.
    BatchTimeout,
}

impl FailureKind {
    /// Wire-format type tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "TransportError",
            Self::RequestTimeout => "RequestTimeoutError",
            Self::BatchTimeout => "BatchTimeoutError",
        }
    }
}

/// Outcome of one sub-request: exactly one of a response or an error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExecutionResult {
    Success {
        #[serde(rename = "statusCode")]
        status_code: u16,
        headers: HashMap<String, String>,
        body: Value,
    },
    Failure { error: FailureInfo },
}

/// Wire-format error object for a failed sub-request.
#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub message: String,
    pub request: String,
    pub kind: FailureKind,
}

impl Serialize for FailureInfo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("message", &self.message)?;
        map.serialize_entry("request", &self.request)?;
        map.serialize_entry("type", self.kind.as_str())?;
        map.end()
    }
}

impl ExecutionResult {
    pub fn success(status_code: u16, headers: HashMap<String, String>, body: Value) -> Self {
        Self::Success {
            status_code,
            headers,
            body,
        }
    }

    pub fn failure(kind: FailureKind, request: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failure {
            error: FailureInfo {
                message: message.into(),
                request: request.into(),
                kind,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure kind, when this result is an error.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failure { error } => Some(error.kind),
            Self::Success { .. } => None,
        }
    }
}

/// Aggregated batch response: every envelope key exactly once, in the
/// envelope's insertion order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    entries: Vec<(String, ExecutionResult)>,
}

impl BatchResult {
    /// Assemble the batch result from the executor's per-key results,
    /// taking keys in envelope order.
    ///
    /// The executor produces one result per key by construction; a missing
    /// entry would indicate a scheduling bug and is surfaced as a transport
    /// failure rather than dropping the key.
    pub fn assemble<'a>(
        keys: impl Iterator<Item = &'a str>,
        mut results: HashMap<String, ExecutionResult>,
    ) -> Self {
        let entries = keys
            .map(|key| {
                let result = results.remove(key).unwrap_or_else(|| {
                    tracing::error!("No execution result recorded for request '{}'", key);
                    ExecutionResult::failure(
                        FailureKind::Transport,
                        key,
                        "No result recorded for request",
                    )
                });
                (key.to_string(), result)
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ExecutionResult> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, result)| result)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ExecutionResult)> {
        self.entries.iter()
    }

    /// Request keys in output order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl Serialize for BatchResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, result) in &self.entries {
            map.serialize_entry(key, result)?;
        }
        map.end()
    }
}
