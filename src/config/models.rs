//! Configuration data structures for the batch gateway.
//!
//! These types map directly to YAML (also JSON / TOML) configuration files.
//! They are intentionally serde-friendly and include defaults so that
//! minimal configs remain concise. The whole structure is immutable after
//! startup; the gateway never mutates it while serving batches.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_batch_path() -> String {
    "/batch".to_string()
}

fn default_max_requests() -> usize {
    20
}

fn default_concurrency() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_local_only() -> bool {
    true
}

/// Top-level gateway configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Path serving the batch endpoint
    pub batch_path: String,
    /// Maximum number of sub-requests accepted in one envelope
    pub max_requests: usize,
    /// Maximum concurrent in-flight sub-requests per batch
    pub concurrency: usize,
    /// Timeout applied to each individual sub-request, in seconds
    pub request_timeout_secs: u64,
    /// Optional batch-wide deadline, in seconds
    pub batch_timeout_secs: Option<u64>,
    /// Headers applied to every sub-request unless overridden
    pub default_headers: HashMap<String, String>,
    /// Parent header names copied to every sub-request unconditionally
    pub forward_headers: Vec<String>,
    /// Whether parent headers are inherited by sub-requests by default
    pub inherit_headers: bool,
    /// Restrict outbound URLs to the local host
    pub local_only: bool,
    /// Require HTTPS for every outbound URL
    pub https_always: bool,
    /// Logging configuration
    pub log: LogConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            batch_path: default_batch_path(),
            max_requests: default_max_requests(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            batch_timeout_secs: None,
            default_headers: HashMap::new(),
            forward_headers: Vec::new(),
            inherit_headers: false,
            local_only: default_local_only(),
            https_always: false,
            log: LogConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    /// Log level filter (e.g. "info", "fanout=debug")
    pub level: String,
    /// Emit JSON-formatted logs instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
