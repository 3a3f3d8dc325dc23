//! Per-request header resolution.
//!
//! Four layers merge into the effective header set for one sub-request,
//! lowest precedence first: inherited parent headers, configured defaults,
//! explicitly forwarded parent headers, then the sub-request's own headers.
//! `http::HeaderMap` gives case-insensitive collision semantics for free.

use std::collections::HashMap;

use http::{HeaderMap, HeaderName, HeaderValue};

/// Header merge policy derived from gateway configuration. Immutable after
/// startup and shared across every batch.
#[derive(Debug, Clone, Default)]
pub struct HeaderPolicy {
    /// Headers applied to every sub-request unless overridden.
    pub default_headers: HashMap<String, String>,
    /// Parent header names copied to sub-requests unconditionally.
    pub forward_headers: Vec<String>,
    /// Whether parent headers are inherited by default.
    pub inherit_headers: bool,
}

/// Resolve the effective headers for one sub-request.
///
/// Pure function: the same inputs always produce the same output and
/// nothing is mutated. Header names that fail to parse are skipped with a
/// warning rather than failing the request.
pub fn resolve_headers(
    policy: &HeaderPolicy,
    parent: &HeaderMap,
    request_headers: &HashMap<String, String>,
) -> HeaderMap {
    let mut resolved = HeaderMap::new();

    // Layer 1: inherited parent headers. `Content-*` names describe the
    // batch envelope's own transport framing and are never inherited.
    if policy.inherit_headers {
        for (name, value) in parent {
            if name.as_str().starts_with("content-") {
                continue;
            }
            resolved.insert(name.clone(), value.clone());
        }
    }

    // Layer 2: configured defaults override inherited values.
    for (name, value) in &policy.default_headers {
        insert_string_header(&mut resolved, name, value);
    }

    // Layer 3: forwarded parent headers, an explicit allow-list that
    // overrides both previous layers (including `Content-*` names when
    // literally listed).
    for name in &policy.forward_headers {
        let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
            tracing::warn!("Skipping unparsable forward header name '{}'", name);
            continue;
        };
        if let Some(value) = parent.get(&header_name) {
            resolved.insert(header_name, value.clone());
        }
    }

    // Layer 4: per-request declarations always win.
    for (name, value) in request_headers {
        insert_string_header(&mut resolved, name, value);
    }

    resolved
}

fn insert_string_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => {
            tracing::warn!("Skipping unparsable header '{}: {}'", name, value);
        }
    }
}
