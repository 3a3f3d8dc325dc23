//! Batch envelope parsing, normalization and validation.
//!
//! The envelope is the caller-supplied JSON object mapping request keys to
//! sub-request descriptions. Insertion order matters for deterministic
//! output ordering, so the raw envelope is deserialized through a map
//! visitor into a `Vec` instead of a `HashMap`.

use std::collections::HashMap;

use serde::{
    Deserialize, Deserializer,
    de::{self, MapAccess, Visitor},
};
use serde_json::Value;
use url::{Host, Url};

use crate::core::error::BatchError;

/// HTTP methods accepted in a sub-request, lowercase.
pub const RECOGNIZED_METHODS: &[&str] = &[
    "get", "post", "put", "delete", "patch", "head", "options", "trace", "connect",
];

/// One sub-request as supplied by the caller, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubRequestSpec {
    pub url: Option<String>,
    /// Legacy alias for `url`; `url` wins when both are present.
    pub uri: Option<String>,
    pub method: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub body: Option<Value>,
    pub dependency: Option<String>,
}

/// Raw, unvalidated batch envelope preserving caller insertion order.
#[derive(Debug, Clone, Default)]
pub struct RawEnvelope {
    entries: Vec<(String, SubRequestSpec)>,
}

impl RawEnvelope {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, SubRequestSpec)> {
        self.entries.iter()
    }

    /// Build an envelope from parts, mainly for tests and embedding.
    pub fn from_entries(entries: Vec<(String, SubRequestSpec)>) -> Self {
        Self { entries }
    }
}

impl<'de> Deserialize<'de> for RawEnvelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EnvelopeVisitor;

        impl<'de> Visitor<'de> for EnvelopeVisitor {
            type Value = RawEnvelope;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a JSON object mapping request keys to sub-requests")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, SubRequestSpec)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, spec)) = map.next_entry::<String, SubRequestSpec>()? {
                    if entries.iter().any(|(existing, _)| *existing == key) {
                        return Err(de::Error::custom(format!(
                            "duplicate request key '{key}'"
                        )));
                    }
                    entries.push((key, spec));
                }
                Ok(RawEnvelope { entries })
            }
        }

        deserializer.deserialize_map(EnvelopeVisitor)
    }
}

/// A sub-request after validation: absolute URL, recognized lowercase method.
#[derive(Debug, Clone)]
pub struct SubRequest {
    pub url: Url,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    pub dependency: Option<String>,
}

/// Validated batch envelope. Key order matches the caller's insertion order.
#[derive(Debug, Clone, Default)]
pub struct BatchEnvelope {
    entries: Vec<(String, SubRequest)>,
}

impl BatchEnvelope {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, SubRequest)> {
        self.entries.iter()
    }

    /// Request keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&SubRequest> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, request)| request)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Envelope validator enforcing count bounds, URL shape and URL policy.
///
/// Validation never mutates the input; it produces a normalized
/// [`BatchEnvelope`] copy. When several sub-requests are defective the
/// last-encountered error is the one surfaced.
#[derive(Debug, Clone)]
pub struct EnvelopeValidator {
    max_requests: usize,
    local_only: bool,
    https_always: bool,
}

impl EnvelopeValidator {
    pub fn new(max_requests: usize, local_only: bool, https_always: bool) -> Self {
        Self {
            max_requests,
            local_only,
            https_always,
        }
    }

    /// Validate a raw envelope, producing a normalized copy or the
    /// last-encountered validation error.
    pub fn validate(&self, raw: &RawEnvelope) -> Result<BatchEnvelope, BatchError> {
        if raw.is_empty() {
            return Err(BatchError::validation(
                "Batch must contain at least one request",
            ));
        }
        if raw.len() > self.max_requests {
            return Err(BatchError::validation(format!(
                "Batch must not contain more than {} requests",
                self.max_requests
            )));
        }

        let mut last_error = None;
        let mut entries = Vec::with_capacity(raw.len());
        for (key, spec) in raw.iter() {
            match self.normalize(key, spec) {
                Ok(request) => entries.push((key.clone(), request)),
                Err(err) => last_error = Some(err),
            }
        }

        match last_error {
            Some(err) => Err(err),
            None => Ok(BatchEnvelope { entries }),
        }
    }

    fn normalize(&self, key: &str, spec: &SubRequestSpec) -> Result<SubRequest, BatchError> {
        let method = match &spec.method {
            Some(method) => method.to_lowercase(),
            None => "get".to_string(),
        };
        if !RECOGNIZED_METHODS.contains(&method.as_str()) {
            return Err(BatchError::validation_for(
                format!("Invalid method '{method}'"),
                key,
            ));
        }

        // Accept either `url` or the legacy `uri` field, preferring `url`.
        let raw_url = spec
            .url
            .as_deref()
            .or(spec.uri.as_deref())
            .ok_or_else(|| BatchError::validation_for("Missing URL", key))?;

        let url = Url::parse(raw_url)
            .map_err(|_| BatchError::validation_for(format!("Invalid URL '{raw_url}'"), key))?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(BatchError::validation_for(
                format!("Invalid URL '{raw_url}'"),
                key,
            ));
        }

        if self.https_always && url.scheme() != "https" {
            return Err(BatchError::validation_for(
                format!("HTTPS is required for outbound URL '{raw_url}'"),
                key,
            ));
        }

        if self.local_only && !is_local_url(&url) {
            return Err(BatchError::validation_for(
                format!("Non-local outbound URL '{raw_url}' is not permitted"),
                key,
            ));
        }

        Ok(SubRequest {
            url,
            method,
            headers: spec.headers.clone().unwrap_or_default(),
            body: spec.body.clone(),
            dependency: spec.dependency.clone(),
        })
    }
}

/// True when the URL targets the local host (loopback IP or `localhost`).
fn is_local_url(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(url: &str) -> SubRequestSpec {
        SubRequestSpec {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    fn open_validator() -> EnvelopeValidator {
        EnvelopeValidator::new(20, false, false)
    }

    #[test]
    fn test_envelope_preserves_insertion_order() {
        let raw: RawEnvelope = serde_json::from_str(
            r#"{"zeta": {"url": "http://example.com/z"},
                "alpha": {"url": "http://example.com/a"},
                "mid": {"url": "http://example.com/m"}}"#,
        )
        .unwrap();
        let envelope = open_validator().validate(&raw).unwrap();
        let keys: Vec<_> = envelope.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let result: Result<RawEnvelope, _> = serde_json::from_str(
            r#"{"a": {"url": "http://example.com"}, "a": {"url": "http://example.com"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_envelope_rejected() {
        let raw = RawEnvelope::default();
        let err = open_validator().validate(&raw).unwrap_err();
        assert_eq!(err.error_type(), "ValidationError");
        assert!(err.request_key().is_none());
    }

    #[test]
    fn test_count_above_max_rejected() {
        let entries = (0..21)
            .map(|i| (format!("req{i}"), spec("http://example.com")))
            .collect();
        let raw = RawEnvelope::from_entries(entries);
        let err = open_validator().validate(&raw).unwrap_err();
        assert_eq!(err.error_type(), "ValidationError");
    }

    #[test]
    fn test_method_defaults_to_get_and_lowercases() {
        let mut with_method = spec("http://example.com");
        with_method.method = Some("POST".to_string());
        let raw = RawEnvelope::from_entries(vec![
            ("implicit".to_string(), spec("http://example.com")),
            ("explicit".to_string(), with_method),
        ]);
        let envelope = open_validator().validate(&raw).unwrap();
        assert_eq!(envelope.get("implicit").unwrap().method, "get");
        assert_eq!(envelope.get("explicit").unwrap().method, "post");
    }

    #[test]
    fn test_unrecognized_method_rejected() {
        let mut bad = spec("http://example.com");
        bad.method = Some("fetch".to_string());
        let raw = RawEnvelope::from_entries(vec![("bad".to_string(), bad)]);
        let err = open_validator().validate(&raw).unwrap_err();
        assert_eq!(err.request_key(), Some("bad"));
    }

    #[test]
    fn test_legacy_uri_field_accepted_url_preferred() {
        let mut both = SubRequestSpec::default();
        both.url = Some("http://example.com/url".to_string());
        both.uri = Some("http://example.com/uri".to_string());
        let mut only_uri = SubRequestSpec::default();
        only_uri.uri = Some("http://example.com/legacy".to_string());

        let raw = RawEnvelope::from_entries(vec![
            ("both".to_string(), both),
            ("legacy".to_string(), only_uri),
        ]);
        let envelope = open_validator().validate(&raw).unwrap();
        assert_eq!(envelope.get("both").unwrap().url.path(), "/url");
        assert_eq!(envelope.get("legacy").unwrap().url.path(), "/legacy");
    }

    #[test]
    fn test_relative_url_rejected() {
        let raw = RawEnvelope::from_entries(vec![("rel".to_string(), spec("/users/1"))]);
        let err = open_validator().validate(&raw).unwrap_err();
        assert_eq!(err.error_type(), "ValidationError");
        assert_eq!(err.request_key(), Some("rel"));
    }

    #[test]
    fn test_last_error_wins_across_requests() {
        let raw = RawEnvelope::from_entries(vec![
            ("first_bad".to_string(), spec("not a url")),
            ("second_bad".to_string(), spec("also bad")),
        ]);
        let err = open_validator().validate(&raw).unwrap_err();
        assert_eq!(err.request_key(), Some("second_bad"));
    }

    #[test]
    fn test_local_only_policy() {
        let validator = EnvelopeValidator::new(20, true, false);
        let local = RawEnvelope::from_entries(vec![(
            "ok".to_string(),
            spec("http://localhost:3000/users"),
        )]);
        assert!(validator.validate(&local).is_ok());

        let remote =
            RawEnvelope::from_entries(vec![("bad".to_string(), spec("http://example.com"))]);
        let err = validator.validate(&remote).unwrap_err();
        assert_eq!(err.request_key(), Some("bad"));
    }

    #[test]
    fn test_https_always_policy() {
        let validator = EnvelopeValidator::new(20, false, true);
        let raw = RawEnvelope::from_entries(vec![("plain".to_string(), spec("http://example.com"))]);
        let err = validator.validate(&raw).unwrap_err();
        assert_eq!(err.error_type(), "ValidationError");

        let secure =
            RawEnvelope::from_entries(vec![("tls".to_string(), spec("https://example.com"))]);
        assert!(validator.validate(&secure).is_ok());
    }

    #[test]
    fn test_validation_does_not_reorder_surviving_entries() {
        let raw = RawEnvelope::from_entries(vec![
            ("one".to_string(), spec("http://example.com/1")),
            ("two".to_string(), spec("http://example.com/2")),
        ]);
        let envelope = open_validator().validate(&raw).unwrap();
        let keys: Vec<_> = envelope.keys().collect();
        assert_eq!(keys, vec!["one", "two"]);
    }
}
