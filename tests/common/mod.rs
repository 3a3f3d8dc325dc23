//! Shared test fixtures: an in-memory `HttpClient` standing in for the
//! transport, plus gateway construction helpers.
#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use fanout::{
    BatchGateway,
    config::GatewayConfig,
    ports::http_client::{HttpClient, HttpClientError, HttpClientResult},
};
use http::{HeaderMap, HeaderName, HeaderValue, header};
use hyper::{Request, Response, StatusCode};

/// In-memory transport. Behavior is keyed on the request path:
///
/// * `/header/{name}` — 200 with `{"value": <header value>}` when the
///   request carries header `{name}`, 404 otherwise
/// * `/header/bounce` — 200 echoing all request headers as a JSON object
/// * `/fail` — connection error
/// * `/slow/{secs}` — sleeps, then 200
/// * anything else — 200 `{"path": <path>}`
pub struct MockClient {
    issued: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            issued: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Request paths in the order they were issued.
    pub fn issued(&self) -> Vec<String> {
        self.issued.lock().unwrap().clone()
    }

    pub fn issued_count(&self) -> usize {
        self.issued.lock().unwrap().len()
    }

    /// Highest number of concurrently in-flight requests observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn json_response(status: StatusCode, body: serde_json::Value) -> Response<AxumBody> {
        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(AxumBody::from(body.to_string()))
            .unwrap()
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn send_request(&self, req: Request<AxumBody>) -> HttpClientResult<Response<AxumBody>> {
        let path = req.uri().path().to_string();
        self.issued.lock().unwrap().push(path.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = match path.as_str() {
            "/fail" => Err(HttpClientError::ConnectionError(
                "connection refused".to_string(),
            )),
            "/header/bounce" => {
                let echoed: serde_json::Map<String, serde_json::Value> = req
                    .headers()
                    .iter()
                    .filter_map(|(name, value)| {
                        value.to_str().ok().map(|v| {
                            (name.as_str().to_string(), serde_json::Value::from(v))
                        })
                    })
                    .collect();
                Ok(Self::json_response(
                    StatusCode::OK,
                    serde_json::Value::Object(echoed),
                ))
            }
            _ if path.starts_with("/header/") => {
                let name = path.trim_start_matches("/header/");
                match req.headers().get(name).and_then(|v| v.to_str().ok()) {
                    Some(value) => Ok(Self::json_response(
                        StatusCode::OK,
                        serde_json::json!({"value": value}),
                    )),
                    None => Ok(Self::json_response(
                        StatusCode::NOT_FOUND,
                        serde_json::json!({"error": "no such header"}),
                    )),
                }
            }
            _ if path.starts_with("/slow/") => {
                let secs: u64 = path.trim_start_matches("/slow/").parse().unwrap_or(1);
                tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
                Ok(Self::json_response(
                    StatusCode::OK,
                    serde_json::json!({"slept": secs}),
                ))
            }
            _ => Ok(Self::json_response(
                StatusCode::OK,
                serde_json::json!({"path": path}),
            )),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Gateway wired to a fresh mock transport.
pub fn gateway_with(config: GatewayConfig) -> (Arc<BatchGateway>, Arc<MockClient>) {
    let client = Arc::new(MockClient::new());
    let gateway = Arc::new(BatchGateway::new(
        Arc::new(config),
        Arc::clone(&client) as Arc<dyn HttpClient>,
    ));
    (gateway, client)
}

/// Config with URL policy open enough for `http://upstream.test/...` targets.
pub fn open_config() -> GatewayConfig {
    GatewayConfig {
        local_only: false,
        ..Default::default()
    }
}

/// Parent header map from string pairs.
pub fn parent_headers(entries: &[(&str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in entries {
        map.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    map
}
