//! The client runtime: a middleware-chain request executor mirroring the
//! contract the generated TypeScript prelude exposes.
//!
//! A [`Client`] is constructed once and reused; every call builds its own
//! [`ApiRequest`], resolves the target URL from the base path, runs the
//! ordered middleware chain by index-driven recursive dispatch, and hands
//! the raw response to a per-method handler for status dispatch. The
//! network itself is an injected [`Transport`] capability; the runtime
//! holds no mutable shared state and imposes no locking.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// A single outgoing request. Built fresh per call, never shared.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub pathname: String,
    pub method: String,
    /// Ordered query pairs; duplicates are allowed and preserved.
    pub search_params: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            method: method.into(),
            search_params: Vec::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn append_query(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.search_params.push((name.into(), value.into()));
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }
}

/// A raw HTTP response as produced by the transport: status line plus the
/// fully read body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }
}

/// Errors surfaced by the transport capability, propagated unchanged.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The injected network capability. Cancellation and timeouts live here,
/// not in the runtime.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        url: Url,
        request: ApiRequest,
    ) -> BoxFuture<'_, Result<RawResponse, TransportError>>;
}

/// The structured error for any non-success HTTP outcome. Callers
/// distinguish failure causes by status and body, not by subtype.
#[derive(Debug, Error)]
#[error("{} {} failed: {status} {status_text}", .request.method, .request.pathname)]
pub struct RequestError {
    /// The originating request. The transport capability is injected
    /// separately from the request value, so unlike the generated prelude
    /// there is no credential handle to scrub before exposure.
    pub request: ApiRequest,
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl RequestError {
    /// Build the error for a response, carrying the originating request.
    pub fn from_response(request: ApiRequest, response: RawResponse) -> Self {
        Self {
            request,
            status: response.status,
            status_text: response.status_text,
            body: response.body,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Transport(TransportError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("response body was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Cross-cutting transform applied to every decoded JSON payload before it
/// reaches the caller. Defaults to identity.
pub type JsonHook = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// One composable request-processing stage.
///
/// A middleware may transform the request before forwarding it, or
/// short-circuit by producing a response without calling [`Next::run`].
/// Middlewares execute strictly in registration order for each call.
pub trait Middleware: Send + Sync {
    fn handle<'a>(
        &'a self,
        request: ApiRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<RawResponse, ClientError>>;
}

/// The remainder of the middleware chain, ending at the transport.
pub struct Next<'a> {
    client: &'a Client,
    url: &'a Url,
    index: usize,
}

impl<'a> Next<'a> {
    pub fn run(self, request: ApiRequest) -> BoxFuture<'a, Result<RawResponse, ClientError>> {
        self.client.dispatch(self.url, request, self.index)
    }
}

/// The long-lived request executor. Immutable after construction;
/// concurrent calls share nothing mutable.
pub struct Client {
    base_path: String,
    transport: Arc<dyn Transport>,
    middlewares: Vec<Arc<dyn Middleware>>,
    json_hook: JsonHook,
}

impl Client {
    pub fn new(base_path: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_path: base_path.into(),
            transport,
            middlewares: Vec::new(),
            json_hook: Arc::new(|value| value),
        }
    }

    /// Append a middleware stage. Registration order is execution order.
    #[must_use]
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    #[must_use]
    pub fn with_json_hook(mut self, hook: JsonHook) -> Self {
        self.json_hook = hook;
        self
    }

    /// Execute a request through the middleware chain and hand the raw
    /// response to the per-method handler.
    pub async fn fetch<T, F>(&self, request: ApiRequest, handler: F) -> Result<T, ClientError>
    where
        F: FnOnce(RawResponse) -> Result<T, ClientError>,
    {
        let url = self.resolve_url(&request)?;
        let response = self.dispatch(&url, request, 0).await?;
        handler(response)
    }

    /// Join base path and pathname, then append the ordered query pairs.
    fn resolve_url(&self, request: &ApiRequest) -> Result<Url, ClientError> {
        let mut url = Url::parse(&format!("{}{}", self.base_path, request.pathname))?;
        for (name, value) in &request.search_params {
            url.query_pairs_mut().append_pair(name, value);
        }
        Ok(url)
    }

    /// Index-driven recursive dispatch; the terminal stage is the
    /// transport with the resolved URL.
    fn dispatch<'a>(
        &'a self,
        url: &'a Url,
        request: ApiRequest,
        index: usize,
    ) -> BoxFuture<'a, Result<RawResponse, ClientError>> {
        match self.middlewares.get(index) {
            Some(middleware) => middleware.handle(
                request,
                Next {
                    client: self,
                    url,
                    index: index + 1,
                },
            ),
            None => {
                let transport = Arc::clone(&self.transport);
                let url = url.clone();
                Box::pin(async move {
                    transport
                        .send(url, request)
                        .await
                        .map_err(ClientError::Transport)
                })
            }
        }
    }

    /// Apply the installed JSON hook to a decoded payload.
    pub fn process_json(&self, value: Value) -> Value {
        (self.json_hook)(value)
    }

    /// Decode a JSON response body and run it through the hook.
    pub fn json_payload(&self, response: &RawResponse) -> Result<Value, ClientError> {
        let value: Value = serde_json::from_slice(&response.body)?;
        Ok(self.process_json(value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Transport that records the resolved URL and replays a fixed
    /// response.
    struct FakeTransport {
        log: Log,
        status: u16,
        body: Vec<u8>,
        seen_urls: Mutex<Vec<String>>,
        seen_headers: Mutex<Vec<HashMap<String, String>>>,
    }

    impl FakeTransport {
        fn new(log: Log, status: u16, body: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                log,
                status,
                body: body.to_vec(),
                seen_urls: Mutex::new(Vec::new()),
                seen_headers: Mutex::new(Vec::new()),
            })
        }
    }

    impl Transport for FakeTransport {
        fn send(
            &self,
            url: Url,
            request: ApiRequest,
        ) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
            Box::pin(async move {
                self.log.lock().unwrap().push("transport".to_string());
                self.seen_urls.lock().unwrap().push(url.to_string());
                self.seen_headers.lock().unwrap().push(request.headers);
                let status_text = if self.status < 400 { "OK" } else { "Not Found" };
                Ok(RawResponse::new(self.status, status_text, self.body.clone()))
            })
        }
    }

    /// Middleware that logs entry and exit under a label.
    struct Tracer {
        label: &'static str,
        log: Log,
    }

    impl Middleware for Tracer {
        fn handle<'a>(
            &'a self,
            request: ApiRequest,
            next: Next<'a>,
        ) -> BoxFuture<'a, Result<RawResponse, ClientError>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(format!("{} in", self.label));
                let response = next.run(request).await;
                self.log.lock().unwrap().push(format!("{} out", self.label));
                response
            })
        }
    }

    #[tokio::test]
    async fn test_middleware_ordering() {
        let log: Log = Arc::default();
        let transport = FakeTransport::new(Arc::clone(&log), 200, b"{}");
        let client = Client::new("https://api.example.com", transport)
            .with_middleware(Arc::new(Tracer {
                label: "A",
                log: Arc::clone(&log),
            }))
            .with_middleware(Arc::new(Tracer {
                label: "B",
                log: Arc::clone(&log),
            }));

        let request = ApiRequest::new("GET", "/pets");
        client.fetch(request, Ok).await.unwrap();

        let events = log.lock().unwrap().clone();
        assert_eq!(events, vec!["A in", "B in", "transport", "B out", "A out"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_transport() {
        struct Cached;
        impl Middleware for Cached {
            fn handle<'a>(
                &'a self,
                _request: ApiRequest,
                _next: Next<'a>,
            ) -> BoxFuture<'a, Result<RawResponse, ClientError>> {
                Box::pin(async { Ok(RawResponse::new(200, "OK", b"cached".to_vec())) })
            }
        }

        let log: Log = Arc::default();
        let transport = FakeTransport::new(Arc::clone(&log), 200, b"live");
        let client = Client::new("https://api.example.com", transport)
            .with_middleware(Arc::new(Cached));

        let response = client
            .fetch(ApiRequest::new("GET", "/pets"), Ok)
            .await
            .unwrap();
        assert_eq!(response.body, b"cached");
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_middleware_can_transform_the_request() {
        struct Auth;
        impl Middleware for Auth {
            fn handle<'a>(
                &'a self,
                mut request: ApiRequest,
                next: Next<'a>,
            ) -> BoxFuture<'a, Result<RawResponse, ClientError>> {
                Box::pin(async move {
                    request.set_header("Authorization", "Bearer token");
                    next.run(request).await
                })
            }
        }

        let log: Log = Arc::default();
        let transport = FakeTransport::new(Arc::clone(&log), 200, b"{}");
        let client = Client::new("https://api.example.com", Arc::clone(&transport) as Arc<dyn Transport>)
            .with_middleware(Arc::new(Auth));

        client
            .fetch(ApiRequest::new("GET", "/pets"), Ok)
            .await
            .unwrap();
        let headers = transport.seen_headers.lock().unwrap();
        assert_eq!(
            headers[0].get("Authorization").map(String::as_str),
            Some("Bearer token")
        );
    }

    #[tokio::test]
    async fn test_url_joining_and_query_append() {
        let log: Log = Arc::default();
        let transport = FakeTransport::new(Arc::clone(&log), 200, b"{}");
        let client =
            Client::new("https://api.example.com/v3", Arc::clone(&transport) as Arc<dyn Transport>);

        let mut request = ApiRequest::new("GET", "/pets");
        request.append_query("limit", "10");
        request.append_query("status", "available");
        client.fetch(request, Ok).await.unwrap();

        let urls = transport.seen_urls.lock().unwrap();
        assert_eq!(
            urls[0],
            "https://api.example.com/v3/pets?limit=10&status=available"
        );
    }

    #[tokio::test]
    async fn test_json_hook_processes_decoded_payloads() {
        let log: Log = Arc::default();
        let transport = FakeTransport::new(Arc::clone(&log), 200, br#"{"name":"rex"}"#);
        let client = Client::new("https://api.example.com", transport).with_json_hook(Arc::new(
            |mut value| {
                if let Some(object) = value.as_object_mut() {
                    object.insert("hydrated".to_string(), json!(true));
                }
                value
            },
        ));

        let request = ApiRequest::new("GET", "/pets/1");
        let payload = client
            .fetch(request, |response| client.json_payload(&response))
            .await
            .unwrap();
        assert_eq!(payload, json!({ "name": "rex", "hydrated": true }));
    }

    #[tokio::test]
    async fn test_error_status_surfaces_as_request_error() {
        let log: Log = Arc::default();
        let transport = FakeTransport::new(Arc::clone(&log), 404, b"missing");
        let client = Client::new("https://api.example.com", transport);

        let mut request = ApiRequest::new("GET", "/pets/1");
        request.set_header("Accept", "application/json");
        let original = request.clone();
        let result: Result<Value, _> = client
            .fetch(request, |response| {
                if response.status < 400 {
                    return client.json_payload(&response);
                }
                Err(RequestError::from_response(original, response).into())
            })
            .await;

        match result {
            Err(ClientError::Request(err)) => {
                assert_eq!(err.status, 404);
                assert_eq!(err.status_text, "Not Found");
                assert_eq!(err.body, b"missing");
                // The originating request rides along with the error.
                assert_eq!(err.request.method, "GET");
                assert_eq!(err.request.pathname, "/pets/1");
                assert_eq!(
                    err.request.headers.get("Accept").map(String::as_str),
                    Some("application/json")
                );
                assert_eq!(err.to_string(), "GET /pets/1 failed: 404 Not Found");
            }
            other => panic!("expected request error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        struct Down;
        impl Transport for Down {
            fn send(
                &self,
                _url: Url,
                _request: ApiRequest,
            ) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
                Box::pin(async { Err("connection refused".into()) })
            }
        }

        let client = Client::new("https://api.example.com", Arc::new(Down));
        let result: Result<RawResponse, _> =
            client.fetch(ApiRequest::new("GET", "/pets"), Ok).await;
        match result {
            Err(ClientError::Transport(err)) => {
                assert_eq!(err.to_string(), "connection refused");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
