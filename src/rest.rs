//! REST bridge: HTTP in front of unary handlers.
//!
//! Each registered route is served under `/v{N}/{namespace}/{resource}`:
//!
//! - GET with an empty input record sends `{}` to the handler.
//! - GET with a single integer field reads it from the last path segment,
//!   `/v3/chain/GetBlock/42` becomes `{"index":42}`.
//! - GET with a single byte field reads it as hex from the last path segment.
//!   A field using [`base64_bytes`](crate::codec::base64_bytes) gets a base64
//!   string, `/v3/chain/GetBlockByHash/deadbeef` becomes `{"hash":"3q2+7w=="}`.
//!   Any other byte field (`Vec<u8>`, `serde_bytes::ByteBuf`) gets an array
//!   of numbers, `{"hash":[222,173,190,239]}`.
//! - POST and PUT pass the body through as JSON. The request must carry
//!   `Content-Type: application/json`.
//!
//! Replies are JSON. Streaming is not available over REST.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::any;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde_json::{Map, Value};

use crate::codec::Format;
use crate::dispatch::Response;
use crate::error::ContractError;
use crate::handler::{FieldShape, HandlerEntry, TypeShape};
use crate::tunnel::DEFAULT_STREAM_CAPACITY;

/// Lowest API version a REST route may be published under.
pub const MIN_REST_VERSION: u32 = 3;

/// Default cap on POST/PUT bodies.
pub const DEFAULT_MAX_REST_BODY: usize = 2 * 1024 * 1024;

const JSON_CONTENT_TYPE: &str = "application/json";

/// How a GET request is turned into a JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetKind {
    /// Not a GET route; GET requests are refused.
    Invalid,
    /// Input record has no fields.
    Empty,
    /// Single integer field read from the last path segment.
    Integer { field: String },
    /// Single byte-sequence field read as hex from the last path segment.
    Bytes {
        field: String,
        encoding: ByteEncoding,
    },
}

/// JSON form a byte field is handed over in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteEncoding {
    /// Base64 string, for fields that read text from JSON.
    Base64,
    /// Array of numbers, which every other byte field accepts.
    Array,
}

impl ByteEncoding {
    fn of(field: &FieldShape) -> Self {
        if field.readable == TypeShape::Str {
            ByteEncoding::Base64
        } else {
            ByteEncoding::Array
        }
    }

    fn encode(self, bytes: Vec<u8>) -> Value {
        match self {
            ByteEncoding::Base64 => Value::from(STANDARD.encode(bytes)),
            ByteEncoding::Array => Value::from(bytes),
        }
    }
}

impl GetKind {
    /// Whether the route takes a trailing path parameter.
    pub fn has_param(&self) -> bool {
        matches!(self, GetKind::Integer { .. } | GetKind::Bytes { .. })
    }
}

/// Classify the input record of a GET handler.
///
/// # Errors
///
/// Fails unless the record has no fields, or a single integer or byte field.
pub fn get_kind(input: &TypeShape) -> Result<GetKind, ContractError> {
    let record = input.as_struct().ok_or(ContractError::GetInputNotStruct)?;

    match record.fields.as_slice() {
        [] => Ok(GetKind::Empty),
        [field] if field.shape == TypeShape::Int => Ok(GetKind::Integer {
            field: field.name.clone(),
        }),
        [field] if field.shape.is_byte_sequence() => Ok(GetKind::Bytes {
            field: field.name.clone(),
            encoding: ByteEncoding::of(field),
        }),
        [_] => Err(ContractError::GetFieldUnsupported),
        _ => Err(ContractError::GetFieldCount),
    }
}

/// Where and how a REST handler is published.
///
/// ```
/// use axum::http::Method;
/// use service_dispatch::RestRoute;
///
/// let route = RestRoute::new(3, "chain", Method::GET).resource("blocks");
/// assert_eq!(route.min_version(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct RestRoute {
    min_version: u32,
    namespace: String,
    method: Method,
    resource: Option<String>,
}

impl RestRoute {
    /// `resource` defaults to the route key of the handler's input type.
    pub fn new(min_version: u32, namespace: impl Into<String>, method: Method) -> Self {
        Self {
            min_version,
            namespace: namespace.into(),
            method,
            resource: None,
        }
    }

    /// Publish under `resource` instead of the route key.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn min_version(&self) -> u32 {
        self.min_version
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Checks that do not need the handler.
    pub(crate) fn check(&self) -> Result<(), ContractError> {
        if !matches!(self.method, Method::GET | Method::POST | Method::PUT) {
            return Err(ContractError::InvalidRestMethod);
        }
        if self.min_version < MIN_REST_VERSION {
            return Err(ContractError::UnsupportedApiLevel);
        }
        Ok(())
    }
}

/// A published REST handler.
pub struct RestEndpoint {
    base_path: String,
    kind: GetKind,
    /// Shape of a GET path carrying a parameter.
    pattern: Option<Regex>,
    handler: HandlerEntry,
}

impl RestEndpoint {
    /// Build an endpoint for an already validated unary handler.
    ///
    /// # Errors
    ///
    /// Fails on an unsupported method or version, or a GET input record
    /// that cannot be read from the path.
    pub fn new(route: &RestRoute, handler: HandlerEntry) -> Result<Self, ContractError> {
        route.check()?;
        Self::build(route, handler)
    }

    /// Same as [`new`](Self::new) for a route whose method and version are
    /// already checked.
    pub(crate) fn build(route: &RestRoute, handler: HandlerEntry) -> Result<Self, ContractError> {
        let kind = if route.method == Method::GET {
            get_kind(handler.input())?
        } else {
            GetKind::Invalid
        };

        let resource = route.resource.as_deref().unwrap_or(handler.route());
        let base_path = format!("/v{}/{}/{}", route.min_version, route.namespace, resource);

        let param = match kind {
            GetKind::Integer { .. } => Some(r"\d+"),
            GetKind::Bytes { .. } => Some(r"[0-9a-f]+"),
            GetKind::Empty | GetKind::Invalid => None,
        };
        let pattern = param
            .map(|param| {
                let source = format!(
                    r"^/v\d+/{}/{}/{param}$",
                    regex::escape(&route.namespace),
                    regex::escape(resource)
                );
                Regex::new(&source).map_err(|e| ContractError::InvalidPathPattern(e.to_string()))
            })
            .transpose()?;

        Ok(Self {
            base_path,
            kind,
            pattern,
            handler,
        })
    }

    /// `/v{N}/{namespace}/{resource}`.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Path the endpoint is mounted at in the router.
    pub fn mount_path(&self) -> String {
        if self.kind.has_param() {
            format!("{}/{{*param}}", self.base_path)
        } else {
            self.base_path.clone()
        }
    }

    pub fn kind(&self) -> &GetKind {
        &self.kind
    }

    /// Route key of the handler behind this endpoint.
    pub fn route(&self) -> &str {
        self.handler.route()
    }

    /// Turn an HTTP request into the JSON payload for the handler.
    fn payload(&self, method: &Method, path: &str, headers: &HeaderMap, body: Bytes) -> Result<Bytes, RestError> {
        match *method {
            Method::GET => self.get_payload(path),
            Method::POST | Method::PUT => {
                let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
                if content_type != Some(JSON_CONTENT_TYPE) {
                    return Err(RestError::bad_request(
                        "content type needs to be application/json",
                    ));
                }
                Ok(body)
            }
            _ => Err(RestError::new(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("unsupported method: {method}"),
            )),
        }
    }

    fn get_payload(&self, path: &str) -> Result<Bytes, RestError> {
        let (field, value) = match &self.kind {
            GetKind::Empty => return Ok(Bytes::from_static(b"{}")),
            GetKind::Invalid => return Err(RestError::bad_request("invalid GET")),
            GetKind::Integer { field } => {
                let segment = self.param(path)?;
                let number: u64 = segment.parse().map_err(RestError::bad_request)?;
                (field, Value::from(number))
            }
            GetKind::Bytes { field, encoding } => {
                let segment = self.param(path)?;
                let bytes = hex::decode(segment).map_err(RestError::bad_request)?;
                (field, encoding.encode(bytes))
            }
        };

        let mut object = Map::new();
        object.insert(field.clone(), value);
        serde_json::to_vec(&Value::Object(object))
            .map(Bytes::from)
            .map_err(RestError::internal)
    }

    /// Last path segment, once the whole path has the expected shape.
    fn param<'p>(&self, path: &'p str) -> Result<&'p str, RestError> {
        let matches = self.pattern.as_ref().is_some_and(|p| p.is_match(path));
        if !matches {
            return Err(RestError::new(StatusCode::NOT_FOUND, "invalid path"));
        }
        Ok(path.rsplit('/').next().unwrap_or_default())
    }

    async fn serve(self: Arc<Self>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Result<HttpResponse, RestError> {
        let payload = self.payload(&method, uri.path(), &headers, body)?;

        let response = self
            .handler
            .call(&payload, Format::Json, DEFAULT_STREAM_CAPACITY)
            .map_err(|e| {
                tracing::debug!(route = %self.route(), error = %e, "REST request failed");
                if e.is_encode() {
                    RestError::internal(e)
                } else {
                    RestError::bad_request(e)
                }
            })?;

        match response {
            Response::Reply(reply) => Ok((
                [(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                reply,
            )
                .into_response()),
            Response::Stream(tunnel) => {
                tunnel.cancel();
                Err(RestError::bad_request("streaming requests are not supported"))
            }
        }
    }
}

impl fmt::Debug for RestEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestEndpoint")
            .field("base_path", &self.base_path)
            .field("kind", &self.kind)
            .field("route", &self.route())
            .finish_non_exhaustive()
    }
}

/// All published REST endpoints, by base path.
#[derive(Debug, Default)]
pub struct RestBridge {
    endpoints: BTreeMap<String, Arc<RestEndpoint>>,
}

impl RestBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an endpoint. A later endpoint on the same base path replaces
    /// the earlier one.
    pub fn insert(&mut self, endpoint: RestEndpoint) -> &RestEndpoint {
        let path = endpoint.base_path.clone();
        tracing::debug!(path = %path, route = %endpoint.route(), kind = ?endpoint.kind, "registering REST handler");

        if let Some(old) = self.endpoints.insert(path.clone(), Arc::new(endpoint)) {
            tracing::warn!(path = %path, replaced = %old.route(), "REST path registered twice, last registration wins");
        }
        &self.endpoints[&path]
    }

    pub fn get(&self, base_path: &str) -> Option<&RestEndpoint> {
        self.endpoints.get(base_path).map(Arc::as_ref)
    }

    /// Base paths of all endpoints, sorted.
    pub fn paths(&self) -> Vec<&str> {
        self.endpoints.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Build an axum router serving every endpoint.
    pub fn router(&self, max_body: usize) -> Router {
        let mut router = Router::new();
        for endpoint in self.endpoints.values() {
            let endpoint = Arc::clone(endpoint);
            let path = endpoint.mount_path();
            router = router.route(
                &path,
                any(move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
                    Arc::clone(&endpoint).serve(method, uri, headers, body)
                }),
            );
        }
        router.layer(DefaultBodyLimit::max(max_body))
    }
}

/// HTTP failure with a plain-text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestError {
    pub status: StatusCode,
    pub message: String,
}

impl RestError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl ToString) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.to_string())
    }

    fn internal(message: impl ToString) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> HttpResponse {
        (self.status, self.message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::base64_bytes;
    use crate::handler::{HandlerKind, HandlerStream, Registration};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde::{Deserialize, Serialize};
    use tower::ServiceExt;

    #[derive(Debug)]
    struct Missing;

    impl fmt::Display for Missing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("no such block")
        }
    }

    impl std::error::Error for Missing {}

    #[derive(Serialize, Deserialize)]
    struct Status {}

    #[derive(Serialize, Deserialize)]
    struct GetBlock {
        index: u64,
    }

    #[derive(Serialize, Deserialize)]
    struct GetBlockByHash {
        #[serde(with = "base64_bytes")]
        hash: Vec<u8>,
    }

    #[derive(Serialize, Deserialize)]
    struct Echo {
        text: String,
    }

    #[derive(Serialize, Deserialize)]
    struct PlainHash {
        hash: Vec<u8>,
    }

    #[derive(Serialize, Deserialize)]
    struct BufHash {
        hash: serde_bytes::ByteBuf,
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct ByName {
        name: String,
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Range {
        from: u64,
        to: u64,
    }

    fn entry(registration: Registration) -> HandlerEntry {
        HandlerEntry::validate(registration, HandlerKind::Unary).unwrap()
    }

    fn status() -> HandlerEntry {
        entry(Registration::unary(|_: Status| Ok::<_, Missing>(Echo { text: "up".into() })))
    }

    fn get_block() -> HandlerEntry {
        entry(Registration::unary(|req: GetBlock| {
            if req.index > 100 {
                return Err(Missing);
            }
            Ok(GetBlock { index: req.index })
        }))
    }

    fn get_block_by_hash() -> HandlerEntry {
        entry(Registration::unary(|req: GetBlockByHash| Ok::<_, Missing>(req)))
    }

    fn echo() -> HandlerEntry {
        entry(Registration::unary(|req: Echo| Ok::<_, Missing>(req)))
    }

    /// Replies with the hex of the bytes the handler received.
    fn plain_hash() -> HandlerEntry {
        entry(Registration::unary(|req: PlainHash| {
            Ok::<_, Missing>(Echo {
                text: hex::encode(req.hash),
            })
        }))
    }

    fn buf_hash() -> HandlerEntry {
        entry(Registration::unary(|req: BufHash| {
            Ok::<_, Missing>(Echo {
                text: hex::encode(req.hash.into_vec()),
            })
        }))
    }

    fn router(endpoints: Vec<RestEndpoint>) -> Router {
        let mut bridge = RestBridge::new();
        for endpoint in endpoints {
            bridge.insert(endpoint);
        }
        bridge.router(DEFAULT_MAX_REST_BODY)
    }

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_get_kind() {
        assert_eq!(get_kind(status().input()), Ok(GetKind::Empty));
        assert_eq!(
            get_kind(get_block().input()),
            Ok(GetKind::Integer { field: "index".into() })
        );
        assert_eq!(
            get_kind(get_block_by_hash().input()),
            Ok(GetKind::Bytes {
                field: "hash".into(),
                encoding: ByteEncoding::Base64,
            })
        );
        assert_eq!(
            get_kind(plain_hash().input()),
            Ok(GetKind::Bytes {
                field: "hash".into(),
                encoding: ByteEncoding::Array,
            })
        );
        assert_eq!(
            get_kind(buf_hash().input()),
            Ok(GetKind::Bytes {
                field: "hash".into(),
                encoding: ByteEncoding::Array,
            })
        );

        let by_name = entry(Registration::unary(|_: ByName| Ok::<_, Missing>(Status {})));
        assert_eq!(get_kind(by_name.input()), Err(ContractError::GetFieldUnsupported));

        let range = entry(Registration::unary(|_: Range| Ok::<_, Missing>(Status {})));
        assert_eq!(get_kind(range.input()), Err(ContractError::GetFieldCount));

        assert_eq!(get_kind(&TypeShape::Int), Err(ContractError::GetInputNotStruct));
    }

    #[test]
    fn test_route_checks() {
        let old = RestRoute::new(2, "chain", Method::GET);
        assert_eq!(
            RestEndpoint::new(&old, status()).unwrap_err(),
            ContractError::UnsupportedApiLevel
        );

        let delete = RestRoute::new(3, "chain", Method::DELETE);
        assert_eq!(
            RestEndpoint::new(&delete, status()).unwrap_err(),
            ContractError::InvalidRestMethod
        );

        // POST does not restrict the input record
        let post = RestRoute::new(3, "chain", Method::POST);
        let endpoint = RestEndpoint::new(&post, echo()).unwrap();
        assert_eq!(endpoint.kind(), &GetKind::Invalid);
    }

    #[test]
    fn test_paths() {
        let route = RestRoute::new(3, "chain", Method::GET);
        let endpoint = RestEndpoint::new(&route, get_block()).unwrap();
        assert_eq!(endpoint.base_path(), "/v3/chain/GetBlock");
        assert_eq!(endpoint.mount_path(), "/v3/chain/GetBlock/{*param}");

        let named = RestEndpoint::new(&route.clone().resource("status"), status()).unwrap();
        assert_eq!(named.mount_path(), "/v3/chain/status");
    }

    #[test]
    fn test_integer_payload() {
        let route = RestRoute::new(3, "ns", Method::GET).resource("res");
        let endpoint = RestEndpoint::new(&route, get_block()).unwrap();

        let payload = endpoint.get_payload("/v3/ns/res/42").unwrap();
        assert_eq!(&payload[..], br#"{"index":42}"#);

        let err = endpoint.get_payload("/v3/ns/res/4x2").unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bytes_payload() {
        let route = RestRoute::new(3, "ns", Method::GET).resource("res");
        let endpoint = RestEndpoint::new(&route, get_block_by_hash()).unwrap();

        let payload = endpoint.get_payload("/v3/ns/res/deadbeef").unwrap();
        assert_eq!(&payload[..], br#"{"hash":"3q2+7w=="}"#);

        // matches the pattern but is not valid hex
        let err = endpoint.get_payload("/v3/ns/res/abc").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let plain = RestEndpoint::new(&route, plain_hash()).unwrap();
        let payload = plain.get_payload("/v3/ns/res/deadbeef").unwrap();
        assert_eq!(&payload[..], br#"{"hash":[222,173,190,239]}"#);
    }

    #[tokio::test]
    async fn test_get_integer_over_http() {
        let route = RestRoute::new(3, "chain", Method::GET).resource("block");
        let router = router(vec![RestEndpoint::new(&route, get_block()).unwrap()]);

        let response = router.clone().oneshot(get("/v3/chain/block/7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"index":7}"#);

        let (status, body) = call(router.clone(), get("/v3/chain/block/101")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "no such block");

        let (status, _) = call(router, get("/v3/chain/block/7/extra")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_bytes_over_http() {
        let route = RestRoute::new(3, "chain", Method::GET);
        let router = router(vec![RestEndpoint::new(&route, get_block_by_hash()).unwrap()]);

        let (status, body) = call(router, get("/v3/chain/GetBlockByHash/deadbeef")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"hash":"3q2+7w=="}"#);
    }

    #[tokio::test]
    async fn test_get_vec_u8_over_http() {
        let route = RestRoute::new(3, "ns", Method::GET).resource("res");
        let router = router(vec![RestEndpoint::new(&route, plain_hash()).unwrap()]);

        let (status, body) = call(router, get("/v3/ns/res/deadbeef")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"text":"deadbeef"}"#);
    }

    #[tokio::test]
    async fn test_get_byte_buf_over_http() {
        let route = RestRoute::new(3, "ns", Method::GET).resource("res");
        let router = router(vec![RestEndpoint::new(&route, buf_hash()).unwrap()]);

        let (status, body) = call(router, get("/v3/ns/res/deadbeef")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"text":"deadbeef"}"#);
    }

    #[tokio::test]
    async fn test_get_empty_over_http() {
        let route = RestRoute::new(4, "node", Method::GET).resource("status");
        let router = router(vec![RestEndpoint::new(&route, status()).unwrap()]);

        let (status, body) = call(router, get("/v4/node/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"text":"up"}"#);
    }

    #[tokio::test]
    async fn test_post_requires_json_content_type() {
        let route = RestRoute::new(3, "util", Method::POST).resource("echo");
        let router = router(vec![RestEndpoint::new(&route, echo()).unwrap()]);

        let missing = Request::post("/v3/util/echo")
            .body(Body::from(r#"{"text":"hi"}"#))
            .unwrap();
        let (status, _) = call(router.clone(), missing).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let wrong = Request::post("/v3/util/echo")
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::from(r#"{"text":"hi"}"#))
            .unwrap();
        let (status, _) = call(router.clone(), wrong).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let ok = Request::post("/v3/util/echo")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"text":"hi"}"#))
            .unwrap();
        let (status, body) = call(router, ok).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"text":"hi"}"#);
    }

    #[tokio::test]
    async fn test_bad_json_and_bad_method() {
        let route = RestRoute::new(3, "util", Method::PUT).resource("echo");
        let router = router(vec![RestEndpoint::new(&route, echo()).unwrap()]);

        let garbage = Request::put("/v3/util/echo")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = call(router.clone(), garbage).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(router.clone(), get("/v3/util/echo")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "invalid GET");

        let delete = Request::delete("/v3/util/echo").body(Body::empty()).unwrap();
        let (status, body) = call(router, delete).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, "unsupported method: DELETE");
    }

    #[tokio::test]
    async fn test_streaming_handler_is_refused() {
        #[derive(Serialize, Deserialize)]
        struct Follow {}

        let streaming = HandlerEntry::validate(
            Registration::streaming(|_: Follow| {
                let (_sender, stream) = HandlerStream::<Status>::channel(1);
                Ok::<_, Missing>(stream)
            }),
            HandlerKind::Streaming,
        )
        .unwrap();

        let route = RestRoute::new(3, "feed", Method::GET).resource("follow");
        let router = router(vec![RestEndpoint::new(&route, streaming).unwrap()]);

        let (status, body) = call(router, get("/v3/feed/follow")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "streaming requests are not supported");
    }

    #[test]
    fn test_last_endpoint_wins() {
        let route = RestRoute::new(3, "util", Method::POST).resource("echo");
        let mut bridge = RestBridge::new();
        bridge.insert(RestEndpoint::new(&route, echo()).unwrap());
        bridge.insert(RestEndpoint::new(&route, status()).unwrap());

        assert_eq!(bridge.len(), 1);
        assert_eq!(bridge.get("/v3/util/echo").unwrap().route(), "Status");
        assert_eq!(bridge.paths(), vec!["/v3/util/echo"]);
    }
}
