//! Service processor: registration API and entry points.
//!
//! A [`ServiceProcessor`] is populated once at startup, then shared (usually
//! behind an `Arc`) and only read while serving:
//! 1. Register unary, streaming and REST handlers
//! 2. Hand binary requests to [`ServiceProcessor::dispatch`]
//! 3. Serve HTTP through the router from [`ServiceProcessor::rest_router`]
//!
//! Registration takes `&mut self`, so it cannot race with dispatch.
//!
//! # Example
//!
//! ```ignore
//! use service_dispatch::{RestRoute, ServiceProcessor};
//! use axum::http::Method;
//!
//! let mut processor = ServiceProcessor::new().stream_capacity(32);
//!
//! processor.register_handler(get_block)?;
//! processor.register_streaming_handler(follow_blocks)?;
//! processor.register_rest_handler(get_block, RestRoute::new(3, "chain", Method::GET))?;
//!
//! let reply = processor.dispatch("GetBlock", &payload)?;
//! let app = processor.rest_router();
//! ```

use axum::Router;
use serde::de::DeserializeOwned;

use crate::codec::Format;
use crate::dispatch::{self, Response};
use crate::error::{ContractError, Result};
use crate::handler::{
    HandlerEntry, HandlerKind, HandlerRegistry, HandlerStream, Registration, Reply,
};
use crate::rest::{RestBridge, RestEndpoint, RestRoute, DEFAULT_MAX_REST_BODY};
use crate::tunnel::DEFAULT_STREAM_CAPACITY;

/// Tunables of a [`ServiceProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Capacity of each tunnel's transport-facing channel.
    pub stream_capacity: usize,
    /// Largest POST/PUT body accepted by the REST bridge.
    pub max_rest_body: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            stream_capacity: DEFAULT_STREAM_CAPACITY,
            max_rest_body: DEFAULT_MAX_REST_BODY,
        }
    }
}

/// Handler registry plus the binary and REST entry points.
#[derive(Debug, Default)]
pub struct ServiceProcessor {
    registry: HandlerRegistry,
    rest: RestBridge,
    config: ProcessorConfig,
}

impl ServiceProcessor {
    /// Create a processor with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ProcessorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the tunnel channel capacity (clamped to at least 1).
    ///
    /// Default: 100
    pub fn stream_capacity(mut self, capacity: usize) -> Self {
        self.config.stream_capacity = capacity.max(1);
        self
    }

    /// Set the REST body limit in bytes.
    ///
    /// Default: 2 MiB
    pub fn max_rest_body(mut self, limit: usize) -> Self {
        self.config.max_rest_body = limit;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Register a unary handler under the route key of its input type.
    ///
    /// # Errors
    ///
    /// Returns the first failing contract check; nothing is registered then.
    pub fn register_handler<F, I, O, E>(&mut self, handler: F) -> std::result::Result<(), ContractError>
    where
        F: Fn(I) -> std::result::Result<O, E> + Send + Sync + 'static,
        I: DeserializeOwned + 'static,
        O: Reply,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.registry
            .insert(Registration::unary(handler), HandlerKind::Unary)
            .map(drop)
    }

    /// Register a streaming handler under the route key of its input type.
    ///
    /// # Errors
    ///
    /// Returns the first failing contract check; nothing is registered then.
    pub fn register_streaming_handler<F, I, O, E>(
        &mut self,
        handler: F,
    ) -> std::result::Result<(), ContractError>
    where
        F: Fn(I) -> std::result::Result<HandlerStream<O>, E> + Send + Sync + 'static,
        I: DeserializeOwned + 'static,
        O: Reply,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.registry
            .insert(Registration::streaming(handler), HandlerKind::Streaming)
            .map(drop)
    }

    /// Register several unary handlers in order.
    ///
    /// Stops at the first failure. Handlers registered before it stay.
    ///
    /// # Errors
    ///
    /// Returns the first failing contract check.
    pub fn register_handlers(
        &mut self,
        handlers: impl IntoIterator<Item = Registration>,
    ) -> std::result::Result<(), ContractError> {
        self.register_all(handlers, HandlerKind::Unary)
    }

    /// Register several streaming handlers in order.
    ///
    /// Stops at the first failure. Handlers registered before it stay.
    ///
    /// # Errors
    ///
    /// Returns the first failing contract check.
    pub fn register_streaming_handlers(
        &mut self,
        handlers: impl IntoIterator<Item = Registration>,
    ) -> std::result::Result<(), ContractError> {
        self.register_all(handlers, HandlerKind::Streaming)
    }

    fn register_all(
        &mut self,
        handlers: impl IntoIterator<Item = Registration>,
        kind: HandlerKind,
    ) -> std::result::Result<(), ContractError> {
        for registration in handlers {
            let type_name = registration.type_name();
            self.registry.insert(registration, kind).map_err(|e| {
                tracing::debug!(type_name, error = %e, "batch registration stopped");
                e
            })?;
        }
        Ok(())
    }

    /// Publish a unary handler over HTTP.
    ///
    /// The handler is only reachable through the REST router; register it
    /// with [`register_handler`](Self::register_handler) as well to serve
    /// it on the binary entry point.
    ///
    /// # Errors
    ///
    /// Checked in order: HTTP method, API version, handler contract, and
    /// for GET routes the shape of the input record.
    pub fn register_rest_handler<F, I, O, E>(
        &mut self,
        handler: F,
        route: RestRoute,
    ) -> std::result::Result<(), ContractError>
    where
        F: Fn(I) -> std::result::Result<O, E> + Send + Sync + 'static,
        I: DeserializeOwned + 'static,
        O: Reply,
        E: std::error::Error + Send + Sync + 'static,
    {
        route.check()?;
        let entry = HandlerEntry::validate(Registration::unary(handler), HandlerKind::Unary)?;
        self.rest.insert(RestEndpoint::build(&route, entry)?);
        Ok(())
    }

    /// Binary entry point: route a MessagePack payload.
    ///
    /// Unary handlers run on the caller's task. Streaming handlers need a
    /// tokio runtime, the forwarder is spawned onto it.
    ///
    /// # Errors
    ///
    /// Unknown route, undecodable payload, handler error or reply encoding
    /// failure.
    pub fn dispatch(&self, route: &str, payload: &[u8]) -> Result<Response> {
        dispatch::dispatch(
            &self.registry,
            route,
            payload,
            Format::MsgPack,
            self.config.stream_capacity,
        )
    }

    /// Same as [`dispatch`](Self::dispatch) with an explicit payload format.
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub fn dispatch_with(&self, route: &str, payload: &[u8], format: Format) -> Result<Response> {
        dispatch::dispatch(
            &self.registry,
            route,
            payload,
            format,
            self.config.stream_capacity,
        )
    }

    /// Router serving every REST handler registered so far.
    pub fn rest_router(&self) -> Router {
        self.rest.router(self.config.max_rest_body)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn rest(&self) -> &RestBridge {
        &self.rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MsgPackCodec;
    use crate::error::ServiceError;
    use axum::http::Method;
    use serde::{Deserialize, Serialize};

    #[derive(Debug)]
    struct Never;

    impl std::fmt::Display for Never {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("never")
        }
    }

    impl std::error::Error for Never {}

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Add {
        a: i64,
        b: i64,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Sum {
        total: i64,
    }

    #[derive(Deserialize)]
    struct Negate {
        value: i64,
    }

    #[derive(Deserialize)]
    struct Count {
        up_to: u32,
    }

    fn add(req: Add) -> std::result::Result<Sum, Never> {
        Ok(Sum {
            total: req.a + req.b,
        })
    }

    fn negate(req: Negate) -> std::result::Result<Sum, Never> {
        Ok(Sum { total: -req.value })
    }

    fn count(req: Count) -> std::result::Result<HandlerStream<Sum>, Never> {
        let (sender, stream) = HandlerStream::channel(4);
        tokio::spawn(async move {
            for n in 0..req.up_to {
                if sender.send(Sum { total: n.into() }).await.is_err() {
                    break;
                }
            }
        });
        Ok(stream)
    }

    #[test]
    fn test_default_config() {
        let processor = ServiceProcessor::new();
        assert_eq!(processor.config().stream_capacity, 100);
        assert_eq!(processor.config().max_rest_body, 2 * 1024 * 1024);

        let tuned = ServiceProcessor::new().stream_capacity(0).max_rest_body(512);
        assert_eq!(tuned.config().stream_capacity, 1);
        assert_eq!(tuned.config().max_rest_body, 512);
    }

    #[test]
    fn test_register_and_dispatch() {
        let mut processor = ServiceProcessor::new();
        processor.register_handler(add).unwrap();

        let payload = MsgPackCodec::encode(&Add { a: 2, b: 40 }).unwrap();
        let reply = processor
            .dispatch("Add", &payload)
            .unwrap()
            .into_reply()
            .unwrap();
        assert_eq!(MsgPackCodec::decode::<Sum>(&reply).unwrap(), Sum { total: 42 });
    }

    #[test]
    fn test_batch_stops_at_first_failure() {
        let mut processor = ServiceProcessor::new();

        let err = processor
            .register_handlers([
                Registration::unary(add),
                Registration::streaming(count),
                Registration::unary(negate),
            ])
            .unwrap_err();
        assert_eq!(err, ContractError::ReplyCount);

        // no rollback, nothing after the failure
        assert!(processor.registry().is_registered("Add"));
        assert!(!processor.registry().is_registered("Count"));
        assert!(!processor.registry().is_registered("Negate"));
    }

    #[test]
    fn test_scalar_replies_are_rejected() {
        let mut processor = ServiceProcessor::new();

        let err = processor
            .register_handler(|req: Add| Ok::<_, Never>(req.a + req.b))
            .unwrap_err();
        assert_eq!(err, ContractError::ReplyNotStruct);

        let err = processor
            .register_streaming_handler(|req: Count| {
                let (_sender, stream) = HandlerStream::<u32>::channel(req.up_to as usize);
                Ok::<_, Never>(stream)
            })
            .unwrap_err();
        assert_eq!(err, ContractError::StreamItemNotStruct);

        assert!(processor.registry().is_empty());
    }

    #[test]
    fn test_batch_streaming() {
        let mut processor = ServiceProcessor::new();
        processor
            .register_streaming_handlers([Registration::streaming(count)])
            .unwrap();
        assert_eq!(processor.registry().is_streaming("Count"), Some(true));
    }

    #[test]
    fn test_rest_handler_stays_off_the_binary_path() {
        let mut processor = ServiceProcessor::new();
        processor
            .register_rest_handler(negate, RestRoute::new(3, "math", Method::GET))
            .unwrap();
        processor
            .register_rest_handler(add, RestRoute::new(3, "math", Method::POST))
            .unwrap();
        assert_eq!(processor.rest().paths(), vec!["/v3/math/Add", "/v3/math/Negate"]);
        assert!(processor.registry().is_empty());

        let err = processor.dispatch("Add", &[0x80]).unwrap_err();
        assert!(matches!(err, ServiceError::RouteNotRegistered(_)));
    }

    #[test]
    fn test_rest_check_order() {
        let mut processor = ServiceProcessor::new();

        // method is checked before the version
        let err = processor
            .register_rest_handler(add, RestRoute::new(2, "math", Method::DELETE))
            .unwrap_err();
        assert_eq!(err, ContractError::InvalidRestMethod);

        let err = processor
            .register_rest_handler(add, RestRoute::new(2, "math", Method::GET))
            .unwrap_err();
        assert_eq!(err, ContractError::UnsupportedApiLevel);

        // the handler contract comes before the GET input shape
        let err = processor
            .register_rest_handler(
                |req: Add| Ok::<_, Never>(req.a + req.b),
                RestRoute::new(3, "math", Method::GET),
            )
            .unwrap_err();
        assert_eq!(err, ContractError::ReplyNotStruct);

        // two fields cannot be read from a GET path
        let err = processor
            .register_rest_handler(add, RestRoute::new(3, "math", Method::GET))
            .unwrap_err();
        assert_eq!(err, ContractError::GetFieldCount);

        assert!(processor.rest().is_empty());
    }

    #[tokio::test]
    async fn test_streaming_uses_configured_capacity() {
        let mut processor = ServiceProcessor::new().stream_capacity(1);
        processor.register_streaming_handler(count).unwrap();

        let payload = MsgPackCodec::encode(&Add { a: 0, b: 0 }).unwrap();
        // `Count` decodes from a map with `up_to`; a wrong shape never reaches the handler
        assert!(processor.dispatch("Count", &payload).unwrap_err().is_decode());

        let payload = rmp_serde::to_vec_named(&serde_json::json!({ "up_to": 3 })).unwrap();
        let mut tunnel = processor
            .dispatch("Count", &payload)
            .unwrap()
            .into_stream()
            .unwrap();

        let mut totals = Vec::new();
        while let Some(buf) = tunnel.recv().await {
            totals.push(MsgPackCodec::decode::<Sum>(&buf).unwrap().total);
        }
        assert_eq!(totals, vec![0, 1, 2]);
    }
}
