//! Handler registry keyed by request type.
//!
//! Entries are stored under the [`TypeId`] of the handler's input record, with
//! a second index from route key (the unqualified type name) to that id. The
//! route key is the external address; the type id keeps two records that
//! happen to share a name from silently aliasing inside the map.
//!
//! # Example
//!
//! ```ignore
//! use service_dispatch::handler::{HandlerKind, HandlerRegistry, Registration};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.insert(Registration::unary(|req: GetBlock| lookup(req.index)), HandlerKind::Unary)?;
//!
//! assert!(registry.is_registered("GetBlock"));
//! ```

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::reply::Reply;
use super::shape::{probe, TypeShape};
use super::signature::{validate_streaming, validate_unary, Contract, Signature};
use super::stream::HandlerStream;
use crate::codec::Format;
use crate::dispatch::Response;
use crate::error::{ContractError, Result, ServiceError};
use crate::tunnel::spawn_forwarder;

/// Unary or streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// One request, one reply.
    Unary,
    /// One request, a live sequence of replies.
    Streaming,
}

/// Per-call settings handed to an erased handler.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallOptions<'a> {
    pub route: &'a str,
    pub format: Format,
    pub stream_capacity: usize,
}

/// Object-safe handler: decode, call, encode.
pub(crate) trait ErasedHandler: Send + Sync + 'static {
    fn call(&self, payload: &[u8], opts: CallOptions<'_>) -> Result<Response>;
}

/// Wraps `Fn(I) -> Result<O, E>`.
struct UnaryHandler<F, I, O, E> {
    handler: F,
    _phantom: PhantomData<fn(I) -> (O, E)>,
}

impl<F, I, O, E> ErasedHandler for UnaryHandler<F, I, O, E>
where
    F: Fn(I) -> std::result::Result<O, E> + Send + Sync + 'static,
    I: DeserializeOwned + 'static,
    O: Reply,
    E: std::error::Error + Send + Sync + 'static,
{
    fn call(&self, payload: &[u8], opts: CallOptions<'_>) -> Result<Response> {
        // fresh, owned request; nothing borrowed from the payload buffer
        let request: I = opts.format.decode(payload)?;
        let reply = (self.handler)(request).map_err(|e| ServiceError::Handler(Box::new(e)))?;
        Ok(Response::Reply(reply.encode(opts.format)?.into()))
    }
}

/// Wraps `Fn(I) -> Result<HandlerStream<O>, E>`.
struct StreamingHandler<F, I, O, E> {
    handler: F,
    _phantom: PhantomData<fn(I) -> (O, E)>,
}

impl<F, I, O, E> ErasedHandler for StreamingHandler<F, I, O, E>
where
    F: Fn(I) -> std::result::Result<HandlerStream<O>, E> + Send + Sync + 'static,
    I: DeserializeOwned + 'static,
    O: Reply,
    E: std::error::Error + Send + Sync + 'static,
{
    fn call(&self, payload: &[u8], opts: CallOptions<'_>) -> Result<Response> {
        let request: I = opts.format.decode(payload)?;
        let stream = (self.handler)(request).map_err(|e| ServiceError::Handler(Box::new(e)))?;
        Ok(Response::Stream(spawn_forwarder(
            stream,
            opts.format,
            opts.stream_capacity,
            opts.route.to_string(),
        )))
    }
}

/// A typed handler waiting to be validated and inserted.
///
/// Building one never fails; the contract is checked by
/// [`HandlerRegistry::insert`].
pub struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    probe: fn() -> TypeShape,
    outputs: Vec<TypeShape>,
    handler: Arc<dyn ErasedHandler>,
}

impl Registration {
    /// Prepare a unary handler `Fn(I) -> Result<O, E>`.
    pub fn unary<F, I, O, E>(handler: F) -> Self
    where
        F: Fn(I) -> std::result::Result<O, E> + Send + Sync + 'static,
        I: DeserializeOwned + 'static,
        O: Reply,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<I>(),
            type_name: type_name::<I>(),
            probe: probe::<I>,
            outputs: vec![O::shape(), TypeShape::Error],
            handler: Arc::new(UnaryHandler {
                handler,
                _phantom: PhantomData,
            }),
        }
    }

    /// Prepare a streaming handler `Fn(I) -> Result<HandlerStream<O>, E>`.
    pub fn streaming<F, I, O, E>(handler: F) -> Self
    where
        F: Fn(I) -> std::result::Result<HandlerStream<O>, E> + Send + Sync + 'static,
        I: DeserializeOwned + 'static,
        O: Reply,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<I>(),
            type_name: type_name::<I>(),
            probe: probe::<I>,
            outputs: vec![
                TypeShape::chan(O::shape()),
                TypeShape::chan(TypeShape::Bool),
                TypeShape::Error,
            ],
            handler: Arc::new(StreamingHandler {
                handler,
                _phantom: PhantomData,
            }),
        }
    }

    /// Qualified name of the input type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Runtime descriptor of the handler, input probed from its `Deserialize` impl.
    pub fn signature(&self) -> TypeShape {
        Signature::new(
            vec![TypeShape::pointer((self.probe)())],
            self.outputs.clone(),
        )
        .into_shape()
    }
}

/// A validated handler.
#[derive(Clone)]
pub struct HandlerEntry {
    route: String,
    type_name: &'static str,
    input: TypeShape,
    kind: HandlerKind,
    handler: Arc<dyn ErasedHandler>,
}

impl HandlerEntry {
    /// Check `registration` against the `kind` contract.
    ///
    /// # Errors
    ///
    /// Returns the first failing contract check.
    pub fn validate(
        registration: Registration,
        kind: HandlerKind,
    ) -> std::result::Result<Self, ContractError> {
        let signature = registration.signature();
        let Contract { route, input } = match kind {
            HandlerKind::Unary => validate_unary(&signature)?,
            HandlerKind::Streaming => validate_streaming(&signature)?,
        };
        tracing::debug!(route = %route, signature = %signature, ?kind, "registering handler");

        Ok(Self {
            route,
            type_name: registration.type_name,
            input,
            kind,
            handler: registration.handler,
        })
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Qualified name of the input type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Descriptor of the input record.
    pub fn input(&self) -> &TypeShape {
        &self.input
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn is_streaming(&self) -> bool {
        self.kind == HandlerKind::Streaming
    }

    pub(crate) fn call(&self, payload: &[u8], format: Format, stream_capacity: usize) -> Result<Response> {
        self.handler.call(
            payload,
            CallOptions {
                route: &self.route,
                format,
                stream_capacity,
            },
        )
    }
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("route", &self.route)
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Registry mapping request types to handlers.
///
/// Populate it before serving; once shared it is only read.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    /// Entries by input type.
    entries: HashMap<TypeId, HandlerEntry>,
    /// Route key to input type.
    routes: HashMap<String, TypeId>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `registration` against the `kind` contract and store it.
    ///
    /// The last registration for a route key wins; the previous entry is
    /// dropped and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns the first failing contract check. The registry is left unchanged.
    pub fn insert(
        &mut self,
        registration: Registration,
        kind: HandlerKind,
    ) -> std::result::Result<&HandlerEntry, ContractError> {
        let type_id = registration.type_id;
        let entry = HandlerEntry::validate(registration, kind)?;

        if let Some(previous) = self.routes.insert(entry.route.clone(), type_id) {
            if let Some(old) = self.entries.remove(&previous) {
                tracing::warn!(
                    route = %entry.route,
                    replaced = old.type_name,
                    by = entry.type_name,
                    "route key registered twice, last registration wins"
                );
            }
        }

        self.entries.insert(type_id, entry);
        Ok(&self.entries[&type_id])
    }

    /// Get the handler registered under a route key.
    pub fn get(&self, route: &str) -> Option<&HandlerEntry> {
        self.routes.get(route).and_then(|id| self.entries.get(id))
    }

    /// Get the handler registered for input type `I`.
    pub fn get_by_type<I: 'static>(&self) -> Option<&HandlerEntry> {
        self.entries.get(&TypeId::of::<I>())
    }

    pub fn is_registered(&self, route: &str) -> bool {
        self.get(route).is_some()
    }

    /// Whether `route` is registered as a streaming handler.
    pub fn is_streaming(&self, route: &str) -> Option<bool> {
        self.get(route).map(HandlerEntry::is_streaming)
    }

    /// Descriptor of the input record for `route`.
    pub fn input_shape(&self, route: &str) -> Option<&TypeShape> {
        self.get(route).map(HandlerEntry::input)
    }

    /// All route keys, sorted.
    pub fn routes(&self) -> Vec<&str> {
        let mut routes: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        routes.sort_unstable();
        routes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
