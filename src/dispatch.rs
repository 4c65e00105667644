//! Dispatch engine: route key + payload in, reply or tunnel out.
//!
//! Steps for every request:
//! 1. Look up the route key. A miss fails before anything else runs.
//! 2. Decode the payload into a fresh instance of the handler's input type.
//!    A decode failure aborts the request; the handler is never called.
//! 3. Call the handler with the owned request.
//! 4. Unary: encode the reply. Streaming: spawn a forwarder and hand back
//!    the tunnel.
//!
//! Handler errors come back unchanged as [`ServiceError::Handler`].

use bytes::Bytes;

use crate::codec::Format;
use crate::error::{Result, ServiceError};
use crate::handler::HandlerRegistry;
use crate::tunnel::StreamingTunnel;

/// Successful dispatch outcome. Exactly one of the two forms.
#[derive(Debug)]
pub enum Response {
    /// Encoded reply of a unary handler.
    Reply(Bytes),
    /// Live stream of encoded replies from a streaming handler.
    Stream(StreamingTunnel),
}

impl Response {
    /// The reply bytes, if this is a unary response.
    pub fn into_reply(self) -> Option<Bytes> {
        match self {
            Response::Reply(buf) => Some(buf),
            Response::Stream(_) => None,
        }
    }

    /// The tunnel, if this is a streaming response.
    pub fn into_stream(self) -> Option<StreamingTunnel> {
        match self {
            Response::Reply(_) => None,
            Response::Stream(tunnel) => Some(tunnel),
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Response::Stream(_))
    }
}

/// Route `payload` to the handler registered under `route`.
pub(crate) fn dispatch(
    registry: &HandlerRegistry,
    route: &str,
    payload: &[u8],
    format: Format,
    stream_capacity: usize,
) -> Result<Response> {
    let Some(entry) = registry.get(route) else {
        let err = ServiceError::RouteNotRegistered(route.to_string());
        tracing::error!(route = %route, "{err}");
        return Err(err);
    };

    tracing::trace!(route = %route, len = payload.len(), ?format, "dispatching request");
    entry.call(payload, format, stream_capacity)
}
