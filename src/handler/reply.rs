//! Handler reply values.
//!
//! A handler may reply with any concrete record or with an [`AnyMessage`],
//! the polymorphic form used when one handler answers with different message
//! types depending on the request.
//!
//! Record replies are encoded through `Serialize`. They also need
//! `Deserialize`, which is how the reply shape is read at registration, so
//! that scalars, strings and byte buffers are refused as replies. Types that
//! only implement `Serialize` can still be sent wrapped in an [`AnyMessage`].

use std::any::type_name;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::shape::{probe, TypeShape};
use crate::codec::Format;
use crate::error::Result;

/// A value the dispatch engine knows how to encode as a reply.
pub trait Reply: Send + 'static {
    /// Descriptor used for the reply position of the handler signature.
    fn shape() -> TypeShape
    where
        Self: Sized;

    /// Encode with the format of the entry point that received the request.
    fn encode(&self, format: Format) -> Result<Vec<u8>>;
}

impl<T: Serialize + DeserializeOwned + Send + 'static> Reply for T {
    fn shape() -> TypeShape {
        TypeShape::pointer(probe::<T>())
    }

    fn encode(&self, format: Format) -> Result<Vec<u8>> {
        format.encode(self)
    }
}

/// Type-erased reply message.
///
/// ```
/// use service_dispatch::AnyMessage;
///
/// #[derive(serde::Serialize)]
/// struct Pong { seq: u32 }
///
/// let reply = AnyMessage::new(Pong { seq: 1 });
/// assert!(reply.type_name().ends_with("Pong"));
/// ```
pub struct AnyMessage {
    inner: Box<dyn ErasedMessage>,
    type_name: &'static str,
}

impl AnyMessage {
    pub fn new<T: Serialize + Send + 'static>(message: T) -> Self {
        Self {
            inner: Box::new(message),
            type_name: type_name::<T>(),
        }
    }

    /// Qualified type name of the wrapped message.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for AnyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyMessage").field(&self.type_name).finish()
    }
}

impl Reply for AnyMessage {
    fn shape() -> TypeShape {
        TypeShape::Interface
    }

    fn encode(&self, format: Format) -> Result<Vec<u8>> {
        self.inner.encode_as(format)
    }
}

trait ErasedMessage: Send {
    fn encode_as(&self, format: Format) -> Result<Vec<u8>>;
}

impl<T: Serialize + Send> ErasedMessage for T {
    fn encode_as(&self, format: Format) -> Result<Vec<u8>> {
        format.encode(self)
    }
}
