//! Handler module - typed handlers, their contracts, and the registry.
//!
//! Provides:
//! - [`HandlerRegistry`] - maps route keys to validated handlers
//! - [`Registration`] - a typed handler before validation
//! - [`HandlerStream`] / [`StreamSender`] - channels of a streaming handler
//! - [`AnyMessage`] - polymorphic reply value
//! - [`Signature`], [`TypeShape`] - runtime descriptors checked at registration
//!
//! # Example
//!
//! ```ignore
//! use service_dispatch::handler::{HandlerKind, HandlerRegistry, HandlerStream, Registration};
//!
//! let mut registry = HandlerRegistry::new();
//!
//! // unary: one request, one reply
//! registry.insert(Registration::unary(|req: Echo| Ok::<_, EchoError>(req)), HandlerKind::Unary)?;
//!
//! // streaming: one request, a channel of replies
//! registry.insert(
//!     Registration::streaming(|req: Count| {
//!         let (sender, stream) = HandlerStream::channel(8);
//!         tokio::spawn(async move {
//!             for n in 0..req.up_to {
//!                 if sender.send(Tick { n }).await.is_err() {
//!                     break;
//!                 }
//!             }
//!         });
//!         Ok::<_, EchoError>(stream)
//!     }),
//!     HandlerKind::Streaming,
//! )?;
//! ```

mod registry;
mod reply;
mod shape;
mod signature;
mod stream;

pub use registry::{HandlerEntry, HandlerKind, HandlerRegistry, Registration};
pub use reply::{AnyMessage, Reply};
pub use shape::{probe, FieldShape, StructShape, TypeShape};
pub use signature::{route_key, validate_streaming, validate_unary, Contract, Signature};
pub use stream::{HandlerStream, StreamSender, CLOSE_SIGNAL_CAPACITY};
