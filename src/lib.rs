//! # service-dispatch
//!
//! Typed request dispatch for services: a handler registry keyed by request
//! type, a binary (MessagePack) entry point with streaming replies, and a
//! REST bridge for unary handlers.
//!
//! ## Architecture
//!
//! - **Registry**: handlers are registered by input type; the unqualified
//!   type name is the route key used on the wire
//! - **Dispatch**: route key + payload in, encoded reply or a
//!   [`StreamingTunnel`] out
//! - **REST bridge**: an axum router mapping `/v{N}/{namespace}/{resource}`
//!   onto unary handlers, JSON in and out
//!
//! ## Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use service_dispatch::ServiceProcessor;
//!
//! #[derive(Deserialize)]
//! struct Ping { seq: u32 }
//!
//! #[derive(Serialize, Deserialize)]
//! struct Pong { seq: u32 }
//!
//! #[derive(Debug)]
//! struct Rejected;
//!
//! impl std::fmt::Display for Rejected {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("rejected")
//!     }
//! }
//!
//! impl std::error::Error for Rejected {}
//!
//! let mut processor = ServiceProcessor::new();
//! processor
//!     .register_handler(|req: Ping| Ok::<_, Rejected>(Pong { seq: req.seq + 1 }))
//!     .unwrap();
//!
//! let payload = rmp_serde::to_vec_named(&serde_json::json!({ "seq": 1 })).unwrap();
//! let reply = processor.dispatch("Ping", &payload).unwrap().into_reply().unwrap();
//! let pong: Pong = rmp_serde::from_slice(&reply).unwrap();
//! assert_eq!(pong.seq, 2);
//! ```

pub mod codec;
pub mod error;
pub mod handler;
pub mod rest;
pub mod tunnel;

mod dispatch;
mod processor;

pub use dispatch::Response;
pub use error::{BoxError, ContractError, ServiceError};
pub use handler::{AnyMessage, HandlerStream, Registration, StreamSender};
pub use processor::{ProcessorConfig, ServiceProcessor};
pub use rest::RestRoute;
pub use tunnel::{StreamEnd, StreamingTunnel};
