//! Codec module - payload serialization for the dispatch engine.
//!
//! The binary entry point speaks MessagePack, the REST bridge speaks JSON.
//! Handlers never see either: they receive a decoded request and return a
//! typed reply, and the engine picks the codec through [`Format`].
//!
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (struct-as-map)
//! - [`JsonCodec`] - JSON using `serde_json`
//! - [`base64_bytes`] - serde helper for byte fields reachable over REST
//!
//! # Example
//!
//! ```
//! use service_dispatch::codec::Format;
//!
//! let encoded = Format::MsgPack.encode(&"hello").unwrap();
//! let decoded: String = Format::MsgPack.decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//!
//! let json = Format::Json.encode(&42u32).unwrap();
//! assert_eq!(json, b"42");
//! ```

pub mod base64_bytes;
mod json;
mod msgpack;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Wire format selected by the entry point that received the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Binary entry point.
    MsgPack,
    /// REST bridge.
    Json,
}

impl Format {
    /// Encode a value with this format.
    #[inline]
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>> {
        match self {
            Format::MsgPack => MsgPackCodec::encode(value),
            Format::Json => JsonCodec::encode(value),
        }
    }

    /// Decode a fresh value from bytes with this format.
    #[inline]
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T> {
        match self {
            Format::MsgPack => MsgPackCodec::decode(bytes),
            Format::Json => JsonCodec::decode(bytes),
        }
    }
}
