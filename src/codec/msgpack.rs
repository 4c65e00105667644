//! MsgPack codec using `rmp-serde`.
//!
//! Records are always written with `to_vec_named`, so a reply is a map keyed
//! by field name rather than a positional array. Peers written against a
//! different schema revision can still decode the fields they know.
//!
//! # Example
//!
//! ```
//! use service_dispatch::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct GetBlock {
//!     index: u64,
//! }
//!
//! let encoded = MsgPackCodec::encode(&GetBlock { index: 7 }).unwrap();
//! let decoded: GetBlock = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, GetBlock { index: 7 });
//! ```

use crate::error::Result;

/// MessagePack codec for binary request payloads and replies.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map).
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes into a freshly allocated value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
