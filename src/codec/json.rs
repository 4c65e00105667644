//! JSON codec used by the REST bridge.

use crate::error::{Result, ServiceError};

/// JSON codec for REST payloads and replies.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to compact JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::JsonEncode`] if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(ServiceError::JsonEncode)
    }

    /// Decode JSON bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::JsonDecode`] if the bytes do not describe a `T`.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(ServiceError::JsonDecode)
    }
}
