use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::protocol::error::Result;

/// Codec for encoding/decoding message values
///
/// Each serializer picks the codec its wire format is built on: the JSON
/// serializer encodes payloads with [`Codec::Json`], the envelope serializer
/// nests [`Codec::Postcard`] payloads inside a postcard envelope.
///
/// # Example
///
/// ```
/// use nanorpc_common::transport::Codec;
///
/// let encoded = Codec::Json.encode(&vec![1, 2, 3]).unwrap();
/// let decoded: Vec<i32> = Codec::Json.decode(&encoded).unwrap();
/// assert_eq!(decoded, vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// JSON text via `serde_json`
    Json,
    /// Compact binary via `postcard`
    Postcard,
}

impl Codec {
    /// Encode a value to bytes
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>> {
        match self {
            Codec::Json => Ok(serde_json::to_vec(value)?),
            Codec::Postcard => Ok(postcard::to_allocvec(value)?),
        }
    }

    /// Decode a value from bytes
    pub fn decode<T: DeserializeOwned>(self, data: &[u8]) -> Result<T> {
        match self {
            Codec::Json => Ok(serde_json::from_slice(data)?),
            Codec::Postcard => Ok(postcard::from_bytes(data)?),
        }
    }
}
