//! Serialize any `&[u8]` as solidity `bytes` (dynamic length bytes).
//!
//! Without this, it would be serialized to a `uint8[]` of fixed or dynamic
//! length. Use [Decoder::read_bytes][super::Decoder::read_bytes] to read it
//! back.
//!
//! # Example usage
//! ```
//! use nitro_exit::abiencode::as_bytes;
//! use serde::Serialize;
//!
//! #[derive(Serialize, Debug)]
//! pub struct Vector {
//!     #[serde(with = "as_bytes")]
//!     pub data: Vec<u8>,
//! }
//! ```

use super::ser::DynamicMarker;
use serde::{ser::SerializeTuple, Serialize, Serializer};

/// Internal data structure allowing us to serialize the data using
/// `serialize_bytes`, which unfortunately cannot be specified when calling
/// `serialize_element`.
struct Bytes<'a>(&'a [u8]);

impl<'a> Serialize for Bytes<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(self.0)
    }
}

pub fn serialize<S>(v: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut s = serializer.serialize_tuple(3)?;
    s.serialize_element(&DynamicMarker)?; // Mark tuple as dynamic (needed for correct encoding)
    s.serialize_element(&v.len())?; // Write length (intentionally not included when writing the data)
    s.serialize_element(&Bytes(v))?; // Write data
    s.end()
}
