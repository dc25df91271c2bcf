//! Error type and Return values used by the Serializer and the Decoder.

use alloc::string::{String, ToString};
use serde::ser;
use thiserror::Error;

/// Represents all possible errors that can happen during encoding and
/// decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The struct contains a type that is not directly representable in
    /// Solidity types.
    ///
    /// For example floating point numbers, options and maps. Enums have to
    /// implement a custom serialize method writing their discriminant (see
    /// [AllocationType][crate::exit::AllocationType]).
    #[error("type is not representable in abi encoding: {0}")]
    TypeNotRepresentable(&'static str),
    /// Although the type is representable in Solidity, the Serializer
    /// currently does not implement this functionality.
    #[error("type is not yet implemented: {0}")]
    TypeNotYetSupported(&'static str),
    /// Error raised by a custom [serde::Serialize] implementation.
    #[error("{0}")]
    Custom(String),
    /// The input to the decoder does not follow the abi layout.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(#[from] Malformed),
}

/// Details on why a buffer could not be decoded.
///
/// All positions are byte positions in the decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Malformed {
    #[error("slot at {at} exceeds the buffer of {len} bytes")]
    Truncated { at: usize, len: usize },
    #[error("offset {offset} read at {at} points outside the buffer")]
    OffsetOutOfBounds { at: usize, offset: usize },
    #[error("length {length} read at {at} overruns the buffer")]
    LengthOverrun { at: usize, length: usize },
    #[error("non-zero padding in slot at {at}")]
    DirtyPadding { at: usize },
    #[error("value at {at} does not fit into the target type")]
    ValueOutOfRange { at: usize },
    #[error("value {value} at {at} is not a known variant")]
    InvalidVariant { at: usize, value: u8 },
    #[error("guarantee descriptor of {len} bytes is not a whole list of destinations")]
    DescriptorLength { len: usize },
}

impl ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: core::fmt::Display,
    {
        Error::Custom(msg.to_string())
    }
}

/// Alias for `Result` using the [Error] returned by the Serializer and the
/// Decoder.
pub type Result<T> = core::result::Result<T, Error>;
