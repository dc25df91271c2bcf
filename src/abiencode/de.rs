//! Decoding of abi encoded data, the inverse of [to_writer][super::to_writer].
//!
//! Unlike the Serializer the decoder is not driven by serde: decoding needs to
//! know whether a field is dynamic *before* reading it (to decide between
//! reading the value in place or following an offset), which the serde data
//! model cannot tell us. Types therefore implement [Decode] by hand, reading
//! their fields in declaration order with the `read_*` methods of [Decoder].
//!
//! Every read is bounds checked. A buffer that cannot be decoded results in
//! [Error::MalformedEncoding], a partially decoded value is never returned.
//! Bytes at the end of the buffer that no offset points to are ignored.

use super::{
    error::{Error, Malformed, Result},
    ser::{padded_len, SLOT_SIZE},
    types::U256,
};
use alloc::vec::Vec;

/// A type that can be read back from its abi encoding.
pub trait Decode: Sized {
    /// Dynamic types are stored in the tail of their container and referenced
    /// by an offset in its head. Static types are stored in place.
    const IS_DYNAMIC: bool;

    /// Read the value starting at the current position of `decoder`.
    ///
    /// For dynamic types the decoder has already followed the offset, i.e. its
    /// base and position point to the first slot of the value.
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self>;
}

/// Cursor over an encoded buffer.
///
/// `base` is the first byte of the container currently being read, which is
/// what offsets in its head are relative to.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    base: usize,
    pos: usize,
}

/// Decode a value encoded with [to_writer][super::to_writer] or
/// [to_vec][super::to_vec].
pub fn from_slice<T>(buf: &[u8]) -> Result<T>
where
    T: Decode,
{
    Decoder::new(buf).read()
}

fn malformed<T>(reason: Malformed) -> Result<T> {
    Err(Error::MalformedEncoding(reason))
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            base: 0,
            pos: 0,
        }
    }

    /// Byte position of the next slot, mainly useful for error reporting.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn next_slot(&mut self) -> Result<&'a [u8]> {
        let at = self.pos;
        let buf = self.buf;
        match at.checked_add(SLOT_SIZE) {
            Some(end) if end <= buf.len() => {
                self.pos = end;
                Ok(&buf[at..end])
            }
            _ => malformed(Malformed::Truncated { at, len: buf.len() }),
        }
    }

    /// Read one raw 32 byte slot.
    pub fn read_slot(&mut self) -> Result<[u8; SLOT_SIZE]> {
        let mut out = [0u8; SLOT_SIZE];
        out.copy_from_slice(self.next_slot()?);
        Ok(out)
    }

    /// Read a right aligned value of `N` bytes, the padding in front of it has
    /// to be zero.
    pub fn read_right_aligned<const N: usize>(&mut self) -> Result<[u8; N]> {
        let at = self.pos;
        let slot = self.next_slot()?;
        let (padding, value) = slot.split_at(SLOT_SIZE - N);
        if padding.iter().any(|&b| b != 0) {
            return malformed(Malformed::DirtyPadding { at });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(value);
        Ok(out)
    }

    /// Read a `uint8`.
    pub fn read_u8(&mut self) -> Result<u8> {
        let [v] = self.read_right_aligned::<1>()?;
        Ok(v)
    }

    /// Read a length or offset. Both address bytes in the buffer, so anything
    /// larger than the buffer is rejected before converting to `usize`.
    fn read_len(&mut self) -> Result<usize> {
        let at = self.pos;
        let value = U256::decode(self)?;
        if value > U256::from(self.buf.len()) {
            return malformed(Malformed::ValueOutOfRange { at });
        }
        Ok(value.as_usize())
    }

    /// Read the offset in the current slot and return a decoder positioned at
    /// the value it points to.
    fn follow_offset(&mut self) -> Result<Decoder<'a>> {
        let at = self.pos;
        let offset = self.read_len()?;
        match self.base.checked_add(offset) {
            // A zero length dynamic value still needs its length slot, which
            // next_slot checks on the first read.
            Some(start) if start <= self.buf.len() => Ok(Decoder {
                buf: self.buf,
                base: start,
                pos: start,
            }),
            _ => malformed(Malformed::OffsetOutOfBounds { at, offset }),
        }
    }

    /// Read the next field of the current container.
    pub fn read<T>(&mut self) -> Result<T>
    where
        T: Decode,
    {
        if T::IS_DYNAMIC {
            let mut tail = self.follow_offset()?;
            T::decode(&mut tail)
        } else {
            T::decode(self)
        }
    }

    /// Read a `bytes` field (see [as_bytes][super::as_bytes]).
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let mut tail = self.follow_offset()?;
        tail.read_bytes_in_place()
    }

    fn read_bytes_in_place(&mut self) -> Result<Vec<u8>> {
        let at = self.pos;
        let length = self.read_len()?;
        let start = self.pos;
        let end = match start.checked_add(padded_len(length)) {
            Some(end) if end <= self.buf.len() => end,
            _ => return malformed(Malformed::LengthOverrun { at, length }),
        };

        let (data, padding) = self.buf[start..end].split_at(length);
        if padding.iter().any(|&b| b != 0) {
            return malformed(Malformed::DirtyPadding { at: start + length });
        }
        self.pos = end;
        Ok(data.to_vec())
    }
}

/// Dynamic arrays (`T[]`), the counterpart of serializing a `Vec` or slice.
impl<T> Decode for Vec<T>
where
    T: Decode,
{
    const IS_DYNAMIC: bool = true;

    fn decode(decoder: &mut Decoder<'_>) -> Result<Self> {
        let at = decoder.pos;
        let length = decoder.read_len()?;

        // Every element occupies at least one slot in the head. Checking this
        // up front keeps a forged length from reserving a huge vector.
        match length.checked_mul(SLOT_SIZE) {
            Some(size) if size <= decoder.remaining() => {}
            _ => return malformed(Malformed::LengthOverrun { at, length }),
        }

        // Offsets of the elements are relative to the first slot after the
        // length.
        let mut elements = Decoder {
            buf: decoder.buf,
            base: decoder.pos,
            pos: decoder.pos,
        };
        let mut values = Vec::with_capacity(length);
        for _ in 0..length {
            values.push(elements.read()?);
        }
        Ok(values)
    }
}
