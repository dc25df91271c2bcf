use super::error::{Error, Result};
use alloc::vec::Vec;
use serde::{
    ser::{
        self, SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant, SerializeTuple,
        SerializeTupleStruct, SerializeTupleVariant,
    },
    Serialize,
};

/// Type name used for marking a struct as fake-dynamic (dynamic but
/// transparent).
///
/// See [DynamicMarker] for why we need this. The characters have no special
/// meaning, they have just been chosen in a way that normal Rust types will
/// never have this name.
const MARK_DYNAMIC_NAME: &str = ":$&_DYNAMIC";

/// PhantomData type to mark a struct/tuple as dynamic, even if its fields
/// content are not dynamic.
///
/// Due to limitations of the [serde::Serializer] trait we cannot represent the
/// solidity types `bytes` and `address` at the same time: fixed-size values
/// must be able to write a whole 32 byte slot via
/// [Serializer.serialize_bytes][Serializer#method.serialize_bytes], so that
/// method cannot also mean `bytes`, which has to be marked as dynamic.
///
/// The `bytes` type is therefore serialized as a tuple (see
/// [as_bytes][super::as_bytes]):
/// - A [DynamicMarker] to force the tuple to be dynamic but at the same time
///   transparent (i.e. don't put it's content in the Tail and write an offset
///   in Head).
/// - The length (number of bytes without padding)
/// - The data, padded to the [SLOT_SIZE]
///
/// # Important
/// Be careful when using this Type directly. When used wrong the resulting
/// serialized bytes may not represent anything in Solidity. When possible use
/// [as_bytes][super::as_bytes] instead.
pub struct DynamicMarker;
impl Serialize for DynamicMarker {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_unit_struct(MARK_DYNAMIC_NAME)
    }
}

/// Sink for the encoded slots, called once per 32 byte slot in output order.
pub trait Writer {
    fn write(&mut self, slot: &[u8]);
}

impl Writer for Vec<u8> {
    fn write(&mut self, slot: &[u8]) {
        self.extend_from_slice(slot);
    }
}

struct NoWriter;

impl Writer for NoWriter {
    fn write(&mut self, _: &[u8]) {
        panic!("do not write to a NoWriter!");
    }
}

#[derive(Debug)]
enum Pass {
    // Don't serialize, just calculate length of Head and whether the type is
    // dynamic. We need the head_size to calculate offsets for dynamic types and
    // we need to know if the type is dynamic to begin with Pass::Head.
    // is_dynamic is stored outside of Pass because it is needed by all Passes.
    HeadSize(usize),
    Head { offset: usize }, // Write the static part (stores the offset for the next dynamic value)
    TailSize(usize),
    Tail, // Write the dynamic part
}

pub struct Serializer<'a, W>
where
    W: Writer,
{
    writer: &'a mut W,
    pass: Pass,
    is_dynamic: bool,
    is_fake_dynamic: bool,
}

/// Encode `value` like Solidity's `abi.encode(value)`.
pub fn to_writer<T, W>(value: &T, writer: &mut W) -> Result<()>
where
    T: Serialize + ?Sized,
    W: Writer,
{
    to_writer_internal(value, writer, true)
}

/// Encode `value` into a freshly allocated buffer.
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    let mut buf = Vec::new();
    to_writer(value, &mut buf)?;
    Ok(buf)
}

/// Like [to_writer] but without the leading offset of dynamic values, which
/// is how function arguments are encoded.
#[cfg(test)]
pub fn to_fnargs_writer<T, W>(value: &T, writer: &mut W) -> Result<()>
where
    T: Serialize + ?Sized,
    W: Writer,
{
    to_writer_internal(value, writer, false)
}

fn to_writer_internal<T, W>(value: &T, writer: &mut W, include_outer_struct: bool) -> Result<()>
where
    T: Serialize + ?Sized,
    W: Writer,
{
    let (head_size, is_dynamic, is_fake_dynamic) = compute_size(&value)?;
    tracing::trace!(head_size, is_dynamic, "encoding value");

    let mut serializer = Serializer {
        writer,
        pass: Pass::Head { offset: head_size },
        is_dynamic,
        is_fake_dynamic,
    };

    if is_dynamic && include_outer_struct {
        serializer.write_right_aligned(SLOT_SIZE.to_be_bytes())
    }

    value.serialize(&mut serializer)?;
    if is_dynamic {
        serializer.pass = Pass::Tail;
        value.serialize(&mut serializer)?;
    }
    Ok(())
}

fn compute_size<T>(value: &T) -> Result<(usize, bool, bool)>
where
    T: Serialize,
{
    let mut serializer = Serializer {
        writer: &mut NoWriter,
        pass: Pass::HeadSize(0),
        is_dynamic: false,
        is_fake_dynamic: false,
    };
    value.serialize(&mut serializer)?;

    match serializer.pass {
        Pass::HeadSize(head_size) => {
            Ok((head_size, serializer.is_dynamic, serializer.is_fake_dynamic))
        }
        _ => unreachable!("the serializer never changes the pass of a sizing run"),
    }
}

fn get_tail_size<T>(value: &T) -> Result<usize>
where
    T: Serialize,
{
    let mut serializer = Serializer {
        writer: &mut NoWriter,
        pass: Pass::TailSize(0),
        is_dynamic: false,
        is_fake_dynamic: false,
    };
    value.serialize(&mut serializer)?;

    match serializer.pass {
        Pass::TailSize(tail_size) => Ok(tail_size),
        _ => unreachable!("the serializer never changes the pass of a sizing run"),
    }
}

pub(crate) const SLOT_SIZE: usize = 32; // bytes

/// Number of bytes `len` bytes occupy once padded to whole slots.
pub(crate) fn padded_len(len: usize) -> usize {
    len.div_ceil(SLOT_SIZE) * SLOT_SIZE
}

/// Where an element lives, which changes the base its offset is relative to.
#[derive(Debug, Clone, Copy)]
enum Container {
    /// Field of a struct or tuple: offsets are relative to the first slot of
    /// the struct.
    Tuple,
    /// Element of a dynamic array: offsets are relative to the first slot
    /// after the length, but our Head offset includes the length slot.
    Seq,
}

impl<'a, W> Serializer<'a, W>
where
    W: Writer,
{
    // Panics if v.len() > SLOT_SIZE
    fn write_left_aligned_slice(&mut self, v: &[u8]) {
        let mut bytes: [u8; SLOT_SIZE] = Default::default();
        bytes[..v.len()].copy_from_slice(v);
        self.writer.write(bytes.as_slice());
    }

    // Panics if N > SLOT_SIZE
    fn write_right_aligned<const N: usize>(&mut self, v: [u8; N]) {
        let mut bytes: [u8; SLOT_SIZE] = Default::default();
        bytes[SLOT_SIZE - N..].copy_from_slice(v.as_slice());
        self.writer.write(bytes.as_slice())
    }

    fn serialize_in<T>(&mut self, value: &T, pass: Pass) -> Result<()>
    where
        T: Serialize,
    {
        let (_, is_dynamic, is_fake_dynamic) = compute_size(&value)?;
        let mut serializer = Serializer {
            writer: self.writer,
            pass,
            is_dynamic,
            is_fake_dynamic,
        };
        value.serialize(&mut serializer)
    }

    /// Shared by struct fields, tuple elements and sequence elements: write
    /// the entire value in Pass::Head if it is static, write an offset in
    /// Pass::Head and the value itself in Pass::Tail if it is dynamic.
    fn encode_element<T: ?Sized>(
        &mut self,
        container: Container,
        name: Option<&'static str>,
        value: &T,
    ) -> Result<()>
    where
        T: Serialize,
    {
        let (element_head_size, is_dyn, is_fake_dynamic) = compute_size(&value)?;
        let behind_offset = is_dyn && !is_fake_dynamic;

        match self.pass {
            Pass::HeadSize(ref mut head_size) => {
                *head_size += if behind_offset {
                    SLOT_SIZE
                } else {
                    element_head_size
                };
                self.is_dynamic |= is_dyn || is_fake_dynamic;
                Ok(())
            }
            Pass::Head { offset } => {
                if behind_offset {
                    let written = match container {
                        Container::Tuple => offset,
                        Container::Seq => offset - SLOT_SIZE,
                    };
                    self.write_right_aligned(written.to_be_bytes());
                    tracing::trace!(field = name, offset = written, "offset (HEAD)");

                    self.pass = Pass::Head {
                        offset: offset + element_head_size + get_tail_size(&value)?,
                    };
                    Ok(())
                } else {
                    // A static value has no offsets of its own, the base
                    // handed down is never used.
                    self.serialize_in(
                        &value,
                        Pass::Head {
                            offset: element_head_size,
                        },
                    )
                }
            }
            Pass::TailSize(size) => {
                let element_tail_size = get_tail_size(&value)?;
                self.pass = Pass::TailSize(
                    size + if behind_offset { element_head_size } else { 0 } + element_tail_size,
                );
                Ok(())
            }
            Pass::Tail => {
                if behind_offset {
                    // The offset handed down does NOT affect the container
                    // this element is part of but all children of the
                    // element: like in to_writer the child needs its own head
                    // size to know where its Tail begins.
                    self.serialize_in(
                        &value,
                        Pass::Head {
                            offset: element_head_size,
                        },
                    )?;
                    self.serialize_in(&value, Pass::Tail)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn trace(&self, method: &'static str) {
        if !matches!(self.pass, Pass::HeadSize(_)) {
            tracing::trace!(method, pass = ?self.pass);
        }
    }
}

macro_rules! serialize_uint {
    ($method:ident, $T:ty) => {
        fn $method(self, v: $T) -> Result<()> {
            self.trace(stringify!($method));
            match self.pass {
                Pass::HeadSize(ref mut head_size) => *head_size += SLOT_SIZE,
                Pass::Head { .. } => self.write_right_aligned(v.to_be_bytes()),
                Pass::TailSize(_) | Pass::Tail => {}
            };
            Ok(())
        }
    };
}

// Amounts are unsigned, nothing in the exit format is a signed integer.
macro_rules! reject_int {
    ($method:ident, $T:ty) => {
        fn $method(self, _: $T) -> Result<()> {
            Err(Error::TypeNotYetSupported(stringify!($T)))
        }
    };
}

impl<'a, 'b, W> ser::Serializer for &'a mut Serializer<'b, W>
where
    W: Writer,
{
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.serialize_u8(u8::from(v))
    }

    reject_int!(serialize_i8, i8);
    reject_int!(serialize_i16, i16);
    reject_int!(serialize_i32, i32);
    reject_int!(serialize_i64, i64);
    reject_int!(serialize_i128, i128);

    serialize_uint!(serialize_u8, u8);
    serialize_uint!(serialize_u16, u16);
    serialize_uint!(serialize_u32, u32);
    serialize_uint!(serialize_u64, u64);
    serialize_uint!(serialize_u128, u128);

    fn serialize_f32(self, _: f32) -> Result<()> {
        Err(Error::TypeNotRepresentable("f32"))
    }

    fn serialize_f64(self, _: f64) -> Result<()> {
        Err(Error::TypeNotRepresentable("f64"))
    }

    fn serialize_char(self, _: char) -> Result<()> {
        Err(Error::TypeNotYetSupported("char"))
    }

    fn serialize_str(self, _: &str) -> Result<()> {
        // Use `as_bytes` on the UTF-8 representation, nothing in the exit
        // format is a string.
        Err(Error::TypeNotYetSupported("str"))
    }

    /// Writes raw slots: the bytes padded to a multiple of [SLOT_SIZE].
    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.trace("serialize_bytes");
        match self.pass {
            Pass::HeadSize(ref mut head_size) => *head_size += padded_len(v.len()),
            Pass::Head { .. } => {
                let iter = v.chunks_exact(SLOT_SIZE);
                let rem = iter.remainder();
                for chunk in iter {
                    self.writer.write(chunk);
                }
                if !rem.is_empty() {
                    self.write_left_aligned_slice(rem);
                }
            }
            Pass::TailSize(_) | Pass::Tail => {}
        }
        Ok(())
    }

    fn serialize_none(self) -> Result<()> {
        Err(Error::TypeNotRepresentable("none"))
    }

    fn serialize_some<T: ?Sized>(self, _: &T) -> Result<()>
    where
        T: Serialize,
    {
        Err(Error::TypeNotRepresentable("some"))
    }

    fn serialize_unit(self) -> Result<()> {
        Err(Error::TypeNotRepresentable("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<()> {
        if name == MARK_DYNAMIC_NAME {
            if let Pass::HeadSize(_) = self.pass {
                self.is_fake_dynamic = true;
            }
            Ok(())
        } else {
            Err(Error::TypeNotRepresentable("unit struct"))
        }
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Result<()> {
        Err(Error::TypeNotRepresentable("unit variant (enum)"))
    }

    fn serialize_newtype_struct<T: ?Sized>(self, name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.trace("serialize_newtype_struct");
        self.encode_element(Container::Tuple, Some(name), value)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<()>
    where
        T: Serialize,
    {
        Err(Error::TypeNotRepresentable("newtype variant (enum)"))
    }

    fn serialize_seq(self, size: Option<usize>) -> Result<Self::SerializeSeq> {
        self.trace("serialize_seq");
        match self.pass {
            Pass::HeadSize(ref mut head_size) => {
                self.is_dynamic = true;
                *head_size += SLOT_SIZE;
            }
            Pass::Head { .. } => {
                // The length has to be written before the elements, so
                // sequences have to know their size in advance.
                let size = size.ok_or(Error::TypeNotYetSupported("sequence of unknown length"))?;
                self.write_right_aligned(size.to_be_bytes());
            }
            Pass::TailSize(_) | Pass::Tail => {}
        }
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(Error::TypeNotRepresentable("tuple variant"))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap> {
        Err(Error::TypeNotRepresentable("map"))
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self::SerializeStruct> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(Error::TypeNotRepresentable("struct variant"))
    }

    fn collect_str<T: ?Sized>(self, _value: &T) -> Result<()>
    where
        T: core::fmt::Display,
    {
        Err(Error::TypeNotYetSupported("str"))
    }
}

impl<'a, 'b, W> SerializeSeq for &'a mut Serializer<'b, W>
where
    W: Writer,
{
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.encode_element(Container::Seq, None, value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, 'b, W> SerializeTuple for &'a mut Serializer<'b, W>
where
    W: Writer,
{
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.encode_element(Container::Tuple, None, value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, 'b, W> SerializeTupleStruct for &'a mut Serializer<'b, W>
where
    W: Writer,
{
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.encode_element(Container::Tuple, None, value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, 'b, W> SerializeStruct for &'a mut Serializer<'b, W>
where
    W: Writer,
{
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.encode_element(Container::Tuple, Some(name), value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

// The remaining compound types are rejected when they are started (see
// serialize_tuple_variant, serialize_map and serialize_struct_variant), so
// their element methods are never reached.

impl<'a, 'b, W> SerializeTupleVariant for &'a mut Serializer<'b, W>
where
    W: Writer,
{
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, _value: &T) -> Result<()>
    where
        T: Serialize,
    {
        Err(Error::TypeNotRepresentable("tuple variant"))
    }

    fn end(self) -> Result<()> {
        Err(Error::TypeNotRepresentable("tuple variant"))
    }
}

impl<'a, 'b, W> SerializeMap for &'a mut Serializer<'b, W>
where
    W: Writer,
{
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized>(&mut self, _key: &T) -> Result<()>
    where
        T: Serialize,
    {
        Err(Error::TypeNotRepresentable("map"))
    }

    fn serialize_value<T: ?Sized>(&mut self, _value: &T) -> Result<()>
    where
        T: Serialize,
    {
        Err(Error::TypeNotRepresentable("map"))
    }

    fn end(self) -> Result<()> {
        Err(Error::TypeNotRepresentable("map"))
    }
}

impl<'a, 'b, W> SerializeStructVariant for &'a mut Serializer<'b, W>
where
    W: Writer,
{
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, _key: &'static str, _value: &T) -> Result<()>
    where
        T: Serialize,
    {
        Err(Error::TypeNotRepresentable("struct variant"))
    }

    fn end(self) -> Result<()> {
        Err(Error::TypeNotRepresentable("struct variant"))
    }
}
