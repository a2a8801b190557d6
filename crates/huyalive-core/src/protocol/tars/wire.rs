//! TARS wire primitives (panic-free).
//!
//! Parsing rules:
//! - Never index (`buf[0]`); always use `Buf` and `remaining()` checks.
//! - Integer width comes from the wire-type marker, never from the value.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;

/// Maximum struct/container nesting accepted by the reader.
pub const MAX_DEPTH: usize = 64;

/// Wire-type marker stored in the low nibble of every field header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    String1,
    String4,
    Map,
    List,
    StructBegin,
    StructEnd,
    Zero,
    SimpleList,
}

impl WireType {
    pub fn from_u8(v: u8) -> Result<Self, DecodeError> {
        Ok(match v {
            0 => WireType::Int8,
            1 => WireType::Int16,
            2 => WireType::Int32,
            3 => WireType::Int64,
            4 => WireType::Float,
            5 => WireType::Double,
            6 => WireType::String1,
            7 => WireType::String4,
            8 => WireType::Map,
            9 => WireType::List,
            10 => WireType::StructBegin,
            11 => WireType::StructEnd,
            12 => WireType::Zero,
            13 => WireType::SimpleList,
            other => return Err(DecodeError::UnknownWireType(other)),
        })
    }

    pub fn as_u8(self) -> u8 {
        match self {
            WireType::Int8 => 0,
            WireType::Int16 => 1,
            WireType::Int32 => 2,
            WireType::Int64 => 3,
            WireType::Float => 4,
            WireType::Double => 5,
            WireType::String1 => 6,
            WireType::String4 => 7,
            WireType::Map => 8,
            WireType::List => 9,
            WireType::StructBegin => 10,
            WireType::StructEnd => 11,
            WireType::Zero => 12,
            WireType::SimpleList => 13,
        }
    }

    /// Body width in bytes for integer markers, `None` for everything else.
    pub fn int_width(self) -> Option<usize> {
        match self {
            WireType::Zero => Some(0),
            WireType::Int8 => Some(1),
            WireType::Int16 => Some(2),
            WireType::Int32 => Some(4),
            WireType::Int64 => Some(8),
            _ => None,
        }
    }
}

/// Append-only TARS writer.
#[derive(Debug, Default)]
pub struct TarsWriter {
    buf: BytesMut,
}

impl TarsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_head(&mut self, tag: u8, ty: WireType) {
        if tag < 15 {
            self.buf.put_u8((tag << 4) | ty.as_u8());
        } else {
            self.buf.put_u8(0xF0 | ty.as_u8());
            self.buf.put_u8(tag);
        }
    }

    /// Writes an integer using the narrowest marker that holds `v`.
    pub fn write_int(&mut self, tag: u8, v: i64) {
        if v == 0 {
            self.write_head(tag, WireType::Zero);
        } else if let Ok(n) = i8::try_from(v) {
            self.write_head(tag, WireType::Int8);
            self.buf.put_i8(n);
        } else if let Ok(n) = i16::try_from(v) {
            self.write_head(tag, WireType::Int16);
            self.buf.put_i16(n);
        } else if let Ok(n) = i32::try_from(v) {
            self.write_head(tag, WireType::Int32);
            self.buf.put_i32(n);
        } else {
            self.write_head(tag, WireType::Int64);
            self.buf.put_i64(v);
        }
    }

    pub fn write_bool(&mut self, tag: u8, v: bool) {
        self.write_int(tag, i64::from(v));
    }

    /// Caller guarantees `s.len() <= u32::MAX`.
    pub fn write_string(&mut self, tag: u8, s: &str) {
        let len = s.len();
        if let Ok(short) = u8::try_from(len) {
            self.write_head(tag, WireType::String1);
            self.buf.put_u8(short);
        } else {
            self.write_head(tag, WireType::String4);
            self.buf.put_u32(len as u32);
        }
        self.buf.put_slice(s.as_bytes());
    }

    /// Byte block: simple-list marker, int8 element header, narrowed length.
    pub fn write_bytes(&mut self, tag: u8, b: &[u8]) {
        self.write_head(tag, WireType::SimpleList);
        self.write_head(0, WireType::Int8);
        self.write_int(0, b.len() as i64);
        self.buf.put_slice(b);
    }

    pub fn write_struct_begin(&mut self, tag: u8) {
        self.write_head(tag, WireType::StructBegin);
    }

    pub fn write_struct_end(&mut self) {
        self.write_head(0, WireType::StructEnd);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Cursor over a TARS buffer. Slices share the input allocation.
#[derive(Debug, Clone)]
pub struct TarsReader {
    buf: Bytes,
}

impl TarsReader {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    fn need(&self, needed: usize) -> Result<(), DecodeError> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(DecodeError::Truncated { needed, remaining });
        }
        Ok(())
    }

    fn advance(&mut self, len: usize) -> Result<(), DecodeError> {
        let remaining = self.buf.remaining();
        if len > remaining {
            return Err(DecodeError::LengthOverflow { len, remaining });
        }
        self.buf.advance(len);
        Ok(())
    }

    /// Takes `len` bytes without copying.
    pub fn take(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        let remaining = self.buf.remaining();
        if len > remaining {
            return Err(DecodeError::LengthOverflow { len, remaining });
        }
        Ok(self.buf.split_to(len))
    }

    pub fn read_head(&mut self) -> Result<(u8, WireType), DecodeError> {
        self.need(1)?;
        let b = self.buf.get_u8();
        let ty = WireType::from_u8(b & 0x0F)?;
        let mut tag = b >> 4;
        if tag == 15 {
            self.need(1)?;
            tag = self.buf.get_u8();
        }
        Ok((tag, ty))
    }

    /// Reads an integer body; `Ok(None)` when `ty` is not an integer marker.
    pub fn read_int_body(&mut self, ty: WireType) -> Result<Option<i64>, DecodeError> {
        let v = match ty {
            WireType::Zero => 0,
            WireType::Int8 => {
                self.need(1)?;
                i64::from(self.buf.get_i8())
            }
            WireType::Int16 => {
                self.need(2)?;
                i64::from(self.buf.get_i16())
            }
            WireType::Int32 => {
                self.need(4)?;
                i64::from(self.buf.get_i32())
            }
            WireType::Int64 => {
                self.need(8)?;
                self.buf.get_i64()
            }
            _ => return Ok(None),
        };
        Ok(Some(v))
    }

    /// Reads a container length (a full integer field, tag ignored).
    pub fn read_length(&mut self) -> Result<usize, DecodeError> {
        let (tag, ty) = self.read_head()?;
        let n = self
            .read_int_body(ty)?
            .ok_or(DecodeError::TypeMismatch {
                tag,
                field: "<length>",
                found: ty,
            })?;
        usize::try_from(n).map_err(|_| DecodeError::NegativeLength(n))
    }

    /// Reads a string body; `Ok(None)` when `ty` is not a string marker.
    pub fn read_string_body(&mut self, ty: WireType) -> Result<Option<Bytes>, DecodeError> {
        let len = match ty {
            WireType::String1 => {
                self.need(1)?;
                usize::from(self.buf.get_u8())
            }
            WireType::String4 => {
                self.need(4)?;
                self.buf.get_u32() as usize
            }
            _ => return Ok(None),
        };
        self.take(len).map(Some)
    }

    /// Reads the body of a simple-list (byte block) field.
    pub fn read_simple_list_body(&mut self) -> Result<Bytes, DecodeError> {
        let (tag, ty) = self.read_head()?;
        if ty != WireType::Int8 {
            return Err(DecodeError::TypeMismatch {
                tag,
                field: "<simple list element>",
                found: ty,
            });
        }
        let len = self.read_length()?;
        self.take(len)
    }

    /// Skips one field body whose header has already been consumed.
    pub fn skip_field(&mut self, ty: WireType, depth: usize) -> Result<(), DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep(MAX_DEPTH));
        }
        match ty {
            WireType::Zero => Ok(()),
            WireType::Int8 => self.advance(1),
            WireType::Int16 => self.advance(2),
            WireType::Int32 | WireType::Float => self.advance(4),
            WireType::Int64 | WireType::Double => self.advance(8),
            WireType::String1 | WireType::String4 => self.read_string_body(ty).map(|_| ()),
            WireType::SimpleList => self.read_simple_list_body().map(|_| ()),
            WireType::List => {
                let n = self.read_length()?;
                for _ in 0..n {
                    self.skip_element(depth + 1)?;
                }
                Ok(())
            }
            WireType::Map => {
                let n = self.read_length()?;
                for _ in 0..n {
                    self.skip_element(depth + 1)?;
                    self.skip_element(depth + 1)?;
                }
                Ok(())
            }
            WireType::StructBegin => self.skip_to_struct_end(depth + 1),
            WireType::StructEnd => Err(DecodeError::UnexpectedStructEnd),
        }
    }

    fn skip_element(&mut self, depth: usize) -> Result<(), DecodeError> {
        let (_, ty) = self.read_head()?;
        self.skip_field(ty, depth)
    }

    /// Skips fields up to and including the matching struct-end.
    pub fn skip_to_struct_end(&mut self, depth: usize) -> Result<(), DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep(MAX_DEPTH));
        }
        loop {
            let (_, ty) = self.read_head()?;
            if ty == WireType::StructEnd {
                return Ok(());
            }
            self.skip_field(ty, depth)?;
        }
    }
}
