//! Schema-driven TARS struct codec.
//!
//! Encoding rules:
//! - Fields are written in schema order, each as header + body.
//! - Integers (and lengths) take the narrowest marker; 0 has no body.
//! - Nested structs sit between a struct-begin header and a struct-end header.
//!
//! Decoding rules:
//! - Widths come from markers only; a marker wider than the field is rejected.
//! - Tags missing from the schema are skipped by their own marker/length.
//! - Every schema field must be present, so any strict prefix of a valid
//!   encoding fails with `DecodeError`.
//! - `decode_with_defaults` relaxes only that last rule: absent fields take
//!   their type's default. A struct cut off before its end marker still fails.

mod schema;
mod wire;

use bytes::Bytes;

use crate::error::{DecodeError, EncodeError};

pub use schema::{Field, FieldType, Schema, StructValue, Value};
pub use wire::{TarsReader, TarsWriter, WireType, MAX_DEPTH};

/// Encode `value` against `schema`.
pub fn encode(value: &StructValue, schema: &Schema) -> Result<Bytes, EncodeError> {
    let mut w = TarsWriter::new();
    write_fields(&mut w, value, schema)?;
    Ok(w.freeze())
}

/// What to do with a schema field that never appeared on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Absent {
    Reject,
    Default,
}

/// Decode a top-level struct occupying the whole of `buf`.
pub fn decode(buf: Bytes, schema: &Schema) -> Result<StructValue, DecodeError> {
    let mut r = TarsReader::new(buf);
    read_fields(&mut r, schema, 0, Absent::Reject)
}

/// Like [`decode`], but fields the sender left out read as their default.
pub fn decode_with_defaults(buf: Bytes, schema: &Schema) -> Result<StructValue, DecodeError> {
    let mut r = TarsReader::new(buf);
    read_fields(&mut r, schema, 0, Absent::Default)
}

/// A typed struct with a static schema.
pub trait TarsMessage: Sized {
    fn schema() -> &'static Schema;

    fn to_struct(&self) -> StructValue;

    fn from_struct(value: StructValue) -> Self;

    fn encode(&self) -> Result<Bytes, EncodeError> {
        encode(&self.to_struct(), Self::schema())
    }

    fn decode(buf: Bytes) -> Result<Self, DecodeError> {
        decode(buf, Self::schema()).map(Self::from_struct)
    }

    fn decode_with_defaults(buf: Bytes) -> Result<Self, DecodeError> {
        decode_with_defaults(buf, Self::schema()).map(Self::from_struct)
    }
}

fn write_fields(w: &mut TarsWriter, value: &StructValue, schema: &Schema) -> Result<(), EncodeError> {
    for field in schema.fields {
        let v = value.get(field.tag).ok_or(EncodeError::MissingField {
            schema: schema.name,
            field: field.name,
        })?;
        write_value(w, field, v)?;
    }
    Ok(())
}

fn write_value(w: &mut TarsWriter, field: &Field, v: &Value) -> Result<(), EncodeError> {
    let mismatch = EncodeError::TypeMismatch { field: field.name };
    match (field.ty, v) {
        (FieldType::Bool, Value::Bool(b)) => w.write_bool(field.tag, *b),
        (FieldType::String, Value::String(s)) => {
            if u32::try_from(s.len()).is_err() {
                return Err(EncodeError::TooLong {
                    field: field.name,
                    len: s.len(),
                });
            }
            w.write_string(field.tag, s);
        }
        (FieldType::Bytes, Value::Bytes(b)) => w.write_bytes(field.tag, b),
        (FieldType::Struct(inner), Value::Struct(sv)) => {
            w.write_struct_begin(field.tag);
            write_fields(w, sv, inner)?;
            w.write_struct_end();
        }
        (ty, Value::Int(n)) => {
            let (min, max, _) = ty.int_bounds().ok_or(mismatch)?;
            if *n < min || *n > max {
                return Err(EncodeError::IntOutOfRange {
                    field: field.name,
                    value: *n,
                });
            }
            w.write_int(field.tag, *n);
        }
        _ => return Err(mismatch),
    }
    Ok(())
}

fn read_fields(
    r: &mut TarsReader,
    schema: &Schema,
    depth: usize,
    absent: Absent,
) -> Result<StructValue, DecodeError> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::TooDeep(MAX_DEPTH));
    }
    let nested = depth > 0;
    let mut out = StructValue::new();

    loop {
        if !nested && !r.has_remaining() {
            break;
        }
        let (tag, ty) = r.read_head()?;
        if ty == WireType::StructEnd {
            if nested {
                break;
            }
            return Err(DecodeError::UnexpectedStructEnd);
        }
        match schema.field(tag) {
            Some(field) => {
                let v = read_value(r, field, ty, depth, absent)?;
                out.set(tag, v);
            }
            None => {
                tracing::trace!(schema = schema.name, tag, ?ty, "skipping unknown field");
                r.skip_field(ty, depth + 1)?;
            }
        }
    }

    for field in schema.fields {
        if out.get(field.tag).is_some() {
            continue;
        }
        match absent {
            Absent::Reject => {
                return Err(DecodeError::MissingField {
                    schema: schema.name,
                    field: field.name,
                })
            }
            Absent::Default => out.set(field.tag, field.ty.default_value()),
        }
    }
    Ok(out)
}

fn read_value(
    r: &mut TarsReader,
    field: &Field,
    ty: WireType,
    depth: usize,
    absent: Absent,
) -> Result<Value, DecodeError> {
    let mismatch = DecodeError::TypeMismatch {
        tag: field.tag,
        field: field.name,
        found: ty,
    };
    match field.ty {
        FieldType::Bool => match ty {
            WireType::Zero | WireType::Int8 => {
                let n = r.read_int_body(ty)?.ok_or(mismatch)?;
                Ok(Value::Bool(n != 0))
            }
            _ => Err(mismatch),
        },
        FieldType::String => {
            let raw = r.read_string_body(ty)?.ok_or(mismatch)?;
            std::str::from_utf8(&raw)
                .map(|s| Value::String(s.to_owned()))
                .map_err(|_| DecodeError::InvalidUtf8 { field: field.name })
        }
        FieldType::Bytes => {
            if ty != WireType::SimpleList {
                return Err(mismatch);
            }
            r.read_simple_list_body().map(Value::Bytes)
        }
        FieldType::Struct(inner) => {
            if ty != WireType::StructBegin {
                return Err(mismatch);
            }
            read_fields(r, inner, depth + 1, absent).map(Value::Struct)
        }
        int_ty => {
            let (_, _, max_width) = int_ty.int_bounds().ok_or(mismatch.clone())?;
            match ty.int_width() {
                Some(width) if width <= max_width => {
                    let n = r.read_int_body(ty)?.ok_or(mismatch)?;
                    Ok(Value::Int(n))
                }
                _ => Err(mismatch),
            }
        }
    }
}
