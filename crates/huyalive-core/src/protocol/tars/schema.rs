//! Static schema tables and the dynamic values they describe.
//!
//! A `Schema` is the tag → (name, type) table consulted by both `encode` and
//! `decode`; a `StructValue` is the decoded form, keyed by tag.

use std::collections::BTreeMap;

use bytes::Bytes;

/// Semantic type of a field. The wire type is derived from it at encode time.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    String,
    Bytes,
    Struct(&'static Schema),
}

impl FieldType {
    /// Inclusive value range and widest accepted marker width for integers.
    pub(crate) fn int_bounds(self) -> Option<(i64, i64, usize)> {
        match self {
            FieldType::Int8 => Some((i64::from(i8::MIN), i64::from(i8::MAX), 1)),
            FieldType::Int16 => Some((i64::from(i16::MIN), i64::from(i16::MAX), 2)),
            FieldType::Int32 => Some((i64::from(i32::MIN), i64::from(i32::MAX), 4)),
            FieldType::Int64 => Some((i64::MIN, i64::MAX, 8)),
            _ => None,
        }
    }

    pub fn default_value(self) -> Value {
        match self {
            FieldType::Bool => Value::Bool(false),
            FieldType::Int8 | FieldType::Int16 | FieldType::Int32 | FieldType::Int64 => {
                Value::Int(0)
            }
            FieldType::String => Value::String(String::new()),
            FieldType::Bytes => Value::Bytes(Bytes::new()),
            FieldType::Struct(schema) => Value::Struct(schema.default_value()),
        }
    }
}

/// One field descriptor.
#[derive(Debug)]
pub struct Field {
    pub tag: u8,
    pub name: &'static str,
    pub ty: FieldType,
}

/// Ordered field table of one struct.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl Schema {
    pub fn field(&self, tag: u8) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// A value with every field set to its type's default.
    pub fn default_value(&self) -> StructValue {
        self.fields
            .iter()
            .fold(StructValue::new(), |v, f| v.with(f.tag, f.ty.default_value()))
    }
}

/// A decoded (or to-be-encoded) field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),
    Bytes(Bytes),
    Struct(StructValue),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<StructValue> for Value {
    fn from(v: StructValue) -> Self {
        Value::Struct(v)
    }
}

/// Field values of one struct, keyed by tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructValue {
    fields: BTreeMap<u8, Value>,
}

impl StructValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`.
    pub fn with(mut self, tag: u8, v: impl Into<Value>) -> Self {
        self.set(tag, v);
        self
    }

    pub fn set(&mut self, tag: u8, v: impl Into<Value>) {
        self.fields.insert(tag, v.into());
    }

    pub fn get(&self, tag: u8) -> Option<&Value> {
        self.fields.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Value)> {
        self.fields.iter().map(|(t, v)| (*t, v))
    }

    // The take_* accessors fall back to the type default when the tag is
    // absent or holds another variant; `decode` never produces either case.

    pub fn take_bool(&mut self, tag: u8) -> bool {
        match self.fields.remove(&tag) {
            Some(Value::Bool(v)) => v,
            _ => false,
        }
    }

    pub fn take_int(&mut self, tag: u8) -> i64 {
        match self.fields.remove(&tag) {
            Some(Value::Int(v)) => v,
            _ => 0,
        }
    }

    pub fn take_i32(&mut self, tag: u8) -> i32 {
        i32::try_from(self.take_int(tag)).unwrap_or_default()
    }

    pub fn take_string(&mut self, tag: u8) -> String {
        match self.fields.remove(&tag) {
            Some(Value::String(v)) => v,
            _ => String::new(),
        }
    }

    pub fn take_bytes(&mut self, tag: u8) -> Bytes {
        match self.fields.remove(&tag) {
            Some(Value::Bytes(v)) => v,
            _ => Bytes::new(),
        }
    }

    pub fn take_struct(&mut self, tag: u8) -> StructValue {
        match self.fields.remove(&tag) {
            Some(Value::Struct(v)) => v,
            _ => StructValue::new(),
        }
    }
}
