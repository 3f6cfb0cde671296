//! Dynamic value tree for env file data.
//!
//! Every encode and decode goes through a [`Value`]: the source or destination is first
//! serialized into a tree (see [`crate::to_value`]), the tree is flattened into composite
//! keys, and on decode the updated tree is deserialized back into the destination type.
//!
//! ## Core Types
//!
//! - [`Value`]: a scalar, an absent optional, a sequence, a text-keyed map or a record
//! - [`Scalar`]: booleans, fixed-width integers and floats, characters and text
//! - [`Record`] and [`Field`]: a struct with per-field external names and omit flags
//!
//! Present optionals have no variant of their own: `Some(v)` becomes the tree of `v`, so a
//! reference is transparent to the key scheme. `None` becomes [`Value::Absent`].
//!
//! ## Examples
//!
//! ```rust
//! use serde_envfile::{to_value, Scalar, Value};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Limits { max: u8, burst: Option<u8> }
//!
//! let value = to_value(&Limits { max: 10, burst: None }).unwrap();
//! let record = value.as_record().unwrap();
//! assert_eq!(record.field("max").map(|f| &f.value), Some(&Value::Scalar(Scalar::U8(10))));
//! assert!(record.field("burst").unwrap().value.is_absent());
//! ```

use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;

/// A dynamically-typed env value tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    /// An optional reference currently holding nothing.
    Absent,
    /// Text that decode assigned to a previously absent optional. The wrapped type is
    /// unknown until the tree is deserialized, so conversion happens there.
    Raw { key: String, text: String },
    Seq(Vec<Value>),
    Map(IndexMap<String, Value>),
    Record(Record),
}

/// A leaf value of fixed kind and width.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(String),
}

/// A struct: its serde name and its fields in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub name: &'static str,
    pub fields: Vec<Field>,
}

/// One record field with the metadata parsed from its descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// The serde field name, kept verbatim so deserialization can match it.
    pub tag: &'static str,
    /// External name used for key composition.
    pub name: String,
    /// Skip this field's line on encode when it holds its zero value.
    pub omit_empty: bool,
    pub value: Value,
}

impl Field {
    /// Builds a field from its serde name, read as a comma-separated descriptor.
    ///
    /// The first segment is the external name; an `omitempty` segment sets the omit flag.
    /// Unknown segments are ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_envfile::{Field, Value};
    ///
    /// let field = Field::new("ca,omitempty,other", Value::Absent).unwrap();
    /// assert_eq!(field.name, "ca");
    /// assert!(field.omit_empty);
    ///
    /// assert!(Field::new(",omitempty", Value::Absent).is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] when the name segment is empty.
    pub fn new(tag: &'static str, value: Value) -> Result<Self> {
        let mut segments = tag.split(',');
        let name = segments.next().unwrap_or_default();
        if name.is_empty() {
            return Err(Error::unsupported_type(&format!(
                "field descriptor {tag:?} has no name"
            )));
        }
        let omit_empty = segments.any(|segment| segment == "omitempty");
        Ok(Field {
            tag,
            name: name.to_string(),
            omit_empty,
            value,
        })
    }
}

impl Record {
    /// Looks a field up by its external name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl Scalar {
    /// Name of the scalar's Rust type, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::I8(_) => "i8",
            Scalar::I16(_) => "i16",
            Scalar::I32(_) => "i32",
            Scalar::I64(_) => "i64",
            Scalar::U8(_) => "u8",
            Scalar::U16(_) => "u16",
            Scalar::U32(_) => "u32",
            Scalar::U64(_) => "u64",
            Scalar::F32(_) => "f32",
            Scalar::F64(_) => "f64",
            Scalar::Char(_) => "char",
            Scalar::Str(_) => "string",
        }
    }

    /// Returns `true` for `false`, zero, `'\0'` and the empty string.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::Bool(b) => !b,
            Scalar::I8(n) => *n == 0,
            Scalar::I16(n) => *n == 0,
            Scalar::I32(n) => *n == 0,
            Scalar::I64(n) => *n == 0,
            Scalar::U8(n) => *n == 0,
            Scalar::U16(n) => *n == 0,
            Scalar::U32(n) => *n == 0,
            Scalar::U64(n) => *n == 0,
            Scalar::F32(n) => *n == 0.0,
            Scalar::F64(n) => *n == 0.0,
            Scalar::Char(c) => *c == '\0',
            Scalar::Str(s) => s.is_empty(),
        }
    }

    /// Parses `text` as this scalar's kind and width and replaces the current value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_envfile::Scalar;
    ///
    /// let mut port = Scalar::U16(0);
    /// port.assign("port", "8080").unwrap();
    /// assert_eq!(port, Scalar::U16(8080));
    ///
    /// assert!(port.assign("port", "70000").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] when the text is not of the right kind, [`Error::Range`] when a
    /// number does not fit the width.
    pub fn assign(&mut self, key: &str, text: &str) -> Result<()> {
        *self = match self {
            Scalar::Bool(_) => Scalar::Bool(parse_bool(key, text)?),
            Scalar::I8(_) => Scalar::I8(parse_int(key, text, "i8")?),
            Scalar::I16(_) => Scalar::I16(parse_int(key, text, "i16")?),
            Scalar::I32(_) => Scalar::I32(parse_int(key, text, "i32")?),
            Scalar::I64(_) => Scalar::I64(parse_int(key, text, "i64")?),
            Scalar::U8(_) => Scalar::U8(parse_int(key, text, "u8")?),
            Scalar::U16(_) => Scalar::U16(parse_int(key, text, "u16")?),
            Scalar::U32(_) => Scalar::U32(parse_int(key, text, "u32")?),
            Scalar::U64(_) => Scalar::U64(parse_int(key, text, "u64")?),
            Scalar::F32(_) => Scalar::F32(parse_f32(key, text)?),
            Scalar::F64(_) => Scalar::F64(parse_f64(key, text)?),
            Scalar::Char(_) => Scalar::Char(parse_char(key, text)?),
            Scalar::Str(_) => Scalar::Str(text.to_string()),
        };
        Ok(())
    }
}

/// Formats the scalar the way it is written after `=`.
///
/// Floats are widened to `f64` and printed as the shortest text that reads back to the
/// same `f64`.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::I8(n) => write!(f, "{n}"),
            Scalar::I16(n) => write!(f, "{n}"),
            Scalar::I32(n) => write!(f, "{n}"),
            Scalar::I64(n) => write!(f, "{n}"),
            Scalar::U8(n) => write!(f, "{n}"),
            Scalar::U16(n) => write!(f, "{n}"),
            Scalar::U32(n) => write!(f, "{n}"),
            Scalar::U64(n) => write!(f, "{n}"),
            Scalar::F32(n) => write!(f, "{}", f64::from(*n)),
            Scalar::F64(n) => write!(f, "{n}"),
            Scalar::Char(c) => write!(f, "{c}"),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

pub(crate) fn parse_bool(key: &str, text: &str) -> Result<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(Error::parse(key, text, "bool")),
    }
}

/// Exactly one character; anything else, including the empty string, is rejected.
pub(crate) fn parse_char(key: &str, text: &str) -> Result<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(Error::parse(key, text, "char")),
    }
}

pub(crate) fn parse_int<T>(key: &str, text: &str, expected: &'static str) -> Result<T>
where
    T: FromStr<Err = ParseIntError>,
{
    text.parse::<T>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            Error::range(key, text, expected)
        }
        _ => Error::parse(key, text, expected),
    })
}

pub(crate) fn parse_f64(key: &str, text: &str) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|_| Error::parse(key, text, "f64"))
}

pub(crate) fn parse_f32(key: &str, text: &str) -> Result<f32> {
    let wide = text
        .parse::<f64>()
        .map_err(|_| Error::parse(key, text, "f32"))?;
    let narrow = wide as f32;
    if wide.is_finite() && narrow.is_infinite() {
        return Err(Error::range(key, text, "f32"));
    }
    Ok(narrow)
}

impl Value {
    /// Returns `true` if the value is an absent optional.
    #[inline]
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Kind name used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(scalar) => scalar.type_name(),
            Value::Absent => "absent optional",
            Value::Raw { .. } => "raw text",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// Returns `true` when the value equals the zero value of its type.
    ///
    /// Containers are never zero; they are never tested by the encoder either, since they
    /// produce no line of their own.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Scalar(scalar) => scalar.is_zero(),
            Value::Absent => true,
            Value::Raw { text, .. } => text.is_empty(),
            Value::Seq(_) | Value::Map(_) | Value::Record(_) => false,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Scalar(scalar) => scalar.serialize(serializer),
            Value::Absent => serializer.serialize_none(),
            Value::Raw { text, .. } => serializer.serialize_some(text),
            Value::Seq(items) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Record(record) => {
                use serde::ser::SerializeStruct;
                let mut state = serializer.serialize_struct(record.name, record.fields.len())?;
                for field in &record.fields {
                    state.serialize_field(field.tag, &field.value)?;
                }
                state.end()
            }
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::I8(n) => serializer.serialize_i8(*n),
            Scalar::I16(n) => serializer.serialize_i16(*n),
            Scalar::I32(n) => serializer.serialize_i32(*n),
            Scalar::I64(n) => serializer.serialize_i64(*n),
            Scalar::U8(n) => serializer.serialize_u8(*n),
            Scalar::U16(n) => serializer.serialize_u16(*n),
            Scalar::U32(n) => serializer.serialize_u32(*n),
            Scalar::U64(n) => serializer.serialize_u64(*n),
            Scalar::F32(n) => serializer.serialize_f32(*n),
            Scalar::F64(n) => serializer.serialize_f64(*n),
            Scalar::Char(c) => serializer.serialize_char(*c),
            Scalar::Str(s) => serializer.serialize_str(s),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident,)*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Scalar(Scalar::$variant(value))
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => Str,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(Scalar::Str(value.to_string()))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Seq(value)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(value: IndexMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Absent, Into::into)
    }
}
