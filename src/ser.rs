//! Env file encoding.
//!
//! This module provides the [`Encoder`] that writes `KEY=VALUE` lines and the
//! [`ValueSerializer`] that turns any `T: Serialize` into a [`Value`] tree.
//!
//! ## Overview
//!
//! Encoding happens in three steps:
//!
//! 1. the value is serialized into a tree
//! 2. the tree is flattened into composite keys (see [`crate::Mapping`])
//! 3. every entry becomes one line, except entries whose field is tagged `omitempty` and
//!    that hold their zero value
//!
//! Absent optionals are written as `KEY=` with an empty value. Strings are written
//! verbatim: a value containing a line break or `=` produces a line that cannot be decoded.
//!
//! ## Usage
//!
//! ```rust
//! use serde_envfile::to_string;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Cache { size: u32, #[serde(rename = "ttl,omitempty")] ttl: u32 }
//!
//! assert_eq!(to_string(&Cache { size: 64, ttl: 0 }).unwrap(), "size=64\n");
//! assert_eq!(to_string(&Cache { size: 64, ttl: 30 }).unwrap(), "size=64\nttl=30\n");
//! ```
//!
//! ## Direct Encoder Usage
//!
//! ```rust
//! use serde_envfile::Encoder;
//!
//! let mut encoder = Encoder::new(Vec::new());
//! encoder.encode_with_prefix("ports", &vec![80u16, 443]).unwrap();
//! assert_eq!(encoder.into_inner(), b"ports_0=80\nports_1=443\n");
//! ```

use crate::map::{join_key, Mapping};
use crate::{EnvOptions, Error, Field, Record, Result, Scalar, Value};
use indexmap::IndexMap;
use log::trace;
use serde::ser::{self, Impossible, Serialize};
use std::io::{self, Write};

/// The env file encoder.
///
/// Writes one `KEY=VALUE` line per flattened entry into the wrapped writer.
pub struct Encoder<W> {
    writer: W,
    options: EnvOptions,
}

impl<W> Encoder<W>
where
    W: io::Write,
{
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, EnvOptions::default())
    }

    pub fn with_options(writer: W, options: EnvOptions) -> Self {
        Encoder { writer, options }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encodes `value` under the configured root prefix.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedType`] and [`Error::DuplicateKey`] from flattening, or
    /// [`Error::Io`] when the writer fails.
    pub fn encode<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.encode_with_prefix("", value)
    }

    /// Encodes `value` with `prefix` appended to the configured root prefix.
    ///
    /// # Errors
    ///
    /// Same as [`Encoder::encode`].
    pub fn encode_with_prefix<T>(&mut self, prefix: &str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let mut tree = to_value(value)?;
        let root = join_key(&self.options.prefix, prefix);
        let mapping = Mapping::build_with(&root, &mut tree, self.options.uppercase)?;

        for (key, entry) in mapping.iter() {
            if entry.should_omit() {
                trace!("omitting zero value at {key}");
                continue;
            }
            self.write_entry(key, entry.value())?;
        }
        Ok(())
    }

    fn write_entry(&mut self, key: &str, value: &Value) -> Result<()> {
        let written = match value {
            Value::Scalar(scalar) => writeln!(self.writer, "{key}={scalar}"),
            Value::Absent => writeln!(self.writer, "{key}="),
            Value::Raw { text, .. } => writeln!(self.writer, "{key}={text}"),
            // flattening never yields containers
            Value::Seq(_) | Value::Map(_) | Value::Record(_) => return Ok(()),
        };
        written.map_err(|e| Error::io(&e.to_string()))
    }
}

/// Serialize any `T: Serialize` into a [`Value`] tree.
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] for enums, `()`, 128-bit integers, maps with
/// non-text keys and field descriptors without a name. A unit struct becomes a record
/// without fields.
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    value.serialize(ValueSerializer)
}

/// Serializer whose output is a [`Value`] tree.
pub struct ValueSerializer;

pub struct SerializeVec {
    vec: Vec<Value>,
}

pub struct SerializeMap {
    map: IndexMap<String, Value>,
    current_key: Option<String>,
}

pub struct SerializeRecord {
    name: &'static str,
    fields: Vec<Field>,
}

fn unsupported_enum(name: &str, variant: &str) -> Error {
    Error::unsupported_type(&format!("enum variant {name}::{variant}"))
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = Impossible<Value, Error>;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeRecord;
    type SerializeStructVariant = Impossible<Value, Error>;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Scalar(Scalar::Bool(v)))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::Scalar(Scalar::I8(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::Scalar(Scalar::I16(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::Scalar(Scalar::I32(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Scalar(Scalar::I64(v)))
    }

    fn serialize_i128(self, _v: i128) -> Result<Value> {
        Err(Error::unsupported_type("i128"))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::Scalar(Scalar::U8(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::Scalar(Scalar::U16(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::Scalar(Scalar::U32(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(Value::Scalar(Scalar::U64(v)))
    }

    fn serialize_u128(self, _v: u128) -> Result<Value> {
        Err(Error::unsupported_type("u128"))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::Scalar(Scalar::F32(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Scalar(Scalar::F64(v)))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::Scalar(Scalar::Char(v)))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::Scalar(Scalar::Str(v.to_string())))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        let vec = v.iter().map(|&b| Value::Scalar(Scalar::U8(b))).collect();
        Ok(Value::Seq(vec))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Absent)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Err(Error::unsupported_type("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Value> {
        Ok(Value::Record(Record {
            name,
            fields: Vec::new(),
        }))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Err(unsupported_enum(name, variant))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        Err(unsupported_enum(name, variant))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec> {
        Ok(SerializeVec::new(len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec> {
        Ok(SerializeVec::new(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeVec> {
        Ok(SerializeVec::new(len))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(unsupported_enum(name, variant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeMap> {
        Ok(SerializeMap {
            map: IndexMap::new(),
            current_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<SerializeRecord> {
        Ok(SerializeRecord {
            name,
            fields: Vec::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(unsupported_enum(name, variant))
    }
}

impl SerializeVec {
    fn new(capacity: usize) -> Self {
        SerializeVec {
            vec: Vec::with_capacity(capacity),
        }
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.vec.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Seq(self.vec))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.current_key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        self.map.insert(key, to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Map(self.map))
    }
}

impl ser::SerializeStruct for SerializeRecord {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.fields.push(Field::new(key, to_value(value)?)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Record(Record {
            name: self.name,
            fields: self.fields,
        }))
    }
}

/// Accepts only text-like map keys.
struct MapKeySerializer;

fn key_must_be_text(found: &str) -> Error {
    Error::unsupported_type(&format!("map key must be text, found {found}"))
}

macro_rules! reject_map_key {
    ($($method:ident($ty:ty),)*) => {
        $(
            fn $method(self, _v: $ty) -> Result<String> {
                Err(key_must_be_text(stringify!($ty)))
            }
        )*
    };
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = Error;

    type SerializeSeq = Impossible<String, Error>;
    type SerializeTuple = Impossible<String, Error>;
    type SerializeTupleStruct = Impossible<String, Error>;
    type SerializeTupleVariant = Impossible<String, Error>;
    type SerializeMap = Impossible<String, Error>;
    type SerializeStruct = Impossible<String, Error>;
    type SerializeStructVariant = Impossible<String, Error>;

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    reject_map_key! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_bytes(&[u8]),
    }

    fn serialize_none(self) -> Result<String> {
        Err(key_must_be_text("none"))
    }

    fn serialize_some<T>(self, _value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(key_must_be_text("optional"))
    }

    fn serialize_unit(self) -> Result<String> {
        Err(key_must_be_text("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<String> {
        Err(key_must_be_text(name))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Err(unsupported_enum(name, variant))
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(unsupported_enum(name, variant))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_must_be_text("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_must_be_text("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_must_be_text(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(unsupported_enum(name, variant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_must_be_text("map"))
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_must_be_text(name))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(unsupported_enum(name, variant))
    }
}
