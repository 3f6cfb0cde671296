//! Env file decoding.
//!
//! This module provides the [`Decoder`] that reads `KEY=VALUE` lines into a pre-shaped
//! destination and the [`ValueDeserializer`] that turns a [`Value`] tree back into a Rust
//! value.
//!
//! ## Overview
//!
//! Decoding writes into a value the caller already has:
//!
//! 1. the destination is serialized into a tree, which fixes the set of recognized keys
//!    (sequence lengths, map keys and optional presence are taken as they are)
//! 2. each input line is parsed and written into the leaf its key locates; unknown keys are
//!    skipped
//! 3. the tree is deserialized back and replaces the destination
//!
//! Sequences and maps are never grown: lines for positions the destination does not have
//! are dropped. An absent optional that receives a line is allocated and holds the text.
//!
//! ## Usage
//!
//! ```rust
//! use serde_envfile::from_str_into;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Pool { size: u8, hosts: Vec<String> }
//!
//! let mut pool = Pool { size: 0, hosts: vec![String::new(); 2] };
//! from_str_into("size=4\nhosts_0=a\nhosts_1=b\nhosts_2=c\n", &mut pool).unwrap();
//! assert_eq!(pool, Pool { size: 4, hosts: vec!["a".into(), "b".into()] });
//! ```

use crate::map::{join_key, Mapping};
use crate::value::{parse_bool, parse_char, parse_f32, parse_f64, parse_int};
use crate::{to_value, EnvOptions, Error, Field, Result, Scalar, Value};
use indexmap::IndexMap;
use log::{debug, trace};
use serde::de::{self, DeserializeOwned, Deserializer as _, IntoDeserializer};
use serde::{forward_to_deserialize_any, Deserialize, Serialize};
use std::io::{self, BufRead};

/// The env file decoder.
///
/// Reads `\n`-separated `KEY=VALUE` lines from a buffered reader.
pub struct Decoder<R> {
    reader: io::BufReader<R>,
    options: EnvOptions,
}

impl<R> Decoder<R>
where
    R: io::Read,
{
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, EnvOptions::default())
    }

    pub fn with_options(reader: R, options: EnvOptions) -> Self {
        Decoder {
            reader: io::BufReader::new(reader),
            options,
        }
    }

    /// Decodes all remaining input into `destination`.
    ///
    /// # Errors
    ///
    /// Any error aborts decoding and leaves `destination` untouched.
    pub fn decode_into<T>(&mut self, destination: &mut T) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        self.decode_with_prefix("", destination)
    }

    /// Decodes into `destination` with `prefix` appended to the configured root prefix.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::decode_into`].
    pub fn decode_with_prefix<T>(&mut self, prefix: &str, destination: &mut T) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut tree = to_value(&*destination)?;
        {
            let root = join_key(&self.options.prefix, prefix);
            let mut mapping = Mapping::build_with(&root, &mut tree, self.options.uppercase)?;
            self.apply_lines(&mut mapping)?;
        }
        *destination = T::deserialize(ValueDeserializer::new(tree))?;
        Ok(())
    }

    fn apply_lines(&mut self, mapping: &mut Mapping<'_>) -> Result<()> {
        let mut buf = String::new();
        let mut number = 0;
        loop {
            buf.clear();
            let read = self
                .reader
                .read_line(&mut buf)
                .map_err(|e| Error::io(&e.to_string()))?;
            if read == 0 {
                return Ok(());
            }
            number += 1;

            let line = buf.strip_suffix('\n').unwrap_or(&buf);
            let line = line.strip_suffix('\r').unwrap_or(line);
            let (key, text) = split_line(number, line)?;
            match mapping.get_mut(key) {
                Some(entry) => assign(entry.value_mut(), key, text)?,
                None => debug!("ignoring unknown key {key:?} on line {number}"),
            }
        }
    }
}

/// Splits a line at its only `=` into a non-empty key and a possibly empty value.
fn split_line(number: usize, line: &str) -> Result<(&str, &str)> {
    match line.split_once('=') {
        Some((key, text)) if !key.is_empty() && !text.contains('=') => Ok((key, text)),
        _ => Err(Error::malformed_line(number, line)),
    }
}

/// Writes `text` into the located leaf.
fn assign(value: &mut Value, key: &str, text: &str) -> Result<()> {
    match value {
        Value::Scalar(scalar) => scalar.assign(key, text),
        Value::Absent | Value::Raw { .. } => {
            trace!("allocating optional at {key}");
            *value = Value::Raw {
                key: key.to_string(),
                text: text.to_string(),
            };
            Ok(())
        }
        Value::Seq(_) | Value::Map(_) | Value::Record(_) => {
            Err(Error::unassignable(key, value.kind_name()))
        }
    }
}

/// Deserializer reading from a [`Value`] tree.
///
/// Scalars are handed to the visitor with their exact width. [`Value::Raw`] text is
/// converted according to the type the visitor asks for.
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    #[must_use]
    pub fn new(value: Value) -> Self {
        ValueDeserializer { value }
    }
}

/// Deserialize an instance of type `T` from a [`Value`] tree.
///
/// # Examples
///
/// ```rust
/// use serde_envfile::{from_value, Value};
///
/// let ports: Vec<u16> = from_value(Value::Seq(vec![Value::from(80u16)])).unwrap();
/// assert_eq!(ports, [80]);
/// ```
///
/// # Errors
///
/// Returns an error if the tree's shape does not match `T`.
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}

fn visit_scalar<'de, V>(scalar: Scalar, visitor: V) -> Result<V::Value>
where
    V: de::Visitor<'de>,
{
    match scalar {
        Scalar::Bool(b) => visitor.visit_bool(b),
        Scalar::I8(n) => visitor.visit_i8(n),
        Scalar::I16(n) => visitor.visit_i16(n),
        Scalar::I32(n) => visitor.visit_i32(n),
        Scalar::I64(n) => visitor.visit_i64(n),
        Scalar::U8(n) => visitor.visit_u8(n),
        Scalar::U16(n) => visitor.visit_u16(n),
        Scalar::U32(n) => visitor.visit_u32(n),
        Scalar::U64(n) => visitor.visit_u64(n),
        Scalar::F32(n) => visitor.visit_f32(n),
        Scalar::F64(n) => visitor.visit_f64(n),
        Scalar::Char(c) => visitor.visit_char(c),
        Scalar::Str(s) => visitor.visit_string(s),
    }
}

macro_rules! deserialize_raw_int {
    ($($method:ident => $visit:ident($ty:ty),)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                match self.value {
                    Value::Raw { key, text } => {
                        visitor.$visit(parse_int::<$ty>(&key, &text, stringify!($ty))?)
                    }
                    other => ValueDeserializer::new(other).deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Scalar(scalar) => visit_scalar(scalar, visitor),
            Value::Absent => visitor.visit_none(),
            Value::Raw { text, .. } => visitor.visit_string(text),
            Value::Seq(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            Value::Map(entries) => visitor.visit_map(MapDeserializer::new(entries)),
            Value::Record(record) => visitor.visit_map(RecordDeserializer::new(record.fields)),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Raw { key, text } => visitor.visit_bool(parse_bool(&key, &text)?),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    deserialize_raw_int! {
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Raw { key, text } => visitor.visit_f32(parse_f32(&key, &text)?),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Raw { key, text } => visitor.visit_f64(parse_f64(&key, &text)?),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Raw { key, text } => visitor.visit_char(parse_char(&key, &text)?),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Absent => visitor.visit_none(),
            other => visitor.visit_some(ValueDeserializer::new(other)),
        }
    }

    fn deserialize_unit<V>(self, _visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        Err(Error::unsupported_type("unit"))
    }

    /// A unit struct is a record without fields.
    fn deserialize_unit_struct<V>(self, name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Record(record) if record.fields.is_empty() => visitor.visit_unit(),
            Value::Raw { key, .. } => Err(Error::unassignable(&key, "record")),
            other => Err(Error::custom(format!(
                "expected unit struct {name}, found {}",
                other.kind_name()
            ))),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Raw { key, .. } => Err(Error::unassignable(&key, "sequence")),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Raw { key, .. } => Err(Error::unassignable(&key, "map")),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Raw { key, .. } => Err(Error::unassignable(&key, "record")),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        Err(Error::unsupported_type(&format!("enum {name}")))
    }

    forward_to_deserialize_any! {
        i128 u128 str string bytes byte_buf identifier ignored_any
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(map: IndexMap<String, Value>) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Hands record fields to the visitor under their serde tag, so `rename` resolves them.
struct RecordDeserializer {
    iter: std::vec::IntoIter<Field>,
    value: Option<Value>,
}

impl RecordDeserializer {
    fn new(fields: Vec<Field>) -> Self {
        RecordDeserializer {
            iter: fields.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for RecordDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(field) => {
                self.value = Some(field.value);
                let tag: de::value::StrDeserializer<'_, Error> = field.tag.into_deserializer();
                seed.deserialize(tag).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        use std::fmt;

        struct ScalarVisitor;

        impl<'de> de::Visitor<'de> for ScalarVisitor {
            type Value = Scalar;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a boolean, number or string")
            }

            fn visit_bool<E>(self, v: bool) -> std::result::Result<Scalar, E> {
                Ok(Scalar::Bool(v))
            }

            fn visit_i8<E>(self, v: i8) -> std::result::Result<Scalar, E> {
                Ok(Scalar::I8(v))
            }

            fn visit_i16<E>(self, v: i16) -> std::result::Result<Scalar, E> {
                Ok(Scalar::I16(v))
            }

            fn visit_i32<E>(self, v: i32) -> std::result::Result<Scalar, E> {
                Ok(Scalar::I32(v))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Scalar, E> {
                Ok(Scalar::I64(v))
            }

            fn visit_u8<E>(self, v: u8) -> std::result::Result<Scalar, E> {
                Ok(Scalar::U8(v))
            }

            fn visit_u16<E>(self, v: u16) -> std::result::Result<Scalar, E> {
                Ok(Scalar::U16(v))
            }

            fn visit_u32<E>(self, v: u32) -> std::result::Result<Scalar, E> {
                Ok(Scalar::U32(v))
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Scalar, E> {
                Ok(Scalar::U64(v))
            }

            fn visit_f32<E>(self, v: f32) -> std::result::Result<Scalar, E> {
                Ok(Scalar::F32(v))
            }

            fn visit_f64<E>(self, v: f64) -> std::result::Result<Scalar, E> {
                Ok(Scalar::F64(v))
            }

            fn visit_char<E>(self, v: char) -> std::result::Result<Scalar, E> {
                Ok(Scalar::Char(v))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Scalar, E> {
                Ok(Scalar::Str(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> std::result::Result<Scalar, E> {
                Ok(Scalar::Str(v))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
    struct Flags {
        verbose: bool,
        level: Option<u8>,
        name: Option<String>,
        letter: char,
    }

    #[test]
    fn test_split_line() {
        assert_eq!(split_line(1, "a=b"), Ok(("a", "b")));
        assert_eq!(split_line(1, "a="), Ok(("a", "")));
        for bad in ["noequalsign", "=value", "a=b=c", ""] {
            assert!(matches!(
                split_line(4, bad),
                Err(Error::MalformedLine { line: 4, .. })
            ));
        }
    }

    #[test]
    fn test_absent_optional_allocates() {
        let mut flags = Flags {
            letter: 'x',
            ..Flags::default()
        };
        let input = "verbose=T\nlevel=9\nname=\nletter=q\n";
        Decoder::new(input.as_bytes()).decode_into(&mut flags).unwrap();

        assert_eq!(
            flags,
            Flags {
                verbose: true,
                level: Some(9),
                name: Some(String::new()),
                letter: 'q',
            }
        );
    }

    #[test]
    fn test_present_char_takes_one_character() {
        let mut flags = Flags {
            letter: 'x',
            ..Flags::default()
        };
        for bad in ["ab", ""] {
            let err = Decoder::new(format!("letter={bad}\n").as_bytes())
                .decode_into(&mut flags)
                .unwrap_err();
            assert_eq!(err, Error::parse("letter", bad, "char"));
        }
        assert_eq!(flags.letter, 'x');

        Decoder::new("letter=ß\n".as_bytes())
            .decode_into(&mut flags)
            .unwrap();
        assert_eq!(flags.letter, 'ß');
    }

    #[test]
    fn test_allocated_optional_is_typed_on_deserialize() {
        let mut flags = Flags::default();
        let err = Decoder::new("level=300".as_bytes())
            .decode_into(&mut flags)
            .unwrap_err();
        assert_eq!(err, Error::range("level", "300", "u8"));

        let err = Decoder::new("level=".as_bytes())
            .decode_into(&mut flags)
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert_eq!(flags, Flags::default());
    }

    #[test]
    fn test_allocated_container_is_unassignable() {
        let mut hosts: Option<Vec<String>> = None;
        let err = Decoder::new("=x".as_bytes()).decode_into(&mut hosts);
        assert!(matches!(err, Err(Error::MalformedLine { .. })));

        let mut holder =
            std::collections::BTreeMap::from([("hosts".to_string(), None::<Vec<String>>)]);
        let err = Decoder::new("hosts=a".as_bytes())
            .decode_into(&mut holder)
            .unwrap_err();
        assert_eq!(err, Error::unassignable("hosts", "sequence"));
    }

    #[test]
    fn test_unit_struct_decodes_from_empty_record() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Marker;

        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Tagged {
            a: u8,
            m: Marker,
            later: Option<Marker>,
        }

        let mut tagged = Tagged {
            a: 0,
            m: Marker,
            later: None,
        };
        Decoder::new("a=1\nm=x\n".as_bytes())
            .decode_into(&mut tagged)
            .unwrap();
        assert_eq!(tagged.a, 1);

        let err = Decoder::new("later=x".as_bytes())
            .decode_into(&mut tagged)
            .unwrap_err();
        assert_eq!(err, Error::unassignable("later", "record"));
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let mut flags = Flags {
            letter: 'x',
            ..Flags::default()
        };
        Decoder::new("verbose=1\r\nletter=z".as_bytes())
            .decode_into(&mut flags)
            .unwrap();
        assert!(flags.verbose);
        assert_eq!(flags.letter, 'z');
    }

    #[test]
    fn test_scalar_roundtrips_through_tree() {
        for scalar in [Scalar::U16(7), Scalar::Char('q')] {
            let tree = to_value(&scalar).unwrap();
            assert_eq!(from_value::<Scalar>(tree).unwrap(), scalar);
        }
    }
}
