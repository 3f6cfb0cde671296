//! Flattening of a value tree into composite keys.
//!
//! A [`Mapping`] assigns one key to every leaf of a [`Value`] tree and keeps a mutable
//! handle on that leaf. Encode reads through the handles; decode writes through them.
//!
//! ## Key Scheme
//!
//! For a parent key `P` and a child name `N` the child key is `P_N`, or just `N` at the
//! root:
//!
//! - record fields use the field's external name
//! - sequence elements use their index
//! - map entries use their key
//! - optionals are transparent: `Some(v)` is keyed like `v`, `None` is a leaf of its own
//!
//! Containers never get an entry. An empty sequence therefore contributes no key at all.
//!
//! ## Examples
//!
//! ```rust
//! use serde_envfile::{flatten, to_value};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Db { host: String, replicas: Vec<String> }
//!
//! let db = Db { host: "db0".into(), replicas: vec!["db1".into(), "db2".into()] };
//! let mut tree = to_value(&db).unwrap();
//! let mapping = flatten("db", &mut tree).unwrap();
//!
//! let keys: Vec<&str> = mapping.keys().collect();
//! assert_eq!(keys, ["db_host", "db_replicas_0", "db_replicas_1"]);
//! ```

use crate::{EnvOptions, Error, Result, Value};
use indexmap::map::{self, Entry as Slot};
use indexmap::IndexMap;
use log::trace;

/// A flattened leaf: a handle on the located value and the omit flag of the field that
/// produced it.
#[derive(Debug)]
pub struct Entry<'a> {
    value: &'a mut Value,
    omit_empty: bool,
}

impl<'a> Entry<'a> {
    #[must_use]
    pub fn value(&self) -> &Value {
        &*self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut *self.value
    }

    #[must_use]
    pub fn omit_empty(&self) -> bool {
        self.omit_empty
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.value.is_absent()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Returns `true` when the encoder must skip this entry.
    #[must_use]
    pub fn should_omit(&self) -> bool {
        self.omit_empty && self.value.is_zero()
    }
}

/// Composite key to leaf handle, built fresh for each encode or decode call.
///
/// The mapping borrows the tree mutably for its whole life, so it cannot outlive the call
/// that built it.
#[derive(Debug)]
pub struct Mapping<'a> {
    entries: IndexMap<String, Entry<'a>>,
    uppercase: bool,
}

impl<'a> Mapping<'a> {
    /// Flattens `value` under `prefix`.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateKey`] when two leaves end up with the same key.
    pub fn build(prefix: &str, value: &'a mut Value) -> Result<Self> {
        Self::build_with(prefix, value, false)
    }

    /// Flattens `value` under `options.prefix`, upper-casing keys when requested.
    ///
    /// # Errors
    ///
    /// Same as [`Mapping::build`]; keys that only collide after upper-casing count too.
    pub fn with_options(value: &'a mut Value, options: &EnvOptions) -> Result<Self> {
        Self::build_with(&options.prefix, value, options.uppercase)
    }

    pub(crate) fn build_with(prefix: &str, value: &'a mut Value, uppercase: bool) -> Result<Self> {
        let mut mapping = Mapping {
            entries: IndexMap::new(),
            uppercase,
        };
        mapping.walk(prefix.to_string(), value, false)?;
        Ok(mapping)
    }

    fn walk(&mut self, key: String, value: &'a mut Value, omit_empty: bool) -> Result<()> {
        match value {
            Value::Seq(items) => {
                for (index, item) in items.iter_mut().enumerate() {
                    self.walk(join_key(&key, &index.to_string()), item, false)?;
                }
                Ok(())
            }
            Value::Map(entries) => {
                for (name, item) in entries.iter_mut() {
                    self.walk(join_key(&key, name), item, false)?;
                }
                Ok(())
            }
            Value::Record(record) => {
                for field in record.fields.iter_mut() {
                    let child = join_key(&key, &field.name);
                    self.walk(child, &mut field.value, field.omit_empty)?;
                }
                Ok(())
            }
            Value::Scalar(_) | Value::Absent | Value::Raw { .. } => {
                self.store(key, value, omit_empty)
            }
        }
    }

    fn store(&mut self, key: String, value: &'a mut Value, omit_empty: bool) -> Result<()> {
        let key = if self.uppercase {
            key.to_uppercase()
        } else {
            key
        };
        match self.entries.entry(key) {
            Slot::Occupied(occupied) => Err(Error::duplicate_key(occupied.key())),
            Slot::Vacant(vacant) => {
                trace!("mapped {} -> {}", vacant.key(), value.kind_name());
                vacant.insert(Entry { value, omit_empty });
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Entry<'a>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry<'a>> {
        self.entries.get_mut(key)
    }

    /// Keys in traversal order. Callers must not depend on this order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> map::Iter<'_, String, Entry<'a>> {
        self.entries.iter()
    }
}

/// Joins a parent key and a child name with `_`; an empty parent yields the name alone.
///
/// # Examples
///
/// ```rust
/// use serde_envfile::join_key;
///
/// assert_eq!(join_key("", "port"), "port");
/// assert_eq!(join_key("db", "port"), "db_port");
/// ```
#[must_use]
pub fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}_{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{to_value, Scalar};
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Tagged {
        #[serde(rename = "name,omitempty")]
        name: String,
        #[serde(rename = "limits,omitempty")]
        limits: Vec<u8>,
        #[serde(rename = "retry,omitempty")]
        retry: Option<u8>,
    }

    #[test]
    fn test_omit_flag_stays_on_own_level() {
        let mut tree = to_value(&Tagged {
            name: String::new(),
            limits: vec![0],
            retry: Some(0),
        })
        .unwrap();
        let mapping = Mapping::build("", &mut tree).unwrap();

        assert!(mapping.get("name").unwrap().omit_empty());
        // sequence leaves carry no flag
        assert!(!mapping.get("limits_0").unwrap().omit_empty());
        // a present optional hands the flag to its scalar
        assert!(mapping.get("retry").unwrap().should_omit());
    }

    #[test]
    fn test_absent_optional_is_leaf() {
        let mut tree = to_value(&BTreeMap::from([("a", None::<Vec<u8>>)])).unwrap();
        let mapping = Mapping::build("", &mut tree).unwrap();
        assert_eq!(mapping.len(), 1);
        assert!(mapping.get("a").unwrap().is_absent());
    }

    #[test]
    fn test_index_collision() {
        #[derive(Serialize)]
        struct Clash {
            #[serde(rename = "d_0")]
            first: u8,
            d: Vec<u8>,
        }

        let mut tree = to_value(&Clash { first: 1, d: vec![2] }).unwrap();
        assert_eq!(
            Mapping::build("", &mut tree).unwrap_err(),
            Error::DuplicateKey("d_0".to_string())
        );
    }

    #[test]
    fn test_uppercase_collision() {
        let mut tree = to_value(&BTreeMap::from([("a", 1u8), ("A", 2u8)])).unwrap();
        assert!(Mapping::build("", &mut tree).is_ok());

        let options = EnvOptions::new().with_uppercase(true);
        let mut tree = to_value(&BTreeMap::from([("a", 1u8), ("A", 2u8)])).unwrap();
        assert!(matches!(
            Mapping::with_options(&mut tree, &options),
            Err(Error::DuplicateKey(_))
        ));
    }

    #[test]
    fn test_root_scalar_and_prefix() {
        let mut tree = Value::from(5u8);
        let mapping = Mapping::build("", &mut tree).unwrap();
        assert!(mapping.contains_key(""));

        let mut tree = Value::from(5u8);
        let options = EnvOptions::new().with_prefix("app").with_uppercase(true);
        let mut mapping = Mapping::with_options(&mut tree, &options).unwrap();
        let entry = mapping.get_mut("APP").unwrap();
        *entry.value_mut() = Value::from(6u8);
        drop(mapping);
        assert_eq!(tree, Value::Scalar(Scalar::U8(6)));
    }
}
