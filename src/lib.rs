//! # serde_envfile
//!
//! A Serde-compatible format that flattens nested values into `KEY=VALUE` lines, the way
//! environment files are written.
//!
//! ## How Keys Are Built
//!
//! Every scalar reachable inside a value gets one composite key, built by joining names
//! with `_`:
//!
//! - struct fields use their serde name (`rename` overrides it)
//! - sequence elements use their index
//! - map entries use their key
//! - `Option` adds nothing: `Some(v)` is keyed like `v`, `None` is written as `KEY=`
//!
//! A field renamed to `"name,omitempty"` is called `name` and its line is skipped while it
//! holds its zero value (`false`, `0`, `""` or `None`).
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use serde_envfile::{from_str_into, to_string};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Limits { cb: u16 }
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Config {
//!     b: i32,
//!     c: Limits,
//!     d: Vec<Vec<i32>>,
//! }
//!
//! let config = Config { b: 123, c: Limits { cb: 7 }, d: vec![vec![1, 2, 3]] };
//! let env = to_string(&config).unwrap();
//! assert!(env.lines().any(|line| line == "c_cb=7"));
//! assert!(env.lines().any(|line| line == "d_0_2=3"));
//!
//! // decode needs a destination that already has the right shape
//! let mut back = Config { b: 0, c: Limits { cb: 0 }, d: vec![vec![0; 3]] };
//! from_str_into(&env, &mut back).unwrap();
//! assert_eq!(back, config);
//! ```
//!
//! ## Decoding Into a Pre-Shaped Destination
//!
//! Decoding never invents structure. Sequence lengths, map keys and which optionals are
//! present all come from the destination; lines for anything else are ignored. The only
//! allocation decode performs is for an absent `Option` that receives a line.
//!
//! ## Limitations
//!
//! - Keys and values are not escaped. A string containing a line break or `=` encodes to a
//!   line that cannot be decoded.
//! - Enums, `()`, 128-bit integers and maps with non-text keys are rejected with
//!   [`Error::UnsupportedType`]. A unit struct has no fields and writes no line.
//! - Line order on encode follows the value's structure but is not part of the format.

pub mod de;
pub mod error;
pub mod format;
pub mod map;
pub mod options;
pub mod ser;
pub mod value;

pub use de::{from_value, Decoder, ValueDeserializer};
pub use error::{Error, Result};
pub use map::{join_key, Entry, Mapping};
pub use options::EnvOptions;
pub use ser::{to_value, Encoder, ValueSerializer};
pub use value::{Field, Record, Scalar, Value};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

/// Flatten a value tree into its composite keys under `prefix`.
///
/// # Examples
///
/// ```rust
/// use serde_envfile::{flatten, to_value};
///
/// let mut tree = to_value(&vec![vec![true], vec![false, true]]).unwrap();
/// let mapping = flatten("", &mut tree).unwrap();
/// let keys: Vec<&str> = mapping.keys().collect();
/// assert_eq!(keys, ["0_0", "1_0", "1_1"]);
/// ```
///
/// # Errors
///
/// Returns [`Error::DuplicateKey`] when two leaves produce the same key.
pub fn flatten<'a>(prefix: &str, value: &'a mut Value) -> Result<Mapping<'a>> {
    Mapping::build(prefix, value)
}

/// Encode any `T: Serialize` as env lines.
///
/// # Examples
///
/// ```rust
/// use serde_envfile::to_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: Option<i32> }
///
/// assert_eq!(to_string(&Point { x: 1, y: None }).unwrap(), "x=1\ny=\n");
/// ```
///
/// # Errors
///
/// Returns an error if the value contains an unsupported type or two keys collide.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with_options(value, EnvOptions::default())
}

/// Encode any `T: Serialize` as env lines with custom options.
///
/// # Errors
///
/// Same as [`to_string`]; upper-casing can also make keys collide.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with_options<T>(value: &T, options: EnvOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let bytes = to_vec_with_options(value, options)?;
    String::from_utf8(bytes).map_err(Error::custom)
}

/// Encode any `T: Serialize` as env lines into a byte vector.
///
/// # Errors
///
/// Same as [`to_string`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    to_vec_with_options(value, EnvOptions::default())
}

/// Encode any `T: Serialize` into a byte vector with custom options.
///
/// # Errors
///
/// Same as [`to_string_with_options`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec_with_options<T>(value: &T, options: EnvOptions) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut encoder = Encoder::with_options(Vec::with_capacity(256), options);
    encoder.encode(value)?;
    Ok(encoder.into_inner())
}

/// Encode any `T: Serialize` into a writer.
///
/// # Examples
///
/// ```rust
/// use serde_envfile::to_writer;
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &vec!["a", "b"]).unwrap();
/// assert_eq!(buffer, b"0=a\n1=b\n");
/// ```
///
/// # Errors
///
/// Returns an error if encoding fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    to_writer_with_options(writer, value, EnvOptions::default())
}

/// Encode any `T: Serialize` into a writer with custom options.
///
/// # Errors
///
/// Returns an error if encoding fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W, T>(writer: W, value: &T, options: EnvOptions) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    Encoder::with_options(writer, options).encode(value)
}

/// Decode env lines into an existing, pre-shaped destination.
///
/// # Examples
///
/// ```rust
/// use serde_envfile::from_str_into;
/// use std::collections::HashMap;
///
/// let mut ports = HashMap::from([("http".to_string(), 0u16)]);
/// from_str_into("http=80\nhttps=443\n", &mut ports).unwrap();
/// assert_eq!(ports.len(), 1);
/// assert_eq!(ports["http"], 80);
/// ```
///
/// # Errors
///
/// Returns an error on malformed lines, text that does not convert to the located type, or
/// a destination that cannot be flattened. The destination is unchanged on error.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_into<T>(s: &str, destination: &mut T) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    Decoder::new(s.as_bytes()).decode_into(destination)
}

/// Decode env lines into an existing destination with custom options.
///
/// # Errors
///
/// Same as [`from_str_into`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_into_with_options<T>(
    s: &str,
    destination: &mut T,
    options: EnvOptions,
) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    Decoder::with_options(s.as_bytes(), options).decode_into(destination)
}

/// Decode env bytes into an existing destination.
///
/// # Errors
///
/// Same as [`from_str_into`], plus [`Error::Custom`] for input that is not UTF-8.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice_into<T>(v: &[u8], destination: &mut T) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    let s = std::str::from_utf8(v).map_err(Error::custom)?;
    Decoder::new(s.as_bytes()).decode_into(destination)
}

/// Decode env lines from a reader into an existing destination.
///
/// # Errors
///
/// Same as [`from_str_into`], plus [`Error::Io`] for reader failures and input that is
/// not UTF-8.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader_into<R, T>(reader: R, destination: &mut T) -> Result<()>
where
    R: io::Read,
    T: Serialize + DeserializeOwned,
{
    Decoder::new(reader).decode_into(destination)
}

/// Decode env lines into `T::default()`.
///
/// Handy for flat structs; containers in the default value are usually empty, so their
/// keys are not recognized.
///
/// # Examples
///
/// ```rust
/// use serde_envfile::from_str;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
/// struct Server { host: String, port: u16 }
///
/// let server: Server = from_str("host=localhost\nport=8080").unwrap();
/// assert_eq!(server, Server { host: "localhost".into(), port: 8080 });
/// ```
///
/// # Errors
///
/// Same as [`from_str_into`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str<T>(s: &str) -> Result<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    from_slice(s.as_bytes())
}

/// Decode env bytes into `T::default()`.
///
/// # Errors
///
/// Same as [`from_slice_into`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T>(v: &[u8]) -> Result<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    let mut value = T::default();
    from_slice_into(v, &mut value)?;
    Ok(value)
}
