//! Error types for env file encoding and decoding.
//!
//! Every failure aborts the whole encode or decode call. There is no
//! partial-success mode.
//!
//! ## Error Categories
//!
//! - **Shape errors**: [`Error::UnsupportedType`] and [`Error::DuplicateKey`], raised while a
//!   value is turned into a tree or flattened into keys
//! - **Input errors**: [`Error::MalformedLine`], raised while splitting decode input
//! - **Conversion errors**: [`Error::Parse`], [`Error::Range`] and [`Error::UnassignableType`],
//!   raised while writing text into a located value
//! - **I/O errors**: reader and writer failures
//!
//! ## Examples
//!
//! ```rust
//! use serde_envfile::{from_str_into, Error};
//!
//! let mut port: u16 = 0;
//! let err = from_str_into("noequalsign", &mut port).unwrap_err();
//! assert!(matches!(err, Error::MalformedLine { line: 1, .. }));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur during env file encoding/decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// A kind the value tree cannot represent (enums, unit, 128-bit integers, non-text map keys)
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Two flattened entries produced the same composite key
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Decode input line without exactly one `=` or with an empty key
    #[error("Malformed line {line}: {content:?}\nHelp: every line must look like KEY=VALUE")]
    MalformedLine { line: usize, content: String },

    /// Text could not be converted to the located scalar kind
    #[error("Cannot parse {value:?} as {expected} for key {key}")]
    Parse {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// Parsed number does not fit the declared width of the destination
    #[error("Value {value:?} is out of range for {expected} at key {key}")]
    Range {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// Decode reached a location that cannot hold text
    #[error("Cannot assign text to {kind} at key {key}")]
    UnassignableType { key: String, kind: &'static str },

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a malformed-line error for the 1-based input line `line`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_envfile::Error;
    ///
    /// let err = Error::malformed_line(3, "PORT");
    /// assert!(err.to_string().contains("line 3"));
    /// ```
    pub fn malformed_line(line: usize, content: &str) -> Self {
        Error::MalformedLine {
            line,
            content: content.to_string(),
        }
    }

    /// Creates a parse error for text that is not a valid `expected`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_envfile::Error;
    ///
    /// let err = Error::parse("debug", "maybe", "bool");
    /// assert!(err.to_string().contains("as bool"));
    /// ```
    pub fn parse(key: &str, value: &str, expected: &'static str) -> Self {
        Error::Parse {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }

    /// Creates a range error for a number that does not fit `expected`.
    pub fn range(key: &str, value: &str, expected: &'static str) -> Self {
        Error::Range {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }

    /// Creates an unassignable-type error for a container reached during decode.
    pub fn unassignable(key: &str, kind: &'static str) -> Self {
        Error::UnassignableType {
            key: key.to_string(),
            kind,
        }
    }

    /// Creates a duplicate-key error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_envfile::Error;
    ///
    /// let err = Error::duplicate_key("db_host");
    /// assert_eq!(err.to_string(), "Duplicate key: db_host");
    /// ```
    pub fn duplicate_key(key: &str) -> Self {
        Error::DuplicateKey(key.to_string())
    }

    /// Creates an unsupported type error for kinds that have no env representation.
    pub fn unsupported_type(msg: &str) -> Self {
        Error::UnsupportedType(msg.to_string())
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for reader/writer failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
