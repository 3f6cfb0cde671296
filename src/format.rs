//! Env File Format
//!
//! This module documents the line format read and written by this library.
//!
//! # Overview
//!
//! An env file is UTF-8 text made of `\n`-separated records. Each record binds one
//! composite key to the text form of one scalar:
//!
//! ```text
//! b=123
//! c_cb=7
//! blabla_0_2=3
//! ```
//!
//! There is no header, no quoting and no comment syntax.
//!
//! # Records
//!
//! **Rules**:
//! - A record contains exactly one `=`. Everything before it is the key, everything after
//!   it is the value.
//! - The key must not be empty. The value may be.
//! - A trailing `\r` is dropped, so CRLF files decode.
//! - The last record does not need a line break.
//! - A blank line is malformed, like any other line without `=`.
//!
//! ```rust
//! use serde_envfile::{from_str_into, Error};
//!
//! let mut port = 0u16;
//! assert!(matches!(
//!     from_str_into("noequalsign", &mut port),
//!     Err(Error::MalformedLine { line: 1, .. })
//! ));
//! assert!(matches!(
//!     from_str_into("=8080", &mut port),
//!     Err(Error::MalformedLine { .. })
//! ));
//! ```
//!
//! # Keys
//!
//! Keys are built top-down. A child of key `P` named `N` gets `P_N`; at the root it gets `N`.
//!
//! | Container | Child name | Example |
//! |-----------|------------|---------|
//! | Struct | field name or `rename` | `c_cb` |
//! | Sequence, tuple | element index | `d_0_1` |
//! | Map | entry key | `e_abc_0` |
//! | `Option` | nothing, `Some(v)` is keyed like `v` | `retry` |
//!
//! Only scalars and absent optionals get a record. A root scalar is keyed by the prefix
//! alone, which is the empty string unless a prefix was configured.
//!
//! Two leaves that end up with the same key are rejected, including a field whose name
//! looks like a generated one:
//!
//! ```rust
//! use serde::Serialize;
//! use serde_envfile::{to_string, Error};
//!
//! #[derive(Serialize)]
//! struct Clash {
//!     #[serde(rename = "d_0")]
//!     first: u8,
//!     d: Vec<u8>,
//! }
//!
//! let err = to_string(&Clash { first: 1, d: vec![2] }).unwrap_err();
//! assert_eq!(err, Error::DuplicateKey("d_0".into()));
//! ```
//!
//! # Field Descriptors
//!
//! A struct field's serde name is read as a comma-separated descriptor. The first segment
//! is the external name. An `omitempty` segment drops the record while the field holds its
//! zero value. Other segments are ignored.
//!
//! ```rust
//! use serde::Serialize;
//! use serde_envfile::to_string;
//!
//! #[derive(Serialize)]
//! struct Tls {
//!     #[serde(rename = "ca,omitempty")]
//!     ca: String,
//!     #[serde(rename = "port")]
//!     port: u16,
//! }
//!
//! assert_eq!(to_string(&Tls { ca: String::new(), port: 0 }).unwrap(), "port=0\n");
//! assert_eq!(
//!     to_string(&Tls { ca: "/etc/ca.pem".into(), port: 0 }).unwrap(),
//!     "ca=/etc/ca.pem\nport=0\n"
//! );
//! ```
//!
//! The flag belongs to the field itself. Elements of a sequence or map field are always
//! written.
//!
//! # Scalars
//!
//! | Type | Written as | Read from |
//! |------|------------|-----------|
//! | `bool` | `true` / `false` | `1 t T true TRUE True`, `0 f F false FALSE False` |
//! | Integers | decimal | decimal, sign allowed for signed types only |
//! | `f32`, `f64` | shortest decimal of the `f64` value | any float literal |
//! | `String` | verbatim | verbatim |
//! | `char` | verbatim | exactly one character |
//! | Absent `Option` | empty value | allocates the option |
//!
//! Numbers are checked against the declared width:
//!
//! ```rust
//! use serde_envfile::{from_str_into, Error};
//!
//! let mut small = 0u8;
//! assert!(matches!(from_str_into("=300", &mut small), Err(Error::MalformedLine { .. })));
//!
//! let mut small = vec![0u8];
//! assert!(matches!(from_str_into("0=300", &mut small), Err(Error::Range { .. })));
//!
//! let mut unsigned = vec![0u32];
//! assert!(matches!(from_str_into("0=-1", &mut unsigned), Err(Error::Parse { .. })));
//! ```
//!
//! # Options
//!
//! - **Prefix**: joined in front of every key, `app` turns `port` into `app_port`
//! - **Upper-casing**: folds every key, including map keys; it can create collisions
//!
//! Both can be read from `ENCODING_ENV_PREFIX` and `ENCODING_ENV_UPPERCASE` with
//! [`EnvOptions::from_env`](crate::EnvOptions::from_env).
//!
//! # Limitations
//!
//! - **Escaping**: none; values containing `\n` or `=` do not survive a round trip
//! - **Enums and `()`**: not representable; a unit struct is a record without fields
//! - **Map keys**: must be text
//! - **Record order**: follows the value's structure but is not part of the format

// This module contains only documentation; no implementation code
