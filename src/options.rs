//! Configuration options for env file encoding and decoding.
//!
//! [`EnvOptions`] replaces process-global flags: build it once at start-up (for example with
//! [`EnvOptions::from_env`]) and pass it to the `*_with_options` entry points.
//!
//! ## Examples
//!
//! ```rust
//! use serde_envfile::{to_string_with_options, EnvOptions};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Server { host: String, port: u16 }
//!
//! let server = Server { host: "localhost".to_string(), port: 8080 };
//! let options = EnvOptions::new().with_prefix("app").with_uppercase(true);
//! let env = to_string_with_options(&server, options).unwrap();
//! assert_eq!(env, "APP_HOST=localhost\nAPP_PORT=8080\n");
//! ```

/// Environment variable that turns on upper-cased keys.
pub const UPPERCASE_VAR: &str = "ENCODING_ENV_UPPERCASE";

/// Environment variable holding the global key prefix.
pub const PREFIX_VAR: &str = "ENCODING_ENV_PREFIX";

/// Configuration options for key generation.
///
/// Both options only change the composite keys; values are never affected.
///
/// # Examples
///
/// ```rust
/// use serde_envfile::EnvOptions;
///
/// let options = EnvOptions::new();
/// assert!(!options.uppercase);
/// assert!(options.prefix.is_empty());
///
/// let options = EnvOptions::new().with_prefix("svc").with_uppercase(true);
/// assert_eq!(options.prefix, "svc");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvOptions {
    /// Upper-case every composite key (after the prefix is applied).
    pub uppercase: bool,
    /// Root prefix prepended to every key as `prefix_key`. Empty means no prefix.
    pub prefix: String,
}

impl EnvOptions {
    /// Creates default options (no case folding, empty prefix).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads [`UPPERCASE_VAR`] and [`PREFIX_VAR`] from the process environment.
    ///
    /// Intended to be called once at process start; the result is then passed around
    /// explicitly.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds options from an arbitrary variable lookup.
    ///
    /// Upper-casing is enabled when the variable is non-empty and is not one of `0`,
    /// `false`, `f` or `n` (compared case-insensitively).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_envfile::EnvOptions;
    ///
    /// let options = EnvOptions::from_lookup(|name| match name {
    ///     "ENCODING_ENV_UPPERCASE" => Some("yes".to_string()),
    ///     "ENCODING_ENV_PREFIX" => Some("app".to_string()),
    ///     _ => None,
    /// });
    /// assert!(options.uppercase);
    /// assert_eq!(options.prefix, "app");
    /// ```
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let uppercase = lookup(UPPERCASE_VAR).is_some_and(|flag| is_truthy(&flag));
        let prefix = lookup(PREFIX_VAR).unwrap_or_default();
        log::debug!("env options: uppercase={uppercase}, prefix={prefix:?}");
        EnvOptions { uppercase, prefix }
    }

    /// Enables or disables upper-cased keys.
    #[must_use]
    pub fn with_uppercase(mut self, uppercase: bool) -> Self {
        self.uppercase = uppercase;
        self
    }

    /// Sets the root key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

fn is_truthy(flag: &str) -> bool {
    if flag.is_empty() || flag == "0" {
        return false;
    }
    let folded = flag.to_uppercase();
    !matches!(folded.as_str(), "FALSE" | "F" | "N")
}
