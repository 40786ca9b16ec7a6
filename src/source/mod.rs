//! # Value Sources
//!
//! A value source is one read-only precedence layer that placeholders are
//! looked up in. Three layers take part in resolution:
//!
//! - [`EnvSource`]: the process environment, consulted only for `${env.NAME}`
//!   references and only loaded when some value uses one;
//! - [`SystemProperties`]: process-wide `key=value` definitions supplied by the
//!   host (the CLI fills it from `-D key=value` flags);
//! - the project [`PropertyMap`](crate::PropertyMap) itself.
//!
//! Sources never change during a pass; the resolver only reads them.

use indexmap::IndexMap;
use std::collections::HashMap;

pub mod env;
pub mod system;

pub use env::EnvSource;
pub use system::SystemProperties;

/// Trait implemented by every lookup layer.
///
/// Implementations are plain in-memory lookups; anything that needs I/O
/// (reading the environment, a `.env` file) happens when the source is built,
/// not on `get`.
pub trait ValueSource {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<&str>;

    /// Returns the name of this layer for diagnostics
    fn name(&self) -> &'static str;
}

impl ValueSource for IndexMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        IndexMap::get(self, key).map(String::as_str)
    }

    fn name(&self) -> &'static str {
        "project"
    }
}

impl ValueSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }

    fn name(&self) -> &'static str {
        "map"
    }
}
