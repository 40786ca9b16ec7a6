//! Nested `${key}` substitution with cycle detection.

use crate::source::ValueSource;
use crate::{PropCryptError, Result};
use tracing::trace;

/// Prefix routing a placeholder to the environment layer.
pub const ENV_PREFIX: &str = "env.";

const PLACEHOLDER_START: &str = "${";
const PLACEHOLDER_END: char = '}';

/// Substitutes placeholders in property values.
///
/// Lookup order for a placeholder `${name}`:
///
/// 1. `name` starts with `env.` and an environment layer is supplied: the
///    environment variable named by the rest of `name`;
/// 2. the system layer;
/// 3. the project properties.
///
/// An `env.` name missing from the environment does not resolve to empty
/// text. The full name, prefix included, is looked up in the system and
/// project layers, and kept verbatim when neither has it.
///
/// A value found in any layer is itself resolved before it is substituted.
/// Placeholders naming a key found nowhere are kept verbatim, and a `${`
/// without a closing `}` is plain text. Expansion keeps its own stack of
/// pending values, so chain depth is bounded by memory, not the call stack.
///
/// # Example
///
/// ```ignore
/// # use propcrypt::{PlaceholderResolver, PropertyMap, SystemProperties};
/// let system = SystemProperties::new();
/// let resolver = PlaceholderResolver::new(&system);
///
/// let mut properties = PropertyMap::new();
/// properties.insert("host".into(), "localhost".into());
/// properties.insert("url".into(), "http://${host}/".into());
///
/// assert_eq!(resolver.resolve("url", &properties, None)?, "http://localhost/");
/// ```
pub struct PlaceholderResolver<'a> {
    system: &'a dyn ValueSource,
}

impl<'a> PlaceholderResolver<'a> {
    pub fn new(system: &'a dyn ValueSource) -> Self {
        Self { system }
    }

    /// Returns the fully substituted value of `key`.
    ///
    /// A key that is not in `properties` resolves to the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`PropCryptError::IllegalReference`] when the value of `key`
    /// leads back to a key that is still being resolved, including a key
    /// defined as itself.
    pub fn resolve(
        &self,
        key: &str,
        properties: &dyn ValueSource,
        environment: Option<&dyn ValueSource>,
    ) -> Result<String> {
        let Some(raw) = properties.get(key) else {
            return Ok(String::new());
        };

        let mut current = Frame::new(key.to_string(), raw.to_string());
        let mut parents: Vec<Frame> = Vec::new();

        loop {
            let Some(ref_key) = current.next_reference() else {
                let Some(mut parent) = parents.pop() else {
                    return Ok(current.output);
                };
                parent.output.push_str(&std::mem::take(&mut current.output));
                current = parent;
                continue;
            };

            if ref_key == current.key || parents.iter().any(|f| f.key == ref_key) {
                let path: Vec<String> = parents
                    .iter()
                    .chain(std::iter::once(&current))
                    .map(|f| f.key.clone())
                    .collect();
                return Err(illegal_reference(&ref_key, &path));
            }

            match self.lookup(&ref_key, properties, environment) {
                Some(found) => {
                    let child = Frame::new(ref_key, found);
                    parents.push(std::mem::replace(&mut current, child));
                }
                None => {
                    current.output.push_str(PLACEHOLDER_START);
                    current.output.push_str(&ref_key);
                    current.output.push(PLACEHOLDER_END);
                }
            }
        }
    }

    fn lookup(
        &self,
        key: &str,
        properties: &dyn ValueSource,
        environment: Option<&dyn ValueSource>,
    ) -> Option<String> {
        if let (Some(name), Some(environment)) = (key.strip_prefix(ENV_PREFIX), environment) {
            if let Some(value) = environment.get(name) {
                trace!("'{}' found in {} layer", key, environment.name());
                return Some(value.to_string());
            }
        }

        [self.system, properties].into_iter().find_map(|layer| {
            let value = layer.get(key)?;
            trace!("'{}' found in {} layer", key, layer.name());
            Some(value.to_string())
        })
    }
}

/// A value being expanded: its key, the unscanned text and the output so far.
struct Frame {
    key: String,
    text: String,
    pos: usize,
    output: String,
}

impl Frame {
    fn new(key: String, text: String) -> Self {
        let output = String::with_capacity(text.len());
        Self {
            key,
            text,
            pos: 0,
            output,
        }
    }

    /// Copies literal text to the output up to the next placeholder and
    /// returns the key it names. `None` once the text is exhausted.
    fn next_reference(&mut self) -> Option<String> {
        loop {
            let rest = &self.text[self.pos..];
            let Some(start) = rest.find(PLACEHOLDER_START) else {
                self.output.push_str(rest);
                self.pos = self.text.len();
                return None;
            };
            self.output.push_str(&rest[..start]);
            let inner = &rest[start + PLACEHOLDER_START.len()..];

            let Some(end) = inner.find(PLACEHOLDER_END) else {
                // unterminated, the remainder is literal
                self.output.push_str(&rest[start..]);
                self.pos = self.text.len();
                return None;
            };

            let ref_key = inner[..end].to_string();
            self.pos += start + PLACEHOLDER_START.len() + end + 1;

            if !ref_key.is_empty() {
                return Some(ref_key);
            }
            self.output.push_str(PLACEHOLDER_START);
            self.output.push(PLACEHOLDER_END);
        }
    }
}

/// Builds the error for `key` being referenced while it is still on `path`.
///
/// The message names the key whose value closed the cycle and the chain of
/// expansions from the first occurrence of `key`.
fn illegal_reference(key: &str, path: &[String]) -> PropCryptError {
    let expanding = path.last().map(String::as_str).unwrap_or(key);
    let first = path.iter().position(|k| k == key).unwrap_or(0);
    let chain = path[first..]
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(key))
        .collect::<Vec<_>>()
        .join(" -> ");

    let message = if expanding == key {
        format!(
            "Illegal self reference: property '{}' is defined as itself ({})",
            key, chain
        )
    } else {
        format!(
            "Illegal cyclic reference: property '{}' references '{}' which is still being resolved ({})",
            expanding, key, chain
        )
    };

    PropCryptError::IllegalReference {
        key: expanding.to_string(),
        message,
    }
}
