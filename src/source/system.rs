use super::ValueSource;
use crate::{PropCryptError, PropertyMap, Result};

/// Process-wide `key=value` definitions.
///
/// These play the role of a host system-property table: deployment-time
/// values that win over whatever the project files declare. The CLI builds
/// one from its `-D key=value` flags.
#[derive(Debug, Clone, Default)]
pub struct SystemProperties {
    values: PropertyMap,
}

impl SystemProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses definitions of the form `key=value`.
    ///
    /// The value may be empty (`key=`) and may itself contain `=`. A definition
    /// without `=` or with an empty key is rejected.
    pub fn from_definitions<I, S>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = PropertyMap::new();
        for definition in definitions {
            let (key, value) = parse_definition(definition.as_ref())?;
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ValueSource for SystemProperties {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

/// Splits `key=value` at the first `=`.
pub fn parse_definition(definition: &str) -> Result<(String, String)> {
    match definition.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(PropCryptError::InvalidDefinition(definition.to_string())),
    }
}
