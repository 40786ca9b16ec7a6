//! # propcrypt Core
//!
//! This crate provides the configuration types and parsing logic shared by the
//! propcrypt library and its command line interface.
//!
//! Two files feed the configuration:
//!
//! - a project-level `propcrypt.toml` next to the property files, describing
//!   which sources to read and how the cipher is tuned;
//! - an optional user-level `config.toml` in the platform configuration
//!   directory, supplying cipher defaults shared by every project.
//!
//! ## Configuration Structure
//!
//! ```toml
//! [encryptor]
//! key_obtention_iterations = 3
//! memory_cost_kib = 19456
//! salt_generator = "random"       # or "zero"
//! iv_generator = "random"         # or "fixed:<text>"
//! string_output_type = "base64"   # or "hexadecimal"
//!
//! [read]
//! files = ["app.properties", "secrets.properties"]
//! quiet = false
//! key_prefix = "app."
//! log_decrypted_values = false
//! ```
//!
//! Precedence for the `[encryptor]` section is built-in defaults, then the user
//! configuration, then the project file. Command line flags are applied on top
//! by the caller.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default number of Argon2 passes used to derive the cipher key.
pub const DEFAULT_KEY_OBTENTION_ITERATIONS: u32 = 3;

/// Default Argon2 memory cost in KiB (19 MiB).
pub const DEFAULT_MEMORY_COST_KIB: u32 = 19 * 1024;

/// Smallest memory cost Argon2 accepts for a single lane.
pub const MIN_MEMORY_COST_KIB: u32 = 8;

/// File name of the project-level configuration.
pub const PROJECT_CONFIG_FILE: &str = "propcrypt.toml";

/// The root structure of a `propcrypt.toml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cipher settings; when absent the user configuration or defaults apply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryptor: Option<EncryptorConfig>,
    /// Which property sources to read and how
    #[serde(default)]
    pub read: ReadConfig,
}

impl Config {
    /// Validate every section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError::Validation` describing the first invalid setting.
    pub fn validate(&self) -> Result<(), ParseError> {
        if let Some(encryptor) = &self.encryptor {
            encryptor
                .validate()
                .map_err(|e| ParseError::Validation(format!("[encryptor] {}", e)))?;
        }
        self.read
            .validate()
            .map_err(|e| ParseError::Validation(format!("[read] {}", e)))?;
        Ok(())
    }

    /// Loads the project configuration if the file exists.
    ///
    /// A missing file is not an error; callers fall back to defaults.
    pub fn load(path: &Path) -> Result<Option<Self>, ParseError> {
        if !path.exists() {
            return Ok(None);
        }
        Self::try_from(path).map(Some)
    }

    /// Returns the cipher settings in effect for this project.
    ///
    /// The project's own `[encryptor]` section wins over the user configuration,
    /// which wins over the built-in defaults.
    pub fn effective_encryptor(&self, global: Option<&GlobalConfig>) -> EncryptorConfig {
        self.encryptor
            .clone()
            .or_else(|| global.and_then(|g| g.encryptor.clone()))
            .unwrap_or_default()
    }
}

impl FromStr for Config {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl TryFrom<&Path> for Config {
    type Error = ParseError;

    /// Load configuration from a file path.
    ///
    /// Relative entries in `[read].files` are resolved against the directory
    /// containing the configuration file.
    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let content = fs::read_to_string(path).map_err(|e| {
            ParseError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read {}: {}", path.display(), e),
            ))
        })?;
        let mut config: Config = content.parse()?;

        if let Some(base_dir) = path.parent() {
            for file in &mut config.read.files {
                if file.is_relative() {
                    *file = base_dir.join(&*file);
                }
            }
        }

        Ok(config)
    }
}

/// Settings of the password-based cipher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptorConfig {
    /// Number of Argon2 passes applied to obtain the encryption key
    pub key_obtention_iterations: u32,
    /// Argon2 memory cost in KiB
    pub memory_cost_kib: u32,
    /// How the per-value salt is produced
    pub salt_generator: SaltGenerator,
    /// How the per-value nonce is produced
    pub iv_generator: IvGenerator,
    /// Text encoding of the ciphertext inside `ENC(...)`
    pub string_output_type: StringOutputType,
}

impl Default for EncryptorConfig {
    fn default() -> Self {
        Self {
            key_obtention_iterations: DEFAULT_KEY_OBTENTION_ITERATIONS,
            memory_cost_kib: DEFAULT_MEMORY_COST_KIB,
            salt_generator: SaltGenerator::default(),
            iv_generator: IvGenerator::default(),
            string_output_type: StringOutputType::default(),
        }
    }
}

impl EncryptorConfig {
    /// Validate the cipher settings.
    ///
    /// Ensures that:
    /// - at least one key derivation pass is requested
    /// - the memory cost is accepted by Argon2
    /// - a fixed IV has some content
    pub fn validate(&self) -> Result<(), String> {
        if self.key_obtention_iterations == 0 {
            return Err("key_obtention_iterations must be at least 1".into());
        }
        if self.memory_cost_kib < MIN_MEMORY_COST_KIB {
            return Err(format!(
                "memory_cost_kib must be at least {}",
                MIN_MEMORY_COST_KIB
            ));
        }
        if let IvGenerator::Fixed(text) = &self.iv_generator {
            if text.is_empty() {
                return Err("fixed iv_generator needs a non-empty value".into());
            }
        }
        Ok(())
    }
}

/// Which property sources to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// Property files, read in order
    pub files: Vec<PathBuf>,
    /// Property URLs (`file:`, `http:` or `https:`), read in order
    pub urls: Vec<String>,
    /// Skip sources that cannot be opened instead of failing
    pub quiet: bool,
    /// Prefix prepended to every loaded key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    /// Log each decrypted value at info level
    pub log_decrypted_values: bool,
}

impl ReadConfig {
    /// Files and URLs cannot be mixed, otherwise no order of precedence
    /// between them can be guaranteed.
    pub fn validate(&self) -> Result<(), String> {
        if !self.files.is_empty() && !self.urls.is_empty() {
            return Err("set files or urls but not both".into());
        }
        Ok(())
    }
}

/// User-level configuration shared across projects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default cipher settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryptor: Option<EncryptorConfig>,
}

impl GlobalConfig {
    /// Path of the user configuration file,
    /// typically `~/.config/propcrypt/config.toml` on Linux.
    pub fn path() -> Result<PathBuf, ParseError> {
        let dirs = ProjectDirs::from("", "", "propcrypt").ok_or_else(|| {
            ParseError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "Could not find config directory",
            ))
        })?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Loads the user configuration, `None` when the file or the platform
    /// configuration directory does not exist.
    pub fn load() -> Result<Option<Self>, ParseError> {
        let Ok(path) = Self::path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        content.parse().map(Some)
    }
}

impl FromStr for GlobalConfig {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: GlobalConfig = toml::from_str(s)?;
        if let Some(encryptor) = &config.encryptor {
            encryptor
                .validate()
                .map_err(|e| ParseError::Validation(format!("[encryptor] {}", e)))?;
        }
        Ok(config)
    }
}

/// Source of the salt mixed into key derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaltGenerator {
    /// Fresh random bytes for every value
    #[default]
    Random,
    /// All-zero salt; makes output reproducible
    Zero,
}

impl SaltGenerator {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaltGenerator::Random => "random",
            SaltGenerator::Zero => "zero",
        }
    }
}

impl fmt::Display for SaltGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaltGenerator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(SaltGenerator::Random),
            "zero" => Ok(SaltGenerator::Zero),
            _ => Err(format!("Unknown salt generator: {}", s)),
        }
    }
}

/// Source of the cipher nonce.
///
/// Written as `"random"` or `"fixed:<text>"` in configuration files and on the
/// command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IvGenerator {
    /// Fresh random nonce for every value
    #[default]
    Random,
    /// Nonce derived from the given text and the plaintext, so equal
    /// plaintexts encrypt identically under an equal salt
    Fixed(String),
}

impl fmt::Display for IvGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IvGenerator::Random => f.write_str("random"),
            IvGenerator::Fixed(text) => write!(f, "fixed:{}", text),
        }
    }
}

impl FromStr for IvGenerator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "random" {
            return Ok(IvGenerator::Random);
        }
        match s.strip_prefix("fixed:") {
            Some("") => Err("fixed IV generator needs a value, e.g. fixed:0123456789".into()),
            Some(text) => Ok(IvGenerator::Fixed(text.to_string())),
            None => Err(format!("Unknown IV generator: {}", s)),
        }
    }
}

impl TryFrom<String> for IvGenerator {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IvGenerator> for String {
    fn from(generator: IvGenerator) -> Self {
        generator.to_string()
    }
}

/// Text encoding of ciphertext.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringOutputType {
    #[default]
    Base64,
    Hexadecimal,
}

impl StringOutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StringOutputType::Base64 => "base64",
            StringOutputType::Hexadecimal => "hexadecimal",
        }
    }
}

impl fmt::Display for StringOutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StringOutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base64" => Ok(StringOutputType::Base64),
            "hexadecimal" | "hex" => Ok(StringOutputType::Hexadecimal),
            _ => Err(format!("Unknown string output type: {}", s)),
        }
    }
}

/// Errors that can occur when parsing propcrypt configuration files.
#[derive(Debug)]
pub enum ParseError {
    /// I/O error when reading configuration files
    Io(io::Error),
    /// TOML parsing error
    Toml(toml::de::Error),
    /// Validation error
    Validation(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Io(e) => write!(f, "I/O error: {}", e),
            ParseError::Toml(e) => write!(f, "TOML parsing error: {}", e),
            ParseError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(e) => Some(e),
            ParseError::Toml(e) => Some(e),
            ParseError::Validation(_) => None,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        ParseError::Io(e)
    }
}

impl From<toml::de::Error> for ParseError {
    fn from(e: toml::de::Error) -> Self {
        ParseError::Toml(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_iv_generator_from_str() {
        assert_eq!("random".parse::<IvGenerator>().unwrap(), IvGenerator::Random);
        assert_eq!(
            "fixed:0123456789".parse::<IvGenerator>().unwrap(),
            IvGenerator::Fixed("0123456789".to_string())
        );
        assert!("fixed:".parse::<IvGenerator>().is_err());
        assert!("counter".parse::<IvGenerator>().is_err());
    }

    #[test]
    fn test_output_type_accepts_short_hex() {
        assert_eq!(
            "hex".parse::<StringOutputType>().unwrap(),
            StringOutputType::Hexadecimal
        );
        assert_eq!(StringOutputType::Hexadecimal.to_string(), "hexadecimal");
    }

    #[test]
    fn test_parse_full_config() {
        let config: Config = r#"
[encryptor]
key_obtention_iterations = 2
salt_generator = "zero"
iv_generator = "fixed:0123456789123456789"
string_output_type = "hexadecimal"

[read]
files = ["a.properties"]
quiet = true
key_prefix = "app."
"#
        .parse()
        .unwrap();

        let encryptor = config.encryptor.unwrap();
        assert_eq!(encryptor.key_obtention_iterations, 2);
        assert_eq!(encryptor.memory_cost_kib, DEFAULT_MEMORY_COST_KIB);
        assert_eq!(encryptor.salt_generator, SaltGenerator::Zero);
        assert_eq!(
            encryptor.iv_generator,
            IvGenerator::Fixed("0123456789123456789".to_string())
        );
        assert_eq!(encryptor.string_output_type, StringOutputType::Hexadecimal);
        assert!(config.read.quiet);
        assert_eq!(config.read.key_prefix.as_deref(), Some("app."));
        assert!(!config.read.log_decrypted_values);
    }

    #[test]
    fn test_files_and_urls_are_rejected_together() {
        let err = r#"
[read]
files = ["a.properties"]
urls = ["file:///tmp/b.properties"]
"#
        .parse::<Config>()
        .unwrap_err();
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = "[encryptor]\nkey_obtention_iterations = 0\n"
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(err, ParseError::Validation(_)));
    }

    #[test]
    fn test_effective_encryptor_precedence() {
        let global = GlobalConfig {
            encryptor: Some(EncryptorConfig {
                key_obtention_iterations: 7,
                ..EncryptorConfig::default()
            }),
        };

        let without_section = Config::default();
        assert_eq!(
            without_section
                .effective_encryptor(Some(&global))
                .key_obtention_iterations,
            7
        );
        assert_eq!(
            without_section.effective_encryptor(None),
            EncryptorConfig::default()
        );

        let with_section: Config = "[encryptor]\nkey_obtention_iterations = 4\n".parse().unwrap();
        assert_eq!(
            with_section
                .effective_encryptor(Some(&global))
                .key_obtention_iterations,
            4
        );
    }

    #[test]
    fn test_relative_files_resolved_against_config_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PROJECT_CONFIG_FILE);
        fs::write(&path, "[read]\nfiles = [\"app.properties\"]\n").unwrap();

        let config = Config::load(&path).unwrap().unwrap();
        assert_eq!(config.read.files, vec![temp_dir.path().join("app.properties")]);

        let missing = Config::load(&temp_dir.path().join("nope.toml")).unwrap();
        assert!(missing.is_none());
    }
}
