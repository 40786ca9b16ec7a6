use crate::cipher::{self, PbeEncryptor};
use crate::source::SystemProperties;
use crate::{
    Config, EncryptorConfig, GlobalConfig, IvGenerator, PropertyMap, PropertyReader, ReadConfig,
    SaltGenerator, StringOutputType, properties,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr, eyre};
use colored::Colorize;
use propcrypt_core::PROJECT_CONFIG_FILE;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Main CLI structure for the propcrypt application.
///
/// Global flags select the project configuration and tune the cipher; they
/// override whatever the configuration files say.
#[derive(Parser)]
#[command(name = "propcrypt")]
#[command(about = "Resolve ${placeholders} and decrypt ENC(...) values in property files", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Project configuration file
    #[arg(long, global = true, default_value = PROJECT_CONFIG_FILE)]
    config: PathBuf,
    #[command(flatten)]
    encryptor: EncryptorArgs,
    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Cipher settings that override the configuration files.
#[derive(Args, Debug, Default)]
struct EncryptorArgs {
    /// Number of Argon2 passes used to derive the key
    #[arg(long, global = true)]
    iterations: Option<u32>,
    /// Argon2 memory cost in KiB
    #[arg(long, global = true)]
    memory_cost: Option<u32>,
    /// Salt generator: random or zero
    #[arg(long, global = true)]
    salt_generator: Option<SaltGenerator>,
    /// IV generator: random or fixed:<text>
    #[arg(long, global = true)]
    iv_generator: Option<IvGenerator>,
    /// Ciphertext encoding: base64 or hexadecimal
    #[arg(long, global = true)]
    output_type: Option<StringOutputType>,
}

impl EncryptorArgs {
    fn apply(&self, mut config: EncryptorConfig) -> EncryptorConfig {
        if let Some(iterations) = self.iterations {
            config.key_obtention_iterations = iterations;
        }
        if let Some(memory_cost) = self.memory_cost {
            config.memory_cost_kib = memory_cost;
        }
        if let Some(salt_generator) = self.salt_generator {
            config.salt_generator = salt_generator;
        }
        if let Some(iv_generator) = &self.iv_generator {
            config.iv_generator = iv_generator.clone();
        }
        if let Some(output_type) = self.output_type {
            config.string_output_type = output_type;
        }
        config
    }
}

/// Available commands for the propcrypt CLI.
#[derive(Subcommand)]
enum Commands {
    /// Read property sources, resolve placeholders and decrypt values
    Read(ReadArgs),
    /// Encrypt a value and print it as ENC(...)
    Encrypt {
        /// Value to encrypt (will prompt if not provided)
        value: Option<String>,
        /// Encryptor password (will prompt if not provided)
        #[arg(short, long, env = "PROPCRYPT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Decrypt an ENC(...) value and print the plaintext
    Decrypt {
        /// Encrypted value, with or without the ENC(...) marker
        value: String,
        /// Encryptor password (will prompt if not provided)
        #[arg(short, long, env = "PROPCRYPT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ReadArgs {
    /// Property file to read, may be repeated
    #[arg(short, long = "file", value_name = "PATH")]
    files: Vec<PathBuf>,
    /// Property URL to read (file:, http:, https:), may be repeated
    #[arg(short, long = "url", value_name = "URL")]
    urls: Vec<String>,
    /// Skip sources that cannot be opened
    #[arg(short, long)]
    quiet: bool,
    /// Prefix prepended to every loaded key
    #[arg(long)]
    key_prefix: Option<String>,
    /// System property, wins over project properties
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    system: Vec<String>,
    /// Project property set before the sources are read
    #[arg(long = "property", value_name = "KEY=VALUE")]
    properties: Vec<String>,
    /// Encryptor password
    #[arg(short, long, env = "PROPCRYPT_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// .env file completing the environment for ${env.NAME}
    #[arg(long)]
    env_file: Option<PathBuf>,
    /// Log every decrypted value (exposes secrets in the log)
    #[arg(long)]
    log_decrypted_values: bool,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Properties)]
    format: OutputFormat,
    /// Write the result to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ReadArgs {
    /// Sources given on the command line replace the configured ones.
    fn apply(&self, mut config: ReadConfig) -> ReadConfig {
        if !self.files.is_empty() || !self.urls.is_empty() {
            config.files = self.files.clone();
            config.urls = self.urls.clone();
        }
        config.quiet |= self.quiet;
        if self.key_prefix.is_some() {
            config.key_prefix = self.key_prefix.clone();
        }
        config.log_decrypted_values |= self.log_decrypted_values;
        config
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Properties,
    Json,
}

/// Install a fmt subscriber on stderr.
///
/// `RUST_LOG` is honoured unless `-v` is given.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    };
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}

/// Loads the project and user configuration files.
fn load_configuration(path: &Path) -> Result<(Config, Option<GlobalConfig>)> {
    let project = Config::load(path)
        .wrap_err_with(|| format!("Failed to load {}", path.display()))?
        .unwrap_or_default();
    let global = GlobalConfig::load().wrap_err("Failed to load user configuration")?;
    debug!(
        "Configuration: project file {}, user file {}",
        if path.exists() { "found" } else { "absent" },
        if global.is_some() { "found" } else { "absent" }
    );
    Ok((project, global))
}

fn prompt_secret(label: &str) -> Result<String> {
    eprint!("{}: ", label);
    io::stderr().flush()?;
    Ok(rpassword::read_password()?)
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(p) if !p.is_empty() => Ok(p),
        _ => {
            let p = prompt_secret("Enter encryptor password")?;
            if p.is_empty() {
                return Err(eyre!("The encryptor password cannot be empty"));
            }
            Ok(p)
        }
    }
}

fn render(map: &PropertyMap, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Properties => properties::write(map),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(map)?;
            json.push('\n');
            json
        }
    })
}

fn run_read(args: ReadArgs, project: Config, encryptor: PbeEncryptor) -> Result<()> {
    let config = args.apply(project.read);
    let system = SystemProperties::from_definitions(&args.system)
        .wrap_err("Invalid -D system property")?;

    let mut seeded = PropertyMap::new();
    for definition in &args.properties {
        let (key, value) = crate::source::system::parse_definition(definition)
            .wrap_err("Invalid --property definition")?;
        seeded.insert(key, value);
    }

    let reader = PropertyReader::new(config, Box::new(encryptor))
        .system_properties(system)
        .env_file(args.env_file.clone());

    let report = reader
        .execute(&mut seeded, args.password.as_deref())
        .wrap_err("Failed to read properties")?;

    let rendered = render(&seeded, args.format)?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Wrote {} properties to {} ({} decrypted)",
                "✓".green(),
                seeded.len(),
                path.display(),
                report.decrypted
            );
        }
        None => {
            print!("{}", rendered);
            io::stdout().flush()?;
            eprintln!(
                "{} Read {} properties ({} decrypted)",
                "✓".green(),
                report.loaded,
                report.decrypted
            );
        }
    }
    Ok(())
}

/// Main entry point for the propcrypt CLI application.
///
/// Parses command-line arguments, merges configuration (built-in defaults,
/// user configuration, project file, flags) and executes the command.
pub fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (project, global) = load_configuration(&cli.config)?;
    let encryptor_config = cli
        .encryptor
        .apply(project.effective_encryptor(global.as_ref()));
    let encryptor =
        PbeEncryptor::new(encryptor_config).wrap_err("Invalid encryptor configuration")?;
    let settings = encryptor.config();
    debug!(
        "Encryptor: {} iterations, {} KiB, salt {}, iv {}, output {}",
        settings.key_obtention_iterations,
        settings.memory_cost_kib,
        settings.salt_generator,
        settings.iv_generator,
        settings.string_output_type
    );

    match cli.command {
        Commands::Read(args) => run_read(args, project, encryptor),
        Commands::Encrypt { value, password } => {
            let value = match value {
                Some(v) => v,
                None => prompt_secret("Enter value to encrypt")?,
            };
            let password = password_or_prompt(password)?;
            let marked = cipher::encrypt_value(&encryptor, &value, &password)
                .wrap_err("Failed to encrypt value")?;
            println!("{}", marked);
            Ok(())
        }
        Commands::Decrypt { value, password } => {
            let password = password_or_prompt(password)?;
            let marked = if cipher::is_marked(&value) {
                value
            } else {
                cipher::wrap(value.trim())
            };
            let plaintext = cipher::decrypt_value(&encryptor, &marked, &password)
                .wrap_err("Failed to decrypt value")?;
            println!("{}", plaintext);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("propcrypt").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_encryptor_flags_override_config() {
        let cli = parse(&[
            "--iterations",
            "7",
            "--salt-generator",
            "zero",
            "--iv-generator",
            "fixed:abc",
            "--output-type",
            "hex",
            "decrypt",
            "ENC(x)",
        ]);

        let config = cli.encryptor.apply(EncryptorConfig::default());
        assert_eq!(config.key_obtention_iterations, 7);
        assert_eq!(config.memory_cost_kib, EncryptorConfig::default().memory_cost_kib);
        assert_eq!(config.salt_generator, SaltGenerator::Zero);
        assert_eq!(config.iv_generator, IvGenerator::Fixed("abc".to_string()));
        assert_eq!(config.string_output_type, StringOutputType::Hexadecimal);
    }

    #[test]
    fn test_read_flags_replace_configured_sources() {
        let cli = parse(&[
            "read",
            "-f",
            "a.properties",
            "--file",
            "b.properties",
            "-D",
            "x=1",
            "--property",
            "y=2",
            "--quiet",
            "--format",
            "json",
        ]);

        let Commands::Read(args) = cli.command else {
            panic!("expected read command");
        };
        let configured = ReadConfig {
            urls: vec!["http://example.com/app.properties".to_string()],
            key_prefix: Some("app.".to_string()),
            ..ReadConfig::default()
        };

        let config = args.apply(configured);
        assert_eq!(
            config.files,
            vec![PathBuf::from("a.properties"), PathBuf::from("b.properties")]
        );
        assert!(config.urls.is_empty());
        assert!(config.quiet);
        assert_eq!(config.key_prefix.as_deref(), Some("app."));
        assert_eq!(args.system, vec!["x=1"]);
        assert_eq!(args.properties, vec!["y=2"]);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_read_without_sources_keeps_configuration() {
        let cli = parse(&["read"]);
        let Commands::Read(args) = cli.command else {
            panic!("expected read command");
        };
        let configured = ReadConfig {
            files: vec![PathBuf::from("app.properties")],
            log_decrypted_values: true,
            ..ReadConfig::default()
        };

        assert_eq!(args.apply(configured.clone()), configured);
    }

    #[test]
    fn test_render_formats() {
        let mut properties = PropertyMap::new();
        properties.insert("b".to_string(), "2".to_string());
        properties.insert("a".to_string(), "1".to_string());

        assert_eq!(
            render(&properties, OutputFormat::Properties).unwrap(),
            "b=2\na=1\n"
        );
        let json: serde_json::Value =
            serde_json::from_str(&render(&properties, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["a"], "1");
        assert_eq!(json["b"], "2");
    }
}
