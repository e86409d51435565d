//! # Tracker Config
//!
//! Build checksummed configuration messages for a satellite tracker and
//! deliver them over serial or to a file.
//!
//! # Examples
//!
//! ```bash
//! tracker-config template --output settings.toml
//! tracker-config encode settings.toml --upload --port /dev/ttyACM0
//! tracker-config verify 0234e80337e6fb033c82
//! ```
//!
//! Expected output of `encode`:
//! ```text
//! INFO tracker_config::transport: Sent 10-byte configuration message to file config_message.txt
//! 0234e80337e6fb033c82
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tracker_config::codec::{check_message, encode_config, Catalog, ConfigMessage, Diagnostics, EncodeOutcome};
use tracker_config::config::{Config, LoggingConfig};
use tracker_config::input;
use tracker_config::serial::{SerialTransport, DEFAULT_DEVICE_PATHS};
use tracker_config::transport::{transmit, FileTransport};

#[derive(Parser, Debug)]
#[command(name = "tracker-config", version, about = "Satellite tracker configuration message builder")]
struct Cli {
    /// Tool configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a field-value file into a configuration message
    Encode {
        /// Field values (TOML, or JSON with a .json extension)
        input: PathBuf,

        /// Write the message here instead of the configured output path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also send the message to the tracker over serial
        #[arg(long)]
        upload: bool,

        /// Serial device to upload to
        #[arg(long)]
        port: Option<String>,

        /// Deliver the message even if some fields failed to encode
        #[arg(long)]
        allow_partial: bool,

        /// Print a JSON report instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Check a hex message the way the tracker does and list its fields
    Verify {
        /// Message in hex
        hex: String,
    },

    /// Write a field-value file with every field at its factory default
    Template {
        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List every configurable field
    Catalog,
}

/// JSON form of an encode
#[derive(Serialize)]
struct EncodeReport<'a> {
    message: String,
    length: usize,
    complete: bool,
    diagnostics: &'a Diagnostics,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    let _guard = init_tracing(&config.logging)?;

    debug!("Tracker Config v{} starting", env!("CARGO_PKG_VERSION"));

    let catalog = Catalog::standard()?;

    match cli.command {
        Command::Encode { input, output, upload, port, allow_partial, json } => {
            let options = EncodeOptions {
                output: output.unwrap_or_else(|| config.output.path.clone()),
                upload,
                port,
                allow_partial: allow_partial || config.encode.allow_partial,
                json,
            };
            run_encode(&catalog, &config, &input, options).await
        }
        Command::Verify { hex } => run_verify(&catalog, &hex),
        Command::Template { output } => run_template(&catalog, output.as_deref()),
        Command::Catalog => {
            print_catalog(&catalog);
            Ok(())
        }
    }
}

/// Log to stderr, and to a file when one is configured
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let Some(path) = &config.file else {
        tracing_subscriber::registry().with(env_filter).with(stderr_layer).init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("logging file {} has no file name", path.display()))?;
    std::fs::create_dir_all(dir)?;

    let (file_writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(Some(guard))
}

struct EncodeOptions {
    output: PathBuf,
    upload: bool,
    port: Option<String>,
    allow_partial: bool,
    json: bool,
}

async fn run_encode(catalog: &Catalog, config: &Config, input: &Path, options: EncodeOptions) -> Result<()> {
    let values = input::load_values(input)?;
    info!("Encoding {} field values from {}", values.len(), input.display());

    let outcome = encode_config(catalog, &values);
    report(&outcome, options.json)?;

    let mut file = FileTransport::new(&options.output);
    transmit(&mut file, &outcome, options.allow_partial).await?;

    if options.upload {
        let paths = candidate_ports(options.port.as_deref().unwrap_or(&config.serial.port));
        let mut serial = SerialTransport::open_with_paths(paths.as_slice(), config.serial.baud_rate)?
            .with_timeout(Duration::from_millis(config.serial.timeout_ms));
        if config.serial.reply_window_ms > 0 {
            serial = serial.with_reply_window(Duration::from_millis(config.serial.reply_window_ms));
        }
        transmit(&mut serial, &outcome, options.allow_partial).await?;
    }

    Ok(())
}

/// Requested port first, then the defaults
fn candidate_ports(requested: &str) -> Vec<String> {
    let mut paths = vec![requested.to_string()];
    paths.extend(
        DEFAULT_DEVICE_PATHS
            .iter()
            .filter(|p| **p != requested)
            .map(|p| p.to_string()),
    );
    paths
}

fn report(outcome: &EncodeOutcome, json: bool) -> Result<()> {
    if json {
        let report = EncodeReport {
            message: outcome.hex(),
            length: outcome.message.len(),
            complete: outcome.is_complete(),
            diagnostics: &outcome.diagnostics,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for line in outcome.diagnostics.messages() {
        eprintln!("{}", line);
    }
    println!("{}", outcome.hex());
    Ok(())
}

fn run_verify(catalog: &Catalog, text: &str) -> Result<()> {
    let message = ConfigMessage::from_hex(text)?;
    let fields = check_message(catalog, message.as_bytes())?;

    println!("Valid message: {} bytes, {} fields", message.len(), fields.len());
    for field in &fields {
        let name = catalog.by_tag(field.tag).map_or("?", |spec| spec.name);
        println!("  0x{:02x} {:<10} {}", field.tag, name, hex::encode(&field.payload));
    }
    Ok(())
}

fn run_template(catalog: &Catalog, output: Option<&Path>) -> Result<()> {
    let text = input::template_toml(catalog)?;

    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote template for {} fields to {}", catalog.len(), path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn print_catalog(catalog: &Catalog) {
    println!("{:<4} {:<10} {:<18} {:>4}  {:<28} {}", "TAG", "NAME", "KIND", "SIZE", "RANGE", "DESCRIPTION");
    for spec in catalog.iter() {
        let range = if spec.kind.is_composite() || spec.size == 0 {
            "-".to_string()
        } else {
            spec.range_text()
        };
        println!(
            "0x{:02x} {:<10} {:<18} {:>4}  {:<28} {}",
            spec.tag,
            spec.name,
            format!("{:?}", spec.kind),
            spec.size,
            range,
            spec.description
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_encode() {
        let cli = Cli::try_parse_from([
            "tracker-config",
            "encode",
            "settings.toml",
            "--upload",
            "--port",
            "/dev/ttyUSB1",
            "--allow-partial",
        ])
        .unwrap();

        match cli.command {
            Command::Encode { input, upload, port, allow_partial, json, output } => {
                assert_eq!(input, PathBuf::from("settings.toml"));
                assert!(upload);
                assert_eq!(port.as_deref(), Some("/dev/ttyUSB1"));
                assert!(allow_partial);
                assert!(!json);
                assert!(output.is_none());
            }
            other => panic!("Expected Encode, got: {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_config() {
        let cli = Cli::try_parse_from(["tracker-config", "catalog", "--config", "tool.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("tool.toml")));
        assert!(matches!(cli.command, Command::Catalog));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["tracker-config"]).is_err());
    }

    #[test]
    fn test_candidate_ports() {
        assert_eq!(candidate_ports("/dev/ttyUSB1"), vec!["/dev/ttyUSB1", "/dev/ttyACM0", "/dev/ttyUSB0"]);
        assert_eq!(candidate_ports("/dev/ttyACM0"), vec!["/dev/ttyACM0", "/dev/ttyUSB0"]);
    }

    #[test]
    fn test_verify_accepts_valid_message() {
        let catalog = Catalog::standard().unwrap();
        assert!(run_verify(&catalog, "0234e80337e6fb033c82").is_ok());
        assert!(run_verify(&catalog, "0234e80337e6fb033c83").is_err());
    }
}
