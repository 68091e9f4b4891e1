use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use resource_codec_core::{
    build_href, collect_parameter_names, decode_href, resolve_path_template, Descriptor, Registry,
};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "resource-codec")]
#[command(about = "Build and decode resource URLs from declarative schema tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the URL of a locator value
    Href {
        /// Schema table (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Locator type name in the schema table
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Locator value JSON file (defaults to stdin if not specified)
        input: Option<PathBuf>,

        /// Output file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a relative URL into a locator value
    Decode {
        /// Schema table (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Locator type name in the schema table
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Relative URL, e.g. `rooms/%21abc%3Aexample.org/state?format=client`
        url: String,

        /// Output file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Show the resolved template and flattened parameters of a type
    Params {
        /// Schema table (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Locator type name in the schema table
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only command output
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Href {
            schema,
            type_name,
            input,
            output,
        } => {
            let descriptor = load_descriptor(&schema, &type_name)?;
            let value: serde_json::Value = match &input {
                Some(path) => {
                    let file = File::open(path).with_context(|| {
                        format!("Failed to open input file: {}", path.display())
                    })?;
                    serde_json::from_reader(BufReader::new(file)).with_context(|| {
                        format!("Failed to parse locator value from: {}", path.display())
                    })?
                }
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read locator value from stdin")?;
                    serde_json::from_str(&buf).context("Failed to parse locator value from stdin")?
                }
            };

            let href = build_href(&descriptor, &value)
                .map_err(|e| anyhow::Error::from(e).context("Href build failed"))?;

            let mut writer = open_output(output.as_ref())?;
            writeln!(writer, "{href}").context("Failed to write href")?;
        }
        Commands::Decode {
            schema,
            type_name,
            url,
            output,
            format,
        } => {
            let descriptor = load_descriptor(&schema, &type_name)?;
            let value = decode_href(&descriptor, &url)
                .map_err(|e| anyhow::Error::from(e).context("Decoding failed"))?;

            write_json(&value, output.as_ref(), format)?;
        }
        Commands::Params {
            schema,
            type_name,
            format,
        } => {
            let descriptor = load_descriptor(&schema, &type_name)?;
            let parameters = collect_parameter_names(&descriptor)
                .map_err(|e| anyhow::Error::from(e).context("Invalid schema"))?;

            let report = if descriptor.is_resource() {
                let template = resolve_path_template(&descriptor)
                    .map_err(|e| anyhow::Error::from(e).context("Invalid schema"))?;
                let in_path: Vec<&str> = template.placeholder_names().collect();
                serde_json::json!({
                    "template": template.as_str(),
                    "path": in_path,
                    "query": parameters
                        .iter()
                        .filter(|p| !in_path.contains(&p.name.as_str()))
                        .collect::<Vec<_>>(),
                })
            } else {
                serde_json::json!({
                    "template": null,
                    "parameters": parameters,
                })
            };

            write_json(&report, None, format)?;
        }
    }

    Ok(())
}

fn load_descriptor(schema: &Path, type_name: &str) -> Result<Arc<Descriptor>> {
    let text = fs::read_to_string(schema)
        .with_context(|| format!("Failed to read schema file: {}", schema.display()))?;
    let registry = Registry::from_json(&text)
        .map_err(|e| anyhow::Error::from(e).context("Failed to load schema table"))?;
    registry.get(type_name).ok_or_else(|| {
        anyhow!(
            "Unknown type {type_name} (known: {})",
            registry.names().collect::<Vec<_>>().join(", ")
        )
    })
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    })
}

fn write_json<T: serde::Serialize>(
    val: &T,
    path: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut writer = open_output(path)?;

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    // Ensure trailing newline
    writeln!(writer).context("Failed to write trailing newline")?;

    Ok(())
}
