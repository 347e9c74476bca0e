use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use oapi_md_generator::{generate, load, GeneratorOptions, LoadOptions, Source};

/// Generate Markdown documentation from an OpenAPI v3 JSON document
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// URL or path of the OpenAPI document
    source: String,
    /// Output directory
    #[arg(short, long, env = "OAPI_MD_OUTPUT", default_value = "./docs")]
    output: PathBuf,
    /// Prefix for generated interface names
    #[arg(short, long, env = "OAPI_MD_PREFIX", default_value = "I")]
    prefix: String,
    /// Timeout for fetching the document, in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let source = Source::parse(&cli.source);
    tracing::info!("loading OpenAPI document from {source}");
    let load_options = LoadOptions {
        timeout: Duration::from_secs(cli.timeout),
    };
    let document = load(&source, &load_options).with_context(|| format!("failed to load {source}"))?;

    let title = document.info.title.as_deref().unwrap_or("Unknown API");
    let version = document.info.version.as_deref().unwrap_or("unknown");
    let openapi = document.openapi.as_deref().unwrap_or("3.x");
    tracing::info!("parsing {title} (v{version}, OpenAPI {openapi})");

    let docs = generate(&document, &GeneratorOptions { prefix: cli.prefix });
    let written = docs
        .write_to(&cli.output)
        .with_context(|| format!("failed to write documentation to {}", cli.output.display()))?;

    if !docs.diagnostics.is_empty() {
        tracing::warn!("{} warning(s) during generation", docs.diagnostics.len());
    }
    tracing::info!(
        "documentation written to {} ({} files, {} endpoints, {} schemas)",
        cli.output.display(),
        written.len(),
        docs.operation_count,
        docs.schema_count
    );

    Ok(())
}
