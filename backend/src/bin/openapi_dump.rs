//! Emit the OpenAPI document for client generation and contract review.

use std::io::{self, Write};
use std::path::PathBuf;

use careplan::ApiDoc;
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use utoipa::OpenApi;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Format {
    #[default]
    Json,
    Yaml,
}

/// `openapi-dump` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "openapi-dump",
    about = "Print the careplan OpenAPI document",
    version
)]
struct CliArgs {
    /// Serialisation of the document.
    #[arg(long, value_enum, default_value_t)]
    format: Format,
    /// Write to this file instead of stdout.
    #[arg(long, value_name = "path")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();

    let doc = ApiDoc::openapi();
    let rendered = match args.format {
        Format::Json => doc.to_pretty_json().wrap_err("failed to serialise OpenAPI as JSON")?,
        Format::Yaml => doc.to_yaml().wrap_err("failed to serialise OpenAPI as YAML")?,
    };

    match args.output {
        Some(path) => std::fs::write(&path, rendered)
            .wrap_err_with(|| format!("failed to write {}", path.display()))?,
        None => writeln!(io::stdout().lock(), "{rendered}").wrap_err("failed to write stdout")?,
    }
    Ok(())
}
