use crate::document::{Info, Server};
use crate::generator::{generate, GeneratorOptions};
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, error, info};
use std::path::PathBuf;

/// OpenAPI from comments - Generate OpenAPI documentation from annotated Rust doc comments
#[derive(Parser, Debug)]
#[command(name = "openapi-from-comments")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Rust project directory (or its source root)
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Title of the API
    #[arg(long = "title", default_value = "API Docs")]
    pub title: String,

    /// Version of the API
    #[arg(long = "doc-version", default_value = "1.0.0")]
    pub doc_version: String,

    /// Description of the API
    #[arg(long = "description", default_value = "OpenAPI")]
    pub description: String,

    /// Server URL (repeatable)
    #[arg(long = "server", value_name = "URL", default_value = "https://localhost:8000")]
    pub servers: Vec<String>,

    /// Package name the crate uses to refer to itself
    #[arg(long = "crate-name", value_name = "NAME")]
    pub crate_name: Option<String>,

    /// Source root of an external crate that types may refer to (repeatable)
    #[arg(long = "extern", value_name = "NAME=PATH", value_parser = parse_extern)]
    pub extern_crates: Vec<(String, PathBuf)>,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

fn parse_extern(value: &str) -> std::result::Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got '{}'", value)),
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    for (name, root) in &args.extern_crates {
        if !root.is_dir() {
            anyhow::bail!(
                "Source root of crate {} is not a directory: {}",
                name,
                root.display()
            );
        }
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

impl CliArgs {
    /// `<PROJECT_PATH>/src` when it exists, else the project path itself.
    pub fn source_root(&self) -> PathBuf {
        let src = self.project_path.join("src");
        if src.is_dir() {
            src
        } else {
            self.project_path.clone()
        }
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            info: Info {
                title: self.title.clone(),
                version: self.doc_version.clone(),
                description: Some(self.description.clone()),
            },
            servers: self
                .servers
                .iter()
                .map(|url| Server { url: url.clone() })
                .collect(),
            source_root: self.source_root(),
            crate_name: self.crate_name.clone(),
            extern_crates: self.extern_crates.clone(),
        }
    }
}

/// Run the main workflow
///
/// The document is written even when some comments failed; those failures are logged
/// and turn the run into an error afterwards.
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    let options = args.generator_options();
    info!("Source root: {}", options.source_root.display());
    let generation = generate(&options)?;

    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&generation.document)?,
        OutputFormat::Json => serialize_json(&generation.document)?,
    };

    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Summary:");
    info!("  - Units scanned: {}", generation.units_scanned);
    info!("  - Doc comments read: {}", generation.comments_read);
    info!(
        "  - Schemas: {}",
        generation.document.components.schemas.len()
    );
    info!("  - Errors: {}", generation.errors.len());

    if !generation.errors.is_empty() {
        for e in &generation.errors {
            error!("{}", e);
        }
        anyhow::bail!("{} annotation error(s) found", generation.errors.len());
    }

    Ok(())
}
