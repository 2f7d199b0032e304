//! OpenAPI from comments - Command-line tool for generating OpenAPI documentation.
//!
//! This binary reads the doc comments of a Rust project, interprets the `@openapi`
//! directives found there and writes an OpenAPI 3.0 document.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-comments [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-comments ./my-api-project -o openapi.yaml
//! ```
//!
//! Generate JSON documentation with a custom title:
//! ```bash
//! openapi-from-comments ./my-api-project -f json --title "Shop API" -o openapi.json
//! ```
//!
//! Resolve types from a sibling crate:
//! ```bash
//! openapi-from-comments ./my-api-project --extern shared_types=../shared-types/src
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_comments::cli;

fn main() -> Result<()> {
    // Parse once for the verbose flag, validate after the logger is up
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from comments starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
