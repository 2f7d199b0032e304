//! Run orchestration: scan the source tree, read every doc comment and accumulate the
//! operations and schemas they describe into one [`Document`].

use crate::catalog::StructCatalog;
use crate::directive::{DirectiveError, DirectiveParser};
use crate::document::{Document, Info, Server};
use crate::parser::AstParser;
use crate::resolver::{CrossReferenceResolver, ModuleLocator};
use crate::scanner::{CompilationUnit, FileScanner};
use crate::schema_generator::SchemaGenerator;
use crate::type_resolver::TypeResolver;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Everything one run needs to know besides the sources themselves.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub info: Info,
    pub servers: Vec<Server>,
    /// Directory holding `lib.rs` / `main.rs` of the analyzed crate
    pub source_root: PathBuf,
    /// Package name under which the crate refers to itself, if any
    pub crate_name: Option<String>,
    /// External crates that type references may point into: name and source root
    pub extern_crates: Vec<(String, PathBuf)>,
}

impl GeneratorOptions {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            info: Info {
                title: "API Docs".to_string(),
                version: "1.0.0".to_string(),
                description: Some("OpenAPI".to_string()),
            },
            servers: vec![Server {
                url: "https://localhost:8000".to_string(),
            }],
            source_root: source_root.into(),
            crate_name: None,
            extern_crates: Vec::new(),
        }
    }
}

/// Result of one run.
#[derive(Debug)]
pub struct Generation {
    pub document: Document,
    /// Directive errors of every failing comment, in scan order
    pub errors: Vec<DirectiveError>,
    pub units_scanned: usize,
    pub comments_read: usize,
}

/// Builds the document for the crate below `options.source_root`.
///
/// Directive errors do not stop the run; they are collected in [`Generation::errors`].
///
/// # Errors
///
/// Fails when the source root cannot be scanned or a unit cannot be loaded.
pub fn generate(options: &GeneratorOptions) -> Result<Generation> {
    info!("Scanning {}", options.source_root.display());
    let scan_result = FileScanner::new(options.source_root.clone()).scan()?;
    for warning in &scan_result.warnings {
        warn!("{}", warning);
    }
    info!("Found {} compilation units", scan_result.units.len());

    let mut locator =
        ModuleLocator::new(&options.source_root).with_crate_name(options.crate_name.clone());
    for (name, root) in &options.extern_crates {
        debug!("Registering external crate {} at {}", name, root.display());
        locator = locator.with_extern(name.as_str(), root);
    }

    let types = TypeResolver::new(
        StructCatalog::new(Box::new(AstParser)),
        CrossReferenceResolver::new(Box::new(locator)),
    );
    let mut schemas = SchemaGenerator::new(types);
    let mut document = Document::new(options.info.clone(), options.servers.clone());
    let mut errors = Vec::new();
    let mut comments_read = 0;

    // Inline modules are found while indexing, and run right after their parent.
    let mut pending: Vec<CompilationUnit> = scan_result.units.iter().rev().cloned().collect();
    while let Some(unit) = pending.pop() {
        let index = schemas
            .types()
            .catalog()
            .index(&unit)
            .with_context(|| format!("Failed to load unit {}", unit.import_path))?;
        let comments = index.comments.clone();
        pending.extend(index.modules.iter().rev().map(|name| unit.child(name)));
        debug!("Unit {}: {} doc comments", unit.import_path, comments.len());

        for comment in &comments {
            comments_read += 1;
            let found = DirectiveParser::new(&mut schemas, &mut document)
                .parse_comment(comment, &unit)
                .with_context(|| format!("Failed to process {}", comment.file.display()))?;
            errors.extend(found);
        }
    }

    info!(
        "Collected {} operations and {} schemas",
        document.paths.values().map(|methods| methods.len()).sum::<usize>(),
        document.components.schemas.len()
    );

    Ok(Generation {
        document,
        errors,
        units_scanned: scan_result.units.len(),
        comments_read,
    })
}
