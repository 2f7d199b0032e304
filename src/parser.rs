use crate::error::{Error, Result as UnitResult};
use crate::scanner::{module_files, CompilationUnit};
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use syn::punctuated::Punctuated;
use syn::visit::{self, Visit};

/// AST (Abstract Syntax Tree) parser for Rust source files.
///
/// The `AstParser` uses the `syn` crate to parse Rust source code into an abstract syntax tree.
/// It is also the default [`SourceLoader`]: given a compilation unit it parses the files
/// its module is written in.
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("src/main.rs"), "crate").unwrap();
/// println!("Parsed {} items", parsed.syntax_tree.items.len());
/// ```
pub struct AstParser;

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Module path of the file itself, used to anchor `self::` and `super::`
    pub module_path: String,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

/// The source-enumeration collaborator: yields the parsed declaration files of a unit.
pub trait SourceLoader {
    /// Loads the files declaring the items of `unit`.
    ///
    /// For an inline module these are the files of its closest enclosing file module,
    /// whose module path they carry.
    ///
    /// # Errors
    ///
    /// Any I/O or syntax failure is fatal for the unit: a partial file set is never returned.
    fn load(&self, unit: &CompilationUnit) -> UnitResult<Vec<ParsedFile>>;
}

/// A documentation comment attached to one item, with the location it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DocComment {
    /// File the comment was found in
    pub file: PathBuf,
    /// Module the item is declared in, inline modules included
    pub module_path: String,
    /// Name of the documented item (`<module>` for inner file docs)
    pub item: String,
    /// Comment lines joined with `\n`
    pub text: String,
}

impl AstParser {
    /// Parses a single Rust source file into an AST.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid Rust syntax
    pub fn parse_file(path: &Path, module_path: &str) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Self::parse_source(path, module_path, &content)
    }

    /// Parses already loaded source text.
    pub fn parse_source(path: &Path, module_path: &str, content: &str) -> Result<ParsedFile> {
        let syntax_tree = syn::parse_file(content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        debug!("Successfully parsed file: {}", path.display());

        Ok(ParsedFile {
            path: path.to_path_buf(),
            module_path: module_path.to_string(),
            syntax_tree,
        })
    }
}

impl SourceLoader for AstParser {
    fn load(&self, unit: &CompilationUnit) -> UnitResult<Vec<ParsedFile>> {
        let (module_path, files) = module_files(unit);
        debug!(
            "Loading unit {} from {} file(s) of {}",
            unit.import_path,
            files.len(),
            module_path
        );

        let mut parsed = Vec::with_capacity(files.len());
        for path in &files {
            let content = fs::read_to_string(path)?;
            match Self::parse_source(path, &module_path, &content) {
                Ok(file) => parsed.push(file),
                Err(e) => {
                    warn!("Failed to parse {}: {:#}", path.display(), e);
                    return Err(Error::ParseError {
                        file: path.clone(),
                        message: format!("{:#}", e),
                    });
                }
            }
        }

        debug!("Loaded {} files for unit {}", parsed.len(), unit.import_path);
        Ok(parsed)
    }
}

/// Collects the doc comments of every item in a file, in source order.
///
/// Items nested in `impl` blocks, traits and inline modules are included, the latter under
/// the inline module's path; `#[cfg(test)]` modules are not.
pub fn collect_doc_comments(parsed: &ParsedFile) -> Vec<DocComment> {
    let mut collector = DocCollector {
        file: &parsed.path,
        module_path: parsed.module_path.clone(),
        comments: Vec::new(),
    };
    collector.visit_file(&parsed.syntax_tree);
    collector.comments
}

/// Joins the `#[doc]` attributes of an item, one line per attribute.
pub fn doc_text(attrs: &[syn::Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Some(s.value()),
                _ => None,
            },
            _ => None,
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Whether an item is compiled only for tests (`#[cfg(test)]`, `#[cfg(all(test, ..))]`).
pub fn is_cfg_test(attrs: &[syn::Attribute]) -> bool {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("cfg"))
        .any(|attr| match attr.parse_args::<syn::Meta>() {
            Ok(predicate) => requires_test(&predicate),
            Err(_) => false,
        })
}

/// A cfg predicate that can only hold in a test build.
///
/// `not(..)` and `any(..)` never qualify, nor does `feature = ".."` whatever its value.
fn requires_test(predicate: &syn::Meta) -> bool {
    match predicate {
        syn::Meta::Path(path) => path.is_ident("test"),
        syn::Meta::List(list) if list.path.is_ident("all") => list
            .parse_args_with(Punctuated::<syn::Meta, syn::Token![,]>::parse_terminated)
            .map(|all| all.iter().any(requires_test))
            .unwrap_or(false),
        _ => false,
    }
}

struct DocCollector<'a> {
    file: &'a Path,
    module_path: String,
    comments: Vec<DocComment>,
}

impl DocCollector<'_> {
    fn push(&mut self, item: String, attrs: &[syn::Attribute]) {
        if let Some(text) = doc_text(attrs) {
            self.comments.push(DocComment {
                file: self.file.to_path_buf(),
                module_path: self.module_path.clone(),
                item,
                text,
            });
        }
    }
}

impl<'ast> Visit<'ast> for DocCollector<'_> {
    fn visit_file(&mut self, node: &'ast syn::File) {
        self.push("<module>".to_string(), &node.attrs);
        visit::visit_file(self, node);
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.push(node.sig.ident.to_string(), &node.attrs);
        visit::visit_item_fn(self, node);
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.push(node.sig.ident.to_string(), &node.attrs);
        visit::visit_impl_item_fn(self, node);
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        self.push(node.sig.ident.to_string(), &node.attrs);
        visit::visit_trait_item_fn(self, node);
    }

    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        self.push(node.ident.to_string(), &node.attrs);
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        self.push(node.ident.to_string(), &node.attrs);
    }

    fn visit_item_const(&mut self, node: &'ast syn::ItemConst) {
        self.push(node.ident.to_string(), &node.attrs);
    }

    fn visit_item_static(&mut self, node: &'ast syn::ItemStatic) {
        self.push(node.ident.to_string(), &node.attrs);
    }

    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        if is_cfg_test(&node.attrs) {
            return;
        }
        self.push(node.ident.to_string(), &node.attrs);

        let inner = format!("{}::{}", self.module_path, node.ident);
        let outer = std::mem::replace(&mut self.module_path, inner);
        visit::visit_item_mod(self, node);
        self.module_path = outer;
    }
}
