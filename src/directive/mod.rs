//! Directive parser: turns one doc comment into OpenAPI operations.
//!
//! Recognized lines (after leading whitespace):
//!
//! ```text
//! @openapi GET /users/{id} [deprecated]
//! @openapiTags users, admin
//! @openapiSummary Fetch a user
//! @openapiDesc Longer description
//! @openapiParam id in=path, type=int, example=11
//! @openapiRequest application/json CreateUser
//! @openapiResponse 200 application/json models::User
//! @openapiSecurity api_key apiKey header X-Api-Key
//! ```
//!
//! Every other line is free text and ignored.

mod body;
mod param;
mod validate;

pub use body::parse_pseudo_schema;
pub use param::{parse_param, ParamAttributes};
pub use validate::{
    validate_path, HTTP_METHODS, PARAM_LOCATIONS, PARAM_TYPES, REQUEST_CONTENT_TYPES,
    RESPONSE_CONTENT_TYPES,
};

use crate::document::{Document, Operation, SecurityScheme};
use crate::error::{Error, Result};
use crate::parser::DocComment;
use crate::scanner::CompilationUnit;
use crate::schema_generator::SchemaGenerator;
use log::debug;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const PATH_PREFIX: &str = "@openapi ";
pub const PARAM_PREFIX: &str = "@openapiParam ";
pub const TAGS_PREFIX: &str = "@openapiTags ";
pub const SUMMARY_PREFIX: &str = "@openapiSummary ";
pub const DESC_PREFIX: &str = "@openapiDesc ";
pub const REQUEST_PREFIX: &str = "@openapiRequest ";
pub const RESPONSE_PREFIX: &str = "@openapiResponse ";
pub const SECURITY_PREFIX: &str = "@openapiSecurity";

/// A failing directive with the location it came from.
#[derive(Debug)]
pub struct DirectiveError {
    pub file: PathBuf,
    /// The offending line; `None` for errors about the comment as a whole
    pub line: Option<String>,
    pub error: Error,
}

impl fmt::Display for DirectiveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.line {
            Some(line) => write!(f, "{} ({}) - {}", self.error, line, self.file.display()),
            None => write!(f, "{} - {}", self.error, self.file.display()),
        }
    }
}

/// One `@openapi METHOD /path` declaration.
#[derive(Debug, Clone, PartialEq)]
struct Endpoint {
    method: String,
    path: String,
    deprecated: bool,
}

/// Parses doc comments against a shared document and schema generator.
pub struct DirectiveParser<'a> {
    schemas: &'a mut SchemaGenerator,
    doc: &'a mut Document,
}

impl<'a> DirectiveParser<'a> {
    pub fn new(schemas: &'a mut SchemaGenerator, doc: &'a mut Document) -> Self {
        Self { schemas, doc }
    }

    /// Parses one comment found in `unit` and adds its operations to the document.
    ///
    /// All failing lines are reported together; a comment with any error adds nothing.
    ///
    /// # Errors
    ///
    /// Only fatal failures (a unit that cannot be loaded) are returned as `Err`.
    pub fn parse_comment(
        &mut self,
        comment: &DocComment,
        unit: &CompilationUnit,
    ) -> Result<Vec<DirectiveError>> {
        let mut endpoints = Vec::new();
        let mut operation = Operation::default();
        let mut errors = Vec::new();

        for raw in comment.text.lines() {
            let line = strip_comment_decoration(raw);
            match self.parse_line(line, comment, unit, &mut endpoints, &mut operation) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!("Directive failed in {}: {}", comment.item, e);
                    errors.push(DirectiveError {
                        file: comment.file.clone(),
                        line: Some(line.trim_end().to_string()),
                        error: e,
                    });
                }
            }
        }

        if endpoints.is_empty() || !errors.is_empty() {
            return Ok(errors);
        }

        if operation.responses.is_empty() {
            let first = &endpoints[0];
            errors.push(DirectiveError {
                file: comment.file.clone(),
                line: None,
                error: Error::Validation(format!(
                    "no {} for: {} {}",
                    RESPONSE_PREFIX.trim(),
                    first.method.to_uppercase(),
                    first.path
                )),
            });
            return Ok(errors);
        }

        for endpoint in endpoints {
            let mut op = operation.clone();
            op.deprecated = endpoint.deprecated;
            self.doc.add_operation(&endpoint.path, &endpoint.method, op);
        }

        Ok(errors)
    }

    fn parse_line(
        &mut self,
        line: &str,
        comment: &DocComment,
        unit: &CompilationUnit,
        endpoints: &mut Vec<Endpoint>,
        operation: &mut Operation,
    ) -> Result<()> {
        if let Some(rest) = line.strip_prefix(PATH_PREFIX) {
            endpoints.push(parse_endpoint(rest)?);
        } else if let Some(rest) = line.strip_prefix(TAGS_PREFIX) {
            operation.tags = rest
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        } else if let Some(rest) = line.strip_prefix(SUMMARY_PREFIX) {
            operation.summary = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(DESC_PREFIX) {
            operation.description = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(PARAM_PREFIX) {
            operation.parameters.push(parse_param(rest)?);
        } else if let Some(rest) = line.strip_prefix(REQUEST_PREFIX) {
            self.parse_request(rest, comment, unit, operation)?;
        } else if let Some(rest) = line.strip_prefix(RESPONSE_PREFIX) {
            self.parse_response(rest, comment, unit, operation)?;
        } else if let Some(rest) = line.strip_prefix(SECURITY_PREFIX) {
            self.parse_security(rest, operation)?;
        }
        Ok(())
    }

    /// `@openapiSecurity name type location key`
    fn parse_security(&mut self, input: &str, operation: &mut Operation) -> Result<()> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let [name, scheme_type, location, key] = tokens[..] else {
            return Err(Error::Validation(format!(
                "{} expects name, type, location and key",
                SECURITY_PREFIX
            )));
        };

        let scheme = if scheme_type == "http" {
            SecurityScheme {
                scheme_type: scheme_type.to_string(),
                name: None,
                location: None,
                scheme: Some(key.to_string()),
            }
        } else {
            SecurityScheme {
                scheme_type: scheme_type.to_string(),
                name: Some(key.to_string()),
                location: Some(location.to_string()),
                scheme: None,
            }
        };
        self.doc.register_security_scheme(name, scheme);

        let mut requirement = BTreeMap::new();
        requirement.insert(name.to_string(), Vec::new());
        operation.security.push(requirement);
        Ok(())
    }
}

fn parse_endpoint(input: &str) -> Result<Endpoint> {
    let mut tokens = input.split_whitespace();
    let method = tokens.next().unwrap_or_default().to_lowercase();
    let path = tokens.next().unwrap_or_default().to_string();
    let deprecated = tokens.next() == Some("deprecated");

    validate_path(&method, &path)?;
    Ok(Endpoint {
        method,
        path,
        deprecated,
    })
}

/// Leading whitespace and the `*` gutter of block doc comments.
fn strip_comment_decoration(line: &str) -> &str {
    let line = line.trim_start();
    match line.strip_prefix('*') {
        Some(rest) => rest.trim_start(),
        None => line,
    }
}

/// Splits off the first whitespace-delimited token; the rest is trimmed.
fn split_token(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.find(char::is_whitespace) {
        Some(i) => (&input[..i], input[i..].trim()),
        None => (input, ""),
    }
}
