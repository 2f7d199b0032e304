//! OpenAPI from comments - OpenAPI 3.0 documentation from annotated Rust doc comments.
//!
//! Handlers carry directive lines in their doc comments (`@openapi GET /users/{id}`,
//! `@openapiParam`, `@openapiRequest`, `@openapiResponse`, ...). Request and response
//! payloads name ordinary Rust types, which are looked up across the module tree and
//! turned into a deduplicated, cycle-safe set of named schemas.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Finds the modules (compilation units) of a crate
//! 2. [`parser`] - Parses module files and collects doc comments
//! 3. [`catalog`] - Indexes the types, imports and comments of each unit, lazily
//! 4. [`resolver`] - Maps module qualifiers to units through `use` bindings
//! 5. [`type_resolver`] - Classifies type references into descriptors
//! 6. [`schema_generator`] - Turns descriptors into schemas, honoring [`tags`]
//! 7. [`directive`] - Parses directive comments into operations
//! 8. [`document`] - The accumulated OpenAPI document
//! 9. [`generator`] - Runs the whole pipeline over a source tree
//! 10. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_comments::generator::{generate, GeneratorOptions};
//! use openapi_from_comments::serializer::serialize_yaml;
//!
//! let generation = generate(&GeneratorOptions::new("./my-project/src")).unwrap();
//! for error in &generation.errors {
//!     eprintln!("{}", error);
//! }
//! println!("{}", serialize_yaml(&generation.document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod catalog;
pub mod cli;
pub mod directive;
pub mod document;
pub mod error;
pub mod generator;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod tags;
pub mod type_resolver;
