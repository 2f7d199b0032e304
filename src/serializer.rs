//! Serialization module for converting the generated document to YAML or JSON format.
//!
//! This module provides functions to serialize a [`Document`] into standard formats
//! and write them to files or return them as strings.

use crate::document::Document;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes a document to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use openapi_from_comments::document::{Document, Info};
/// use openapi_from_comments::serializer::serialize_yaml;
///
/// let doc = Document::new(
///     Info { title: "Shop".to_string(), version: "1.0.0".to_string(), description: None },
///     Vec::new(),
/// );
/// let yaml = serialize_yaml(&doc).unwrap();
/// assert!(yaml.contains("openapi: 3.0.0"));
/// ```
pub fn serialize_yaml(doc: &Document) -> Result<String> {
    debug!("Serializing document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes a document to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &Document) -> Result<String> {
    debug!("Serializing document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// An existing file is overwritten.
///
/// # Errors
///
/// Returns an error if the directory or the file cannot be written.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Content, Info, Operation, Response, SecurityScheme, Server};
    use crate::schema_generator::Schema;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    /// Helper function to create a small document for testing
    fn create_test_document() -> Document {
        let mut doc = Document::new(
            Info {
                title: "Test API".to_string(),
                version: "1.0.0".to_string(),
                description: Some("A test API".to_string()),
            },
            vec![Server {
                url: "https://localhost:8000".to_string(),
            }],
        );

        let mut response = Response::default();
        response.content.insert(
            "application/json".to_string(),
            Content {
                schema: Some(Schema::reference("User")),
                example: None,
            },
        );
        let mut operation = Operation::default();
        operation.responses.insert("200".to_string(), response);
        doc.add_operation("/users/{id}", "get", operation);

        doc.insert_schema(
            "User",
            Schema {
                schema_type: Some("object".to_string()),
                origin: Some("crate::models".to_string()),
                ..Default::default()
            },
        );
        doc.register_security_scheme(
            "api_key",
            SecurityScheme {
                scheme_type: "apiKey".to_string(),
                name: Some("X-API-Key".to_string()),
                location: Some("header".to_string()),
                scheme: None,
            },
        );
        doc
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_document()).unwrap();

        assert!(yaml.contains("openapi: 3.0.0"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("https://localhost:8000"));
        assert!(yaml.contains("/users/{id}"));
        assert!(yaml.contains("#/components/schemas/User"));
        assert!(yaml.contains("securitySchemes:"));
        assert!(!yaml.contains("origin"));
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&create_test_document()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.0.0");
        assert_eq!(parsed["info"]["title"], "Test API");
        assert_eq!(
            parsed["paths"]["/users/{id}"]["get"]["responses"]["200"]["content"]["application/json"]
                ["schema"]["$ref"],
            "#/components/schemas/User"
        );
        assert_eq!(parsed["components"]["securitySchemes"]["api_key"]["in"], "header");
        assert!(parsed["components"]["schemas"]["User"].get("origin").is_none());
    }

    #[test]
    fn test_serialize_json_pretty_format() {
        let json = serialize_json(&create_test_document()).unwrap();

        assert!(json.contains('\n'));
        assert!(json.contains("  "));
        assert!(json.lines().count() > 5, "Pretty printed JSON should have multiple lines");
    }

    #[test]
    fn test_empty_collections_are_omitted() {
        let doc = Document::new(
            Info {
                title: "Empty".to_string(),
                version: "0.1.0".to_string(),
                description: None,
            },
            Vec::new(),
        );
        let json = serialize_json(&doc).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(parsed.get("servers").is_none());
        assert!(parsed["info"].get("description").is_none());
        assert!(parsed["components"].get("schemas").is_none());
        assert!(parsed["paths"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("test.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[test]
    fn test_write_yaml_file_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("openapi.yaml");

        let yaml = serialize_yaml(&create_test_document()).unwrap();
        write_to_file(&yaml, &file_path).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        let deserialized: Document = serde_yaml::from_str(&content).unwrap();
        assert_eq!(deserialized.info.title, "Test API");
        assert!(deserialized.schema("User").is_some());
    }
}
