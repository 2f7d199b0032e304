use crate::schema_generator::{Property, Schema};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// OpenAPI version written to every document
pub const OPENAPI_VERSION: &str = "3.0.0";

/// The document being accumulated during one run.
///
/// Operations and named schemas are only ever added (a failed schema expansion removes
/// its own placeholder again). Maps are ordered so output is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub openapi: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub servers: Vec<Server>,
    /// Request path -> lower-case method -> operation
    pub paths: BTreeMap<String, BTreeMap<String, Operation>>,
    pub components: Components,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    /// Named schemas keyed by dedup key
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub schemas: BTreeMap<String, Schema>,
    #[serde(
        rename = "securitySchemes",
        skip_serializing_if = "BTreeMap::is_empty",
        default
    )]
    pub security_schemes: BTreeMap<String, SecurityScheme>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

/// OpenAPI Operation object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub deprecated: bool,
    /// Status code -> response
    pub responses: BTreeMap<String, Response>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// Parameter location (path, query, header)
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Property,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Content type -> media entry
    pub content: BTreeMap<String, Content>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub content: BTreeMap<String, Content>,
}

/// A media entry: a schema, a literal example, or neither.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl Document {
    pub fn new(info: Info, servers: Vec<Server>) -> Self {
        debug!("Initializing document '{}' {}", info.title, info.version);
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info,
            servers,
            paths: BTreeMap::new(),
            components: Components::default(),
        }
    }

    /// Adds an operation; a second operation for the same path and method replaces the first.
    pub fn add_operation(&mut self, path: &str, method: &str, operation: Operation) {
        debug!("Adding operation: {} {}", method.to_uppercase(), path);
        let methods = self.paths.entry(path.to_string()).or_default();
        if methods.insert(method.to_string(), operation).is_some() {
            warn!("Operation {} {} declared twice, keeping the last one", method.to_uppercase(), path);
        }
    }

    pub fn operation(&self, path: &str, method: &str) -> Option<&Operation> {
        self.paths.get(path)?.get(method)
    }

    pub fn schema(&self, key: &str) -> Option<&Schema> {
        self.components.schemas.get(key)
    }

    pub fn schema_mut(&mut self, key: &str) -> Option<&mut Schema> {
        self.components.schemas.get_mut(key)
    }

    pub fn insert_schema(&mut self, key: &str, schema: Schema) {
        self.components.schemas.insert(key.to_string(), schema);
    }

    pub fn remove_schema(&mut self, key: &str) -> Option<Schema> {
        self.components.schemas.remove(key)
    }

    /// Registers a security scheme, overwriting an earlier one of the same name.
    pub fn register_security_scheme(&mut self, name: &str, scheme: SecurityScheme) {
        if let Some(previous) = self.components.security_schemes.insert(name.to_string(), scheme) {
            debug!("Security scheme {} replaced (was {:?})", name, previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_document() -> Document {
        Document::new(
            Info {
                title: "Test API".to_string(),
                version: "1.0.0".to_string(),
                description: None,
            },
            vec![Server {
                url: "https://localhost:8000".to_string(),
            }],
        )
    }

    fn operation(summary: &str) -> Operation {
        let mut op = Operation {
            summary: Some(summary.to_string()),
            ..Default::default()
        };
        op.responses.insert(
            "200".to_string(),
            Response {
                description: String::new(),
                content: BTreeMap::new(),
            },
        );
        op
    }

    #[test]
    fn test_new_document() {
        let doc = test_document();
        assert_eq!(doc.openapi, "3.0.0");
        assert!(doc.paths.is_empty());
        assert!(doc.components.schemas.is_empty());
    }

    #[test]
    fn test_add_operations() {
        let mut doc = test_document();
        doc.add_operation("/users", "get", operation("list"));
        doc.add_operation("/users", "post", operation("create"));
        doc.add_operation("/users", "get", operation("list again"));

        assert_eq!(doc.paths["/users"].len(), 2);
        assert_eq!(
            doc.operation("/users", "get").unwrap().summary.as_deref(),
            Some("list again")
        );
        assert!(doc.operation("/users", "delete").is_none());
    }

    #[test]
    fn test_schema_table() {
        let mut doc = test_document();
        doc.insert_schema("User", Schema::default());
        assert!(doc.schema("User").is_some());

        doc.schema_mut("User").unwrap().description = Some("A user".to_string());
        assert_eq!(doc.schema("User").unwrap().description.as_deref(), Some("A user"));

        assert!(doc.remove_schema("User").is_some());
        assert!(doc.schema("User").is_none());
    }

    #[test]
    fn test_security_scheme_overwrite() {
        let mut doc = test_document();
        let scheme = |location: &str| SecurityScheme {
            scheme_type: "apiKey".to_string(),
            name: Some("X-Key".to_string()),
            location: Some(location.to_string()),
            scheme: None,
        };
        doc.register_security_scheme("api_key", scheme("header"));
        doc.register_security_scheme("api_key", scheme("cookie"));

        assert_eq!(doc.components.security_schemes.len(), 1);
        assert_eq!(
            doc.components.security_schemes["api_key"].location.as_deref(),
            Some("cookie")
        );
    }

    #[test]
    fn test_serialization_skips_empty_sections() {
        let mut doc = test_document();
        doc.add_operation("/health", "get", operation("health"));

        let json = serde_json::to_value(&doc).unwrap();
        let op = &json["paths"]["/health"]["get"];
        assert!(op.get("deprecated").is_none());
        assert!(op.get("parameters").is_none());
        assert!(op.get("requestBody").is_none());
        assert_eq!(op["responses"]["200"]["description"], "");
        assert!(json["components"].get("schemas").is_none());
    }
}
