use super::validate::{validate_request_content_type, validate_response_content_type, validate_status};
use super::{split_token, DirectiveParser};
use crate::document::{Content, Operation};
use crate::error::{Error, Result};
use crate::parser::DocComment;
use crate::scanner::CompilationUnit;
use crate::schema_generator::Schema;
use crate::tags::split_top_level;
use log::debug;
use std::collections::BTreeMap;

impl DirectiveParser<'_> {
    /// `@openapiRequest content-type payload`
    pub(super) fn parse_request(
        &mut self,
        input: &str,
        comment: &DocComment,
        unit: &CompilationUnit,
        operation: &mut Operation,
    ) -> Result<()> {
        let (content_type, payload) = split_token(input);
        validate_request_content_type(content_type)?;

        let content = self.parse_payload(payload, comment, unit)?;
        operation
            .request_body
            .get_or_insert_with(Default::default)
            .content
            .insert(content_type.to_string(), content);
        Ok(())
    }

    /// `@openapiResponse status content-type payload`
    pub(super) fn parse_response(
        &mut self,
        input: &str,
        comment: &DocComment,
        unit: &CompilationUnit,
        operation: &mut Operation,
    ) -> Result<()> {
        let (status, rest) = split_token(input);
        let (content_type, payload) = split_token(rest);
        validate_status(status)?;
        validate_response_content_type(content_type)?;

        let content = if content_type == "application/octet-stream" {
            Content {
                schema: Some(Schema {
                    schema_type: Some("string".to_string()),
                    format: Some("binary".to_string()),
                    ..Default::default()
                }),
                example: None,
            }
        } else {
            self.parse_payload(payload, comment, unit)?
        };

        operation
            .responses
            .entry(status.to_string())
            .or_default()
            .content
            .insert(content_type.to_string(), content);
        Ok(())
    }

    /// Turns a payload into a media entry: JSON example, pseudo-schema or type reference.
    fn parse_payload(
        &mut self,
        payload: &str,
        comment: &DocComment,
        unit: &CompilationUnit,
    ) -> Result<Content> {
        if payload.is_empty() {
            return Ok(Content::default());
        }

        if payload.starts_with('{') {
            if serde_json::from_str::<serde_json::Value>(payload).is_ok() {
                debug!("Payload is a JSON example");
                return Ok(Content {
                    schema: None,
                    example: Some(payload.to_string()),
                });
            }

            let mut properties = BTreeMap::new();
            for (name, type_ref) in parse_pseudo_schema(payload)? {
                let descriptor = self
                    .schemas
                    .types()
                    .describe_written(&type_ref, unit, &comment.module_path)?;
                let property = self.schemas.property_for(self.doc, &descriptor)?;
                properties.insert(name, property);
            }

            return Ok(Content {
                schema: Some(Schema {
                    schema_type: Some("object".to_string()),
                    properties: (!properties.is_empty()).then_some(properties),
                    ..Default::default()
                }),
                example: None,
            });
        }

        let descriptor = self
            .schemas
            .types()
            .describe_written(payload, unit, &comment.module_path)?;
        let schema = self.schemas.schema_for(self.doc, &descriptor)?;
        Ok(Content {
            schema: Some(schema),
            example: None,
        })
    }
}

/// Splits `{name: Type, "other": Vec<Item>}` into ordered `(field, type reference)` pairs.
///
/// Commas inside `<>`, `[]` and `()` do not separate entries, and `::` is part of a path,
/// not a key separator.
pub fn parse_pseudo_schema(input: &str) -> Result<Vec<(String, String)>> {
    let inner = input.trim();
    let inner = inner.strip_prefix('{').unwrap_or(inner);
    let inner = inner.strip_suffix('}').unwrap_or(inner);

    let mut fields = Vec::new();
    for entry in split_top_level(inner, ',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (key, value) = match key_separator(entry) {
            Some(i) => (&entry[..i], &entry[i + 1..]),
            None => (entry, ""),
        };
        let key = key.trim().trim_matches('"');
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            return Err(Error::SchemaSyntax("Invalid JSON schema".to_string()));
        }
        fields.push((key.to_string(), value.to_string()));
    }

    Ok(fields)
}

/// Byte index of the first `:` that is not part of `::`.
fn key_separator(entry: &str) -> Option<usize> {
    let bytes = entry.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            if bytes.get(i + 1) == Some(&b':') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}
