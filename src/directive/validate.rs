use crate::document::Parameter;
use crate::error::{Error, Result};

pub const HTTP_METHODS: &[&str] = &[
    "get", "head", "post", "put", "delete", "connect", "options", "trace", "patch",
];

pub const PARAM_LOCATIONS: &[&str] = &["path", "query", "header"];

/// Schema types a parameter may declare directly
pub const PARAM_TYPES: &[&str] = &["string", "integer", "number", "boolean", "object", "array"];

pub const REQUEST_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "multipart/form-data",
    "application/x-www-form-urlencoded",
];

pub const RESPONSE_CONTENT_TYPES: &[&str] =
    &["text/plain", "application/json", "application/octet-stream"];

fn invalid(message: &str) -> Error {
    Error::Validation(message.to_string())
}

/// `method` must already be lower-cased.
pub fn validate_path(method: &str, path: &str) -> Result<()> {
    if !HTTP_METHODS.contains(&method) {
        return Err(invalid("Unknown HTTP method"));
    }
    if !path.starts_with('/') || path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("Invalid HTTP path"));
    }
    Ok(())
}

pub fn validate_param(param: &Parameter) -> Result<()> {
    if param.name.is_empty() {
        return Err(invalid("Invalid param name"));
    }
    if !PARAM_LOCATIONS.contains(&param.location.as_str()) {
        return Err(invalid("Invalid param 'in'"));
    }
    match param.schema.property_type.as_deref() {
        Some(t) if PARAM_TYPES.contains(&t) => Ok(()),
        _ => Err(invalid("Invalid param 'type'")),
    }
}

pub fn validate_request_content_type(content_type: &str) -> Result<()> {
    if REQUEST_CONTENT_TYPES.contains(&content_type) {
        Ok(())
    } else {
        Err(invalid("Unsupported Content-Type"))
    }
}

pub fn validate_response_content_type(content_type: &str) -> Result<()> {
    if RESPONSE_CONTENT_TYPES.contains(&content_type) {
        Ok(())
    } else {
        Err(invalid("Unsupported Content-Type"))
    }
}

/// Parses an HTTP status code in the range 100..=526.
pub fn validate_status(status: &str) -> Result<u16> {
    match status.parse::<u16>() {
        Ok(code) if (100..=526).contains(&code) => Ok(code),
        _ => Err(invalid("Invalid HTTP status code")),
    }
}
