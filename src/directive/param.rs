use super::split_token;
use super::validate::{validate_param, PARAM_TYPES};
use crate::document::Parameter;
use crate::error::Result;
use crate::schema_generator::Property;
use crate::tags::parse_params;
use crate::type_resolver::primitive;
use log::debug;

/// Attributes of an `@openapiParam` line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamAttributes {
    pub location: Option<String>,
    pub param_type: Option<String>,
    pub format: Option<String>,
    pub example: Option<String>,
    pub default: Option<String>,
    pub description: Option<String>,
    /// `Some` only when `required` was written
    pub required: Option<bool>,
}

impl ParamAttributes {
    pub fn parse(input: &str) -> Self {
        let mut attrs = ParamAttributes::default();
        for (key, value) in parse_params(input) {
            match key.as_str() {
                "in" => attrs.location = Some(value),
                "type" => attrs.param_type = Some(value),
                "format" => attrs.format = Some(value),
                "example" => attrs.example = Some(value),
                "default" => attrs.default = Some(value),
                "description" => attrs.description = Some(value),
                "required" => attrs.required = Some(value != "false"),
                other => debug!("Unknown param attribute: {}", other),
            }
        }
        attrs
    }
}

/// Parses the text after `@openapiParam `: `name in=.., type=.., ...`.
pub fn parse_param(input: &str) -> Result<Parameter> {
    let (name, rest) = split_token(input);
    let attrs = ParamAttributes::parse(rest);

    let location = attrs.location.unwrap_or_default();
    let required = attrs.required.unwrap_or(location == "path");

    let declared = attrs.param_type.unwrap_or_default();
    let (param_type, table_format) = if PARAM_TYPES.contains(&declared.as_str()) {
        (declared, None)
    } else {
        match primitive(&declared) {
            Some((schema_type, format)) => (schema_type.to_string(), format),
            None => (declared, None),
        }
    };

    let param = Parameter {
        name: name.to_string(),
        location,
        required,
        description: attrs.description,
        schema: Property {
            property_type: Some(param_type),
            format: attrs.format.or_else(|| table_format.map(str::to_string)),
            example: attrs.example,
            default: attrs.default,
            ..Default::default()
        },
    };

    validate_param(&param)?;
    Ok(param)
}
