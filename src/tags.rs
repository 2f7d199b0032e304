use log::{debug, warn};
use std::collections::BTreeMap;

/// One field attribute in raw, unparsed form.
///
/// `#[serde(rename = "id")]` is stored as namespace `serde` and value `rename = "id"`;
/// `#[openapi_desc = "text"]` as namespace `openapi_desc` and value `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag {
    pub namespace: String,
    pub value: String,
}

/// Attribute namespaces that carry field metadata.
pub const NAMESPACES: &[&str] = &[
    "serde",
    "openapi",
    "openapi_desc",
    "openapi_enum",
    "openapi_example",
    "openapi_ext",
];

/// Typed view over the metadata attributes of one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTags {
    /// Output name from `serde(rename = ..)`
    pub rename: Option<String>,
    /// `serde(skip)` or `serde(skip_serializing)`
    pub skip: bool,
    /// Explicit schema type, bypasses inference
    pub schema_type: Option<String>,
    pub format: Option<String>,
    pub example: Option<String>,
    pub default: Option<String>,
    pub required: bool,
    pub enum_values: Vec<String>,
    pub description: Option<String>,
    /// `x-*` vendor extensions
    pub extensions: BTreeMap<String, String>,
    /// The field documents its enclosing type instead of being a property
    pub system: bool,
}

impl RawTag {
    /// Extracts the metadata attributes of a field, ignoring unrelated ones.
    pub fn from_attrs(attrs: &[syn::Attribute]) -> Vec<RawTag> {
        attrs.iter().filter_map(Self::from_attr).collect()
    }

    fn from_attr(attr: &syn::Attribute) -> Option<RawTag> {
        let namespace = attr.path().get_ident()?.to_string();
        if !NAMESPACES.contains(&namespace.as_str()) {
            return None;
        }

        let value = match &attr.meta {
            syn::Meta::Path(_) => String::new(),
            syn::Meta::List(list) => list.tokens.to_string(),
            syn::Meta::NameValue(nv) => match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => s.value(),
                other => {
                    warn!("Ignoring non-string value for #[{}]: {:?}", namespace, other);
                    return None;
                }
            },
        };

        Some(RawTag { namespace, value })
    }
}

impl FieldTags {
    /// Parses raw tags. Dedicated namespaces win over the same key inside `openapi(..)`.
    pub fn parse(tags: &[RawTag]) -> Self {
        let mut parsed = FieldTags::default();

        for tag in tags.iter().filter(|t| t.namespace == "serde") {
            for (key, value) in parse_params(&tag.value) {
                match key.as_str() {
                    "rename" if !value.is_empty() && !value.starts_with('(') => {
                        parsed.rename = Some(value)
                    }
                    "skip" | "skip_serializing" => parsed.skip = true,
                    _ => {}
                }
            }
        }

        for tag in tags.iter().filter(|t| t.namespace == "openapi") {
            for (key, value) in parse_params(&tag.value) {
                match key.as_str() {
                    "type" => parsed.schema_type = Some(value),
                    "format" => parsed.format = Some(value),
                    "example" => parsed.example = Some(value),
                    "default" => parsed.default = Some(value),
                    "required" => parsed.required = true,
                    "enum" => parsed.enum_values = split_list(&value),
                    "description" => parsed.description = Some(value),
                    "system" => parsed.system = true,
                    other => debug!("Unknown openapi attribute key: {}", other),
                }
            }
        }

        for tag in tags {
            match tag.namespace.as_str() {
                "openapi_desc" => parsed.description = Some(unquote(tag.value.trim())),
                "openapi_example" => parsed.example = Some(unquote(tag.value.trim())),
                "openapi_enum" => parsed.enum_values = split_list(&unquote(tag.value.trim())),
                "openapi_ext" => {
                    for (key, value) in parse_params(&unquote(tag.value.trim())) {
                        if key.starts_with("x-") {
                            parsed.extensions.insert(key, value);
                        } else {
                            warn!("Extension key must start with 'x-': {}", key);
                        }
                    }
                }
                _ => {}
            }
        }

        parsed
    }
}

/// Splits `key=value, key, key="a, b"` into ordered pairs.
///
/// Commas only separate at nesting depth zero and outside double quotes. A bare key gets
/// an empty value. Quoted values are unquoted; values starting with `{` or `[` have single
/// quotes turned into double quotes so JSON-ish examples can be written inline.
pub fn parse_params(input: &str) -> Vec<(String, String)> {
    split_top_level(input, ',')
        .into_iter()
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let (key, value) = match part.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => (part, ""),
            };
            let value = if value.starts_with('{') || value.starts_with('[') {
                value.replace('\'', "\"")
            } else {
                unquote(value)
            };
            Some((key.to_string(), value))
        })
        .collect()
}

/// Splits at `separator` outside quotes and outside `{}`, `[]`, `()` and `<>` groups.
pub fn split_top_level(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_quotes {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quotes = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                current.push(c);
            }
            '{' | '[' | '(' | '<' => {
                depth += 1;
                current.push(c);
            }
            '}' | ']' | ')' | '>' => {
                depth -= 1;
                current.push(c);
            }
            c if c == separator && depth <= 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Strips one pair of surrounding double quotes, resolving Rust string escapes.
pub fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        match syn::parse_str::<syn::LitStr>(value) {
            Ok(lit) => lit.value(),
            Err(_) => value[1..value.len() - 1].to_string(),
        }
    } else {
        value.to_string()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn field_tags(code: &str) -> FieldTags {
        let item: syn::ItemStruct = syn::parse_str(code).unwrap();
        let field = item.fields.iter().next().unwrap();
        FieldTags::parse(&RawTag::from_attrs(&field.attrs))
    }

    fn pairs(input: &str) -> Vec<(String, String)> {
        parse_params(input)
    }

    #[test]
    fn test_parse_params_basic() {
        assert_eq!(
            pairs("in=path, type=int, example=11, required"),
            vec![
                ("in".to_string(), "path".to_string()),
                ("type".to_string(), "int".to_string()),
                ("example".to_string(), "11".to_string()),
                ("required".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_parse_params_keeps_nested_commas() {
        let parsed = pairs("example={'a': 1, 'b': [1, 2]}, description=\"x, y\"");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].1, r#"{"a": 1, "b": [1, 2]}"#);
        assert_eq!(parsed[1].1, "x, y");
    }

    #[test]
    fn test_parse_params_value_with_equals() {
        let parsed = pairs("description=a=b");
        assert_eq!(parsed, vec![("description".to_string(), "a=b".to_string())]);
    }

    #[test]
    fn test_serde_tags() {
        let tags = field_tags(r#"struct S { #[serde(rename = "userId")] pub user_id: u64 }"#);
        assert_eq!(tags.rename.as_deref(), Some("userId"));
        assert!(!tags.skip);

        let tags = field_tags(r#"struct S { #[serde(skip)] pub secret: String }"#);
        assert!(tags.skip);

        let tags =
            field_tags(r#"struct S { #[serde(skip_serializing_if = "Option::is_none")] pub a: Option<u8> }"#);
        assert!(!tags.skip);
    }

    #[test]
    fn test_openapi_structural_keys() {
        let tags = field_tags(
            r#"struct S {
                #[openapi(type = "string", format = "uuid", example = "abc", default = "x", required, enum = "a,b")]
                pub id: Id
            }"#,
        );

        assert_eq!(tags.schema_type.as_deref(), Some("string"));
        assert_eq!(tags.format.as_deref(), Some("uuid"));
        assert_eq!(tags.example.as_deref(), Some("abc"));
        assert_eq!(tags.default.as_deref(), Some("x"));
        assert!(tags.required);
        assert_eq!(tags.enum_values, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_dedicated_namespaces_override() {
        let tags = field_tags(
            r#"struct S {
                #[openapi(description = "structural", example = "1")]
                #[openapi_desc = "dedicated"]
                #[openapi_example("2")]
                #[openapi_enum = "red, green"]
                #[openapi_ext = "x-order=1, x-hidden=true, bogus=2"]
                pub color: String
            }"#,
        );

        assert_eq!(tags.description.as_deref(), Some("dedicated"));
        assert_eq!(tags.example.as_deref(), Some("2"));
        assert_eq!(tags.enum_values, vec!["red".to_string(), "green".to_string()]);
        assert_eq!(tags.extensions.len(), 2);
        assert_eq!(tags.extensions.get("x-order").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_system_marker() {
        let tags = field_tags(r#"struct S { #[openapi(system, description = "A user")] meta: () }"#);
        assert!(tags.system);
        assert_eq!(tags.description.as_deref(), Some("A user"));
    }

    #[test]
    fn test_unrelated_attributes_ignored() {
        let item: syn::ItemStruct =
            syn::parse_str(r#"struct S { #[allow(dead_code)] #[doc = "x"] pub a: u8 }"#).unwrap();
        let field = item.fields.iter().next().unwrap();
        assert!(RawTag::from_attrs(&field.attrs).is_empty());
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""{\"a\": 1}""#), r#"{"a": 1}"#);
        assert_eq!(unquote("plain"), "plain");
    }
}
