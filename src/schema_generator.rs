use crate::catalog::{FieldDefinition, TypeShape};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::scanner::CompilationUnit;
use crate::tags::FieldTags;
use crate::type_resolver::{primitive, DescriptorKind, TypeDescriptor, TypeResolver};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of every reference into the schema table
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Schema generator - turns type descriptors into OpenAPI schemas
///
/// Nominal types are expanded into the document's schema table exactly once per
/// (name, unit) pair and referenced everywhere else.
pub struct SchemaGenerator {
    types: TypeResolver,
    /// Keys inserted by expansions still in progress, innermost last
    pending: Vec<String>,
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "int64", "float", "double")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Property>>,
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<Schema>>,
    /// Required field names for object types, in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Enum values for enum types
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Import path of the unit that owns the type, used for deduplication
    #[serde(skip)]
    pub origin: Option<String>,
}

/// Property definition for object schemas and parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// The type of the property
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Property>>,
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<Schema>>,
    /// Items schema for array properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// `x-*` vendor extensions
    #[serde(flatten)]
    pub extensions: BTreeMap<String, String>,
}

impl Schema {
    /// A schema that only points at a table entry.
    pub fn reference(key: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", SCHEMA_REF_PREFIX, key)),
            ..Default::default()
        }
    }

    fn typed(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: format.map(str::to_string),
            ..Default::default()
        }
    }
}

impl From<Schema> for Property {
    fn from(schema: Schema) -> Self {
        Self {
            property_type: schema.schema_type,
            format: schema.format,
            description: schema.description,
            enum_values: schema.enum_values,
            properties: schema.properties,
            additional_properties: schema.additional_properties,
            items: schema.items,
            reference: schema.reference,
            ..Default::default()
        }
    }
}

impl SchemaGenerator {
    pub fn new(types: TypeResolver) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            types,
            pending: Vec::new(),
        }
    }

    /// The type descriptor builder shared with directive parsing.
    pub fn types(&mut self) -> &mut TypeResolver {
        &mut self.types
    }

    /// Schema for a descriptor; nominal types come back as references only.
    ///
    /// # Errors
    ///
    /// Resolution errors raised while expanding a nominal type or any of its fields.
    pub fn schema_for(&mut self, doc: &mut Document, descriptor: &TypeDescriptor) -> Result<Schema> {
        debug!("Generating schema for {:?} {}", descriptor.kind, descriptor.name);

        match descriptor.kind {
            DescriptorKind::Primitive => {
                let (schema_type, format) = primitive(&descriptor.name).unwrap_or(("string", None));
                Ok(Schema::typed(schema_type, format))
            }
            DescriptorKind::Temporal => Ok(Schema::typed("string", Some("date-time"))),
            DescriptorKind::Map => Ok(Schema {
                additional_properties: Some(Box::default()),
                ..Schema::typed("object", None)
            }),
            DescriptorKind::Array => {
                let items = match descriptor.nested.as_deref() {
                    Some(nested) => self.schema_for(doc, nested)?,
                    None => Schema::default(),
                };
                Ok(Schema {
                    items: Some(Box::new(items)),
                    ..Schema::typed("array", None)
                })
            }
            DescriptorKind::Nominal => {
                let key = self.nominal_schema(doc, descriptor)?;
                Ok(Schema::reference(&key))
            }
        }
    }

    /// Property for a descriptor, used for fields and inline objects.
    pub fn property_for(&mut self, doc: &mut Document, descriptor: &TypeDescriptor) -> Result<Property> {
        self.schema_for(doc, descriptor).map(Property::from)
    }

    /// Makes sure the nominal type is in the table and returns its key.
    fn nominal_schema(&mut self, doc: &mut Document, descriptor: &TypeDescriptor) -> Result<String> {
        let (key, present) = dedup_key(&descriptor.name, &descriptor.unit, doc);
        if present {
            debug!("Schema {} already registered", key);
            return Ok(key);
        }

        // Registered before expansion so recursive references find it.
        doc.insert_schema(
            &key,
            Schema {
                origin: Some(descriptor.unit.import_path.clone()),
                ..Default::default()
            },
        );
        let mark = self.pending.len();
        self.pending.push(key.clone());

        let expanded = self.expand(doc, descriptor);
        let inserted = self.pending.split_off(mark);

        match expanded {
            Ok(schema) => {
                if let Some(slot) = doc.schema_mut(&key) {
                    *slot = schema;
                }
                // An enclosing expansion that fails later rolls these back too.
                if mark > 0 {
                    self.pending.extend(inserted);
                }
                debug!("Registered schema {}", key);
                Ok(key)
            }
            Err(e) => {
                // Everything inserted on the way may reference this key.
                for stale in &inserted {
                    debug!("Rolling back schema {}", stale);
                    doc.remove_schema(stale);
                }
                Err(e)
            }
        }
    }

    fn expand(&mut self, doc: &mut Document, descriptor: &TypeDescriptor) -> Result<Schema> {
        let definition = self
            .types
            .definition(descriptor)?
            .ok_or_else(|| Error::TypeNotFound {
                name: descriptor.name.clone(),
                import_path: descriptor.unit.import_path.clone(),
                dir: descriptor.unit.dir.clone(),
            })?;
        let origin = Some(definition.unit.import_path.clone());

        match definition.shape {
            TypeShape::Enumeration(values) => Ok(Schema {
                enum_values: Some(values),
                origin,
                ..Schema::typed("string", None)
            }),
            // Descriptors are built past aliases, so a nominal one never names an alias.
            TypeShape::Alias(_) => Err(Error::TypeNotFound {
                name: descriptor.name.clone(),
                import_path: descriptor.unit.import_path.clone(),
                dir: descriptor.unit.dir.clone(),
            }),
            TypeShape::Record(fields) => {
                let mut schema = Schema {
                    origin,
                    ..Schema::typed("object", None)
                };
                let mut properties = BTreeMap::new();
                let mut required = Vec::new();

                for field in &fields {
                    self.expand_field(
                        doc,
                        &definition.unit,
                        field,
                        &mut schema,
                        &mut properties,
                        &mut required,
                    )?;
                }

                schema.properties = (!properties.is_empty()).then_some(properties);
                schema.required = (!required.is_empty()).then_some(required);
                Ok(schema)
            }
        }
    }

    fn expand_field(
        &mut self,
        doc: &mut Document,
        unit: &CompilationUnit,
        field: &FieldDefinition,
        schema: &mut Schema,
        properties: &mut BTreeMap<String, Property>,
        required: &mut Vec<String>,
    ) -> Result<()> {
        let tags = FieldTags::parse(&field.tags);

        if field.system {
            schema.description = tags.description;
            return Ok(());
        }
        if tags.skip || !field.exported {
            debug!("Skipping field {}", field.name);
            return Ok(());
        }

        let name = tags.rename.clone().unwrap_or_else(|| field.name.clone());

        let mut property = match &tags.schema_type {
            Some(schema_type) => Property {
                property_type: Some(schema_type.clone()),
                ..Default::default()
            },
            None => {
                let descriptor = self.types.describe(&field.type_ref, unit)?;
                self.property_for(doc, &descriptor)?
            }
        };

        if tags.format.is_some() {
            property.format = tags.format;
        }
        if tags.example.is_some() {
            property.example = tags.example;
        }
        if tags.description.is_some() {
            property.description = tags.description;
        }
        if tags.default.is_some() {
            property.default = tags.default;
        }
        if !tags.enum_values.is_empty() {
            property.enum_values = Some(tags.enum_values);
        }
        property.extensions.extend(tags.extensions);

        if property.reference.is_some()
            && (property.description.is_some() || property.example.is_some())
        {
            warn!(
                "Field {} overrides a $ref; siblings of $ref may be ignored by readers",
                field.name
            );
        }

        if tags.required && !required.contains(&name) {
            required.push(name.clone());
        }
        properties.insert(name, property);
        Ok(())
    }
}

/// Finds the table key for `name` owned by `unit`.
///
/// Returns the key and whether the same unit already owns it. A key claimed by another
/// unit is prefixed with the unit's import path segments, innermost first
/// (`User`, `models.User`, `api.models.User`, ...); when even the full path is taken a
/// numeric suffix is appended.
pub fn dedup_key(name: &str, unit: &CompilationUnit, doc: &Document) -> (String, bool) {
    let origin = unit.import_path.as_str();
    let owned_by_unit = |key: &str| {
        doc.schema(key)
            .map(|schema| schema.origin.as_deref() == Some(origin))
    };

    let mut key = name.to_string();
    match owned_by_unit(&key) {
        None => return (key, false),
        Some(true) => return (key, true),
        Some(false) => {}
    }

    for segment in unit.segments().iter().rev() {
        key = format!("{}.{}", segment, key);
        match owned_by_unit(&key) {
            None => return (key, false),
            Some(true) => return (key, true),
            Some(false) => {}
        }
    }

    let base = key;
    let mut suffix = 2;
    loop {
        let candidate = format!("{}_{}", base, suffix);
        match owned_by_unit(&candidate) {
            None => return (candidate, false),
            Some(true) => return (candidate, true),
            Some(false) => suffix += 1,
        }
    }
}
