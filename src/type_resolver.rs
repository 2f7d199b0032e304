use crate::catalog::{type_ref_text, NominalTypeDefinition, StructCatalog, TypeShape};
use crate::error::{Error, Result};
use crate::resolver::CrossReferenceResolver;
use crate::scanner::CompilationUnit;
use log::debug;

/// Classification of a type reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Primitive,
    Temporal,
    Map,
    Array,
    Nominal,
}

/// A classified type reference, built fresh for every lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub kind: DescriptorKind,
    /// Primitive name, or local name of the nominal type
    pub name: String,
    /// Unit the name was resolved in
    pub unit: CompilationUnit,
    /// Element descriptor, `Array` only
    pub nested: Option<Box<TypeDescriptor>>,
}

impl TypeDescriptor {
    fn leaf(kind: DescriptorKind, name: &str, unit: &CompilationUnit) -> Self {
        Self {
            kind,
            name: name.to_string(),
            unit: unit.clone(),
            nested: None,
        }
    }
}

/// Schema `(type, format)` of a built-in name.
pub fn primitive(name: &str) -> Option<(&'static str, Option<&'static str>)> {
    let mapped = match name {
        "bool" => ("boolean", None),
        "String" | "str" | "char" => ("string", None),
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => ("integer", Some("int32")),
        "i64" | "i128" | "u64" | "u128" | "isize" | "usize" => ("integer", Some("int64")),
        "int" | "uint" => ("integer", None),
        "f32" | "float" => ("number", Some("float")),
        "f64" => ("number", Some("double")),
        "[]u8" | "Bytes" | "bytes.Bytes" => ("string", Some("binary")),
        "Uuid" | "uuid.Uuid" => ("string", Some("uuid")),
        _ => return None,
    };
    Some(mapped)
}

const TEMPORAL_NAMES: &[&str] = &[
    "DateTime",
    "NaiveDateTime",
    "OffsetDateTime",
    "PrimitiveDateTime",
    "SystemTime",
];

const TEMPORAL_QUALIFIERS: &[&str] = &["chrono", "time", "std::time"];

/// Date-time types, bare or qualified by their crate.
pub fn is_temporal(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((qualifier, local)) => {
            TEMPORAL_QUALIFIERS.contains(&qualifier) && TEMPORAL_NAMES.contains(&local)
        }
        None => TEMPORAL_NAMES.contains(&name),
    }
}

/// Canonicalizes a type reference written in a directive.
///
/// Both the canonical form (`[]models.User`) and Rust syntax (`Vec<models::User>`) are
/// accepted; Rust syntax goes through the same rules as declared field types.
pub fn canonicalize_ref(text: &str, module_path: &str) -> String {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("[]") {
        return format!("[]{}", canonicalize_ref(rest, module_path));
    }
    if let Some(rest) = text.strip_prefix('*') {
        return format!("*{}", canonicalize_ref(rest, module_path));
    }

    match syn::parse_str::<syn::Type>(text) {
        Ok(ty) => {
            let canonical = type_ref_text(&ty, module_path);
            if canonical.is_empty() {
                text.to_string()
            } else {
                canonical
            }
        }
        Err(_) => text.to_string(),
    }
}

/// Type descriptor builder: classifies type references using the catalog and resolver.
pub struct TypeResolver {
    catalog: StructCatalog,
    resolver: CrossReferenceResolver,
}

impl TypeResolver {
    pub fn new(catalog: StructCatalog, resolver: CrossReferenceResolver) -> Self {
        Self { catalog, resolver }
    }

    pub fn catalog(&mut self) -> &mut StructCatalog {
        &mut self.catalog
    }

    /// Looks up the declaration behind a nominal descriptor.
    pub fn definition(&mut self, descriptor: &TypeDescriptor) -> Result<Option<NominalTypeDefinition>> {
        self.catalog.lookup(&descriptor.unit, &descriptor.name)
    }

    /// Describes a canonical type reference as seen from `unit`.
    ///
    /// # Errors
    ///
    /// Resolution failures (`ReferenceNotFound`, `PathUnresolved`, `TypeNotFound`,
    /// `AliasCycle`) and fatal load failures of any unit visited on the way.
    pub fn describe(&mut self, type_ref: &str, unit: &CompilationUnit) -> Result<TypeDescriptor> {
        self.describe_chain(type_ref, unit, &mut Vec::new())
    }

    /// Describes a reference written in a directive of a file with `module_path`.
    pub fn describe_written(
        &mut self,
        text: &str,
        unit: &CompilationUnit,
        module_path: &str,
    ) -> Result<TypeDescriptor> {
        let canonical = canonicalize_ref(text, module_path);
        debug!("Directive type {} -> {}", text, canonical);
        self.describe(&canonical, unit)
    }

    fn describe_chain(
        &mut self,
        type_ref: &str,
        unit: &CompilationUnit,
        chain: &mut Vec<String>,
    ) -> Result<TypeDescriptor> {
        let name = type_ref.trim_start_matches('*');

        if is_temporal(name) {
            return Ok(TypeDescriptor::leaf(DescriptorKind::Temporal, name, unit));
        }
        if primitive(name).is_some() {
            return Ok(TypeDescriptor::leaf(DescriptorKind::Primitive, name, unit));
        }
        if name == "map" {
            return Ok(TypeDescriptor::leaf(DescriptorKind::Map, name, unit));
        }
        if let Some(element) = name.strip_prefix("[]") {
            let nested = self.describe_chain(element, unit, chain)?;
            return Ok(TypeDescriptor {
                kind: DescriptorKind::Array,
                name: name.to_string(),
                unit: unit.clone(),
                nested: Some(Box::new(nested)),
            });
        }
        if let Some((qualifier, local)) = name.rsplit_once('.') {
            let foreign = self.resolver.resolve(qualifier, unit, &mut self.catalog)?;
            debug!("{} resolved to unit {}", name, foreign.import_path);
            return self.describe_chain(local, &foreign, chain);
        }

        if let Some(definition) = self.catalog.lookup(unit, name)? {
            return match definition.shape {
                TypeShape::Alias(target) => {
                    let key = format!("{}.{}", unit.import_path, name);
                    let repeated = chain.contains(&key);
                    chain.push(key);
                    if repeated {
                        return Err(Error::AliasCycle {
                            chain: chain.clone(),
                        });
                    }
                    self.describe_chain(&target, unit, chain)
                }
                TypeShape::Record(_) | TypeShape::Enumeration(_) => {
                    Ok(TypeDescriptor::leaf(DescriptorKind::Nominal, name, &definition.unit))
                }
            };
        }

        self.describe_imported(name, unit, chain)
    }

    /// Unqualified names missing from the catalog: `use` bindings, then glob imports.
    fn describe_imported(
        &mut self,
        name: &str,
        unit: &CompilationUnit,
        chain: &mut Vec<String>,
    ) -> Result<TypeDescriptor> {
        let index = self.catalog.index(unit)?;
        let binding = index.binding(name).cloned();
        let globs = index.globs.clone();

        if let Some(binding) = binding {
            if let Some((module, local)) = binding.path.rsplit_once("::") {
                // Re-exports that lead back here never reach a declaration.
                let hop = format!("{}::{}", unit.import_path, name);
                if chain.contains(&hop) {
                    debug!("Import of {} loops back through {}", name, hop);
                    return Err(self.not_found(name, unit));
                }
                chain.push(hop);

                debug!("{} is imported from {}", name, binding.path);
                return self.describe_chain(&format!("{}.{}", module, local), unit, chain);
            }
        }

        for glob in &globs {
            let foreign = match self.resolver.resolve(glob, unit, &mut self.catalog) {
                Ok(foreign) if foreign != *unit => foreign,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Skipping glob import {}: {}", glob, e);
                    continue;
                }
            };
            if self.catalog.lookup(&foreign, name)?.is_some() {
                return self.describe_chain(name, &foreign, chain);
            }
        }

        Err(self.not_found(name, unit))
    }

    fn not_found(&self, name: &str, unit: &CompilationUnit) -> Error {
        Error::TypeNotFound {
            name: name.to_string(),
            import_path: unit.import_path.clone(),
            dir: unit.dir.clone(),
        }
    }
}
