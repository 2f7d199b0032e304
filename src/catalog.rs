use crate::error::Result;
use crate::parser::{collect_doc_comments, is_cfg_test, DocComment, ParsedFile, SourceLoader};
use crate::scanner::CompilationUnit;
use crate::tags::{FieldTags, RawTag};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

/// A named type declared in a compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct NominalTypeDefinition {
    /// Unit the declaration lives in
    pub unit: CompilationUnit,
    pub name: String,
    pub shape: TypeShape,
}

/// What a declaration means for documentation purposes.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    /// Pure rename of another type reference (`type A = B;`, `struct A(B);`)
    Alias(String),
    /// Field record, exported fields only
    Record(Vec<FieldDefinition>),
    /// Enum made of unit variants only
    Enumeration(Vec<String>),
}

/// A field of a record, with its declared type in canonical text form.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    /// Canonical type text, e.g. `*[]models.User`
    pub type_ref: String,
    pub tags: Vec<RawTag>,
    pub exported: bool,
    pub system: bool,
}

/// A `use` leaf or `mod` declaration: `name` refers to the absolute `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub name: String,
    pub path: String,
}

/// Everything the engine needs to know about one unit.
#[derive(Debug, Default)]
pub struct UnitIndex {
    pub types: BTreeMap<String, NominalTypeDefinition>,
    /// Bindings visible in this module only
    pub imports: Vec<ImportBinding>,
    /// Module paths imported with `*`
    pub globs: Vec<String>,
    /// Names of the inline `mod x { .. }` blocks declared here
    pub modules: Vec<String>,
    /// Doc comments of the module's own items, in file then source order
    pub comments: Vec<DocComment>,
}

impl UnitIndex {
    /// The binding introduced under `name`, if any.
    pub fn binding(&self, name: &str) -> Option<&ImportBinding> {
        self.imports.iter().find(|b| b.name == name)
    }
}

/// Per-unit index of declared types, loaded lazily and memoized by import path.
///
/// The memo is never invalidated. A run reads each source file once and sources are
/// assumed not to change while it lasts, so the first index built for a unit stays
/// valid until the catalog is dropped.
pub struct StructCatalog {
    loader: Box<dyn SourceLoader>,
    units: HashMap<String, UnitIndex>,
}

impl StructCatalog {
    pub fn new(loader: Box<dyn SourceLoader>) -> Self {
        Self {
            loader,
            units: HashMap::new(),
        }
    }

    /// Returns the index of `unit`, loading and classifying it on first request.
    ///
    /// Loading a file module also indexes the inline modules written in it, so asking for
    /// one of those later costs nothing. A unit that declares nothing gets an empty index.
    ///
    /// # Errors
    ///
    /// Load failures (I/O or syntax) are returned as-is and are fatal.
    pub fn index(&mut self, unit: &CompilationUnit) -> Result<&UnitIndex> {
        if !self.units.contains_key(&unit.import_path) {
            let files = self.loader.load(unit)?;
            for (import_path, index) in build_indexes(unit, &files) {
                debug!(
                    "Indexed unit {}: {} types, {} imports, {} comments",
                    import_path,
                    index.types.len(),
                    index.imports.len(),
                    index.comments.len()
                );
                self.units.entry(import_path).or_insert(index);
            }
        }

        Ok(self.units.entry(unit.import_path.clone()).or_default())
    }

    /// Declared types of `unit` keyed by name.
    pub fn types(&mut self, unit: &CompilationUnit) -> Result<&BTreeMap<String, NominalTypeDefinition>> {
        Ok(&self.index(unit)?.types)
    }

    /// Looks up one declared type, cloned out of the memo.
    pub fn lookup(&mut self, unit: &CompilationUnit, name: &str) -> Result<Option<NominalTypeDefinition>> {
        Ok(self.types(unit)?.get(name).cloned())
    }
}

/// Indexes every module written in `files`: the file module itself and its inline modules.
fn build_indexes(unit: &CompilationUnit, files: &[ParsedFile]) -> BTreeMap<String, UnitIndex> {
    let mut indexes = BTreeMap::new();

    for file in files {
        let depth = file.module_path.split("::").count();
        let module = unit.ancestor(unit.segments().len().saturating_sub(depth));
        index_module(&file.syntax_tree.items, &module, &mut indexes);

        for comment in collect_doc_comments(file) {
            indexes
                .entry(comment.module_path.clone())
                .or_default()
                .comments
                .push(comment);
        }
    }

    indexes
}

fn index_module(
    items: &[syn::Item],
    unit: &CompilationUnit,
    indexes: &mut BTreeMap<String, UnitIndex>,
) {
    let mut inline = Vec::new();
    let index = indexes.entry(unit.import_path.clone()).or_default();

    for item in items {
        match item {
            syn::Item::Mod(m) if !is_cfg_test(&m.attrs) => {
                let name = m.ident.to_string();
                let child = unit.child(&name);
                index.imports.push(ImportBinding {
                    name: name.clone(),
                    path: child.import_path.clone(),
                });
                if let Some((_, content)) = &m.content {
                    index.modules.push(name);
                    inline.push((child, content));
                }
            }
            _ => index_item(item, unit, index),
        }
    }

    for (child, content) in inline {
        index_module(content, &child, indexes);
    }
}

fn index_item(item: &syn::Item, unit: &CompilationUnit, index: &mut UnitIndex) {
    let module_path = unit.import_path.as_str();
    match item {
        syn::Item::Struct(s) if !is_cfg_test(&s.attrs) => {
            if let Some(shape) = classify_struct(s, module_path) {
                register(index, unit, s.ident.to_string(), shape);
            }
        }
        syn::Item::Enum(e) if !is_cfg_test(&e.attrs) => {
            classify_enum(e, unit, index);
        }
        syn::Item::Type(t) if !is_cfg_test(&t.attrs) => {
            let target = type_ref_text(&t.ty, module_path);
            if is_alias_target(&target) {
                register(index, unit, t.ident.to_string(), TypeShape::Alias(target));
            } else {
                debug!("Skipping type alias {} with unsupported target", t.ident);
            }
        }
        syn::Item::Use(u) if !is_cfg_test(&u.attrs) => {
            collect_use(&u.tree, Vec::new(), module_path, index);
        }
        _ => {}
    }
}

/// Adds a declaration; a name already declared in the unit keeps its first declaration.
fn register(index: &mut UnitIndex, unit: &CompilationUnit, name: String, shape: TypeShape) {
    if index.types.contains_key(&name) {
        warn!(
            "Type {} is declared more than once in {}, keeping the first declaration",
            name, unit.import_path
        );
        return;
    }

    debug!("Catalog {}: {} -> {:?}", unit.import_path, name, shape);
    index.types.insert(
        name.clone(),
        NominalTypeDefinition {
            unit: unit.clone(),
            name,
            shape,
        },
    );
}

fn classify_struct(item: &syn::ItemStruct, module_path: &str) -> Option<TypeShape> {
    match &item.fields {
        syn::Fields::Named(named) => {
            let rename_rule = rename_all_rule(&item.attrs);
            let fields = named
                .named
                .iter()
                .filter_map(|f| {
                    let name = f.ident.as_ref()?.to_string();
                    field_definition(name, &f.ty, &f.vis, &f.attrs, rename_rule.as_deref(), module_path)
                })
                .collect();
            Some(TypeShape::Record(fields))
        }
        syn::Fields::Unit => Some(TypeShape::Record(Vec::new())),
        syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
            let target = type_ref_text(&unnamed.unnamed[0].ty, module_path);
            if is_alias_target(&target) {
                Some(TypeShape::Alias(target))
            } else {
                debug!("Skipping newtype {} with unsupported inner type", item.ident);
                None
            }
        }
        syn::Fields::Unnamed(_) => None,
    }
}

fn field_definition(
    name: String,
    ty: &syn::Type,
    vis: &syn::Visibility,
    attrs: &[syn::Attribute],
    rename_rule: Option<&str>,
    module_path: &str,
) -> Option<FieldDefinition> {
    let mut tags = RawTag::from_attrs(attrs);
    let parsed = FieldTags::parse(&tags);
    let exported = !matches!(vis, syn::Visibility::Inherited);

    if !exported && !parsed.system {
        return None;
    }

    let type_ref = type_ref_text(ty, module_path);
    if type_ref.is_empty() && !parsed.system {
        debug!("Dropping field {} with unsupported type", name);
        return None;
    }

    if parsed.rename.is_none() {
        if let Some(rule) = rename_rule {
            tags.push(RawTag {
                namespace: "serde".to_string(),
                value: format!("rename = {:?}", apply_rename_rule(rule, &name)),
            });
        }
    }

    Some(FieldDefinition {
        name,
        type_ref,
        tags,
        exported,
        system: parsed.system,
    })
}

fn classify_enum(item: &syn::ItemEnum, unit: &CompilationUnit, index: &mut UnitIndex) {
    let enum_name = item.ident.to_string();
    let rename_rule = rename_all_rule(&item.attrs);
    let variant_name = |v: &syn::Variant| -> Option<String> {
        let tags = FieldTags::parse(&RawTag::from_attrs(&v.attrs));
        if tags.skip {
            return None;
        }
        let raw = v.ident.to_string();
        Some(match (tags.rename, rename_rule.as_deref()) {
            (Some(rename), _) => rename,
            (None, Some(rule)) => apply_rename_rule(rule, &raw),
            (None, None) => raw,
        })
    };

    if item.variants.iter().all(|v| matches!(v.fields, syn::Fields::Unit)) {
        let values = item.variants.iter().filter_map(&variant_name).collect();
        register(index, unit, enum_name, TypeShape::Enumeration(values));
        return;
    }

    let mut fields = Vec::new();
    for variant in &item.variants {
        let Some(output_name) = variant_name(variant) else {
            continue;
        };
        let rename = vec![RawTag {
            namespace: "serde".to_string(),
            value: format!("rename = {:?}", output_name),
        }];

        match &variant.fields {
            syn::Fields::Named(named) => {
                let lifted = lift_inline_record(&enum_name, &variant.ident.to_string(), named, unit, index);
                fields.push(FieldDefinition {
                    name: variant.ident.to_string(),
                    type_ref: lifted,
                    tags: rename,
                    exported: true,
                    system: false,
                });
            }
            syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                let type_ref = type_ref_text(&unnamed.unnamed[0].ty, &unit.import_path);
                if !type_ref.is_empty() {
                    fields.push(FieldDefinition {
                        name: variant.ident.to_string(),
                        type_ref,
                        tags: rename,
                        exported: true,
                        system: false,
                    });
                }
            }
            _ => debug!("Dropping variant {}::{}", enum_name, variant.ident),
        }
    }

    register(index, unit, enum_name, TypeShape::Record(fields));
}

/// Registers the fields of a struct variant as `<enclosing>Virt<variant>` and returns that name.
fn lift_inline_record(
    enclosing: &str,
    field: &str,
    named: &syn::FieldsNamed,
    unit: &CompilationUnit,
    index: &mut UnitIndex,
) -> String {
    let synthetic = format!("{}Virt{}", enclosing, field);
    let fields = named
        .named
        .iter()
        .filter_map(|f| {
            let name = f.ident.as_ref()?.to_string();
            // Variant fields share the visibility of the enum.
            let vis = syn::Visibility::Public(Default::default());
            field_definition(name, &f.ty, &vis, &f.attrs, None, &unit.import_path)
        })
        .collect();
    register(index, unit, synthetic.clone(), TypeShape::Record(fields));
    synthetic
}

/// Alias targets are names, qualified names or sequences of those; pointers are transparent.
fn is_alias_target(target: &str) -> bool {
    let mut rest = target;
    loop {
        if let Some(r) = rest.strip_prefix("[]") {
            rest = r;
        } else if let Some(r) = rest.strip_prefix('*') {
            rest = r;
        } else {
            break;
        }
    }
    !rest.is_empty() && rest != "map"
}

fn collect_use(tree: &syn::UseTree, mut prefix: Vec<String>, module_path: &str, index: &mut UnitIndex) {
    match tree {
        syn::UseTree::Path(p) => {
            prefix.push(p.ident.to_string());
            collect_use(&p.tree, prefix, module_path, index);
        }
        syn::UseTree::Name(n) => {
            let ident = n.ident.to_string();
            if ident == "self" {
                if let Some(last) = prefix.last().cloned() {
                    let path = absolutize(&prefix, module_path);
                    index.imports.push(ImportBinding { name: last, path });
                }
            } else {
                prefix.push(ident.clone());
                let path = absolutize(&prefix, module_path);
                index.imports.push(ImportBinding { name: ident, path });
            }
        }
        syn::UseTree::Rename(r) => {
            if r.ident != "self" {
                prefix.push(r.ident.to_string());
            }
            let path = absolutize(&prefix, module_path);
            index.imports.push(ImportBinding {
                name: r.rename.to_string(),
                path,
            });
        }
        syn::UseTree::Glob(_) => {
            index.globs.push(absolutize(&prefix, module_path));
        }
        syn::UseTree::Group(g) => {
            for item in &g.items {
                collect_use(item, prefix.clone(), module_path, index);
            }
        }
    }
}

/// Rewrites `self::` and `super::` paths into absolute ones anchored at `module_path`.
///
/// Other paths are returned joined but unchanged.
pub fn absolutize<S: AsRef<str>>(segments: &[S], module_path: &str) -> String {
    let mut rest: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
    let mut base: Vec<&str> = module_path.split("::").collect();

    match rest.first().copied() {
        Some("self") => {
            rest.remove(0);
        }
        Some("super") => {
            while rest.first() == Some(&"super") {
                rest.remove(0);
                if base.len() > 1 {
                    base.pop();
                }
            }
        }
        _ => return rest.join("::"),
    }

    base.extend(rest);
    base.join("::")
}

const POINTER_WRAPPERS: &[&str] = &["Option", "Box", "Rc", "Arc", "Cow"];
const SEQUENCE_WRAPPERS: &[&str] = &["Vec", "VecDeque", "HashSet", "BTreeSet", "LinkedList"];
const MAP_TYPES: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];
const STD_ROOTS: &[&str] = &["std", "core", "alloc"];

/// Serializes a declared type into canonical text.
///
/// `*` marks a pointer-like wrapper, `[]` a sequence, `map` any map type and
/// `module::path.Name` a qualified name. Unsupported shapes give an empty string.
pub fn type_ref_text(ty: &syn::Type, module_path: &str) -> String {
    match ty {
        syn::Type::Path(tp) if tp.qself.is_none() => path_text(&tp.path, module_path),
        syn::Type::Reference(r) => prefixed("*", &r.elem, module_path),
        syn::Type::Ptr(p) => prefixed("*", &p.elem, module_path),
        syn::Type::Slice(s) => prefixed("[]", &s.elem, module_path),
        syn::Type::Array(a) => prefixed("[]", &a.elem, module_path),
        syn::Type::Paren(p) => type_ref_text(&p.elem, module_path),
        syn::Type::Group(g) => type_ref_text(&g.elem, module_path),
        _ => String::new(),
    }
}

fn prefixed(prefix: &str, inner: &syn::Type, module_path: &str) -> String {
    let inner = type_ref_text(inner, module_path);
    if inner.is_empty() {
        inner
    } else {
        format!("{}{}", prefix, inner)
    }
}

fn path_text(path: &syn::Path, module_path: &str) -> String {
    let Some(last) = path.segments.last() else {
        return String::new();
    };
    let ident = last.ident.to_string();

    let first_type_arg = || match &last.arguments {
        syn::PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            syn::GenericArgument::Type(ty) => Some(ty),
            _ => None,
        }),
        _ => None,
    };

    if POINTER_WRAPPERS.contains(&ident.as_str()) {
        return first_type_arg().map_or_else(String::new, |ty| prefixed("*", ty, module_path));
    }
    if SEQUENCE_WRAPPERS.contains(&ident.as_str()) {
        return first_type_arg().map_or_else(String::new, |ty| prefixed("[]", ty, module_path));
    }
    if MAP_TYPES.contains(&ident.as_str()) {
        return "map".to_string();
    }
    if ident == "Self" {
        return String::new();
    }

    let qualifier: Vec<String> = path
        .segments
        .iter()
        .take(path.segments.len() - 1)
        .map(|s| s.ident.to_string())
        .collect();

    if qualifier.is_empty() || STD_ROOTS.contains(&qualifier[0].as_str()) {
        return ident;
    }

    format!("{}.{}", absolutize(&qualifier, module_path), ident)
}

/// Reads `#[serde(rename_all = "..")]` from container attributes.
fn rename_all_rule(attrs: &[syn::Attribute]) -> Option<String> {
    RawTag::from_attrs(attrs)
        .iter()
        .filter(|t| t.namespace == "serde")
        .flat_map(|t| crate::tags::parse_params(&t.value))
        .find(|(key, _)| key == "rename_all")
        .map(|(_, value)| value)
}

/// Applies a serde `rename_all` rule to a field or variant name.
pub fn apply_rename_rule(rule: &str, name: &str) -> String {
    let words = split_words(name);
    let capitalize = |w: &str| {
        let mut chars = w.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        }
    };

    match rule {
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        "snake_case" => words.join("_"),
        "SCREAMING_SNAKE_CASE" => words.join("_").to_uppercase(),
        "kebab-case" => words.join("-"),
        "SCREAMING-KEBAB-CASE" => words.join("-").to_uppercase(),
        "camelCase" => words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
            .collect(),
        "PascalCase" => words.iter().map(|w| capitalize(w)).collect(),
        _ => name.to_string(),
    }
}

/// Lower-cased words of a snake_case or PascalCase identifier.
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in name.chars() {
        if c == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if c.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.extend(c.to_lowercase());
        } else {
            current.extend(c.to_lowercase());
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
