use crate::catalog::StructCatalog;
use crate::error::{Error, Result};
use crate::scanner::CompilationUnit;
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Maps absolute module paths to compilation units on disk.
pub trait PackageLocator {
    /// Whether `head` names a crate root (`crate` or a registered crate name).
    fn knows_crate(&self, head: &str) -> bool;

    /// Finds the file-backed unit of the module `path`, anchored at `from`.
    fn locate(&self, path: &str, from: &CompilationUnit) -> Option<CompilationUnit>;
}

/// Module-tree locator for the analyzed crate and any registered external crates.
///
/// `crate::a::b` exists when `<root>/a/b/mod.rs`, `<root>/a/b.rs` or the directory
/// `<root>/a/b` does; either way the unit's directory is `<root>/a/b`.
#[derive(Debug, Clone)]
pub struct ModuleLocator {
    crate_root: PathBuf,
    crate_name: Option<String>,
    extern_crates: BTreeMap<String, PathBuf>,
}

impl ModuleLocator {
    pub fn new(crate_root: impl Into<PathBuf>) -> Self {
        Self {
            crate_root: crate_root.into(),
            crate_name: None,
            extern_crates: BTreeMap::new(),
        }
    }

    /// Lets `name::x` refer to `crate::x`.
    pub fn with_crate_name(mut self, name: Option<String>) -> Self {
        self.crate_name = name.map(|n| n.replace('-', "_"));
        self
    }

    /// Registers the source root of an external crate.
    pub fn with_extern(mut self, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.extern_crates
            .insert(name.into().replace('-', "_"), root.into());
        self
    }

    fn root_for(&self, head: &str) -> Option<(&Path, &str)> {
        if head == "crate" || self.crate_name.as_deref() == Some(head) {
            return Some((self.crate_root.as_path(), "crate"));
        }
        self.extern_crates
            .get_key_value(head)
            .map(|(name, root)| (root.as_path(), name.as_str()))
    }
}

impl PackageLocator for ModuleLocator {
    fn knows_crate(&self, head: &str) -> bool {
        self.root_for(head).is_some()
    }

    fn locate(&self, path: &str, from: &CompilationUnit) -> Option<CompilationUnit> {
        let mut segments = path.split("::").filter(|s| !s.is_empty());
        let head = segments.next()?;
        let (root, root_module) = self.root_for(head)?;
        let rest: Vec<&str> = segments.collect();

        let import_path = std::iter::once(root_module)
            .chain(rest.iter().copied())
            .collect::<Vec<_>>()
            .join("::");
        let dir = rest.iter().fold(root.to_path_buf(), |dir, s| dir.join(s));

        let found = if rest.is_empty() {
            root.is_dir()
        } else {
            dir.join("mod.rs").is_file() || dir.with_extension("rs").is_file() || dir.is_dir()
        };

        debug!("Located {} from {}: {}", path, from.import_path, found);
        found.then(|| CompilationUnit::new(dir, import_path))
    }
}

/// Resolves the module qualifier of a type reference to the unit that defines it.
pub struct CrossReferenceResolver {
    locator: Box<dyn PackageLocator>,
}

/// Upper bound on binding expansions, for bindings that refer to each other.
const MAX_BINDING_HOPS: usize = 16;

impl CrossReferenceResolver {
    pub fn new(locator: Box<dyn PackageLocator>) -> Self {
        Self { locator }
    }

    /// Resolves `qualifier` (e.g. `models`, `crate::billing`) as seen from `unit`.
    ///
    /// # Errors
    ///
    /// `ReferenceNotFound` when no import binding matches the leading segment,
    /// `PathUnresolved` when the locator finds no directory for the module.
    pub fn resolve(
        &self,
        qualifier: &str,
        unit: &CompilationUnit,
        catalog: &mut StructCatalog,
    ) -> Result<CompilationUnit> {
        let absolute = self.absolute_path(qualifier, unit, catalog)?;
        debug!("Qualifier {} in {} is {}", qualifier, unit.import_path, absolute);

        match self.locate(&absolute, unit, catalog)? {
            Some(found) => Ok(found),
            None => Err(Error::PathUnresolved {
                path: absolute,
                from: unit.dir.clone(),
            }),
        }
    }

    /// File modules come from the locator; inline ones must be declared by their parent.
    fn locate(
        &self,
        absolute: &str,
        from: &CompilationUnit,
        catalog: &mut StructCatalog,
    ) -> Result<Option<CompilationUnit>> {
        if let Some(found) = self.locator.locate(absolute, from) {
            return Ok(Some(found));
        }

        let Some((parent, name)) = absolute.rsplit_once("::") else {
            return Ok(None);
        };
        let Some(parent) = self.locate(parent, from, catalog)? else {
            return Ok(None);
        };
        if catalog.index(&parent)?.modules.iter().any(|m| m == name) {
            debug!("{} is an inline module of {}", absolute, parent.import_path);
            return Ok(Some(parent.child(name)));
        }
        Ok(None)
    }

    /// Expands the leading segment of `path` through the unit's import bindings.
    pub fn absolute_path(
        &self,
        path: &str,
        unit: &CompilationUnit,
        catalog: &mut StructCatalog,
    ) -> Result<String> {
        let mut current = path.to_string();

        for _ in 0..MAX_BINDING_HOPS {
            let (head, rest) = current.split_once("::").unwrap_or((current.as_str(), ""));
            if self.locator.knows_crate(head) {
                return Ok(current);
            }

            let index = catalog.index(unit)?;
            let binding = index.binding(head).ok_or_else(|| Error::ReferenceNotFound {
                name: head.to_string(),
                unit: unit.import_path.clone(),
            })?;

            current = if rest.is_empty() {
                binding.path.clone()
            } else {
                format!("{}::{}", binding.path, rest)
            };
        }

        Err(Error::ReferenceNotFound {
            name: path.to_string(),
            unit: unit.import_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use std::fs;
    use tempfile::TempDir;

    /// Helper function to lay out a crate source tree
    fn create_test_crate(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = temp_dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        temp_dir
    }

    fn resolver_for(root: &Path) -> (CrossReferenceResolver, StructCatalog) {
        let locator = ModuleLocator::new(root).with_crate_name(Some("shop-api".to_string()));
        (
            CrossReferenceResolver::new(Box::new(locator)),
            StructCatalog::new(Box::new(AstParser)),
        )
    }

    #[test]
    fn test_locate_directory_and_file_modules() {
        let temp_dir = create_test_crate(&[
            ("lib.rs", "pub mod api; pub mod models;"),
            ("api/mod.rs", "pub mod v1;"),
            ("api/v1/mod.rs", ""),
            ("models.rs", "pub struct User;"),
        ]);
        let root = temp_dir.path();
        let locator = ModuleLocator::new(root);
        let from = CompilationUnit::new(root, "crate");

        let api = locator.locate("crate::api::v1", &from).unwrap();
        assert_eq!(api.import_path, "crate::api::v1");
        assert_eq!(api.dir, root.join("api/v1"));

        let models = locator.locate("crate::models", &from).unwrap();
        assert_eq!(models.import_path, "crate::models");
        assert_eq!(models.dir, root.join("models"));

        assert!(locator.locate("crate::missing", &from).is_none());
        assert!(locator.locate("serde::de", &from).is_none());
    }

    #[test]
    fn test_locate_extern_crate() {
        let ext = create_test_crate(&[("lib.rs", ""), ("types/mod.rs", "pub struct Money;")]);
        let locator = ModuleLocator::new("/nonexistent").with_extern("shared-types", ext.path());
        let from = CompilationUnit::new("/nonexistent", "crate");

        assert!(locator.knows_crate("shared_types"));
        let unit = locator.locate("shared_types::types", &from).unwrap();
        assert_eq!(unit.import_path, "shared_types::types");
    }

    #[test]
    fn test_resolve_through_bindings() {
        let temp_dir = create_test_crate(&[
            (
                "lib.rs",
                "mod models;\nuse crate::billing as money;\nuse crate::api::v1;\n",
            ),
            ("models/mod.rs", "pub struct User;"),
            ("billing/mod.rs", "pub struct Invoice;"),
            ("api/v1/mod.rs", "pub struct Health;"),
        ]);
        let root = temp_dir.path();
        let (resolver, mut catalog) = resolver_for(root);
        let unit = CompilationUnit::new(root, "crate");

        let models = resolver.resolve("models", &unit, &mut catalog).unwrap();
        assert_eq!(models.import_path, "crate::models");

        let billing = resolver.resolve("money", &unit, &mut catalog).unwrap();
        assert_eq!(billing.import_path, "crate::billing");

        let v1 = resolver.resolve("v1", &unit, &mut catalog).unwrap();
        assert_eq!(v1.dir, root.join("api/v1"));

        let by_name = resolver.resolve("shop_api::models", &unit, &mut catalog).unwrap();
        assert_eq!(by_name.import_path, "crate::models");
    }

    #[test]
    fn test_rename_takes_precedence_over_trailing_segment() {
        let temp_dir = create_test_crate(&[
            ("lib.rs", "use crate::billing as money;"),
            ("billing/mod.rs", ""),
        ]);
        let root = temp_dir.path();
        let (resolver, mut catalog) = resolver_for(root);
        let unit = CompilationUnit::new(root, "crate");

        let err = resolver.resolve("billing", &unit, &mut catalog).unwrap_err();
        assert!(matches!(err, Error::ReferenceNotFound { ref name, .. } if name == "billing"));
    }

    #[test]
    fn test_resolve_inline_module() {
        let temp_dir = create_test_crate(&[(
            "lib.rs",
            "pub mod api {\n    pub mod v1 {\n        pub struct Ping;\n    }\n}\nuse api::v1;\n",
        )]);
        let root = temp_dir.path();
        let (resolver, mut catalog) = resolver_for(root);
        let unit = CompilationUnit::new(root, "crate");

        let v1 = resolver.resolve("v1", &unit, &mut catalog).unwrap();
        assert_eq!(v1.import_path, "crate::api::v1");
        assert_eq!(v1.dir, root.join("api/v1"));
        assert!(catalog.lookup(&v1, "Ping").unwrap().is_some());

        let err = resolver.resolve("crate::api::v2", &unit, &mut catalog).unwrap_err();
        assert!(matches!(err, Error::PathUnresolved { ref path, .. } if path == "crate::api::v2"));
    }

    #[test]
    fn test_unresolved_path() {
        let temp_dir = create_test_crate(&[("lib.rs", "use crate::gone;")]);
        let root = temp_dir.path();
        let (resolver, mut catalog) = resolver_for(root);
        let unit = CompilationUnit::new(root, "crate");

        let err = resolver.resolve("gone", &unit, &mut catalog).unwrap_err();
        match err {
            Error::PathUnresolved { path, from } => {
                assert_eq!(path, "crate::gone");
                assert_eq!(from, root.to_path_buf());
            }
            other => panic!("Expected PathUnresolved, got {:?}", other),
        }
    }
}
