use anyhow::{bail, Result};
use log::{debug, warn};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A Rust module analysed as one namespace.
///
/// `dir` is the directory the module's children live in: the source root for the crate
/// root, `<root>/a` for `crate::a` whether it is written as `a.rs` or `a/mod.rs`. Two
/// units are the same unit when their import paths are equal, whatever directory they
/// were reached through.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    /// Directory of the module's child modules; it need not exist
    pub dir: PathBuf,
    /// Module path, e.g. `crate::api::models`
    pub import_path: String,
}

impl CompilationUnit {
    pub fn new(dir: impl Into<PathBuf>, import_path: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            import_path: import_path.into(),
        }
    }

    /// Import path segments, outermost first.
    pub fn segments(&self) -> Vec<&str> {
        self.import_path.split("::").filter(|s| !s.is_empty()).collect()
    }

    /// The module `name` declared inside this one.
    pub fn child(&self, name: &str) -> Self {
        Self::new(self.dir.join(name), format!("{}::{}", self.import_path, name))
    }

    /// The enclosing module `levels` steps up, stopping at the crate root.
    pub fn ancestor(&self, levels: usize) -> Self {
        let segments = self.segments();
        let levels = levels.min(segments.len().saturating_sub(1));
        let mut dir = self.dir.as_path();
        for _ in 0..levels {
            dir = dir.parent().unwrap_or(dir);
        }
        Self::new(dir, segments[..segments.len() - levels].join("::"))
    }

    fn is_crate_root(&self) -> bool {
        self.segments().len() <= 1
    }
}

impl PartialEq for CompilationUnit {
    fn eq(&self, other: &Self) -> bool {
        self.import_path == other.import_path
    }
}

impl Eq for CompilationUnit {}

impl Hash for CompilationUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.import_path.hash(state);
    }
}

/// File scanner for discovering compilation units in a source tree.
///
/// The `FileScanner` walks the source root and reports the module defined by every
/// non-test `.rs` file. Like the build tooling, it skips `target` and hidden directories.
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-project/src"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} units", result.units.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Discovered units, sorted by import path
    pub units: Vec<CompilationUnit>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a scanner whose root directory is the `crate` module.
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Walks the tree and collects one unit per module file.
    ///
    /// `lib.rs` and `main.rs` at the root make up the crate root, `a/mod.rs` and `a.rs`
    /// both make up `a`. Units come back sorted by import path. Inaccessible entries are
    /// recorded as warnings and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a directory.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            bail!("Source root is not a directory: {}", self.root_path.display());
        }

        let mut units: Vec<CompilationUnit> = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|s| s.to_str()) != Some("rs")
                || is_test_file(path)
            {
                continue;
            }

            let Some(unit) = self.unit_for_file(path) else {
                continue;
            };
            if units.contains(&unit) {
                continue;
            }
            debug!("Found unit {} in {}", unit.import_path, path.display());
            units.push(unit);
        }

        units.sort_by(|a, b| a.import_path.cmp(&b.import_path));
        Ok(ScanResult { units, warnings })
    }

    /// The module a source file below the root defines.
    pub fn unit_for_file(&self, file: &Path) -> Option<CompilationUnit> {
        let dir = file.parent()?;
        let stem = file.file_stem()?.to_str()?;
        let module = module_path_below(&self.root_path, dir)?;

        let at_root = dir == self.root_path;
        match stem {
            "lib" | "main" | "mod" if at_root => Some(CompilationUnit::new(dir, module)),
            "mod" => Some(CompilationUnit::new(dir, module)),
            _ => Some(CompilationUnit::new(dir.join(stem), format!("{}::{}", module, stem))),
        }
    }
}

/// Module path of `dir` relative to the crate root directory.
fn module_path_below(root: &Path, dir: &Path) -> Option<String> {
    let relative = dir.strip_prefix(root).ok()?;
    let mut path = "crate".to_string();
    for component in relative.components() {
        path.push_str("::");
        path.push_str(&component.as_os_str().to_string_lossy());
    }
    Some(path)
}

/// Test-only source files never contribute declarations.
pub fn is_test_file(path: &Path) -> bool {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    stem == "tests" || stem.ends_with("_test") || stem.ends_with("_tests")
}

/// Source files that declare a unit's items, with the module path they are written in.
///
/// The crate root reads `lib.rs` and `main.rs`; any other module reads `mod.rs` in its
/// directory or the `.rs` file named after it. A module with neither is inline, so the
/// files of the closest enclosing file module are returned with that module's path.
pub fn module_files(unit: &CompilationUnit) -> (String, Vec<PathBuf>) {
    let mut current = unit.clone();
    loop {
        if current.is_crate_root() {
            let files = ["lib.rs", "main.rs"]
                .iter()
                .map(|name| current.dir.join(name))
                .filter(|path| path.is_file())
                .collect();
            return (current.import_path, files);
        }

        let candidates = [current.dir.join("mod.rs"), current.dir.with_extension("rs")];
        if let Some(file) = candidates
            .into_iter()
            .find(|path| path.is_file() && !is_test_file(path))
        {
            return (current.import_path, vec![file]);
        }

        current = current.ancestor(1);
    }
}
