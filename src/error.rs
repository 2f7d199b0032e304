use std::path::PathBuf;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug)]
pub enum Error {
    /// A module file of a unit could not be read
    IoError(std::io::Error),
    /// A declaration file of a unit could not be parsed
    ParseError { file: PathBuf, message: String },
    /// A directive line is malformed or carries an unsupported value
    Validation(String),
    /// No import binding matches the qualifier of a type reference
    ReferenceNotFound { name: String, unit: String },
    /// A type name is neither built in nor declared in the unit
    TypeNotFound {
        name: String,
        import_path: String,
        dir: PathBuf,
    },
    /// The package locator could not map a module path to a directory
    PathUnresolved { path: String, from: PathBuf },
    /// A chain of type aliases leads back to itself
    AliasCycle { chain: Vec<String> },
    /// A brace-delimited pseudo-schema payload is malformed
    SchemaSyntax(String),
}

impl Error {
    /// Returns `true` for failures that make a unit's catalog unusable.
    ///
    /// These abort the whole run; every other kind only aborts the directive
    /// that triggered it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::IoError(_) | Error::ParseError { .. })
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "parse error in {}: {}", file.display(), message)
            }
            Error::Validation(msg) => write!(f, "{}", msg),
            Error::ReferenceNotFound { name, unit } => {
                write!(f, "not found import path for package '{}' in '{}'", name, unit)
            }
            Error::TypeNotFound {
                name,
                import_path,
                dir,
            } => write!(
                f,
                "type with name '{}' was not found in package '{}' with import path '{}'",
                name,
                dir.display(),
                import_path
            ),
            Error::PathUnresolved { path, from } => write!(
                f,
                "file system path for '{}' not found from '{}'",
                path,
                from.display()
            ),
            Error::AliasCycle { chain } => {
                write!(f, "type alias cycle: {}", chain.join(" -> "))
            }
            Error::SchemaSyntax(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}
