//! Error types
//!
//! Two families live here. [`SchemaError`] is raised while compiling a
//! schema and aborts compilation. [`ValidationError`] records are collected
//! while matching a document and never abort the walk.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Schema Errors
// ============================================================================

/// Result type for schema compilation
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A malformed schema. `path` is the dotted location inside the schema
/// document where the problem was found.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("{path}: unknown validator '{tag}'")]
    UnknownValidator { path: String, tag: String },

    #[error("{path}: constraint '{keyword}' is not supported by '{tag}'")]
    IncompatibleConstraint {
        path: String,
        tag: String,
        keyword: String,
    },

    #[error("{path}: unknown argument '{keyword}' for '{tag}'")]
    UnknownArgument {
        path: String,
        tag: String,
        keyword: String,
    },

    #[error("{path}: invalid argument for '{tag}': {reason}")]
    InvalidArgument {
        path: String,
        tag: String,
        reason: String,
    },

    #[error("{path}: include '{name}' is not defined")]
    UnresolvedInclude { path: String, name: String },

    #[error("include '{name}' is defined more than once")]
    DuplicateInclude { name: String },

    #[error("{path}: expected a mapping, found {found}")]
    NotAMapping { path: String, found: &'static str },

    #[error("{path}: schema values must be validator expressions, found {found}")]
    InvalidSchemaValue { path: String, found: &'static str },

    #[error("{path}: syntax error in '{expression}' at offset {offset}: {message}")]
    Syntax {
        path: String,
        expression: String,
        offset: usize,
        message: String,
    },

    #[cfg(feature = "yaml")]
    #[error("schema is not valid YAML: {0}")]
    Yaml(String),
}

impl SchemaError {
    /// Schema location the error refers to, empty for document-level errors
    pub fn path(&self) -> &str {
        match self {
            Self::UnknownValidator { path, .. }
            | Self::IncompatibleConstraint { path, .. }
            | Self::UnknownArgument { path, .. }
            | Self::InvalidArgument { path, .. }
            | Self::UnresolvedInclude { path, .. }
            | Self::NotAMapping { path, .. }
            | Self::InvalidSchemaValue { path, .. }
            | Self::Syntax { path, .. } => path,
            Self::DuplicateInclude { .. } => "",
            #[cfg(feature = "yaml")]
            Self::Yaml(_) => "",
        }
    }
}

// ============================================================================
// Paths
// ============================================================================

/// One step into a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Mapping key
    Key(String),
    /// Zero-based list index
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Location of a value inside a document, rendered as `a.b.2.c`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// The document root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// True for the document root
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Segments after `prefix`, if this path starts with it
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        self.0
            .starts_with(&prefix.0)
            .then(|| Path(self.0[prefix.0.len()..].to_vec()))
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

// ============================================================================
// Validation Result
// ============================================================================

/// Validation result type
pub type ValidationResult<T> = Result<T, ValidationErrors>;

// ============================================================================
// Validation Errors Collection
// ============================================================================

/// Ordered collection of validation errors for one document
///
/// Order follows the document walk: mapping fields in schema declaration
/// order, list elements by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    /// List of individual validation errors
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new empty validation errors collection
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Add a validation error to the collection
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Convert to Result - Ok if no errors, Err if there are errors
    pub fn into_result(self) -> ValidationResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Get errors as a slice
    pub fn as_slice(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Iterate over the errors
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Rendered `path: message` lines
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

// ============================================================================
// Single Validation Error
// ============================================================================

/// A single validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Where in the data document the error occurred
    pub path: Path,

    /// Human-readable error message
    pub message: String,

    /// Error type classification
    pub error_type: ErrorType,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(path: Path, message: impl Into<String>, error_type: ErrorType) -> Self {
        Self {
            path,
            message: message.into(),
            error_type,
        }
    }

    /// Create a type error
    pub fn type_error(path: Path, message: impl Into<String>) -> Self {
        Self::new(path, message, ErrorType::TypeError)
    }

    /// Create a value error
    pub fn value_error(path: Path, message: impl Into<String>) -> Self {
        Self::new(path, message, ErrorType::ValueError)
    }

    /// Create a missing field error
    pub fn missing_error(path: Path) -> Self {
        Self::new(path, "Required field missing", ErrorType::Missing)
    }

    /// Create an undeclared key error
    pub fn extra_error(path: Path) -> Self {
        Self::new(path, "Unexpected element", ErrorType::ExtraForbidden)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

// ============================================================================
// Error Type Classification
// ============================================================================

/// Classification of validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Value has the wrong shape for its validator
    TypeError,

    /// Constraint violation (bound, length, excluded character)
    ValueError,

    /// Required field missing
    Missing,

    /// Key not declared in a strict mapping
    ExtraForbidden,

    /// No alternative of a list or `any` matched
    NoMatch,

    /// Include name missing from the schema at match time
    UnresolvedInclude,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeError => write!(f, "type_error"),
            Self::ValueError => write!(f, "value_error"),
            Self::Missing => write!(f, "missing"),
            Self::ExtraForbidden => write!(f, "extra_forbidden"),
            Self::NoMatch => write!(f, "no_match"),
            Self::UnresolvedInclude => write!(f, "unresolved_include"),
        }
    }
}

// ============================================================================
// Validation Context
// ============================================================================

/// Tracks the current location while walking nested structures
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    path: Vec<PathSegment>,
}

impl ValidationContext {
    /// Create a context positioned at the document root
    pub fn new() -> Self {
        Self { path: Vec::new() }
    }

    /// Descend into a mapping key
    pub fn push_key(&mut self, key: &str) {
        self.path.push(PathSegment::Key(key.to_string()));
    }

    /// Descend into a list element
    pub fn push_index(&mut self, index: usize) {
        self.path.push(PathSegment::Index(index));
    }

    /// Step back out of the last segment
    pub fn pop(&mut self) {
        self.path.pop();
    }

    /// Snapshot of the current location
    pub fn current_path(&self) -> Path {
        Path(self.path.clone())
    }

    /// Nesting depth of the current location
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}
