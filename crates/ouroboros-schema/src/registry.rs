//! Validator registry
//!
//! Maps the tag written in schema text (`str`, `list`, `include`, ...) to
//! the constructor the compiler should use. A registry is an ordinary value
//! handed to [`SchemaCompiler`](crate::compiler::SchemaCompiler), so tests
//! and callers can extend it without touching any shared state.
//!
//! # Example
//!
//! ```rust
//! use ouroboros_schema::registry::{FnValidator, Registry};
//! use ouroboros_schema::Value;
//!
//! let mut registry = Registry::new();
//! registry.register_validator(FnValidator::new("even", |value| {
//!     matches!(value, Value::Int(i) if i % 2 == 0)
//! }));
//! assert!(registry.contains("even"));
//! ```

use crate::constraints::ConstraintKind;
use crate::types::Value;
use crate::validators::{BoxedCustomValidator, CustomValidator};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Built-in Variants
// ============================================================================

/// Built-in validator variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Enum,
    Regex,
    Map,
    List,
    Any,
    Include,
}

impl Builtin {
    /// Every built-in variant
    pub const ALL: [Builtin; 11] = [
        Self::String,
        Self::Number,
        Self::Integer,
        Self::Boolean,
        Self::Null,
        Self::Enum,
        Self::Regex,
        Self::Map,
        Self::List,
        Self::Any,
        Self::Include,
    ];

    /// Default tag for the variant
    pub fn tag(self) -> &'static str {
        match self {
            Self::String => "str",
            Self::Number => "num",
            Self::Integer => "int",
            Self::Boolean => "bool",
            Self::Null => "null",
            Self::Enum => "enum",
            Self::Regex => "regex",
            Self::Map => "map",
            Self::List => "list",
            Self::Any => "any",
            Self::Include => "include",
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

/// Builds a custom validator from the literal positional arguments of its
/// expression. The error is a human-readable reason.
pub type ValidatorFactory =
    Arc<dyn Fn(&[Value]) -> Result<BoxedCustomValidator, String> + Send + Sync>;

/// What a tag resolves to
#[derive(Clone)]
pub enum Constructor {
    /// One of the built-in variants
    Builtin(Builtin),
    /// A registered custom validator factory
    Custom(ValidatorFactory),
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(builtin) => f.debug_tuple("Builtin").field(builtin).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Tag to constructor table
#[derive(Clone, Debug)]
pub struct Registry {
    constructors: HashMap<String, Constructor>,
}

impl Registry {
    /// Registry with every built-in variant under its default tag
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for builtin in Builtin::ALL {
            registry
                .constructors
                .insert(builtin.tag().to_string(), Constructor::Builtin(builtin));
        }
        registry
    }

    /// Registry with no tags at all
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a custom validator factory under `tag`
    ///
    /// Replacing an existing tag, built-in or not, is allowed and logged.
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<BoxedCustomValidator, String> + Send + Sync + 'static,
    {
        self.insert(tag.into(), Constructor::Custom(Arc::new(factory)));
        self
    }

    /// Register a fixed validator instance that takes no positional arguments
    pub fn register_validator<V>(&mut self, validator: V) -> &mut Self
    where
        V: CustomValidator + 'static,
    {
        let tag = validator.tag().to_string();
        let shared: BoxedCustomValidator = Arc::new(validator);
        let name = tag.clone();
        self.register(tag, move |args: &[Value]| {
            if args.is_empty() {
                Ok(Arc::clone(&shared))
            } else {
                Err(format!("'{}' takes no positional arguments", name))
            }
        })
    }

    /// Make a built-in variant available under another tag, e.g. `string`
    pub fn register_builtin(&mut self, tag: impl Into<String>, builtin: Builtin) -> &mut Self {
        self.insert(tag.into(), Constructor::Builtin(builtin));
        self
    }

    /// Look up the constructor for a tag
    pub fn get(&self, tag: &str) -> Option<&Constructor> {
        self.constructors.get(tag)
    }

    /// Whether a tag is registered
    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    fn insert(&mut self, tag: String, constructor: Constructor) {
        if let Some(previous) = self.constructors.insert(tag.clone(), constructor) {
            tracing::warn!(tag = %tag, previous = ?previous, "Validator tag re-registered");
        } else {
            tracing::debug!(tag = %tag, "Validator tag registered");
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Function-based Validators (for ergonomic API)
// ============================================================================

/// Custom validator backed by a predicate closure
pub struct FnValidator<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    tag: String,
    constraints: Vec<ConstraintKind>,
    is_valid_fn: F,
}

impl<F> FnValidator<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    /// Create a new predicate validator
    pub fn new(tag: impl Into<String>, is_valid_fn: F) -> Self {
        Self {
            tag: tag.into(),
            constraints: Vec::new(),
            is_valid_fn,
        }
    }

    /// Accept a constraint kind as keyword argument
    pub fn constraint(mut self, kind: ConstraintKind) -> Self {
        self.constraints.push(kind);
        self
    }
}

impl<F> CustomValidator for FnValidator<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn tag(&self) -> &str {
        &self.tag
    }

    fn is_valid(&self, value: &Value) -> bool {
        (self.is_valid_fn)(value)
    }

    fn constraints(&self) -> &[ConstraintKind] {
        &self.constraints
    }
}
