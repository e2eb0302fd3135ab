//! Compiled validator tree
//!
//! A [`Validator`] is one node of a compiled schema: a [`ValidatorKind`]
//! (closed set of built-in variants plus registered custom ones), the
//! constraints attached to it and whether the field it guards is required.
//!
//! Leaf checking lives here ([`Validator::validate`]). Walking containers
//! and resolving includes is the matcher's job.

use crate::constraints::{Constraint, ConstraintKind};
use crate::types::{Shape, Value};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Custom Validator Trait
// ============================================================================

/// Capability set for user-defined validators
///
/// Implementations are created by a factory registered in the
/// [`Registry`](crate::registry::Registry) and referenced from schema text
/// by their tag, e.g. `ip()` or `semver(min=2)`.
pub trait CustomValidator: Send + Sync {
    /// Tag this validator is registered under
    fn tag(&self) -> &str;

    /// Shape/type predicate for a data value
    fn is_valid(&self, value: &Value) -> bool;

    /// Constraint kinds this validator accepts as keyword arguments
    fn constraints(&self) -> &[ConstraintKind] {
        &[]
    }

    /// Message reported when [`is_valid`](Self::is_valid) fails
    fn fail(&self, value: &Value) -> String {
        format!("'{}' is not a {}.", value, self.tag())
    }
}

impl fmt::Debug for dyn CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator")
            .field("tag", &self.tag())
            .finish()
    }
}

/// Shared handle to a custom validator instance
pub type BoxedCustomValidator = Arc<dyn CustomValidator>;

// ============================================================================
// Validator Kinds
// ============================================================================

const NUMERIC_CONSTRAINTS: &[ConstraintKind] = &[ConstraintKind::Min, ConstraintKind::Max];
const STRING_CONSTRAINTS: &[ConstraintKind] = &[
    ConstraintKind::LengthMin,
    ConstraintKind::LengthMax,
    ConstraintKind::CharacterExclude,
];
const LENGTH_CONSTRAINTS: &[ConstraintKind] =
    &[ConstraintKind::LengthMin, ConstraintKind::LengthMax];

/// Body of a map validator
#[derive(Debug, Clone)]
pub enum MapBody {
    /// Declared fields, from a nested schema mapping or an include body
    Fields(Vec<Field>),
    /// `map(...)`: any keys, every value must match one of the alternatives
    /// (an empty list accepts any value)
    Values(Vec<Validator>),
}

/// A declared mapping field
#[derive(Debug, Clone)]
pub struct Field {
    /// Key in the data mapping
    pub name: String,
    /// Validator for the value under that key
    pub validator: Validator,
}

impl Field {
    /// Create a field
    pub fn new(name: impl Into<String>, validator: Validator) -> Self {
        Self {
            name: name.into(),
            validator,
        }
    }
}

/// The variant of a validator node
#[derive(Debug, Clone)]
pub enum ValidatorKind {
    /// Text scalar
    String,
    /// Integer or float scalar
    Number,
    /// Integer scalar
    Integer,
    /// Boolean scalar
    Boolean,
    /// Null scalar
    Null,
    /// One of a fixed set of literals
    Enum(Vec<Value>),
    /// Text matching at least one pattern
    Regex {
        /// Compiled patterns
        patterns: Vec<regex::Regex>,
        /// Name used in the failure message
        name: Option<String>,
    },
    /// Mapping
    Map(MapBody),
    /// Sequence whose elements each match one of the alternatives
    List(Vec<Validator>),
    /// Any value matching one of the alternatives
    Any(Vec<Validator>),
    /// Mapping checked against a named sub-schema
    Include(String),
    /// Registered user validator
    Custom(BoxedCustomValidator),
}

/// Result of checking one value against one validator node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Wrong shape; constraints were not evaluated
    Mismatch(String),
    /// Right shape, with any constraint violations in declaration order
    Checked(Vec<String>),
}

// ============================================================================
// Validator
// ============================================================================

/// One node of a compiled schema
#[derive(Debug, Clone)]
pub struct Validator {
    kind: ValidatorKind,
    constraints: Vec<Constraint>,
    required: bool,
}

impl Validator {
    /// Create a required validator with no constraints
    pub fn new(kind: ValidatorKind) -> Self {
        Self {
            kind,
            constraints: Vec::new(),
            required: true,
        }
    }

    /// Attach a constraint. The caller is responsible for checking
    /// [`supports`](Self::supports) first; the compiler does.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Mark the field as optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set whether the field must be present
    pub fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    /// The variant
    pub fn kind(&self) -> &ValidatorKind {
        &self.kind
    }

    /// Attached constraints in declaration order
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Whether an absent field is an error
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Tag this validator is written as in schema text
    pub fn tag(&self) -> &str {
        match &self.kind {
            ValidatorKind::String => "str",
            ValidatorKind::Number => "num",
            ValidatorKind::Integer => "int",
            ValidatorKind::Boolean => "bool",
            ValidatorKind::Null => "null",
            ValidatorKind::Enum(_) => "enum",
            ValidatorKind::Regex { .. } => "regex",
            ValidatorKind::Map(_) => "map",
            ValidatorKind::List(_) => "list",
            ValidatorKind::Any(_) => "any",
            ValidatorKind::Include(_) => "include",
            ValidatorKind::Custom(custom) => custom.tag(),
        }
    }

    /// Constraint kinds this variant accepts
    pub fn supported_constraints(&self) -> &[ConstraintKind] {
        match &self.kind {
            ValidatorKind::String => STRING_CONSTRAINTS,
            ValidatorKind::Number | ValidatorKind::Integer => NUMERIC_CONSTRAINTS,
            ValidatorKind::Map(_) | ValidatorKind::List(_) => LENGTH_CONSTRAINTS,
            ValidatorKind::Custom(custom) => custom.constraints(),
            ValidatorKind::Boolean
            | ValidatorKind::Null
            | ValidatorKind::Enum(_)
            | ValidatorKind::Regex { .. }
            | ValidatorKind::Any(_)
            | ValidatorKind::Include(_) => &[],
        }
    }

    /// Whether a constraint kind may be attached to this variant
    pub fn supports(&self, kind: ConstraintKind) -> bool {
        self.supported_constraints().contains(&kind)
    }

    /// Intrinsic shape predicate
    pub fn is_valid(&self, value: &Value) -> bool {
        let shape = value.shape();
        match &self.kind {
            ValidatorKind::String => shape == Shape::Text,
            ValidatorKind::Number => shape.is_number(),
            ValidatorKind::Integer => shape == Shape::Int,
            ValidatorKind::Boolean => shape == Shape::Bool,
            ValidatorKind::Null => shape == Shape::Null,
            ValidatorKind::Enum(allowed) => allowed.iter().any(|v| literal_eq(v, value)),
            // Anchored at the start of the text only, like a prefix match
            ValidatorKind::Regex { patterns, .. } => value.as_str().is_some_and(|text| {
                patterns
                    .iter()
                    .any(|re| re.find(text).is_some_and(|m| m.start() == 0))
            }),
            ValidatorKind::Map(_) | ValidatorKind::Include(_) => shape == Shape::Mapping,
            ValidatorKind::List(_) => shape == Shape::Sequence,
            ValidatorKind::Any(_) => true,
            ValidatorKind::Custom(custom) => custom.is_valid(value),
        }
    }

    /// Message for a value that failed [`is_valid`](Self::is_valid)
    pub fn fail(&self, value: &Value) -> String {
        match &self.kind {
            ValidatorKind::Enum(allowed) => {
                let rendered: Vec<String> = allowed.iter().map(render_literal).collect();
                format!("'{}' not in ({})", value, rendered.join(", "))
            }
            ValidatorKind::Regex { name, .. } => format!(
                "'{}' is not a {}.",
                value,
                name.as_deref().unwrap_or("regex match")
            ),
            ValidatorKind::Include(_) => format!("'{}' is not a map.", value),
            ValidatorKind::Custom(custom) => custom.fail(value),
            _ => format!("'{}' is not a {}.", value, self.tag()),
        }
    }

    /// Shape check, then every constraint in declaration order.
    ///
    /// For containers this covers only the container itself; the matcher
    /// descends into children.
    pub fn check(&self, value: &Value) -> Outcome {
        if !self.is_valid(value) {
            return Outcome::Mismatch(self.fail(value));
        }

        Outcome::Checked(
            self.constraints
                .iter()
                .filter_map(|constraint| constraint.evaluate(value))
                .collect(),
        )
    }

    /// Failure messages from [`check`](Self::check), flattened.
    ///
    /// A value of the wrong shape yields exactly one message and its
    /// constraints are not evaluated.
    pub fn validate(&self, value: &Value) -> Vec<String> {
        match self.check(value) {
            Outcome::Mismatch(message) => vec![message],
            Outcome::Checked(violations) => violations,
        }
    }

    /// Child validators: list/any/map alternatives and declared map fields
    pub fn children(&self) -> Vec<&Validator> {
        match &self.kind {
            ValidatorKind::List(alternatives)
            | ValidatorKind::Any(alternatives)
            | ValidatorKind::Map(MapBody::Values(alternatives)) => alternatives.iter().collect(),
            ValidatorKind::Map(MapBody::Fields(fields)) => {
                fields.iter().map(|field| &field.validator).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Literal equality with numeric widening, so `enum(1)` accepts `1.0`
fn literal_eq(allowed: &Value, value: &Value) -> bool {
    match (allowed, value) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        _ => allowed == value,
    }
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}
