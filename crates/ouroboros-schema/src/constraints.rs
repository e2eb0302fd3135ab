//! Constraints attached to validators
//!
//! A constraint only ever sees a value that already passed its owning
//! validator's shape check. Evaluation never fails hard; it yields a
//! message or nothing.

use crate::types::Value;
use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// Constraint Kinds
// ============================================================================

/// The kinds of constraint a validator can declare support for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// Numeric lower bound (inclusive)
    Min,
    /// Numeric upper bound (inclusive)
    Max,
    /// Minimum length in characters, elements or keys
    LengthMin,
    /// Maximum length in characters, elements or keys
    LengthMax,
    /// Text must contain none of a set of characters
    CharacterExclude,
}

impl ConstraintKind {
    /// Every built-in kind
    pub const ALL: [ConstraintKind; 5] = [
        Self::Min,
        Self::Max,
        Self::LengthMin,
        Self::LengthMax,
        Self::CharacterExclude,
    ];

    /// Keyword used in validator expressions, e.g. `min` in `int(min=0)`
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Min | Self::LengthMin => "min",
            Self::Max | Self::LengthMax => "max",
            Self::CharacterExclude => "exclude",
        }
    }

    /// Whether any built-in kind uses this keyword
    pub fn is_known_keyword(keyword: &str) -> bool {
        Self::ALL.iter().any(|kind| kind.keyword() == keyword)
    }

    /// Resolve a keyword against the kinds a validator supports
    pub fn resolve(keyword: &str, supported: &[ConstraintKind]) -> Option<ConstraintKind> {
        supported
            .iter()
            .copied()
            .find(|kind| kind.keyword() == keyword)
    }
}

// ============================================================================
// Numeric Bounds
// ============================================================================

/// A numeric bound as written in the schema
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
}

impl Bound {
    /// Compare a numeric value against the bound. Integer against integer
    /// stays exact; anything involving a float compares as f64.
    fn compare(self, value: &Value) -> Option<Ordering> {
        match (value, self) {
            (Value::Int(v), Bound::Int(b)) => Some(v.cmp(&b)),
            (Value::Int(v), Bound::Float(b)) => (*v as f64).partial_cmp(&b),
            (Value::Float(v), Bound::Int(b)) => v.partial_cmp(&(b as f64)),
            (Value::Float(v), Bound::Float(b)) => v.partial_cmp(&b),
            _ => None,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
        }
    }
}

// ============================================================================
// Constraint
// ============================================================================

/// A configured, checkable rule
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Value must be >= bound
    Min(Bound),
    /// Value must be <= bound
    Max(Bound),
    /// Length must be >= n
    LengthMin(usize),
    /// Length must be <= n
    LengthMax(usize),
    /// Text must not contain any of these characters
    CharacterExclude(Vec<char>),
}

impl Constraint {
    /// Build a constraint of `kind` from its expression argument.
    ///
    /// The error is a human-readable reason; the compiler wraps it with the
    /// schema location.
    pub fn from_argument(kind: ConstraintKind, argument: &Value) -> Result<Self, String> {
        match kind {
            ConstraintKind::Min => numeric_bound(kind, argument).map(Self::Min),
            ConstraintKind::Max => numeric_bound(kind, argument).map(Self::Max),
            ConstraintKind::LengthMin => length_bound(kind, argument).map(Self::LengthMin),
            ConstraintKind::LengthMax => length_bound(kind, argument).map(Self::LengthMax),
            ConstraintKind::CharacterExclude => match argument {
                Value::String(chars) => Ok(Self::CharacterExclude(chars.chars().collect())),
                other => Err(format!(
                    "'exclude' expects a string, got {}",
                    other.type_name()
                )),
            },
        }
    }

    /// The kind of this constraint
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::Min(_) => ConstraintKind::Min,
            Self::Max(_) => ConstraintKind::Max,
            Self::LengthMin(_) => ConstraintKind::LengthMin,
            Self::LengthMax(_) => ConstraintKind::LengthMax,
            Self::CharacterExclude(_) => ConstraintKind::CharacterExclude,
        }
    }

    /// Check a value. Returns the failure message, or `None` on success.
    pub fn evaluate(&self, value: &Value) -> Option<String> {
        match self {
            Self::Min(min) => match min.compare(value) {
                Some(Ordering::Less) => Some(format!("{} is less than {}", value, min)),
                _ => None,
            },
            Self::Max(max) => match max.compare(value) {
                Some(Ordering::Greater) => Some(format!("{} is greater than {}", value, max)),
                _ => None,
            },
            Self::LengthMin(min) => match value.length() {
                Some(len) if len < *min => {
                    Some(format!("Length of {} is less than {}", value, min))
                }
                _ => None,
            },
            Self::LengthMax(max) => match value.length() {
                Some(len) if len > *max => {
                    Some(format!("Length of {} is greater than {}", value, max))
                }
                _ => None,
            },
            Self::CharacterExclude(excluded) => {
                let text = value.as_str()?;
                text.chars()
                    .find(|c| excluded.contains(c))
                    .map(|c| format!("'{}' contains excluded character '{}'", text, c))
            }
        }
    }
}

fn numeric_bound(kind: ConstraintKind, argument: &Value) -> Result<Bound, String> {
    match argument {
        Value::Int(i) => Ok(Bound::Int(*i)),
        Value::Float(f) => Ok(Bound::Float(*f)),
        other => Err(format!(
            "'{}' expects a number, got {}",
            kind.keyword(),
            other.type_name()
        )),
    }
}

fn length_bound(kind: ConstraintKind, argument: &Value) -> Result<usize, String> {
    match argument {
        Value::Int(i) if *i >= 0 => Ok(*i as usize),
        Value::Int(i) => Err(format!(
            "'{}' expects a non-negative length, got {}",
            kind.keyword(),
            i
        )),
        other => Err(format!(
            "'{}' expects an integer length, got {}",
            kind.keyword(),
            other.type_name()
        )),
    }
}
