//! Generic document tree
//!
//! Schema and data documents both arrive as a [`Value`] tree. Parsing the
//! source format is left to the caller; the `yaml` and `serde` features
//! provide conversions from `serde_yaml` and `serde_json` trees.

use std::fmt;

// ============================================================================
// Value Enum - Runtime values to be validated
// ============================================================================

/// A node of an already-parsed document
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (i64)
    Int(i64),
    /// Float value (f64)
    Float(f64),
    /// String value
    String(String),
    /// Ordered sequence of values
    List(Vec<Value>),
    /// Mapping with string keys, kept in document order
    Object(Vec<(String, Value)>),
}

/// Structural classification of a [`Value`]
///
/// All shape checks in the crate go through [`Value::shape`] so that
/// "sequence", "mapping" and "number" mean the same thing everywhere.
/// Text is never a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Null scalar
    Null,
    /// Boolean scalar
    Bool,
    /// Integer scalar
    Int,
    /// Floating point scalar
    Float,
    /// Text scalar
    Text,
    /// Ordered sequence
    Sequence,
    /// Key/value mapping
    Mapping,
}

impl Shape {
    /// Integer or float. Booleans are not numbers.
    pub fn is_number(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    /// Scalars are everything that is neither a sequence nor a mapping.
    pub fn is_scalar(self) -> bool {
        !matches!(self, Self::Sequence | Self::Mapping)
    }
}

impl Value {
    /// Classify the value
    pub fn shape(&self) -> Shape {
        match self {
            Self::Null => Shape::Null,
            Self::Bool(_) => Shape::Bool,
            Self::Int(_) => Shape::Int,
            Self::Float(_) => Shape::Float,
            Self::String(_) => Shape::Text,
            Self::List(_) => Shape::Sequence,
            Self::Object(_) => Shape::Mapping,
        }
    }

    /// Get human-readable type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Object(_) => "map",
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text of a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of an integer or float value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Look up a key of a mapping value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Number of characters, elements or keys, for length constraints
    pub fn length(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::List(items) => Some(items.len()),
            Self::Object(pairs) => Some(pairs.len()),
            _ => None,
        }
    }

    /// Build a mapping from key/value pairs
    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Object(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

// ============================================================================
// Conversions
// ============================================================================

#[cfg(feature = "yaml")]
impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    // u64 beyond i64 and real floats both land here
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_yaml::Value::String(s) => Value::String(s),
            serde_yaml::Value::Sequence(items) => {
                Value::List(items.into_iter().map(Into::into).collect())
            }
            serde_yaml::Value::Mapping(mapping) => {
                // `1` and `'1'` render to the same key; the later value wins
                // and keeps the position of the first.
                let mut pairs: Vec<(String, Value)> = Vec::with_capacity(mapping.len());
                for (k, v) in mapping {
                    let key = yaml_key(k);
                    let value = Value::from(v);
                    match pairs.iter_mut().find(|(existing, _)| *existing == key) {
                        Some(slot) => slot.1 = value,
                        None => pairs.push((key, value)),
                    }
                }
                Value::Object(pairs)
            }
            serde_yaml::Value::Tagged(tagged) => tagged.value.into(),
        }
    }
}

#[cfg(feature = "yaml")]
fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        other => Value::from(other).to_string(),
    }
}

#[cfg(feature = "yaml")]
impl Value {
    /// Parse a single YAML document
    pub fn from_yaml_str(input: &str) -> Result<Self, serde_yaml::Error> {
        let parsed: serde_yaml::Value = serde_yaml::from_str(input)?;
        Ok(parsed.into())
    }

    /// Parse every document of a multi-document YAML stream
    pub fn from_yaml_documents(input: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        use serde::Deserialize;

        serde_yaml::Deserializer::from_str(input)
            .map(|document| serde_yaml::Value::deserialize(document).map(Value::from))
            .collect()
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

#[cfg(feature = "serde")]
impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}
