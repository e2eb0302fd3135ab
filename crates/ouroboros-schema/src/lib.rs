//! Ouroboros Schema
//!
//! Declarative validation of YAML documents against YAML schemas.
//!
//! A schema is itself a YAML document whose leaves are validator
//! expressions such as `str()`, `int(min=0, max=120)` or
//! `list(include('person'), min=1)`. The schema is compiled once into a
//! tree of validators and can then check any number of documents, reporting
//! every failure with its dotted path (`people.2.name`).
//!
//! # Features
//!
//! - **yaml** (default): parse schemas and documents from YAML text with `serde_yaml`
//! - **serde**: convert between [`Value`] and `serde_json::Value`
//!
//! # Example
//!
//! ```rust
//! use ouroboros_schema::{SchemaCompiler, ValidationConfig, Value};
//!
//! let schema = SchemaCompiler::new()
//!     .compile_yaml(
//!         "name: str()\n\
//!          age: int(max=200)\n\
//!          friends: list(include('person'), required=False)\n\
//!          ---\n\
//!          person:\n  \
//!            name: str()\n  \
//!            age: int(min=0)\n",
//!     )
//!     .unwrap();
//!
//! let data =
//!     Value::from_yaml_str("name: Bill\nage: 26\nfriends:\n  - name: Ann\n    age: -1\n")
//!         .unwrap();
//!
//! let errors = schema.validate(&data, &ValidationConfig::default());
//! assert_eq!(errors.messages(), vec!["friends.0.age: -1 is less than 0"]);
//! ```

// Public modules
pub mod compiler;
pub mod config;
pub mod constraints;
pub mod errors;
pub mod expression;
pub mod matcher;
pub mod registry;
pub mod types;
pub mod validators;

// Re-export commonly used types
pub use compiler::{Schema, SchemaCompiler};
pub use config::ValidationConfig;
pub use constraints::{Bound, Constraint, ConstraintKind};
pub use errors::{
    ErrorType, Path, PathSegment, SchemaError, SchemaResult, ValidationContext, ValidationError,
    ValidationErrors, ValidationResult,
};
pub use matcher::{validate, validate_or_raise};
pub use registry::{Builtin, Constructor, FnValidator, Registry, ValidatorFactory};
pub use types::{Shape, Value};
pub use validators::{
    BoxedCustomValidator, CustomValidator, Field, MapBody, Outcome, Validator, ValidatorKind,
};

/// Compile a single schema document with the built-in validators
pub fn compile(document: &Value) -> SchemaResult<Schema> {
    SchemaCompiler::new().compile(document)
}

/// Compile multi-document YAML schema text with the built-in validators
#[cfg(feature = "yaml")]
pub fn compile_yaml(input: &str) -> SchemaResult<Schema> {
    SchemaCompiler::new().compile_yaml(input)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
