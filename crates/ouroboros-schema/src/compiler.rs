//! Schema compilation
//!
//! Turns a schema document into a [`Schema`]: a root map validator plus a
//! table of named include bodies. Include sites only hold the name, so a
//! body that includes itself (directly or through others) compiles without
//! being unfolded.

use crate::config::ValidationConfig;
use crate::constraints::{Constraint, ConstraintKind};
use crate::errors::{
    Path, PathSegment, SchemaError, SchemaResult, ValidationErrors, ValidationResult,
};
use crate::expression::{parse_expression, Argument, Call};
use crate::matcher;
use crate::registry::{Builtin, Constructor, Registry};
use crate::types::Value;
use crate::validators::{Field, MapBody, Validator, ValidatorKind};
use std::collections::HashMap;

/// Keyword accepted by every validator
const REQUIRED_KEYWORD: &str = "required";
const REGEX_KEYWORDS: &[&str] = &["name", "ignore_case", "multiline", "dotall"];

// ============================================================================
// Schema
// ============================================================================

/// A compiled, immutable schema
///
/// Safe to share between threads and reuse for any number of validations.
#[derive(Debug, Clone)]
pub struct Schema {
    root: Validator,
    includes: HashMap<String, Validator>,
}

impl Schema {
    /// Root validator (a map)
    pub fn root(&self) -> &Validator {
        &self.root
    }

    /// Compiled body of a named include
    pub fn include(&self, name: &str) -> Option<&Validator> {
        self.includes.get(name)
    }

    /// Names of every include body, sorted
    pub fn include_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.includes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a dotted path such as `person.tags.0` into the compiled tree.
    ///
    /// Map fields are addressed by name and list/any/map alternatives by
    /// index. Include sites are followed into their bodies.
    pub fn lookup(&self, path: &str) -> Option<&Validator> {
        let mut current = &self.root;
        if path.is_empty() {
            return Some(current);
        }

        for segment in path.split('.') {
            current = self.resolve_include(current)?;
            current = match current.kind() {
                ValidatorKind::Map(MapBody::Fields(fields)) => fields
                    .iter()
                    .find(|field| field.name == segment)
                    .map(|field| &field.validator)?,
                ValidatorKind::List(alternatives)
                | ValidatorKind::Any(alternatives)
                | ValidatorKind::Map(MapBody::Values(alternatives)) => {
                    alternatives.get(segment.parse::<usize>().ok()?)?
                }
                _ => return None,
            };
        }

        Some(current)
    }

    fn resolve_include<'s>(&'s self, validator: &'s Validator) -> Option<&'s Validator> {
        let mut current = validator;
        // Bounded by the table size so a body that is only an include of
        // itself cannot spin forever.
        for _ in 0..=self.includes.len() {
            match current.kind() {
                ValidatorKind::Include(name) => current = self.includes.get(name)?,
                _ => return Some(current),
            }
        }
        None
    }

    /// Match a data document, returning every error found
    pub fn validate(&self, data: &Value, config: &ValidationConfig) -> ValidationErrors {
        matcher::validate(self, data, config)
    }

    /// Match a data document, failing with the aggregated errors
    pub fn validate_or_raise(
        &self,
        data: &Value,
        config: &ValidationConfig,
    ) -> ValidationResult<()> {
        matcher::validate_or_raise(self, data, config)
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles schema documents using a [`Registry`]
#[derive(Debug, Clone, Default)]
pub struct SchemaCompiler {
    registry: Registry,
}

impl SchemaCompiler {
    /// Compiler with the built-in validators
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiler using a caller-supplied registry
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    /// The registry tags are resolved against
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compile a single schema document
    pub fn compile(&self, document: &Value) -> SchemaResult<Schema> {
        self.compile_documents(std::slice::from_ref(document))
    }

    /// Compile a multi-document schema.
    ///
    /// The first document is the root schema. Each top-level key of every
    /// following document names an include body.
    pub fn compile_documents(&self, documents: &[Value]) -> SchemaResult<Schema> {
        let mut compilation = Compilation {
            registry: &self.registry,
            references: Vec::new(),
        };
        let mut path = Vec::new();

        let Some(root_document) = documents.first() else {
            return Err(SchemaError::NotAMapping {
                path: render(&path),
                found: Value::Null.type_name(),
            });
        };
        let root_fields = compilation.compile_mapping(root_document, &mut path)?;
        let root = Validator::new(ValidatorKind::Map(MapBody::Fields(root_fields)));

        let mut includes = HashMap::new();
        for document in documents.iter().skip(1) {
            let Value::Object(pairs) = document else {
                if document.is_null() {
                    continue;
                }
                return Err(SchemaError::NotAMapping {
                    path: render(&path),
                    found: document.type_name(),
                });
            };

            for (name, body) in pairs {
                if includes.contains_key(name) {
                    return Err(SchemaError::DuplicateInclude { name: name.clone() });
                }
                path.push(PathSegment::Key(name.clone()));
                let fields = compilation.compile_mapping(body, &mut path)?;
                path.pop();
                includes.insert(
                    name.clone(),
                    Validator::new(ValidatorKind::Map(MapBody::Fields(fields))),
                );
            }
        }

        for (name, site) in compilation.references {
            if !includes.contains_key(&name) {
                return Err(SchemaError::UnresolvedInclude { path: site, name });
            }
        }

        tracing::debug!(
            fields = root.children().len(),
            includes = includes.len(),
            "Schema compiled"
        );

        Ok(Schema { root, includes })
    }

    /// Parse multi-document YAML and compile it
    #[cfg(feature = "yaml")]
    pub fn compile_yaml(&self, input: &str) -> SchemaResult<Schema> {
        let documents =
            Value::from_yaml_documents(input).map_err(|e| SchemaError::Yaml(e.to_string()))?;
        self.compile_documents(&documents)
    }
}

// ============================================================================
// Compilation State
// ============================================================================

struct Compilation<'r> {
    registry: &'r Registry,
    /// Include names with the schema path they were referenced from
    references: Vec<(String, String)>,
}

impl Compilation<'_> {
    fn compile_mapping(
        &mut self,
        document: &Value,
        path: &mut Vec<PathSegment>,
    ) -> SchemaResult<Vec<Field>> {
        let Value::Object(pairs) = document else {
            return Err(SchemaError::NotAMapping {
                path: render(path),
                found: document.type_name(),
            });
        };

        let mut fields = Vec::with_capacity(pairs.len());
        for (name, value) in pairs {
            path.push(PathSegment::Key(name.clone()));
            let validator = self.compile_node(value, path)?;
            path.pop();
            fields.push(Field::new(name.clone(), validator));
        }
        Ok(fields)
    }

    fn compile_node(
        &mut self,
        value: &Value,
        path: &mut Vec<PathSegment>,
    ) -> SchemaResult<Validator> {
        match value {
            Value::Object(_) => {
                let fields = self.compile_mapping(value, path)?;
                Ok(Validator::new(ValidatorKind::Map(MapBody::Fields(fields))))
            }
            Value::String(expression) => {
                let call = parse_expression(expression).map_err(|e| SchemaError::Syntax {
                    path: render(path),
                    expression: expression.clone(),
                    offset: e.offset,
                    message: e.message,
                })?;
                self.compile_call(&call, path)
            }
            Value::List(items) => {
                let mut alternatives = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(i));
                    alternatives.push(self.compile_node(item, path)?);
                    path.pop();
                }
                Ok(Validator::new(ValidatorKind::List(alternatives)))
            }
            other => Err(SchemaError::InvalidSchemaValue {
                path: render(path),
                found: other.type_name(),
            }),
        }
    }

    fn compile_call(
        &mut self,
        call: &Call,
        path: &mut Vec<PathSegment>,
    ) -> SchemaResult<Validator> {
        let constructor = self
            .registry
            .get(&call.name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownValidator {
                path: render(path),
                tag: call.name.clone(),
            })?;

        let (kind, consumed): (ValidatorKind, &[&str]) = match constructor {
            Constructor::Builtin(builtin) => self.builtin_kind(builtin, call, path)?,
            Constructor::Custom(factory) => {
                let args = literal_args(call, path)?;
                let custom = factory(&args).map_err(|reason| invalid(call, path, reason))?;
                (ValidatorKind::Custom(custom), &[])
            }
        };

        let mut validator = Validator::new(kind);
        for (keyword, argument) in &call.kwargs {
            if consumed.contains(&keyword.as_str()) {
                continue;
            }
            let value = literal(call, path, keyword, argument)?;

            if keyword == REQUIRED_KEYWORD {
                match value {
                    Value::Bool(required) => validator.set_required(*required),
                    other => {
                        return Err(invalid(
                            call,
                            path,
                            format!("'required' expects a boolean, got {}", other.type_name()),
                        ))
                    }
                }
                continue;
            }

            match ConstraintKind::resolve(keyword, validator.supported_constraints()) {
                Some(kind) => {
                    let constraint = Constraint::from_argument(kind, value)
                        .map_err(|reason| invalid(call, path, reason))?;
                    validator = validator.with_constraint(constraint);
                }
                None if ConstraintKind::is_known_keyword(keyword) => {
                    return Err(SchemaError::IncompatibleConstraint {
                        path: render(path),
                        tag: call.name.clone(),
                        keyword: keyword.clone(),
                    })
                }
                None => {
                    return Err(SchemaError::UnknownArgument {
                        path: render(path),
                        tag: call.name.clone(),
                        keyword: keyword.clone(),
                    })
                }
            }
        }

        Ok(validator)
    }

    fn builtin_kind(
        &mut self,
        builtin: Builtin,
        call: &Call,
        path: &mut Vec<PathSegment>,
    ) -> SchemaResult<(ValidatorKind, &'static [&'static str])> {
        let kind = match builtin {
            Builtin::String => no_args(call, path, ValidatorKind::String)?,
            Builtin::Number => no_args(call, path, ValidatorKind::Number)?,
            Builtin::Integer => no_args(call, path, ValidatorKind::Integer)?,
            Builtin::Boolean => no_args(call, path, ValidatorKind::Boolean)?,
            Builtin::Null => no_args(call, path, ValidatorKind::Null)?,
            Builtin::Enum => {
                let values = literal_args(call, path)?;
                if values.is_empty() {
                    return Err(invalid(call, path, "expects at least one value"));
                }
                ValidatorKind::Enum(values)
            }
            Builtin::Regex => return Ok((regex_kind(call, path)?, REGEX_KEYWORDS)),
            Builtin::Map => ValidatorKind::Map(MapBody::Values(self.nested_calls(call, path)?)),
            Builtin::List => ValidatorKind::List(self.nested_calls(call, path)?),
            Builtin::Any => ValidatorKind::Any(self.nested_calls(call, path)?),
            Builtin::Include => {
                let name = match call.args.as_slice() {
                    [Argument::Literal(Value::String(name))] => name.clone(),
                    _ => return Err(invalid(call, path, "expects exactly one include name")),
                };
                self.references.push((name.clone(), render(path)));
                ValidatorKind::Include(name)
            }
        };
        Ok((kind, &[]))
    }

    fn nested_calls(
        &mut self,
        call: &Call,
        path: &mut Vec<PathSegment>,
    ) -> SchemaResult<Vec<Validator>> {
        let mut validators = Vec::with_capacity(call.args.len());
        for (i, argument) in call.args.iter().enumerate() {
            let Argument::Call(nested) = argument else {
                return Err(invalid(
                    call,
                    path,
                    format!("argument {} must be a validator expression", i),
                ));
            };
            path.push(PathSegment::Index(i));
            let validator = self.compile_call(nested, path)?;
            path.pop();
            validators.push(validator);
        }
        Ok(validators)
    }
}

fn regex_kind(call: &Call, path: &[PathSegment]) -> SchemaResult<ValidatorKind> {
    let flag = |keyword: &str| -> SchemaResult<bool> {
        match call.kwarg(keyword) {
            None => Ok(false),
            Some(Argument::Literal(Value::Bool(b))) => Ok(*b),
            Some(_) => Err(invalid(call, path, format!("'{}' expects a boolean", keyword))),
        }
    };
    let ignore_case = flag("ignore_case")?;
    let multiline = flag("multiline")?;
    let dotall = flag("dotall")?;

    let name = match call.kwarg("name") {
        None => None,
        Some(Argument::Literal(Value::String(name))) => Some(name.clone()),
        Some(_) => return Err(invalid(call, path, "'name' expects a string")),
    };

    let sources = literal_args(call, path)?;
    if sources.is_empty() {
        return Err(invalid(call, path, "expects at least one pattern"));
    }

    let mut patterns = Vec::with_capacity(sources.len());
    for source in &sources {
        let Value::String(source) = source else {
            return Err(invalid(call, path, "patterns must be strings"));
        };
        let pattern = regex::RegexBuilder::new(source)
            .case_insensitive(ignore_case)
            .multi_line(multiline)
            .dot_matches_new_line(dotall)
            .build()
            .map_err(|e| invalid(call, path, e.to_string()))?;
        patterns.push(pattern);
    }

    Ok(ValidatorKind::Regex { patterns, name })
}

fn no_args(call: &Call, path: &[PathSegment], kind: ValidatorKind) -> SchemaResult<ValidatorKind> {
    if call.args.is_empty() {
        Ok(kind)
    } else {
        Err(invalid(call, path, "takes no positional arguments"))
    }
}

fn literal_args(call: &Call, path: &[PathSegment]) -> SchemaResult<Vec<Value>> {
    call.args
        .iter()
        .map(|argument| match argument {
            Argument::Literal(value) => Ok(value.clone()),
            Argument::Call(nested) => Err(invalid(
                call,
                path,
                format!("'{}(...)' is not allowed here, expected a literal", nested.name),
            )),
        })
        .collect()
}

fn literal<'c>(
    call: &Call,
    path: &[PathSegment],
    keyword: &str,
    argument: &'c Argument,
) -> SchemaResult<&'c Value> {
    match argument {
        Argument::Literal(value) => Ok(value),
        Argument::Call(_) => Err(invalid(
            call,
            path,
            format!("'{}' expects a literal value", keyword),
        )),
    }
}

fn invalid(call: &Call, path: &[PathSegment], reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidArgument {
        path: render(path),
        tag: call.name.clone(),
        reason: reason.into(),
    }
}

fn render(path: &[PathSegment]) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        Path::from(path.to_vec()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Bound;

    fn schema_doc(pairs: &[(&str, &str)]) -> Value {
        Value::object(pairs.iter().map(|(k, v)| (*k, Value::from(*v))))
    }

    fn compile(pairs: &[(&str, &str)]) -> SchemaResult<Schema> {
        SchemaCompiler::new().compile(&schema_doc(pairs))
    }

    #[test]
    fn test_flat_schema() {
        let schema = compile(&[("name", "str()"), ("age", "int(min=0, max=120)")]).unwrap();
        assert!(matches!(schema.lookup("name").unwrap().kind(), ValidatorKind::String));

        let age = schema.lookup("age").unwrap();
        assert!(matches!(age.kind(), ValidatorKind::Integer));
        assert_eq!(
            age.constraints(),
            &[Constraint::Min(Bound::Int(0)), Constraint::Max(Bound::Int(120))]
        );
    }

    #[test]
    fn test_min_resolves_per_variant() {
        let schema = compile(&[("s", "str(min=2)"), ("n", "num(min=2)"), ("l", "list(min=2)")])
            .unwrap();
        assert_eq!(schema.lookup("s").unwrap().constraints(), &[Constraint::LengthMin(2)]);
        assert_eq!(
            schema.lookup("n").unwrap().constraints(),
            &[Constraint::Min(Bound::Int(2))]
        );
        assert_eq!(schema.lookup("l").unwrap().constraints(), &[Constraint::LengthMin(2)]);
    }

    #[test]
    fn test_nested_schema() {
        let document = Value::object([
            ("string", Value::from("str()")),
            (
                "list",
                Value::List(vec![Value::from("str()"), Value::from("int()")]),
            ),
            ("inner", Value::object([("flag", Value::from("bool(required=False)"))])),
        ]);
        let schema = SchemaCompiler::new().compile(&document).unwrap();

        assert!(matches!(schema.lookup("list.0").unwrap().kind(), ValidatorKind::String));
        assert!(matches!(schema.lookup("list.1").unwrap().kind(), ValidatorKind::Integer));
        let flag = schema.lookup("inner.flag").unwrap();
        assert!(!flag.is_required());
        assert!(schema.lookup("inner.missing").is_none());
        assert!(schema.lookup("string.0").is_none());
    }

    #[test]
    fn test_list_children() {
        let schema = compile(&[("tags", "list(str(), int(max=3), min=1)")]).unwrap();
        let tags = schema.lookup("tags").unwrap();
        assert_eq!(tags.children().len(), 2);
        assert_eq!(tags.constraints(), &[Constraint::LengthMin(1)]);
        assert_eq!(
            schema.lookup("tags.1").unwrap().constraints(),
            &[Constraint::Max(Bound::Int(3))]
        );
    }

    #[test]
    fn test_unknown_validator() {
        let err = compile(&[("a", "strr()")]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownValidator {
                path: "a".to_string(),
                tag: "strr".to_string()
            }
        );
    }

    #[test]
    fn test_incompatible_constraint() {
        let err = compile(&[("flag", "bool(min=1)")]).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::IncompatibleConstraint { ref tag, ref keyword, .. }
                if tag == "bool" && keyword == "min"
        ));

        let err = compile(&[("n", "int(exclude='a')")]).unwrap_err();
        assert!(matches!(err, SchemaError::IncompatibleConstraint { .. }));
    }

    #[test]
    fn test_unknown_argument() {
        let err = compile(&[("s", "str(pattern='x')")]).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnknownArgument { ref keyword, .. } if keyword == "pattern"
        ));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(
            compile(&[("s", "str(min='x')")]).unwrap_err(),
            SchemaError::InvalidArgument { .. }
        ));
        assert!(matches!(
            compile(&[("s", "str('x')")]).unwrap_err(),
            SchemaError::InvalidArgument { .. }
        ));
        assert!(matches!(
            compile(&[("e", "enum()")]).unwrap_err(),
            SchemaError::InvalidArgument { .. }
        ));
        assert!(matches!(
            compile(&[("l", "list('str')")]).unwrap_err(),
            SchemaError::InvalidArgument { .. }
        ));
        assert!(matches!(
            compile(&[("s", "str(required='yes')")]).unwrap_err(),
            SchemaError::InvalidArgument { .. }
        ));
        assert!(matches!(
            compile(&[("r", "regex('(')")]).unwrap_err(),
            SchemaError::InvalidArgument { .. }
        ));
    }

    #[test]
    fn test_syntax_error_carries_location() {
        let err = compile(&[("a", "list(str()")]).unwrap_err();
        match err {
            SchemaError::Syntax { path, expression, .. } => {
                assert_eq!(path, "a");
                assert_eq!(expression, "list(str()");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_document_shape_errors() {
        let err = SchemaCompiler::new().compile(&Value::from("str()")).unwrap_err();
        assert_eq!(
            err,
            SchemaError::NotAMapping {
                path: "(root)".to_string(),
                found: "string"
            }
        );

        let err = SchemaCompiler::new()
            .compile(&Value::object([("a", Value::Int(3))]))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidSchemaValue {
                path: "a".to_string(),
                found: "integer"
            }
        );
    }

    #[test]
    fn test_includes_compiled_once() {
        let root = schema_doc(&[
            ("owner", "include('person')"),
            ("admins", "list(include('person'))"),
        ]);
        let includes = Value::object([(
            "person",
            Value::object([("name", Value::from("str()"))]),
        )]);
        let schema = SchemaCompiler::new()
            .compile_documents(&[root, includes])
            .unwrap();

        assert_eq!(schema.include_names(), vec!["person"]);
        assert!(matches!(
            schema.lookup("owner").unwrap().kind(),
            ValidatorKind::Map(MapBody::Fields(_))
        ));
        assert!(matches!(schema.lookup("owner.name").unwrap().kind(), ValidatorKind::String));
        assert!(matches!(
            schema.lookup("admins.0.name").unwrap().kind(),
            ValidatorKind::String
        ));
    }

    #[test]
    fn test_unresolved_include() {
        let err = compile(&[("owner", "include('person')")]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnresolvedInclude {
                path: "owner".to_string(),
                name: "person".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_include() {
        let root = schema_doc(&[("a", "include('x')")]);
        let first = Value::object([("x", Value::object([("b", Value::from("str()"))]))]);
        let second = first.clone();
        let err = SchemaCompiler::new()
            .compile_documents(&[root, first, second])
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateInclude { name: "x".to_string() });
    }

    #[test]
    fn test_cyclic_includes_compile() {
        let root = schema_doc(&[("node", "include('node')")]);
        let includes = Value::object([(
            "node",
            Value::object([
                ("value", Value::from("int()")),
                ("next", Value::from("include('node', required=False)")),
            ]),
        )]);
        let schema = SchemaCompiler::new()
            .compile_documents(&[root, includes])
            .unwrap();
        assert!(matches!(
            schema.lookup("node.next.next.value").unwrap().kind(),
            ValidatorKind::Integer
        ));
    }

    #[test]
    fn test_custom_registry() {
        use crate::registry::FnValidator;

        let mut registry = Registry::new();
        registry.register_validator(
            FnValidator::new("port", |v| matches!(v, Value::Int(_)))
                .constraint(ConstraintKind::Max),
        );
        let compiler = SchemaCompiler::with_registry(registry);

        let schema = compiler.compile(&schema_doc(&[("p", "port(max=65535)")])).unwrap();
        assert_eq!(schema.lookup("p").unwrap().tag(), "port");

        let err = compiler.compile(&schema_doc(&[("p", "port(min=1)")])).unwrap_err();
        assert!(matches!(err, SchemaError::IncompatibleConstraint { .. }));

        let isolated = SchemaCompiler::new().compile(&schema_doc(&[("p", "port()")]));
        assert!(matches!(isolated, Err(SchemaError::UnknownValidator { .. })));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_compile_yaml() {
        let schema = SchemaCompiler::new()
            .compile_yaml("name: str()\nfriend: include('person')\n---\nperson:\n  name: str()\n")
            .unwrap();
        assert_eq!(schema.include_names(), vec!["person"]);

        let err = SchemaCompiler::new().compile_yaml("a: [unclosed").unwrap_err();
        assert!(matches!(err, SchemaError::Yaml(_)));
    }
}
