//! Recursive validation engine
//!
//! Walks a data document and a compiled [`Schema`] in lock-step. Errors are
//! accumulated, never short-circuited: every declared field and every list
//! element is visited regardless of failures next to it.
//!
//! Recursion through includes always passes through a map validator, which
//! consumes one level of the data document, so matching cyclic schemas is
//! bounded by the depth of the data.

use crate::compiler::Schema;
use crate::config::ValidationConfig;
use crate::errors::{
    ErrorType, ValidationContext, ValidationError, ValidationErrors, ValidationResult,
};
use crate::types::Value;
use crate::validators::{Field, MapBody, Outcome, Validator, ValidatorKind};
use std::collections::HashSet;

// ============================================================================
// Public API
// ============================================================================

/// Validate a document against a compiled schema
///
/// Returns every error found, in document order. An empty collection means
/// the document is valid.
///
/// # Example
///
/// ```
/// use ouroboros_schema::{validate, SchemaCompiler, ValidationConfig, Value};
///
/// let schema = SchemaCompiler::new()
///     .compile(&Value::object([("age", Value::from("int(min=0, max=120)"))]))
///     .unwrap();
///
/// let data = Value::object([("age", Value::Int(200))]);
/// let errors = validate(&schema, &data, &ValidationConfig::default());
/// assert_eq!(errors.len(), 1);
/// assert_eq!(errors.as_slice()[0].to_string(), "age: 200 is greater than 120");
/// ```
pub fn validate(schema: &Schema, data: &Value, config: &ValidationConfig) -> ValidationErrors {
    let matcher = Matcher { schema, config };
    let mut ctx = ValidationContext::new();
    let mut errors = ValidationErrors::new();

    matcher.match_value(schema.root(), data, &mut ctx, &mut errors);

    tracing::debug!(
        errors = errors.len(),
        strict = config.strict,
        "Validation finished"
    );
    errors
}

/// Validate a document, failing with the aggregated errors
///
/// The error's `Display` is one `path: message` line per error.
pub fn validate_or_raise(
    schema: &Schema,
    data: &Value,
    config: &ValidationConfig,
) -> ValidationResult<()> {
    validate(schema, data, config).into_result()
}

// ============================================================================
// Matcher
// ============================================================================

struct Matcher<'s> {
    schema: &'s Schema,
    config: &'s ValidationConfig,
}

impl Matcher<'_> {
    fn match_value(
        &self,
        validator: &Validator,
        value: &Value,
        ctx: &mut ValidationContext,
        errors: &mut ValidationErrors,
    ) {
        match validator.kind() {
            ValidatorKind::Map(body) => self.match_map(validator, body, value, ctx, errors),
            ValidatorKind::List(alternatives) => {
                self.match_list(validator, alternatives, value, ctx, errors)
            }
            ValidatorKind::Any(alternatives) => {
                self.match_alternatives(alternatives, value, ctx, errors)
            }
            ValidatorKind::Include(name) => self.match_include(name, value, ctx, errors),
            _ => {
                self.check_node(validator, value, ctx, errors);
            }
        }
    }

    /// Records the node's own messages at the current path. Returns false
    /// when the shape is wrong, in which case nothing below this node is
    /// visited.
    fn check_node(
        &self,
        validator: &Validator,
        value: &Value,
        ctx: &ValidationContext,
        errors: &mut ValidationErrors,
    ) -> bool {
        match validator.check(value) {
            Outcome::Mismatch(message) => {
                errors.add(ValidationError::type_error(ctx.current_path(), message));
                false
            }
            Outcome::Checked(violations) => {
                for message in violations {
                    errors.add(ValidationError::value_error(ctx.current_path(), message));
                }
                true
            }
        }
    }

    fn match_map(
        &self,
        validator: &Validator,
        body: &MapBody,
        value: &Value,
        ctx: &mut ValidationContext,
        errors: &mut ValidationErrors,
    ) {
        if !self.check_node(validator, value, ctx, errors) {
            return;
        }
        let Value::Object(pairs) = value else {
            return;
        };

        match body {
            MapBody::Fields(fields) => self.match_fields(fields, value, pairs, ctx, errors),
            MapBody::Values(alternatives) => {
                for (key, item) in pairs {
                    ctx.push_key(key);
                    self.match_alternatives(alternatives, item, ctx, errors);
                    ctx.pop();
                }
            }
        }
    }

    fn match_fields(
        &self,
        fields: &[Field],
        value: &Value,
        pairs: &[(String, Value)],
        ctx: &mut ValidationContext,
        errors: &mut ValidationErrors,
    ) {
        for field in fields {
            ctx.push_key(&field.name);
            match value.get(&field.name) {
                None if field.validator.is_required() => {
                    errors.add(ValidationError::missing_error(ctx.current_path()));
                }
                None => {}
                Some(Value::Null) if !field.validator.is_required() => {}
                Some(item) => self.match_value(&field.validator, item, ctx, errors),
            }
            ctx.pop();
        }

        if self.config.strict {
            let declared: HashSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();
            for (key, _) in pairs {
                if !declared.contains(key.as_str()) {
                    ctx.push_key(key);
                    errors.add(ValidationError::extra_error(ctx.current_path()));
                    ctx.pop();
                }
            }
        }
    }

    fn match_list(
        &self,
        validator: &Validator,
        alternatives: &[Validator],
        value: &Value,
        ctx: &mut ValidationContext,
        errors: &mut ValidationErrors,
    ) {
        if !self.check_node(validator, value, ctx, errors) {
            return;
        }
        let Value::List(items) = value else {
            return;
        };

        for (i, item) in items.iter().enumerate() {
            ctx.push_index(i);
            self.match_alternatives(alternatives, item, ctx, errors);
            ctx.pop();
        }
    }

    /// OR semantics over alternatives.
    ///
    /// No alternatives accepts anything. A single alternative reports its
    /// own errors with their full paths. With several, the value passes if
    /// any alternative produces no errors; otherwise exactly one combined
    /// error is reported at the current path.
    fn match_alternatives(
        &self,
        alternatives: &[Validator],
        value: &Value,
        ctx: &mut ValidationContext,
        errors: &mut ValidationErrors,
    ) {
        match alternatives {
            [] => {}
            [only] => self.match_value(only, value, ctx, errors),
            _ => {
                let base = ctx.current_path();
                let mut reasons: Vec<String> = Vec::new();

                for alternative in alternatives {
                    let mut attempt = ValidationErrors::new();
                    self.match_value(alternative, value, ctx, &mut attempt);
                    if attempt.is_empty() {
                        return;
                    }

                    for error in attempt.errors {
                        let reason = match error.path.strip_prefix(&base) {
                            Some(relative) if !relative.is_root() => {
                                format!("{}: {}", relative, error.message)
                            }
                            _ => error.message,
                        };
                        if !reasons.contains(&reason) {
                            reasons.push(reason);
                        }
                    }
                }

                errors.add(ValidationError::new(
                    base,
                    format!("'{}' does not match any of: {}", value, reasons.join("; ")),
                    ErrorType::NoMatch,
                ));
            }
        }
    }

    fn match_include(
        &self,
        name: &str,
        value: &Value,
        ctx: &mut ValidationContext,
        errors: &mut ValidationErrors,
    ) {
        match self.schema.include(name) {
            Some(body) => self.match_value(body, value, ctx, errors),
            None => {
                // The compiler rejects unresolved names; this only guards
                // against a schema assembled some other way.
                tracing::error!(include = %name, path = %ctx.current_path(), "Unresolved include");
                errors.add(ValidationError::new(
                    ctx.current_path(),
                    format!("Include '{}' is not defined", name),
                    ErrorType::UnresolvedInclude,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::SchemaCompiler;

    fn schema(pairs: &[(&str, &str)]) -> Schema {
        SchemaCompiler::new()
            .compile(&Value::object(
                pairs.iter().map(|(k, v)| (*k, Value::from(*v))),
            ))
            .unwrap()
    }

    fn run(schema: &Schema, data: Value) -> Vec<String> {
        validate(schema, &data, &ValidationConfig::default()).messages()
    }

    #[test]
    fn test_valid_document() {
        let schema = schema(&[("name", "str()"), ("age", "int(min=0, max=120)")]);
        let data = Value::object([("name", Value::from("ann")), ("age", Value::Int(30))]);
        assert!(run(&schema, data).is_empty());
    }

    #[test]
    fn test_max_violation() {
        let schema = schema(&[("age", "int(min=0, max=120)")]);
        let errors = validate(
            &schema,
            &Value::object([("age", Value::Int(200))]),
            &ValidationConfig::default(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.as_slice()[0].path.to_string(), "age");
        assert_eq!(errors.as_slice()[0].error_type, ErrorType::ValueError);
        assert!(errors.as_slice()[0].message.contains("120"));
    }

    #[test]
    fn test_sibling_errors_all_reported() {
        let schema = schema(&[("a", "str()"), ("b", "int()"), ("c", "bool()")]);
        let data = Value::object([
            ("a", Value::Int(1)),
            ("b", Value::from("x")),
            ("c", Value::Int(0)),
        ]);
        assert_eq!(
            run(&schema, data),
            vec![
                "a: '1' is not a str.",
                "b: 'x' is not a int.",
                "c: '0' is not a bool.",
            ]
        );
    }

    #[test]
    fn test_missing_and_optional_fields() {
        let schema = schema(&[("a", "str()"), ("b", "str(required=False)")]);
        assert_eq!(
            run(&schema, Value::object(Vec::<(&str, Value)>::new())),
            vec!["a: Required field missing"]
        );
        let data = Value::object([("a", Value::from("x")), ("b", Value::Null)]);
        assert!(run(&schema, data).is_empty());
    }

    #[test]
    fn test_strict_and_lenient() {
        let schema = schema(&[("a", "str()")]);
        let data = Value::object([("a", Value::from("x")), ("b", Value::Int(1))]);

        let strict = validate(&schema, &data, &ValidationConfig::default());
        assert_eq!(strict.messages(), vec!["b: Unexpected element"]);
        assert_eq!(strict.as_slice()[0].error_type, ErrorType::ExtraForbidden);

        assert!(validate(&schema, &data, &ValidationConfig::lenient()).is_empty());
    }

    #[test]
    fn test_list_element_path() {
        let schema = schema(&[("tags", "list(str())")]);
        let data = Value::object([(
            "tags",
            Value::List(vec![Value::from("a"), Value::Int(2)]),
        )]);
        assert_eq!(run(&schema, data), vec!["tags.1: '2' is not a str."]);
    }

    #[test]
    fn test_list_alternatives_combined() {
        let schema = schema(&[("items", "list(str(), int())")]);
        let data = Value::object([(
            "items",
            Value::List(vec![Value::from("a"), Value::Int(1), Value::Bool(true)]),
        )]);
        let errors = validate(&schema, &data, &ValidationConfig::default());
        assert_eq!(errors.len(), 1);
        let error = &errors.as_slice()[0];
        assert_eq!(error.path.to_string(), "items.2");
        assert_eq!(error.error_type, ErrorType::NoMatch);
        assert_eq!(
            error.message,
            "'true' does not match any of: 'true' is not a str.; 'true' is not a int."
        );
    }

    #[test]
    fn test_combined_reasons_are_distinct() {
        let schema = schema(&[("xs", "list(int(min=0), int(max=10))")]);
        let data = Value::object([("xs", Value::List(vec![Value::from("q")]))]);
        assert_eq!(
            run(&schema, data),
            vec!["xs.0: 'q' does not match any of: 'q' is not a int."]
        );
    }

    #[test]
    fn test_combined_reasons_use_relative_paths() {
        let document = Value::object([("ys", Value::from("list(include('a'), include('b'))"))]);
        let includes = Value::object([
            ("a", Value::object([("x", Value::from("int()"))])),
            ("b", Value::object([("y", Value::from("str()"))])),
        ]);
        let schema = SchemaCompiler::new()
            .compile_documents(&[document, includes])
            .unwrap();

        let data = Value::object([(
            "ys",
            Value::List(vec![Value::object([("x", Value::from("z"))])]),
        )]);
        let errors = validate(&schema, &data, &ValidationConfig::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.as_slice()[0].path.to_string(), "ys.0");
        assert_eq!(
            errors.as_slice()[0].message,
            "'{x: z}' does not match any of: \
             x: 'z' is not a int.; y: Required field missing; x: Unexpected element"
        );
    }

    #[test]
    fn test_list_shape_and_length() {
        let schema = schema(&[("items", "list(int(), min=2)")]);
        assert_eq!(
            run(&schema, Value::object([("items", Value::from("ab"))])),
            vec!["items: 'ab' is not a list."]
        );
        assert_eq!(
            run(
                &schema,
                Value::object([("items", Value::List(vec![Value::from("x")]))])
            ),
            vec![
                "items: Length of [x] is less than 2",
                "items.0: 'x' is not a int.",
            ]
        );
    }

    #[test]
    fn test_nested_map_paths() {
        let document = Value::object([(
            "a",
            Value::object([("b", Value::from("list(include('c'))"))]),
        )]);
        let includes = Value::object([("c", Value::object([("d", Value::from("num()"))]))]);
        let schema = SchemaCompiler::new()
            .compile_documents(&[document, includes])
            .unwrap();

        let data = Value::object([(
            "a",
            Value::object([(
                "b",
                Value::List(vec![
                    Value::object([("d", Value::Float(1.5))]),
                    Value::object([("d", Value::from("x"))]),
                    Value::Int(3),
                ]),
            )]),
        )]);
        assert_eq!(
            run(&schema, data),
            vec!["a.b.1.d: 'x' is not a num.", "a.b.2: '3' is not a map."]
        );
    }

    #[test]
    fn test_cyclic_include_terminates() {
        let document = Value::object([("node", Value::from("include('node')"))]);
        let includes = Value::object([(
            "node",
            Value::object([
                ("value", Value::from("int()")),
                ("next", Value::from("include('node', required=False)")),
            ]),
        )]);
        let schema = SchemaCompiler::new()
            .compile_documents(&[document, includes])
            .unwrap();

        let leaf = Value::object([("value", Value::from("bad"))]);
        let middle = Value::object([("value", Value::Int(2)), ("next", leaf)]);
        let data = Value::object([(
            "node",
            Value::object([("value", Value::Int(1)), ("next", middle)]),
        )]);
        assert_eq!(
            run(&schema, data),
            vec!["node.next.next.value: 'bad' is not a int."]
        );
    }

    #[test]
    fn test_any_and_map_values() {
        let schema = schema(&[
            ("id", "any(int(), regex('^[a-z]+$', name='slug'))"),
            ("labels", "map(str(), num())"),
        ]);

        let good = Value::object([
            ("id", Value::from("abc")),
            (
                "labels",
                Value::object([("x", Value::from("y")), ("n", Value::Int(1))]),
            ),
        ]);
        assert!(run(&schema, good).is_empty());

        let bad = Value::object([
            ("id", Value::from("ABC")),
            ("labels", Value::object([("x", Value::Bool(false))])),
        ]);
        assert_eq!(
            run(&schema, bad),
            vec![
                "id: 'ABC' does not match any of: 'ABC' is not a int.; 'ABC' is not a slug.",
                "labels.x: 'false' does not match any of: \
                 'false' is not a str.; 'false' is not a num.",
            ]
        );
    }

    #[test]
    fn test_root_must_be_mapping() {
        let schema = schema(&[("a", "str()")]);
        assert_eq!(run(&schema, Value::List(vec![])), vec!["'[]' is not a map."]);
    }

    #[test]
    fn test_validate_or_raise() {
        let schema = schema(&[("a", "str()"), ("b", "int()")]);
        let data = Value::object([("a", Value::Int(1))]);
        let err = validate_or_raise(&schema, &data, &ValidationConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "a: '1' is not a str.\nb: Required field missing"
        );

        let ok = Value::object([("a", Value::from("x")), ("b", Value::Int(2))]);
        assert!(validate_or_raise(&schema, &ok, &ValidationConfig::default()).is_ok());
    }
}
