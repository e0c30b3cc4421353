//! Schema Validator: checks call arguments before anything reaches the network.
//!
//! Checks run in a fixed order and the first failure wins: required fields,
//! then declared types, then length, range, and enum constraints (parameter
//! schema first, tool validation rules second). Unknown fields are ignored.
//!
//! ```rust
//! use mconfig::{ParamType, ParameterSchema, ParametersSchema};
//! use mtooling::{ResponseShape, SchemaValidator, ToolDefinition, ValidationReason};
//! use serde_json::json;
//!
//! let mut query = ParameterSchema::new(ParamType::String);
//! query.max_length = Some(8);
//! let mut parameters = ParametersSchema::default();
//! parameters.properties.insert("query".to_string(), query);
//!
//! let shape = ResponseShape::parse("result").expect("path");
//! let definition = ToolDefinition::new("search", shape).with_parameters(parameters);
//!
//! let error = SchemaValidator
//!     .validate(&definition, &json!({"query": "far too long"}))
//!     .expect_err("too long");
//! assert_eq!(error.field, "query");
//! assert_eq!(error.reason, ValidationReason::MaxLength);
//! ```

use std::fmt::{Display, Formatter};

use mconfig::{FieldRule, ParamType, ParameterSchema};
use serde_json::{Map, Value};

use crate::{ToolDefinition, ToolError};

/// Field name used when the arguments as a whole are rejected.
pub const ROOT_FIELD: &str = "$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationReason {
    NotAnObject,
    Required,
    TypeMismatch(ParamType),
    MaxLength,
    MinLength,
    Minimum,
    Maximum,
    NotAllowed,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAnObject => "not_an_object",
            Self::Required => "required",
            Self::TypeMismatch(_) => "type_mismatch",
            Self::MaxLength => "max_length",
            Self::MinLength => "min_length",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::NotAllowed => "not_allowed",
        }
    }
}

/// Names the field and the broken constraint, never the offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: ValidationReason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            ValidationReason::TypeMismatch(expected) => write!(
                f,
                "field '{}' failed {}: expected {}",
                self.field,
                self.reason.as_str(),
                expected.as_str()
            ),
            _ => write!(f, "field '{}' failed {}", self.field, self.reason.as_str()),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for ToolError {
    fn from(value: ValidationError) -> Self {
        ToolError::validation(value.field.clone(), value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn validate(
        &self,
        definition: &ToolDefinition,
        arguments: &Value,
    ) -> Result<(), ValidationError> {
        let Value::Object(arguments) = arguments else {
            return Err(ValidationError::new(ROOT_FIELD, ValidationReason::NotAnObject));
        };
        let declared = &definition.parameters.properties;

        let required = definition
            .parameters
            .required
            .iter()
            .chain(&definition.rule.required_fields);
        for field in required {
            if present(arguments, field).is_none() {
                return Err(ValidationError::new(field, ValidationReason::Required));
            }
        }

        for (field, schema) in declared {
            if let Some(value) = present(arguments, field)
                && !matches_type(schema.kind, value)
            {
                return Err(ValidationError::new(
                    field,
                    ValidationReason::TypeMismatch(schema.kind),
                ));
            }
        }

        for (field, schema) in declared {
            if let Some(value) = present(arguments, field) {
                check_parameter(schema, value)
                    .map_err(|reason| ValidationError::new(field, reason))?;
            }
        }

        for (field, rule) in &definition.rule.fields {
            if let Some(value) = present(arguments, field) {
                check_rule(rule, value).map_err(|reason| ValidationError::new(field, reason))?;
            }
        }

        Ok(())
    }

    /// Fills declared defaults for absent optional fields. Non-object
    /// arguments are left untouched for `validate` to reject.
    pub fn apply_defaults(&self, definition: &ToolDefinition, arguments: &mut Value) {
        let Value::Object(arguments) = arguments else {
            return;
        };

        for (field, schema) in &definition.parameters.properties {
            if let Some(default) = &schema.default
                && present(arguments, field).is_none()
            {
                arguments.insert(field.clone(), default.clone());
            }
        }
    }

    /// Defaults first, then validation; the arguments that may be dispatched.
    pub fn prepare(
        &self,
        definition: &ToolDefinition,
        mut arguments: Value,
    ) -> Result<Value, ValidationError> {
        self.apply_defaults(definition, &mut arguments);
        self.validate(definition, &arguments)?;
        Ok(arguments)
    }
}

/// An explicit `null` counts as absent.
fn present<'a>(arguments: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    arguments.get(field).filter(|value| !value.is_null())
}

fn matches_type(kind: ParamType, value: &Value) -> bool {
    match kind {
        ParamType::String => value.is_string(),
        ParamType::Integer => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|number| number.fract() == 0.0)
        }
        ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::Array => value.is_array(),
        ParamType::Object => value.is_object(),
    }
}

fn check_parameter(schema: &ParameterSchema, value: &Value) -> Result<(), ValidationReason> {
    check_constraints(
        value,
        Constraints {
            max_length: schema.max_length,
            min_length: schema.min_length,
            minimum: schema.minimum,
            maximum: schema.maximum,
            allowed: schema.allowed_values.as_deref(),
        },
    )
}

fn check_rule(rule: &FieldRule, value: &Value) -> Result<(), ValidationReason> {
    check_constraints(
        value,
        Constraints {
            max_length: rule.max_length,
            min_length: None,
            minimum: rule.min,
            maximum: rule.max,
            allowed: rule.allowed_values.as_deref(),
        },
    )
}

struct Constraints<'a> {
    max_length: Option<usize>,
    min_length: Option<usize>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    allowed: Option<&'a [Value]>,
}

fn check_constraints(value: &Value, constraints: Constraints<'_>) -> Result<(), ValidationReason> {
    if let Some(text) = value.as_str() {
        let length = text.chars().count();
        if constraints.max_length.is_some_and(|max| length > max) {
            return Err(ValidationReason::MaxLength);
        }
        if constraints.min_length.is_some_and(|min| length < min) {
            return Err(ValidationReason::MinLength);
        }
    }

    if let Some(number) = value.as_f64() {
        if constraints.minimum.is_some_and(|min| number < min) {
            return Err(ValidationReason::Minimum);
        }
        if constraints.maximum.is_some_and(|max| number > max) {
            return Err(ValidationReason::Maximum);
        }
    }

    if let Some(allowed) = constraints.allowed
        && !allowed.iter().any(|candidate| same_value(candidate, value))
    {
        return Err(ValidationReason::NotAllowed);
    }

    Ok(())
}

/// Equality that treats `1` and `1.0` as the same number.
fn same_value(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use mconfig::{FieldRule, ParametersSchema};
    use serde_json::json;

    use super::*;
    use crate::{ResponseShape, ToolErrorKind, ValidationRule};

    fn definition() -> ToolDefinition {
        let mut max_results = ParameterSchema::new(ParamType::Integer);
        max_results.minimum = Some(1.0);
        max_results.maximum = Some(10.0);
        max_results.default = Some(json!(5));

        let mut category = ParameterSchema::new(ParamType::String);
        category.allowed_values = Some(vec![json!("policy"), json!("faq")]);

        let mut parameters = ParametersSchema::default();
        parameters
            .properties
            .insert("query".to_string(), ParameterSchema::new(ParamType::String));
        parameters
            .properties
            .insert("max_results".to_string(), max_results);
        parameters.properties.insert("category".to_string(), category);
        parameters.required = vec!["query".to_string()];

        let mut rule = ValidationRule::default();
        rule.fields.insert(
            "query".to_string(),
            FieldRule {
                max_length: Some(500),
                ..FieldRule::default()
            },
        );

        ToolDefinition::new("secure_search", ResponseShape::parse("result").expect("path"))
            .with_parameters(parameters)
            .with_rule(rule)
    }

    fn reject(arguments: Value) -> ValidationError {
        SchemaValidator
            .validate(&definition(), &arguments)
            .expect_err("arguments should be rejected")
    }

    #[test]
    fn oversized_query_fails_max_length_without_echoing_it() {
        let query = "x".repeat(600);
        let error = reject(json!({ "query": query }));

        assert_eq!(error.field, "query");
        assert_eq!(error.reason, ValidationReason::MaxLength);

        let surfaced: ToolError = error.into();
        assert_eq!(surfaced.kind, ToolErrorKind::Validation);
        assert_eq!(surfaced.field.as_deref(), Some("query"));
        assert!(!surfaced.message.contains("xxxx"));
    }

    #[test]
    fn missing_required_field_is_reported_before_type_errors() {
        let error = reject(json!({"max_results": "ten"}));
        assert_eq!(error.field, "query");
        assert_eq!(error.reason, ValidationReason::Required);
    }

    #[test]
    fn type_errors_are_reported_before_range_errors() {
        let error = reject(json!({"query": 7, "max_results": 99}));
        assert_eq!(error.field, "query");
        assert_eq!(error.reason, ValidationReason::TypeMismatch(ParamType::String));
    }

    #[test]
    fn integers_reject_fractions() {
        let error = reject(json!({"query": "q", "max_results": 2.5}));
        assert_eq!(error.reason, ValidationReason::TypeMismatch(ParamType::Integer));

        assert!(
            SchemaValidator
                .validate(&definition(), &json!({"query": "q", "max_results": 2.0}))
                .is_ok()
        );
    }

    #[test]
    fn range_and_enum_constraints_apply() {
        assert_eq!(
            reject(json!({"query": "q", "max_results": 0})).reason,
            ValidationReason::Minimum
        );
        assert_eq!(
            reject(json!({"query": "q", "max_results": 11})).reason,
            ValidationReason::Maximum
        );
        assert_eq!(
            reject(json!({"query": "q", "category": "sales"})).reason,
            ValidationReason::NotAllowed
        );
    }

    #[test]
    fn unknown_fields_and_nulls_are_ignored() {
        assert!(
            SchemaValidator
                .validate(
                    &definition(),
                    &json!({"query": "q", "category": null, "extra": {"nested": true}})
                )
                .is_ok()
        );
    }

    #[test]
    fn non_object_arguments_are_rejected_at_the_root() {
        let error = reject(json!(["query"]));
        assert_eq!(error.field, ROOT_FIELD);
        assert_eq!(error.reason, ValidationReason::NotAnObject);
    }

    #[test]
    fn prepare_fills_defaults_before_validating() {
        let prepared = SchemaValidator
            .prepare(&definition(), json!({"query": "q"}))
            .expect("valid arguments");
        assert_eq!(prepared, json!({"query": "q", "max_results": 5}));
    }
}
