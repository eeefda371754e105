//! # Constraint Descriptors
//!
//! Validation constraints attached to properties. In declaration files a
//! constraint is either a bare kind name or a single-key map carrying the
//! kind's parameters:
//!
//! ```yaml
//! constraints:
//!   - not_blank
//!   - min: 10
//!   - size: { min: 2, max: 10 }
//!   - decimal_min: { value: "10", inclusive: false }
//!   - pattern: "^[a-z]+$"
//! ```
//!
//! Kind names the generator does not know are kept as
//! [`ConstraintDescriptor::Unknown`] so they can be reported instead of
//! failing the build.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Number, Value};

use crate::error::ModelError;

/// Largest digit count `digits` accepts; `10^308` is still a finite double.
pub const MAX_DIGITS: u32 = 308;

/// A single validation constraint with its parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawConstraint")]
pub enum ConstraintDescriptor {
    /// String must contain a non-whitespace character.
    NotBlank,
    /// String, collection, or map must not be empty.
    NotEmpty,
    /// Value must not be null.
    NotNull,
    /// Value must be null.
    Null,
    /// Length or element count bounds.
    Size { min: Option<u64>, max: Option<u64> },
    /// Inclusive integer lower bound.
    Min(i64),
    /// Inclusive integer upper bound.
    Max(i64),
    /// Decimal lower bound.
    DecimalMin { value: Number, inclusive: bool },
    /// Decimal upper bound.
    DecimalMax { value: Number, inclusive: bool },
    Positive,
    PositiveOrZero,
    Negative,
    NegativeOrZero,
    /// Regular expression the string must match.
    Pattern { regexp: String },
    /// E-mail address, optionally restricted by a regular expression.
    Email { regexp: Option<String> },
    /// Maximum digits in the integer and fraction parts, each at most
    /// [`MAX_DIGITS`].
    Digits { integer: u32, fraction: u32 },
    AssertTrue,
    AssertFalse,
    /// A kind without a schema mapping.
    Unknown { name: String },
}

impl ConstraintDescriptor {
    /// The kind name as written in declarations.
    pub fn kind_name(&self) -> &str {
        match self {
            Self::NotBlank => "not_blank",
            Self::NotEmpty => "not_empty",
            Self::NotNull => "not_null",
            Self::Null => "null",
            Self::Size { .. } => "size",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::DecimalMin { .. } => "decimal_min",
            Self::DecimalMax { .. } => "decimal_max",
            Self::Positive => "positive",
            Self::PositiveOrZero => "positive_or_zero",
            Self::Negative => "negative",
            Self::NegativeOrZero => "negative_or_zero",
            Self::Pattern { .. } => "pattern",
            Self::Email { .. } => "email",
            Self::Digits { .. } => "digits",
            Self::AssertTrue => "assert_true",
            Self::AssertFalse => "assert_false",
            Self::Unknown { name } => name,
        }
    }
}

/// Declaration-file form of a constraint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawConstraint {
    Bare(String),
    Keyed(IndexMap<String, Value>),
}

impl TryFrom<RawConstraint> for ConstraintDescriptor {
    type Error = ModelError;

    fn try_from(raw: RawConstraint) -> Result<Self, Self::Error> {
        match raw {
            RawConstraint::Bare(kind) => parse_bare(&kind),
            RawConstraint::Keyed(map) => {
                if map.len() != 1 {
                    return Err(ModelError::InvalidConstraint {
                        kind: map.keys().cloned().collect::<Vec<_>>().join(", "),
                        reason: "a constraint map must have exactly one key".to_string(),
                    });
                }
                match map.into_iter().next() {
                    Some((kind, params)) => parse_keyed(&kind, params),
                    None => Err(invalid("", "empty constraint map")),
                }
            }
        }
    }
}

fn parse_bare(kind: &str) -> Result<ConstraintDescriptor, ModelError> {
    let constraint = match kind {
        "not_blank" => ConstraintDescriptor::NotBlank,
        "not_empty" => ConstraintDescriptor::NotEmpty,
        "not_null" => ConstraintDescriptor::NotNull,
        "null" => ConstraintDescriptor::Null,
        "positive" => ConstraintDescriptor::Positive,
        "positive_or_zero" => ConstraintDescriptor::PositiveOrZero,
        "negative" => ConstraintDescriptor::Negative,
        "negative_or_zero" => ConstraintDescriptor::NegativeOrZero,
        "email" => ConstraintDescriptor::Email { regexp: None },
        "assert_true" => ConstraintDescriptor::AssertTrue,
        "assert_false" => ConstraintDescriptor::AssertFalse,
        "size" | "min" | "max" | "decimal_min" | "decimal_max" | "pattern" | "digits" => {
            return Err(invalid(kind, "parameters are required"));
        }
        other => ConstraintDescriptor::Unknown {
            name: other.to_string(),
        },
    };
    Ok(constraint)
}

fn parse_keyed(kind: &str, params: Value) -> Result<ConstraintDescriptor, ModelError> {
    let constraint = match kind {
        "size" => ConstraintDescriptor::Size {
            min: optional_u64(kind, &params, "min")?,
            max: optional_u64(kind, &params, "max")?,
        },
        "min" => ConstraintDescriptor::Min(integer(kind, value_param(&params))?),
        "max" => ConstraintDescriptor::Max(integer(kind, value_param(&params))?),
        "decimal_min" => ConstraintDescriptor::DecimalMin {
            value: decimal(kind, value_param(&params))?,
            inclusive: inclusive(kind, &params)?,
        },
        "decimal_max" => ConstraintDescriptor::DecimalMax {
            value: decimal(kind, value_param(&params))?,
            inclusive: inclusive(kind, &params)?,
        },
        "pattern" => ConstraintDescriptor::Pattern {
            regexp: string_param(kind, &params, "regexp")?
                .ok_or_else(|| invalid(kind, "a regular expression is required"))?,
        },
        "email" => ConstraintDescriptor::Email {
            regexp: string_param(kind, &params, "regexp")?,
        },
        "digits" => ConstraintDescriptor::Digits {
            integer: digit_count(kind, &params, "integer")?,
            fraction: digit_count(kind, &params, "fraction")?,
        },
        other => match parse_bare(other)? {
            ConstraintDescriptor::Unknown { name } => ConstraintDescriptor::Unknown { name },
            unit if params.is_null() || params.as_object().is_some_and(|o| o.is_empty()) => unit,
            _ => return Err(invalid(other, "this constraint takes no parameters")),
        },
    };
    Ok(constraint)
}

fn invalid(kind: &str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidConstraint {
        kind: kind.to_string(),
        reason: reason.into(),
    }
}

/// `min: 5` and `min: { value: 5 }` are both accepted.
fn value_param(params: &Value) -> &Value {
    params.get("value").unwrap_or(params)
}

fn integer(kind: &str, value: &Value) -> Result<i64, ModelError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| invalid(kind, format!("expected an integer, found {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid(kind, format!("expected an integer, found '{s}'"))),
        other => Err(invalid(kind, format!("expected an integer, found {other}"))),
    }
}

fn decimal(kind: &str, value: &Value) -> Result<Number, ModelError> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        Value::String(s) => serde_json::from_str::<Number>(s.trim())
            .map_err(|_| invalid(kind, format!("expected a decimal number, found '{s}'"))),
        other => Err(invalid(kind, format!("expected a decimal number, found {other}"))),
    }
}

fn inclusive(kind: &str, params: &Value) -> Result<bool, ModelError> {
    match params.get("inclusive") {
        None => Ok(true),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(invalid(kind, format!("'inclusive' must be a boolean, found {other}"))),
    }
}

fn optional_u64(kind: &str, params: &Value, key: &str) -> Result<Option<u64>, ModelError> {
    if !params.is_object() {
        return Err(invalid(kind, format!("expected a map with '{key}'")));
    }
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(kind, format!("'{key}' must be a non-negative integer"))),
        Some(other) => Err(invalid(kind, format!("'{key}' must be a non-negative integer, found {other}"))),
    }
}

fn digit_count(kind: &str, params: &Value, key: &str) -> Result<u32, ModelError> {
    let count = optional_u64(kind, params, key)?.ok_or_else(|| invalid(kind, format!("'{key}' is required")))?;
    u32::try_from(count)
        .ok()
        .filter(|count| *count <= MAX_DIGITS)
        .ok_or_else(|| invalid(kind, format!("'{key}' must be at most {MAX_DIGITS}, found {count}")))
}

fn string_param(kind: &str, params: &Value, key: &str) -> Result<Option<String>, ModelError> {
    match params {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Null => Ok(None),
        Value::Object(map) => match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(invalid(kind, format!("'{key}' must be a string, found {other}"))),
        },
        other => Err(invalid(kind, format!("expected a string, found {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Vec<ConstraintDescriptor>, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    #[test]
    fn test_bare_and_keyed_forms() {
        let constraints = parse(
            r#"
- not_blank
- min: 10
- max: { value: 100 }
- size: { min: 2, max: 10 }
- pattern: "^[a-z]+$"
- digits: { integer: 3, fraction: 2 }
"#,
        )
        .unwrap();
        assert_eq!(
            constraints,
            vec![
                ConstraintDescriptor::NotBlank,
                ConstraintDescriptor::Min(10),
                ConstraintDescriptor::Max(100),
                ConstraintDescriptor::Size {
                    min: Some(2),
                    max: Some(10)
                },
                ConstraintDescriptor::Pattern {
                    regexp: "^[a-z]+$".to_string()
                },
                ConstraintDescriptor::Digits {
                    integer: 3,
                    fraction: 2
                },
            ]
        );
    }

    #[test]
    fn test_digits_out_of_range_rejected() {
        assert!(parse("- digits: { integer: 400, fraction: 2 }").is_err());
        assert!(parse("- digits: { integer: 3, fraction: 4000000000 }").is_err());
        assert!(parse("- digits: { integer: 3000000000, fraction: 0 }").is_err());
        assert_eq!(
            parse("- digits: { integer: 308, fraction: 308 }").unwrap(),
            vec![ConstraintDescriptor::Digits {
                integer: MAX_DIGITS,
                fraction: MAX_DIGITS
            }]
        );
    }

    #[test]
    fn test_decimal_bounds_accept_strings() {
        let constraints = parse(
            r#"
- decimal_min: { value: "10", inclusive: false }
- decimal_max: "100.5"
"#,
        )
        .unwrap();
        assert_eq!(
            constraints[0],
            ConstraintDescriptor::DecimalMin {
                value: Number::from(10),
                inclusive: false
            }
        );
        match &constraints[1] {
            ConstraintDescriptor::DecimalMax { value, inclusive } => {
                assert_eq!(value.as_f64(), Some(100.5));
                assert!(*inclusive);
            }
            other => panic!("unexpected constraint {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kinds_are_kept() {
        let constraints = parse("- future\n- past_or_present: {}\n").unwrap();
        assert_eq!(
            constraints,
            vec![
                ConstraintDescriptor::Unknown {
                    name: "future".to_string()
                },
                ConstraintDescriptor::Unknown {
                    name: "past_or_present".to_string()
                },
            ]
        );
        assert_eq!(constraints[0].kind_name(), "future");
    }

    #[test]
    fn test_missing_parameters_rejected() {
        assert!(parse("- min\n").is_err());
        assert!(parse("- pattern: {}\n").is_err());
        assert!(parse("- size: 3\n").is_err());
        assert!(parse("- min: ten\n").is_err());
        assert!(parse("- digits: { integer: 3 }\n").is_err());
        assert!(parse("- { min: 1, max: 2 }\n").is_err());
        assert!(parse("- not_blank: { strict: true }\n").is_err());
    }

    #[test]
    fn test_email_with_and_without_regexp() {
        let constraints = parse("- email\n- email: { regexp: \".+@example\\\\.com\" }\n").unwrap();
        assert_eq!(constraints[0], ConstraintDescriptor::Email { regexp: None });
        assert_eq!(
            constraints[1],
            ConstraintDescriptor::Email {
                regexp: Some(".+@example\\.com".to_string())
            }
        );
    }
}
