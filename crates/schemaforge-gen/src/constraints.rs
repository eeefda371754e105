//! # Constraint Mapper
//!
//! Translates the validation constraints of one property into schema
//! keywords, according to the shape of the property's value.
//!
//! ## Conflict Policy
//!
//! When two constraints land on the same bound keyword the tighter bound
//! wins: the larger lower bound and the smaller upper bound. A bound is
//! never widened. Two constraints of the same kind on one keyword are
//! reported as `ConstraintConflict`; different kinds meeting on a keyword
//! (`not_blank` and `size { min: 3 }`) tighten silently. Patterns and
//! constants cannot be tightened, so the first declaration is kept and any
//! later one is reported.
//!
//! Unknown kinds and kinds that do not apply to the value's shape are
//! ignored with a diagnostic. Neither stops generation.

use std::cmp::Ordering;

use schemaforge_core::{ConstraintDescriptor, DiagnosticKind, Shape, MAX_DIGITS};
use serde_json::{Number, Value};

use crate::diagnostics::DiagnosticSink;
use crate::node::Keywords;

/// `format` value for e-mail constraints.
pub const EMAIL_FORMAT: &str = "idn-email";

/// Keywords produced for one property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedConstraints {
    pub keywords: Keywords,
    /// A `null` constraint was declared: the value must be `null`.
    pub null_only: bool,
}

/// Maps [`ConstraintDescriptor`]s to [`Keywords`].
#[derive(Debug, Clone, Copy)]
pub struct ConstraintMapper<'a> {
    diagnostics: &'a DiagnosticSink,
}

#[derive(Clone, Copy)]
enum Bound {
    Lower,
    Upper,
}

/// Which constraint kinds already set which keyword, for conflict reports.
struct Sources<'s> {
    seen: Vec<(&'static str, String)>,
    location: &'s str,
    diagnostics: &'s DiagnosticSink,
}

impl Sources<'_> {
    fn note(&mut self, keyword: &'static str, kind: &str) {
        if self.seen.iter().any(|(k, by)| *k == keyword && by == kind) {
            self.diagnostics.record(
                DiagnosticKind::ConstraintConflict,
                self.location,
                format!("'{kind}' declared more than once for '{keyword}'; the tighter bound is kept"),
            );
        } else {
            self.seen.push((keyword, kind.to_string()));
        }
    }

    fn conflict(&self, keyword: &str, kind: &str) {
        self.diagnostics.record(
            DiagnosticKind::ConstraintConflict,
            self.location,
            format!("'{kind}' sets '{keyword}' again; the first declaration is kept"),
        );
    }
}

impl<'a> ConstraintMapper<'a> {
    pub fn new(diagnostics: &'a DiagnosticSink) -> Self {
        Self { diagnostics }
    }

    /// Map the constraints declared at `location` on a value of `shape`.
    pub fn map(&self, location: &str, shape: Shape, constraints: &[ConstraintDescriptor]) -> MappedConstraints {
        let mut mapped = MappedConstraints::default();
        let mut sources = Sources {
            seen: Vec::new(),
            location,
            diagnostics: self.diagnostics,
        };
        for constraint in constraints {
            let applied = self.apply(&mut mapped, &mut sources, shape, constraint);
            if !applied {
                self.diagnostics.record(
                    DiagnosticKind::InapplicableConstraint,
                    location,
                    format!("'{}' does not apply to {} values", constraint.kind_name(), shape_label(shape)),
                );
            }
        }
        mapped
    }

    /// Returns `false` when the constraint does not apply to `shape`.
    fn apply(
        &self,
        mapped: &mut MappedConstraints,
        sources: &mut Sources<'_>,
        shape: Shape,
        constraint: &ConstraintDescriptor,
    ) -> bool {
        let kind = constraint.kind_name();
        let k = &mut mapped.keywords;
        match constraint {
            ConstraintDescriptor::NotNull => {}
            ConstraintDescriptor::Null => mapped.null_only = true,
            ConstraintDescriptor::Unknown { name } => {
                self.diagnostics.record(
                    DiagnosticKind::UnknownConstraint,
                    sources.location,
                    format!("constraint '{name}' has no schema mapping"),
                );
            }
            ConstraintDescriptor::NotBlank => match shape {
                Shape::String => count(sources, "minLength", kind, &mut k.min_length, 1, Bound::Lower),
                _ => return false,
            },
            ConstraintDescriptor::NotEmpty => match shape {
                Shape::String => count(sources, "minLength", kind, &mut k.min_length, 1, Bound::Lower),
                Shape::Array => count(sources, "minItems", kind, &mut k.min_items, 1, Bound::Lower),
                Shape::Map => count(sources, "minProperties", kind, &mut k.min_properties, 1, Bound::Lower),
                _ => return false,
            },
            ConstraintDescriptor::Size { min, max } => {
                let (min_slot, max_slot, names) = match shape {
                    Shape::String => (&mut k.min_length, &mut k.max_length, ("minLength", "maxLength")),
                    Shape::Array => (&mut k.min_items, &mut k.max_items, ("minItems", "maxItems")),
                    Shape::Map => (
                        &mut k.min_properties,
                        &mut k.max_properties,
                        ("minProperties", "maxProperties"),
                    ),
                    _ => return false,
                };
                if let Some(min) = min {
                    count(sources, names.0, kind, min_slot, *min, Bound::Lower);
                }
                if let Some(max) = max {
                    count(sources, names.1, kind, max_slot, *max, Bound::Upper);
                }
            }
            ConstraintDescriptor::Min(value) if shape.is_numeric() => {
                number(sources, "minimum", kind, &mut k.minimum, Number::from(*value), Bound::Lower);
            }
            ConstraintDescriptor::Max(value) if shape.is_numeric() => {
                number(sources, "maximum", kind, &mut k.maximum, Number::from(*value), Bound::Upper);
            }
            ConstraintDescriptor::DecimalMin { value, inclusive } if shape.is_numeric() => {
                let (keyword, slot) = if *inclusive {
                    ("minimum", &mut k.minimum)
                } else {
                    ("exclusiveMinimum", &mut k.exclusive_minimum)
                };
                number(sources, keyword, kind, slot, value.clone(), Bound::Lower);
            }
            ConstraintDescriptor::DecimalMax { value, inclusive } if shape.is_numeric() => {
                let (keyword, slot) = if *inclusive {
                    ("maximum", &mut k.maximum)
                } else {
                    ("exclusiveMaximum", &mut k.exclusive_maximum)
                };
                number(sources, keyword, kind, slot, value.clone(), Bound::Upper);
            }
            ConstraintDescriptor::Positive if shape.is_numeric() => {
                number(sources, "exclusiveMinimum", kind, &mut k.exclusive_minimum, zero(), Bound::Lower);
            }
            ConstraintDescriptor::PositiveOrZero if shape.is_numeric() => {
                number(sources, "minimum", kind, &mut k.minimum, zero(), Bound::Lower);
            }
            ConstraintDescriptor::Negative if shape.is_numeric() => {
                number(sources, "exclusiveMaximum", kind, &mut k.exclusive_maximum, zero(), Bound::Upper);
            }
            ConstraintDescriptor::NegativeOrZero if shape.is_numeric() => {
                number(sources, "maximum", kind, &mut k.maximum, zero(), Bound::Upper);
            }
            ConstraintDescriptor::Digits { integer, fraction } if shape.is_numeric() => {
                if *integer > MAX_DIGITS || *fraction > MAX_DIGITS {
                    return false;
                }
                let Some(limit) = power_of_ten(*integer) else {
                    return false;
                };
                let negated = negate(&limit);
                number(sources, "exclusiveMaximum", kind, &mut k.exclusive_maximum, limit, Bound::Upper);
                if let Some(negated) = negated {
                    number(sources, "exclusiveMinimum", kind, &mut k.exclusive_minimum, negated, Bound::Lower);
                }
                if *fraction > 0 {
                    if k.multiple_of.is_some() {
                        sources.conflict("multipleOf", kind);
                    } else {
                        k.multiple_of = fraction_step(*fraction);
                    }
                }
            }
            ConstraintDescriptor::Pattern { regexp } => match shape {
                Shape::String => pattern(sources, kind, &mut k.pattern, regexp),
                _ => return false,
            },
            ConstraintDescriptor::Email { regexp } => match shape {
                Shape::String => {
                    k.format = Some(EMAIL_FORMAT.to_string());
                    if let Some(regexp) = regexp {
                        pattern(sources, kind, &mut k.pattern, regexp);
                    }
                }
                _ => return false,
            },
            ConstraintDescriptor::AssertTrue | ConstraintDescriptor::AssertFalse => match shape {
                Shape::Boolean => {
                    let value = matches!(constraint, ConstraintDescriptor::AssertTrue);
                    if k.const_value.is_some() {
                        sources.conflict("const", kind);
                    } else {
                        k.const_value = Some(Value::Bool(value));
                    }
                }
                _ => return false,
            },
            // Numeric kinds on non-numeric shapes.
            _ => return false,
        }
        true
    }
}

fn count(sources: &mut Sources<'_>, keyword: &'static str, kind: &str, slot: &mut Option<u64>, value: u64, bound: Bound) {
    sources.note(keyword, kind);
    tighten(slot, value, bound, u64::cmp);
}

fn number(sources: &mut Sources<'_>, keyword: &'static str, kind: &str, slot: &mut Option<Number>, value: Number, bound: Bound) {
    sources.note(keyword, kind);
    tighten(slot, value, bound, compare_numbers);
}

fn pattern(sources: &mut Sources<'_>, kind: &str, slot: &mut Option<String>, regexp: &str) {
    match slot {
        None => *slot = Some(regexp.to_string()),
        Some(existing) if existing == regexp => {}
        Some(_) => sources.conflict("pattern", kind),
    }
}

fn tighten<T>(slot: &mut Option<T>, value: T, bound: Bound, cmp: impl Fn(&T, &T) -> Ordering) {
    let replace = match slot.as_ref() {
        None => true,
        Some(current) => match bound {
            Bound::Lower => cmp(&value, current) == Ordering::Greater,
            Bound::Upper => cmp(&value, current) == Ordering::Less,
        },
    };
    if replace {
        *slot = Some(value);
    }
}

/// Numeric order across integer and floating-point representations.
pub fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x.cmp(&y);
    }
    let x = a.as_f64().unwrap_or(f64::NAN);
    let y = b.as_f64().unwrap_or(f64::NAN);
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

fn zero() -> Number {
    Number::from(0)
}

/// `10^exponent`, exact while it fits a `u64`.
fn power_of_ten(exponent: u32) -> Option<Number> {
    match 10u64.checked_pow(exponent) {
        Some(value) => Some(Number::from(value)),
        None => serde_json::from_str(&format!("1e{exponent}")).ok(),
    }
}

fn negate(value: &Number) -> Option<Number> {
    match value.as_i64() {
        Some(v) => v.checked_neg().map(Number::from),
        None => value.as_f64().and_then(|v| Number::from_f64(-v)),
    }
}

/// `10^-fraction` as the nearest double.
fn fraction_step(fraction: u32) -> Option<Number> {
    serde_json::from_str(&format!("1e-{fraction}")).ok()
}

fn shape_label(shape: Shape) -> &'static str {
    match shape {
        Shape::String => "string",
        Shape::Integer => "integer",
        Shape::Number => "number",
        Shape::Boolean => "boolean",
        Shape::Array => "array",
        Shape::Map => "map",
        Shape::Nominal => "object",
        Shape::Any => "untyped",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map(shape: Shape, constraints: &[ConstraintDescriptor]) -> (MappedConstraints, DiagnosticSink) {
        let sink = DiagnosticSink::new();
        let mapped = ConstraintMapper::new(&sink).map("T.p", shape, constraints);
        (mapped, sink)
    }

    #[test]
    fn test_not_blank_on_string() {
        let (mapped, sink) = map(Shape::String, &[ConstraintDescriptor::NotBlank]);
        assert_eq!(mapped.keywords.min_length, Some(1));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_positive_or_zero_sets_minimum() {
        let (mapped, _) = map(Shape::Integer, &[ConstraintDescriptor::PositiveOrZero]);
        assert_eq!(mapped.keywords.minimum, Some(Number::from(0)));
    }

    #[test]
    fn test_same_kind_takes_tighter_bound_with_diagnostic() {
        let (mapped, sink) = map(
            Shape::Integer,
            &[ConstraintDescriptor::Min(0), ConstraintDescriptor::Min(5)],
        );
        assert_eq!(mapped.keywords.minimum, Some(Number::from(5)));
        let diagnostics = sink.snapshot();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::ConstraintConflict);

        let (mapped, _) = map(
            Shape::Integer,
            &[ConstraintDescriptor::Max(10), ConstraintDescriptor::Max(3), ConstraintDescriptor::Max(7)],
        );
        assert_eq!(mapped.keywords.maximum, Some(Number::from(3)));
    }

    #[test]
    fn test_different_kinds_tighten_silently() {
        let (mapped, sink) = map(
            Shape::String,
            &[
                ConstraintDescriptor::NotBlank,
                ConstraintDescriptor::Size { min: Some(3), max: None },
            ],
        );
        assert_eq!(mapped.keywords.min_length, Some(3));
        assert!(sink.is_empty());

        let (mapped, sink) = map(
            Shape::Integer,
            &[ConstraintDescriptor::Min(5), ConstraintDescriptor::PositiveOrZero],
        );
        assert_eq!(mapped.keywords.minimum, Some(Number::from(5)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_size_by_shape() {
        let size = [ConstraintDescriptor::Size { min: Some(1), max: Some(4) }];
        let (string, _) = map(Shape::String, &size);
        assert_eq!((string.keywords.min_length, string.keywords.max_length), (Some(1), Some(4)));
        let (array, _) = map(Shape::Array, &size);
        assert_eq!((array.keywords.min_items, array.keywords.max_items), (Some(1), Some(4)));
        let (object, _) = map(Shape::Map, &size);
        assert_eq!(
            (object.keywords.min_properties, object.keywords.max_properties),
            (Some(1), Some(4))
        );
    }

    #[test]
    fn test_decimal_bounds_respect_inclusive_flag() {
        let (mapped, _) = map(
            Shape::Number,
            &[
                ConstraintDescriptor::DecimalMin {
                    value: Number::from(10),
                    inclusive: false,
                },
                ConstraintDescriptor::DecimalMax {
                    value: Number::from_f64(99.5).unwrap(),
                    inclusive: true,
                },
            ],
        );
        assert_eq!(mapped.keywords.exclusive_minimum, Some(Number::from(10)));
        assert_eq!(mapped.keywords.maximum, Number::from_f64(99.5));
        assert!(mapped.keywords.minimum.is_none());
    }

    #[test]
    fn test_digits() {
        let (mapped, _) = map(Shape::Number, &[ConstraintDescriptor::Digits { integer: 3, fraction: 2 }]);
        assert_eq!(mapped.keywords.exclusive_maximum, Some(Number::from(1000)));
        assert_eq!(mapped.keywords.exclusive_minimum, Some(Number::from(-1000)));
        assert_eq!(mapped.keywords.multiple_of, Number::from_f64(0.01));

        let (whole, _) = map(Shape::Integer, &[ConstraintDescriptor::Digits { integer: 2, fraction: 0 }]);
        assert!(whole.keywords.multiple_of.is_none());
    }

    #[test]
    fn test_digits_at_the_limits() {
        let (mapped, sink) = map(
            Shape::Number,
            &[ConstraintDescriptor::Digits {
                integer: MAX_DIGITS,
                fraction: MAX_DIGITS,
            }],
        );
        assert!(sink.snapshot().is_empty());
        assert_eq!(mapped.keywords.exclusive_maximum, Number::from_f64(1e308));
        assert_eq!(mapped.keywords.exclusive_minimum, Number::from_f64(-1e308));
        let step = mapped.keywords.multiple_of.and_then(|n| n.as_f64()).unwrap();
        assert!(step > 0.0);

        let (wide, _) = map(Shape::Integer, &[ConstraintDescriptor::Digits { integer: 19, fraction: 0 }]);
        assert_eq!(wide.keywords.exclusive_maximum, Some(Number::from(10_000_000_000_000_000_000u64)));
        assert_eq!(wide.keywords.exclusive_minimum, Number::from_f64(-1e19));
    }

    #[test]
    fn test_digits_out_of_range_is_inapplicable() {
        for (integer, fraction) in [(400, 2), (3, 400), (3_000_000_000, 0)] {
            let (mapped, sink) = map(Shape::Number, &[ConstraintDescriptor::Digits { integer, fraction }]);
            assert!(mapped.keywords.exclusive_maximum.is_none());
            assert!(mapped.keywords.multiple_of.is_none());
            let kinds: Vec<_> = sink.snapshot().into_iter().map(|d| d.kind).collect();
            assert_eq!(kinds, vec![DiagnosticKind::InapplicableConstraint]);
        }
    }

    #[test]
    fn test_first_pattern_kept() {
        let (mapped, sink) = map(
            Shape::String,
            &[
                ConstraintDescriptor::Pattern { regexp: "^a".into() },
                ConstraintDescriptor::Pattern { regexp: "^b".into() },
            ],
        );
        assert_eq!(mapped.keywords.pattern.as_deref(), Some("^a"));
        assert_eq!(sink.snapshot()[0].kind, DiagnosticKind::ConstraintConflict);
    }

    #[test]
    fn test_email_sets_format_and_pattern() {
        let (mapped, _) = map(
            Shape::String,
            &[ConstraintDescriptor::Email {
                regexp: Some(".+@example\\.com".into()),
            }],
        );
        assert_eq!(mapped.keywords.format.as_deref(), Some("idn-email"));
        assert_eq!(mapped.keywords.pattern.as_deref(), Some(".+@example\\.com"));
    }

    #[test]
    fn test_assert_true_sets_const() {
        let (mapped, _) = map(Shape::Boolean, &[ConstraintDescriptor::AssertTrue]);
        assert_eq!(mapped.keywords.const_value, Some(Value::Bool(true)));
    }

    #[test]
    fn test_null_constraint_marks_null_only() {
        let (mapped, _) = map(Shape::String, &[ConstraintDescriptor::Null]);
        assert!(mapped.null_only);
    }

    #[test]
    fn test_unknown_and_inapplicable_are_no_ops() {
        let (mapped, sink) = map(
            Shape::Integer,
            &[
                ConstraintDescriptor::Unknown { name: "future".into() },
                ConstraintDescriptor::Pattern { regexp: "^a".into() },
                ConstraintDescriptor::NotBlank,
            ],
        );
        assert!(mapped.keywords.is_empty());
        let kinds: Vec<DiagnosticKind> = sink.snapshot().into_iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::UnknownConstraint,
                DiagnosticKind::InapplicableConstraint,
                DiagnosticKind::InapplicableConstraint,
            ]
        );
    }

    #[test]
    fn test_compare_numbers_mixed_representations() {
        assert_eq!(compare_numbers(&Number::from(5), &Number::from(-5)), Ordering::Greater);
        assert_eq!(
            compare_numbers(&Number::from(1), &Number::from_f64(1.5).unwrap()),
            Ordering::Less
        );
        assert_eq!(compare_numbers(&Number::from(u64::MAX), &Number::from(-1)), Ordering::Greater);
    }

    proptest! {
        #[test]
        fn prop_lower_bounds_never_widen(values in proptest::collection::vec(-1000i64..1000, 1..8)) {
            let constraints: Vec<ConstraintDescriptor> =
                values.iter().map(|v| ConstraintDescriptor::Min(*v)).collect();
            let (mapped, _) = map(Shape::Integer, &constraints);
            let expected = values.iter().max().copied().map(Number::from);
            prop_assert_eq!(mapped.keywords.minimum, expected);
        }

        #[test]
        fn prop_upper_bounds_never_widen(values in proptest::collection::vec(0u64..1000, 1..8)) {
            let constraints: Vec<ConstraintDescriptor> = values
                .iter()
                .map(|v| ConstraintDescriptor::Size { min: None, max: Some(*v) })
                .collect();
            let (mapped, _) = map(Shape::Array, &constraints);
            prop_assert_eq!(mapped.keywords.max_items, values.iter().min().copied());
        }
    }
}
