/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Evaluation of compiled expressions against one file's metadata.
//!
//! Evaluation holds no shared state: the metadata is threaded through as an argument,
//! so any number of dispatchers and workers can match concurrently.

use crate::error::{ExchangeError, Result};
use crate::matching::expression::{Expression, Operator, Value, ValueType};
use crate::metadata::{Metadata, Source};
use crate::observability::events;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use regex::Regex;
use std::cmp::Ordering;
use tracing::warn;

const COMPONENT: &str = "matcher";

const WHAT_SOURCE_PREFIX: &str = "what/source:";
const RESOLVED_SOURCE_PREFIXES: [&str; 2] = ["_bdb/source:", "_baltrad/source:"];
const SOURCE_NAME_PREFIXES: [&str; 2] = ["_bdb/source_name", "_baltrad/source_name"];

/// Returns whether `metadata` satisfies `expression`.
///
/// Evaluation errors (bad arithmetic, malformed constructor arguments) are logged and
/// treated as "no match".
pub fn matches(metadata: &Metadata, expression: &Expression) -> bool {
    match evaluate(metadata, expression) {
        Ok(value) => value.truthy(),
        Err(err) => {
            warn!(
                event = events::FILTER_EVALUATION_FAILED,
                component = COMPONENT,
                expression = %expression,
                err = %err,
                "filter evaluation failed; treating as no match"
            );
            false
        }
    }
}

/// Evaluates `expression` to a value.
pub fn evaluate(metadata: &Metadata, expression: &Expression) -> Result<Value> {
    match expression {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Attr { name, value_type } => {
            Ok(resolve_attribute(metadata, name, *value_type))
        }
        Expression::Call { operator, operands } => call(metadata, *operator, operands),
    }
}

fn call(metadata: &Metadata, operator: Operator, operands: &[Expression]) -> Result<Value> {
    match operator {
        Operator::And => {
            for operand in operands {
                if !evaluate(metadata, operand)?.truthy() {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Operator::Or => {
            for operand in operands {
                if evaluate(metadata, operand)?.truthy() {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Operator::Not => {
            let [operand] = operands else {
                return Err(arity(operator, "exactly 1", operands.len()));
            };
            Ok(Value::Bool(!evaluate(metadata, operand)?.truthy()))
        }
        _ => {
            let args = operands
                .iter()
                .map(|operand| evaluate(metadata, operand))
                .collect::<Result<Vec<_>>>()?;
            apply(operator, args)
        }
    }
}

fn apply(operator: Operator, args: Vec<Value>) -> Result<Value> {
    match operator {
        Operator::Date | Operator::Time | Operator::DateTime | Operator::Interval => {
            construct(operator, &args)
        }
        _ => {
            let [lhs, rhs] = args.as_slice() else {
                return Err(arity(operator, "exactly 2", args.len()));
            };
            match operator {
                Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => {
                    arithmetic(operator, single(lhs)?, single(rhs)?)
                }
                Operator::Like => Ok(Value::Bool(like(lhs, rhs))),
                Operator::In => Ok(Value::Bool(contains_any(lhs, rhs))),
                _ => Ok(Value::Bool(compare(operator, lhs, rhs))),
            }
        }
    }
}

fn arity(operator: Operator, expected: &str, actual: usize) -> ExchangeError {
    ExchangeError::evaluation(format!(
        "'{operator}' takes {expected} operand(s), got {actual}"
    ))
}

/// Flattens a value into the scalars it stands for; a scalar stands for itself.
fn scalars(value: &Value) -> &[Value] {
    match value {
        Value::List(items) => items,
        scalar => std::slice::from_ref(scalar),
    }
}

/// Unwraps a one-element list, which is how attribute lookups produce single values.
fn single(value: &Value) -> Result<&Value> {
    match scalars(value) {
        [scalar] => Ok(scalar),
        items => Err(ExchangeError::evaluation(format!(
            "expected a single value, got {} values",
            items.len()
        ))),
    }
}

fn equals(lhs: &Value, rhs: &Value) -> bool {
    lhs.compare(rhs) == Some(Ordering::Equal)
}

/// Comparison with "any value matches" semantics. An empty side never matches, for `!=` too.
fn compare(operator: Operator, lhs: &Value, rhs: &Value) -> bool {
    let (lhs, rhs) = (scalars(lhs), scalars(rhs));
    if lhs.is_empty() || rhs.is_empty() {
        return false;
    }

    if operator == Operator::Ne {
        return !lhs.iter().any(|l| rhs.iter().any(|r| equals(l, r)));
    }

    lhs.iter().any(|l| {
        rhs.iter().any(|r| match l.compare(r) {
            Some(ordering) => match operator {
                Operator::Eq => ordering == Ordering::Equal,
                Operator::Lt => ordering == Ordering::Less,
                Operator::Gt => ordering == Ordering::Greater,
                Operator::Le => ordering != Ordering::Greater,
                Operator::Ge => ordering != Ordering::Less,
                _ => false,
            },
            None => false,
        })
    })
}

fn contains_any(lhs: &Value, rhs: &Value) -> bool {
    let collection = scalars(rhs);
    scalars(lhs)
        .iter()
        .any(|item| collection.iter().any(|member| equals(item, member)))
}

/// Wildcard match where `*` is any run of characters, anchored at the start of the value.
fn like(lhs: &Value, rhs: &Value) -> bool {
    let pattern = match scalars(rhs).first() {
        Some(Value::Str(pattern)) => pattern,
        _ => return false,
    };
    let translated = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    let Ok(regex) = Regex::new(&format!("^{translated}")) else {
        return false;
    };

    scalars(lhs).iter().any(|item| match item {
        Value::Str(text) => regex.is_match(text),
        _ => false,
    })
}

fn arithmetic(operator: Operator, lhs: &Value, rhs: &Value) -> Result<Value> {
    let overflow = || ExchangeError::evaluation(format!("overflow in '{operator}'"));

    let value = match (operator, lhs, rhs) {
        (Operator::Div, Value::Int(_), Value::Int(0)) => {
            return Err(ExchangeError::evaluation("division by zero"))
        }
        (Operator::Add, Value::Int(a), Value::Int(b)) => {
            Value::Int(a.checked_add(*b).ok_or_else(overflow)?)
        }
        (Operator::Sub, Value::Int(a), Value::Int(b)) => {
            Value::Int(a.checked_sub(*b).ok_or_else(overflow)?)
        }
        (Operator::Mul, Value::Int(a), Value::Int(b)) => {
            Value::Int(a.checked_mul(*b).ok_or_else(overflow)?)
        }
        (Operator::Div, Value::Int(a), Value::Int(b)) => {
            Value::Int(a.checked_div(*b).ok_or_else(overflow)?)
        }
        (_, Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => {
            let (a, b) = (as_double(lhs), as_double(rhs));
            match operator {
                Operator::Add => Value::Double(a + b),
                Operator::Sub => Value::Double(a - b),
                Operator::Mul => Value::Double(a * b),
                _ if b == 0.0 => return Err(ExchangeError::evaluation("division by zero")),
                _ => Value::Double((a / b).trunc()),
            }
        }
        (Operator::Add, Value::Date(date), Value::Interval(interval))
        | (Operator::Add, Value::Interval(interval), Value::Date(date)) => {
            Value::Date(date.checked_add_signed(*interval).ok_or_else(overflow)?)
        }
        (Operator::Sub, Value::Date(date), Value::Interval(interval)) => {
            Value::Date(date.checked_sub_signed(*interval).ok_or_else(overflow)?)
        }
        (Operator::Add, Value::DateTime(datetime), Value::Interval(interval))
        | (Operator::Add, Value::Interval(interval), Value::DateTime(datetime)) => {
            Value::DateTime(datetime.checked_add_signed(*interval).ok_or_else(overflow)?)
        }
        (Operator::Sub, Value::DateTime(datetime), Value::Interval(interval)) => {
            Value::DateTime(datetime.checked_sub_signed(*interval).ok_or_else(overflow)?)
        }
        (Operator::Sub, Value::Date(a), Value::Date(b)) => {
            Value::Interval(a.signed_duration_since(*b))
        }
        (Operator::Sub, Value::DateTime(a), Value::DateTime(b)) => {
            Value::Interval(a.signed_duration_since(*b))
        }
        (Operator::Add, Value::Interval(a), Value::Interval(b)) => {
            Value::Interval(a.checked_add(b).ok_or_else(overflow)?)
        }
        (Operator::Sub, Value::Interval(a), Value::Interval(b)) => {
            Value::Interval(a.checked_sub(b).ok_or_else(overflow)?)
        }
        (Operator::Mul, Value::Interval(interval), Value::Int(factor))
        | (Operator::Mul, Value::Int(factor), Value::Interval(interval)) => {
            let factor = i32::try_from(*factor).map_err(|_| overflow())?;
            Value::Interval(interval.checked_mul(factor).ok_or_else(overflow)?)
        }
        _ => {
            return Err(ExchangeError::evaluation(format!(
                "'{operator}' is not defined for {lhs} and {rhs}"
            )))
        }
    };

    Ok(value)
}

fn as_double(value: &Value) -> f64 {
    match value {
        Value::Int(int) => *int as f64,
        Value::Double(double) => *double,
        _ => f64::NAN,
    }
}

fn construct(operator: Operator, args: &[Value]) -> Result<Value> {
    let numbers = args
        .iter()
        .map(|arg| match single(arg)? {
            Value::Int(int) => Ok(*int),
            other => Err(ExchangeError::evaluation(format!(
                "'{operator}' expects integer arguments, got {other}"
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    let invalid = || {
        ExchangeError::evaluation(format!("invalid arguments to '{operator}': {numbers:?}"))
    };
    let part = |index: usize| -> Result<u32> {
        u32::try_from(numbers.get(index).copied().unwrap_or(0)).map_err(|_| invalid())
    };

    match (operator, numbers.len()) {
        (Operator::Date, 3) => {
            let year = i32::try_from(numbers[0]).map_err(|_| invalid())?;
            NaiveDate::from_ymd_opt(year, part(1)?, part(2)?)
                .map(Value::Date)
                .ok_or_else(invalid)
        }
        (Operator::Time, 2..=3) => NaiveTime::from_hms_opt(part(0)?, part(1)?, part(2)?)
            .map(Value::Time)
            .ok_or_else(invalid),
        (Operator::DateTime, 3..=6) => {
            let year = i32::try_from(numbers[0]).map_err(|_| invalid())?;
            let date = NaiveDate::from_ymd_opt(year, part(1)?, part(2)?).ok_or_else(invalid)?;
            let time = NaiveTime::from_hms_opt(part(3)?, part(4)?, part(5)?).ok_or_else(invalid)?;
            Ok(Value::DateTime(NaiveDateTime::new(date, time)))
        }
        (Operator::Interval, 1..=3) => {
            let days = TimeDelta::try_days(numbers[0]).ok_or_else(invalid)?;
            let seconds = TimeDelta::try_seconds(numbers.get(1).copied().unwrap_or(0))
                .ok_or_else(invalid)?;
            let micros = TimeDelta::microseconds(numbers.get(2).copied().unwrap_or(0));
            days.checked_add(&seconds)
                .and_then(|delta| delta.checked_add(&micros))
                .map(Value::Interval)
                .ok_or_else(invalid)
        }
        _ => Err(arity(operator, "a different number of", numbers.len())),
    }
}

/// Resolves an `attr` lookup to the list of matching values, typed by `value_type`.
fn resolve_attribute(metadata: &Metadata, name: &str, value_type: ValueType) -> Value {
    let values = if name.starts_with(WHAT_SOURCE_PREFIX) {
        source_component(name, &metadata.what_source())
    } else if RESOLVED_SOURCE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
    {
        source_component(name, &metadata.resolved_source())
    } else if SOURCE_NAME_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
    {
        match metadata.source_name() {
            "" => Vec::new(),
            source_name => vec![Value::Str(source_name.to_string())],
        }
    } else {
        let wanted: Vec<&str> = name.split('/').collect();
        metadata
            .iter()
            .filter(|node| path_ends_with(&node.path, &wanted))
            .map(|node| Value::Str(node.value.clone()))
            .collect()
    };

    Value::List(values).coerce(value_type)
}

fn source_component(name: &str, source: &Source) -> Vec<Value> {
    let key = name.rsplit(':').next().unwrap_or_default();
    source
        .get(key)
        .map(|value| vec![Value::Str(value.to_string())])
        .unwrap_or_default()
}

fn path_ends_with(path: &str, wanted: &[&str]) -> bool {
    let segments: Vec<&str> = path.split('/').collect();
    segments.len() >= wanted.len() && segments[segments.len() - wanted.len()..] == *wanted
}

#[cfg(test)]
mod tests {
    use super::{evaluate, matches};
    use crate::matching::expression::{Expression, Operator, Value, ValueType};
    use crate::matching::filter::Filter;
    use crate::metadata::Metadata;
    use chrono::NaiveDate;
    use serde_json::json;

    fn source_name_like(pattern: &str) -> Filter {
        Filter::attribute(
            "_bdb/source_name",
            Operator::Like,
            ValueType::String,
            json!(pattern),
        )
    }

    fn volume() -> Metadata {
        Metadata::new()
            .with_attribute("/what/object", "PVOL")
            .with_attribute("/what/source", "NOD:sehem,WMO:02588")
            .with_attribute("/what/date", "20240102")
            .with_attribute("/dataset1/data1/what/quantity", "DBZH")
            .with_attribute("/dataset1/data2/what/quantity", "TH")
            .with_attribute("/dataset1/where/elangle", "0.5")
            .with_resolved_source("NOD:sehem,RAD:SE45,PLC:Hemse")
            .with_source_name("sehem")
    }

    fn eval_bool(metadata: &Metadata, filter: &Filter) -> bool {
        matches(metadata, &filter.compile())
    }

    #[test]
    fn negated_like_excludes_matching_source_names() {
        let filter = Filter::negate(source_name_like("se*"));

        assert!(!eval_bool(&Metadata::new().with_source_name("sebaa"), &filter));
        assert!(eval_bool(&Metadata::new().with_source_name("fipet"), &filter));
    }

    #[test]
    fn unresolved_source_name_matches_nothing() {
        let not_sehem = Filter::attribute(
            "_bdb/source_name",
            Operator::Ne,
            ValueType::String,
            json!("sehem"),
        );
        let anything = source_name_like("*");

        assert!(!eval_bool(&Metadata::new(), &not_sehem));
        assert!(!eval_bool(&Metadata::new(), &anything));
        assert!(eval_bool(&Metadata::new().with_source_name("fipet"), &not_sehem));
    }

    #[test]
    fn like_is_anchored_at_start_only() {
        let metadata = Metadata::new().with_source_name("sebaa");

        assert!(eval_bool(&metadata, &source_name_like("seb")));
        assert!(!eval_bool(&metadata, &source_name_like("baa")));
        assert!(eval_bool(&metadata, &source_name_like("*baa")));
        assert!(!eval_bool(&metadata, &source_name_like("s.baa")));
    }

    #[test]
    fn always_matches_empty_metadata() {
        assert!(eval_bool(&Metadata::new(), &Filter::Always));
    }

    #[test]
    fn object_equality_resolves_root_attribute() {
        let filter = Filter::attribute(
            "/what/object",
            Operator::Eq,
            ValueType::String,
            json!("PVOL"),
        );

        assert!(eval_bool(&volume(), &filter));
        assert!(!eval_bool(&Metadata::new(), &filter));
    }

    #[test]
    fn suffix_lookup_collects_repeated_nodes() {
        let filter = Filter::attribute(
            "what/quantity",
            Operator::In,
            ValueType::String,
            json!(["TH"]),
        );

        assert!(eval_bool(&volume(), &filter));
        assert_eq!(
            evaluate(
                &volume(),
                &Expression::Attr {
                    name: "what/quantity".to_string(),
                    value_type: ValueType::String
                }
            )
            .expect("attribute lookup should evaluate"),
            Value::List(vec![Value::Str("DBZH".into()), Value::Str("TH".into())])
        );
    }

    #[test]
    fn source_components_come_from_file_and_resolved_source() {
        let from_file = Filter::attribute(
            "what/source:WMO",
            Operator::Eq,
            ValueType::String,
            json!("02588"),
        );
        let resolved = Filter::attribute(
            "_bdb/source:PLC",
            Operator::Eq,
            ValueType::String,
            json!("Hemse"),
        );
        let missing = Filter::attribute(
            "_baltrad/source:CTY",
            Operator::Eq,
            ValueType::String,
            json!("643"),
        );

        assert!(eval_bool(&volume(), &from_file));
        assert!(eval_bool(&volume(), &resolved));
        assert!(!eval_bool(&volume(), &missing));
    }

    #[test]
    fn unresolved_attribute_never_matches() {
        for operation in [Operator::Eq, Operator::Ne, Operator::Lt, Operator::In, Operator::Like] {
            let filter = Filter::attribute(
                "/how/missing",
                operation,
                ValueType::String,
                json!("x"),
            );
            assert!(!eval_bool(&volume(), &filter), "operation {operation}");
        }
    }

    #[test]
    fn not_equal_requires_no_value_to_match() {
        let filter = Filter::attribute(
            "what/quantity",
            Operator::Ne,
            ValueType::String,
            json!("TH"),
        );

        assert!(!eval_bool(&volume(), &filter));
    }

    #[test]
    fn typed_comparisons_use_value_type() {
        let elangle = Filter::attribute(
            "where/elangle",
            Operator::Lt,
            ValueType::Double,
            json!("1.0"),
        );
        let date = Filter::attribute(
            "/what/date",
            Operator::Ge,
            ValueType::Date,
            json!("20240101"),
        );

        assert!(eval_bool(&volume(), &elangle));
        assert!(eval_bool(&volume(), &date));
    }

    #[test]
    fn in_with_scalar_rhs_is_singleton() {
        let filter = Filter::attribute(
            "_bdb/source_name",
            Operator::In,
            ValueType::String,
            json!("sehem"),
        );

        assert!(eval_bool(&volume(), &filter));
    }

    #[test]
    fn empty_and_is_true_and_empty_or_is_false() {
        assert!(eval_bool(&Metadata::new(), &Filter::And(vec![])));
        assert!(!eval_bool(&Metadata::new(), &Filter::Or(vec![])));
    }

    #[test]
    fn arithmetic_uses_truncating_integer_division() {
        let expression = Expression::call(
            Operator::Div,
            vec![
                Expression::literal(Value::Int(-7)),
                Expression::literal(Value::Int(2)),
            ],
        );

        assert_eq!(evaluate(&Metadata::new(), &expression).ok(), Some(Value::Int(-3)));
    }

    #[test]
    fn division_by_zero_is_an_error_and_no_match() {
        let expression = Expression::call(
            Operator::Div,
            vec![
                Expression::literal(Value::Int(1)),
                Expression::literal(Value::Int(0)),
            ],
        );

        assert!(evaluate(&Metadata::new(), &expression).is_err());
        assert!(!matches(&Metadata::new(), &expression));
    }

    #[test]
    fn date_constructor_combines_with_interval() {
        let date = |y, m, d| {
            Expression::call(
                Operator::Date,
                vec![
                    Expression::literal(Value::Int(y)),
                    Expression::literal(Value::Int(m)),
                    Expression::literal(Value::Int(d)),
                ],
            )
        };
        let shifted = Expression::call(
            Operator::Add,
            vec![
                date(2024, 2, 28),
                Expression::call(Operator::Interval, vec![Expression::literal(Value::Int(2))]),
            ],
        );

        assert_eq!(
            evaluate(&Metadata::new(), &shifted).ok(),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
        );
        assert!(evaluate(&Metadata::new(), &date(2024, 13, 1)).is_err());
    }
}
