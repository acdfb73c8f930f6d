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

//! Compiled, evaluable form of a filter: operator calls over literals and attribute lookups.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DATE_FORMATS: [&str; 2] = ["%Y%m%d", "%Y-%m-%d"];
const TIME_FORMATS: [&str; 3] = ["%H%M%S", "%H:%M:%S", "%H%M"];
const DATETIME_FORMATS: [&str; 3] = ["%Y%m%dT%H%M%S", "%Y-%m-%dT%H:%M:%S", "%Y%m%d%H%M%S"];

/// The closed operator set understood by the matcher.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Gt,
    Ge,
    Le,
    And,
    Or,
    Not,
    Like,
    In,
    Date,
    Time,
    DateTime,
    Interval,
}

impl Operator {
    pub const ALL: [Operator; 19] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Gt,
        Operator::Ge,
        Operator::Le,
        Operator::And,
        Operator::Or,
        Operator::Not,
        Operator::Like,
        Operator::In,
        Operator::Date,
        Operator::Time,
        Operator::DateTime,
        Operator::Interval,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
            Operator::Like => "like",
            Operator::In => "in",
            Operator::Date => "date",
            Operator::Time => "time",
            Operator::DateTime => "datetime",
            Operator::Interval => "interval",
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|operator| operator.symbol() == symbol)
            .ok_or_else(|| format!("unknown operation '{symbol}'"))
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// How attribute values (and the literal they are compared with) should be typed.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ValueType {
    #[default]
    String,
    Int,
    Double,
    Bool,
    Date,
    Time,
    DateTime,
}

impl ValueType {
    /// Maps a configured type name. Unknown names fall back to string typing.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "int" | "integer" | "long" => ValueType::Int,
            "double" | "float" | "real" => ValueType::Double,
            "bool" | "boolean" => ValueType::Bool,
            "date" => ValueType::Date,
            "time" => ValueType::Time,
            "datetime" => ValueType::DateTime,
            _ => ValueType::String,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Int => "int",
            ValueType::Double => "double",
            ValueType::Bool => "bool",
            ValueType::Date => "date",
            ValueType::Time => "time",
            ValueType::DateTime => "datetime",
        }
    }
}

/// Runtime value produced while evaluating an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Interval(TimeDelta),
    List(Vec<Value>),
}

impl Value {
    /// Converts a configuration literal. `null` becomes an empty list.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::List(Vec::new()),
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(int) => Value::Int(int),
                None => Value::Double(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(_) => Value::Str(value.to_string()),
        }
    }

    /// Re-types the value (element-wise for lists). Values that do not parse are left as they are.
    pub fn coerce(self, value_type: ValueType) -> Self {
        match (self, value_type) {
            (Value::List(items), _) => Value::List(
                items
                    .into_iter()
                    .map(|item| item.coerce(value_type))
                    .collect(),
            ),
            (Value::Str(s), ValueType::Int) => match s.trim().parse::<i64>() {
                Ok(int) => Value::Int(int),
                Err(_) => Value::Str(s),
            },
            (Value::Str(s), ValueType::Double) => match s.trim().parse::<f64>() {
                Ok(double) => Value::Double(double),
                Err(_) => Value::Str(s),
            },
            (Value::Int(int), ValueType::Double) => Value::Double(int as f64),
            (Value::Str(s), ValueType::Bool) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => Value::Str(s),
            },
            (Value::Str(s), ValueType::Date) => DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(s.trim(), format).ok())
                .map_or(Value::Str(s), Value::Date),
            (Value::Str(s), ValueType::Time) => TIME_FORMATS
                .iter()
                .find_map(|format| NaiveTime::parse_from_str(s.trim(), format).ok())
                .map_or(Value::Str(s), Value::Time),
            (Value::Str(s), ValueType::DateTime) => DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(s.trim(), format).ok())
                .map_or(Value::Str(s), Value::DateTime),
            (value, _) => value,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(int) => *int != 0,
            Value::Double(double) => *double != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Interval(interval) => !interval.is_zero(),
            Value::List(items) => !items.is_empty(),
            Value::Date(_) | Value::Time(_) | Value::DateTime(_) => true,
        }
    }

    /// Ordering between two scalars of compatible types. Mixed int/double compare numerically.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            (Value::Double(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Interval(a), Value::Interval(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(int) => write!(f, "{int}"),
            Value::Double(double) => write!(f, "{double}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Date(date) => write!(f, "{}", date.format("%Y%m%d")),
            Value::Time(time) => write!(f, "{}", time.format("%H%M%S")),
            Value::DateTime(datetime) => write!(f, "{}", datetime.format("%Y%m%dT%H%M%S")),
            Value::Interval(interval) => write!(f, "{}s", interval.num_seconds()),
            Value::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A compiled filter expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// Attribute lookup resolved against the metadata under evaluation.
    Attr {
        name: String,
        value_type: ValueType,
    },
    Call {
        operator: Operator,
        operands: Vec<Expression>,
    },
}

impl Expression {
    pub fn call(operator: Operator, operands: Vec<Expression>) -> Self {
        Expression::Call { operator, operands }
    }

    pub fn literal(value: Value) -> Self {
        Expression::Literal(value)
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{value}"),
            Expression::Attr { name, value_type } => {
                write!(f, "(attr {name:?} {:?})", value_type.name())
            }
            Expression::Call { operator, operands } => {
                write!(f, "({operator}")?;
                for operand in operands {
                    write!(f, " {operand}")?;
                }
                f.write_str(")")
            }
        }
    }
}
