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

//! Filter tree as it appears in subscription and publication configuration.
//!
//! The canonical JSON shape is keyed by `filter_type`:
//!
//! ```json
//! {"filter_type": "and_filter", "value": [
//!     {"filter_type": "attribute_filter", "name": "_bdb/source_name",
//!      "operation": "in", "value_type": "string", "value": ["sehem", "seang"]},
//!     {"filter_type": "not_filter", "value": {"filter_type": "always_filter"}}
//! ]}
//! ```

use crate::error::{ExchangeError, Result};
use crate::matching::expression::{Expression, Operator, Value, ValueType};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map};

const ATTRIBUTE_FILTER: &str = "attribute_filter";
const AND_FILTER: &str = "and_filter";
const OR_FILTER: &str = "or_filter";
const NOT_FILTER: &str = "not_filter";
const ALWAYS_FILTER: &str = "always_filter";

/// Immutable filter tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Attribute {
        name: String,
        operation: Operator,
        value_type: ValueType,
        value: serde_json::Value,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Always,
}

impl Filter {
    pub fn attribute(
        name: impl Into<String>,
        operation: Operator,
        value_type: ValueType,
        value: serde_json::Value,
    ) -> Self {
        Filter::Attribute {
            name: name.into(),
            operation,
            value_type,
            value,
        }
    }

    pub fn negate(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Structural parse of the canonical JSON shape.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| ExchangeError::config("filter must be a JSON object"))?;
        let filter_type = object
            .get("filter_type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ExchangeError::config("filter is missing 'filter_type'"))?;

        match filter_type {
            ATTRIBUTE_FILTER => Self::attribute_from_object(object),
            AND_FILTER => Ok(Filter::And(Self::children(object, AND_FILTER)?)),
            OR_FILTER => Ok(Filter::Or(Self::children(object, OR_FILTER)?)),
            NOT_FILTER => {
                let child = object.get("value").ok_or_else(|| {
                    ExchangeError::config("not_filter requires a nested filter as 'value'")
                })?;
                Ok(Filter::negate(Self::from_value(child)?))
            }
            ALWAYS_FILTER => Ok(Filter::Always),
            other => Err(ExchangeError::config(format!(
                "unknown filter_type '{other}'"
            ))),
        }
    }

    fn attribute_from_object(object: &Map<String, serde_json::Value>) -> Result<Self> {
        let text_field = |key: &str| {
            object
                .get(key)
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| {
                    ExchangeError::config(format!(
                        "attribute_filter requires a string '{key}'"
                    ))
                })
        };

        let name = text_field("name")?;
        let operation = text_field("operation")?
            .parse::<Operator>()
            .map_err(ExchangeError::config)?;
        let value_type = ValueType::from_name(text_field("value_type")?);
        let value = object
            .get("value")
            .ok_or_else(|| ExchangeError::config("attribute_filter requires 'value'"))?;

        Ok(Filter::attribute(name, operation, value_type, value.clone()))
    }

    fn children(object: &Map<String, serde_json::Value>, filter_type: &str) -> Result<Vec<Filter>> {
        object
            .get("value")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| {
                ExchangeError::config(format!("{filter_type} requires a list as 'value'"))
            })?
            .iter()
            .map(Self::from_value)
            .collect()
    }

    /// Canonical JSON rendering, accepted back by [`Filter::from_value`].
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Filter::Attribute {
                name,
                operation,
                value_type,
                value,
            } => json!({
                "filter_type": ATTRIBUTE_FILTER,
                "name": name,
                "operation": operation.symbol(),
                "value_type": value_type.name(),
                "value": value,
            }),
            Filter::And(children) => json!({
                "filter_type": AND_FILTER,
                "value": children.iter().map(Filter::to_value).collect::<Vec<_>>(),
            }),
            Filter::Or(children) => json!({
                "filter_type": OR_FILTER,
                "value": children.iter().map(Filter::to_value).collect::<Vec<_>>(),
            }),
            Filter::Not(child) => json!({
                "filter_type": NOT_FILTER,
                "value": child.to_value(),
            }),
            Filter::Always => json!({
                "filter_type": ALWAYS_FILTER,
                "value": {},
            }),
        }
    }

    /// Lowers the tree into an evaluable expression.
    ///
    /// Attribute literals are typed by their `value_type`.
    pub fn compile(&self) -> Expression {
        match self {
            Filter::Attribute {
                name,
                operation,
                value_type,
                value,
            } => Expression::call(
                *operation,
                vec![
                    Expression::Attr {
                        name: name.clone(),
                        value_type: *value_type,
                    },
                    Expression::literal(Value::from_json(value).coerce(*value_type)),
                ],
            ),
            Filter::And(children) => {
                Expression::call(Operator::And, children.iter().map(Filter::compile).collect())
            }
            Filter::Or(children) => {
                Expression::call(Operator::Or, children.iter().map(Filter::compile).collect())
            }
            Filter::Not(child) => Expression::call(Operator::Not, vec![child.compile()]),
            Filter::Always => Expression::literal(Value::Bool(true)),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Always
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Filter::from_value(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::Filter;
    use crate::error::ExchangeError;
    use crate::matching::expression::{Operator, ValueType};
    use serde_json::json;

    #[test]
    fn parses_nested_filters() {
        let filter = Filter::from_json(
            r#"{"filter_type": "and_filter", "value": [
                {"filter_type": "attribute_filter", "name": "_bdb/source_name",
                 "operation": "in", "value_type": "STRING", "value": ["sehem", "seang"]},
                {"filter_type": "not_filter", "value": {"filter_type": "always_filter"}}
            ]}"#,
        )
        .expect("filter should parse");

        assert_eq!(
            filter,
            Filter::And(vec![
                Filter::attribute(
                    "_bdb/source_name",
                    Operator::In,
                    ValueType::String,
                    json!(["sehem", "seang"])
                ),
                Filter::negate(Filter::Always),
            ])
        );
    }

    #[test]
    fn and_filter_requires_list_value() {
        let result = Filter::from_value(&json!({"filter_type": "and_filter", "value": {}}));

        assert!(matches!(result, Err(ExchangeError::Config { .. })));
    }

    #[test]
    fn attribute_filter_requires_all_keys() {
        let result = Filter::from_value(&json!({
            "filter_type": "attribute_filter",
            "name": "/what/object",
            "operation": "=",
            "value": "PVOL"
        }));

        match result {
            Err(ExchangeError::Config { msg }) => assert!(msg.contains("value_type")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let result = Filter::from_value(&json!({
            "filter_type": "attribute_filter",
            "name": "/what/object",
            "operation": "~=",
            "value_type": "string",
            "value": "PVOL"
        }));

        assert!(matches!(result, Err(ExchangeError::Config { .. })));
    }

    #[test]
    fn unknown_filter_type_is_rejected() {
        let result = Filter::from_value(&json!({"filter_type": "xor_filter", "value": []}));

        assert!(matches!(result, Err(ExchangeError::Config { .. })));
    }

    #[test]
    fn canonical_value_parses_back() {
        let filter = Filter::Or(vec![
            Filter::attribute("/what/object", Operator::Eq, ValueType::String, json!("SCAN")),
            Filter::negate(Filter::attribute(
                "what/source:NOD",
                Operator::Like,
                ValueType::String,
                json!("se*"),
            )),
            Filter::Always,
        ]);

        let reparsed = Filter::from_value(&filter.to_value()).expect("canonical form should parse");

        assert_eq!(reparsed, filter);
        assert_eq!(reparsed.compile(), filter.compile());
    }

    #[test]
    fn always_compiles_to_true() {
        assert_eq!(Filter::Always.compile().to_string(), "true");
    }

    #[test]
    fn deserializes_inside_config_structs() {
        #[derive(serde::Deserialize)]
        struct Holder {
            filter: Filter,
        }

        let holder: Holder = serde_json::from_value(json!({
            "filter": {"filter_type": "always_filter"}
        }))
        .expect("holder should deserialize");

        assert_eq!(holder.filter, Filter::Always);
    }
}
