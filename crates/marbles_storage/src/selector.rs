//! Predicate query engine for the in-memory store.
//!
//! Expressions are JSON documents in the Mango style used by document
//! state databases:
//!
//! ```json
//! {"selector": {"docType": "marble", "size": {"$gt": 3}}, "limit": 10}
//! ```
//!
//! Supported operators: `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`,
//! `$nin`, `$exists` on fields, and `$and`, `$or`, `$nor`, `$not` as
//! combinators. Dotted field names and nested objects address sub-fields.
//! The `fields`, `sort`, `use_index` and `bookmark` members are accepted and
//! ignored.

use crate::error::{StorageError, StorageResult};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A parsed predicate query.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    condition: Condition,
    limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    All(Vec<Condition>),
    Any(Vec<Condition>),
    NoneOf(Vec<Condition>),
    Not(Box<Condition>),
    Field { path: Vec<String>, op: FieldOp },
}

#[derive(Debug, Clone, PartialEq)]
enum FieldOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
}

impl Selector {
    /// Parses a query expression.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidQuery`] if the expression is not a JSON
    /// object with an object-valued `selector` member, or uses an unknown
    /// operator.
    pub fn parse(expression: &str) -> StorageResult<Self> {
        let root: Value = serde_json::from_str(expression)
            .map_err(|e| StorageError::invalid_query(format!("expression is not JSON: {e}")))?;
        let root = root
            .as_object()
            .ok_or_else(|| StorageError::invalid_query("expression must be a JSON object"))?;

        let selector = root
            .get("selector")
            .ok_or_else(|| StorageError::invalid_query("missing \"selector\" member"))?;
        let selector = selector
            .as_object()
            .ok_or_else(|| StorageError::invalid_query("\"selector\" must be an object"))?;

        let limit = match root.get("limit") {
            None => None,
            Some(v) => Some(
                v.as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| {
                        StorageError::invalid_query("\"limit\" must be a non-negative integer")
                    })?,
            ),
        };

        Ok(Self {
            condition: parse_object(selector, &[])?,
            limit,
        })
    }

    /// Returns the result limit, if any.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns true if the JSON document matches.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        self.condition.matches(document)
    }

    /// Returns true if the raw bytes are a JSON document that matches.
    ///
    /// Values that are not JSON never match.
    #[must_use]
    pub fn matches_bytes(&self, bytes: &[u8]) -> bool {
        serde_json::from_slice::<Value>(bytes)
            .map(|doc| self.matches(&doc))
            .unwrap_or(false)
    }
}

fn parse_object(object: &Map<String, Value>, path: &[String]) -> StorageResult<Condition> {
    let mut conditions = Vec::with_capacity(object.len());

    for (key, value) in object {
        if let Some(operator) = key.strip_prefix('$') {
            conditions.push(parse_operator(operator, value, path)?);
            continue;
        }

        let mut field_path = path.to_vec();
        field_path.extend(key.split('.').map(str::to_string));

        match value {
            Value::Object(inner) if !inner.is_empty() => {
                conditions.push(parse_object(inner, &field_path)?);
            }
            other => conditions.push(Condition::Field {
                path: field_path,
                op: FieldOp::Eq(other.clone()),
            }),
        }
    }

    if conditions.len() == 1 {
        Ok(conditions.remove(0))
    } else {
        Ok(Condition::All(conditions))
    }
}

fn parse_operator(operator: &str, value: &Value, path: &[String]) -> StorageResult<Condition> {
    match operator {
        "and" => Ok(Condition::All(parse_list(value, path)?)),
        "or" => Ok(Condition::Any(parse_list(value, path)?)),
        "nor" => Ok(Condition::NoneOf(parse_list(value, path)?)),
        "not" => {
            let inner = value
                .as_object()
                .ok_or_else(|| StorageError::invalid_query("$not expects an object"))?;
            Ok(Condition::Not(Box::new(parse_object(inner, path)?)))
        }
        _ if path.is_empty() => Err(StorageError::invalid_query(format!(
            "operator ${operator} must be applied to a field"
        ))),
        _ => Ok(Condition::Field {
            path: path.to_vec(),
            op: parse_field_op(operator, value)?,
        }),
    }
}

fn parse_list(value: &Value, path: &[String]) -> StorageResult<Vec<Condition>> {
    let items = value
        .as_array()
        .ok_or_else(|| StorageError::invalid_query("combinator expects an array"))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| StorageError::invalid_query("combinator members must be objects"))
                .and_then(|object| parse_object(object, path))
        })
        .collect()
}

fn parse_field_op(operator: &str, value: &Value) -> StorageResult<FieldOp> {
    let op = match operator {
        "eq" => FieldOp::Eq(value.clone()),
        "ne" => FieldOp::Ne(value.clone()),
        "gt" => FieldOp::Gt(value.clone()),
        "gte" => FieldOp::Gte(value.clone()),
        "lt" => FieldOp::Lt(value.clone()),
        "lte" => FieldOp::Lte(value.clone()),
        "in" | "nin" => {
            let values = value
                .as_array()
                .ok_or_else(|| StorageError::invalid_query(format!("${operator} expects an array")))?
                .clone();
            if operator == "in" {
                FieldOp::In(values)
            } else {
                FieldOp::Nin(values)
            }
        }
        "exists" => FieldOp::Exists(
            value
                .as_bool()
                .ok_or_else(|| StorageError::invalid_query("$exists expects a boolean"))?,
        ),
        other => {
            return Err(StorageError::invalid_query(format!(
                "unsupported operator ${other}"
            )))
        }
    };
    Ok(op)
}

impl Condition {
    fn matches(&self, document: &Value) -> bool {
        match self {
            Self::All(conditions) => conditions.iter().all(|c| c.matches(document)),
            Self::Any(conditions) => conditions.iter().any(|c| c.matches(document)),
            Self::NoneOf(conditions) => !conditions.iter().any(|c| c.matches(document)),
            Self::Not(inner) => !inner.matches(document),
            Self::Field { path, op } => op.matches(lookup(document, path)),
        }
    }
}

impl FieldOp {
    fn matches(&self, field: Option<&Value>) -> bool {
        match (self, field) {
            (Self::Exists(expected), field) => field.is_some() == *expected,
            (_, None) => false,
            (Self::Eq(expected), Some(actual)) => equals(actual, expected),
            (Self::Ne(expected), Some(actual)) => !equals(actual, expected),
            (Self::Gt(bound), Some(actual)) => compare(actual, bound) == Some(Ordering::Greater),
            (Self::Gte(bound), Some(actual)) => matches!(
                compare(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            (Self::Lt(bound), Some(actual)) => compare(actual, bound) == Some(Ordering::Less),
            (Self::Lte(bound), Some(actual)) => {
                matches!(compare(actual, bound), Some(Ordering::Less | Ordering::Equal))
            }
            (Self::In(values), Some(actual)) => values.iter().any(|v| equals(actual, v)),
            (Self::Nin(values), Some(actual)) => !values.iter().any(|v| equals(actual, v)),
        }
    }
}

fn lookup<'a>(document: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter()
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

/// Numbers compare by value, so `5` equals `5.0`.
fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Orders numbers with numbers and strings with strings; mixed types are incomparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
