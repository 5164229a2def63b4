// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cohort query expressions.
//!
//! A cohort filter is a boolean tree over phenotype fields. Leaves are
//! [`Phenotype`] constraints (a discrete value list or an inclusive numeric
//! range); inner nodes are [`Query`] combinators (`AND`, `OR`, `NOT`).
//!
//! Trees are built with the combinators on [`QueryNode`] or the `&`, `|` and `!`
//! operators, normalized with [`QueryNode::normalize`], and converted to and from
//! the nested JSON predicate format used by the cohort-browser API:
//!
//! ```text
//! Leaf:      {"field": <id>, "instance": ["0"], "isLabel": false,
//!             "value": {"from": <num>, "to": <num>} | [<v1>, <v2>, ...]}
//! Composite: {"operator": "AND" | "OR" | "NOT", "queries": [<Leaf | Composite>, ...]}
//! ```
//!
//! # Example
//!
//! ```
//! use cloudos_sdk::{Phenotype, QueryNode};
//!
//! let sex = Phenotype::discrete(31, ["Female"]);
//! let age = Phenotype::range(21022, 40, 65);
//!
//! // The right-hand operand is listed first.
//! let query = sex & age;
//! let wire = query.to_wire();
//! assert_eq!(wire["operator"], "AND");
//! assert_eq!(wire["queries"][0]["field"], 21022);
//!
//! let parsed = QueryNode::parse(&wire).unwrap();
//! assert_eq!(parsed.phenotypes().len(), 2);
//! ```

use std::fmt;
use std::ops;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};
use thiserror::Error;

/// Instance tag sent with every leaf. Multi-instance phenotypes are not supported.
const INSTANCE_TAG: &str = "0";

/// Wire input that matches neither the leaf nor the composite shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPredicateError {
    /// The predicate (or one of its children) is not a JSON object.
    #[error("malformed predicate: expected an object, got {0}")]
    NotAnObject(String),

    /// A required key is absent.
    #[error("malformed predicate: missing key `{0}`")]
    MissingKey(&'static str),

    /// The leaf `value` is neither a list nor a `{"from", "to"}` range.
    #[error("malformed predicate: invalid value for field {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// The `operator` is not one of `AND`, `OR`, `NOT`.
    #[error("malformed predicate: unknown operator {0}")]
    InvalidOperator(String),

    /// The composite `queries` entry is not a list.
    #[error("malformed predicate: `queries` must be a list, got {0}")]
    InvalidChildren(String),

    /// A `NOT` node with other than exactly one child.
    #[error("malformed predicate: NOT takes exactly one child, got {0}")]
    NotArity(usize),
}

// ============================================================================
// Leaf predicates
// ============================================================================

/// Phenotype field identifier.
///
/// Usually a numeric ID or a field name, but any JSON value is accepted and
/// echoed back to the API unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(Value);

impl FieldId {
    /// The identifier as it appears on the wire.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Numeric ID, if the identifier is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.as_i64()
    }

    /// Field name, if the identifier is a string.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(name) => f.write_str(name),
            other => write!(f, "{}", other),
        }
    }
}

macro_rules! impl_field_id_from {
    ($($ty:ty),*) => {$(
        impl From<$ty> for FieldId {
            fn from(id: $ty) -> Self {
                FieldId(Value::from(id))
            }
        }
    )*};
}

impl_field_id_from!(i32, i64, u32, u64, &str, String, serde_json::Number);

impl From<Value> for FieldId {
    fn from(value: Value) -> Self {
        FieldId(value)
    }
}

/// The constraint a [`Phenotype`] places on its field.
#[derive(Debug, Clone, PartialEq)]
pub enum PhenotypeValue {
    /// The field must equal one of these values.
    Discrete(Vec<Value>),
    /// The field must lie in `[min, max]`. Bounds are kept as sent.
    Continuous { min: Value, max: Value },
}

/// A filter on a single phenotype field.
///
/// Exactly one value shape is held, fixed at construction. Neither the field
/// nor the range bounds are checked; the API validates them.
#[derive(Debug, Clone, PartialEq)]
pub struct Phenotype {
    field: FieldId,
    value: PhenotypeValue,
}

impl Phenotype {
    /// Create a discrete filter matching any of `values`.
    pub fn discrete<V>(field: impl Into<FieldId>, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<Value>,
    {
        Self {
            field: field.into(),
            value: PhenotypeValue::Discrete(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Create a continuous filter over the inclusive range `[min, max]`.
    pub fn range(field: impl Into<FieldId>, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: PhenotypeValue::Continuous {
                min: min.into(),
                max: max.into(),
            },
        }
    }

    pub fn field(&self) -> &FieldId {
        &self.field
    }

    pub fn value(&self) -> &PhenotypeValue {
        &self.value
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self.value, PhenotypeValue::Continuous { .. })
    }

    /// Discrete values, or `None` for a range filter.
    pub fn values(&self) -> Option<&[Value]> {
        match &self.value {
            PhenotypeValue::Discrete(values) => Some(values),
            PhenotypeValue::Continuous { .. } => None,
        }
    }

    /// Range bounds, or `None` for a discrete filter.
    pub fn bounds(&self) -> Option<(&Value, &Value)> {
        match &self.value {
            PhenotypeValue::Continuous { min, max } => Some((min, max)),
            PhenotypeValue::Discrete(_) => None,
        }
    }

    /// Parse a leaf from its wire object.
    pub fn from_wire(value: &Value) -> Result<Self, MalformedPredicateError> {
        let object = value
            .as_object()
            .ok_or_else(|| MalformedPredicateError::NotAnObject(value.to_string()))?;

        let field = object
            .get("field")
            .cloned()
            .map(FieldId)
            .ok_or(MalformedPredicateError::MissingKey("field"))?;

        let raw_value = object
            .get("value")
            .ok_or(MalformedPredicateError::MissingKey("value"))?;

        let value = match raw_value {
            Value::Array(values) => PhenotypeValue::Discrete(values.clone()),
            Value::Object(range) => {
                let bound = |key: &str| {
                    range
                        .get(key)
                        .cloned()
                        .ok_or_else(|| MalformedPredicateError::InvalidValue {
                            field: field.to_string(),
                            reason: format!("range is missing `{}`", key),
                        })
                };
                PhenotypeValue::Continuous {
                    min: bound("from")?,
                    max: bound("to")?,
                }
            }
            other => {
                return Err(MalformedPredicateError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("expected a list or a range, got {}", other),
                });
            }
        };

        Ok(Self { field, value })
    }

    pub fn to_wire(&self) -> Value {
        let value = match &self.value {
            PhenotypeValue::Discrete(values) => Value::Array(values.clone()),
            PhenotypeValue::Continuous { min, max } => json!({ "from": min, "to": max }),
        };

        json!({
            "field": self.field,
            "instance": [INSTANCE_TAG],
            "isLabel": false,
            "value": value,
        })
    }
}

impl fmt::Display for Phenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            PhenotypeValue::Discrete(values) => {
                write!(f, "{} in [", self.field)?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            PhenotypeValue::Continuous { min, max } => {
                write!(f, "{} in {}..={}", self.field, min, max)
            }
        }
    }
}

// ============================================================================
// Composite nodes
// ============================================================================

/// Boolean combinator of a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = MalformedPredicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(Operator::And),
            "OR" => Ok(Operator::Or),
            "NOT" => Ok(Operator::Not),
            other => Err(MalformedPredicateError::InvalidOperator(other.to_string())),
        }
    }
}

/// A boolean combination of child nodes.
///
/// A `NOT` query always holds exactly one child.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    operator: Operator,
    children: Vec<QueryNode>,
}

impl Query {
    /// Create a query, rejecting a `NOT` without exactly one child.
    pub fn new(
        operator: Operator,
        children: Vec<QueryNode>,
    ) -> Result<Self, MalformedPredicateError> {
        if operator == Operator::Not && children.len() != 1 {
            return Err(MalformedPredicateError::NotArity(children.len()));
        }
        Ok(Self { operator, children })
    }

    /// `AND` over `children`, in order.
    pub fn all_of<N: Into<QueryNode>>(children: impl IntoIterator<Item = N>) -> Self {
        Self {
            operator: Operator::And,
            children: children.into_iter().map(Into::into).collect(),
        }
    }

    /// `OR` over `children`, in order.
    pub fn any_of<N: Into<QueryNode>>(children: impl IntoIterator<Item = N>) -> Self {
        Self {
            operator: Operator::Or,
            children: children.into_iter().map(Into::into).collect(),
        }
    }

    pub fn negation(child: impl Into<QueryNode>) -> Self {
        Self {
            operator: Operator::Not,
            children: vec![child.into()],
        }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn children(&self) -> &[QueryNode] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Parse a composite from its wire object. Children with a `field` key are
    /// leaves; everything else is parsed as a nested composite.
    pub fn from_wire(value: &Value) -> Result<Self, MalformedPredicateError> {
        let object = value
            .as_object()
            .ok_or_else(|| MalformedPredicateError::NotAnObject(value.to_string()))?;

        let operator = match object.get("operator") {
            Some(Value::String(op)) => op.parse::<Operator>()?,
            Some(other) => return Err(MalformedPredicateError::InvalidOperator(other.to_string())),
            None => return Err(MalformedPredicateError::MissingKey("operator")),
        };

        let queries = match object.get("queries") {
            Some(Value::Array(queries)) => queries,
            Some(other) => return Err(MalformedPredicateError::InvalidChildren(other.to_string())),
            None => return Err(MalformedPredicateError::MissingKey("queries")),
        };

        let children = queries
            .iter()
            .map(QueryNode::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(operator, children)
    }

    pub fn to_wire(&self) -> Value {
        json!({
            "operator": self.operator,
            "queries": self.children.iter().map(QueryNode::to_wire).collect::<Vec<_>>(),
        })
    }

    /// All leaves under this query, depth-first in child order.
    pub fn list_phenotypes(&self) -> Vec<&Phenotype> {
        let mut out = Vec::new();
        for child in &self.children {
            child.collect_phenotypes(&mut out);
        }
        out
    }

    /// Normalize every child while keeping this query as the root, even when
    /// it has a single child.
    pub fn strip_singletons(self) -> Query {
        Query {
            operator: self.operator,
            children: self
                .children
                .into_iter()
                .map(QueryNode::normalize)
                .collect(),
        }
    }

    /// Collapse redundant single-child `AND`/`OR` wrappers, recursively.
    pub fn normalize(self) -> QueryNode {
        let Query {
            operator,
            mut children,
        } = self;

        if operator != Operator::Not && children.len() == 1 {
            return children.swap_remove(0).normalize();
        }

        QueryNode::Query(Query {
            operator,
            children: children.into_iter().map(QueryNode::normalize).collect(),
        })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operator == Operator::Not {
            write!(f, "NOT ")?;
        }
        write!(f, "(")?;
        if self.children.is_empty() {
            write!(f, "{}", self.operator)?;
        }
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.operator)?;
            }
            write!(f, "{}", child)?;
        }
        write!(f, ")")
    }
}

// ============================================================================
// Tree nodes
// ============================================================================

/// A node of a query tree: a leaf filter or a composite.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Phenotype(Phenotype),
    Query(Query),
}

impl QueryNode {
    /// Parse a wire predicate, dispatching on its shape.
    pub fn parse(value: &Value) -> Result<Self, MalformedPredicateError> {
        match value {
            Value::Object(object) if object.contains_key("field") => {
                Phenotype::from_wire(value).map(QueryNode::Phenotype)
            }
            Value::Object(_) => Query::from_wire(value).map(QueryNode::Query),
            other => Err(MalformedPredicateError::NotAnObject(other.to_string())),
        }
    }

    pub fn to_wire(&self) -> Value {
        match self {
            QueryNode::Phenotype(phenotype) => phenotype.to_wire(),
            QueryNode::Query(query) => query.to_wire(),
        }
    }

    /// `self AND other`. The new query lists `other` first.
    pub fn and(self, other: impl Into<QueryNode>) -> Query {
        Query {
            operator: Operator::And,
            children: vec![other.into(), self],
        }
    }

    /// `self OR other`. The new query lists `other` first.
    pub fn or(self, other: impl Into<QueryNode>) -> Query {
        Query {
            operator: Operator::Or,
            children: vec![other.into(), self],
        }
    }

    pub fn negated(self) -> Query {
        Query::negation(self)
    }

    /// Remove every single-child `AND`/`OR` node, replacing it with its child.
    ///
    /// `NOT` nodes are kept. A root composite with a single child collapses
    /// too; use [`Query::strip_singletons`] to keep the root.
    pub fn normalize(self) -> QueryNode {
        match self {
            QueryNode::Phenotype(phenotype) => QueryNode::Phenotype(phenotype),
            QueryNode::Query(query) => query.normalize(),
        }
    }

    /// All leaves of the tree, depth-first in child order.
    pub fn phenotypes(&self) -> Vec<&Phenotype> {
        let mut out = Vec::new();
        self.collect_phenotypes(&mut out);
        out
    }

    fn collect_phenotypes<'a>(&'a self, out: &mut Vec<&'a Phenotype>) {
        match self {
            QueryNode::Phenotype(phenotype) => out.push(phenotype),
            QueryNode::Query(query) => {
                for child in &query.children {
                    child.collect_phenotypes(out);
                }
            }
        }
    }

    /// True for a composite without children.
    pub fn is_empty(&self) -> bool {
        matches!(self, QueryNode::Query(query) if query.is_empty())
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Phenotype(phenotype) => fmt::Display::fmt(phenotype, f),
            QueryNode::Query(query) => fmt::Display::fmt(query, f),
        }
    }
}

impl From<Phenotype> for QueryNode {
    fn from(phenotype: Phenotype) -> Self {
        QueryNode::Phenotype(phenotype)
    }
}

impl From<Query> for QueryNode {
    fn from(query: Query) -> Self {
        QueryNode::Query(query)
    }
}

impl Serialize for QueryNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for QueryNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        QueryNode::parse(&value).map_err(de::Error::custom)
    }
}

macro_rules! impl_query_ops {
    ($($ty:ty),*) => {$(
        impl<R: Into<QueryNode>> ops::BitAnd<R> for $ty {
            type Output = Query;

            fn bitand(self, rhs: R) -> Query {
                QueryNode::from(self).and(rhs)
            }
        }

        impl<R: Into<QueryNode>> ops::BitOr<R> for $ty {
            type Output = Query;

            fn bitor(self, rhs: R) -> Query {
                QueryNode::from(self).or(rhs)
            }
        }

        impl ops::Not for $ty {
            type Output = Query;

            fn not(self) -> Query {
                QueryNode::from(self).negated()
            }
        }
    )*};
}

impl_query_ops!(Phenotype, Query, QueryNode);
