//! Filter expressions for selecting documents.
//!
//! A [`Filter`] is a small expression tree that every backend understands: the MongoDB
//! backend translates it into a query document, the in-memory backend evaluates it
//! directly. Both do so through the [`FilterVisitor`] trait.
//!
//! ```ignore
//! use docmodels::filter::Filter;
//!
//! let filter = Filter::eq("status", "active")
//!     .and(Filter::gte("age", 18))
//!     .and(Filter::in_("role", vec!["admin", "owner"]));
//! ```
//!
//! Operations accept `Option<Filter>`; `None` matches every document.

use bson::Bson;

use crate::error::ModelError;

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Field value is one of the values of an array operand.
    In,
    /// Field value is none of the values of an array operand.
    Nin,
}

/// A filter expression over document fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// All expressions must match.
    And(Vec<Filter>),
    /// Any expression must match.
    Or(Vec<Filter>),
    /// The inner expression must not match.
    Not(Box<Filter>),
    /// The field must (or must not) be present.
    Exists(String, bool),
    /// Compares a field against a value.
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Filter {
    pub fn field(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Self {
        Filter::Field {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(field, FieldOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(field, FieldOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(field, FieldOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(field, FieldOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(field, FieldOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(field, FieldOp::Lte, value)
    }

    /// Matches documents whose field equals any of `values`.
    pub fn in_<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::field(
            field,
            FieldOp::In,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Matches documents whose field equals none of `values`.
    pub fn nin<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::field(
            field,
            FieldOp::Nin,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Filter::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Self {
        Filter::Exists(field.into(), false)
    }

    /// Matches the document with the given (already coerced) identifier.
    pub fn id(value: impl Into<Bson>) -> Self {
        Self::eq("_id", value)
    }

    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Combines this filter with another using logical AND, flattening nested ANDs.
    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut list) => {
                list.push(other);
                Filter::And(list)
            }
            _ => Filter::And(vec![self, other]),
        }
    }

    /// Combines this filter with another using logical OR, flattening nested ORs.
    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut list) => {
                list.push(other);
                Filter::Or(list)
            }
            _ => Filter::Or(vec![self, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Filter::Not(Box::new(self))
    }
}

/// Walks a [`Filter`] tree, producing one output per node.
pub trait FilterVisitor {
    type Output;
    type Error: Into<ModelError>;

    fn visit_and(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error>;
    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error>;
    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error>;

    fn visit_filter(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error> {
        match filter {
            Filter::And(filters) => self.visit_and(filters),
            Filter::Or(filters) => self.visit_or(filters),
            Filter::Not(filter) => self.visit_not(filter),
            Filter::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Filter::Field { field, op, value } => self.visit_field(field, *op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_flattens_chains() {
        let filter = Filter::eq("a", 1).and(Filter::eq("b", 2)).and(Filter::eq("c", 3));

        match filter {
            Filter::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn in_builds_array_operand() {
        assert_eq!(
            Filter::in_("_id", vec!["A", "B"]),
            Filter::Field {
                field: "_id".into(),
                op: FieldOp::In,
                value: Bson::Array(vec![Bson::from("A"), Bson::from("B")]),
            },
        );
    }
}
