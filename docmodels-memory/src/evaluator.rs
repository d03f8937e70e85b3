//! Filter evaluation for in-memory document matching.
//!
//! This module provides the evaluation engine for [`Filter`] expressions and the value
//! ordering used for sorting, following the document store's matching rules closely
//! enough for tests and local development: an equality against an array field matches
//! any element, a missing field is treated as null, and values of different types never
//! compare as greater or lesser.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, DateTime, Document, oid::ObjectId};

use docmodels_core::{
    error::{ModelError, ModelResult},
    filter::{FieldOp, Filter, FilterVisitor},
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 for comparison. Values without a dedicated
/// variant compare by BSON equality only.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position of the value's type in the cross-type sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Other(_) => 5,
            Comparable::ObjectId(_) => 6,
            Comparable::Bool(_) => 7,
            Comparable::DateTime(_) => 8,
        }
    }

    /// Total order used for sorting: by type first, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a possibly dotted `path` (`"author.name"`) inside `document`.
pub(crate) fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    match path.split_once('.') {
        None => document.get(path),
        Some((head, rest)) => match document.get(head)? {
            Bson::Document(inner) => get_path(inner, rest),
            _ => None,
        },
    }
}

/// Compares two documents by the fields of a structured sort (`field -> 1 | -1`).
pub(crate) fn compare_by(sort: &Document, left: &Document, right: &Document) -> Ordering {
    for (field, direction) in sort {
        let null = Bson::Null;
        let a = Comparable::from(get_path(left, field).unwrap_or(&null));
        let b = Comparable::from(get_path(right, field).unwrap_or(&null));

        let ordering = match is_descending(direction) {
            true => b.sort_cmp(&a),
            false => a.sort_cmp(&b),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn is_descending(direction: &Bson) -> bool {
    match direction {
        Bson::Int32(n) => *n < 0,
        Bson::Int64(n) => *n < 0,
        Bson::Double(n) => *n < 0.0,
        Bson::String(text) => text.eq_ignore_ascii_case("desc") || text.eq_ignore_ascii_case("descending"),
        _ => false,
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, filter: &Filter) -> ModelResult<bool> {
        self.visit_filter(filter)
    }

    /// Returns whether `document` matches `filter`; no filter matches everything.
    pub fn matches(document: &Document, filter: Option<&Filter>) -> ModelResult<bool> {
        match filter {
            Some(filter) => DocumentEvaluator::new(document).evaluate(filter),
            None => Ok(true),
        }
    }

    /// Returns the positions of the documents matching `filter`, in order.
    pub fn matching_positions(
        documents: &[Document],
        filter: Option<&Filter>,
    ) -> ModelResult<Vec<usize>> {
        let mut positions = Vec::new();

        for (position, document) in documents.iter().enumerate() {
            if Self::matches(document, filter)? {
                positions.push(position);
            }
        }

        Ok(positions)
    }

    /// Whether `field_value` equals `value`, element-wise for array fields.
    fn equals(field_value: &Bson, value: &Bson) -> bool {
        let expected = Comparable::from(value);

        match Comparable::from(field_value) {
            Comparable::Array(items) => {
                items.iter().any(|item| item == &expected) || Comparable::Array(items) == expected
            }
            actual => actual == expected,
        }
    }

    fn compare(field_value: &Bson, op: FieldOp, value: &Bson) -> bool {
        let expected = Comparable::from(value);
        let holds = |actual: &Comparable| match actual.partial_cmp(&expected) {
            Some(ordering) => match op {
                FieldOp::Gt => ordering == Ordering::Greater,
                FieldOp::Gte => ordering != Ordering::Less,
                FieldOp::Lt => ordering == Ordering::Less,
                FieldOp::Lte => ordering != Ordering::Greater,
                _ => false,
            },
            None => false,
        };

        match Comparable::from(field_value) {
            Comparable::Array(items) => items.iter().any(|item| holds(item)),
            actual => holds(&actual),
        }
    }

    fn any_of(field_value: &Bson, values: &Bson) -> ModelResult<bool> {
        match values {
            Bson::Array(values) => Ok(values.iter().any(|value| Self::equals(field_value, value))),
            other => Err(ModelError::InvalidFilter(format!(
                "$in and $nin take an array, found {other}"
            ))),
        }
    }
}

impl<'a> FilterVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = ModelError;

    fn visit_and(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error> {
        for filter in filters {
            if !self.visit_filter(filter)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error> {
        for filter in filters {
            if self.visit_filter(filter)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_filter(filter)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(get_path(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        // Missing fields compare as null.
        let null = Bson::Null;
        let field_value = get_path(self.document, field).unwrap_or(&null);

        match op {
            FieldOp::Eq => Ok(Self::equals(field_value, value)),
            FieldOp::Ne => Ok(!Self::equals(field_value, value)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                Ok(Self::compare(field_value, op, value))
            }
            FieldOp::In => Self::any_of(field_value, value),
            FieldOp::Nin => Ok(!Self::any_of(field_value, value)?),
        }
    }
}
