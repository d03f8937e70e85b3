//! A small aggregation pipeline interpreter.
//!
//! Supports the `$match`, `$sort`, `$skip`, `$limit`, `$project` and `$count` stages.
//! `$match` accepts query documents built from field equalities, the comparison operators
//! (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`, `$not`) and the
//! logical operators (`$and`, `$or`, `$nor`).

use bson::{Bson, Document};

use docmodels_core::{
    error::{ModelError, ModelResult},
    filter::{FieldOp, Filter},
};

use crate::{
    evaluator::{DocumentEvaluator, compare_by},
    update::project,
};

/// Runs `pipeline` over `documents`.
pub(crate) fn run(documents: Vec<Document>, pipeline: &[Document]) -> ModelResult<Vec<Document>> {
    let mut documents = documents;

    for stage in pipeline {
        let mut entries = stage.iter();
        let (name, spec) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(ModelError::InvalidFilter(format!(
                    "pipeline stages have exactly one operator, found {stage}"
                )));
            }
        };

        documents = match name.as_str() {
            "$match" => {
                let filter = parse_query(as_document(name, spec)?)?;
                let mut matched = Vec::with_capacity(documents.len());

                for document in documents {
                    if DocumentEvaluator::matches(&document, Some(&filter))? {
                        matched.push(document);
                    }
                }

                matched
            }
            "$sort" => {
                let sort = as_document(name, spec)?;
                documents.sort_by(|a, b| compare_by(sort, a, b));
                documents
            }
            "$skip" => documents.into_iter().skip(as_count(name, spec)?).collect(),
            "$limit" => documents.into_iter().take(as_count(name, spec)?).collect(),
            "$project" => {
                let projection = as_document(name, spec)?;
                documents
                    .into_iter()
                    .map(|document| project(document, Some(projection)))
                    .collect()
            }
            "$count" => {
                let field = spec.as_str().ok_or_else(|| {
                    ModelError::InvalidFilter(format!("$count takes a field name, found {spec}"))
                })?;

                match documents.len() {
                    0 => Vec::new(),
                    count => {
                        let mut result = Document::new();
                        result.insert(field, count as i64);
                        vec![result]
                    }
                }
            }
            other => {
                return Err(ModelError::InvalidFilter(format!("unsupported pipeline stage {other}")));
            }
        };
    }

    Ok(documents)
}

fn as_document<'a>(stage: &str, spec: &'a Bson) -> ModelResult<&'a Document> {
    spec.as_document()
        .ok_or_else(|| ModelError::InvalidFilter(format!("{stage} takes a document, found {spec}")))
}

fn as_count(stage: &str, spec: &Bson) -> ModelResult<usize> {
    match spec {
        Bson::Int32(n) if *n >= 0 => Ok(*n as usize),
        Bson::Int64(n) if *n >= 0 => Ok(*n as usize),
        other => Err(ModelError::InvalidFilter(format!(
            "{stage} takes a non-negative integer, found {other}"
        ))),
    }
}

/// Parses a query document into a [`Filter`].
pub(crate) fn parse_query(query: &Document) -> ModelResult<Filter> {
    let mut filters = Vec::with_capacity(query.len());

    for (key, value) in query {
        let filter = match key.as_str() {
            "$and" => Filter::And(parse_clauses(key, value)?),
            "$or" => Filter::Or(parse_clauses(key, value)?),
            "$nor" => Filter::Or(parse_clauses(key, value)?).not(),
            other if other.starts_with('$') => {
                return Err(ModelError::InvalidFilter(format!("unsupported query operator {other}")));
            }
            field => match value {
                Bson::Document(ops) if is_operator_document(ops) => parse_operators(field, ops)?,
                value => Filter::eq(field, value.clone()),
            },
        };

        filters.push(filter);
    }

    Ok(match filters.len() {
        1 => filters.remove(0),
        _ => Filter::And(filters),
    })
}

fn parse_clauses(operator: &str, value: &Bson) -> ModelResult<Vec<Filter>> {
    let clauses = value.as_array().ok_or_else(|| {
        ModelError::InvalidFilter(format!("{operator} takes an array of queries, found {value}"))
    })?;

    clauses
        .iter()
        .map(|clause| match clause {
            Bson::Document(clause) => parse_query(clause),
            other => Err(ModelError::InvalidFilter(format!(
                "{operator} takes an array of queries, found {other}"
            ))),
        })
        .collect()
}

fn is_operator_document(document: &Document) -> bool {
    !document.is_empty() && document.keys().all(|key| key.starts_with('$'))
}

fn parse_operators(field: &str, ops: &Document) -> ModelResult<Filter> {
    let mut filters = Vec::with_capacity(ops.len());

    for (op, value) in ops {
        let filter = match op.as_str() {
            "$eq" => Filter::field(field, FieldOp::Eq, value.clone()),
            "$ne" => Filter::field(field, FieldOp::Ne, value.clone()),
            "$gt" => Filter::field(field, FieldOp::Gt, value.clone()),
            "$gte" => Filter::field(field, FieldOp::Gte, value.clone()),
            "$lt" => Filter::field(field, FieldOp::Lt, value.clone()),
            "$lte" => Filter::field(field, FieldOp::Lte, value.clone()),
            "$in" => Filter::field(field, FieldOp::In, value.clone()),
            "$nin" => Filter::field(field, FieldOp::Nin, value.clone()),
            "$exists" => Filter::Exists(field.to_string(), value.as_bool().unwrap_or(true)),
            "$not" => match value {
                Bson::Document(inner) => parse_operators(field, inner)?.not(),
                other => {
                    return Err(ModelError::InvalidFilter(format!(
                        "$not takes an operator document, found {other}"
                    )));
                }
            },
            other => {
                return Err(ModelError::InvalidFilter(format!("unsupported query operator {other}")));
            }
        };

        filters.push(filter);
    }

    Ok(match filters.len() {
        1 => filters.remove(0),
        _ => Filter::And(filters),
    })
}
