//! Document rewriting: update operators, replacements, projections and upsert seeds.

use bson::{Bson, Document};

use docmodels_core::{
    error::{ModelError, ModelResult},
    filter::{FieldOp, Filter},
};

/// Applies update operators to `document`. `inserting` enables `$setOnInsert`.
///
/// Supported operators: `$set`, `$unset`, `$inc`, `$push` and `$setOnInsert`.
pub(crate) fn apply_update(document: &mut Document, update: &Document, inserting: bool) -> ModelResult<()> {
    if update.is_empty() {
        return Err(ModelError::InvalidDocument("update document is empty".to_string()));
    }

    for (operator, fields) in update {
        let fields = match fields {
            Bson::Document(fields) => fields,
            other => {
                return Err(ModelError::InvalidDocument(format!(
                    "{operator} takes a document, found {other}"
                )));
            }
        };

        for (path, value) in fields {
            if path == "_id" && operator != "$setOnInsert" {
                return Err(ModelError::InvalidDocument("_id cannot be updated".to_string()));
            }

            match operator.as_str() {
                "$set" => set_path(document, path, value.clone())?,
                "$setOnInsert" => {
                    if inserting {
                        set_path(document, path, value.clone())?;
                    }
                }
                "$unset" => {
                    remove_path(document, path);
                }
                "$inc" => {
                    let current = get_path_mut(document, path).map(|current| current.clone());
                    set_path(document, path, increment(path, current, value)?)?;
                }
                "$push" => {
                    let mut items = match get_path_mut(document, path).map(|current| current.clone()) {
                        None | Some(Bson::Null) => Vec::new(),
                        Some(Bson::Array(items)) => items,
                        Some(other) => {
                            return Err(ModelError::InvalidDocument(format!(
                                "cannot $push to {path}, which holds {other}"
                            )));
                        }
                    };
                    items.push(value.clone());
                    set_path(document, path, Bson::Array(items))?;
                }
                other if other.starts_with('$') => {
                    return Err(ModelError::InvalidDocument(format!("unsupported update operator {other}")));
                }
                other => {
                    return Err(ModelError::InvalidDocument(format!(
                        "update documents may only contain operators, found {other}"
                    )));
                }
            }
        }
    }

    Ok(())
}

fn increment(path: &str, current: Option<Bson>, by: &Bson) -> ModelResult<Bson> {
    let current = current.unwrap_or(Bson::Int32(0));

    match (&current, by) {
        (Bson::Int32(a), Bson::Int32(b)) => Ok(a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(*a as i64 + *b as i64))),
        (Bson::Int32(a), Bson::Int64(b)) => Ok(Bson::Int64(*a as i64 + b)),
        (Bson::Int64(a), Bson::Int32(b)) => Ok(Bson::Int64(a + *b as i64)),
        (Bson::Int64(a), Bson::Int64(b)) => Ok(Bson::Int64(a + b)),
        (Bson::Double(a), b) => as_f64(b).map(|b| Bson::Double(a + b)),
        (a, Bson::Double(b)) => as_f64(a).map(|a| Bson::Double(a + b)),
        _ => Err(ModelError::InvalidDocument(format!(
            "cannot $inc {path} ({current}) by {by}"
        ))),
    }
}

fn as_f64(value: &Bson) -> ModelResult<f64> {
    match value {
        Bson::Int32(n) => Ok(*n as f64),
        Bson::Int64(n) => Ok(*n as f64),
        Bson::Double(n) => Ok(*n),
        other => Err(ModelError::InvalidDocument(format!("{other} is not a number"))),
    }
}

fn get_path_mut<'a>(document: &'a mut Document, path: &str) -> Option<&'a mut Bson> {
    match path.split_once('.') {
        None => document.get_mut(path),
        Some((head, rest)) => match document.get_mut(head)? {
            Bson::Document(inner) => get_path_mut(inner, rest),
            _ => None,
        },
    }
}

/// Sets a possibly dotted `path`, creating intermediate documents.
fn set_path(document: &mut Document, path: &str, value: Bson) -> ModelResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            let inner = document
                .entry(head.to_string())
                .or_insert_with(|| Bson::Document(Document::new()));

            match inner {
                Bson::Document(inner) => set_path(inner, rest, value),
                other => Err(ModelError::InvalidDocument(format!(
                    "cannot set {path}: {head} holds {other}"
                ))),
            }
        }
    }
}

fn remove_path(document: &mut Document, path: &str) -> Option<Bson> {
    match path.split_once('.') {
        None => document.remove(path),
        Some((head, rest)) => match document.get_mut(head)? {
            Bson::Document(inner) => remove_path(inner, rest),
            _ => None,
        },
    }
}

/// Replaces the content of `document` with `replacement`, keeping its `_id`.
pub(crate) fn apply_replacement(document: &mut Document, replacement: &Document) -> ModelResult<()> {
    if let Some(key) = replacement.keys().find(|key| key.starts_with('$')) {
        return Err(ModelError::InvalidDocument(format!(
            "replacement documents cannot contain operators, found {key}"
        )));
    }

    let id = document.get("_id").cloned();

    if let (Some(id), Some(new_id)) = (&id, replacement.get("_id")) {
        if id != new_id {
            return Err(ModelError::InvalidDocument("_id cannot be replaced".to_string()));
        }
    }

    let mut next = Document::new();
    if let Some(id) = id {
        next.insert("_id", id);
    }
    for (key, value) in replacement {
        next.insert(key.clone(), value.clone());
    }

    *document = next;
    Ok(())
}

/// Builds the starting document of an upsert from the equality conditions of `filter`.
pub(crate) fn seed_from_filter(filter: Option<&Filter>) -> Document {
    fn collect(filter: &Filter, seed: &mut Document) {
        match filter {
            Filter::And(filters) => filters.iter().for_each(|filter| collect(filter, seed)),
            Filter::Field { field, op: FieldOp::Eq, value } => {
                // Seeds are flat; dotted paths are set by update operators.
                if !field.contains('.') {
                    seed.insert(field.clone(), value.clone());
                }
            }
            _ => {}
        }
    }

    let mut seed = Document::new();
    if let Some(filter) = filter {
        collect(filter, &mut seed);
    }

    seed
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(flag) => *flag,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null => false,
        _ => true,
    }
}

/// Returns the fields of `document` selected by a structured projection.
///
/// An inclusion projection keeps the listed fields plus `_id` unless `_id` is excluded, and
/// a projection selecting only `_id` is an inclusion projection;
/// an exclusion projection drops the listed fields. Empty projections keep everything.
pub(crate) fn project(document: Document, projection: Option<&Document>) -> Document {
    let Some(projection) = projection.filter(|projection| !projection.is_empty()) else {
        return document;
    };

    let keep_id = projection.get("_id").map(truthy).unwrap_or(true);
    let inclusion = match projection.keys().any(|field| field != "_id") {
        true => projection
            .iter()
            .any(|(field, value)| field != "_id" && truthy(value)),
        // `{_id: 1}` alone returns only `_id`.
        false => keep_id,
    };

    if inclusion {
        document
            .into_iter()
            .filter(|(field, _)| match field.as_str() {
                "_id" => keep_id,
                field => projection.get(field).map(truthy).unwrap_or(false),
            })
            .collect()
    } else {
        document
            .into_iter()
            .filter(|(field, _)| match field.as_str() {
                "_id" => keep_id,
                field => projection.get(field).map(truthy).unwrap_or(true),
            })
            .collect()
    }
}
