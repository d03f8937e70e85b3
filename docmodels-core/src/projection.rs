//! Field projection and sort specification adapters.
//!
//! Projections and sorts can be written either as structured BSON documents, which are
//! handed to the store untouched, or in a compact textual form:
//!
//! ```ignore
//! use docmodels::projection::{fields_adapter, sort_adapter};
//! use bson::doc;
//!
//! assert_eq!(fields_adapter("name -password email"), doc! { "name": true, "password": false, "email": true });
//! assert_eq!(sort_adapter("-created_at name"), doc! { "created_at": -1, "name": 1 });
//! ```
//!
//! Each whitespace separated token names a field; a leading `-` marks it as excluded
//! (projection) or descending (sort). Whether inclusion and exclusion may be mixed is left
//! to the store to decide.

use bson::{Bson, Document};

/// A projection or sort specification in either of its accepted forms.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    /// Whitespace separated field names, `-` prefixed for exclusion/descending.
    Text(String),
    /// An already structured specification.
    Structured(Document),
}

impl FieldSpec {
    /// Converts this spec into a projection document (`field -> bool`).
    pub fn into_projection(self) -> Document {
        match self {
            FieldSpec::Structured(document) => document,
            FieldSpec::Text(text) => tokens(&text)
                .map(|(field, negated)| (field.to_string(), Bson::Boolean(!negated)))
                .collect(),
        }
    }

    /// Converts this spec into a sort document (`field -> 1 | -1`).
    pub fn into_sort(self) -> Document {
        match self {
            FieldSpec::Structured(document) => document,
            FieldSpec::Text(text) => tokens(&text)
                .map(|(field, negated)| (field.to_string(), Bson::Int32(if negated { -1 } else { 1 })))
                .collect(),
        }
    }

    /// Returns `true` when no field is named at all.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldSpec::Structured(document) => document.is_empty(),
            FieldSpec::Text(text) => tokens(text).next().is_none(),
        }
    }
}

impl Default for FieldSpec {
    fn default() -> Self {
        FieldSpec::Structured(Document::new())
    }
}

impl From<&str> for FieldSpec {
    fn from(text: &str) -> Self {
        FieldSpec::Text(text.to_string())
    }
}

impl From<String> for FieldSpec {
    fn from(text: String) -> Self {
        FieldSpec::Text(text)
    }
}

impl From<Document> for FieldSpec {
    fn from(document: Document) -> Self {
        FieldSpec::Structured(document)
    }
}

/// Yields `(field, has_minus_prefix)` for every non-empty token.
fn tokens(text: &str) -> impl Iterator<Item = (&str, bool)> {
    text.split_whitespace()
        .map(|token| match token.strip_prefix('-') {
            Some(field) => (field, true),
            None => (token, false),
        })
}

/// Normalizes a projection spec into its structured form.
pub fn fields_adapter(spec: impl Into<FieldSpec>) -> Document {
    spec.into().into_projection()
}

/// Normalizes a sort spec into its structured form.
pub fn sort_adapter(spec: impl Into<FieldSpec>) -> Document {
    spec.into().into_sort()
}

/// Returns `true` when the projection selects fields by inclusion.
///
/// A projection selecting only `_id` is an inclusion projection; otherwise `_id` does not
/// decide the style. A projection with no `true`-ish value is an exclusion projection (or
/// empty).
pub(crate) fn is_inclusion(projection: &Document) -> bool {
    match projection.keys().any(|key| key != "_id") {
        true => projection
            .iter()
            .any(|(key, value)| key != "_id" && selects(value)),
        false => projection.get("_id").is_some_and(selects),
    }
}

fn selects(value: &Bson) -> bool {
    match value {
        Bson::Boolean(flag) => *flag,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        // Expressions such as `$slice` or `$elemMatch` select the field.
        _ => true,
    }
}

/// Makes sure `field` is returned by the store under `projection`.
///
/// Inclusion projections get `field: true` set over them; exclusion projections lose any
/// exclusion of `field`; an empty projection already returns every field.
pub(crate) fn force_include(projection: Document, field: &str) -> Document {
    let mut projection = projection;

    if is_inclusion(&projection) {
        projection.insert(field, true);
    } else {
        projection.remove(field);
    }

    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn text_projection_marks_exclusions() {
        assert_eq!(
            fields_adapter("a -b c"),
            doc! { "a": true, "b": false, "c": true },
        );
    }

    #[test]
    fn structured_specs_pass_through() {
        let projection = doc! { "a": true };
        assert_eq!(fields_adapter(projection.clone()), projection);
        assert_eq!(fields_adapter(fields_adapter(projection.clone())), projection);

        let sort = doc! { "name": -1, "age": 1 };
        assert_eq!(sort_adapter(sort.clone()), sort);
    }

    #[test]
    fn empty_text_yields_empty_document() {
        assert_eq!(fields_adapter(""), Document::new());
        assert_eq!(sort_adapter("   \t "), Document::new());
        assert!(FieldSpec::from("  ").is_empty());
    }

    #[test]
    fn text_sort_uses_minus_for_descending() {
        assert_eq!(
            sort_adapter("  -created   name\n-score "),
            doc! { "created": -1, "name": 1, "score": -1 },
        );
    }

    #[test]
    fn force_include_respects_projection_style() {
        assert_eq!(
            force_include(doc! { "name": true }, "owner"),
            doc! { "name": true, "owner": true },
        );
        assert_eq!(
            force_include(doc! { "name": false, "owner": false }, "owner"),
            doc! { "name": false },
        );
        assert_eq!(force_include(Document::new(), "owner"), Document::new());
        assert_eq!(
            force_include(doc! { "_id": false, "owner": 0 }, "owner"),
            doc! { "_id": false },
        );
    }

    #[test]
    fn id_only_projection_is_an_inclusion() {
        assert!(is_inclusion(&doc! { "_id": 1 }));
        assert!(is_inclusion(&fields_adapter("_id")));
        assert!(!is_inclusion(&doc! { "_id": 0 }));
        assert!(!is_inclusion(&doc! { "_id": 1, "body": 0 }));

        assert_eq!(
            force_include(doc! { "_id": 1 }, "fk"),
            doc! { "_id": 1, "fk": true },
        );
        assert_eq!(
            force_include(fields_adapter("_id"), "fk"),
            doc! { "_id": true, "fk": true },
        );
    }
}
