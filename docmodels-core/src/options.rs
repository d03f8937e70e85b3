//! Option structs for store operations.
//!
//! Every operation takes an explicit options value instead of loosely positioned
//! arguments. Defaults are applied through [`Default`]; callers override individual
//! settings with the fluent setters.

use bson::Document;

use crate::projection::FieldSpec;

/// Options for `find`-style reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Structured projection (`field -> bool`). Empty or `None` returns every field.
    pub projection: Option<Document>,
    /// Structured sort (`field -> 1 | -1`).
    pub sort: Option<Document>,
    /// Maximum number of documents to return.
    pub limit: Option<i64>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the projection; textual specs are adapted to their structured form.
    pub fn projection(mut self, projection: impl Into<FieldSpec>) -> Self {
        self.projection = Some(projection.into().into_projection());
        self
    }

    /// Sets the sort; textual specs are adapted to their structured form.
    pub fn sort(mut self, sort: impl Into<FieldSpec>) -> Self {
        self.sort = Some(sort.into().into_sort());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }
}

/// Which version of the document a find-and-modify operation returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    /// The document as it was before the modification.
    Before,
    /// The document as it is after the modification.
    #[default]
    After,
}

/// Options for find-and-modify operations (`find_one_and_update`, `_replace`, `_delete`).
///
/// Unless overridden, the modified document is returned rather than the original.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifyOptions {
    pub projection: Option<Document>,
    /// Decides which document is modified when the filter matches several.
    pub sort: Option<Document>,
    /// Insert a document when nothing matches. Ignored by deletes.
    pub upsert: bool,
    /// Ignored by deletes, which always return the removed document.
    pub return_document: ReturnDocument,
}

impl ModifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projection(mut self, projection: impl Into<FieldSpec>) -> Self {
        self.projection = Some(projection.into().into_projection());
        self
    }

    pub fn sort(mut self, sort: impl Into<FieldSpec>) -> Self {
        self.sort = Some(sort.into().into_sort());
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    pub fn return_document(mut self, return_document: ReturnDocument) -> Self {
        self.return_document = return_document;
        self
    }
}

/// Whether an update touches the first match or every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateScope {
    One,
    Many,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn modify_options_return_the_modified_document_by_default() {
        assert_eq!(ModifyOptions::default().return_document, ReturnDocument::After);
        assert!(!ModifyOptions::default().upsert);
    }

    #[test]
    fn find_options_adapt_textual_specs() {
        let options = FindOptions::new().projection("name -secret").sort("-age").limit(5);

        assert_eq!(options.projection, Some(doc! { "name": true, "secret": false }));
        assert_eq!(options.sort, Some(doc! { "age": -1 }));
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.skip, None);
    }
}
