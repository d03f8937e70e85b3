//! Raw store responses and mutation outcomes.
//!
//! Store operations answer in different shapes: lists of documents, a single optional
//! document, the optional document of a find-and-modify, a batch of inserted documents,
//! or a plain scalar. [`RawResponse`] tags each shape explicitly so that the
//! [normalizer](crate::normalize) can match on it instead of guessing from field names.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// An untyped response from the store, tagged by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// An ordered sequence of documents (`find`).
    List(Vec<Document>),
    /// A single document, or none (`find_one`).
    Single(Option<Document>),
    /// The matched document of a find-and-modify operation, or none when nothing matched.
    MutateWrapper(Option<Document>),
    /// Documents written by an insert, with the identifiers the store reported for them.
    InsertBatch {
        documents: Vec<Document>,
        inserted_ids: Vec<Bson>,
    },
    /// Counts, acknowledgements and other non-document values.
    Scalar(Bson),
}

impl RawResponse {
    /// Short name of the response shape, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawResponse::List(_) => "list",
            RawResponse::Single(_) => "single",
            RawResponse::MutateWrapper(_) => "mutate wrapper",
            RawResponse::InsertBatch { .. } => "insert batch",
            RawResponse::Scalar(_) => "scalar",
        }
    }
}

impl From<Vec<Document>> for RawResponse {
    fn from(documents: Vec<Document>) -> Self {
        RawResponse::List(documents)
    }
}

impl From<Option<Document>> for RawResponse {
    fn from(document: Option<Document>) -> Self {
        RawResponse::Single(document)
    }
}

impl From<u64> for RawResponse {
    fn from(value: u64) -> Self {
        RawResponse::Scalar(Bson::Int64(value as i64))
    }
}

/// Counters reported by update and replace operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    /// The `_id` of the inserted document when an upsert created one.
    pub upserted_id: Option<Bson>,
}

/// Counters reported by delete operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}
