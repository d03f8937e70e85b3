//! Error types and result types for model operations.
//!
//! Store and driver failures, id coercion failures and serialization failures are
//! returned as [`ModelError`] through [`ModelResult<T>`]. Schema validation failures are
//! different: they are captured as a [`ValidationError`] and attached to the
//! [`Instance`](crate::model::Instance) that failed, so constructing an instance never
//! fails outright.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when working with models and their store.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// An identifier could not be coerced into the identifier type of a model.
    ///
    /// Id-keyed operations return this before any store round trip is issued.
    #[error("Invalid id: {0}")]
    InvalidId(String),
    /// The document has an invalid structure (for example a non-document where one is required).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A filter, update or projection could not be interpreted by the backend.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    /// The normalized response does not have the shape the caller asked for.
    #[error("Unexpected response: expected {expected}, found {found}")]
    UnexpectedResponse {
        expected: &'static str,
        found: &'static str,
    },
    /// An error occurred in the underlying storage backend. Surfaced verbatim, never retried.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

impl From<BsonError> for ModelError {
    fn from(err: BsonError) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for ModelError {
    fn from(err: SerdeJsonError) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

/// A schema mismatch reported by [`Model::validate`](crate::model::Model::validate).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}{message}", field_prefix(.field))]
pub struct ValidationError {
    /// The offending field, when the failure can be pinned to one.
    pub field: Option<String>,
    /// Human readable description of the failure.
    pub message: String,
}

fn field_prefix(field: &Option<String>) -> String {
    match field {
        Some(field) => format!("\"{field}\" "),
        None => String::new(),
    }
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { field: None, message: message.into() }
    }

    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_names_the_field() {
        let err = ValidationError::for_field("email", "is required");
        assert_eq!(err.to_string(), "\"email\" is required");

        let err = ValidationError::new("document is empty");
        assert_eq!(err.to_string(), "document is empty");
    }
}
