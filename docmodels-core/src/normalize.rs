//! Result normalization: turning raw store responses into model instances.
//!
//! [`normalize`] is the single place where store answers become [`Instance`]s. It takes the
//! result of a store call as is, so errors flow through it untouched, and matches
//! exhaustively over the [`RawResponse`] shapes.

use bson::{Bson, Document};
use std::fmt;

use crate::{
    error::{ModelError, ModelResult},
    model::{Instance, Model},
    response::RawResponse,
};

/// Documents written by an insert, hydrated, together with the identifiers the store
/// reported for them.
pub struct InsertOutcome<M: Model> {
    pub instances: Vec<Instance<M>>,
    pub inserted_ids: Vec<Bson>,
}

impl<M: Model> Clone for InsertOutcome<M> {
    fn clone(&self) -> Self {
        Self {
            instances: self.instances.clone(),
            inserted_ids: self.inserted_ids.clone(),
        }
    }
}

impl<M: Model> PartialEq for InsertOutcome<M> {
    fn eq(&self, other: &Self) -> bool {
        self.instances == other.instances && self.inserted_ids == other.inserted_ids
    }
}

impl<M: Model> fmt::Debug for InsertOutcome<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertOutcome")
            .field("instances", &self.instances)
            .field("inserted_ids", &self.inserted_ids)
            .finish()
    }
}

impl<M: Model> InsertOutcome<M> {
    pub fn inserted_count(&self) -> usize {
        self.inserted_ids.len()
    }
}

/// A normalized store response.
pub enum Normalized<M: Model> {
    /// Every document of a list response, in order.
    Many(Vec<Instance<M>>),
    /// A single document, or `None` when nothing was found or matched.
    One(Option<Instance<M>>),
    /// Hydrated inserted documents along with the insert metadata.
    Inserted(InsertOutcome<M>),
    /// A value that is not a document, passed through unchanged.
    Scalar(Bson),
}

impl<M: Model> Clone for Normalized<M> {
    fn clone(&self) -> Self {
        match self {
            Normalized::Many(instances) => Normalized::Many(instances.clone()),
            Normalized::One(instance) => Normalized::One(instance.clone()),
            Normalized::Inserted(outcome) => Normalized::Inserted(outcome.clone()),
            Normalized::Scalar(value) => Normalized::Scalar(value.clone()),
        }
    }
}

impl<M: Model> PartialEq for Normalized<M> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Normalized::Many(a), Normalized::Many(b)) => a == b,
            (Normalized::One(a), Normalized::One(b)) => a == b,
            (Normalized::Inserted(a), Normalized::Inserted(b)) => a == b,
            (Normalized::Scalar(a), Normalized::Scalar(b)) => a == b,
            _ => false,
        }
    }
}

impl<M: Model> fmt::Debug for Normalized<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalized::Many(instances) => f.debug_tuple("Many").field(instances).finish(),
            Normalized::One(instance) => f.debug_tuple("One").field(instance).finish(),
            Normalized::Inserted(outcome) => f.debug_tuple("Inserted").field(outcome).finish(),
            Normalized::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
        }
    }
}

impl<M: Model> Normalized<M> {
    fn kind(&self) -> &'static str {
        match self {
            Normalized::Many(_) => "many",
            Normalized::One(_) => "one",
            Normalized::Inserted(_) => "inserted",
            Normalized::Scalar(_) => "scalar",
        }
    }

    pub fn into_many(self) -> ModelResult<Vec<Instance<M>>> {
        match self {
            Normalized::Many(instances) => Ok(instances),
            other => Err(other.mismatch("many")),
        }
    }

    pub fn into_one(self) -> ModelResult<Option<Instance<M>>> {
        match self {
            Normalized::One(instance) => Ok(instance),
            other => Err(other.mismatch("one")),
        }
    }

    pub fn into_inserted(self) -> ModelResult<InsertOutcome<M>> {
        match self {
            Normalized::Inserted(outcome) => Ok(outcome),
            other => Err(other.mismatch("inserted")),
        }
    }

    pub fn into_scalar(self) -> ModelResult<Bson> {
        match self {
            Normalized::Scalar(value) => Ok(value),
            other => Err(other.mismatch("scalar")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> ModelError {
        ModelError::UnexpectedResponse { expected, found: self.kind() }
    }
}

fn hydrate_all<M: Model>(documents: Vec<Document>) -> Vec<Instance<M>> {
    documents
        .into_iter()
        .map(Instance::new)
        .collect()
}

/// Normalizes the result of a store call into model instances.
///
/// An `Err` is returned untouched without attempting any hydration. Otherwise:
///
/// - a list becomes [`Normalized::Many`], order preserved, empty stays empty;
/// - a single document or a find-and-modify wrapper becomes [`Normalized::One`], with
///   `None` when nothing was found (not an error);
/// - an insert batch becomes [`Normalized::Inserted`], keeping the inserted ids;
/// - a scalar is passed through as [`Normalized::Scalar`].
pub fn normalize<M: Model>(result: ModelResult<RawResponse>) -> ModelResult<Normalized<M>> {
    let response = result?;

    tracing::trace!(collection = M::collection_name(), kind = response.kind(), "normalizing response");

    Ok(match response {
        RawResponse::List(documents) => Normalized::Many(hydrate_all(documents)),
        RawResponse::Single(document) | RawResponse::MutateWrapper(document) => {
            Normalized::One(document.map(Instance::new))
        }
        RawResponse::InsertBatch { documents, inserted_ids } => Normalized::Inserted(InsertOutcome {
            instances: hydrate_all(documents),
            inserted_ids,
        }),
        RawResponse::Scalar(value) => Normalized::Scalar(value),
    })
}
