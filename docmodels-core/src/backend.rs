//! Storage backend abstraction.
//!
//! [`StoreBackend`] is the narrow interface between the model layer and a document store
//! driver. Each method is one store round trip against a named collection and answers in
//! a fixed shape; the model layer tags those shapes as
//! [`RawResponse`](crate::response::RawResponse)s and hydrates them.
//!
//! Backends never hydrate, validate, retry or page; they forward.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`. A single backend value is shared by every
//! concurrent operation of a [`ModelStore`](crate::store::ModelStore); the store behind it
//! is the sole arbiter of document consistency.

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::Debug;

use crate::{
    error::ModelResult,
    filter::Filter,
    options::{FindOptions, ModifyOptions, UpdateScope},
    response::{DeleteOutcome, UpdateOutcome},
};

/// Abstract interface for document store drivers.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns the documents matching `filter`, honoring projection, sort, skip and limit.
    async fn find(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: FindOptions,
    ) -> ModelResult<Vec<Document>>;

    /// Returns the first document matching `filter`, or `None`.
    async fn find_one(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: FindOptions,
    ) -> ModelResult<Option<Document>>;

    /// Applies update operators (`$set`, `$unset`, `$inc`, ...) to the first match and
    /// returns the document selected by `options.return_document`, or `None`.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Option<Filter>,
        update: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>>;

    /// Replaces the first match with `replacement` and returns the selected document.
    async fn find_one_and_replace(
        &self,
        collection: &str,
        filter: Option<Filter>,
        replacement: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>>;

    /// Deletes the first match and returns it.
    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>>;

    /// Inserts documents in order and returns the `_id` of each, in the same order.
    ///
    /// Documents without an `_id` get one assigned by the store.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> ModelResult<Vec<Bson>>;

    /// Applies update operators to the first match or to every match.
    async fn update(
        &self,
        collection: &str,
        filter: Option<Filter>,
        update: Document,
        scope: UpdateScope,
        upsert: bool,
    ) -> ModelResult<UpdateOutcome>;

    /// Replaces the first match with `replacement`.
    async fn replace_one(
        &self,
        collection: &str,
        filter: Option<Filter>,
        replacement: Document,
        upsert: bool,
    ) -> ModelResult<UpdateOutcome>;

    /// Deletes the first match or every match.
    async fn delete(
        &self,
        collection: &str,
        filter: Option<Filter>,
        scope: UpdateScope,
    ) -> ModelResult<DeleteOutcome>;

    /// Counts the documents matching `filter`.
    async fn count(&self, collection: &str, filter: Option<Filter>) -> ModelResult<u64>;

    /// Returns the distinct values of `field` among the documents matching `filter`.
    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: Option<Filter>,
    ) -> ModelResult<Vec<Bson>>;

    /// Runs an aggregation pipeline.
    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> ModelResult<Vec<Document>>;

    /// Cleanly shuts down the backend, closing its connections.
    ///
    /// Operations still in flight fail with a backend error.
    async fn shutdown(self) -> ModelResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn find(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: FindOptions,
    ) -> ModelResult<Vec<Document>> {
        (*self).find(collection, filter, options).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: FindOptions,
    ) -> ModelResult<Option<Document>> {
        (*self).find_one(collection, filter, options).await
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Option<Filter>,
        update: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        (*self)
            .find_one_and_update(collection, filter, update, options)
            .await
    }

    async fn find_one_and_replace(
        &self,
        collection: &str,
        filter: Option<Filter>,
        replacement: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        (*self)
            .find_one_and_replace(collection, filter, replacement, options)
            .await
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        (*self)
            .find_one_and_delete(collection, filter, options)
            .await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> ModelResult<Vec<Bson>> {
        (*self).insert_many(collection, documents).await
    }

    async fn update(
        &self,
        collection: &str,
        filter: Option<Filter>,
        update: Document,
        scope: UpdateScope,
        upsert: bool,
    ) -> ModelResult<UpdateOutcome> {
        (*self)
            .update(collection, filter, update, scope, upsert)
            .await
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Option<Filter>,
        replacement: Document,
        upsert: bool,
    ) -> ModelResult<UpdateOutcome> {
        (*self)
            .replace_one(collection, filter, replacement, upsert)
            .await
    }

    async fn delete(
        &self,
        collection: &str,
        filter: Option<Filter>,
        scope: UpdateScope,
    ) -> ModelResult<DeleteOutcome> {
        (*self).delete(collection, filter, scope).await
    }

    async fn count(&self, collection: &str, filter: Option<Filter>) -> ModelResult<u64> {
        (*self).count(collection, filter).await
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: Option<Filter>,
    ) -> ModelResult<Vec<Bson>> {
        (*self).distinct(collection, field, filter).await
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> ModelResult<Vec<Document>> {
        (*self).aggregate(collection, pipeline).await
    }
}

/// Factory for backends, carrying their configuration.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    /// Opens the backend.
    async fn build(self) -> ModelResult<Self::Backend>;
}
