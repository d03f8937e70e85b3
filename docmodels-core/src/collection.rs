//! Model collections.
//!
//! A [`ModelCollection`] is the typed view of one model's collection. Every read and
//! every find-and-modify goes through the [normalizer](crate::normalize), so callers get
//! [`Instance`]s back no matter which shape the store answered in. The join operations
//! live in [`lookup`](crate::lookup).
//!
//! # Example
//!
//! ```ignore
//! use docmodels::prelude::*;
//! use bson::doc;
//!
//! let users = store.model::<User>();
//! let inserted = users.insert_one(doc! { "name": "Alice", "age": 30 }).await?;
//! let id = inserted.inserted_ids[0].clone();
//!
//! let older = users
//!     .find_by_id_and_update(id, doc! { "$inc": { "age": 1 } }, ModifyOptions::default())
//!     .await?;
//!
//! let page = users.paged_find(None, "name age", "-age", 20, 1).await?;
//! ```

use bson::{Bson, Document};
use futures::try_join;
use std::marker::PhantomData;

use crate::{
    backend::StoreBackend,
    error::{ModelError, ModelResult},
    filter::Filter,
    model::{Instance, Model},
    normalize::{InsertOutcome, normalize},
    options::{FindOptions, ModifyOptions, UpdateScope},
    page::{Page, PageMeta},
    projection::FieldSpec,
    response::{RawResponse, UpdateOutcome},
};

/// The collection of model `M`, borrowing the store's backend.
#[derive(Debug)]
pub struct ModelCollection<'a, B: StoreBackend, M: Model> {
    pub(crate) backend: &'a B,
    _marker: PhantomData<fn() -> M>,
}

impl<'a, B: StoreBackend, M: Model> ModelCollection<'a, B, M> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Self { backend, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &'static str {
        M::collection_name()
    }

    /// Switches to the collection of another model on the same backend.
    pub fn with_model<T: Model>(&self) -> ModelCollection<'a, B, T> {
        ModelCollection::new(self.backend)
    }

    fn id_filter(id: impl Into<Bson>) -> ModelResult<Filter> {
        Ok(Filter::id(M::id_kind().coerce(&id.into())?))
    }

    /// Finds every document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the query fails.
    pub async fn find(&self, filter: Option<Filter>, options: FindOptions) -> ModelResult<Vec<Instance<M>>> {
        normalize::<M>(
            self.backend
                .find(self.name(), filter, options)
                .await
                .map(RawResponse::List),
        )?
        .into_many()
    }

    /// Finds the first document matching `filter`.
    pub async fn find_one(&self, filter: Option<Filter>, options: FindOptions) -> ModelResult<Option<Instance<M>>> {
        normalize::<M>(
            self.backend
                .find_one(self.name(), filter, options)
                .await
                .map(RawResponse::Single),
        )?
        .into_one()
    }

    /// Finds the document with the given id, returning the fields selected by `projection`
    /// (every field when empty).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidId`](crate::error::ModelError::InvalidId) without
    /// contacting the store when `id` is not a valid identifier for `M`.
    pub async fn find_by_id(
        &self,
        id: impl Into<Bson>,
        projection: impl Into<FieldSpec>,
    ) -> ModelResult<Option<Instance<M>>> {
        let filter = Self::id_filter(id)?;
        self.find_one(Some(filter), FindOptions::new().projection(projection)).await
    }

    /// Updates the first document matching `filter` and returns it (after the update,
    /// unless `options` asks for the original).
    pub async fn find_one_and_update(
        &self,
        filter: Option<Filter>,
        update: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Instance<M>>> {
        normalize::<M>(
            self.backend
                .find_one_and_update(self.name(), filter, update, options)
                .await
                .map(RawResponse::MutateWrapper),
        )?
        .into_one()
    }

    /// Replaces the first document matching `filter` and returns it.
    pub async fn find_one_and_replace(
        &self,
        filter: Option<Filter>,
        replacement: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Instance<M>>> {
        normalize::<M>(
            self.backend
                .find_one_and_replace(self.name(), filter, replacement, options)
                .await
                .map(RawResponse::MutateWrapper),
        )?
        .into_one()
    }

    /// Deletes the first document matching `filter` and returns it.
    pub async fn find_one_and_delete(
        &self,
        filter: Option<Filter>,
        options: ModifyOptions,
    ) -> ModelResult<Option<Instance<M>>> {
        normalize::<M>(
            self.backend
                .find_one_and_delete(self.name(), filter, options)
                .await
                .map(RawResponse::MutateWrapper),
        )?
        .into_one()
    }

    /// Updates the document with the given id and returns it.
    pub async fn find_by_id_and_update(
        &self,
        id: impl Into<Bson>,
        update: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Instance<M>>> {
        let filter = Self::id_filter(id)?;
        self.find_one_and_update(Some(filter), update, options).await
    }

    /// Deletes the document with the given id and returns it.
    pub async fn find_by_id_and_delete(
        &self,
        id: impl Into<Bson>,
        options: ModifyOptions,
    ) -> ModelResult<Option<Instance<M>>> {
        let filter = Self::id_filter(id)?;
        self.find_one_and_delete(Some(filter), options).await
    }

    /// Inserts one document.
    pub async fn insert_one(&self, document: Document) -> ModelResult<InsertOutcome<M>> {
        self.insert_many(vec![document]).await
    }

    /// Inserts documents in order.
    ///
    /// Documents without an `_id` get one minted for the model's id kind, or assigned by
    /// the store for native ids. The returned instances carry their ids, and the outcome
    /// keeps the ids the store reported.
    pub async fn insert_many(&self, documents: Vec<Document>) -> ModelResult<InsertOutcome<M>> {
        let mut documents = documents;

        for document in documents.iter_mut() {
            if !document.contains_key("_id") {
                if let Some(id) = M::id_kind().generate() {
                    document.insert("_id", id);
                }
            }
        }

        let result = self
            .backend
            .insert_many(self.name(), documents.clone())
            .await
            .map(|inserted_ids| {
                for (document, id) in documents.iter_mut().zip(inserted_ids.iter()) {
                    if !document.contains_key("_id") {
                        document.insert("_id", id.clone());
                    }
                }

                RawResponse::InsertBatch { documents, inserted_ids }
            });

        normalize::<M>(result)?.into_inserted()
    }

    /// Applies update operators to the first document matching `filter`.
    pub async fn update_one(&self, filter: Option<Filter>, update: Document, upsert: bool) -> ModelResult<UpdateOutcome> {
        self.backend
            .update(self.name(), filter, update, UpdateScope::One, upsert)
            .await
    }

    /// Applies update operators to every document matching `filter`.
    pub async fn update_many(&self, filter: Option<Filter>, update: Document, upsert: bool) -> ModelResult<UpdateOutcome> {
        self.backend
            .update(self.name(), filter, update, UpdateScope::Many, upsert)
            .await
    }

    /// Replaces the first document matching `filter`.
    pub async fn replace_one(
        &self,
        filter: Option<Filter>,
        replacement: Document,
        upsert: bool,
    ) -> ModelResult<UpdateOutcome> {
        self.backend
            .replace_one(self.name(), filter, replacement, upsert)
            .await
    }

    /// Deletes the first document matching `filter`, returning how many were deleted.
    pub async fn delete_one(&self, filter: Option<Filter>) -> ModelResult<u64> {
        self.delete(filter, UpdateScope::One).await
    }

    /// Deletes every document matching `filter`, returning how many were deleted.
    pub async fn delete_many(&self, filter: Option<Filter>) -> ModelResult<u64> {
        self.delete(filter, UpdateScope::Many).await
    }

    async fn delete(&self, filter: Option<Filter>, scope: UpdateScope) -> ModelResult<u64> {
        let result = self
            .backend
            .delete(self.name(), filter, scope)
            .await
            .map(|outcome| RawResponse::from(outcome.deleted_count));

        into_count(normalize::<M>(result)?.into_scalar()?)
    }

    /// Counts the documents matching `filter`.
    pub async fn count(&self, filter: Option<Filter>) -> ModelResult<u64> {
        let result = self
            .backend
            .count(self.name(), filter)
            .await
            .map(RawResponse::from);

        into_count(normalize::<M>(result)?.into_scalar()?)
    }

    /// Returns the distinct values of `field`.
    pub async fn distinct(&self, field: &str, filter: Option<Filter>) -> ModelResult<Vec<Bson>> {
        self.backend.distinct(self.name(), field, filter).await
    }

    /// Runs an aggregation pipeline. Results are not hydrated; stages may reshape them freely.
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> ModelResult<Vec<Document>> {
        self.backend.aggregate(self.name(), pipeline).await
    }

    /// Finds one page of the documents matching `filter`.
    ///
    /// The count and the page fetch are issued together; the first failure is returned
    /// and no partial page is produced.
    pub async fn paged_find(
        &self,
        filter: Option<Filter>,
        fields: impl Into<FieldSpec>,
        sort: impl Into<FieldSpec>,
        limit: i64,
        page: i64,
    ) -> ModelResult<Page<Instance<M>>> {
        let options = paged_options(FindOptions::default(), fields.into(), sort.into(), limit, page);

        tracing::debug!(collection = self.name(), limit, page, "paged find");

        let (count, data) = try_join!(self.count(filter.clone()), self.find(filter, options))?;

        Ok(PageMeta::compute(count, limit, page).with_data(data))
    }
}

fn into_count(value: Bson) -> ModelResult<u64> {
    match value {
        Bson::Int64(n) if n >= 0 => Ok(n as u64),
        Bson::Int32(n) if n >= 0 => Ok(n as u64),
        other => Err(ModelError::Backend(format!("store returned {other} as a count"))),
    }
}

/// Folds projection, sort, limit and skip of one page into `options`.
pub(crate) fn paged_options(
    options: FindOptions,
    fields: FieldSpec,
    sort: FieldSpec,
    limit: i64,
    page: i64,
) -> FindOptions {
    let mut options = options;

    if !fields.is_empty() {
        options.projection = Some(fields.into_projection());
    }
    if !sort.is_empty() {
        options.sort = Some(sort.into_sort());
    }
    options.limit = Some(limit);
    options.skip = Some(PageMeta::skip(limit, page));

    options
}
