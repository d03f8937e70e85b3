#![allow(dead_code)]

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use docmodels::{
    bson::{Bson, Document},
    error::{ModelError, ModelResult, ValidationError},
    filter::Filter,
    memory::InMemoryStore,
    options::{FindOptions, ModifyOptions, UpdateScope},
    prelude::*,
    response::{DeleteOutcome, UpdateOutcome},
};

#[derive(Model)]
#[model(collection = "authors", id = "native")]
pub struct Author;

#[derive(Model)]
#[model(collection = "posts", id = "native")]
pub struct Post;

#[derive(Model)]
#[model(collection = "users")]
pub struct User;

#[derive(Model)]
#[model(collection = "sessions", id = "uuid")]
pub struct Session;

pub fn require_email(attrs: Document) -> Result<Document, ValidationError> {
    match attrs.get_str("email") {
        Ok(_) => Ok(attrs),
        Err(_) => Err(ValidationError::for_field("email", "is required")),
    }
}

#[derive(Model)]
#[model(collection = "members", validate = require_email, construct_with_schema)]
pub struct Member;

/// An in-memory backend that records every `find` per collection and can be told to fail
/// one kind of operation, everywhere or on a single collection.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    inner: InMemoryStore,
    finds: Mutex<HashMap<String, usize>>,
    failing: Option<(&'static str, Option<&'static str>)>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call of `operation` (`"find"` or `"count"`) fail with a backend error.
    pub fn failing(operation: &'static str) -> Self {
        Self {
            failing: Some((operation, None)),
            ..Self::default()
        }
    }

    /// Makes `operation` fail only when it targets `collection`.
    pub fn failing_on(operation: &'static str, collection: &'static str) -> Self {
        Self {
            failing: Some((operation, Some(collection))),
            ..Self::default()
        }
    }

    pub fn finds(&self, collection: &str) -> usize {
        self.finds
            .lock()
            .unwrap()
            .get(collection)
            .copied()
            .unwrap_or(0)
    }

    fn check(&self, operation: &'static str, collection: &str) -> ModelResult<()> {
        match self.failing {
            Some((failing, None)) if failing == operation => {
                Err(ModelError::Backend(format!("{operation} failed")))
            }
            Some((failing, Some(target))) if failing == operation && target == collection => {
                Err(ModelError::Backend(format!("{operation} on {collection} failed")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StoreBackend for RecordingBackend {
    async fn find(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: FindOptions,
    ) -> ModelResult<Vec<Document>> {
        *self
            .finds
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default() += 1;

        self.check("find", collection)?;
        self.inner.find(collection, filter, options).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: FindOptions,
    ) -> ModelResult<Option<Document>> {
        *self
            .finds
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default() += 1;

        self.inner.find_one(collection, filter, options).await
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Option<Filter>,
        update: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        self.inner
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
        self.inner
            .find_one_and_replace(collection, filter, replacement, options)
            .await
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        self.inner
            .find_one_and_delete(collection, filter, options)
            .await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> ModelResult<Vec<Bson>> {
        self.inner.insert_many(collection, documents).await
    }

    async fn update(
        &self,
        collection: &str,
        filter: Option<Filter>,
        update: Document,
        scope: UpdateScope,
        upsert: bool,
    ) -> ModelResult<UpdateOutcome> {
        self.inner
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
        self.inner
            .replace_one(collection, filter, replacement, upsert)
            .await
    }

    async fn delete(
        &self,
        collection: &str,
        filter: Option<Filter>,
        scope: UpdateScope,
    ) -> ModelResult<DeleteOutcome> {
        self.inner.delete(collection, filter, scope).await
    }

    async fn count(&self, collection: &str, filter: Option<Filter>) -> ModelResult<u64> {
        self.check("count", collection)?;
        self.inner.count(collection, filter).await
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: Option<Filter>,
    ) -> ModelResult<Vec<Bson>> {
        self.inner.distinct(collection, field, filter).await
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> ModelResult<Vec<Document>> {
        self.inner.aggregate(collection, pipeline).await
    }
}

pub fn recording_store() -> ModelStore<RecordingBackend> {
    ModelStore::new(RecordingBackend::new())
}
