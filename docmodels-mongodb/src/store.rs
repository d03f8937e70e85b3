use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{
        ClientOptions, FindOneAndDeleteOptions, FindOneAndReplaceOptions, FindOneAndUpdateOptions,
        FindOneOptions, FindOptions as MongoFindOptions, ReturnDocument as MongoReturnDocument,
    },
};
use docmodels_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{ModelError, ModelResult},
    filter::Filter,
    options::{FindOptions, ModifyOptions, ReturnDocument, UpdateScope},
    response::{DeleteOutcome, UpdateOutcome},
};

use crate::query::MongoQueryTranslator;

fn backend_error(error: mongodb::error::Error) -> ModelError {
    ModelError::Backend(error.to_string())
}

fn non_empty(document: Option<Document>) -> Option<Document> {
    document.filter(|document| !document.is_empty())
}

fn return_document(return_document: ReturnDocument) -> MongoReturnDocument {
    match return_document {
        ReturnDocument::Before => MongoReturnDocument::Before,
        ReturnDocument::After => MongoReturnDocument::After,
    }
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: FindOptions,
    ) -> ModelResult<Vec<Document>> {
        let mut find_options = MongoFindOptions::default();

        find_options.projection = non_empty(options.projection);
        find_options.sort = non_empty(options.sort);
        find_options.limit = options.limit;
        find_options.skip = options.skip;

        self.get_collection(collection)
            .find(MongoQueryTranslator::translate(filter.as_ref())?)
            .with_options(find_options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: FindOptions,
    ) -> ModelResult<Option<Document>> {
        let mut find_options = FindOneOptions::default();

        find_options.projection = non_empty(options.projection);
        find_options.sort = non_empty(options.sort);
        find_options.skip = options.skip;

        self.get_collection(collection)
            .find_one(MongoQueryTranslator::translate(filter.as_ref())?)
            .with_options(find_options)
            .await
            .map_err(backend_error)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Option<Filter>,
        update: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        let mut modify_options = FindOneAndUpdateOptions::default();

        modify_options.projection = non_empty(options.projection);
        modify_options.sort = non_empty(options.sort);
        modify_options.upsert = Some(options.upsert);
        modify_options.return_document = Some(return_document(options.return_document));

        self.get_collection(collection)
            .find_one_and_update(MongoQueryTranslator::translate(filter.as_ref())?, update)
            .with_options(modify_options)
            .await
            .map_err(backend_error)
    }

    async fn find_one_and_replace(
        &self,
        collection: &str,
        filter: Option<Filter>,
        replacement: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        let mut modify_options = FindOneAndReplaceOptions::default();

        modify_options.projection = non_empty(options.projection);
        modify_options.sort = non_empty(options.sort);
        modify_options.upsert = Some(options.upsert);
        modify_options.return_document = Some(return_document(options.return_document));

        self.get_collection(collection)
            .find_one_and_replace(MongoQueryTranslator::translate(filter.as_ref())?, replacement)
            .with_options(modify_options)
            .await
            .map_err(backend_error)
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        let mut modify_options = FindOneAndDeleteOptions::default();

        modify_options.projection = non_empty(options.projection);
        modify_options.sort = non_empty(options.sort);

        self.get_collection(collection)
            .find_one_and_delete(MongoQueryTranslator::translate(filter.as_ref())?)
            .with_options(modify_options)
            .await
            .map_err(backend_error)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> ModelResult<Vec<Bson>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let mut inserted = self
            .get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(backend_error)?
            .inserted_ids
            .into_iter()
            .collect::<Vec<(usize, Bson)>>();

        // The driver reports ids keyed by batch position.
        inserted.sort_by_key(|(index, _)| *index);

        Ok(inserted.into_iter().map(|(_, id)| id).collect())
    }

    async fn update(
        &self,
        collection: &str,
        filter: Option<Filter>,
        update: Document,
        scope: UpdateScope,
        upsert: bool,
    ) -> ModelResult<UpdateOutcome> {
        let filter = MongoQueryTranslator::translate(filter.as_ref())?;
        let collection = self.get_collection(collection);

        let result = match scope {
            UpdateScope::One => collection.update_one(filter, update).upsert(upsert).await,
            UpdateScope::Many => collection.update_many(filter, update).upsert(upsert).await,
        }
        .map_err(backend_error)?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Option<Filter>,
        replacement: Document,
        upsert: bool,
    ) -> ModelResult<UpdateOutcome> {
        let result = self
            .get_collection(collection)
            .replace_one(MongoQueryTranslator::translate(filter.as_ref())?, replacement)
            .upsert(upsert)
            .await
            .map_err(backend_error)?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn delete(
        &self,
        collection: &str,
        filter: Option<Filter>,
        scope: UpdateScope,
    ) -> ModelResult<DeleteOutcome> {
        let filter = MongoQueryTranslator::translate(filter.as_ref())?;
        let collection = self.get_collection(collection);

        let result = match scope {
            UpdateScope::One => collection.delete_one(filter).await,
            UpdateScope::Many => collection.delete_many(filter).await,
        }
        .map_err(backend_error)?;

        Ok(DeleteOutcome { deleted_count: result.deleted_count })
    }

    async fn count(&self, collection: &str, filter: Option<Filter>) -> ModelResult<u64> {
        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::translate(filter.as_ref())?)
            .await
            .map_err(backend_error)
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: Option<Filter>,
    ) -> ModelResult<Vec<Bson>> {
        self.get_collection(collection)
            .distinct(field, MongoQueryTranslator::translate(filter.as_ref())?)
            .await
            .map_err(backend_error)
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> ModelResult<Vec<Document>> {
        self.get_collection(collection)
            .aggregate(pipeline)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn shutdown(self) -> ModelResult<()> {
        tracing::debug!(database = self.database.as_str(), "shutting down mongodb client");
        self.client.shutdown().await;

        Ok(())
    }
}

/// Configuration of a [`MongoDbStore`].
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
    app_name: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            app_name: None,
        }
    }

    /// Name reported to the server in the connection handshake.
    pub fn app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_string());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> ModelResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| ModelError::Initialization(e.to_string()))?;

        if let Some(app_name) = self.app_name {
            options.app_name = Some(app_name);
        }

        let client = Client::with_options(options)
            .map_err(|e| ModelError::Initialization(e.to_string()))?;

        tracing::debug!(database = self.database.as_str(), "created mongodb client");

        Ok(MongoDbStore::new(client, self.database))
    }
}
