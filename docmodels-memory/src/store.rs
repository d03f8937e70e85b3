//! In-memory storage implementation of the store backend.
//!
//! Collections are ordered vectors of BSON documents behind an async-aware read-write
//! lock. Documents keep their insertion order, which is the natural order of unsorted
//! reads.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};

use docmodels_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{ModelError, ModelResult},
    filter::Filter,
    options::{FindOptions, ModifyOptions, ReturnDocument, UpdateScope},
    response::{DeleteOutcome, UpdateOutcome},
};

use crate::{
    evaluator::{Comparable, DocumentEvaluator, compare_by, get_path},
    pipeline,
    update::{apply_replacement, apply_update, project, seed_from_filter},
};

type StoreMap = HashMap<String, Vec<Document>>;

/// How a find-and-modify operation rewrites the selected document.
#[derive(Clone, Copy)]
enum Modification<'a> {
    Update(&'a Document),
    Replace(&'a Document),
}

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing it to
/// be shared across async tasks. Clones of the same instance share the same data.
///
/// Reads scan every document of a collection; there are no indexes. Documents inserted
/// without an `_id` get a fresh ObjectId, and a duplicate `_id` is rejected with
/// [`ModelError::DocumentAlreadyExists`].
///
/// # Example
///
/// ```ignore
/// use docmodels_memory::InMemoryStore;
/// use docmodels_core::{backend::StoreBackend, options::FindOptions};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.insert_many("users", vec![doc! { "name": "Alice", "age": 30 }]).await?;
///
/// let users = store.find("users", None, FindOptions::default()).await?;
/// assert_eq!(users.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents, in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    ///
    /// ```ignore
    /// let store = InMemoryStore::builder().build().await?;
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

/// Positions of the documents matching `filter`, ordered by `sort` when given.
fn select(documents: &[Document], filter: Option<&Filter>, sort: Option<&Document>) -> ModelResult<Vec<usize>> {
    let mut positions = DocumentEvaluator::matching_positions(documents, filter)?;

    if let Some(sort) = sort.filter(|sort| !sort.is_empty()) {
        positions.sort_by(|a, b| compare_by(sort, &documents[*a], &documents[*b]));
    }

    Ok(positions)
}

fn display_id(id: &Bson) -> String {
    match id {
        Bson::String(text) => text.clone(),
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    }
}

fn ensure_id(document: &mut Document) -> Bson {
    match document.get("_id") {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            document.insert("_id", id.clone());
            id
        }
    }
}

fn check_unique(documents: &[Document], id: &Bson, collection: &str) -> ModelResult<()> {
    if documents.iter().any(|existing| existing.get("_id") == Some(id)) {
        return Err(ModelError::DocumentAlreadyExists(display_id(id), collection.to_string()));
    }

    Ok(())
}

/// Builds the document an upsert inserts when nothing matched.
fn upsert_document(filter: Option<&Filter>, modification: &Modification<'_>) -> ModelResult<Document> {
    let mut document = seed_from_filter(filter);

    match modification {
        Modification::Update(update) => apply_update(&mut document, update, true)?,
        Modification::Replace(replacement) => {
            let id = document.get("_id").cloned();
            document = (*replacement).clone();
            if let (Some(id), false) = (id, document.contains_key("_id")) {
                document.insert("_id", id);
            }
        }
    }

    Ok(document)
}

impl InMemoryStore {
    async fn find_and_modify(
        &self,
        collection: &str,
        filter: Option<Filter>,
        modification: Modification<'_>,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        let mut store = self.store.write().await;
        let documents = store.entry(collection.to_string()).or_default();

        let selected = select(documents, filter.as_ref(), options.sort.as_ref())?
            .into_iter()
            .next();

        let returned = match selected {
            Some(position) => {
                let before = documents[position].clone();
                let mut after = before.clone();

                match modification {
                    Modification::Update(update) => apply_update(&mut after, update, false)?,
                    Modification::Replace(replacement) => apply_replacement(&mut after, replacement)?,
                }

                documents[position] = after.clone();

                match options.return_document {
                    ReturnDocument::Before => Some(before),
                    ReturnDocument::After => Some(after),
                }
            }
            None if options.upsert => {
                let mut document = upsert_document(filter.as_ref(), &modification)?;
                let id = ensure_id(&mut document);
                check_unique(documents, &id, collection)?;
                documents.push(document.clone());

                match options.return_document {
                    ReturnDocument::Before => None,
                    ReturnDocument::After => Some(document),
                }
            }
            None => None,
        };

        Ok(returned.map(|document| project(document, options.projection.as_ref())))
    }

    async fn modify(
        &self,
        collection: &str,
        filter: Option<Filter>,
        modification: Modification<'_>,
        scope: UpdateScope,
        upsert: bool,
    ) -> ModelResult<UpdateOutcome> {
        let mut store = self.store.write().await;
        let documents = store.entry(collection.to_string()).or_default();

        let mut positions = DocumentEvaluator::matching_positions(documents, filter.as_ref())?;
        if scope == UpdateScope::One {
            positions.truncate(1);
        }

        if positions.is_empty() {
            if !upsert {
                return Ok(UpdateOutcome::default());
            }

            let mut document = upsert_document(filter.as_ref(), &modification)?;
            let id = ensure_id(&mut document);
            check_unique(documents, &id, collection)?;
            documents.push(document);

            return Ok(UpdateOutcome {
                upserted_id: Some(id),
                ..Default::default()
            });
        }

        // Rewrite copies first so a failing operator leaves the collection untouched.
        let mut rewritten = Vec::with_capacity(positions.len());
        for position in &positions {
            let mut document = documents[*position].clone();

            match modification {
                Modification::Update(update) => apply_update(&mut document, update, false)?,
                Modification::Replace(replacement) => apply_replacement(&mut document, replacement)?,
            }

            rewritten.push(document);
        }

        let mut modified_count = 0;
        for (position, document) in positions.iter().zip(rewritten) {
            if documents[*position] != document {
                documents[*position] = document;
                modified_count += 1;
            }
        }

        Ok(UpdateOutcome {
            matched_count: positions.len() as u64,
            modified_count,
            upserted_id: None,
        })
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: FindOptions,
    ) -> ModelResult<Vec<Document>> {
        let store = self.store.read().await;
        let documents = match store.get(collection) {
            Some(documents) => documents,
            None => return Ok(vec![]),
        };

        let positions = select(documents, filter.as_ref(), options.sort.as_ref())?;

        tracing::trace!(collection, matched = positions.len(), "scanned collection");

        // A negative limit behaves like its absolute value; zero means no limit.
        let limit = match options.limit.map(i64::unsigned_abs) {
            Some(0) | None => usize::MAX,
            Some(limit) => limit as usize,
        };

        Ok(
            positions
                .into_iter()
                .skip(options.skip.unwrap_or(0) as usize)
                .take(limit)
                .map(|position| project(documents[position].clone(), options.projection.as_ref()))
                .collect()
        )
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: FindOptions,
    ) -> ModelResult<Option<Document>> {
        let options = FindOptions { limit: Some(1), ..options };

        Ok(self.find(collection, filter, options).await?.into_iter().next())
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Option<Filter>,
        update: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        self.find_and_modify(collection, filter, Modification::Update(&update), options)
            .await
    }

    async fn find_one_and_replace(
        &self,
        collection: &str,
        filter: Option<Filter>,
        replacement: Document,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        self.find_and_modify(collection, filter, Modification::Replace(&replacement), options)
            .await
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Option<Filter>,
        options: ModifyOptions,
    ) -> ModelResult<Option<Document>> {
        let mut store = self.store.write().await;
        let documents = match store.get_mut(collection) {
            Some(documents) => documents,
            None => return Ok(None),
        };

        let selected = select(documents, filter.as_ref(), options.sort.as_ref())?
            .into_iter()
            .next();

        Ok(selected.map(|position| project(documents.remove(position), options.projection.as_ref())))
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> ModelResult<Vec<Bson>> {
        let mut store = self.store.write().await;
        let existing = store.entry(collection.to_string()).or_default();

        let mut ids = Vec::with_capacity(documents.len());
        let mut staged: Vec<Document> = Vec::with_capacity(documents.len());

        // Either the whole batch is inserted or none of it.
        for mut document in documents {
            let id = ensure_id(&mut document);

            check_unique(existing, &id, collection)?;
            check_unique(&staged, &id, collection)?;

            ids.push(id);
            staged.push(document);
        }

        tracing::trace!(collection, count = staged.len(), "inserting documents");
        existing.extend(staged);

        Ok(ids)
    }

    async fn update(
        &self,
        collection: &str,
        filter: Option<Filter>,
        update: Document,
        scope: UpdateScope,
        upsert: bool,
    ) -> ModelResult<UpdateOutcome> {
        self.modify(collection, filter, Modification::Update(&update), scope, upsert)
            .await
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Option<Filter>,
        replacement: Document,
        upsert: bool,
    ) -> ModelResult<UpdateOutcome> {
        self.modify(collection, filter, Modification::Replace(&replacement), UpdateScope::One, upsert)
            .await
    }

    async fn delete(
        &self,
        collection: &str,
        filter: Option<Filter>,
        scope: UpdateScope,
    ) -> ModelResult<DeleteOutcome> {
        let mut store = self.store.write().await;
        let documents = match store.get_mut(collection) {
            Some(documents) => documents,
            None => return Ok(DeleteOutcome::default()),
        };

        let mut positions = DocumentEvaluator::matching_positions(documents, filter.as_ref())?;
        if scope == UpdateScope::One {
            positions.truncate(1);
        }

        for position in positions.iter().rev() {
            documents.remove(*position);
        }

        Ok(DeleteOutcome { deleted_count: positions.len() as u64 })
    }

    async fn count(&self, collection: &str, filter: Option<Filter>) -> ModelResult<u64> {
        let store = self.store.read().await;

        match store.get(collection) {
            Some(documents) => Ok(DocumentEvaluator::matching_positions(documents, filter.as_ref())?.len() as u64),
            None => Ok(0),
        }
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: Option<Filter>,
    ) -> ModelResult<Vec<Bson>> {
        let store = self.store.read().await;
        let documents = match store.get(collection) {
            Some(documents) => documents,
            None => return Ok(vec![]),
        };

        let mut values: Vec<Bson> = Vec::new();
        let mut push = |value: &Bson| {
            let candidate = Comparable::from(value);
            if !values.iter().any(|seen| Comparable::from(seen) == candidate) {
                values.push(value.clone());
            }
        };

        for position in DocumentEvaluator::matching_positions(documents, filter.as_ref())? {
            match get_path(&documents[position], field) {
                Some(Bson::Array(items)) => items.iter().for_each(&mut push),
                Some(value) => push(value),
                None => {}
            }
        }

        Ok(values)
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> ModelResult<Vec<Document>> {
        let documents = {
            let store = self.store.read().await;
            store.get(collection).cloned().unwrap_or_default()
        };

        pipeline::run(documents, &pipeline)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// ```ignore
/// use docmodels_memory::InMemoryStore;
/// use docmodels_core::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance. This always succeeds.
    async fn build(self) -> ModelResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_many(
                "people",
                vec![
                    doc! { "_id": 1, "name": "Ann", "age": 41, "tags": ["a", "b"] },
                    doc! { "_id": 2, "name": "Bob", "age": 25, "tags": ["b"] },
                    doc! { "_id": 3, "name": "Cid", "age": 33 },
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn find_sorts_skips_limits_and_projects() {
        let store = seeded().await;

        let found = store
            .find(
                "people",
                Some(Filter::gt("age", 30)),
                FindOptions::new().sort("-age").projection("name -_id").limit(1),
            )
            .await
            .unwrap();
        assert_eq!(found, vec![doc! { "name": "Ann" }]);

        let rest = store
            .find("people", None, FindOptions::new().sort("name").skip(1))
            .await
            .unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].get_str("name").unwrap(), "Bob");
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_rejects_duplicates() {
        let store = InMemoryStore::new();

        let ids = store
            .insert_many("things", vec![doc! { "n": 1 }, doc! { "_id": "fixed", "n": 2 }])
            .await
            .unwrap();
        assert!(matches!(ids[0], Bson::ObjectId(_)));
        assert_eq!(ids[1], Bson::from("fixed"));

        let duplicate = store
            .insert_many("things", vec![doc! { "_id": "new" }, doc! { "_id": "fixed" }])
            .await;
        assert!(matches!(duplicate, Err(ModelError::DocumentAlreadyExists(id, _)) if id == "fixed"));
        assert_eq!(store.count("things", None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn find_one_and_update_returns_requested_version() {
        let store = seeded().await;

        let after = store
            .find_one_and_update("people", Some(Filter::id(2)), doc! { "$inc": { "age": 1 } }, ModifyOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.get_i32("age").unwrap(), 26);

        let before = store
            .find_one_and_update(
                "people",
                Some(Filter::id(2)),
                doc! { "$set": { "age": 30 } },
                ModifyOptions::new().return_document(ReturnDocument::Before),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before.get_i32("age").unwrap(), 26);

        let missing = store
            .find_one_and_update("people", Some(Filter::id(9)), doc! { "$set": { "a": 1 } }, ModifyOptions::default())
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn upserts_seed_from_filter_equalities() {
        let store = InMemoryStore::new();

        let outcome = store
            .update(
                "people",
                Some(Filter::eq("email", "a@b.c")),
                doc! { "$set": { "name": "Ann" }, "$setOnInsert": { "visits": 0 } },
                UpdateScope::One,
                true,
            )
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 0);
        assert!(outcome.upserted_id.is_some());

        let stored = store.find_one("people", None, FindOptions::default()).await.unwrap().unwrap();
        assert_eq!(stored.get_str("email").unwrap(), "a@b.c");
        assert_eq!(stored.get_str("name").unwrap(), "Ann");
        assert_eq!(stored.get_i32("visits").unwrap(), 0);
    }

    #[tokio::test]
    async fn update_many_counts_matches_and_modifications() {
        let store = seeded().await;

        let outcome = store
            .update("people", Some(Filter::eq("tags", "b")), doc! { "$set": { "name": "Bob" } }, UpdateScope::Many, false)
            .await
            .unwrap();

        assert_eq!(outcome.matched_count, 2);
        assert_eq!(outcome.modified_count, 1);
    }

    #[tokio::test]
    async fn replace_delete_and_distinct() {
        let store = seeded().await;

        store
            .replace_one("people", Some(Filter::id(3)), doc! { "name": "Cyd" }, false)
            .await
            .unwrap();
        let replaced = store.find_one("people", Some(Filter::id(3)), FindOptions::default()).await.unwrap();
        assert_eq!(replaced, Some(doc! { "_id": 3, "name": "Cyd" }));

        let tags = store.distinct("people", "tags", None).await.unwrap();
        assert_eq!(tags, vec![Bson::from("a"), Bson::from("b")]);

        let deleted = store.delete("people", Some(Filter::lt("age", 50)), UpdateScope::Many).await.unwrap();
        assert_eq!(deleted.deleted_count, 2);
        assert_eq!(store.count("people", None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn find_one_and_delete_removes_first_in_sort_order() {
        let store = seeded().await;

        let removed = store
            .find_one_and_delete("people", None, ModifyOptions::new().sort("age"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(removed.get_str("name").unwrap(), "Bob");
        assert_eq!(store.count("people", None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn aggregate_runs_over_collection() {
        let store = seeded().await;

        let result = store
            .aggregate("people", vec![doc! { "$match": { "age": { "$lt": 40 } } }, doc! { "$count": "young" }])
            .await
            .unwrap();

        assert_eq!(result, vec![doc! { "young": 2i64 }]);
    }
}
