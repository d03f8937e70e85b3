//! Single-hop joins by foreign id.
//!
//! A join answers "these local documents, each with the foreign document it references
//! embedded" in exactly two store round trips, whatever the number of local documents:
//!
//! 1. fetch the local documents, with the join field forced into the projection;
//! 2. coerce every join value into the foreign model's identifier type;
//! 3. fetch every referenced foreign document in one `_id $in [...]` query;
//! 4. index the foreign documents by id and splice each into its owning local document.
//!
//! The stages run in order, and the first failing stage aborts the join. A local
//! document whose join value is missing, null, or references no foreign document simply
//! does not get the target field.
//!
//! # Example
//!
//! ```ignore
//! use docmodels::prelude::*;
//!
//! let posts = store.model::<Post>();
//! let page = posts
//!     .paged_lookup_by_id::<User>(
//!         Lookup::new("author_id", "author")
//!             .filter(Filter::eq("published", true))
//!             .foreign_projection("name avatar"),
//!         "-created_at",
//!         20,
//!         1,
//!     )
//!     .await?;
//! ```

use bson::{Bson, Document};
use futures::try_join;
use std::collections::{HashMap, HashSet};

use crate::{
    backend::StoreBackend,
    collection::{ModelCollection, paged_options},
    error::ModelResult,
    filter::Filter,
    model::{IdKind, Instance, Model, id_key},
    normalize::normalize,
    options::FindOptions,
    page::{Page, PageMeta},
    projection::{FieldSpec, force_include},
    response::RawResponse,
};

/// Plan of a join: which local documents to fetch, which field references the foreign
/// collection, and where to put the foreign document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lookup {
    pub filter: Option<Filter>,
    /// Local field holding the foreign document's id.
    pub join_field: String,
    /// Local field that receives the foreign document.
    pub target_field: String,
    /// Overrides `local_options.projection` when set.
    pub local_projection: Option<Document>,
    pub local_options: FindOptions,
    /// Overrides `foreign_options.projection` when set.
    pub foreign_projection: Option<Document>,
    pub foreign_options: FindOptions,
}

impl Lookup {
    pub fn new(join_field: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self {
            join_field: join_field.into(),
            target_field: target_field.into(),
            ..Default::default()
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn local_projection(mut self, projection: impl Into<FieldSpec>) -> Self {
        self.local_projection = Some(projection.into().into_projection());
        self
    }

    pub fn local_options(mut self, options: FindOptions) -> Self {
        self.local_options = options;
        self
    }

    pub fn foreign_projection(mut self, projection: impl Into<FieldSpec>) -> Self {
        self.foreign_projection = Some(projection.into().into_projection());
        self
    }

    pub fn foreign_options(mut self, options: FindOptions) -> Self {
        self.foreign_options = options;
        self
    }
}

/// Join values of the local documents: one key per document, in order, plus the distinct
/// coerced ids to fetch.
struct JoinKeys {
    keys: Vec<Option<String>>,
    ids: Vec<Bson>,
}

fn extract_join_keys(documents: &[Document], join_field: &str, kind: IdKind) -> ModelResult<JoinKeys> {
    let mut keys = Vec::with_capacity(documents.len());
    let mut ids = Vec::new();
    let mut seen = HashSet::new();

    for document in documents {
        match document.get(join_field) {
            None | Some(Bson::Null) | Some(Bson::Undefined) => keys.push(None),
            Some(value) => {
                let id = kind.coerce(value)?;
                let key = id_key(&id);

                if seen.insert(key.clone()) {
                    ids.push(id);
                }
                keys.push(Some(key));
            }
        }
    }

    Ok(JoinKeys { keys, ids })
}

fn index_by_id(documents: Vec<Document>) -> HashMap<String, Document> {
    documents
        .into_iter()
        .filter_map(|document| {
            let key = id_key(document.get("_id")?);
            Some((key, document))
        })
        .collect()
}

fn splice(local: &mut [Document], keys: Vec<Option<String>>, index: &HashMap<String, Document>, target_field: &str) {
    for (document, key) in local.iter_mut().zip(keys) {
        match key.as_ref().and_then(|key| index.get(key)) {
            Some(foreign) => {
                document.insert(target_field, foreign.clone());
            }
            None => {
                document.remove(target_field);
            }
        }
    }
}

impl<'a, B: StoreBackend, M: Model> ModelCollection<'a, B, M> {
    /// Fetches the local documents selected by `lookup` and embeds the document of model
    /// `F` each of them references.
    ///
    /// # Errors
    ///
    /// Returns the first store error, or [`ModelError::InvalidId`] when a join value cannot
    /// be coerced into `F`'s identifier type. No partial result is returned.
    ///
    /// [`ModelError::InvalidId`]: crate::error::ModelError::InvalidId
    pub async fn lookup_by_id<F: Model>(&self, lookup: Lookup) -> ModelResult<Vec<Instance<M>>> {
        let Lookup {
            filter,
            join_field,
            target_field,
            local_projection,
            mut local_options,
            foreign_projection,
            mut foreign_options,
        } = lookup;

        local_options.projection = local_projection
            .or(local_options.projection)
            .map(|projection| force_include(projection, &join_field))
            .filter(|projection| !projection.is_empty());

        let mut local = self.backend.find(self.name(), filter, local_options).await?;

        tracing::debug!(
            collection = self.name(),
            join_field = join_field.as_str(),
            count = local.len(),
            "fetched local documents"
        );

        let JoinKeys { keys, ids } = extract_join_keys(&local, &join_field, F::id_kind())?;

        let foreign = if ids.is_empty() {
            Vec::new()
        } else {
            let id_count = ids.len();
            foreign_options.projection = foreign_projection.or(foreign_options.projection);

            let foreign = self
                .backend
                .find(F::collection_name(), Some(Filter::in_("_id", ids)), foreign_options)
                .await?;

            tracing::debug!(
                collection = F::collection_name(),
                requested = id_count,
                count = foreign.len(),
                "fetched foreign documents"
            );

            foreign
        };

        let index = index_by_id(foreign);
        splice(&mut local, keys, &index, &target_field);

        normalize::<M>(Ok(RawResponse::List(local)))?.into_many()
    }

    /// Runs [`lookup_by_id`](Self::lookup_by_id) over one page of the local documents.
    ///
    /// `sort`, `limit` and the page's skip are folded into the plan's local options. The
    /// count of all matching local documents runs alongside the join, and the first error
    /// of either is returned.
    pub async fn paged_lookup_by_id<F: Model>(
        &self,
        lookup: Lookup,
        sort: impl Into<FieldSpec>,
        limit: i64,
        page: i64,
    ) -> ModelResult<Page<Instance<M>>> {
        let mut lookup = lookup;
        let filter = lookup.filter.clone();

        lookup.local_options = paged_options(
            std::mem::take(&mut lookup.local_options),
            FieldSpec::default(),
            sort.into(),
            limit,
            page,
        );

        tracing::debug!(collection = self.name(), limit, page, "paged lookup");

        let (count, data) = try_join!(self.count(filter), self.lookup_by_id::<F>(lookup))?;

        Ok(PageMeta::compute(count, limit, page).with_data(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use bson::{doc, oid::ObjectId};

    #[test]
    fn join_keys_skip_missing_values_and_dedupe() {
        let documents = vec![
            doc! { "_id": 1, "fk": "A" },
            doc! { "_id": 2 },
            doc! { "_id": 3, "fk": "A" },
            doc! { "_id": 4, "fk": Bson::Null },
            doc! { "_id": 5, "fk": "B" },
        ];

        let JoinKeys { keys, ids } = extract_join_keys(&documents, "fk", IdKind::Native).unwrap();

        let (a, b) = (id_key(&Bson::from("A")), id_key(&Bson::from("B")));

        assert_eq!(keys, vec![Some(a.clone()), None, Some(a), None, Some(b)]);
        assert_eq!(ids, vec![Bson::from("A"), Bson::from("B")]);
    }

    #[test]
    fn native_join_values_of_different_types_stay_distinct() {
        let documents = vec![doc! { "_id": 1, "fk": "1" }, doc! { "_id": 2, "fk": 1 }];

        let JoinKeys { keys, ids } = extract_join_keys(&documents, "fk", IdKind::Native).unwrap();
        let index = index_by_id(vec![
            doc! { "_id": "1", "name": "string" },
            doc! { "_id": 1, "name": "int" },
        ]);

        assert_eq!(ids, vec![Bson::from("1"), Bson::Int32(1)]);
        assert_ne!(keys[0], keys[1]);

        let mut local = documents;
        splice(&mut local, keys, &index, "joined");

        assert_eq!(local[0].get_document("joined").unwrap().get_str("name").unwrap(), "string");
        assert_eq!(local[1].get_document("joined").unwrap().get_str("name").unwrap(), "int");
    }

    #[test]
    fn malformed_join_value_fails_extraction() {
        let documents = vec![doc! { "fk": "not-an-object-id" }];

        assert!(matches!(
            extract_join_keys(&documents, "fk", IdKind::ObjectId),
            Err(ModelError::InvalidId(_)),
        ));
    }

    #[test]
    fn hex_and_object_id_values_share_a_key() {
        let oid = ObjectId::new();
        let documents = vec![doc! { "fk": oid.to_hex() }];

        let JoinKeys { keys, ids } = extract_join_keys(&documents, "fk", IdKind::ObjectId).unwrap();
        let index = index_by_id(vec![doc! { "_id": oid, "name": "x" }]);

        assert_eq!(ids, vec![Bson::ObjectId(oid)]);
        assert!(index.contains_key(keys[0].as_deref().unwrap()));
    }

    #[test]
    fn splice_sets_matches_and_clears_misses() {
        let mut local = vec![
            doc! { "_id": 1, "fk": "A" },
            doc! { "_id": 2, "fk": "Z", "joined": "stale" },
        ];
        let index = index_by_id(vec![doc! { "_id": "A", "name": "x" }]);

        splice(
            &mut local,
            vec![Some(id_key(&Bson::from("A"))), Some(id_key(&Bson::from("Z")))],
            &index,
            "joined",
        );

        assert_eq!(local[0], doc! { "_id": 1, "fk": "A", "joined": { "_id": "A", "name": "x" } });
        assert_eq!(local[1], doc! { "_id": 2, "fk": "Z" });
    }

    #[test]
    fn builder_adapts_textual_projections() {
        let lookup = Lookup::new("author_id", "author")
            .local_projection("title -body")
            .foreign_projection("name");

        assert_eq!(lookup.local_projection, Some(doc! { "title": true, "body": false }));
        assert_eq!(lookup.foreign_projection, Some(doc! { "name": true }));
        assert_eq!(lookup.filter, None);
    }
}
