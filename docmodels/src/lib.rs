//! Main docmodels crate: typed models over document stores.
//!
//! This crate is the primary entry point for users of the docmodels framework. It
//! re-exports the core types from the sub-crates, the `Model` derive macro, and the
//! storage backends.
//!
//! # Features
//!
//! - **Models** - Bind types to collections, validate documents, hydrate store responses
//! - **Multiple backends** - In-memory and MongoDB storage behind one backend trait
//! - **Typed filters** - Composable filters translated or evaluated by each backend
//! - **Pagination** - `paged_find` with complete page metadata
//! - **Joins** - `lookup_by_id` and `paged_lookup_by_id` embed referenced documents in two
//!   round trips
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodels::{prelude::*, memory::InMemoryStore};
//! use docmodels::bson::doc;
//!
//! #[derive(Model)]
//! #[model(collection = "authors", id = "native")]
//! pub struct Author;
//!
//! #[derive(Model)]
//! #[model(collection = "posts")]
//! pub struct Post;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ModelStore::connect(InMemoryStore::builder()).await?;
//!
//!     store.model::<Author>().insert_one(doc! { "_id": "ann", "name": "Ann" }).await?;
//!     store.model::<Post>().insert_one(doc! { "title": "Hello", "author": "ann" }).await?;
//!
//!     let page = store
//!         .model::<Post>()
//!         .paged_lookup_by_id::<Author>(Lookup::new("author", "author_doc"), "-title", 10, 1)
//!         .await?;
//!
//!     println!("{} posts, first: {:?}", page.items.total, page.data.first());
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docmodels;

pub mod prelude;

pub use docmodels_core::{
    backend, collection, error, filter, lookup, model, normalize, options, page, projection, response,
    store,
};
pub use docmodels_macros::Model;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodels_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodels_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
