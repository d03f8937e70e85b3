//! In-memory document storage backend for docmodels.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development
//! and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Filter evaluation** - Typed filters, dotted paths and array element matching
//! - **Find options** - Projection, multi-field sort, skip and limit
//! - **Writes** - `$set`, `$unset`, `$inc`, `$push` and `$setOnInsert`, replacements, upserts
//! - **Aggregation** - `$match`, `$sort`, `$skip`, `$limit`, `$project` and `$count` stages
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodels::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[derive(Model)]
//! #[model(collection = "users")]
//! pub struct User;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ModelStore::connect(InMemoryStore::builder()).await?;
//!     let users = store.model::<User>();
//!
//!     users.insert_one(doc! { "name": "Alice" }).await?;
//!     let alice = users.find_one(Some(Filter::eq("name", "Alice")), FindOptions::default()).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodels_memory;

pub mod store;
mod evaluator;
mod pipeline;
mod update;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
