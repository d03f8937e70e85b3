//! MongoDB backend implementation for docmodels.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait. Filters
//! are translated into MongoDB query documents and every operation is forwarded to the
//! official async driver in a single round trip.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmodels = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The connection string and database name are provided through the builder. The client
//! is created once and shared by every operation of the store; call
//! `ModelStore::shutdown` to close it.
//!
//! # Example
//!
//! ```ignore
//! use docmodels::{prelude::*, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ModelStore::connect(
//!         MongoDbStore::builder("mongodb://localhost:27017", "my_database").app_name("blog"),
//!     )
//!     .await?;
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodels_mongodb;

pub mod store;
mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
