//! A thin model layer over document stores: schema validation hooks, hydration of raw
//! store responses into model instances, offset pagination and single-hop joins.
//!
//! This crate is the core of the docmodels project and provides:
//!
//! - **Models** ([`model`]) - The `Model` trait, identifier kinds and hydrated instances
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Filters** ([`filter`]) - Typed filter construction and translation
//! - **Projections and sorts** ([`projection`]) - Adapters for terse textual specs
//! - **Responses** ([`response`], [`normalize`]) - Tagged store responses and their hydration
//! - **Collections** ([`collection`]) - Typed operations on one model's collection
//! - **Joins** ([`lookup`]) - Batched by-id joins, paged or not
//! - **Pagination** ([`page`]) - Page metadata and pages
//! - **Store** ([`store`]) - The explicit store handle
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docmodels::prelude::*;
//!
//! #[derive(Model)]
//! #[model(collection = "users")]
//! pub struct User;
//!
//! let store = ModelStore::connect(InMemoryStore::builder()).await?;
//! let users = store.model::<User>();
//! let page = users.paged_find(None, "name email", "-created_at", 20, 1).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodels_core;

pub mod backend;
pub mod collection;
pub mod error;
pub mod filter;
pub mod lookup;
pub mod model;
pub mod normalize;
pub mod options;
pub mod page;
pub mod projection;
pub mod response;
pub mod store;
