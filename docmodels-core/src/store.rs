//! The store handle.
//!
//! A [`ModelStore`] owns one backend connection and hands out model collections borrowing
//! it. There is no process-wide connection: every model operation goes through the handle
//! it was obtained from, and [`ModelStore::shutdown`] closes the connection explicitly.
//!
//! # Example
//!
//! ```ignore
//! use docmodels::{prelude::*, memory::InMemoryStore};
//!
//! let store = ModelStore::new(InMemoryStore::builder().build().await?);
//! let users = store.model::<User>();
//! let active = users.find(Some(Filter::eq("active", true)), FindOptions::default()).await?;
//! store.shutdown().await?;
//! ```

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::ModelCollection,
    error::ModelResult,
    model::Model,
};

/// A handle to a document store, bound to a specific backend implementation.
#[derive(Debug)]
pub struct ModelStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> ModelStore<B> {
    /// Wraps an already opened backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Opens a backend from its builder and wraps it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be initialized.
    pub async fn connect<T>(builder: T) -> ModelResult<Self>
    where
        T: StoreBackendBuilder<Backend = B>,
    {
        Ok(Self::new(builder.build().await?))
    }

    /// Gets the collection of model `M`.
    pub fn model<M: Model>(&self) -> ModelCollection<'_, B, M> {
        ModelCollection::new(&self.backend)
    }

    /// The backend this store forwards to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Shuts the backend down, consuming the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to shut down cleanly.
    pub async fn shutdown(self) -> ModelResult<()> {
        self.backend.shutdown().await
    }
}
