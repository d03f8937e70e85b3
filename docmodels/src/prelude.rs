//! Convenient re-exports of commonly used types from docmodels.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docmodels::prelude::*;
//! ```

pub use docmodels_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::ModelCollection,
    error::{ModelError, ModelResult, ValidationError},
    filter::{FieldOp, Filter, FilterVisitor},
    lookup::Lookup,
    model::{IdKind, Instance, Model},
    normalize::{InsertOutcome, Normalized, normalize},
    options::{FindOptions, ModifyOptions, ReturnDocument, UpdateScope},
    page::{Items, Page, PageMeta, Pages},
    projection::{FieldSpec, fields_adapter, sort_adapter},
    response::{DeleteOutcome, RawResponse, UpdateOutcome},
    store::ModelStore,
};
pub use docmodels_macros::Model;
pub use bson::{Bson, Document};
