//! Model types and hydrated model instances.
//!
//! A [`Model`] binds a Rust type to one collection in the store, names the identifier type
//! of that collection and optionally validates documents against a schema. Documents read
//! from the store are hydrated into [`Instance`]s of the model.
//!
//! # Example
//!
//! ```ignore
//! use docmodels::prelude::*;
//! use bson::{doc, Document};
//!
//! #[derive(Model)]
//! #[model(collection = "users", validate = validate_user, construct_with_schema)]
//! pub struct User;
//!
//! fn validate_user(attrs: Document) -> Result<Document, ValidationError> {
//!     match attrs.get_str("email") {
//!         Ok(_) => Ok(attrs),
//!         Err(_) => Err(ValidationError::for_field("email", "is required")),
//!     }
//! }
//!
//! let user = Instance::<User>::new(doc! { "name": "Alice" });
//! assert!(user.validation_error().is_some());
//! ```

use bson::{
    Bson, Document, Uuid,
    de::deserialize_from_bson,
    oid::ObjectId,
    ser::serialize_to_bson,
    spec::BinarySubtype,
};
use serde::{Serialize, Serializer, de::DeserializeOwned};
use std::{fmt, marker::PhantomData};

use crate::error::{ModelError, ModelResult, ValidationError};

/// Binds a type to a collection of documents in the store.
///
/// Every method has a sensible default apart from [`Model::collection_name`]. Most models
/// derive this trait with `#[derive(Model)]`.
pub trait Model: Send + Sync + 'static {
    /// The name of the collection holding this model's documents.
    fn collection_name() -> &'static str;

    /// The identifier type of the collection's `_id` field.
    fn id_kind() -> IdKind {
        IdKind::ObjectId
    }

    /// Whether [`Instance::new`] runs [`Model::validate`] on the attributes it receives.
    fn construct_with_schema() -> bool {
        false
    }

    /// Validates `attrs` against the model schema, returning the coerced document.
    fn validate(attrs: Document) -> Result<Document, ValidationError> {
        Ok(attrs)
    }
}

/// The identifier type used by a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdKind {
    /// 12 byte ObjectIds; 24 character hex strings are accepted and parsed.
    #[default]
    ObjectId,
    /// UUIDs stored as BSON binary (subtype 4); hyphenated strings are accepted and parsed.
    Uuid,
    /// Whatever value the caller stores, used as is.
    Native,
}

impl IdKind {
    /// Coerces `value` into this identifier type.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidId`] when the value cannot represent such an identifier.
    pub fn coerce(&self, value: &Bson) -> ModelResult<Bson> {
        match (self, value) {
            (IdKind::ObjectId, Bson::ObjectId(_)) => Ok(value.clone()),
            (IdKind::ObjectId, Bson::String(text)) => ObjectId::parse_str(text)
                .map(Bson::ObjectId)
                .map_err(|e| ModelError::InvalidId(format!("{text:?} is not an ObjectId: {e}"))),
            (IdKind::Uuid, Bson::Binary(binary)) if binary.subtype == BinarySubtype::Uuid => {
                Ok(value.clone())
            }
            (IdKind::Uuid, Bson::String(text)) => Uuid::parse_str(text)
                .map(Bson::from)
                .map_err(|e| ModelError::InvalidId(format!("{text:?} is not a UUID: {e}"))),
            (IdKind::Native, Bson::Null | Bson::Undefined) => {
                Err(ModelError::InvalidId("null is not an identifier".to_string()))
            }
            (IdKind::Native, _) => Ok(value.clone()),
            (kind, other) => Err(ModelError::InvalidId(format!(
                "{other} cannot be used as a {kind:?} identifier"
            ))),
        }
    }

    /// Mints a fresh identifier, or `None` when the store has to assign one.
    pub fn generate(&self) -> Option<Bson> {
        match self {
            IdKind::ObjectId => Some(Bson::ObjectId(ObjectId::new())),
            IdKind::Uuid => Some(Bson::from(Uuid::new())),
            IdKind::Native => None,
        }
    }
}

/// Stable string key for an identifier value, used to index documents by id.
///
/// Keys carry the value's type, so the string `"1"` and the number `1` never collide.
/// Numbers of different widths share a key when they are equal, as they do in store
/// queries.
pub(crate) fn id_key(id: &Bson) -> String {
    match id {
        Bson::String(text) => format!("string:{text}"),
        Bson::ObjectId(oid) => format!("objectId:{}", oid.to_hex()),
        Bson::Int32(n) => format!("number:{n}"),
        Bson::Int64(n) => format!("number:{n}"),
        Bson::Double(n) if n.is_finite() && n.fract() == 0.0 => format!("number:{}", *n as i64),
        other => format!("{:?}:{other}", other.element_type()),
    }
}

/// A document of model `M` hydrated from the store or constructed by the caller.
///
/// An instance is an ordered mapping of field names to values; the identifier lives in
/// the `_id` field. When the model validates on construction and the attributes do not
/// pass, the [`ValidationError`] is kept on the instance instead of being raised, so
/// callers that care must check [`Instance::validation_error`] before trusting it.
pub struct Instance<M: Model> {
    attrs: Document,
    error: Option<ValidationError>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Model> Instance<M> {
    /// Builds an instance from raw attributes, validating them when the model asks for it.
    pub fn new(attrs: Document) -> Self {
        if !M::construct_with_schema() {
            return Self::from_parts(attrs, None);
        }

        match M::validate(attrs.clone()) {
            Ok(coerced) => Self::from_parts(coerced, None),
            Err(error) => {
                tracing::warn!(
                    collection = M::collection_name(),
                    %error,
                    "instance failed schema validation"
                );
                Self::from_parts(attrs, Some(error))
            }
        }
    }

    /// Builds an instance from any serializable value that serializes to a document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the value is not a document.
    pub fn from_value<T: Serialize>(value: &T) -> ModelResult<Self> {
        match serialize_to_bson(value)? {
            Bson::Document(attrs) => Ok(Self::new(attrs)),
            other => Err(ModelError::InvalidDocument(format!(
                "expected a document, got {:?}",
                other.element_type()
            ))),
        }
    }

    fn from_parts(attrs: Document, error: Option<ValidationError>) -> Self {
        Self { attrs, error, _marker: PhantomData }
    }

    /// Runs the model's validation on the current attributes.
    pub fn validate(&self) -> Result<Document, ValidationError> {
        M::validate(self.attrs.clone())
    }

    /// The validation failure captured at construction, if any.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// The `_id` of this instance, if it has one.
    pub fn id(&self) -> Option<&Bson> {
        self.attrs.get("_id")
    }

    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.attrs.get(field)
    }

    /// Sets a field, returning its previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Bson>) -> Option<Bson> {
        self.attrs.insert(field, value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Bson> {
        self.attrs.remove(field)
    }

    pub fn attrs(&self) -> &Document {
        &self.attrs
    }

    pub fn into_document(self) -> Document {
        self.attrs
    }

    /// Deserializes the attributes into a typed view.
    ///
    /// # Errors
    ///
    /// Returns an error if the attributes do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> ModelResult<T> {
        Ok(deserialize_from_bson(Bson::Document(self.attrs.clone()))?)
    }

    /// Converts the attributes to JSON.
    pub fn to_json(&self) -> ModelResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.attrs)?)
    }
}

impl<M: Model> Clone for Instance<M> {
    fn clone(&self) -> Self {
        Self::from_parts(self.attrs.clone(), self.error.clone())
    }
}

impl<M: Model> PartialEq for Instance<M> {
    fn eq(&self, other: &Self) -> bool {
        self.attrs == other.attrs && self.error == other.error
    }
}

impl<M: Model> fmt::Debug for Instance<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("collection", &M::collection_name())
            .field("attrs", &self.attrs)
            .field("error", &self.error)
            .finish()
    }
}

impl<M: Model> Serialize for Instance<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attrs.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    struct Plain;

    impl Model for Plain {
        fn collection_name() -> &'static str {
            "plain"
        }
    }

    struct Strict;

    impl Model for Strict {
        fn collection_name() -> &'static str {
            "strict"
        }

        fn construct_with_schema() -> bool {
            true
        }

        fn validate(mut attrs: Document) -> Result<Document, ValidationError> {
            if !attrs.contains_key("name") {
                return Err(ValidationError::for_field("name", "is required"));
            }
            if !attrs.contains_key("active") {
                attrs.insert("active", true);
            }
            Ok(attrs)
        }
    }

    #[test]
    fn construction_without_schema_keeps_attributes() {
        let instance = Instance::<Plain>::new(doc! { "_id": 7, "anything": "goes" });

        assert!(instance.is_valid());
        assert_eq!(instance.id(), Some(&Bson::Int32(7)));
        assert_eq!(instance.get("anything"), Some(&Bson::from("goes")));
    }

    #[test]
    fn validation_failure_is_attached_not_raised() {
        let instance = Instance::<Strict>::new(doc! { "email": "a@b.c" });

        assert_eq!(
            instance.validation_error(),
            Some(&ValidationError::for_field("name", "is required")),
        );
        assert_eq!(instance.attrs(), &doc! { "email": "a@b.c" });
    }

    #[test]
    fn validation_success_keeps_coerced_document() {
        let instance = Instance::<Strict>::new(doc! { "name": "Alice" });

        assert!(instance.is_valid());
        assert_eq!(instance.attrs(), &doc! { "name": "Alice", "active": true });
        assert!(instance.validate().is_ok());
    }

    #[test]
    fn decode_gives_typed_view() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct View {
            name: String,
            age: i32,
        }

        let instance = Instance::<Plain>::new(doc! { "name": "Bob", "age": 41 });
        assert_eq!(
            instance.decode::<View>().unwrap(),
            View { name: "Bob".into(), age: 41 },
        );
    }

    #[test]
    fn object_id_coercion_parses_hex_strings() {
        let oid = ObjectId::new();

        assert_eq!(
            IdKind::ObjectId.coerce(&Bson::String(oid.to_hex())).unwrap(),
            Bson::ObjectId(oid),
        );
        assert_eq!(IdKind::ObjectId.coerce(&Bson::ObjectId(oid)).unwrap(), Bson::ObjectId(oid));
        assert!(matches!(
            IdKind::ObjectId.coerce(&Bson::from("not-an-id")),
            Err(ModelError::InvalidId(_)),
        ));
        assert!(matches!(
            IdKind::ObjectId.coerce(&Bson::Int32(3)),
            Err(ModelError::InvalidId(_)),
        ));
    }

    #[test]
    fn uuid_coercion_parses_hyphenated_strings() {
        let uuid = Uuid::new();
        let coerced = IdKind::Uuid.coerce(&Bson::String(uuid.to_string())).unwrap();

        assert_eq!(coerced, Bson::from(uuid));
        assert_eq!(IdKind::Uuid.coerce(&coerced).unwrap(), coerced);
        assert!(IdKind::Uuid.coerce(&Bson::from("nope")).is_err());
    }

    #[test]
    fn native_ids_pass_through() {
        assert_eq!(IdKind::Native.coerce(&Bson::from("A")).unwrap(), Bson::from("A"));
        assert_eq!(IdKind::Native.coerce(&Bson::Int64(9)).unwrap(), Bson::Int64(9));
        assert!(IdKind::Native.coerce(&Bson::Null).is_err());
        assert!(IdKind::Native.generate().is_none());
    }

    #[test]
    fn id_keys_agree_for_coerced_values() {
        let oid = ObjectId::new();
        let coerced = IdKind::ObjectId.coerce(&Bson::String(oid.to_hex())).unwrap();

        assert_eq!(id_key(&coerced), id_key(&Bson::ObjectId(oid)));
        assert_eq!(id_key(&Bson::from("A")), id_key(&Bson::String("A".to_string())));
    }

    #[test]
    fn id_keys_keep_strings_and_numbers_apart() {
        let oid = ObjectId::new();

        assert_ne!(id_key(&Bson::from("1")), id_key(&Bson::Int32(1)));
        assert_ne!(id_key(&Bson::from(oid.to_hex())), id_key(&Bson::ObjectId(oid)));
        assert_eq!(id_key(&Bson::Int32(1)), id_key(&Bson::Int64(1)));
        assert_eq!(id_key(&Bson::Int64(2)), id_key(&Bson::Double(2.0)));
        assert_ne!(id_key(&Bson::Double(2.5)), id_key(&Bson::Int64(2)));
    }
}
