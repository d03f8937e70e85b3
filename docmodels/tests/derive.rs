mod common;

use common::{Author, Member, Session, User};
use docmodels::{bson::doc, prelude::*};

#[test]
fn derive_binds_collection_and_id_kind() {
    assert_eq!(User::collection_name(), "users");
    assert_eq!(User::id_kind(), IdKind::ObjectId);
    assert_eq!(Session::id_kind(), IdKind::Uuid);
    assert_eq!(Author::id_kind(), IdKind::Native);
    assert!(!User::construct_with_schema());
}

#[test]
fn derive_wires_the_validation_hook() {
    assert!(Member::construct_with_schema());
    assert!(Member::validate(doc! { "email": "a@b.c" }).is_ok());

    let err = Member::validate(doc! {}).unwrap_err();
    assert_eq!(err.field.as_deref(), Some("email"));

    let member = Instance::<Member>::new(doc! { "name": "Ann" });
    assert!(!member.is_valid());
    assert_eq!(member.get("name").and_then(|name| name.as_str()), Some("Ann"));
}

#[test]
fn models_without_validation_accept_anything() {
    let user = Instance::<User>::new(doc! {});
    assert!(user.is_valid());
    assert!(User::validate(doc! { "anything": 1 }).is_ok());
}
