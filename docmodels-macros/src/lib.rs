//! Procedural macros for the docmodels project.
//!
//! `#[derive(Model)]` binds a type to its collection and wires its identifier kind and
//! validation hook:
//!
//! ```ignore
//! use docmodels::prelude::*;
//!
//! fn check_user(attrs: Document) -> Result<Document, ValidationError> {
//!     match attrs.contains_key("email") {
//!         true => Ok(attrs),
//!         false => Err(ValidationError::for_field("email", "is required")),
//!     }
//! }
//!
//! #[derive(Model)]
//! #[model(collection = "users", id = "uuid", validate = check_user, construct_with_schema)]
//! pub struct User;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodels_macros;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{DeriveInput, Ident, LitStr, Path, parse_macro_input};

#[derive(Default)]
struct ModelArgs {
    collection: Option<LitStr>,
    id: Option<Ident>,
    validate: Option<Path>,
    construct_with_schema: bool,
}

impl ModelArgs {
    fn parse(input: &DeriveInput) -> syn::Result<Self> {
        let mut args = ModelArgs::default();

        for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("model")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("collection") {
                    args.collection = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("id") {
                    let kind: LitStr = meta.value()?.parse()?;
                    let variant = match kind.value().as_str() {
                        "object_id" => "ObjectId",
                        "uuid" => "Uuid",
                        "native" => "Native",
                        other => {
                            return Err(syn::Error::new(
                                kind.span(),
                                format!("unknown id kind `{other}`, expected `object_id`, `uuid` or `native`"),
                            ));
                        }
                    };
                    args.id = Some(Ident::new(variant, kind.span()));
                } else if meta.path.is_ident("validate") {
                    args.validate = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("construct_with_schema") {
                    args.construct_with_schema = true;
                } else {
                    return Err(meta.error("unknown model attribute"));
                }

                Ok(())
            })?;
        }

        if args.construct_with_schema && args.validate.is_none() {
            return Err(syn::Error::new(
                Span::call_site(),
                "`construct_with_schema` requires a `validate` function",
            ));
        }

        Ok(args)
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let args = ModelArgs::parse(&input)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let collection = args.collection.ok_or_else(|| {
        syn::Error::new_spanned(name, "missing `#[model(collection = \"...\")]`")
    })?;

    let id_kind = args.id.map(|variant| {
        quote! {
            fn id_kind() -> ::docmodels::model::IdKind {
                ::docmodels::model::IdKind::#variant
            }
        }
    });

    let construct_with_schema = args.construct_with_schema.then(|| {
        quote! {
            fn construct_with_schema() -> bool {
                true
            }
        }
    });

    let validate = args.validate.map(|path| {
        quote! {
            fn validate(
                attrs: ::docmodels::bson::Document,
            ) -> ::core::result::Result<::docmodels::bson::Document, ::docmodels::error::ValidationError> {
                #path(attrs)
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::docmodels::model::Model for #name #ty_generics #where_clause {
            fn collection_name() -> &'static str {
                #collection
            }

            #id_kind
            #construct_with_schema
            #validate
        }
    })
}

/// Derives `docmodels::model::Model`.
///
/// Attributes, all under `#[model(...)]`:
///
/// - `collection = "name"` (required)
/// - `id = "object_id" | "uuid" | "native"` (default `object_id`)
/// - `validate = path::to::function`, a `fn(Document) -> Result<Document, ValidationError>`
/// - `construct_with_schema`, validating on construction (requires `validate`)
#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
