//! Procedural macros for the docnest project.
//!
//! This crate provides compile-time code generation for docnest, currently the
//! `#[derive(Item)]` schema marker. Use it through the `docnest` facade, which re-exports it.

#[allow(unused_extern_crates)]
extern crate self as docnest_macros;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, Type, parse_macro_input, spanned::Spanned};

/// Implements `docnest::item::Item` for a struct with named fields.
///
/// The identifier is the field named `id`, or the field marked `#[item(id)]`. Either way it
/// must be a `String`, and it must serialize under the `"id"` key.
///
/// ```ignore
/// use docnest::Item;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize, Item)]
/// pub struct Widget {
///     pub id: String,
///     pub name: String,
/// }
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize, Item)]
/// pub struct Sku {
///     #[item(id)]
///     #[serde(rename = "id")]
///     pub code: String,
/// }
/// ```
#[proc_macro_derive(Item, attributes(item))]
pub fn derive_item(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(Error::new(input.ident.span(), "Item can only be derived for structs with named fields")),
        },
        _ => return Err(Error::new(input.ident.span(), "Item can only be derived for structs")),
    };

    let id_field = find_id_field(fields.iter(), &input.ident)?;
    check_string(id_field)?;

    let id = id_field
        .ident
        .as_ref()
        .ok_or_else(|| Error::new(id_field.span(), "identifier field must be named"))?;

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::docnest::item::Item for #name #ty_generics #where_clause {
            fn id(&self) -> &str {
                &self.#id
            }

            fn set_id(&mut self, id: ::std::string::String) {
                self.#id = id;
            }
        }
    })
}

fn find_id_field<'a>(fields: impl Iterator<Item = &'a Field> + Clone, name: &Ident) -> syn::Result<&'a Field> {
    let mut marked = None;

    for field in fields.clone() {
        if is_marked_id(field)? {
            if marked.is_some() {
                return Err(Error::new(field.span(), "only one field may be marked #[item(id)]"));
            }
            marked = Some(field);
        }
    }

    if let Some(field) = marked {
        return Ok(field);
    }

    fields
        .into_iter()
        .find(|field| field.ident.as_ref().is_some_and(|ident| ident == "id"))
        .ok_or_else(|| {
            Error::new(
                name.span(),
                format!("{name} needs an `id: String` field or a field marked #[item(id)]"),
            )
        })
}

fn is_marked_id(field: &Field) -> syn::Result<bool> {
    let mut marked = false;

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("item")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                marked = true;
                Ok(())
            } else {
                Err(meta.error("unsupported item attribute, expected `id`"))
            }
        })?;
    }

    Ok(marked)
}

fn check_string(field: &Field) -> syn::Result<()> {
    let is_string = match &field.ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "String" && segment.arguments.is_empty()),
        _ => false,
    };

    if is_string {
        Ok(())
    } else {
        Err(Error::new(
            field.ty.span(),
            "the identifier field must be a `String`",
        ))
    }
}
