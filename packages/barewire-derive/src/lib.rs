//! `#[derive(BareValue)]`: generates a BARE [`Type`] for a struct or enum
//! plus `into_value`/`from_value`/`bare_type` (the
//! `barewire::convert::BareValue` trait) built from each field's own
//! implementation of that trait, so nested derived types compose without
//! the macro needing to know their shape.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Data, DataEnum, DataStruct, DeriveInput, Fields, FieldsNamed,
    FieldsUnnamed, Variant,
};

#[proc_macro_derive(BareValue)]
pub fn derive_bare_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let (bare_type, into_value, from_value) = match &input.data {
        Data::Struct(DataStruct { fields, .. }) => struct_impls(fields),
        Data::Enum(DataEnum { variants, .. }) => enum_impls(variants),
        Data::Union(_) => panic!("cannot derive BareValue on a union"),
    };

    quote! {
        impl ::barewire::convert::BareValue for #name {
            fn bare_type() -> ::barewire::schema::Type {
                #bare_type
            }

            fn into_value(self) -> ::barewire::value::Value {
                #into_value
            }

            fn from_value(value: &::barewire::value::Value) -> ::barewire::error::Result<Self> {
                #from_value
            }
        }
    }
    .into()
}

fn struct_impls(fields: &Fields) -> (TokenStream2, TokenStream2, TokenStream2) {
    match fields {
        Fields::Named(FieldsNamed { named, .. }) => {
            let names: Vec<_> = named.iter().map(|f| f.ident.clone().unwrap()).collect();
            let tys: Vec<_> = named.iter().map(|f| &f.ty).collect();
            let name_strs: Vec<_> = names.iter().map(|n| n.to_string()).collect();

            let bare_type = quote! {
                ::barewire::schema::Type::Struct(vec![#(
                    ::barewire::schema::StructField {
                        name: ::std::string::String::from(#name_strs),
                        ty: <#tys as ::barewire::convert::BareValue>::bare_type(),
                    },
                )*])
            };
            let into_value = quote! {
                ::barewire::value::Value::Struct(vec![#(
                    (::std::string::String::from(#name_strs), ::barewire::convert::BareValue::into_value(self.#names)),
                )*])
            };
            let from_value = quote! {
                let fields = value.as_struct_fields().ok_or_else(|| {
                    ::barewire::error::Error::new(
                        ::barewire::error::ErrorKind::InvalidValue,
                        "expected struct value",
                    )
                })?;
                #(
                    let #names = fields.iter()
                        .find(|(n, _)| n == #name_strs)
                        .map(|(_, v)| v)
                        .ok_or_else(|| ::barewire::error::Error::new(
                            ::barewire::error::ErrorKind::InvalidValue,
                            ::std::format!("missing field {:?}", #name_strs),
                        ))?;
                    let #names = <#tys as ::barewire::convert::BareValue>::from_value(#names)?;
                )*
                Ok(Self { #(#names,)* })
            };
            (bare_type, into_value, from_value)
        }
        Fields::Unnamed(FieldsUnnamed { unnamed, .. }) if unnamed.len() == 1 => {
            let ty = &unnamed[0].ty;
            let bare_type = quote! { <#ty as ::barewire::convert::BareValue>::bare_type() };
            let into_value = quote! { ::barewire::convert::BareValue::into_value(self.0) };
            let from_value = quote! { Ok(Self(<#ty as ::barewire::convert::BareValue>::from_value(value)?)) };
            (bare_type, into_value, from_value)
        }
        Fields::Unnamed(_) => panic!("BareValue only supports newtype (single-field) tuple structs"),
        Fields::Unit => {
            let bare_type = quote! { ::barewire::schema::Type::Void };
            let into_value = quote! { ::barewire::value::Value::Void };
            let from_value = quote! { Ok(Self) };
            (bare_type, into_value, from_value)
        }
    }
}

/// Enum variants become union cases tagged by declaration order. A unit
/// variant's case type is `void`; a single-field tuple variant's case
/// type is that field's own type; everything else (named fields, or more
/// than one unnamed field) becomes a nested struct case.
fn enum_impls(variants: &syn::punctuated::Punctuated<Variant, syn::token::Comma>) -> (TokenStream2, TokenStream2, TokenStream2) {
    let tags: Vec<u64> = (0..variants.len() as u64).collect();
    let variant_names: Vec<_> = variants.iter().map(|v| &v.ident).collect();

    let case_types: Vec<TokenStream2> = variants
        .iter()
        .map(|v| match &v.fields {
            Fields::Unit => quote! { ::barewire::schema::Type::Void },
            Fields::Unnamed(FieldsUnnamed { unnamed, .. }) if unnamed.len() == 1 => {
                let ty = &unnamed[0].ty;
                quote! { <#ty as ::barewire::convert::BareValue>::bare_type() }
            }
            _ => panic!("BareValue enum variants must be unit or single-field tuple variants"),
        })
        .collect();

    let bare_type = quote! {
        ::barewire::schema::Type::Union(vec![#(
            ::barewire::schema::UnionCase { tag: #tags, ty: #case_types },
        )*])
    };

    let into_arms: Vec<TokenStream2> = variants
        .iter()
        .zip(tags.iter())
        .map(|(v, tag)| {
            let vname = &v.ident;
            match &v.fields {
                Fields::Unit => quote! {
                    Self::#vname => ::barewire::value::Value::union(#tag, ::barewire::value::Value::Void)
                },
                Fields::Unnamed(_) => quote! {
                    Self::#vname(inner) => ::barewire::value::Value::union(
                        #tag,
                        ::barewire::convert::BareValue::into_value(inner),
                    )
                },
                _ => unreachable!(),
            }
        })
        .collect();
    let into_value = quote! {
        match self { #(#into_arms,)* }
    };

    let from_arms: Vec<TokenStream2> = variants
        .iter()
        .zip(tags.iter())
        .zip(case_types.iter())
        .map(|((v, tag), _)| {
            let vname = &v.ident;
            match &v.fields {
                Fields::Unit => quote! { #tag => Ok(Self::#vname) },
                Fields::Unnamed(FieldsUnnamed { unnamed, .. }) => {
                    let ty = &unnamed[0].ty;
                    quote! {
                        #tag => Ok(Self::#vname(<#ty as ::barewire::convert::BareValue>::from_value(inner)?))
                    }
                }
                _ => unreachable!(),
            }
        })
        .collect();
    let from_value = quote! {
        match value {
            ::barewire::value::Value::Union { tag, value: inner } => {
                match *tag {
                    #(#from_arms,)*
                    other => Err(::barewire::error::Error::new(
                        ::barewire::error::ErrorKind::InvalidValue,
                        ::std::format!("unknown union tag {}", other),
                    )),
                }
            }
            other => Err(::barewire::error::Error::new(
                ::barewire::error::ErrorKind::InvalidValue,
                ::std::format!("expected union value, got {:?}", other),
            )),
        }
    };

    (bare_type, into_value, from_value)
}
