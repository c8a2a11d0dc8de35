//! Implementation of the `#[derive(Recordable)]` macro.
//!
//! For a struct `Name` the macro generates a `NameRecorder` with one method
//! per recorded field, plus the `Invocable`, `Recorder` and `Recordable`
//! implementations that connect the two.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{spanned::Spanned, Data, DeriveInput, Error, Fields, Result};

use super::attrs::{parse_record_attrs, FieldKind};

/// Main implementation of the Recordable derive macro.
pub fn recordable_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;
    let vis = &input.vis;

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Recordable cannot be derived for generic structs",
        ));
    }

    // Ensure we have a struct with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "Recordable can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "Recordable can only be derived for structs",
            ))
        }
    };

    let recorder_name = format_ident!("{}Recorder", struct_name);

    let mut recorder_methods: Vec<TokenStream> = Vec::new();
    let mut replay_arms: Vec<TokenStream> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for field in fields.iter() {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;
        let field_ty = &field.ty;

        let attrs = parse_record_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let method_name = attrs.rename.unwrap_or_else(|| field_name.to_string());
        if seen.contains(&method_name) {
            return Err(Error::new(
                field.span(),
                format!("duplicate recorded method name `{}`", method_name),
            ));
        }
        seen.push(method_name.clone());

        let (recorded_ty, value_expr) = match attrs.kind {
            FieldKind::Value => (
                quote! { #field_ty },
                quote! {
                    ::jaqlib::Value::from(::core::clone::Clone::clone(&self.#field_name))
                },
            ),
            FieldKind::Timestamp => (
                quote! { ::jaqlib::Timestamp },
                quote! {
                    ::jaqlib::Value::Timestamp(
                        ::jaqlib::TimestampField::timestamp(&self.#field_name)
                    )
                },
            ),
            FieldKind::Enum => (
                quote! { u32 },
                quote! {
                    ::jaqlib::Value::Enum(
                        ::jaqlib::EnumField::discriminant(&self.#field_name)
                    )
                },
            ),
        };

        let doc = format!("Records a reference to `{}`.", method_name);
        recorder_methods.push(quote! {
            #[doc = #doc]
            #vis fn #field_name(&self) -> #recorded_ty {
                ::jaqlib::Recorder::record::<#recorded_ty>(self, #method_name)
            }
        });

        replay_arms.push(quote! {
            #method_name => ::core::result::Result::Ok(#value_expr),
        });
    }

    let recorder_doc = format!("Recording stand-in for [`{}`].", struct_name);

    let expanded = quote! {
        #[doc = #recorder_doc]
        #[derive(Debug, Default)]
        #vis struct #recorder_name {
            log: ::jaqlib::InvocationLog,
        }

        impl #recorder_name {
            #(#recorder_methods)*
        }

        impl ::jaqlib::Recorder for #recorder_name {
            fn log(&self) -> &::jaqlib::InvocationLog {
                &self.log
            }
        }

        impl ::jaqlib::Invocable for #struct_name {
            fn invoke(
                &self,
                invocation: &::jaqlib::MethodInvocation,
            ) -> ::jaqlib::Result<::jaqlib::Value> {
                match invocation.method() {
                    #(#replay_arms)*
                    other => ::core::result::Result::Err(::jaqlib::JaqError::unknown_method(other)),
                }
            }
        }

        impl ::jaqlib::Recordable for #struct_name {
            type Recorder = #recorder_name;

            fn recorder() -> Self::Recorder {
                <#recorder_name as ::core::default::Default>::default()
            }
        }
    };

    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(input: DeriveInput) -> Result<String> {
        recordable_derive_impl(input).map(|tokens| tokens.to_string())
    }

    #[test]
    fn test_generates_recorder_and_impls() {
        let out = expand(syn::parse_quote! {
            pub struct Person {
                last_name: String,
                #[record(rename = "years")]
                age: u32,
                #[record(skip)]
                notes: Vec<String>,
            }
        })
        .unwrap();

        assert!(out.contains("pub struct PersonRecorder"));
        assert!(out.contains("fn last_name"));
        assert!(out.contains("\"years\""));
        assert!(!out.contains("notes"));
        assert!(out.contains(":: jaqlib :: Invocable for Person"));
        assert!(out.contains(":: jaqlib :: Recordable for Person"));
    }

    #[test]
    fn test_enum_and_timestamp_fields_record_converted_types() {
        let out = expand(syn::parse_quote! {
            struct Task {
                #[record(Enum)]
                status: Status,
                #[record(Timestamp)]
                due: i64,
            }
        })
        .unwrap();

        assert!(out.contains("fn status (& self) -> u32"));
        assert!(out.contains("fn due (& self) -> :: jaqlib :: Timestamp"));
        assert!(out.contains("EnumField :: discriminant"));
        assert!(out.contains("TimestampField :: timestamp"));
    }

    #[test]
    fn test_rejects_enums() {
        let err = expand(syn::parse_quote! {
            enum Status { Open, Closed }
        })
        .unwrap_err();
        assert!(err.to_string().contains("only be derived for structs"));
    }

    #[test]
    fn test_rejects_tuple_structs() {
        let err = expand(syn::parse_quote! {
            struct Pair(u32, u32);
        })
        .unwrap_err();
        assert!(err.to_string().contains("named fields"));
    }

    #[test]
    fn test_rejects_generics() {
        let err = expand(syn::parse_quote! {
            struct Wrapper<T> { inner: T }
        })
        .unwrap_err();
        assert!(err.to_string().contains("generic"));
    }

    #[test]
    fn test_rejects_duplicate_method_names() {
        let err = expand(syn::parse_quote! {
            struct Person {
                name: String,
                #[record(rename = "name")]
                nickname: String,
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
