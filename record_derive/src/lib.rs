extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;

#[proc_macro_derive(Record, attributes(record, serial))]
pub fn record_derive(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);

    impl_record(&ast)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Reads `#[record(name = "...")]` off the type, if present.
fn record_name(ast: &syn::DeriveInput) -> syn::Result<Option<syn::LitStr>> {
    let mut name = None;
    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse::<syn::LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported `record` attribute, expected `name`"))
            }
        })?;
    }
    Ok(name)
}

/// Returns the serialized name of a field carrying the `#[serial]` marker, or
/// `None` for fields that are not serialized.
fn serial_name(field: &syn::Field, ident: &syn::Ident) -> syn::Result<Option<String>> {
    let mut marked = false;
    let mut name = ident.unraw().to_string();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("serial")) {
        marked = true;
        if matches!(attr.meta, syn::Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                name = meta.value()?.parse::<syn::LitStr>()?.value();
                Ok(())
            } else {
                Err(meta.error("unsupported `serial` attribute, expected `rename`"))
            }
        })?;
    }
    Ok(marked.then_some(name))
}

fn impl_record(ast: &syn::DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let record_trait = quote! { ::plaindata::Record };
    let field_trait = quote! { ::plaindata::schema::Field };
    let descriptor_type = quote! { ::plaindata::schema::FieldDescriptor };
    let kind_type = quote! { ::plaindata::schema::FieldKind };
    let value_type = quote! { ::plaindata::Value };
    let access_error = quote! { ::plaindata::error::AccessError };

    let name = &ast.ident;
    if !ast.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &ast.generics,
            "derive macro `Record` does not support generic types",
        ));
    }

    let named = match &ast.data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(syn::FieldsNamed { named, .. }),
            ..
        }) => named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "derive macro `Record` is only implemented for structs with named fields",
            ))
        }
    };

    let mut descriptors = Vec::new();
    for field in named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        if let Some(fname) = serial_name(field, ident)? {
            let ty = &field.ty;
            descriptors.push(quote! {
                #descriptor_type::new::<Self, #ty>(#fname, |r| &r.#ident, |r| &mut r.#ident)
            });
        }
    }

    let qualified = match record_name(ast)? {
        Some(lit) => quote! { #lit },
        None => quote! { ::std::concat!(::std::module_path!(), "::", ::std::stringify!(#name)) },
    };

    Ok(quote! {
        impl #record_trait for #name {
            const NAME: &'static str = #qualified;

            fn fields() -> ::std::vec::Vec<#descriptor_type> {
                ::std::vec![ #( #descriptors ),* ]
            }
        }

        impl #field_trait for #name {
            const KIND: #kind_type = #kind_type::Record(<Self as #record_trait>::NAME);

            fn to_value(&self) -> #value_type {
                #value_type::record(::std::clone::Clone::clone(self))
            }

            fn from_value(value: #value_type) -> ::std::result::Result<Self, #access_error> {
                value.into_record::<Self>()
            }
        }
    })
}
