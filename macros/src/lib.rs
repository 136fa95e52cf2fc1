extern crate proc_macro;
use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, FieldsNamed, parse_macro_input};

/// Derives the storage `Encode` trait for a struct with named fields by
/// concatenating each field's encoding in declaration order. Field order is
/// part of the persisted key/value layout.
#[proc_macro_derive(Encode)]
pub fn encode_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    let fields = match named_fields(&input.data) {
        Ok(fields) => fields,
        Err(msg) => {
            return syn::Error::new_spanned(name, msg)
                .to_compile_error()
                .into();
        }
    };

    let appends = fields.named.iter().map(|field| {
        let field_name = &field.ident;
        quote! {
            out.extend(crate::storage::encdec::Encode::encode(&self.#field_name));
        }
    });

    let expanded = quote! {
        impl crate::storage::encdec::Encode for #name {
            fn encode(&self) -> Vec<u8> {
                let mut out = Vec::new();

                #(#appends)*

                out
            }
        }
    };

    expanded.into()
}

/// Derives the storage `Decode` trait for a struct with named fields,
/// consuming the input slice field by field in declaration order and
/// returning the remaining bytes.
#[proc_macro_derive(Decode)]
pub fn decode_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    let fields = match named_fields(&input.data) {
        Ok(fields) => fields,
        Err(msg) => {
            return syn::Error::new_spanned(name, msg)
                .to_compile_error()
                .into();
        }
    };

    let field_names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();

    let field_decodes = fields.named.iter().map(|field| {
        let field_name = &field.ident;
        let field_ty = &field.ty;
        quote! {
            let (#field_name, bytes) =
                <#field_ty as crate::storage::encdec::Decode>::decode(bytes)?;
        }
    });

    let expanded = quote! {
        impl crate::storage::encdec::Decode for #name {
            fn decode(bytes: &[u8]) -> crate::storage::encdec::DecodingResult<Self> {
                #(#field_decodes)*

                Ok((
                    Self {
                        #(#field_names),*
                    },
                    bytes,
                ))
            }
        }
    };

    expanded.into()
}

fn named_fields(data: &Data) -> Result<&FieldsNamed, &'static str> {
    match data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields),
            Fields::Unnamed(_) => Err("tuple structs are not supported, use named fields"),
            Fields::Unit => Err("unit structs are not supported, use named fields"),
        },
        _ => Err("Encode/Decode can only be derived for structs"),
    }
}
