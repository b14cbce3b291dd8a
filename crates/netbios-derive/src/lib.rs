//! Utility macros for building NetBIOS wire structures.
//!
//! Used by `netbios-msg`; re-exported from there for the rest of the workspace.

use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, Fields, ItemStruct, parse_macro_input};

/// Performs common changes to binrw structs.
///
/// - Adds `#[binrw]` and the common derives to the item.
/// - Modifies any field named `reserved` to have `#[br(temp)]` and a zeroing
///   `#[bw(calc = ...)]` attribute, so reserved space is skipped on read and
///   written as zeros.
fn common_struct_changes(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    let is_struct = matches!(input.data, syn::Data::Struct(_));

    let output_all = TokenStream::from(quote! {
        #[::binrw::binrw]
        #[derive(Debug, PartialEq, Eq)]
        #input
    });

    if !is_struct {
        return output_all;
    }

    let mut item = parse_macro_input!(output_all as ItemStruct);

    if let Fields::Named(ref mut fields) = item.fields {
        let mut reserved_index = 0usize;
        for field in fields.named.iter_mut() {
            if !field.ident.as_ref().is_some_and(|id| *id == "reserved") {
                continue;
            }
            if field.vis != syn::Visibility::Inherited {
                return syn::Error::new_spanned(
                    &field.vis,
                    "reserved field must have no visibility defined",
                )
                .to_compile_error()
                .into();
            }

            // Several reserved fields may live in one struct.
            field.ident = Some(syn::Ident::new(
                &format!("_reserved{}", reserved_index),
                proc_macro2::Span::call_site(),
            ));
            reserved_index += 1;

            field.attrs.push(syn::parse_quote! {
                #[br(temp)]
            });

            let default_bw_calc = if let syn::Type::Array(arr) = &field.ty {
                let len = arr.len.clone();
                syn::parse_quote! {
                    #[bw(calc = [0; #len])]
                }
            } else {
                syn::parse_quote! {
                    #[bw(calc = Default::default())]
                }
            };

            field.attrs.push(default_bw_calc);
        }
    }

    TokenStream::from(quote! {
        #item
    })
}

/// Proc-macro for adding binrw attributes to NetBIOS message structs and enums.
///
/// Adds `#[binrw]`, `Debug`, `PartialEq` and `Eq`, and zeroes out `reserved` fields.
#[proc_macro_attribute]
pub fn nbt_message_binrw(_attr: TokenStream, input: TokenStream) -> TokenStream {
    common_struct_changes(input)
}

/// Proc-macro for declaring a `modular_bitfield` flags struct that is also
/// readable and writable with binrw, as its raw byte array.
///
/// Fields are laid out starting at the least significant bit of the first byte,
/// so declare them in wire byte order.
#[proc_macro_attribute]
pub fn mbitfield(_attr: TokenStream, input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as ItemStruct);

    TokenStream::from(quote! {
        #[::modular_bitfield::bitfield]
        #[derive(::binrw::BinWrite, ::binrw::BinRead, Debug, Default, Clone, Copy, PartialEq, Eq)]
        #[bw(map = |&x| Self::into_bytes(x))]
        #[br(map = Self::from_bytes)]
        #input
    })
}
