//! `#[derive(Ssz)]`: generates `SszSize`/`SszWrite`/`SszRead`/`SszHash` for a container struct
//! by composing its fields in declaration order, following the standard SSZ container algorithm
//! (fixed fields inline, variable fields via a 4-byte offset table) and Merkleizing one chunk per
//! field.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Fields};

#[proc_macro_derive(Ssz)]
pub fn derive_ssz(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return syn::Error::new_spanned(&input, "Ssz can only be derived for structs")
            .into_compile_error()
            .into();
    };

    let Fields::Named(fields) = &data.fields else {
        return syn::Error::new_spanned(&input, "Ssz requires named fields")
            .into_compile_error()
            .into();
    };

    let field_idents = fields
        .named
        .iter()
        .map(|field| field.ident.as_ref().expect("named field"))
        .collect::<Vec<_>>();

    let field_types = fields.named.iter().map(|field| &field.ty).collect::<Vec<_>>();

    let size_fixed_sum = quote! {
        0_usize #(+ match <#field_types as ::ssz::SszSize>::SIZE {
            ::ssz::Size::Fixed(length) => length,
            ::ssz::Size::Variable => 4,
        })*
    };

    let size_is_variable = quote! {
        #(matches!(<#field_types as ::ssz::SszSize>::SIZE, ::ssz::Size::Variable) ||)* false
    };

    let write_body = quote! {
        let mut variable_part = ::std::vec::Vec::new();
        let mut offset = #size_fixed_sum;

        #(
            match <#field_types as ::ssz::SszSize>::SIZE {
                ::ssz::Size::Fixed(_) => {
                    ::ssz::SszWrite::write_variable(&self.#field_idents, bytes);
                }
                ::ssz::Size::Variable => {
                    bytes.extend_from_slice(&(offset as u32).to_le_bytes());
                    let before = variable_part.len();
                    ::ssz::SszWrite::write_variable(&self.#field_idents, &mut variable_part);
                    offset += variable_part.len() - before;
                }
            }
        )*

        bytes.extend(variable_part);
    };

    let read_body = quote! {
        let mut cursor = 0_usize;
        let mut offsets: ::std::vec::Vec<::std::option::Option<usize>> = ::std::vec::Vec::new();
        #(
            let #field_idents = match <#field_types as ::ssz::SszSize>::SIZE {
                ::ssz::Size::Fixed(length) => {
                    let end = cursor + length;
                    let slice = bytes.get(cursor..end).ok_or(::ssz::ReadError::TooShort {
                        expected: end,
                        actual: bytes.len(),
                    })?;
                    cursor = end;
                    offsets.push(::std::option::Option::None);
                    ::std::option::Option::Some(<#field_types as ::ssz::SszRead<_>>::from_ssz_unchecked(context, slice)?)
                }
                ::ssz::Size::Variable => {
                    let end = cursor + 4;
                    let slice = bytes.get(cursor..end).ok_or(::ssz::ReadError::TooShort {
                        expected: end,
                        actual: bytes.len(),
                    })?;
                    let array: [u8; 4] = slice.try_into().expect("checked length above");
                    let value_offset = u32::from_le_bytes(array) as usize;
                    cursor = end;
                    offsets.push(::std::option::Option::Some(value_offset));
                    ::std::option::Option::None
                }
            };
        )*

        let mut boundaries = offsets
            .iter()
            .filter_map(|offset| *offset)
            .collect::<::std::vec::Vec<_>>();
        boundaries.push(bytes.len());

        let mut variable_index = 0_usize;

        #(
            let #field_idents = match #field_idents {
                ::std::option::Option::Some(value) => value,
                ::std::option::Option::None => {
                    let start = boundaries[variable_index];
                    let end = *boundaries.get(variable_index + 1).unwrap_or(&bytes.len());
                    variable_index += 1;

                    if start > end || end > bytes.len() {
                        return ::std::result::Result::Err(::ssz::ReadError::InvalidOffset {
                            offset: start,
                            length: bytes.len(),
                        });
                    }

                    <#field_types as ::ssz::SszRead<_>>::from_ssz_unchecked(context, &bytes[start..end])?
                }
            };
        )*

        ::std::result::Result::Ok(Self { #(#field_idents),* })
    };

    // `SszRead` needs a context type parameter `C` that the struct itself does not declare, so
    // build its impl generics separately from the struct's own `impl_generics`.
    let mut read_generics = input.generics.clone();
    read_generics.params.push(parse_quote!(C));
    let (read_impl_generics, _, _) = read_generics.split_for_impl();

    let read_impl = quote! {
        impl #read_impl_generics ::ssz::SszRead<C> for #name #type_generics #where_clause
        where
            #(#field_types: ::ssz::SszRead<C>,)*
        {
            fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> ::std::result::Result<Self, ::ssz::ReadError> {
                #read_body
            }
        }
    };

    let expanded = quote! {
        impl #impl_generics ::ssz::SszSize for #name #type_generics #where_clause {
            const SIZE: ::ssz::Size = if #size_is_variable {
                ::ssz::Size::Variable
            } else {
                ::ssz::Size::Fixed(#size_fixed_sum)
            };
        }

        impl #impl_generics ::ssz::SszWrite for #name #type_generics #where_clause {
            fn write_variable(&self, bytes: &mut ::std::vec::Vec<u8>) {
                #write_body
            }
        }

        #read_impl

        impl #impl_generics ::ssz::SszHash for #name #type_generics #where_clause {
            fn hash_tree_root(&self) -> ::ethereum_types::H256 {
                let chunks = [
                    #(::ssz::SszHash::hash_tree_root(&self.#field_idents)),*
                ];

                let depth = ::hashing::depth_for_leaf_count(chunks.len().max(1));
                ::hashing::merkleize(&chunks, depth)
            }
        }
    };

    expanded.into()
}
