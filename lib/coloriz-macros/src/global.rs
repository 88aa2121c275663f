use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{quote, quote_spanned};
use syn::parse::{Parse, ParseStream};
use syn::spanned::Spanned;
use syn::{parse_macro_input, Attribute, Expr, Ident, Result, Token, Type, Visibility};

/// A single `static NAME: Type = init;` declaration.
struct Global {
    attributes: Vec<Attribute>,
    visibility: Visibility,
    name: Ident,
    stored: Type,
    initializer: Expr,
}

impl Parse for Global {
    fn parse(input: ParseStream) -> Result<Self> {
        let attributes = input.call(Attribute::parse_outer)?;
        let visibility = input.parse()?;

        input.parse::<Token![static]>()?;
        let name = input.parse()?;
        input.parse::<Token![:]>()?;
        let stored = input.parse()?;
        input.parse::<Token![=]>()?;
        let initializer = input.parse()?;
        input.parse::<Token![;]>()?;

        Ok(Self { attributes, visibility, name, stored, initializer })
    }
}

struct GlobalList(Vec<Global>);

impl Parse for GlobalList {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut list = vec![];

        while !input.is_empty() {
            list.push(input.parse()?);
        }

        Ok(Self(list))
    }
}

pub fn procedure(input: TokenStream) -> TokenStream {
    let GlobalList(list) = parse_macro_input!(input);

    let items = list.into_iter().map(|Global { attributes, visibility, name, stored, initializer }| {
        let getter = Ident::new(&name.to_string().to_lowercase(), Span::call_site());
        let assert_sync = quote_spanned! {
            stored.span() => struct _AssertSync where #stored: ::std::marker::Sync;
        };

        quote! {
            static #name: ::std::sync::OnceLock<#stored> = ::std::sync::OnceLock::new();

            #(#attributes)*
            #[inline]
            #visibility fn #getter() -> &'static #stored {
                #assert_sync

                #name.get_or_init(|| #initializer)
            }
        }
    });

    quote!(#(#items)*).into()
}
