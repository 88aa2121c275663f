use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::parse::ParseStream;
use syn::{parse_macro_input, Attribute, DeriveInput, Error, Ident, LitStr, Result, Token, Type};

/// Parses `#[format(Type)]`.
fn parse_format(attribute: &Attribute) -> Result<Type> {
    attribute.parse_args()
}

/// Parses `#[location("fmt", Type, ...)]`.
fn parse_location(attribute: &Attribute) -> Result<(LitStr, Vec<Type>)> {
    attribute.parse_args_with(|input: ParseStream| {
        let literal = input.parse::<LitStr>()?;
        let mut arguments = vec![];

        while input.parse::<Option<Token![,]>>()?.is_some() && !input.is_empty() {
            arguments.push(input.parse()?);
        }

        Ok((literal, arguments))
    })
}

/// Finds and parses the attribute with the given name.
fn find<T>(
    ident: &Ident,
    attrs: &[Attribute],
    name: &str,
    parse: impl FnOnce(&Attribute) -> Result<T>,
) -> Result<T> {
    let Some(attribute) = attrs.iter().find(|a| a.path().is_ident(name)) else {
        return Err(Error::new(ident.span(), format!("the `{name}` attribute must be configured")));
    };

    parse(attribute)
}

pub fn procedure(input: TokenStream) -> TokenStream {
    let DeriveInput { attrs, ident, generics, .. } = parse_macro_input!(input as DeriveInput);

    let parsed = self::find(&ident, &attrs, "format", self::parse_format)
        .and_then(|format| Ok((format, self::find(&ident, &attrs, "location", self::parse_location)?)));
    let (format, (location, args)) = match parsed {
        Ok(value) => value,
        Err(error) => return error.into_compile_error().into(),
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let names = (0 .. args.len()).map(|n| format_ident!("_{n}")).collect::<Vec<_>>();

    quote! {
        impl #impl_generics ::coloriz_storage::Stored for #ident #ty_generics #where_clause {
            type Arguments = (#(#args,)*);
            type Format = #format;

            fn stored((#(#names,)*): Self::Arguments) -> ::coloriz_storage::Key<Self, Self::Format> {
                ::coloriz_storage::Key::from(format!(#location, #(#names),*))
            }
        }
    }
    .into()
}
