//! Attribute parsing for the `#[state]` macro.

use syn::parse::{Parse, ParseStream};
use syn::{Ident, LitStr, Token};

/// Arguments for the `#[state]` attribute.
#[derive(Default)]
pub struct StateArgs {
    /// Name reported for the state (default: the function name).
    pub name: Option<LitStr>,
}

impl Parse for StateArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = StateArgs::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            let _eq: Token![=] = input.parse()?;

            if ident == "name" {
                if args.name.is_some() {
                    return Err(syn::Error::new(ident.span(), "Duplicate 'name' argument"));
                }
                args.name = Some(input.parse()?);
            } else {
                return Err(syn::Error::new(
                    ident.span(),
                    "Unknown argument, expected 'name'",
                ));
            }

            if input.is_empty() {
                break;
            }
            let _comma: Token![,] = input.parse()?;
        }

        Ok(args)
    }
}
