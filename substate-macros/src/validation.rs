//! Validation of functions annotated with `#[state]`.

use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Attribute, Block, Error, FnArg, Ident, ItemFn, LitStr, ReturnType, Type, Visibility};

use crate::attrs::StateArgs;

/// A state function after validation.
pub struct StateDef {
    pub attrs: Vec<Attribute>,
    pub vis: Visibility,
    pub ident: Ident,
    pub inputs: Punctuated<FnArg, Comma>,
    pub output: Type,
    pub block: Box<Block>,
    pub name: LitStr,
}

impl StateDef {
    /// Checks that `item` has the shape of a state function:
    /// `async fn name(ctx: Context, m: Machine<E, S>) -> Next<E, S>`.
    pub fn parse(args: StateArgs, item: ItemFn) -> syn::Result<Self> {
        let ItemFn {
            attrs,
            vis,
            sig,
            block,
        } = item;

        if sig.asyncness.is_none() {
            return Err(Error::new_spanned(
                sig.fn_token,
                "State functions must be `async fn`",
            ));
        }
        if let Some(constness) = sig.constness {
            return Err(Error::new_spanned(constness, "State functions cannot be `const`"));
        }
        if let Some(unsafety) = sig.unsafety {
            return Err(Error::new_spanned(unsafety, "State functions cannot be `unsafe`"));
        }
        if let Some(abi) = &sig.abi {
            return Err(Error::new_spanned(abi, "State functions cannot declare an ABI"));
        }
        if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
            return Err(Error::new_spanned(
                &sig.generics,
                "State functions cannot be generic; name concrete event and state table types",
            ));
        }
        if let Some(variadic) = &sig.variadic {
            return Err(Error::new_spanned(variadic, "State functions cannot be variadic"));
        }

        if let Some(receiver) = sig.inputs.iter().find(|arg| matches!(arg, FnArg::Receiver(_))) {
            return Err(Error::new_spanned(
                receiver,
                "State functions are free functions and cannot take `self`",
            ));
        }
        if sig.inputs.len() != 2 {
            return Err(Error::new_spanned(
                &sig.ident,
                "State functions take exactly two arguments: (ctx: Context, m: Machine<E, S>)",
            ));
        }

        let output = match sig.output {
            ReturnType::Type(_, ty) => *ty,
            ReturnType::Default => {
                return Err(Error::new_spanned(
                    &sig.ident,
                    "State functions must return `Next<E, S>`",
                ));
            }
        };

        let name = match args.name {
            Some(name) if name.value().is_empty() => {
                return Err(Error::new_spanned(name, "State name cannot be empty"));
            }
            Some(name) => name,
            None => LitStr::new(&sig.ident.unraw().to_string(), sig.ident.span()),
        };

        Ok(Self {
            attrs,
            vis,
            ident: sig.ident,
            inputs: sig.inputs,
            output,
            block,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    fn parse(item: ItemFn) -> syn::Result<StateDef> {
        StateDef::parse(StateArgs::default(), item)
    }

    #[test]
    fn test_accepts_state_function() {
        let def = parse(parse_quote! {
            /// Waits for a connection.
            pub async fn disconnected(ctx: Context, m: AgentMachine) -> AgentNext {
                None
            }
        })
        .unwrap();

        assert_eq!(def.ident, "disconnected");
        assert_eq!(def.name.value(), "disconnected");
        assert_eq!(def.inputs.len(), 2);
        assert_eq!(def.attrs.len(), 1);
    }

    #[test]
    fn test_raw_identifier_name() {
        let def = parse(parse_quote! {
            async fn r#loop(ctx: Context, m: M) -> N { None }
        })
        .unwrap();
        assert_eq!(def.name.value(), "loop");
    }

    #[test]
    fn test_explicit_name() {
        let args = StateArgs {
            name: Some(parse_quote!("stage-2")),
        };
        let def = StateDef::parse(
            args,
            parse_quote! { async fn stage2(ctx: Context, m: M) -> N { None } },
        )
        .unwrap();
        assert_eq!(def.name.value(), "stage-2");
    }

    #[test]
    fn test_rejects_malformed_functions() {
        let cases: Vec<ItemFn> = vec![
            parse_quote! { fn not_async(ctx: Context, m: M) -> N { None } },
            parse_quote! { async fn generic<T>(ctx: Context, m: M) -> N { None } },
            parse_quote! { async fn one_arg(ctx: Context) -> N { None } },
            parse_quote! { async fn no_return(ctx: Context, m: M) {} },
            parse_quote! { async unsafe fn risky(ctx: Context, m: M) -> N { None } },
        ];
        for case in cases {
            assert!(parse(case).is_err());
        }
    }
}
