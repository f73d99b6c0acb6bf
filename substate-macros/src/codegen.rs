//! Code generation for `#[state]`.

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};

use crate::validation::StateDef;

/// Turns the annotated `async fn` into a constructor for its `StateFn`.
///
/// The written body becomes a nested `async fn` so that recursive
/// references to the state (`Some(connected())`) resolve to the
/// constructor.
pub fn generate(def: &StateDef) -> TokenStream {
    let StateDef {
        attrs,
        vis,
        ident,
        inputs,
        output,
        block,
        name,
    } = def;
    let body = format_ident!("__{}_body", ident, span = Span::mixed_site());

    quote! {
        #(#attrs)*
        #vis fn #ident() -> <#output as ::substate::Transition>::State {
            async fn #body(#inputs) -> #output #block

            ::substate::StateFn::new(#name, #body)
        }
    }
}
