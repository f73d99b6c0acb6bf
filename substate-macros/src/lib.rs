//! Proc macro for declaring substate state functions.

use proc_macro::TokenStream;
use syn::{ItemFn, parse_macro_input};

mod attrs;
mod codegen;
mod validation;

/// Declares a state function.
///
/// Turns
///
/// ```rust,ignore
/// #[state]
/// async fn connected(ctx: Context, m: AgentMachine) -> Next<AgentEvent, dyn AgentStates> {
///     // ...
/// }
/// ```
///
/// into `fn connected() -> StateFn<AgentEvent, dyn AgentStates>`, a
/// constructor for a state named `"connected"`. Use
/// `#[state(name = "...")]` to report a different name.
#[proc_macro_attribute]
pub fn state(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args as attrs::StateArgs);
    let item = parse_macro_input!(input as ItemFn);

    match validation::StateDef::parse(args, item) {
        Ok(def) => codegen::generate(&def).into(),
        Err(e) => e.to_compile_error().into(),
    }
}
