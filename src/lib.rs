//! # substate
//!
//! Extensible Tokio state machines. A machine is driven by state functions
//! that each wait on the machine's event queue, its hijack channel and a
//! cancellation [`Context`], then return the next state. A [`SubMachine`]
//! extends a [`SuperMachine`] without touching its code: it runs its own
//! states in front, delegates to the super-machine's states through a
//! masquerade, forwards events upstream, and can hijack the delegated state
//! to force a transition of its choosing.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use substate::{Context, Machine, Next, state};
//!
//! type Counter = Machine<u32, ()>;
//!
//! #[state]
//! async fn counting(ctx: Context, m: Counter) -> Next<u32, ()> {
//!     match m.source().recv_or_done(&ctx).await {
//!         Some(0) | None => None,
//!         Some(_) => Some(counting()),
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let ctx = Context::new();
//! let machine = Machine::builder(Arc::new(())).queue_capacity(4).build(counting());
//! let task = machine.spawn(ctx.clone());
//!
//! for n in [3, 2, 1, 0] {
//!     machine.sink().send(&ctx, n).await.unwrap();
//! }
//! task.await.unwrap();
//! # }
//! ```

#[doc(inline)]
pub use substate_core::*;
#[doc(inline)]
pub use substate_macros::state;
