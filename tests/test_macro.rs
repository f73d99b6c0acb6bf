use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use substate::{Context, Machine, Next, StateFn, state};

type Countdown = Machine<(), AtomicUsize>;

/// Counts down to zero by re-entering itself.
#[state]
pub async fn tick(_ctx: Context, m: Countdown) -> Next<(), AtomicUsize> {
    if m.states().fetch_sub(1, Ordering::SeqCst) > 1 {
        Some(tick())
    } else {
        None
    }
}

#[state(name = "all-done")]
async fn finished(_ctx: Context, _m: Countdown) -> Next<(), AtomicUsize> {
    None
}

#[test]
fn test_state_names() {
    assert_eq!(tick().name(), "tick");
    assert_eq!(finished().name(), "all-done");
    assert_eq!(tick(), tick());
    assert_ne!(tick(), finished());
}

#[tokio::test]
async fn test_recursive_state_runs_to_completion() {
    let m = Machine::builder(Arc::new(AtomicUsize::new(3))).build(tick());
    let initial: StateFn<(), AtomicUsize> = m.initial_state();

    substate::run(Context::new(), m.clone()).await;
    assert_eq!(initial, tick());
    assert_eq!(m.states().load(Ordering::SeqCst), 0);
}
