use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use substate::{Context, Machine, Next, Observer, StateFn, state};
use tokio::sync::watch;

mod common;
use common::Recorder;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Letter {
    A,
    B,
}

#[derive(Default)]
struct Script {
    seen: Mutex<Vec<Letter>>,
    bounces: AtomicUsize,
}

impl Script {
    fn record(&self, letter: Letter) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(letter);
        }
    }

    fn seen(&self) -> Vec<Letter> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

type ScriptMachine = Machine<Letter, Script>;
type ScriptNext = Next<Letter, Script>;

#[state]
async fn first(ctx: Context, m: ScriptMachine) -> ScriptNext {
    tokio::select! {
        biased;
        _ = ctx.done() => None,
        Some(letter) = m.source().recv() => {
            m.states().record(letter);
            Some(second())
        }
    }
}

#[state]
async fn second(ctx: Context, m: ScriptMachine) -> ScriptNext {
    tokio::select! {
        biased;
        _ = ctx.done() => None,
        Some(letter) = m.source().recv() => {
            m.states().record(letter);
            None
        }
    }
}

#[state]
async fn ping(ctx: Context, m: ScriptMachine) -> ScriptNext {
    m.states().bounces.fetch_add(1, Ordering::SeqCst);
    tokio::select! {
        biased;
        _ = ctx.done() => None,
        _ = tokio::task::yield_now() => Some(pong()),
    }
}

#[state]
async fn pong(ctx: Context, m: ScriptMachine) -> ScriptNext {
    m.states().bounces.fetch_add(1, Ordering::SeqCst);
    tokio::select! {
        biased;
        _ = ctx.done() => None,
        _ = tokio::task::yield_now() => Some(ping()),
    }
}

fn machine(initial: StateFn<Letter, Script>, recorder: &Arc<Recorder>) -> ScriptMachine {
    let observer: Arc<dyn Observer> = recorder.clone();
    Machine::builder(Arc::new(Script::default()))
        .name("script")
        .queue_capacity(1)
        .observer(observer)
        .build(initial)
}

#[tokio::test]
async fn test_run_processes_events_in_order_then_terminates() {
    let ctx = Context::new();
    let recorder = Arc::new(Recorder::new());
    let m = machine(first(), &recorder);
    let task = m.spawn(ctx.clone());

    m.sink().send(&ctx, Letter::A).await.unwrap();
    m.sink().send(&ctx, Letter::B).await.unwrap();

    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
    assert_eq!(m.states().seen(), vec![Letter::A, Letter::B]);
    assert_eq!(recorder.entered(), vec!["first", "second"]);
    assert!(!ctx.is_cancelled());
}

#[tokio::test]
async fn test_run_returns_when_cancelled() {
    let ctx = Context::new();
    let recorder = Arc::new(Recorder::new());
    let m = machine(first(), &recorder);

    let run = tokio::spawn(substate::run(ctx.clone(), m.clone()));
    recorder.wait_for_entries(1).await;

    ctx.cancel();
    ctx.cancel();
    tokio::time::timeout(WAIT, run).await.unwrap().unwrap();
    assert_eq!(recorder.entered(), vec!["first"]);
    assert!(m.states().seen().is_empty());
}

#[tokio::test]
async fn test_mutually_recursive_states_until_cancelled() {
    let ctx = Context::new();
    let recorder = Arc::new(Recorder::new());
    let m = machine(ping(), &recorder);
    let task = m.spawn(ctx.clone());

    recorder.wait_for_entries(10).await;
    ctx.cancel();
    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();

    let entered = recorder.entered();
    assert!(entered.len() >= 10);
    assert_eq!(entered.len(), m.states().bounces.load(Ordering::SeqCst));
    for (i, name) in entered.iter().enumerate() {
        let expected = if i % 2 == 0 { "ping" } else { "pong" };
        assert_eq!(name, expected);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ball {
    Ping,
    Pong,
}

struct Rally {
    hits: watch::Sender<Vec<Ball>>,
}

type RallyMachine = Machine<Ball, Rally>;

/// Answers every ball by sending the other one back into its own queue.
#[state]
async fn rally(ctx: Context, m: RallyMachine) -> Next<Ball, Rally> {
    while let Some(ball) = m.source().recv_or_done(&ctx).await {
        m.states().hits.send_modify(|hits| hits.push(ball));
        let reply = match ball {
            Ball::Ping => Ball::Pong,
            Ball::Pong => Ball::Ping,
        };
        if m.sink().send(&ctx, reply).await.is_err() {
            break;
        }
    }
    None
}

#[tokio::test]
async fn test_ping_pong_through_own_queue() {
    let ctx = Context::new();
    let m = Machine::builder(Arc::new(Rally {
        hits: watch::Sender::new(Vec::new()),
    }))
    .name("pingpong")
    .queue_capacity(1)
    .build(rally());

    let mut hits = m.states().hits.subscribe();
    let task = m.spawn(ctx.clone());
    m.sink().send(&ctx, Ball::Ping).await.unwrap();

    tokio::time::timeout(WAIT, hits.wait_for(|hits| hits.len() >= 5))
        .await
        .unwrap()
        .unwrap();
    ctx.cancel();
    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();

    let hits = m.states().hits.borrow().clone();
    for (i, ball) in hits.iter().enumerate() {
        let expected = if i % 2 == 0 { Ball::Ping } else { Ball::Pong };
        assert_eq!(*ball, expected);
    }
}
