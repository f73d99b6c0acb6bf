use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use substate::{
    Context, Machine, Next, NoopObserver, Observer, Queue, StateFn, SuperMachine, state,
    try_hijack, upon,
};
use tokio::runtime::Runtime;

type Bench = Machine<u64, ()>;
type BenchNext = Next<u64, ()>;

#[state]
async fn consume(ctx: Context, m: Bench) -> BenchNext {
    loop {
        tokio::select! {
            biased;
            _ = ctx.done() => return None,
            next = m.next_state() => return Some(next),
            Some(0) = m.source().recv() => return None,
        }
    }
}

#[state]
async fn stop(_ctx: Context, _m: Bench) -> BenchNext {
    None
}

fn upstream() -> SuperMachine<u64, ()> {
    let observer: Arc<dyn Observer> = Arc::new(NoopObserver);
    Machine::builder(Arc::new(()))
        .queue_capacity(1024)
        .observer(observer)
        .build_super(consume())
}

fn benchmark_queue(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    for capacity in [0, 1024] {
        c.bench_function(&format!("queue_send_recv_1000_cap_{capacity}"), |b| {
            b.to_async(&rt).iter(|| async move {
                let ctx = Context::new();
                let queue = Queue::new(capacity);
                let source = queue.source();
                let consumer = tokio::spawn(async move {
                    let mut sum = 0u64;
                    while let Some(n) = source.recv().await {
                        sum += n;
                    }
                    sum
                });

                let sink = queue.sink();
                drop(queue);
                for i in 0..1000u64 {
                    sink.send(&ctx, i).await.unwrap();
                }
                drop(sink);
                consumer.await.unwrap()
            })
        });
    }
}

fn benchmark_machine(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("machine_1000_events", |b| {
        b.to_async(&rt).iter(|| async {
            let ctx = Context::new();
            let m = upstream();
            let task = m.spawn(ctx.clone());
            let sink = m.machine().sink();
            for i in 1..=1000u64 {
                sink.send(&ctx, i).await.unwrap();
            }
            sink.send(&ctx, 0).await.unwrap();
            task.await.unwrap();
        })
    });

    c.bench_function("try_hijack_round_trip", |b| {
        b.to_async(&rt).iter(|| async {
            let ctx = Context::new();
            let m = upstream();
            let sub = m.sub_machine(0, None);
            let pending = upon(consume(), ctx.clone(), sub.masquerade());
            let next: Option<StateFn<u64, ()>> = try_hijack(&m, &ctx, stop(), pending).await.unwrap();
            assert_eq!(next, Some(stop()));
        })
    });
}

criterion_group!(benches, benchmark_queue, benchmark_machine);
criterion_main!(benches);
