//! Runs the sub-agent through one connect/disconnect cycle.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example agent
//! ```

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use substate::{Context, TracingObserver};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};

mod states;

use states::{AgentEvent, assemble};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ctx = Context::new();
    let (pulse_tx, mut pulse_rx) = mpsc::channel(1);
    let (_agent, subagent) = assemble(pulse_tx, Arc::new(TracingObserver));

    tracing::info!("starting subagent");
    let task = subagent.spawn(ctx.clone());

    tokio::spawn(async move {
        while pulse_rx.recv().await.is_some() {
            tracing::info!("pulse");
        }
    });

    let sink = subagent.machine().sink().clone();
    let ticker_ctx = ctx.clone();
    tokio::spawn(async move {
        let mut ticks = interval(Duration::from_millis(300));
        loop {
            tokio::select! {
                biased;
                _ = ticker_ctx.done() => return,
                _ = ticks.tick() => {
                    if sink.send(&ticker_ctx, AgentEvent::Heartbeat).await.is_err() {
                        return;
                    }
                }
            }
        }
    });

    let sink = subagent.machine().sink();
    sleep(Duration::from_secs(1)).await;
    sink.send(&ctx, AgentEvent::ConnectRequest).await?;
    sleep(Duration::from_secs(1)).await;
    sink.send(&ctx, AgentEvent::DisconnectRequest).await?;
    sleep(Duration::from_secs(1)).await;

    tracing::info!("cancelling");
    ctx.cancel();
    task.await?;
    tracing::info!("subagent terminated");

    Ok(())
}
