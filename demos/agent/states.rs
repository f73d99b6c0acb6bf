//! An agent machine and a sub-agent that extends it.
//!
//! The agent moves between `disconnected` and `connected` on connect and
//! disconnect requests and emits a pulse for every heartbeat. The sub-agent
//! reuses all of that through a masquerade, and splits `connected` into two
//! stages: the first heartbeat while connected hijacks the agent into
//! `connected_stage2`.

use std::sync::Arc;

use substate::{
    Context, Machine, Next, Observer, StateFn, SubMachine, SuperMachine, state, try_hijack, upon,
};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentEvent {
    ConnectRequest,
    DisconnectRequest,
    Heartbeat,
}

/// The agent's states. The sub-agent overrides all three.
pub trait AgentStates: Send + Sync {
    fn disconnected(&self) -> StateFn<AgentEvent, dyn AgentStates>;
    fn connected(&self) -> StateFn<AgentEvent, dyn AgentStates>;
    fn terminating(&self) -> StateFn<AgentEvent, dyn AgentStates>;

    /// The agent whose side effects every table ultimately uses.
    fn agent(&self) -> &Agent;
}

pub type AgentMachine = Machine<AgentEvent, dyn AgentStates>;
pub type AgentNext = Next<AgentEvent, dyn AgentStates>;

pub struct Agent {
    pulse: mpsc::Sender<()>,
}

impl Agent {
    pub fn new(pulse: mpsc::Sender<()>) -> Self {
        Self { pulse }
    }

    fn connect(&self) {
        tracing::info!("do-connect");
    }

    fn disconnect(&self) {
        tracing::info!("do-disconnect");
    }

    async fn heartbeat(&self, ctx: &Context) {
        tracing::info!("do-heartbeat");
        tokio::select! {
            biased;
            _ = ctx.done() => {}
            _ = self.pulse.send(()) => {}
        }
    }
}

impl AgentStates for Agent {
    fn disconnected(&self) -> StateFn<AgentEvent, dyn AgentStates> {
        disconnected()
    }

    fn connected(&self) -> StateFn<AgentEvent, dyn AgentStates> {
        connected()
    }

    fn terminating(&self) -> StateFn<AgentEvent, dyn AgentStates> {
        terminating()
    }

    fn agent(&self) -> &Agent {
        self
    }
}

#[state]
async fn disconnected(ctx: Context, m: AgentMachine) -> AgentNext {
    loop {
        tokio::select! {
            biased;
            _ = ctx.done() => return Some(m.states().terminating()),
            next = m.next_state() => return Some(next),
            Some(event) = m.source().recv() => match event {
                AgentEvent::ConnectRequest => {
                    m.states().agent().connect();
                    return Some(m.states().connected());
                }
                AgentEvent::Heartbeat => m.states().agent().heartbeat(&ctx).await,
                AgentEvent::DisconnectRequest => {}
            },
        }
    }
}

#[state]
async fn connected(ctx: Context, m: AgentMachine) -> AgentNext {
    loop {
        tokio::select! {
            biased;
            _ = ctx.done() => return Some(m.states().terminating()),
            next = m.next_state() => return Some(next),
            Some(event) = m.source().recv() => match event {
                AgentEvent::DisconnectRequest => {
                    m.states().agent().disconnect();
                    return Some(m.states().disconnected());
                }
                AgentEvent::Heartbeat => m.states().agent().heartbeat(&ctx).await,
                AgentEvent::ConnectRequest => {}
            },
        }
    }
}

#[state]
async fn terminating(_ctx: Context, _m: AgentMachine) -> AgentNext {
    tracing::info!("terminating");
    None
}

/// Overrides every agent state with a sub-agent state that delegates back
/// to the agent.
struct Subagent {
    upstream: Arc<dyn AgentStates>,
}

impl AgentStates for Subagent {
    fn disconnected(&self) -> StateFn<AgentEvent, dyn AgentStates> {
        happily_disconnected()
    }

    fn connected(&self) -> StateFn<AgentEvent, dyn AgentStates> {
        connected_stage1()
    }

    fn terminating(&self) -> StateFn<AgentEvent, dyn AgentStates> {
        happily_terminating()
    }

    fn agent(&self) -> &Agent {
        self.upstream.agent()
    }
}

/// Runs the agent's version of `state` on a masquerade while forwarding the
/// sub-agent's events upstream, and adopts whatever the agent decides.
async fn delegate(
    ctx: &Context,
    m: &AgentMachine,
    sub: &SubMachine<AgentEvent, dyn AgentStates>,
    state: StateFn<AgentEvent, dyn AgentStates>,
    note: Option<(AgentEvent, &str)>,
) -> AgentNext {
    let mut delegated = upon(state, ctx.clone(), sub.masquerade());
    loop {
        tokio::select! {
            biased;
            next = &mut delegated => return next,
            Some(event) = m.source().recv() => {
                if let Some((trigger, message)) = note {
                    if event == trigger {
                        tracing::info!("{message}");
                    }
                }
                let _ = sub.dispatch(ctx, event).await;
            }
        }
    }
}

#[state]
async fn happily_disconnected(ctx: Context, m: AgentMachine) -> AgentNext {
    let sub = m.as_sub()?;
    let upstream = sub.super_machine().states().disconnected();
    delegate(
        &ctx,
        &m,
        &sub,
        upstream,
        Some((AgentEvent::ConnectRequest, ".. happily connecting")),
    )
    .await
}

#[state]
async fn connected_stage1(ctx: Context, m: AgentMachine) -> AgentNext {
    let sub = m.as_sub()?;
    let mut delegated = upon(
        sub.super_machine().states().connected(),
        ctx.clone(),
        sub.masquerade(),
    );

    loop {
        tokio::select! {
            biased;
            next = &mut delegated => return next,
            Some(event) = m.source().recv() => {
                match event {
                    AgentEvent::DisconnectRequest => tracing::info!(".. happily disconnecting"),
                    AgentEvent::Heartbeat => {
                        tracing::info!(".. happily entering connected_stage2");
                        return match try_hijack(sub.super_machine(), &ctx, connected_stage2(), delegated).await {
                            Ok(next) => next,
                            Err(_) => Some(m.states().terminating()),
                        };
                    }
                    AgentEvent::ConnectRequest => {}
                }
                let _ = sub.dispatch(&ctx, event).await;
            }
        }
    }
}

#[state]
async fn connected_stage2(ctx: Context, m: AgentMachine) -> AgentNext {
    let sub = m.as_sub()?;
    let upstream = sub.super_machine().states().connected();
    delegate(
        &ctx,
        &m,
        &sub,
        upstream,
        Some((AgentEvent::DisconnectRequest, ".. happily disconnecting")),
    )
    .await
}

#[state]
async fn happily_terminating(ctx: Context, m: AgentMachine) -> AgentNext {
    tracing::info!("happily terminating");
    let sub = m.as_sub()?;
    sub.super_machine()
        .states()
        .terminating()
        .call(ctx, sub.masquerade())
        .await
}

/// Builds the agent as a super-machine and the sub-agent on top of it.
///
/// Only the sub-agent is meant to be run; the agent's states execute
/// through it.
pub fn assemble(
    pulse: mpsc::Sender<()>,
    observer: Arc<dyn Observer>,
) -> (
    SuperMachine<AgentEvent, dyn AgentStates>,
    SubMachine<AgentEvent, dyn AgentStates>,
) {
    let agent: Arc<dyn AgentStates> = Arc::new(Agent::new(pulse));
    let upstream = Machine::builder(agent)
        .name("agent")
        .queue_capacity(10)
        .observer(Arc::clone(&observer))
        .build_super(disconnected());

    let subagent: Arc<dyn AgentStates> = Arc::new(Subagent {
        upstream: Arc::clone(upstream.states()),
    });
    let sub = upstream
        .sub_builder()
        .name("subagent")
        .queue_capacity(0)
        .initial(happily_disconnected())
        .states(subagent)
        .build();

    (upstream, sub)
}
