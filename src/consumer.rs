//! The render consumer loop.
//!
//! Exactly one thread per session runs this loop. It owns the live renderer
//! and the bar state; no other thread ever touches either, so no locking is
//! needed around rendering state.
//!
//! ```text
//! workers ──put──▶ [channel] ──get──▶ ConsumerLoop ──▶ ProgressRender
//! ```
//!
//! States: Idle (before the bar exists) → Running (draining messages) →
//! Stopped (bar closed, loop returned). Stop is the only planned exit; a
//! full sender disconnect is treated the same way so a vanished producer
//! cannot wedge the session join.

use crate::message::ProgressMessage;
use crate::queue::ProgressReceiver;
use crate::render::{BarSeed, ProgressRender};

/// Progress state owned by the consumer thread.
#[derive(Debug, Clone)]
pub struct BarState {
    /// Bar description, fixed at open.
    pub description: String,
    /// Total unit count, `None` while indeterminate.
    pub total: Option<u64>,
    /// Sum of all Update deltas observed. Never reset.
    pub completed: u64,
    /// Current postfix annotation.
    pub postfix: crate::message::Postfix,
    /// Whether the bar line persists after close.
    pub leave: bool,
}

impl BarState {
    fn from_seed(seed: &BarSeed) -> Self {
        Self {
            description: seed.description.clone(),
            total: seed.total,
            completed: 0,
            postfix: seed.postfix.clone(),
            leave: seed.leave,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Stopped,
}

/// Single-consumer loop binding one receiver to one renderer.
pub(crate) struct ConsumerLoop {
    receiver: ProgressReceiver,
    render: Box<dyn ProgressRender>,
    seed: BarSeed,
    state: BarState,
    phase: Phase,
}

impl ConsumerLoop {
    pub(crate) fn new(
        receiver: ProgressReceiver,
        render: Box<dyn ProgressRender>,
        seed: BarSeed,
    ) -> Self {
        let state = BarState::from_seed(&seed);
        Self {
            receiver,
            render,
            seed,
            state,
            phase: Phase::Idle,
        }
    }

    /// Drain the channel until Stop (or full disconnect), then close the
    /// bar. Returns the final state for teardown diagnostics.
    pub(crate) fn run(mut self) -> BarState {
        debug_assert_eq!(self.phase, Phase::Idle);
        self.render.create(&self.seed);
        self.phase = Phase::Running;

        while let Some(msg) = self.receiver.get() {
            if !self.dispatch(msg) {
                break;
            }
        }
        if self.phase == Phase::Running {
            tracing::debug!(target: "relay", "all senders dropped without Stop, closing bar");
        }

        self.render.close(self.state.leave);
        self.phase = Phase::Stopped;
        self.state
    }

    /// Apply one message. Returns false once Stop is observed.
    fn dispatch(&mut self, msg: ProgressMessage) -> bool {
        match msg {
            ProgressMessage::Update(delta) => {
                self.state.completed += delta;
                self.render.advance(delta);
            }
            ProgressMessage::SetTotal(total) => {
                self.state.total = Some(total);
                self.render.set_total(total);
                self.render.refresh();
            }
            ProgressMessage::AddTotal(delta) => {
                let total = self.state.total.unwrap_or(0) + delta;
                self.state.total = Some(total);
                self.render.set_total(total);
                self.render.refresh();
            }
            ProgressMessage::SetPostfix(postfix) => {
                self.render.set_postfix(&postfix);
                self.state.postfix = postfix;
            }
            ProgressMessage::Write(line) => {
                self.render.write_line(&line);
            }
            ProgressMessage::Stop => {
                self.phase = Phase::Stopped;
                return false;
            }
        }
        true
    }
}
