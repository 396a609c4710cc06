//! Producer-side progress handle.
//!
//! Each worker holds a cheap clone of [`ProgressHandle`]; every operation is
//! a fire-and-forget send onto the session channel. Nothing here blocks on
//! the consumer, and nothing returns an acknowledgment.

use crate::logging;
use crate::message::{Postfix, ProgressMessage};
use crate::pool::CallArgs;
use crate::queue::ProgressSender;

/// Cloneable handle for reporting progress into an open session.
///
/// Valid only while its owning [`ProgressSession`](crate::ProgressSession)
/// scope is open; sends after close are discarded.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    sender: ProgressSender,
}

impl ProgressHandle {
    pub(crate) fn new(sender: ProgressSender) -> Self {
        Self { sender }
    }

    pub(crate) fn sender(&self) -> &ProgressSender {
        &self.sender
    }

    /// Advance the bar by one unit.
    pub fn update(&self) {
        self.update_by(1);
    }

    /// Advance the bar by `delta` units.
    pub fn update_by(&self, delta: u64) {
        self.sender.put(ProgressMessage::Update(delta));
    }

    /// Replace the total unit count.
    pub fn set_total(&self, total: u64) {
        self.sender.put(ProgressMessage::SetTotal(total));
    }

    /// Increment the total unit count by `delta`.
    pub fn add_total(&self, delta: u64) {
        self.sender.put(ProgressMessage::AddTotal(delta));
    }

    /// Replace the postfix annotation wholesale.
    pub fn set_postfix(&self, postfix: Postfix) {
        self.sender.put(ProgressMessage::SetPostfix(postfix));
    }

    /// Print a line above the bar without disturbing it.
    pub fn write(&self, line: impl Into<String>) {
        self.sender.put(ProgressMessage::Write(line.into()));
    }

    /// Run one unit of work and report it.
    ///
    /// For the duration of the call, tracing output on this thread is
    /// redirected through the bar as Write lines. `args` is unpacked as
    /// positional arguments via [`CallArgs`]. Update(1) is sent only after
    /// `f` returns normally, so a panicking unit never counts as progress.
    pub fn run_and_report<A, F>(&self, f: &F, args: A) -> F::Output
    where
        F: CallArgs<A>,
    {
        let _redirect = logging::redirect_to(self, None);
        let result = f.call_args(args);
        self.update_by(1);
        result
    }
}
