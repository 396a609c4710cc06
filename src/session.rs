//! Scoped progress session: one channel, one consumer thread, one bar.
//!
//! Opening a session spawns the consumer thread and hands out producer
//! handles; closing it (explicitly or by drop) sends exactly one Stop and
//! joins the thread, so no consumer ever outlives its scope — on normal
//! return, on unwind, and for nested sessions alike. Sessions share nothing
//! with each other.

use std::thread::{self, JoinHandle};

use crate::consumer::{BarState, ConsumerLoop};
use crate::error::{RelayError, RelayResult};
use crate::handle::ProgressHandle;
use crate::message::{Postfix, ProgressMessage};
use crate::queue::{self, ProgressSender};
use crate::render::{BarSeed, IndicatifRender, ProgressRender};

/// Configuration for a progress session.
///
/// ```
/// use relaybar::SessionOptions;
///
/// let options = SessionOptions::default()
///     .with_description("indexing")
///     .with_total(128)
///     .with_leave(false);
/// ```
#[derive(Default)]
pub struct SessionOptions {
    description: String,
    total: Option<u64>,
    leave: Option<bool>,
    postfix: Postfix,
    render: Option<Box<dyn ProgressRender>>,
}

impl SessionOptions {
    /// Set the text rendered before the bar.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the total unit count. Unset totals render an indeterminate bar.
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Keep the bar line on screen after close (default) or clear it.
    pub fn with_leave(mut self, leave: bool) -> Self {
        self.leave = Some(leave);
        self
    }

    /// Seed the initial postfix annotation.
    pub fn with_postfix(mut self, postfix: Postfix) -> Self {
        self.postfix = postfix;
        self
    }

    /// Replace the terminal renderer, e.g. with a recording render in tests.
    pub fn with_render(mut self, render: Box<dyn ProgressRender>) -> Self {
        self.render = Some(render);
        self
    }

    /// Fill in the total only if the caller left it unset.
    pub(crate) fn or_total(mut self, total: u64) -> Self {
        self.total.get_or_insert(total);
        self
    }

    fn seed(&self) -> BarSeed {
        BarSeed {
            description: self.description.clone(),
            total: self.total,
            leave: self.leave.unwrap_or(true),
            postfix: self.postfix.clone(),
        }
    }
}

/// An open progress session owning its consumer thread.
pub struct ProgressSession {
    sender: ProgressSender,
    thread: Option<JoinHandle<BarState>>,
}

impl ProgressSession {
    /// Open a session: create the channel, spawn the consumer, show the bar.
    pub fn open(options: SessionOptions) -> Self {
        let (sender, receiver) = queue::channel();
        let seed = options.seed();
        let render = options
            .render
            .unwrap_or_else(|| Box::new(IndicatifRender::new()));

        let thread = thread::spawn(move || ConsumerLoop::new(receiver, render, seed).run());

        Self {
            sender,
            thread: Some(thread),
        }
    }

    /// A fresh producer handle bound to this session's channel.
    pub fn handle(&self) -> ProgressHandle {
        ProgressHandle::new(self.sender.clone())
    }

    /// Close the session: send Stop and block until the consumer thread has
    /// observed it and exited.
    pub fn close(mut self) -> RelayResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> RelayResult<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.sender.put(ProgressMessage::Stop);
        let state = thread.join().map_err(|_| RelayError::ConsumerPanicked)?;
        tracing::debug!(
            target: "relay",
            completed = state.completed,
            total = state.total,
            "progress session closed"
        );
        Ok(())
    }
}

impl Drop for ProgressSession {
    fn drop(&mut self) {
        // Covers the unwind path; errors here have nowhere to go.
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postfix;
    use crate::render::{RecordingRender, RenderOp};

    fn recorded_session(options: SessionOptions) -> (ProgressSession, RecordingRender) {
        let recorder = RecordingRender::new();
        let session = ProgressSession::open(options.with_render(Box::new(recorder.clone())));
        (session, recorder)
    }

    #[test]
    fn test_close_joins_consumer_and_closes_bar() {
        let (session, recorder) =
            recorded_session(SessionOptions::default().with_total(5).with_description("t"));
        let handle = session.handle();
        for _ in 0..5 {
            handle.update();
        }
        session.close().unwrap();

        // close() returning means the thread was joined; the recorder must
        // hold the full history.
        assert_eq!(recorder.completed(), 5);
        assert!(recorder.ops().contains(&RenderOp::Close { leave: true }));
    }

    #[test]
    fn test_drop_tears_down_on_unwind() {
        let recorder = RecordingRender::new();
        let recorder_probe = recorder.clone();

        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let session = ProgressSession::open(
                SessionOptions::default()
                    .with_total(2)
                    .with_render(Box::new(recorder)),
            );
            session.handle().update();
            panic!("caller failed mid-session");
        }));
        assert!(caught.is_err());

        assert!(
            recorder_probe.ops().contains(&RenderOp::Close { leave: true }),
            "drop during unwind must still close the bar: {:?}",
            recorder_probe.ops()
        );
    }

    #[test]
    fn test_nested_sessions_are_independent() {
        let (outer, outer_rec) = recorded_session(SessionOptions::default().with_total(2));
        let (inner, inner_rec) =
            recorded_session(SessionOptions::default().with_total(10).with_leave(false));

        inner.handle().update_by(10);
        inner.close().unwrap();
        assert!(inner_rec.ops().contains(&RenderOp::Close { leave: false }));

        // The outer session must still be live and processing.
        outer.handle().update();
        outer.close().unwrap();

        assert_eq!(outer_rec.completed(), 1);
        assert_eq!(inner_rec.completed(), 10);
        let outer_closes = outer_rec
            .ops()
            .iter()
            .filter(|op| matches!(op, RenderOp::Close { .. }))
            .count();
        assert_eq!(outer_closes, 1, "closing inner must not close outer");
    }

    #[test]
    fn test_leave_flag_reaches_render_close() {
        let (session, recorder) =
            recorded_session(SessionOptions::default().with_total(1).with_leave(false));
        session.close().unwrap();
        assert!(recorder.ops().contains(&RenderOp::Close { leave: false }));
    }

    #[test]
    fn test_initial_postfix_seeds_the_bar() {
        let (session, recorder) = recorded_session(
            SessionOptions::default()
                .with_total(1)
                .with_postfix(postfix! { "epoch" => 0 }),
        );
        let handle = session.handle();
        handle.set_postfix(postfix! { "epoch" => 1 });
        session.close().unwrap();

        assert!(
            recorder
                .ops()
                .contains(&RenderOp::SetPostfix(postfix! { "epoch" => 1 }))
        );
    }

    #[test]
    fn test_handle_outliving_session_is_harmless() {
        let (session, _recorder) = recorded_session(SessionOptions::default().with_total(1));
        let handle = session.handle();
        session.close().unwrap();
        // Fire-and-forget: sends after close are discarded, never panic.
        handle.update();
        handle.set_total(99);
    }
}
