//! The rendering capability consumed by the consumer loop.
//!
//! Rendering is an external collaborator: the consumer only speaks this
//! small trait, so the terminal backend can be swapped without touching the
//! message plumbing. [`IndicatifRender`] is the default terminal backend;
//! [`RecordingRender`] captures calls for tests and headless runs.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

use crate::message::Postfix;

/// Initial bar configuration, fixed when a session opens.
#[derive(Debug, Clone)]
pub struct BarSeed {
    /// Text rendered before the bar. Immutable for the session's life.
    pub description: String,
    /// Total unit count, or `None` for an indeterminate bar.
    pub total: Option<u64>,
    /// Whether the rendered line persists after the session closes.
    pub leave: bool,
    /// Initial postfix annotation.
    pub postfix: Postfix,
}

/// Capability interface for the progress renderer.
///
/// Called exclusively by the consumer thread; implementations never need
/// internal locking for correctness, only `Send` to cross into that thread.
pub trait ProgressRender: Send {
    /// Build the live bar from the seed and make it visible.
    fn create(&mut self, seed: &BarSeed);
    /// Advance the completed count by `delta`.
    fn advance(&mut self, delta: u64);
    /// Replace the total unit count.
    fn set_total(&mut self, total: u64);
    /// Redraw without changing state.
    fn refresh(&mut self);
    /// Replace the postfix annotation text.
    fn set_postfix(&mut self, postfix: &Postfix);
    /// Emit a line above the bar without disturbing the bar row.
    fn write_line(&mut self, line: &str);
    /// Close the bar, leaving it on screen or clearing it.
    fn close(&mut self, leave: bool);
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix} {wide_bar} {pos}/{len} [{elapsed_precise}] {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} {spinner} {pos} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn format_postfix(postfix: &Postfix) -> String {
    postfix
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Terminal renderer backed by indicatif.
#[derive(Default)]
pub struct IndicatifRender {
    bar: Option<ProgressBar>,
}

impl IndicatifRender {
    /// Create a renderer with no live bar yet.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressRender for IndicatifRender {
    fn create(&mut self, seed: &BarSeed) {
        let bar = match seed.total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(bar_style());
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(spinner_style());
                bar
            }
        };
        bar.set_prefix(seed.description.clone());
        if !seed.postfix.is_empty() {
            bar.set_message(format_postfix(&seed.postfix));
        }
        bar.tick();
        self.bar = Some(bar);
    }

    fn advance(&mut self, delta: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(delta);
        }
    }

    fn set_total(&mut self, total: u64) {
        if let Some(bar) = &self.bar {
            // An indeterminate spinner becomes a determinate bar once a
            // total is known.
            bar.set_length(total);
            bar.set_style(bar_style());
        }
    }

    fn refresh(&mut self) {
        if let Some(bar) = &self.bar {
            bar.tick();
        }
    }

    fn set_postfix(&mut self, postfix: &Postfix) {
        if let Some(bar) = &self.bar {
            bar.set_message(format_postfix(postfix));
        }
    }

    fn write_line(&mut self, line: &str) {
        if let Some(bar) = &self.bar {
            bar.println(line);
        }
    }

    fn close(&mut self, leave: bool) {
        if let Some(bar) = self.bar.take() {
            if leave {
                bar.finish();
            } else {
                bar.finish_and_clear();
            }
        }
    }
}

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    /// `create` with the seed's total.
    Create { total: Option<u64> },
    /// `advance(delta)`.
    Advance(u64),
    /// `set_total(total)`.
    SetTotal(u64),
    /// `refresh`.
    Refresh,
    /// `set_postfix` with the replacement mapping.
    SetPostfix(Postfix),
    /// `write_line` with the emitted text.
    WriteLine(String),
    /// `close` with the leave flag.
    Close { leave: bool },
}

/// Renderer that records every call instead of drawing.
///
/// Clone it before handing it to a session; the clone shares the recorded
/// call log, so a test can inspect what the consumer did after close.
#[derive(Debug, Clone, Default)]
pub struct RecordingRender {
    ops: Arc<Mutex<Vec<RenderOp>>>,
}

impl RecordingRender {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded calls so far.
    pub fn ops(&self) -> Vec<RenderOp> {
        self.ops.lock().clone()
    }

    /// Sum of all `Advance` deltas seen so far.
    pub fn completed(&self) -> u64 {
        self.ops
            .lock()
            .iter()
            .map(|op| match op {
                RenderOp::Advance(d) => *d,
                _ => 0,
            })
            .sum()
    }
}

impl ProgressRender for RecordingRender {
    fn create(&mut self, seed: &BarSeed) {
        self.ops.lock().push(RenderOp::Create { total: seed.total });
    }

    fn advance(&mut self, delta: u64) {
        self.ops.lock().push(RenderOp::Advance(delta));
    }

    fn set_total(&mut self, total: u64) {
        self.ops.lock().push(RenderOp::SetTotal(total));
    }

    fn refresh(&mut self) {
        self.ops.lock().push(RenderOp::Refresh);
    }

    fn set_postfix(&mut self, postfix: &Postfix) {
        self.ops.lock().push(RenderOp::SetPostfix(postfix.clone()));
    }

    fn write_line(&mut self, line: &str) {
        self.ops.lock().push(RenderOp::WriteLine(line.to_string()));
    }

    fn close(&mut self, leave: bool) {
        self.ops.lock().push(RenderOp::Close { leave });
    }
}
