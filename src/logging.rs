//! Logging setup and scoped redirection through the progress bar.
//!
//! Two concerns live here:
//!
//! - [`init`] installs the process-wide subscriber with compact timestamps
//!   and `RUST_LOG` support, for hosts that have no subscriber of their own.
//! - [`redirect_to`] reroutes tracing output *on the current thread only*
//!   into an open session as Write messages, so worker log lines are printed
//!   above the bar instead of corrupting it. The returned guard restores the
//!   previous subscriber on drop, and guards nest strictly stack-ordered
//!   (last redirected, first restored).
//!
//! # Environment Variable
//!
//! `RUST_LOG` takes precedence over the defaults in both paths:
//! ```bash
//! RUST_LOG=debug my-tool
//! RUST_LOG=relay=debug,my_crate=trace my-tool
//! ```

use std::io;
use std::sync::Once;

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::handle::ProgressHandle;
use crate::message::ProgressMessage;
use crate::queue::ProgressSender;

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Initialize process-wide logging.
///
/// Call once at startup; later calls are no-ops. Defaults to `warn` for
/// quiet operation; use `RUST_LOG` for verbose output.
pub fn init() {
    init_with_filter("warn");
}

/// Initialize process-wide logging with a default filter directive.
///
/// The `RUST_LOG` environment variable takes precedence over
/// `default_filter`.
pub fn init_with_filter(default_filter: &str) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(default_filter)
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Restores the previously active subscriber when dropped.
///
/// Thread-scoped: other threads are never affected. Nested guards restore
/// in strict reverse order of acquisition.
#[must_use = "dropping the guard ends the redirection"]
pub struct RedirectGuard {
    _guard: DefaultGuard,
}

/// Redirect tracing output on the current thread into `handle`'s session.
///
/// Each formatted record is sent as a Write message and printed above the
/// bar. `filter` selects which targets and severities are captured; `None`
/// falls back to `RUST_LOG`, or `info` when that is unset. To capture only
/// specific targets, pass e.g. `EnvFilter::new("my_crate=debug")` — targets
/// outside the filter are discarded for the scope, never globally
/// reconfigured.
pub fn redirect_to(handle: &ProgressHandle, filter: Option<EnvFilter>) -> RedirectGuard {
    let filter = filter.unwrap_or_else(|| {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let writer = QueueWriter {
        sender: handle.sender().clone(),
    };
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_timer(CompactTime)
        .with_level(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter);

    let subscriber = tracing_subscriber::registry().with(layer);
    RedirectGuard {
        _guard: tracing::subscriber::set_default(subscriber),
    }
}

/// MakeWriter that turns formatted records into Write messages.
#[derive(Clone)]
struct QueueWriter {
    sender: ProgressSender,
}

impl<'a> MakeWriter<'a> for QueueWriter {
    type Writer = LineBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        LineBuffer {
            sender: self.sender.clone(),
            buf: Vec::new(),
        }
    }
}

/// Per-record writer; complete lines are sent as they appear, any remainder
/// on drop.
struct LineBuffer {
    sender: ProgressSender,
    buf: Vec<u8>,
}

impl LineBuffer {
    fn drain_complete_lines(&mut self) {
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            self.sender.put(ProgressMessage::Write(text));
        }
    }
}

impl io::Write for LineBuffer {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        self.drain_complete_lines();
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_complete_lines();
        Ok(())
    }
}

impl Drop for LineBuffer {
    fn drop(&mut self) {
        self.drain_complete_lines();
        if !self.buf.is_empty() {
            let text = String::from_utf8_lossy(&self.buf).into_owned();
            self.sender.put(ProgressMessage::Write(text));
        }
    }
}
