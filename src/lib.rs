//! Many workers, one progress bar.
//!
//! Workers report progress (and log output) through a typed message channel
//! to a single consumer thread that owns the rendered bar, so parallel work
//! never fights over the terminal.
//!
//! ```no_run
//! use relaybar::{ProgressSession, SessionOptions};
//!
//! let session = ProgressSession::open(
//!     SessionOptions::default().with_description("files").with_total(100),
//! );
//! let handle = session.handle();
//! for _ in 0..100 {
//!     handle.update();
//! }
//! session.close().unwrap();
//! ```
//!
//! Or let [`map`]/[`starmap`] manage the session around a worker pool:
//!
//! ```no_run
//! use relaybar::{RayonPool, SessionOptions, starmap};
//!
//! let pool = RayonPool::new().unwrap();
//! let squares = starmap(
//!     &pool,
//!     |x: i64| x * x,
//!     vec![(1,), (2,), (3,)],
//!     SessionOptions::default().with_description("squares"),
//! );
//! assert_eq!(squares, vec![1, 4, 9]);
//! ```

pub mod error;
pub mod handle;
pub mod logging;
pub mod message;
pub mod pool;
pub mod render;
pub mod session;

mod consumer;
mod queue;

pub use error::{RelayError, RelayResult};
pub use handle::ProgressHandle;
pub use message::{Postfix, ProgressMessage};
pub use pool::{CallArgs, RayonPool, WorkerPool, map, starmap};
pub use render::{BarSeed, IndicatifRender, ProgressRender, RecordingRender, RenderOp};
pub use session::{ProgressSession, SessionOptions};
