//! Worker-pool capability and the map/starmap distribution adapters.
//!
//! The pool is an external collaborator consumed through [`WorkerPool`]:
//! apply a function to every item on pool workers and return the results in
//! submission order, whatever order the units actually complete in.
//! [`RayonPool`] is the default implementation.
//!
//! [`map`] and [`starmap`] wire a pool to a progress session: one session
//! scoped to the call, one Update per finished unit, results in input order.

use rayon::prelude::*;

use crate::error::RelayResult;
use crate::session::{ProgressSession, SessionOptions};

/// Positional-argument application for `starmap`.
///
/// Implemented for every `Fn` taking up to five arguments, against the
/// matching argument tuple: a `Fn(A, B) -> R` is `CallArgs<(A, B)>` and
/// gets called as `f(a, b)`, not `f((a, b))`.
pub trait CallArgs<Args> {
    /// The function's return type.
    type Output;

    /// Invoke with the tuple unpacked as positional arguments.
    fn call_args(&self, args: Args) -> Self::Output;
}

macro_rules! impl_call_args {
    ($($ty:ident),+) => {
        impl<Func, Out, $($ty),+> CallArgs<($($ty,)+)> for Func
        where
            Func: Fn($($ty),+) -> Out,
        {
            type Output = Out;

            #[allow(non_snake_case)]
            fn call_args(&self, ($($ty,)+): ($($ty,)+)) -> Out {
                self($($ty),+)
            }
        }
    };
}

impl_call_args!(A);
impl_call_args!(A, B);
impl_call_args!(A, B, C);
impl_call_args!(A, B, C, D);
impl_call_args!(A, B, C, D, E);

/// Capability interface for dispatching units of work across workers.
///
/// Contract: `run_all` applies `f` to every item and returns the results in
/// the same order as `items`, even though completion order across workers is
/// unspecified. A panic in any unit propagates to the caller.
pub trait WorkerPool {
    /// Run `f` over all items, collecting results in input order.
    fn run_all<T, R, F>(&self, f: F, items: Vec<T>) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send;
}

/// Worker pool backed by a dedicated rayon thread pool.
pub struct RayonPool {
    pool: rayon::ThreadPool,
}

impl RayonPool {
    /// Build a pool with one worker per logical CPU.
    pub fn new() -> RelayResult<Self> {
        Self::with_workers(num_cpus::get())
    }

    /// Build a pool with a fixed worker count.
    pub fn with_workers(workers: usize) -> RelayResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("relaybar-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }
}

impl WorkerPool for RayonPool {
    fn run_all<T, R, F>(&self, f: F, items: Vec<T>) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        // Indexed parallel collect keeps submission order regardless of
        // completion order.
        self.pool.install(|| items.into_par_iter().map(f).collect())
    }
}

/// Apply `f` to every item on the pool, tracking progress on one bar.
///
/// The session's total defaults to `items.len()` unless `options` set one
/// explicitly. Results come back in input order. Worker log output is
/// relayed through the bar for the duration of each unit. The session
/// closes when the pool call returns — or unwinds, if a unit panicked.
pub fn map<P, T, R, F>(pool: &P, f: F, items: Vec<T>, options: SessionOptions) -> Vec<R>
where
    P: WorkerPool,
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    let total = items.len() as u64;
    let session = ProgressSession::open(options.or_total(total));
    let handle = session.handle();
    let results = pool.run_all(move |item| handle.run_and_report(&f, (item,)), items);
    finish(session);
    results
}

/// Like [`map`], but each item is an argument tuple unpacked into `f`.
///
/// `starmap(&pool, f, vec![(1, 2), (3, 4)], ..)` calls `f(1, 2)` and
/// `f(3, 4)`.
pub fn starmap<P, T, R, F>(pool: &P, f: F, arg_tuples: Vec<T>, options: SessionOptions) -> Vec<R>
where
    P: WorkerPool,
    T: Send,
    R: Send,
    F: CallArgs<T, Output = R> + Sync + Send,
{
    let total = arg_tuples.len() as u64;
    let session = ProgressSession::open(options.or_total(total));
    let handle = session.handle();
    let results = pool.run_all(move |args| handle.run_and_report(&f, args), arg_tuples);
    finish(session);
    results
}

fn finish(session: ProgressSession) {
    if let Err(e) = session.close() {
        tracing::warn!(target: "relay", "progress session teardown failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RecordingRender, RenderOp};
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    fn pool() -> RayonPool {
        RayonPool::with_workers(4).unwrap()
    }

    #[test]
    fn test_call_args_unpacks_tuples() {
        let add = |a: i32, b: i32| a + b;
        assert_eq!(add.call_args((2, 3)), 5);

        let three = |a: i32, b: i32, c: i32| a * b * c;
        assert_eq!(three.call_args((2, 3, 4)), 24);
    }

    #[test]
    fn test_run_all_preserves_input_order() {
        // Later items finish first; order must still follow the input.
        let results = pool().run_all(
            |x: u64| {
                thread::sleep(Duration::from_millis(20u64.saturating_sub(x * 2)));
                x * 10
            },
            (0..10).collect(),
        );
        assert_eq!(results, (0..10).map(|x| x * 10).collect::<Vec<_>>());
    }

    #[test]
    fn test_run_all_crosses_threads() {
        let seen = Mutex::new(HashSet::new());
        pool().run_all(
            |_: u32| {
                thread::sleep(Duration::from_millis(5));
                seen.lock().unwrap().insert(thread_id::get());
            },
            (0..32).collect(),
        );
        let seen = seen.into_inner().unwrap();
        assert!(
            seen.len() > 1,
            "work should spread over workers, saw {} thread(s)",
            seen.len()
        );
    }

    #[test]
    fn test_map_reports_one_update_per_item() {
        let recorder = RecordingRender::new();
        let options = SessionOptions::default().with_render(Box::new(recorder.clone()));

        let results = map(&pool(), |x: u64| x + 1, (0..20).collect(), options);

        assert_eq!(results, (1..=20).collect::<Vec<_>>());
        assert_eq!(recorder.completed(), 20);
        assert!(
            recorder.ops().contains(&RenderOp::Create { total: Some(20) }),
            "total must default to the item count"
        );
        assert!(recorder.ops().contains(&RenderOp::Close { leave: true }));
    }

    #[test]
    fn test_map_respects_explicit_total() {
        let recorder = RecordingRender::new();
        let options = SessionOptions::default()
            .with_total(100)
            .with_render(Box::new(recorder.clone()));

        map(&pool(), |x: u64| x, (0..5).collect(), options);

        assert!(recorder.ops().contains(&RenderOp::Create { total: Some(100) }));
    }

    #[test]
    fn test_starmap_squares_in_order() {
        let results = starmap(
            &pool(),
            |x: i32| x * x,
            vec![(1,), (2,), (3,)],
            SessionOptions::default().with_render(Box::new(RecordingRender::new())),
        );
        assert_eq!(results, vec![1, 4, 9]);
    }

    #[test]
    fn test_starmap_unpacks_pairs() {
        let results = starmap(
            &pool(),
            |a: i32, b: i32| a - b,
            vec![(10, 1), (20, 2), (30, 3)],
            SessionOptions::default().with_render(Box::new(RecordingRender::new())),
        );
        assert_eq!(results, vec![9, 18, 27]);
    }

    #[test]
    fn test_failed_unit_does_not_count_as_progress() {
        let recorder = RecordingRender::new();
        let options = SessionOptions::default().with_render(Box::new(recorder.clone()));
        let pool = pool();

        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            map(
                &pool,
                |x: u32| if x == 3 { panic!("bad unit") } else { x },
                (0..8).collect(),
                options,
            )
        }));
        assert!(caught.is_err(), "worker panic must surface to the caller");

        let ops = recorder.ops();
        assert!(
            ops.contains(&RenderOp::Close { leave: true }),
            "session must still tear down after a worker failure: {ops:?}"
        );
        assert!(recorder.completed() < 8, "the failed unit must not be counted");
    }
}
