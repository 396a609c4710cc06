//! Error types for session lifecycle and pool construction.
//!
//! Producer-side operations are fire-and-forget and never fail; errors only
//! surface when tearing down a session or building a worker pool.

/// Errors surfaced by session teardown and pool construction.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The consumer thread panicked before it could observe Stop.
    #[error("progress consumer thread panicked")]
    ConsumerPanicked,

    /// The underlying rayon pool could not be built.
    #[error("failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
