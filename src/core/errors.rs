/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::core::guard::GuardError;

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Result type for semaphore operations
pub type SemaphoreResult<T> = Result<T, SemaphoreError>;

/// Result type spanning every primitive in the crate
pub type PrimitiveResult<T> = Result<T, PrimitiveError>;

/// Buffer access errors with serialization support
///
/// Only produced when a buffer is configured with [`InvalidAccess::Fail`](crate::InvalidAccess::Fail),
/// or by the bounded blocking dequeue of the concurrent buffer.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum BufferError {
    #[error("Buffer is empty")]
    #[diagnostic(
        code(buffer::empty),
        help("Check is_empty() first, or construct the buffer with InvalidAccess::ReturnDefault.")
    )]
    Empty,

    #[error("Index {index} out of range for buffer holding {count} elements")]
    #[diagnostic(
        code(buffer::index_out_of_range),
        help("Indices are logical: 0 is the oldest element and count - 1 the newest.")
    )]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Timed out after {waited_ms}ms waiting for an element")]
    #[diagnostic(
        code(buffer::timed_out),
        help("No producer enqueued within the timeout. Retry or use the blocking dequeue().")
    )]
    TimedOut { waited_ms: u64 },
}

impl BufferError {
    /// Whether this error is an invalid access (empty or out of range)
    pub fn is_empty_access(&self) -> bool {
        matches!(self, Self::Empty | Self::IndexOutOfRange { .. })
    }
}

/// Expiring semaphore errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SemaphoreError {
    #[error("Acquire was cancelled before a permit became available")]
    #[diagnostic(
        code(semaphore::cancelled),
        help("The caller's cancellation token fired. No permit was taken.")
    )]
    Cancelled,

    #[error("Semaphore has been disposed")]
    #[diagnostic(
        code(semaphore::disposed),
        help("Create a new semaphore; a disposed one never grants permits again.")
    )]
    Disposed,

    #[error("No permits available")]
    #[diagnostic(
        code(semaphore::no_permits),
        help("All permits are leased. Await acquire() or retry after release_after elapses.")
    )]
    NoPermits,

    #[error("No Tokio runtime to schedule the permit's release")]
    #[diagnostic(
        code(semaphore::no_runtime),
        help("Acquire permits from inside a Tokio runtime; the lease timer runs as a task.")
    )]
    NoRuntime,

    #[error("Invalid semaphore configuration: {0}")]
    #[diagnostic(
        code(semaphore::invalid_config),
        help("max_permits must be at least 1 and initial_permits must not exceed it.")
    )]
    InvalidConfig(String),

    #[error("Releasing {requested} permits would exceed max {max} (available {available}, outstanding {outstanding})")]
    #[diagnostic(
        code(semaphore::max_exceeded),
        help("Only release permits that were previously held outside this semaphore.")
    )]
    MaxExceeded {
        requested: usize,
        available: usize,
        outstanding: usize,
        max: usize,
    },
}

/// Unified error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum PrimitiveError {
    #[error("Buffer error: {0}")]
    #[diagnostic(transparent)]
    Buffer(#[from] BufferError),

    #[error("Semaphore error: {0}")]
    #[diagnostic(transparent)]
    Semaphore(#[from] SemaphoreError),

    #[error("Guard error: {0}")]
    #[diagnostic(code(primitive::guard))]
    Guard(#[from] GuardError),
}
