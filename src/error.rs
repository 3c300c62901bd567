use thiserror::Error;

/// Reported synchronously when the executor cannot accept a submission.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum SubmitError {
    /// Shutdown already began; the pool no longer takes work.
    #[error("executor is shut down")]
    Shutdown,
}

/// Reported when retrieving a task's result.
///
/// A failure inside the computation never crashes the worker that ran it;
/// it is captured per-task and surfaced here, to the caller that asked for
/// the result.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum TaskError {
    /// The computation panicked while running.
    #[error("computation failed: {0}")]
    Failed(String),

    /// The task was cancelled before its computation ran to completion.
    #[error("task was cancelled")]
    Cancelled,

    /// The result was already moved out of this handle.
    #[error("task result already taken")]
    Expired,

    /// The caller's deadline elapsed before the task completed.
    #[error("timed out waiting for task completion")]
    TimedOut,
}
