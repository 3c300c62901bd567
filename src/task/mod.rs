mod cancel;
mod waker;

pub use cancel::CancelToken;

use self::waker::AtomicWaker;
use crate::error::TaskError;
use parking_lot::{Condvar, Mutex};
use std::{
    any::Any,
    future::Future,
    panic::{catch_unwind, AssertUnwindSafe},
    pin::Pin,
    sync::atomic::{AtomicU8, Ordering},
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};

/// The task state machine. Transitions only move forward:
/// Created -> Scheduled -> Running -> Completed | Failed.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Status {
    Created = 0,
    Scheduled = 1,
    Running = 2,
    Completed = 3,
    Failed = 4,
}

impl From<u8> for Status {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Scheduled,
            2 => Self::Running,
            3 => Self::Completed,
            4 => Self::Failed,
            _ => unreachable!("invalid task Status"),
        }
    }
}

impl Status {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Completion state shared between a [`TaskHandle`] and the worker that
/// runs its computation.
///
/// The result slot has a single writer (the worker) and is written under
/// the lock before the status is stored with Release, so any Acquire
/// observation of a terminal status sees a fully written result.
pub(crate) struct Inner<T> {
    id: u64,
    status: AtomicU8,
    cancel: CancelToken,
    slot: Mutex<Option<Result<T, TaskError>>>,
    condvar: Condvar,
    waker: AtomicWaker,
}

impl<T> Inner<T> {
    fn new(id: u64) -> Self {
        Self {
            id,
            status: AtomicU8::new(Status::Created as u8),
            cancel: CancelToken::new(),
            slot: Mutex::new(None),
            condvar: Condvar::new(),
            waker: AtomicWaker::new(),
        }
    }

    fn status(&self) -> Status {
        self.status.load(Ordering::Acquire).into()
    }

    pub(crate) fn mark_scheduled(&self) {
        let prev = self.status.swap(Status::Scheduled as u8, Ordering::Relaxed);
        debug_assert_eq!(prev, Status::Created as u8);
    }

    fn mark_running(&self) {
        let prev = self.status.swap(Status::Running as u8, Ordering::Relaxed);
        debug_assert_eq!(prev, Status::Scheduled as u8);
    }

    fn complete(&self, outcome: Result<T, TaskError>) {
        let status = match outcome {
            Ok(_) => Status::Completed,
            Err(_) => Status::Failed,
        };

        let mut slot = self.slot.lock();
        debug_assert!(slot.is_none(), "task result written twice");
        *slot = Some(outcome);

        // the result write must be visible before the signal reads terminal
        self.status.store(status as u8, Ordering::Release);
        self.condvar.notify_all();
        drop(slot);

        self.waker.wake();
    }
}

/// The type-erased form a pool worker executes.
pub(crate) type Runnable = Box<dyn FnOnce() + Send>;

/// Packages (computation, input) into a runnable plus the shared state a
/// [`TaskHandle`] observes. The runnable owns the moved-in input, hands the
/// computation a mutable borrow of it, and completes the state exactly
/// once; a panic inside the computation is caught on the worker and stored
/// as the task's failure.
pub(crate) fn work_item<T, F>(id: u64, compute: F, input: T) -> (Arc<Inner<T>>, Runnable)
where
    T: Send + 'static,
    F: FnOnce(&mut T, &CancelToken) + Send + 'static,
{
    let inner = Arc::new(Inner::new(id));

    let state = Arc::clone(&inner);
    let runnable = Box::new(move || {
        state.mark_running();
        if state.cancel.is_cancelled() {
            state.complete(Err(TaskError::Cancelled));
            return;
        }

        let cancel = state.cancel.clone();
        let mut value = input;
        let outcome = catch_unwind(AssertUnwindSafe(move || {
            compute(&mut value, &cancel);
            value
        }));

        state.complete(match outcome {
            Ok(value) => Ok(value),
            Err(payload) => Err(TaskError::Failed(panic_reason(payload))),
        });
    });

    (inner, runnable)
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "computation panicked".to_string()
    }
}

/// A scheduled computation and its eventual, strongly typed result.
///
/// The handle supports three retrieval styles:
/// - polling via [`is_completed`](Self::is_completed),
/// - blocking via [`wait`](Self::wait) / [`wait_timeout`](Self::wait_timeout)
///   / [`join`](Self::join) (the waiter parks, it does not spin),
/// - suspending via `.await`, where the continuation is woken only once
///   the computation actually finished.
///
/// [`wait`](Self::wait) is idempotent and clones the cached result. `join`
/// and `.await` move the result out instead; afterwards every retrieval
/// reports [`TaskError::Expired`].
pub struct TaskHandle<T> {
    inner: Arc<Inner<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(inner: Arc<Inner<T>>) -> Self {
        Self { inner }
    }

    /// Submission-ordered id, matching the executor's trace events.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Non-blocking completion query. Safe to call from any thread at any
    /// point in the task's life.
    pub fn is_completed(&self) -> bool {
        self.inner.status().is_terminal()
    }

    /// Requests cooperative cancellation. A task still queued when the
    /// request is observed completes as [`TaskError::Cancelled`] without
    /// running its computation.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Parks the caller until the task reaches a terminal state, then
    /// clones out the result. May be called any number of times.
    pub fn wait(&self) -> Result<T, TaskError>
    where
        T: Clone,
    {
        let mut slot = self.inner.slot.lock();
        while !self.inner.status().is_terminal() {
            self.inner.condvar.wait(&mut slot);
        }

        match slot.as_ref() {
            Some(outcome) => outcome.clone(),
            None => Err(TaskError::Expired),
        }
    }

    /// As [`wait`](Self::wait), but gives up with [`TaskError::TimedOut`]
    /// once `timeout` elapses. Timing out does not disturb the task; a
    /// later retrieval can still succeed.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, TaskError>
    where
        T: Clone,
    {
        let deadline = Instant::now() + timeout;

        let mut slot = self.inner.slot.lock();
        while !self.inner.status().is_terminal() {
            if self.inner.condvar.wait_until(&mut slot, deadline).timed_out() {
                if self.inner.status().is_terminal() {
                    break;
                }
                return Err(TaskError::TimedOut);
            }
        }

        match slot.as_ref() {
            Some(outcome) => outcome.clone(),
            None => Err(TaskError::Expired),
        }
    }

    /// Parks until terminal and moves the result out of the handle.
    pub fn join(self) -> Result<T, TaskError> {
        let mut slot = self.inner.slot.lock();
        while !self.inner.status().is_terminal() {
            self.inner.condvar.wait(&mut slot);
        }

        slot.take().unwrap_or(Err(TaskError::Expired))
    }

    fn take_result(&self) -> Result<T, TaskError> {
        self.inner.slot.lock().take().unwrap_or(Err(TaskError::Expired))
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.is_completed() {
            return Poll::Ready(self.take_result());
        }

        // a false registration means completion raced us; the signal is
        // terminal by then and the result is safe to take
        if !self.inner.waker.register(ctx.waker()) {
            return Poll::Ready(self.take_result());
        }

        Poll::Pending
    }
}
