mod parker;
mod pool;
mod queue;

use self::{
    pool::{Pool, Task},
    queue::Shared,
};
use crate::{
    error::SubmitError,
    task::{self, CancelToken, TaskHandle},
};
use crossbeam_deque::Worker as LocalQueue;
use parking_lot::Mutex;
use std::{mem, num::NonZeroUsize, sync::Arc, thread};

/// Configures an [`Executor`] before building it.
#[derive(Default)]
pub struct Builder {
    worker_threads: Option<NonZeroUsize>,
    stack_size: Option<NonZeroUsize>,
    thread_name: Option<String>,
}

impl Builder {
    pub const fn new() -> Self {
        Self {
            worker_threads: None,
            stack_size: None,
            thread_name: None,
        }
    }

    /// Number of worker threads. Defaults to the number of logical CPUs.
    pub fn worker_threads(&mut self, worker_threads: usize) -> &mut Self {
        self.worker_threads = NonZeroUsize::new(worker_threads);
        self
    }

    /// Stack size for each worker thread, in bytes.
    pub fn stack_size(&mut self, stack_size: usize) -> &mut Self {
        self.stack_size = NonZeroUsize::new(stack_size);
        self
    }

    /// Prefix for worker thread names ("{name}-{index}").
    pub fn thread_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.thread_name = Some(name.into());
        self
    }

    pub fn build(&self) -> Executor {
        let worker_count = self
            .worker_threads
            .map(NonZeroUsize::get)
            .unwrap_or_else(num_cpus::get)
            .max(1);

        let locals: Vec<LocalQueue<Task>> =
            (0..worker_count).map(|_| LocalQueue::new_fifo()).collect();
        let pool = Arc::new(Pool::new(Shared::new(&locals)));

        let name = self.thread_name.as_deref().unwrap_or("kiln-worker");
        let threads = locals
            .into_iter()
            .enumerate()
            .map(|(index, local)| {
                let pool = Arc::clone(&pool);
                let mut builder = thread::Builder::new().name(format!("{}-{}", name, index));
                if let Some(stack_size) = self.stack_size {
                    builder = builder.stack_size(stack_size.get());
                }

                builder
                    .spawn(move || pool.run_worker(index, local))
                    .expect("Failed to spawn a worker thread")
            })
            .collect();

        Executor {
            pool,
            threads: Mutex::new(threads),
        }
    }
}

/// Runs submitted computations on a pool of worker threads.
///
/// Submission never blocks on the computation itself: work is enqueued onto
/// work-stealing deques and an idle worker is woken to pick it up. Dropping
/// the executor shuts it down, draining already-queued tasks first.
pub struct Executor {
    pool: Arc<Pool>,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl Executor {
    /// Pool with the default configuration (one worker per logical CPU).
    pub fn new() -> Self {
        Builder::new().build()
    }

    /// Schedules `compute` to run against `input` on a worker thread and
    /// returns a handle to the eventual result.
    ///
    /// The input value is moved into the task; the computation receives a
    /// mutable borrow of it and whatever it leaves behind becomes the
    /// task's result.
    pub fn submit<T, F>(&self, compute: F, input: T) -> Result<TaskHandle<T>, SubmitError>
    where
        T: Send + 'static,
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.submit_with(move |value, _cancel| compute(value), input)
    }

    /// As [`submit`](Self::submit), but the computation also receives the
    /// task's [`CancelToken`] so it can observe cancellation mid-run.
    pub fn submit_with<T, F>(&self, compute: F, input: T) -> Result<TaskHandle<T>, SubmitError>
    where
        T: Send + 'static,
        F: FnOnce(&mut T, &CancelToken) + Send + 'static,
    {
        let id = self.pool.next_task_id();
        let (inner, runnable) = task::work_item(id, compute, input);

        inner.mark_scheduled();
        self.pool.submit(Task { id, runnable })?;
        Ok(TaskHandle::new(inner))
    }

    /// Stops intake, drains already-queued tasks, and joins the worker
    /// threads. Later submissions fail with [`SubmitError::Shutdown`].
    /// Idempotent; also invoked on drop.
    pub fn shutdown(&self) {
        self.pool.shutdown();

        let threads = mem::take(&mut *self.threads.lock());
        for thread in threads {
            thread.join().expect("worker thread panicked");
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
