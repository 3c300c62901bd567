use super::{
    parker::Parker,
    queue::{self, Shared},
};
use crate::{error::SubmitError, task::Runnable};
use crossbeam_deque::Worker as LocalQueue;
use parking_lot::RwLock;
use std::{
    mem,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

/// A unit of queued work: the submission-ordered id plus the type-erased
/// runnable that executes the computation and completes its handle.
pub(crate) struct Task {
    pub id: u64,
    pub runnable: Runnable,
}

impl Task {
    fn run(self) {
        (self.runnable)()
    }
}

#[allow(unused)]
#[derive(Debug)]
pub(crate) enum PoolEvent {
    TaskSubmitted { task_id: u64 },
    TaskStarted { worker_index: usize, task_id: u64 },
    TaskFinished { worker_index: usize, task_id: u64 },
    WorkerSpawned { worker_index: usize },
    WorkerParked { worker_index: usize },
    WorkerUnparked { worker_index: usize },
    WorkerShutdown { worker_index: usize },
}

/// State shared by every worker thread and the submitting side.
pub(crate) struct Pool {
    shared: Shared,
    parker: Parker,
    /// Closed on shutdown. Submissions hold the read side while injecting,
    /// so once the write side is taken no task can slip in behind the
    /// drain-and-exit of the workers.
    intake_closed: RwLock<bool>,
    shutdown: AtomicBool,
    next_task_id: AtomicU64,
}

impl Pool {
    pub fn new(shared: Shared) -> Self {
        Self {
            shared,
            parker: Parker::new(),
            intake_closed: RwLock::new(false),
            shutdown: AtomicBool::new(false),
            next_task_id: AtomicU64::new(1),
        }
    }

    pub fn next_task_id(&self) -> u64 {
        self.next_task_id.fetch_add(1, Ordering::Relaxed)
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Enqueues a task and wakes a worker. Fails synchronously once
    /// shutdown began; a submission that raced shutdown and won is
    /// guaranteed to be drained before the workers exit.
    pub fn submit(&self, task: Task) -> Result<(), SubmitError> {
        let closed = self.intake_closed.read();
        if *closed {
            return Err(SubmitError::Shutdown);
        }

        self.emit(PoolEvent::TaskSubmitted { task_id: task.id });
        self.shared.inject(task);
        drop(closed);

        self.parker.unpark(1);
        Ok(())
    }

    /// Stops intake and wakes every worker so they can drain and exit.
    /// Idempotent.
    pub fn shutdown(&self) {
        let mut closed = self.intake_closed.write();
        if mem::replace(&mut *closed, true) {
            return;
        }
        drop(closed);

        self.shutdown.store(true, Ordering::Release);
        self.parker.unpark(self.shared.worker_count());
    }

    pub(crate) fn emit(&self, event: PoolEvent) {
        match event {
            PoolEvent::WorkerSpawned { .. } | PoolEvent::WorkerShutdown { .. } => {
                tracing::debug!(?event)
            }
            _ => tracing::trace!(?event),
        }
    }

    pub fn run_worker(&self, index: usize, local: LocalQueue<Task>) {
        self.emit(PoolEvent::WorkerSpawned {
            worker_index: index,
        });

        let mut tick: usize = 0;
        let mut xorshift = 0xdeadbeef + index;

        loop {
            let be_fair = tick % 64 == 0;
            match queue::pop(&self.shared, &local, index, be_fair, &mut xorshift) {
                Some(task) => {
                    tick = tick.wrapping_add(1);
                    let task_id = task.id;

                    self.emit(PoolEvent::TaskStarted {
                        worker_index: index,
                        task_id,
                    });

                    // panics inside the computation are caught by the
                    // runnable itself, so the worker survives any task
                    task.run();

                    self.emit(PoolEvent::TaskFinished {
                        worker_index: index,
                        task_id,
                    });
                }
                None => {
                    // once shutdown began, never park again: a task mid-steal
                    // is invisible to is_empty and nobody would wake us
                    if self.is_shutdown() {
                        if self.shared.is_empty() {
                            break;
                        }
                        std::thread::yield_now();
                        continue;
                    }

                    self.emit(PoolEvent::WorkerParked {
                        worker_index: index,
                    });
                    self.parker.park();
                    self.emit(PoolEvent::WorkerUnparked {
                        worker_index: index,
                    });
                }
            }
        }

        self.emit(PoolEvent::WorkerShutdown {
            worker_index: index,
        });
    }
}
